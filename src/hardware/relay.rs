//! Relay/shutter board transport.
//!
//! The board speaks a two-byte frame protocol: `(wire index, state)`, one
//! frame per operation, answered by a single acknowledgement line. Wire
//! indices are zero-based; the device channels the rest of the crate works
//! with are one-based, and the shutter sits on a reserved index above the
//! device range (see [`crate::hardware::switch`]).

use async_trait::async_trait;

use crate::error::BenchResult;

/// Byte-oriented transport to the relay board.
///
/// The session is single-owner: no second frame is sent until the prior
/// acknowledgement has been read.
#[async_trait]
pub trait RelayTransport: Send {
    /// Send one `(wire index, state)` frame and return the acknowledgement
    /// line, which callers are free to discard.
    async fn send(&mut self, wire_index: u8, state: u8) -> BenchResult<String>;
}

#[cfg(feature = "instrument_serial")]
pub use serial::SerialRelay;

#[cfg(feature = "instrument_serial")]
mod serial {
    //! USB-serial implementation for the Arduino relay board.

    use std::io::{Read, Write};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serialport::SerialPort;
    use tokio::sync::Mutex;

    use crate::config::RelaySettings;
    use crate::error::{BenchError, BenchResult};

    use super::RelayTransport;

    /// Relay board on a blocking serial port, driven from async code via the
    /// blocking task executor.
    pub struct SerialRelay {
        port: Arc<Mutex<Box<dyn SerialPort>>>,
    }

    impl SerialRelay {
        /// Open the serial port named in the settings.
        pub fn open(settings: &RelaySettings) -> BenchResult<Self> {
            let port = serialport::new(&settings.port, settings.baud_rate)
                .timeout(Duration::from_millis(settings.timeout_ms))
                .open()
                .map_err(|e| {
                    BenchError::Instrument(format!(
                        "Failed to open relay port {}: {}",
                        settings.port, e
                    ))
                })?;
            Ok(Self {
                port: Arc::new(Mutex::new(port)),
            })
        }
    }

    #[async_trait]
    impl RelayTransport for SerialRelay {
        async fn send(&mut self, wire_index: u8, state: u8) -> BenchResult<String> {
            let port = self.port.clone();
            let frame = [wire_index, state];
            let ack = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
                let mut port = port.blocking_lock();
                port.write_all(&frame)?;
                // One acknowledgement line. The board may stay silent within
                // the read timeout; an empty line is an acceptable reply
                // since the content is discarded anyway.
                let mut line = Vec::new();
                let mut byte = [0u8; 1];
                loop {
                    match port.read(&mut byte) {
                        Ok(0) => break,
                        Ok(_) => {
                            if byte[0] == b'\n' {
                                break;
                            }
                            line.push(byte[0]);
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                        Err(e) => return Err(e),
                    }
                }
                Ok(String::from_utf8_lossy(&line).trim().to_string())
            })
            .await
            .map_err(|e| BenchError::Instrument(format!("Relay I/O task failed: {}", e)))??;
            Ok(ack)
        }
    }
}
