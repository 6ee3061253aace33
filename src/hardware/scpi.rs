//! SCPI transport abstraction.
//!
//! Abstracts the underlying communication mechanism (VISA/GPIB here, mock in
//! tests) so the SMU driver stays protocol-agnostic. The real transport is
//! gated behind the `instrument_visa` feature because it needs a VISA
//! runtime installed.

use async_trait::async_trait;

use crate::error::BenchResult;

/// Transport for SCPI-based instruments.
///
/// The session is single-owner: methods take `&mut self` and no second
/// operation is issued until the prior one's reply is received.
#[async_trait]
pub trait ScpiTransport: Send {
    /// Send a command without expecting a response.
    async fn command(&mut self, command: &str) -> BenchResult<()>;

    /// Send a query command and return the response line.
    async fn query(&mut self, command: &str) -> BenchResult<String>;
}

#[cfg(feature = "instrument_visa")]
pub use visa::VisaTransport;

#[cfg(feature = "instrument_visa")]
mod visa {
    //! VISA-backed SCPI transport.

    use std::ffi::CString;
    use std::io::{BufRead, BufReader, Write};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::config::SmuSettings;
    use crate::error::{BenchError, BenchResult};

    use super::ScpiTransport;

    fn visa_err(context: &str, err: impl std::fmt::Display) -> BenchError {
        BenchError::Instrument(format!("{}: {}", context, err))
    }

    /// SCPI transport over a VISA session (GPIB, USB-TMC, TCPIP).
    ///
    /// I/O is blocking, as is the whole acquisition: a sweep's `READ?` does
    /// not return until the instrument finishes the sweep, and the session
    /// timeout must cover that.
    pub struct VisaTransport {
        _rm: visa_rs::DefaultRM,
        instrument: visa_rs::Instrument,
    }

    impl VisaTransport {
        /// Open the VISA resource named in the settings.
        pub fn open(settings: &SmuSettings) -> BenchResult<Self> {
            let rm = visa_rs::DefaultRM::new().map_err(|e| visa_err("VISA init failed", e))?;
            let name = CString::new(settings.resource.as_str())
                .map_err(|e| visa_err("Bad VISA resource string", e))?;
            let instrument = rm
                .open(
                    &name.into(),
                    visa_rs::flags::AccessMode::NO_LOCK,
                    Duration::from_millis(settings.timeout_ms),
                )
                .map_err(|e| visa_err("Failed to open VISA resource", e))?;
            Ok(Self {
                _rm: rm,
                instrument,
            })
        }

        fn write_line(&mut self, command: &str) -> BenchResult<()> {
            let payload = format!("{}\n", command);
            (&self.instrument)
                .write_all(payload.as_bytes())
                .map_err(|e| visa_err("VISA write failed", e))?;
            Ok(())
        }
    }

    #[async_trait]
    impl ScpiTransport for VisaTransport {
        async fn command(&mut self, command: &str) -> BenchResult<()> {
            self.write_line(command)
        }

        async fn query(&mut self, command: &str) -> BenchResult<String> {
            self.write_line(command)?;
            let mut reader = BufReader::new(&self.instrument);
            let mut line = String::new();
            reader
                .read_line(&mut line)
                .map_err(|e| visa_err("VISA read failed", e))?;
            Ok(line.trim().to_string())
        }
    }
}
