//! SMU session abstraction and the Keithley 2400 driver.
//!
//! The measurement logic only ever sees [`SmuSession`]: reset, configure a
//! sweep, toggle the output, read back one sweep's samples. [`Keithley2400`]
//! implements it over any [`ScpiTransport`] by issuing the 2400-series SCPI
//! sweep program and parsing the ASCII reading list.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{BenchError, BenchResult};
use crate::hardware::scpi::ScpiTransport;
use crate::sweep::SweepParams;

/// Fields per reading in the instrument's ASCII reply
/// (voltage, current, resistance, timestamp, status).
pub const SAMPLE_WIDTH: usize = 5;

/// One reading from the SMU. The measured current is the second field.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    /// Sourced voltage reported by the instrument.
    pub voltage: f64,
    /// Measured current in amperes.
    pub current: f64,
    /// Reported resistance (sentinel value when resistance sensing is off).
    pub resistance: f64,
    /// Instrument timestamp in seconds.
    pub timestamp: f64,
    /// Status word.
    pub status: f64,
}

/// Exclusive session on the source-measure unit.
#[async_trait]
pub trait SmuSession: Send {
    /// Query the instrument identification string.
    async fn identify(&mut self) -> BenchResult<String>;

    /// Return the instrument to its power-on defaults.
    async fn reset(&mut self) -> BenchResult<()>;

    /// Program a voltage sweep. The configuration stays in effect until the
    /// next `reset` or `configure`.
    async fn configure(&mut self, params: &SweepParams) -> BenchResult<()>;

    /// Connect or disconnect the source output.
    async fn set_output(&mut self, enabled: bool) -> BenchResult<()>;

    /// Execute the configured sweep and return its readings, one per sweep
    /// point, in sweep order. Blocks until the sweep completes.
    async fn read(&mut self) -> BenchResult<Vec<Sample>>;
}

/// Keithley 2400-series SMU over a SCPI transport.
pub struct Keithley2400<T: ScpiTransport> {
    transport: T,
}

impl<T: ScpiTransport> Keithley2400<T> {
    /// Wrap a SCPI transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: ScpiTransport> SmuSession for Keithley2400<T> {
    async fn identify(&mut self) -> BenchResult<String> {
        self.transport.query("*IDN?").await
    }

    async fn reset(&mut self) -> BenchResult<()> {
        self.transport.command("*RST").await
    }

    async fn configure(&mut self, params: &SweepParams) -> BenchResult<()> {
        debug!(
            start = params.start,
            stop = params.stop,
            points = params.points,
            "Programming sweep"
        );
        self.transport.command(":SOUR:FUNC VOLT").await?;
        self.transport.command(":SENS:FUNC 'CURR:DC'").await?;
        self.transport
            .command(&format!(":SENS:CURR:PROT {:.2e}", params.compliance_a))
            .await?;
        self.transport
            .command(&format!(":SENS:CURR:RANG {:.2e}", params.current_range_a))
            .await?;
        self.transport
            .command(&format!(":SOUR:VOLT:START {:.2e}", params.start))
            .await?;
        self.transport
            .command(&format!(":SOUR:VOLT:STOP {:.2e}", params.stop))
            .await?;
        self.transport
            .command(&format!(":SOUR:SWE:POIN {}", params.points))
            .await?;
        self.transport.command(":SOUR:VOLT:MODE SWE").await?;
        self.transport.command(":SOUR:SWE:RANG AUTO").await?;
        self.transport.command(":SOUR:SWE:SPAC LIN").await?;
        self.transport
            .command(&format!(":TRIG:COUN {}", params.points))
            .await?;
        self.transport
            .command(&format!(":SOUR:DEL {:.2e}", params.source_delay_s))
            .await?;
        Ok(())
    }

    async fn set_output(&mut self, enabled: bool) -> BenchResult<()> {
        let command = if enabled { ":OUTP ON" } else { ":OUTP OFF" };
        self.transport.command(command).await
    }

    async fn read(&mut self) -> BenchResult<Vec<Sample>> {
        let reply = self.transport.query("READ?").await?;
        parse_readings(&reply)
    }
}

/// Parse the comma-separated ASCII reading list into width-5 samples.
fn parse_readings(reply: &str) -> BenchResult<Vec<Sample>> {
    let values: Vec<f64> = reply
        .split(',')
        .map(|field| {
            field.trim().parse::<f64>().map_err(|_| {
                BenchError::MalformedReply(format!("Unparseable reading field '{}'", field.trim()))
            })
        })
        .collect::<BenchResult<_>>()?;

    if values.is_empty() || values.len() % SAMPLE_WIDTH != 0 {
        return Err(BenchError::MalformedReply(format!(
            "Reading list length {} is not a multiple of {}",
            values.len(),
            SAMPLE_WIDTH
        )));
    }

    Ok(values
        .chunks_exact(SAMPLE_WIDTH)
        .map(|chunk| Sample {
            voltage: chunk[0],
            current: chunk[1],
            resistance: chunk[2],
            timestamp: chunk[3],
            status: chunk[4],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::{SweepConfig, SweepDirection, SweepPlan};
    use std::collections::VecDeque;

    /// Records the command stream and replays canned query replies.
    struct ScriptedTransport {
        sent: Vec<String>,
        replies: VecDeque<String>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<&str>) -> Self {
            Self {
                sent: Vec::new(),
                replies: replies.into_iter().map(String::from).collect(),
            }
        }
    }

    #[async_trait]
    impl ScpiTransport for ScriptedTransport {
        async fn command(&mut self, command: &str) -> BenchResult<()> {
            self.sent.push(command.to_string());
            Ok(())
        }

        async fn query(&mut self, command: &str) -> BenchResult<String> {
            self.sent.push(command.to_string());
            self.replies
                .pop_front()
                .ok_or_else(|| BenchError::Instrument("No scripted reply".to_string()))
        }
    }

    fn reverse_plan() -> SweepPlan {
        SweepPlan::build(SweepConfig {
            v_min: -0.2,
            v_max: 1.2,
            v_step: 0.02,
            direction: SweepDirection::Reverse,
            source_delay_s: 0.1,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn sweep_program_matches_direction() {
        let mut smu = Keithley2400::new(ScriptedTransport::new(vec![]));
        let params = reverse_plan().sweep_params(0.01, 0.01);
        smu.configure(&params).await.unwrap();

        let sent = &smu.transport.sent;
        assert!(sent.contains(&":SOUR:VOLT:START 1.20e0".to_string()));
        assert!(sent.contains(&":SOUR:VOLT:STOP -2.00e-1".to_string()));
        assert!(sent.contains(&":SOUR:SWE:POIN 71".to_string()));
        assert!(sent.contains(&":TRIG:COUN 71".to_string()));
        assert!(sent.contains(&":SOUR:SWE:SPAC LIN".to_string()));
    }

    #[tokio::test]
    async fn read_parses_width_five_tuples() {
        let reply = "0.0,-1.0e-2,9.9e37,0.1,0.0,0.1,-9.0e-3,9.9e37,0.2,0.0";
        let mut smu = Keithley2400::new(ScriptedTransport::new(vec![reply]));
        let samples = smu.read().await.unwrap();
        assert_eq!(samples.len(), 2);
        assert!((samples[0].current - (-0.01)).abs() < 1e-12);
        assert!((samples[1].voltage - 0.1).abs() < 1e-12);
    }

    #[tokio::test]
    async fn read_rejects_ragged_reply() {
        let mut smu = Keithley2400::new(ScriptedTransport::new(vec!["0.0,1.0,2.0"]));
        let err = smu.read().await.unwrap_err();
        assert!(matches!(err, BenchError::MalformedReply(_)));
    }

    #[tokio::test]
    async fn read_rejects_garbage() {
        let mut smu = Keithley2400::new(ScriptedTransport::new(vec!["0.0,abc,2.0,3.0,4.0"]));
        let err = smu.read().await.unwrap_err();
        assert!(matches!(err, BenchError::MalformedReply(_)));
    }
}
