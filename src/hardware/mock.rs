//! Mock hardware for tests and `--mock` runs.
//!
//! [`MockBench`] wires a [`MockSmu`] and [`MockRelay`] together the way the
//! physical bench is wired: toggling the shutter wire on the relay changes
//! the photocurrent the SMU measures. Both halves append to a shared command
//! log so tests can assert the exact order of hardware operations.
//!
//! The synthetic device is a single-diode cell with compliance clipping:
//! plausible curves for demo runs, deterministic for tests. Tests that need
//! exact readings can queue them explicitly with [`MockSmu::queue_reading`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{BenchError, BenchResult};
use crate::hardware::relay::RelayTransport;
use crate::hardware::smu::{Sample, SmuSession};
use crate::hardware::switch::LIGHT_WIRE_INDEX;
use crate::sweep::SweepParams;

/// Shared record of every hardware operation, in issue order.
pub type CommandLog = Arc<Mutex<Vec<String>>>;

/// Create an empty command log.
pub fn new_command_log() -> CommandLog {
    Arc::new(Mutex::new(Vec::new()))
}

fn push(log: &CommandLog, entry: String) {
    if let Ok(mut log) = log.lock() {
        log.push(entry);
    }
}

/// Mock relay board: acknowledges every frame and tracks the shutter state.
pub struct MockRelay {
    log: CommandLog,
    illuminated: Arc<AtomicBool>,
}

impl MockRelay {
    /// Standalone mock relay with its own command log.
    pub fn new() -> Self {
        Self {
            log: new_command_log(),
            illuminated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mock relay sharing a command log and shutter flag.
    pub fn with_shared(log: CommandLog, illuminated: Arc<AtomicBool>) -> Self {
        Self { log, illuminated }
    }

    /// The command log this relay appends to.
    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }
}

impl Default for MockRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelayTransport for MockRelay {
    async fn send(&mut self, wire_index: u8, state: u8) -> BenchResult<String> {
        if wire_index == LIGHT_WIRE_INDEX {
            self.illuminated.store(state == 1, Ordering::SeqCst);
        }
        push(&self.log, format!("relay {} {}", wire_index, state));
        Ok("OK".to_string())
    }
}

/// Mock SMU: replays queued readings, or synthesizes a diode curve from the
/// programmed sweep and the shared shutter state.
pub struct MockSmu {
    log: CommandLog,
    illuminated: Arc<AtomicBool>,
    params: Option<SweepParams>,
    queued: VecDeque<Vec<Sample>>,
}

/// Photocurrent of the synthetic cell under illumination, in amperes.
const MOCK_PHOTOCURRENT_A: f64 = 0.02;
/// Diode saturation current of the synthetic cell, in amperes.
const MOCK_SATURATION_A: f64 = 1e-9;
/// Thermal voltage times ideality factor of the synthetic cell, in volts.
const MOCK_NVT: f64 = 0.0625;

impl MockSmu {
    /// Standalone mock SMU with its own command log, never illuminated.
    pub fn new() -> Self {
        Self {
            log: new_command_log(),
            illuminated: Arc::new(AtomicBool::new(false)),
            params: None,
            queued: VecDeque::new(),
        }
    }

    /// Mock SMU sharing a command log and shutter flag.
    pub fn with_shared(log: CommandLog, illuminated: Arc<AtomicBool>) -> Self {
        Self {
            log,
            illuminated,
            params: None,
            queued: VecDeque::new(),
        }
    }

    /// Queue an explicit reading; `read` drains the queue before falling
    /// back to the synthetic device.
    pub fn queue_reading(&mut self, samples: Vec<Sample>) {
        self.queued.push_back(samples);
    }

    fn synthesize(&self, params: &SweepParams) -> Vec<Sample> {
        let illuminated = self.illuminated.load(Ordering::SeqCst);
        let photocurrent = if illuminated { MOCK_PHOTOCURRENT_A } else { 0.0 };
        let n = params.points;
        (0..n)
            .map(|i| {
                let fraction = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
                let v = params.start + fraction * (params.stop - params.start);
                let diode = MOCK_SATURATION_A * ((v / MOCK_NVT).exp() - 1.0);
                let current = (diode - photocurrent).min(params.compliance_a);
                Sample {
                    voltage: v,
                    current,
                    resistance: 9.91e37,
                    timestamp: i as f64 * params.source_delay_s,
                    status: 0.0,
                }
            })
            .collect()
    }
}

impl Default for MockSmu {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SmuSession for MockSmu {
    async fn identify(&mut self) -> BenchResult<String> {
        push(&self.log, "smu identify".to_string());
        Ok("MOCK INSTRUMENTS INC.,MODEL 2400,0,C99".to_string())
    }

    async fn reset(&mut self) -> BenchResult<()> {
        push(&self.log, "smu reset".to_string());
        self.params = None;
        Ok(())
    }

    async fn configure(&mut self, params: &SweepParams) -> BenchResult<()> {
        push(&self.log, format!("smu configure {}", params.points));
        self.params = Some(params.clone());
        Ok(())
    }

    async fn set_output(&mut self, enabled: bool) -> BenchResult<()> {
        push(
            &self.log,
            format!("smu output {}", if enabled { "on" } else { "off" }),
        );
        Ok(())
    }

    async fn read(&mut self) -> BenchResult<Vec<Sample>> {
        push(&self.log, "smu read".to_string());
        if let Some(samples) = self.queued.pop_front() {
            return Ok(samples);
        }
        let params = self
            .params
            .clone()
            .ok_or_else(|| BenchError::Instrument("Sweep not configured".to_string()))?;
        Ok(self.synthesize(&params))
    }
}

/// Factory wiring a mock SMU and relay to the same shutter flag and command
/// log, mirroring the physical coupling of shutter and photocurrent.
pub struct MockBench;

impl MockBench {
    /// Build a coupled `(smu, relay, log)` triple.
    pub fn new() -> (MockSmu, MockRelay, CommandLog) {
        let log = new_command_log();
        let illuminated = Arc::new(AtomicBool::new(false));
        let smu = MockSmu::with_shared(log.clone(), illuminated.clone());
        let relay = MockRelay::with_shared(log.clone(), illuminated);
        (smu, relay, log)
    }
}
