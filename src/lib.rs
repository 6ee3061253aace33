//! # Solar I–V Bench Library
//!
//! This crate drives a photovoltaic test bench: one Keithley 2400-class
//! source-measure unit is multiplexed across up to eight devices-under-test
//! by a relay board that also gates the illumination shutter. A run sweeps
//! each device in the dark and under light, then derives the standard solar
//! cell figures of merit (Voc, Isc, Wmpp, FF, PCE) from the illuminated
//! curve and exports everything as CSV.
//!
//! ## Crate Structure
//!
//! - **`config`**: TOML + environment configuration loading and validation.
//! - **`error`**: the crate-wide `BenchError` enum.
//! - **`logging`**: tracing subscriber setup.
//! - **`sweep`**: voltage sequence planning and the instrument sweep program.
//! - **`hardware`**: SMU and relay sessions — transport traits, the
//!   Keithley 2400 driver, the validating device switch, and mock hardware.
//! - **`run`**: the per-device measurement cycle and the run controller.
//! - **`analysis`**: I–V curve characterization.
//! - **`export`**: CSV export of one run.
//!
//! The whole bench is sequential by design: both hardware sessions are
//! exclusively owned, operations block until the instrument replies, and
//! devices are measured one at a time.

pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod hardware;
pub mod logging;
pub mod run;
pub mod sweep;
