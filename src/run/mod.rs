//! Acquisition orchestration.
//!
//! [`cycle`] runs the fixed per-device measurement protocol; [`controller`]
//! iterates it over the configured devices and assembles the run's result
//! set.

pub mod controller;
pub mod cycle;

pub use controller::{RunController, RunResult};
pub use cycle::{DeviceCurves, SweepRunner};
