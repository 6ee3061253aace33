//! Bench configuration loading.
//!
//! Configuration is loaded from a TOML file merged with environment
//! variables prefixed `SOLARIV_`, with `__` separating nesting levels
//! (e.g. `SOLARIV_APPLICATION__LOG_LEVEL=debug`), then validated before any
//! hardware is touched. Instrument addresses (VISA resource, serial port)
//! live here, not in the measurement logic.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BenchError, BenchResult};
use crate::sweep::SweepConfig;

/// Highest relay index usable for a device channel. The illumination
/// shutter sits on a reserved wire index above this range.
pub const MAX_DEVICE_CHANNEL: u8 = 8;

/// Top-level bench configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Application-level settings.
    #[serde(default)]
    pub application: ApplicationSettings,
    /// Sweep bounds and direction.
    pub sweep: SweepConfig,
    /// Device set and optical reference values.
    pub bench: BenchSettings,
    /// Labels identifying the sample under test.
    #[serde(default)]
    pub sample: SampleInfo,
    /// SMU session settings.
    pub smu: SmuSettings,
    /// Relay board session settings.
    pub relay: RelaySettings,
    /// Export settings.
    #[serde(default)]
    pub output: OutputSettings,
}

/// Application-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Device set and optical reference values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchSettings {
    /// One-based device channels to measure, in run order.
    #[serde(default = "default_channels")]
    pub channels: Vec<u8>,
    /// Incident irradiance in W/cm².
    pub irradiance_w_cm2: f64,
    /// Active device area in cm².
    pub active_area_cm2: f64,
}

/// Labels identifying the sample under test, used in export naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleInfo {
    /// Absorber/material label, e.g. "MAPI".
    #[serde(default = "default_material")]
    pub material: String,
    /// Fabrication batch number.
    #[serde(default = "default_one")]
    pub batch: u32,
    /// Sample number within the batch.
    #[serde(default = "default_one")]
    pub sample: u32,
    /// Run number on this sample.
    #[serde(default = "default_one")]
    pub run: u32,
}

impl Default for SampleInfo {
    fn default() -> Self {
        Self {
            material: default_material(),
            batch: 1,
            sample: 1,
            run: 1,
        }
    }
}

impl SampleInfo {
    /// Compact label used in export file names, e.g. `MAPI_B1S12R1`.
    pub fn label(&self) -> String {
        format!(
            "{}_B{}S{}R{}",
            self.material, self.batch, self.sample, self.run
        )
    }
}

/// SMU session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmuSettings {
    /// VISA resource string, e.g. `GPIB0::24::INSTR`.
    pub resource: String,
    /// Session timeout in milliseconds. A full sweep completes within one
    /// `READ?`, so this must cover the whole sweep duration.
    #[serde(default = "default_smu_timeout")]
    pub timeout_ms: u64,
    /// Current compliance limit in amperes.
    #[serde(default = "default_current_limit")]
    pub compliance_a: f64,
    /// Fixed current measurement range in amperes.
    #[serde(default = "default_current_limit")]
    pub current_range_a: f64,
}

/// Relay board session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Serial port name, e.g. `/dev/ttyACM0` or `COM9`.
    pub port: String,
    /// Serial baud rate.
    #[serde(default = "default_baud")]
    pub baud_rate: u32,
    /// Read timeout for acknowledgement lines, in milliseconds.
    #[serde(default = "default_relay_timeout")]
    pub timeout_ms: u64,
}

/// Export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Directory run folders are created under.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_channels() -> Vec<u8> {
    (1..=MAX_DEVICE_CHANNEL).collect()
}

fn default_material() -> String {
    "unknown".to_string()
}

fn default_one() -> u32 {
    1
}

fn default_smu_timeout() -> u64 {
    500_000
}

fn default_current_limit() -> f64 {
    0.01
}

fn default_baud() -> u32 {
    9600
}

fn default_relay_timeout() -> u64 {
    1_000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

impl BenchConfig {
    /// Load configuration from a TOML file merged with `SOLARIV_`-prefixed
    /// environment variables (`__` separates nesting levels).
    pub fn load_from<P: AsRef<Path>>(path: P) -> BenchResult<Self> {
        let config: Self = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SOLARIV_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Validate configuration after loading.
    ///
    /// Sweep bounds are checked again when the plan is built; this catches
    /// everything else before any hardware is opened.
    pub fn validate(&self) -> BenchResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(BenchError::Config(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.bench.channels.is_empty() {
            return Err(BenchError::Config(
                "No device channels configured".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for &channel in &self.bench.channels {
            if channel == 0 || channel > MAX_DEVICE_CHANNEL {
                return Err(BenchError::Config(format!(
                    "Device channel {} outside 1..={}",
                    channel, MAX_DEVICE_CHANNEL
                )));
            }
            if !seen.insert(channel) {
                return Err(BenchError::Config(format!(
                    "Duplicate device channel: {}",
                    channel
                )));
            }
        }

        if !(self.bench.irradiance_w_cm2 > 0.0) {
            return Err(BenchError::Config(format!(
                "Irradiance must be positive, got {}",
                self.bench.irradiance_w_cm2
            )));
        }
        if !(self.bench.active_area_cm2 > 0.0) {
            return Err(BenchError::Config(format!(
                "Active area must be positive, got {}",
                self.bench.active_area_cm2
            )));
        }

        if !(self.smu.compliance_a > 0.0) || !(self.smu.current_range_a > 0.0) {
            return Err(BenchError::Config(
                "SMU compliance and range must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
