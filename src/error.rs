//! Custom error types for the bench controller.
//!
//! This module defines the primary error type, `BenchError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different failure classes of an acquisition
//! run:
//!
//! - **`InvalidRange`**: semantically bad sweep bounds (non-positive step,
//!   inverted limits). Raised before any hardware I/O happens.
//! - **`Acquisition`**: the instrument returned a different number of samples
//!   than the configured sweep. This aborts the whole run; a malformed reply
//!   indicates a session-level problem the operator must address, not a
//!   transient hazard, so nothing is retried.
//! - **`MalformedReply`**: an instrument reply that could not be parsed at
//!   all. Same severity as `Acquisition`.
//! - **`Config` / `ConfigFile` / `Io` / `Csv`**: ambient failures from
//!   configuration loading, validation, and export.
//! - **`Instrument`**: communication failures from the SMU or relay
//!   transports.
//!
//! Invalid channel or illumination selectors are deliberately *not* an error
//! variant: the switch recovers them with a documented fallback and reports
//! the correction through its outcome type (see [`crate::hardware::switch`]).

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type BenchResult<T> = std::result::Result<T, BenchError>;

/// Failure classes of the bench controller.
#[derive(Error, Debug)]
pub enum BenchError {
    /// Sweep bounds that can never produce a valid voltage sequence.
    #[error("Invalid sweep range: {0}")]
    InvalidRange(String),

    /// Sample-count mismatch between the configured sweep and the reply.
    #[error("Acquisition failed on channel {channel}: expected {expected} samples, got {actual}")]
    Acquisition {
        /// Device channel whose sweep produced the mismatch.
        channel: u8,
        /// Sample count the sweep plan configured.
        expected: usize,
        /// Sample count actually returned by the instrument.
        actual: usize,
    },

    /// An instrument reply that could not be parsed.
    #[error("Malformed instrument reply: {0}")]
    MalformedReply(String),

    /// Communication failure on the SMU or relay session.
    #[error("Instrument error: {0}")]
    Instrument(String),

    /// Semantic configuration error caught during validation.
    #[error("Configuration validation error: {0}")]
    Config(String),

    /// Configuration file parsing error.
    #[error("Configuration error: {0}")]
    ConfigFile(#[from] figment::Error),

    /// File and serial I/O failures.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV export failures.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Export-stage failures that are not plain I/O.
    #[error("Export error: {0}")]
    Export(String),

    /// Functionality compiled out via feature flags.
    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquisition_error_names_the_channel() {
        let err = BenchError::Acquisition {
            channel: 5,
            expected: 71,
            actual: 70,
        };
        let msg = err.to_string();
        assert!(msg.contains("channel 5"));
        assert!(msg.contains("71"));
        assert!(msg.contains("70"));
    }

    #[test]
    fn io_errors_convert_via_from() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "no reply");
        let err: BenchError = io.into();
        assert!(matches!(err, BenchError::Io(_)));
    }
}
