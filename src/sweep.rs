//! Voltage sweep planning.
//!
//! A [`SweepPlan`] turns user-facing sweep bounds into the ordered list of
//! voltage set-points for one acquisition and the matching instrument-facing
//! sweep program ([`SweepParams`]). The plan is built once per run and is
//! immutable afterwards: every device in the run is swept with the same
//! sequence, so curve lengths and orderings are fixed for the run's lifetime.

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, BenchResult};

/// Scan direction of the voltage sweep.
///
/// `Reverse` presents the same set-points as `Forward`, in reverse order.
/// It is an ordering choice, not a different sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepDirection {
    /// Ascending voltage, `v_min` first.
    Forward,
    /// Descending voltage, `v_max` first.
    Reverse,
}

/// User-facing sweep definition, loaded from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Lower sweep bound in volts.
    pub v_min: f64,
    /// Upper sweep bound in volts.
    pub v_max: f64,
    /// Step between set-points in volts. Must be positive.
    pub v_step: f64,
    /// Scan direction.
    pub direction: SweepDirection,
    /// Instrument source delay per point, in seconds.
    #[serde(default = "default_source_delay")]
    pub source_delay_s: f64,
}

fn default_source_delay() -> f64 {
    0.1
}

/// Point spacing of the programmed instrument sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spacing {
    /// Evenly spaced set-points.
    Linear,
}

/// Instrument-facing sweep program derived from a [`SweepPlan`].
///
/// `start`/`stop` match the first/last element of the voltage sequence, so
/// the physical sweep executes in the same order the plan reports.
#[derive(Debug, Clone)]
pub struct SweepParams {
    /// First sourced voltage.
    pub start: f64,
    /// Last sourced voltage.
    pub stop: f64,
    /// Number of sweep points; also used as the trigger count.
    pub points: usize,
    /// Set-point spacing.
    pub spacing: Spacing,
    /// Source delay per point, in seconds.
    pub source_delay_s: f64,
    /// Current compliance limit in amperes.
    pub compliance_a: f64,
    /// Fixed current measurement range in amperes.
    pub current_range_a: f64,
}

/// Ordered voltage sequence plus the sweep definition it was built from.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    config: SweepConfig,
    voltages: Vec<f64>,
}

impl SweepPlan {
    /// Build the voltage sequence for a sweep definition.
    ///
    /// The ascending sequence runs from `v_min` to `v_max` inclusive. The
    /// upper bound test allows half a step of slack so that floating-point
    /// accumulation never drops the `v_max` endpoint. For a `Reverse` sweep
    /// the ascending sequence is reversed; the value set is identical in
    /// both directions.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::InvalidRange`] if `v_step <= 0` or
    /// `v_min > v_max`.
    pub fn build(config: SweepConfig) -> BenchResult<Self> {
        if !(config.v_step > 0.0) {
            return Err(BenchError::InvalidRange(format!(
                "v_step must be positive, got {}",
                config.v_step
            )));
        }
        if config.v_min > config.v_max {
            return Err(BenchError::InvalidRange(format!(
                "v_min ({}) exceeds v_max ({})",
                config.v_min, config.v_max
            )));
        }

        // Half-step inclusive upper bound, computed by index rather than by
        // accumulating the step, so the endpoint lands exactly once.
        let span = config.v_max + config.v_step / 2.0 - config.v_min;
        let count = (span / config.v_step).ceil().max(1.0) as usize;
        let mut voltages: Vec<f64> = (0..count)
            .map(|i| config.v_min + i as f64 * config.v_step)
            .collect();

        if config.direction == SweepDirection::Reverse {
            voltages.reverse();
        }

        Ok(Self { config, voltages })
    }

    /// The voltage set-points in acquisition order.
    pub fn voltages(&self) -> &[f64] {
        &self.voltages
    }

    /// Number of sweep points.
    pub fn points(&self) -> usize {
        self.voltages.len()
    }

    /// The sweep definition this plan was built from.
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Derive the instrument sweep program for this plan.
    ///
    /// The start/stop order follows the scan direction so the physical sweep
    /// matches `voltages()` element for element.
    pub fn sweep_params(&self, compliance_a: f64, current_range_a: f64) -> SweepParams {
        let (start, stop) = match self.config.direction {
            SweepDirection::Forward => (self.config.v_min, self.config.v_max),
            SweepDirection::Reverse => (self.config.v_max, self.config.v_min),
        };
        SweepParams {
            start,
            stop,
            points: self.voltages.len(),
            spacing: Spacing::Linear,
            source_delay_s: self.config.source_delay_s,
            compliance_a,
            current_range_a,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(v_min: f64, v_max: f64, v_step: f64, direction: SweepDirection) -> SweepConfig {
        SweepConfig {
            v_min,
            v_max,
            v_step,
            direction,
            source_delay_s: 0.1,
        }
    }

    #[test]
    fn forward_sequence_covers_both_endpoints() {
        let plan = SweepPlan::build(config(-0.2, 1.2, 0.02, SweepDirection::Forward)).unwrap();
        let v = plan.voltages();
        assert_eq!(v.len(), 71);
        assert!((v[0] - (-0.2)).abs() < 1e-9);
        assert!((v[70] - 1.2).abs() < 1e-9);
    }

    #[test]
    fn sequence_length_matches_step_count() {
        let plan = SweepPlan::build(config(0.0, 1.0, 0.1, SweepDirection::Forward)).unwrap();
        assert_eq!(plan.points(), 11);
    }

    #[test]
    fn reverse_is_exact_reversal_of_forward() {
        let fwd = SweepPlan::build(config(-0.2, 1.2, 0.02, SweepDirection::Forward)).unwrap();
        let rev = SweepPlan::build(config(-0.2, 1.2, 0.02, SweepDirection::Reverse)).unwrap();
        let mut flipped: Vec<f64> = fwd.voltages().to_vec();
        flipped.reverse();
        assert_eq!(rev.voltages(), flipped.as_slice());
    }

    #[test]
    fn endpoint_survives_float_accumulation() {
        // 0.0..=0.7 in 0.1 steps is a classic accumulation trap.
        let plan = SweepPlan::build(config(0.0, 0.7, 0.1, SweepDirection::Forward)).unwrap();
        assert_eq!(plan.points(), 8);
        assert!((plan.voltages()[7] - 0.7).abs() < 1e-9);
    }

    #[test]
    fn zero_span_sweep_is_a_single_point() {
        let plan = SweepPlan::build(config(0.5, 0.5, 0.1, SweepDirection::Forward)).unwrap();
        assert_eq!(plan.voltages(), &[0.5]);
    }

    #[test]
    fn rejects_non_positive_step() {
        let err = SweepPlan::build(config(0.0, 1.0, 0.0, SweepDirection::Forward)).unwrap_err();
        assert!(matches!(err, BenchError::InvalidRange(_)));
        let err = SweepPlan::build(config(0.0, 1.0, -0.1, SweepDirection::Forward)).unwrap_err();
        assert!(matches!(err, BenchError::InvalidRange(_)));
    }

    #[test]
    fn rejects_inverted_bounds() {
        let err = SweepPlan::build(config(1.0, 0.0, 0.1, SweepDirection::Forward)).unwrap_err();
        assert!(matches!(err, BenchError::InvalidRange(_)));
    }

    #[test]
    fn sweep_params_follow_direction() {
        let fwd = SweepPlan::build(config(-0.2, 1.2, 0.02, SweepDirection::Forward)).unwrap();
        let params = fwd.sweep_params(0.01, 0.01);
        assert_eq!(params.start, -0.2);
        assert_eq!(params.stop, 1.2);
        assert_eq!(params.points, 71);

        let rev = SweepPlan::build(config(-0.2, 1.2, 0.02, SweepDirection::Reverse)).unwrap();
        let params = rev.sweep_params(0.01, 0.01);
        assert_eq!(params.start, 1.2);
        assert_eq!(params.stop, -0.2);
        assert!((params.start - rev.voltages()[0]).abs() < 1e-9);
        assert!((params.stop - rev.voltages()[70]).abs() < 1e-9);
    }
}
