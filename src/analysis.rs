//! I–V curve characterization.
//!
//! Given one illuminated sweep, [`characterize`] derives the standard solar
//! cell figures of merit: open-circuit voltage, short-circuit current,
//! maximum power point, fill factor, and power-conversion efficiency. The
//! function is pure; calling it twice on the same curve yields identical
//! metrics.
//!
//! Sign convention: photocurrent is negative, so power delivered by the cell
//! is `-current * voltage` and is positive in the power-producing quadrant.
//!
//! No smoothing, curve fitting, or outlier rejection is applied. The root
//! lookups assume the measured curve crosses zero exactly once in each
//! relevant domain; a curve with no crossing extrapolates linearly from the
//! edge segment and yields a value outside the sampled range rather than an
//! error.

use serde::Serialize;

use crate::sweep::{SweepConfig, SweepDirection};

/// Illumination state a curve was acquired under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Illumination {
    /// Shutter closed.
    Dark,
    /// Shutter open.
    Light,
}

/// One acquired sweep: parallel voltage/current samples in acquisition
/// order, tagged with the device channel and illumination state.
#[derive(Debug, Clone)]
pub struct RawCurve {
    /// One-based device channel the curve was measured on.
    pub channel: u8,
    /// Illumination state during the sweep.
    pub illumination: Illumination,
    /// Voltage set-points in acquisition order.
    pub voltage: Vec<f64>,
    /// Measured currents, parallel to `voltage`.
    pub current: Vec<f64>,
}

/// Figures of merit for one device, derived from its illuminated curve.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeviceMetrics {
    /// One-based device channel.
    pub channel: u8,
    /// Open-circuit voltage in volts.
    pub voc: f64,
    /// Short-circuit current in amperes (negative by convention).
    pub isc: f64,
    /// Power at the maximum power point, in watts.
    pub wmpp: f64,
    /// Fill factor in percent.
    pub ff: f64,
    /// Power-conversion efficiency in percent.
    pub pce: f64,
}

/// Linear interpolation of `ys` at `x` over an ascending domain `xs`.
///
/// Outside the sampled domain the edge segment is extended linearly, so a
/// query beyond the data returns an out-of-range value instead of failing.
/// The domain must be ascending; a descending domain silently produces
/// nonsense, which is why callers normalize sample order first.
fn interp_at(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    match xs.len() {
        0 => f64::NAN,
        1 => ys[0],
        _ => {
            let mut hi = xs.len() - 1;
            for (i, &xv) in xs.iter().enumerate() {
                if xv >= x {
                    hi = i.max(1);
                    break;
                }
            }
            let lo = hi - 1;
            let dx = xs[hi] - xs[lo];
            if dx == 0.0 {
                return ys[lo];
            }
            ys[lo] + (x - xs[lo]) * (ys[hi] - ys[lo]) / dx
        }
    }
}

/// Derive [`DeviceMetrics`] from an illuminated curve.
///
/// * `irradiance` — incident power density, same area unit as `area`.
/// * `area` — active device area.
///
/// Voc is the root of current over voltage, found in the current domain;
/// Isc is the root of voltage over current, found in the voltage domain.
/// Both lookups run over the ascending-voltage ordering of the samples: a
/// `Reverse` acquisition reverses voltage and current together first. The
/// two arrays are never reversed independently — a half-reversed pair
/// interpolates against a scrambled domain and returns garbage without any
/// error signal.
pub fn characterize(
    curve: &RawCurve,
    config: &SweepConfig,
    irradiance: f64,
    area: f64,
) -> DeviceMetrics {
    let wmpp = curve
        .voltage
        .iter()
        .zip(&curve.current)
        .map(|(v, i)| -i * v)
        .fold(f64::NEG_INFINITY, f64::max);

    let (volts, amps): (Vec<f64>, Vec<f64>) = match config.direction {
        SweepDirection::Forward => (curve.voltage.clone(), curve.current.clone()),
        SweepDirection::Reverse => (
            curve.voltage.iter().rev().copied().collect(),
            curve.current.iter().rev().copied().collect(),
        ),
    };

    let voc = interp_at(0.0, &amps, &volts);
    let isc = interp_at(0.0, &volts, &amps);
    let ff = wmpp / (-isc * voc) * 100.0;
    let pce = 100.0 * wmpp / (irradiance * area);

    DeviceMetrics {
        channel: curve.channel,
        voc,
        isc,
        wmpp,
        ff,
        pce,
    }
}
