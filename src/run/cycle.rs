//! Per-device measurement cycle.
//!
//! One cycle measures one device twice, dark then illuminated, through a
//! fixed order of hardware operations:
//!
//! 1. shutter closed (safety default before any channel is connected)
//! 2. device channel connected
//! 3. SMU output on
//! 4. dark sweep
//! 5. shutter open, light sweep
//! 6. shutter closed
//! 7. device channel disconnected
//! 8. SMU output off
//!
//! The order is significant and must not be rearranged: connecting a device
//! under illumination or leaving it biased between steps can degrade it. On
//! any failure the cycle drives the bench back to a safe state (shutter
//! closed, channel disconnected, output off) before propagating the error.

use tracing::{debug, warn};

use crate::analysis::{Illumination, RawCurve};
use crate::error::{BenchError, BenchResult};
use crate::hardware::smu::SmuSession;
use crate::hardware::switch::DeviceSwitch;
use crate::sweep::SweepPlan;

/// The two curves one device cycle produces.
#[derive(Debug, Clone)]
pub struct DeviceCurves {
    /// Sweep with the shutter closed.
    pub dark: RawCurve,
    /// Sweep under illumination.
    pub light: RawCurve,
}

/// Executes the per-device cycle against the two hardware sessions.
pub struct SweepRunner<'a> {
    smu: &'a mut dyn SmuSession,
    switch: &'a mut DeviceSwitch,
}

impl<'a> SweepRunner<'a> {
    /// Borrow the two exclusively-owned hardware sessions for one cycle.
    pub fn new(smu: &'a mut dyn SmuSession, switch: &'a mut DeviceSwitch) -> Self {
        Self { smu, switch }
    }

    /// Run the full cycle for one device channel.
    ///
    /// # Errors
    ///
    /// [`BenchError::Acquisition`] if either sweep returns a sample count
    /// different from the plan's point count; transport errors pass through.
    /// In both cases the bench is returned to a safe state first, best
    /// effort, without masking the original error.
    pub async fn run_device_cycle(
        &mut self,
        channel: u8,
        plan: &SweepPlan,
    ) -> BenchResult<DeviceCurves> {
        let result = self.cycle(channel, plan).await;
        if result.is_err() {
            self.make_safe(channel).await;
        }
        result
    }

    async fn cycle(&mut self, channel: u8, plan: &SweepPlan) -> BenchResult<DeviceCurves> {
        self.switch.set_illumination(0).await?;
        self.switch.select_channel(channel, 1).await?;
        self.smu.set_output(true).await?;

        debug!(channel, "Acquiring dark curve");
        let dark = self.acquire(channel, plan, Illumination::Dark).await?;

        self.switch.set_illumination(1).await?;
        debug!(channel, "Acquiring light curve");
        let light = self.acquire(channel, plan, Illumination::Light).await?;
        self.switch.set_illumination(0).await?;

        self.switch.select_channel(channel, 0).await?;
        self.smu.set_output(false).await?;

        Ok(DeviceCurves { dark, light })
    }

    /// Execute one configured sweep and pair its currents with the planned
    /// set-points.
    async fn acquire(
        &mut self,
        channel: u8,
        plan: &SweepPlan,
        illumination: Illumination,
    ) -> BenchResult<RawCurve> {
        let samples = self.smu.read().await?;
        if samples.len() != plan.points() {
            return Err(BenchError::Acquisition {
                channel,
                expected: plan.points(),
                actual: samples.len(),
            });
        }
        Ok(RawCurve {
            channel,
            illumination,
            voltage: plan.voltages().to_vec(),
            current: samples.iter().map(|s| s.current).collect(),
        })
    }

    /// Best-effort safe-state shutdown: shutter closed, channel
    /// disconnected, output off. Failures here are logged, not raised — the
    /// original error is the one the operator needs to see.
    async fn make_safe(&mut self, channel: u8) {
        if let Err(e) = self.switch.set_illumination(0).await {
            warn!(error = %e, "Safe-state shutdown: failed to close shutter");
        }
        if let Err(e) = self.switch.select_channel(channel, 0).await {
            warn!(error = %e, channel, "Safe-state shutdown: failed to disconnect channel");
        }
        if let Err(e) = self.smu.set_output(false).await {
            warn!(error = %e, "Safe-state shutdown: failed to disable output");
        }
    }
}
