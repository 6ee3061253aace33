//! Run orchestration over all configured devices.

use tracing::info;

use crate::analysis::{characterize, DeviceMetrics};
use crate::config::BenchConfig;
use crate::error::BenchResult;
use crate::hardware::smu::SmuSession;
use crate::hardware::switch::DeviceSwitch;
use crate::run::cycle::{DeviceCurves, SweepRunner};
use crate::sweep::{SweepConfig, SweepPlan};

/// Everything one acquisition session produced, ready for export.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// The sweep definition the run used.
    pub sweep: SweepConfig,
    /// Dark and light curves per device, in run order.
    pub curves: Vec<DeviceCurves>,
    /// Figures of merit per device, parallel to `curves`.
    pub metrics: Vec<DeviceMetrics>,
}

/// Drives the whole run: one SMU program, then device cycles in the
/// configured order, characterizing each light curve as it arrives.
///
/// A failed cycle aborts the run; there is no per-device skip-and-continue.
/// The failed cycle has already returned the bench to a safe state by the
/// time the error propagates.
pub struct RunController {
    smu: Box<dyn SmuSession>,
    switch: DeviceSwitch,
}

impl RunController {
    /// Take exclusive ownership of the two hardware sessions.
    pub fn new(smu: Box<dyn SmuSession>, switch: DeviceSwitch) -> Self {
        Self { smu, switch }
    }

    /// Execute one acquisition session over the configured channels.
    pub async fn execute(&mut self, config: &BenchConfig) -> BenchResult<RunResult> {
        let plan = SweepPlan::build(config.sweep.clone())?;

        let identity = self.smu.identify().await?;
        info!(instrument = %identity, "Connected to SMU");

        self.smu.reset().await?;
        self.smu
            .configure(&plan.sweep_params(config.smu.compliance_a, config.smu.current_range_a))
            .await?;

        let mut curves = Vec::with_capacity(config.bench.channels.len());
        let mut metrics = Vec::with_capacity(config.bench.channels.len());

        for &channel in &config.bench.channels {
            info!(channel, "Measuring device");
            let device = SweepRunner::new(self.smu.as_mut(), &mut self.switch)
                .run_device_cycle(channel, &plan)
                .await?;

            let m = characterize(
                &device.light,
                plan.config(),
                config.bench.irradiance_w_cm2,
                config.bench.active_area_cm2,
            );
            info!(
                channel,
                voc_v = m.voc,
                isc_a = m.isc,
                wmpp_w = m.wmpp,
                ff_pct = m.ff,
                pce_pct = m.pce,
                "Device characterized"
            );

            curves.push(device);
            metrics.push(m);
        }

        Ok(RunResult {
            sweep: config.sweep.clone(),
            curves,
            metrics,
        })
    }
}
