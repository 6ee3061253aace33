//! End-to-end run tests against the mock bench.

use std::time::Duration;

use solariv::config::{
    ApplicationSettings, BenchConfig, BenchSettings, OutputSettings, RelaySettings, SampleInfo,
    SmuSettings,
};
use solariv::error::BenchError;
use solariv::hardware::mock::MockBench;
use solariv::hardware::smu::Sample;
use solariv::hardware::switch::DeviceSwitch;
use solariv::run::RunController;
use solariv::sweep::{SweepConfig, SweepDirection};

fn bench_config(channels: Vec<u8>) -> BenchConfig {
    BenchConfig {
        application: ApplicationSettings::default(),
        sweep: SweepConfig {
            v_min: -0.2,
            v_max: 1.2,
            v_step: 0.02,
            direction: SweepDirection::Reverse,
            source_delay_s: 0.1,
        },
        bench: BenchSettings {
            channels,
            irradiance_w_cm2: 100.7e-3,
            active_area_cm2: 0.0256,
        },
        sample: SampleInfo::default(),
        smu: SmuSettings {
            resource: "GPIB0::24::INSTR".to_string(),
            timeout_ms: 500_000,
            compliance_a: 0.01,
            current_range_a: 0.01,
        },
        relay: RelaySettings {
            port: "/dev/null".to_string(),
            baud_rate: 9600,
            timeout_ms: 1_000,
        },
        output: OutputSettings::default(),
    }
}

#[tokio::test]
async fn full_mock_run_produces_metrics_per_device() {
    let config = bench_config(vec![1, 2]);
    let (smu, relay, log) = MockBench::new();
    let switch = DeviceSwitch::new(Box::new(relay), config.bench.channels.clone())
        .with_settle(Duration::ZERO);

    let mut controller = RunController::new(Box::new(smu), switch);
    let result = controller.execute(&config).await.unwrap();

    assert_eq!(result.curves.len(), 2);
    assert_eq!(result.metrics.len(), 2);
    for (curves, metrics) in result.curves.iter().zip(&result.metrics) {
        assert_eq!(curves.dark.voltage.len(), 71);
        assert_eq!(curves.light.voltage.len(), 71);
        assert_eq!(curves.dark.channel, metrics.channel);

        // The mock cell sinks its photocurrent at 0 V and turns off a bit
        // above 1 V; the derived figures should land in that neighborhood.
        assert!((metrics.isc - (-0.02)).abs() < 1e-3, "isc {}", metrics.isc);
        assert!(
            metrics.voc > 0.9 && metrics.voc < 1.2,
            "voc {}",
            metrics.voc
        );
        assert!(metrics.wmpp > 0.0);
        assert!(
            metrics.ff > 25.0 && metrics.ff < 100.0,
            "ff {}",
            metrics.ff
        );
        assert!(metrics.pce > 0.0);
    }

    // The SMU is identified, reset, and programmed once, before any cycle.
    let entries = log.lock().unwrap().clone();
    assert_eq!(
        &entries[..3],
        ["smu identify", "smu reset", "smu configure 71"]
    );

    // Runs are sequential: both devices' cycles appear in channel order.
    let selects: Vec<String> = entries
        .iter()
        .filter(|e| e.ends_with(" 1") && e.starts_with("relay") && !e.starts_with("relay 19"))
        .cloned()
        .collect();
    assert_eq!(selects, ["relay 0 1", "relay 1 1"]);
}

#[tokio::test]
async fn acquisition_failure_aborts_the_whole_run() {
    let config = bench_config(vec![1, 2, 3]);
    let (mut smu, relay, _log) = MockBench::new();
    // The first device's dark sweep comes back empty: the run must stop
    // there rather than skip ahead to the remaining devices.
    smu.queue_reading(Vec::new());
    let switch = DeviceSwitch::new(Box::new(relay), config.bench.channels.clone())
        .with_settle(Duration::ZERO);

    let mut controller = RunController::new(Box::new(smu), switch);
    let err = controller.execute(&config).await.unwrap_err();

    match err {
        BenchError::Acquisition {
            channel, expected, ..
        } => {
            assert_eq!(channel, 1);
            assert_eq!(expected, 71);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn truncated_reading_names_the_offending_channel() {
    let config = bench_config(vec![4]);
    let (mut smu, relay, _log) = MockBench::new();
    let truncated: Vec<Sample> = (0..70)
        .map(|i| Sample {
            voltage: 1.2 - 0.02 * i as f64,
            current: -0.02,
            resistance: 9.91e37,
            timestamp: 0.0,
            status: 0.0,
        })
        .collect();
    smu.queue_reading(truncated);

    let switch = DeviceSwitch::new(Box::new(relay), config.bench.channels.clone())
        .with_settle(Duration::ZERO);
    let mut controller = RunController::new(Box::new(smu), switch);
    let err = controller.execute(&config).await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("channel 4"), "message: {}", message);
    assert!(message.contains("70"), "message: {}", message);
}
