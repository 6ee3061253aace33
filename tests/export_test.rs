//! Export tests: one run folder, four tables, one metadata sidecar.

use std::fs;

use solariv::analysis::{DeviceMetrics, Illumination, RawCurve};
use solariv::config::SampleInfo;
use solariv::export::export_run;
use solariv::run::{DeviceCurves, RunResult};
use solariv::sweep::{SweepConfig, SweepDirection};

fn curve(channel: u8, illumination: Illumination, scale: f64) -> RawCurve {
    RawCurve {
        channel,
        illumination,
        voltage: vec![0.2, 0.1, 0.0],
        current: vec![0.001 * scale, -0.009 * scale, -0.02 * scale],
    }
}

fn small_run() -> RunResult {
    let channels = [3u8, 7u8];
    RunResult {
        sweep: SweepConfig {
            v_min: 0.0,
            v_max: 0.2,
            v_step: 0.1,
            direction: SweepDirection::Reverse,
            source_delay_s: 0.1,
        },
        curves: channels
            .iter()
            .map(|&ch| DeviceCurves {
                dark: curve(ch, Illumination::Dark, 0.01),
                light: curve(ch, Illumination::Light, 1.0),
            })
            .collect(),
        metrics: channels
            .iter()
            .map(|&ch| DeviceMetrics {
                channel: ch,
                voc: 0.15,
                isc: -0.02,
                wmpp: 0.002,
                ff: 66.7,
                pce: 77.6,
            })
            .collect(),
    }
}

fn sample() -> SampleInfo {
    SampleInfo {
        material: "MAPI".to_string(),
        batch: 1,
        sample: 12,
        run: 1,
    }
}

#[test]
fn export_writes_all_tables() {
    let dir = tempfile::tempdir().unwrap();
    let folder = export_run(&small_run(), &sample(), dir.path()).unwrap();

    assert!(folder.is_dir());
    for name in [
        "MAPI_B1S12R1_specs.csv",
        "MAPI_B1S12R1_dark_current.csv",
        "MAPI_B1S12R1_light_current.csv",
        "MAPI_B1S12R1_stats.csv",
        "run.json",
    ] {
        assert!(folder.join(name).is_file(), "missing {}", name);
    }
}

#[test]
fn current_tables_have_one_column_per_device() {
    let dir = tempfile::tempdir().unwrap();
    let folder = export_run(&small_run(), &sample(), dir.path()).unwrap();

    let text = fs::read_to_string(folder.join("MAPI_B1S12R1_light_current.csv")).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next().unwrap(), "Voltage,Pin 3,Pin 7");
    // Three sweep points, in acquisition order (reverse scan: 0.2 first).
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].starts_with("0.2,"));
    assert!(rows[2].starts_with("0,"));
}

#[test]
fn stats_table_is_one_row_per_figure() {
    let dir = tempfile::tempdir().unwrap();
    let folder = export_run(&small_run(), &sample(), dir.path()).unwrap();

    let text = fs::read_to_string(folder.join("MAPI_B1S12R1_stats.csv")).unwrap();
    let first_fields: Vec<String> = text
        .lines()
        .map(|l| l.split(',').next().unwrap_or("").to_string())
        .collect();
    assert_eq!(first_fields, ["Pins", "Voc", "Isc", "Wmpp", "FF", "PCE"]);
    let pins_line = text.lines().next().unwrap();
    assert_eq!(pins_line, "Pins,3,7");
}

#[test]
fn specs_table_reflects_acquisition_order() {
    let dir = tempfile::tempdir().unwrap();
    let folder = export_run(&small_run(), &sample(), dir.path()).unwrap();

    let text = fs::read_to_string(folder.join("MAPI_B1S12R1_specs.csv")).unwrap();
    let mut lines = text.lines();
    // Reverse scan: the sweep starts at the top of the range.
    assert_eq!(lines.next().unwrap(), "Vstart,0.2");
    assert_eq!(lines.next().unwrap(), "Vend,0");
}

#[test]
fn metadata_sidecar_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let folder = export_run(&small_run(), &sample(), dir.path()).unwrap();

    let text = fs::read_to_string(folder.join("run.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["sample"]["material"], "MAPI");
    assert_eq!(value["channels"], serde_json::json!([3, 7]));
    assert_eq!(value["sweep"]["direction"], "reverse");
}

#[test]
fn empty_run_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let run = RunResult {
        sweep: small_run().sweep,
        curves: Vec::new(),
        metrics: Vec::new(),
    };
    assert!(export_run(&run, &sample(), dir.path()).is_err());
}
