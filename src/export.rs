//! CSV export of one run.
//!
//! Each run lands in its own timestamped folder under the configured output
//! directory. The folder holds one CSV per table the bench operators work
//! with — sweep specs, dark currents, light currents, per-device stats —
//! plus a `run.json` metadata sidecar. Re-running within the same minute
//! recreates the folder, matching the bench's long-standing convention.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tracing::info;

use crate::config::SampleInfo;
use crate::error::{BenchError, BenchResult};
use crate::run::RunResult;
use crate::sweep::SweepConfig;

#[derive(Serialize)]
struct RunMetadata<'a> {
    exported_at: String,
    sample: &'a SampleInfo,
    sweep: &'a SweepConfig,
    channels: Vec<u8>,
}

/// Write one run to a fresh timestamped folder, returning its path.
pub fn export_run(
    result: &RunResult,
    sample: &SampleInfo,
    output_dir: &Path,
) -> BenchResult<PathBuf> {
    if result.curves.is_empty() {
        return Err(BenchError::Export("Nothing to export: empty run".to_string()));
    }

    let folder = output_dir.join(Local::now().format("%Y-%m-%d-%H.%M").to_string());
    if folder.exists() {
        fs::remove_dir_all(&folder)?;
    }
    fs::create_dir_all(&folder)?;

    let label = sample.label();
    write_specs(&folder, &label, result)?;
    write_currents(&folder, &format!("{}_dark_current.csv", label), result, |c| {
        &c.dark.current
    })?;
    write_currents(&folder, &format!("{}_light_current.csv", label), result, |c| {
        &c.light.current
    })?;
    write_stats(&folder, &label, result)?;
    write_metadata(&folder, sample, result)?;

    info!(folder = %folder.display(), "Run exported");
    Ok(folder)
}

fn write_specs(folder: &Path, label: &str, result: &RunResult) -> BenchResult<()> {
    let voltages = &result.curves[0].dark.voltage;
    let mut writer = csv::Writer::from_path(folder.join(format!("{}_specs.csv", label)))?;
    let rows = [
        ("Vstart", voltages[0].to_string()),
        ("Vend", voltages[voltages.len() - 1].to_string()),
        ("Vstep", result.sweep.v_step.to_string()),
        ("Delay", result.sweep.source_delay_s.to_string()),
    ];
    for (name, value) in rows {
        writer.write_record([name, value.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// One column of voltages, then one current column per device, rows in
/// acquisition order.
fn write_currents<F>(
    folder: &Path,
    file_name: &str,
    result: &RunResult,
    pick: F,
) -> BenchResult<()>
where
    F: Fn(&crate::run::DeviceCurves) -> &Vec<f64>,
{
    let mut writer = csv::Writer::from_path(folder.join(file_name))?;

    let mut header = vec!["Voltage".to_string()];
    header.extend(result.curves.iter().map(|c| format!("Pin {}", c.dark.channel)));
    writer.write_record(&header)?;

    let voltages = &result.curves[0].dark.voltage;
    for (row, v) in voltages.iter().enumerate() {
        let mut record = vec![v.to_string()];
        record.extend(result.curves.iter().map(|c| pick(c)[row].to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Stats table in the operators' layout: one row per figure of merit, one
/// column per device.
fn write_stats(folder: &Path, label: &str, result: &RunResult) -> BenchResult<()> {
    let mut writer = csv::Writer::from_path(folder.join(format!("{}_stats.csv", label)))?;

    let row = |name: &str, values: Vec<String>| {
        let mut record = vec![name.to_string()];
        record.extend(values);
        record
    };
    let metrics = &result.metrics;
    writer.write_record(row(
        "Pins",
        metrics.iter().map(|m| m.channel.to_string()).collect(),
    ))?;
    writer.write_record(row("Voc", metrics.iter().map(|m| m.voc.to_string()).collect()))?;
    writer.write_record(row("Isc", metrics.iter().map(|m| m.isc.to_string()).collect()))?;
    writer.write_record(row(
        "Wmpp",
        metrics.iter().map(|m| m.wmpp.to_string()).collect(),
    ))?;
    writer.write_record(row("FF", metrics.iter().map(|m| m.ff.to_string()).collect()))?;
    writer.write_record(row("PCE", metrics.iter().map(|m| m.pce.to_string()).collect()))?;
    writer.flush()?;
    Ok(())
}

fn write_metadata(folder: &Path, sample: &SampleInfo, result: &RunResult) -> BenchResult<()> {
    let metadata = RunMetadata {
        exported_at: Local::now().to_rfc3339(),
        sample,
        sweep: &result.sweep,
        channels: result.metrics.iter().map(|m| m.channel).collect(),
    };
    let file = File::create(folder.join("run.json"))?;
    serde_json::to_writer_pretty(file, &metadata)
        .map_err(|e| BenchError::Export(format!("Failed to serialize run metadata: {}", e)))?;
    Ok(())
}
