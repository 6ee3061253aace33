//! CLI entry point for the solar I–V bench.
//!
//! # Usage
//!
//! Run a full acquisition (real hardware, per the config file):
//! ```bash
//! solariv run --config config/bench.toml
//! ```
//!
//! Exercise the whole pipeline without instruments attached:
//! ```bash
//! solariv run --config config/bench.toml --mock
//! ```
//!
//! Preview the voltage sequence a config would produce:
//! ```bash
//! solariv plan --config config/bench.toml
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use solariv::config::BenchConfig;
use solariv::export::export_run;
use solariv::hardware::mock::MockBench;
use solariv::hardware::relay::RelayTransport;
use solariv::hardware::smu::SmuSession;
use solariv::hardware::switch::DeviceSwitch;
use solariv::logging;
use solariv::run::RunController;
use solariv::sweep::SweepPlan;

#[derive(Parser)]
#[command(name = "solariv")]
#[command(about = "Relay-multiplexed solar cell I-V characterization bench", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full acquisition over the configured devices
    Run {
        /// Path to the bench TOML config
        #[arg(long, default_value = "config/bench.toml")]
        config: PathBuf,

        /// Use mock hardware (no instruments required)
        #[arg(long)]
        mock: bool,
    },

    /// Print the voltage sequence and sweep program, then exit
    Plan {
        /// Path to the bench TOML config
        #[arg(long, default_value = "config/bench.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, mock } => run(config, mock).await,
        Commands::Plan { config } => plan(config),
    }
}

async fn run(config_path: PathBuf, mock: bool) -> Result<()> {
    let config = BenchConfig::load_from(&config_path)?;
    config.validate()?;
    logging::init(&config.application.log_level)?;
    info!(config = %config_path.display(), mock, "Starting acquisition run");

    let (smu, switch): (Box<dyn SmuSession>, DeviceSwitch) = if mock {
        let (smu, relay, _log) = MockBench::new();
        let switch = DeviceSwitch::new(Box::new(relay), config.bench.channels.clone())
            .with_settle(Duration::from_millis(10));
        (Box::new(smu), switch)
    } else {
        let smu = open_smu(&config)?;
        let relay = open_relay(&config)?;
        (smu, DeviceSwitch::new(relay, config.bench.channels.clone()))
    };

    let mut controller = RunController::new(smu, switch);
    let result = controller.execute(&config).await?;

    let folder = export_run(&result, &config.sample, &config.output.dir)?;
    info!(folder = %folder.display(), devices = result.metrics.len(), "Run complete");
    Ok(())
}

fn plan(config_path: PathBuf) -> Result<()> {
    let config = BenchConfig::load_from(&config_path)?;
    config.validate()?;

    let plan = SweepPlan::build(config.sweep.clone())?;
    let params = plan.sweep_params(config.smu.compliance_a, config.smu.current_range_a);

    println!(
        "Sweep: {} -> {} V in {} points ({:?})",
        params.start, params.stop, params.points, config.sweep.direction
    );
    println!(
        "Compliance {} A, range {} A, source delay {} s",
        params.compliance_a, params.current_range_a, params.source_delay_s
    );
    for v in plan.voltages() {
        println!("{:.4}", v);
    }
    Ok(())
}

#[cfg(feature = "instrument_visa")]
fn open_smu(config: &BenchConfig) -> Result<Box<dyn SmuSession>> {
    use solariv::hardware::scpi::VisaTransport;
    use solariv::hardware::smu::Keithley2400;

    let transport = VisaTransport::open(&config.smu)?;
    Ok(Box::new(Keithley2400::new(transport)))
}

#[cfg(not(feature = "instrument_visa"))]
fn open_smu(_config: &BenchConfig) -> Result<Box<dyn SmuSession>> {
    use solariv::error::BenchError;

    Err(BenchError::FeatureNotEnabled("instrument_visa".to_string()).into())
}

#[cfg(feature = "instrument_serial")]
fn open_relay(config: &BenchConfig) -> Result<Box<dyn RelayTransport>> {
    use solariv::hardware::relay::SerialRelay;

    Ok(Box::new(SerialRelay::open(&config.relay)?))
}

#[cfg(not(feature = "instrument_serial"))]
fn open_relay(_config: &BenchConfig) -> Result<Box<dyn RelayTransport>> {
    use solariv::error::BenchError;

    Err(BenchError::FeatureNotEnabled("instrument_serial".to_string()).into())
}
