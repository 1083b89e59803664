//! Runs a prefill/decode traffic scenario over a single bottleneck link,
//! and prints the queue statistics of the chosen discipline.

use clap::Parser;
use des_calendar::{
    logger,
    runtime::RuntimeError,
    scenario::{run, DisciplineKind, ScenarioConfig},
    time::Duration,
};
use std::{error::Error, fs, path::PathBuf, process::ExitCode};
use tracing::Level;

/// Calendar queue scenario driver.
#[derive(Parser, Debug)]
#[command(
    name = "qdisc-sim",
    about = "Simulates prefill/decode traffic through a calendar queue or FIFO bottleneck"
)]
struct Cli {
    /// YAML scenario file. Missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// The discipline in front of the link: calendar or fifo.
    #[arg(long)]
    discipline: Option<DisciplineKind>,

    /// Seed of the random number generator.
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated time in seconds.
    #[arg(long)]
    duration: Option<f64>,

    /// Print the report as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    // Keep stdout clean for machine readable output.
    logger::init_with_level(if cli.json { Level::WARN } else { Level::INFO });

    match execute(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> Result<String, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => ScenarioConfig::from_yaml(&fs::read_to_string(path)?)?,
        None => ScenarioConfig::default(),
    };

    if let Some(discipline) = cli.discipline {
        config.discipline = discipline;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(secs) = cli.duration {
        if !(secs.is_finite() && secs > 0.0) {
            return Err(format!("invalid duration {secs}").into());
        }
        config.duration = Duration::from_secs_f64(secs);
    }

    let report = run(config).map_err(|e: RuntimeError| -> Box<dyn Error> { e.into_inner() })?;
    if cli.json {
        Ok(serde_json::to_string_pretty(&report)?)
    } else {
        Ok(report.to_string())
    }
}
