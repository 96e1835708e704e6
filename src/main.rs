//! Real Ear Measurement trainer - terminal front end.
//!
//! Reads operator commands from stdin (or a script), dispatches them to the
//! session controller and prints the view of the current stage.

mod commands;
mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use commands::{parse_line, Input, HELP};
use rem_engine::session::{MeasurementDriver, SessionController};
use rem_engine::{default_config, load_config, Command, SimulatedRemService, SimulatorConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "rem-trainer")]
#[command(about = "Practice Real Ear Measurement hearing-aid verification on a simulated patient")]
struct Args {
    /// Simulator configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for measurement noise
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated measurement latency in milliseconds
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Replay commands from a file instead of reading stdin
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Log engine activity at info level
    #[arg(short, long)]
    verbose: bool,
}

type Driver = MeasurementDriver<SimulatedRemService>;

/// Resolve the configuration: explicit path, then the user config file, then the embedded defaults.
fn resolve_config(args: &Args) -> anyhow::Result<SimulatorConfig> {
    let user_file = dirs::config_dir().map(|d| d.join("rem-trainer").join("simulator.toml"));

    let mut config = match (&args.config, user_file) {
        (Some(path), _) => load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        (None, Some(path)) if path.exists() => load_config(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        _ => default_config(),
    };

    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(latency_ms) = args.latency_ms {
        config.simulation.latency_ms = latency_ms;
    }
    Ok(config)
}

fn read_script(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Handle one line. Returns `false` when the operator asked to quit.
async fn handle_line(driver: &mut Driver, config: &SimulatorConfig, line: &str) -> bool {
    let input = match parse_line(line) {
        Ok(input) => input,
        Err(message) => {
            println!("{}", message);
            return true;
        }
    };

    match input {
        Input::Empty => {}
        Input::Quit => return false,
        Input::Help => println!("{}", HELP),
        Input::Patients => print!("{}", render::patients(config)),
        Input::Aids => print!("{}", render::hearing_aids(config)),
        Input::Status => print!("{}", render::view(&driver.controller().view())),
        Input::Json => {
            let controller = driver.controller();
            let snapshot = render::Snapshot {
                stage: controller.stage(),
                is_loading: controller.is_loading(),
                message: controller.message(),
                accuracy: controller.accuracy(),
                feedback: controller.feedback(),
                session: controller.session(),
            };
            match serde_json::to_string_pretty(&snapshot) {
                Ok(json) => println!("{}", json),
                Err(e) => println!("error: {}", e),
            }
        }
        Input::Measure(measurement_type) => {
            let measurement_type =
                measurement_type.unwrap_or_else(|| driver.controller().active_measurement());
            let dispatch = driver
                .send_and_settle(Command::PerformMeasurement(measurement_type))
                .await;
            if let Some(text) = render::outcome(&dispatch) {
                println!("{}", text);
            }
            print!("{}", render::view(&driver.controller().view()));
        }
        Input::Engine(command) => {
            let navigates = matches!(command, Command::Next | Command::Back);
            let dispatch = driver.send(command);
            match render::outcome(&dispatch) {
                Some(text) => println!("{}", text),
                None if navigates => print!("{}", render::view(&driver.controller().view())),
                None => {}
            }
        }
    }

    while let Some(dispatch) = driver.try_settle() {
        if let Some(text) = render::outcome(&dispatch) {
            println!("{}", text);
        }
    }
    true
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    rem_engine::init_tracing(if args.verbose { "info" } else { "warn" });

    let config = resolve_config(&args)?;
    info!(
        "Loaded {} patients and {} hearing aids",
        config.patients.len(),
        config.hearing_aids.len()
    );

    let service = Arc::new(SimulatedRemService::new(config.clone()));
    let controller = SessionController::new(service, config.scoring);
    let mut driver = MeasurementDriver::new(controller);

    if let Some(path) = &args.script {
        for line in read_script(path)? {
            println!("> {}", line);
            if !handle_line(&mut driver, &config, &line).await {
                break;
            }
        }
        return Ok(());
    }

    println!("REM trainer. Type 'help' for commands.");
    print!("{}", render::view(&driver.controller().view()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !handle_line(&mut driver, &config, &line).await {
            break;
        }
    }
    Ok(())
}
