use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use wealthcast::api::{SavedScenario, run_http_server, simulate_saved_scenario};
use wealthcast::core::DEFAULT_ITERATIONS;

#[derive(Parser, Debug)]
#[command(
    name = "wealthcast",
    about = "Monte Carlo household wealth projection (jump-diffusion, stress scenarios, goals)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON simulation API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long, default_value = "info", help = "Log filter used when RUST_LOG is unset")]
        log_level: String,
    },
    /// Run one saved scenario and print the result bundle as JSON.
    Simulate {
        #[arg(long, help = "Saved scenario file: { config, assets, scenario? }")]
        input: PathBuf,
        #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
        iterations: u32,
        #[arg(long, help = "Base seed; a random one is drawn when omitted")]
        seed: Option<u64>,
        #[arg(long, default_value = "warn", help = "Log filter used when RUST_LOG is unset")]
        log_level: String,
    },
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_simulate(input: &Path, iterations: u32, seed: Option<u64>) -> Result<String, String> {
    let raw = fs::read_to_string(input)
        .map_err(|e| format!("cannot read {}: {e}", input.display()))?;
    let saved: SavedScenario = serde_json::from_str(&raw)
        .map_err(|e| format!("invalid scenario file {}: {e}", input.display()))?;
    let response =
        simulate_saved_scenario(&saved, iterations, seed).map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&response).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { port, log_level } => {
            init_tracing(&log_level);
            if let Err(e) = run_http_server(port).await {
                tracing::error!(error = %e, "server error");
                std::process::exit(1);
            }
        }
        Command::Simulate {
            input,
            iterations,
            seed,
            log_level,
        } => {
            init_tracing(&log_level);
            match run_simulate(&input, iterations, seed) {
                Ok(json) => println!("{json}"),
                Err(msg) => {
                    eprintln!("Error: {msg}");
                    std::process::exit(1);
                }
            }
        }
    }
}
