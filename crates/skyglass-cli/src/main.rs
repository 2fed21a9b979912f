//! Skyglass CLI - Headless frame driver for the skyglass particle scene

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check, simulate};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "skyglass")]
#[command(about = "Run and inspect the skyglass particle scene without a window", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scene headless at a fixed frame rate and report emitter statistics
    Simulate {
        /// Path to scene config (TOML); built-in defaults when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Simulated seconds to run
        #[arg(long, default_value = "30")]
        seconds: f64,

        /// Frames per simulated second
        #[arg(long, default_value = "60", value_parser = parse_fps)]
        fps: u32,

        /// Override the scene seed
        #[arg(long)]
        seed: Option<u64>,

        /// Pace frames against the wall clock instead of stepping
        #[arg(long)]
        realtime: bool,

        /// Output format (text or json)
        #[arg(long, default_value = "text", value_parser = parse_format)]
        format: String,

        /// Enable debug logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a scene config and show the effective capacities
    Check {
        /// Path to scene config (TOML)
        config: PathBuf,
    },
}

fn parse_fps(s: &str) -> Result<u32, String> {
    let fps: u32 = s.parse().map_err(|e| format!("invalid fps: {}", e))?;
    if fps == 0 || fps > 1000 {
        return Err(format!("fps must be in 1..=1000, got {}", fps));
    }
    Ok(fps)
}

fn parse_format(s: &str) -> Result<String, String> {
    match s {
        "text" | "json" => Ok(s.to_string()),
        _ => Err(format!("unknown format '{}'; valid values: text, json", s)),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            seconds,
            fps,
            seed,
            realtime,
            format,
            verbose,
        } => {
            init_logging(verbose);
            simulate::run(simulate::SimulateArgs {
                config,
                seconds,
                fps,
                seed,
                realtime,
                format,
            })
        }
        Commands::Check { config } => {
            init_logging(false);
            check::run(&config)
        }
    }
}
