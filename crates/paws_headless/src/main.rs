//! Headless Paw Defense runner.
//!
//! # Usage
//!
//! ```bash
//! # Play one match and print the report
//! cargo run -p paws_headless -- run --scenario quad --seed 3
//!
//! # Scenario file with a tuning override, report written to disk
//! cargo run -p paws_headless -- run --scenario scenarios/quad_opener.ron \
//!     --config tuning.ron --output results/opener.json
//!
//! # Balance batch over 500 seeds
//! cargo run -p paws_headless -- batch --scenario crossroads --count 500
//!
//! # Determinism check
//! cargo run -p paws_headless -- verify --scenario quad --seed 42 --runs 4
//! ```
//!
//! Reports go to stdout as JSON unless `--output` is given. Logs go to
//! stderr; `RUST_LOG` overrides the default filter.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use paws_core::config::SimConfig;
use paws_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    runner::{run_scenario, RunOptions},
    scenario::{Scenario, ScenarioError},
};

#[derive(Parser)]
#[command(name = "paws_headless")]
#[command(about = "Headless Paw Defense runner for balance checks and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single match
    Run {
        /// Scenario file, or a built-in level id
        #[arg(short, long, default_value = "quad")]
        scenario: String,

        /// Tuning file (RON) replacing the scenario's config
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seed override
        #[arg(long)]
        seed: Option<u64>,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Play one scenario over many seeds
    Batch {
        /// Scenario file, or a built-in level id
        #[arg(short, long, default_value = "quad")]
        scenario: String,

        /// Number of matches
        #[arg(short = 'n', long, default_value = "100")]
        count: u32,

        /// Maximum parallel matches (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// First seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Write the results here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that one seed always produces the same final state
    Verify {
        /// Scenario file, or a built-in level id
        #[arg(short, long, default_value = "quad")]
        scenario: String,

        /// Seed to check
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Number of runs to compare
        #[arg(short, long, default_value = "3")]
        runs: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries reports
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let result = match cli.command {
        Commands::Run {
            scenario,
            config,
            seed,
            output,
        } => cmd_run(&scenario, config.as_deref(), seed, output.as_deref()),
        Commands::Batch {
            scenario,
            count,
            parallel,
            seed,
            output,
        } => cmd_batch(&scenario, count, parallel, seed, output.as_deref()),
        Commands::Verify {
            scenario,
            seed,
            runs,
        } => cmd_verify(&scenario, seed, runs),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        eprintln!("FATAL: {e}");
        std::process::exit(1);
    }
}

/// A path to an existing file loads it; anything else is a built-in level id.
fn resolve_scenario(arg: &str) -> Result<Scenario, ScenarioError> {
    let path = Path::new(arg);
    if path.exists() || path.extension().is_some_and(|ext| ext == "ron") {
        Scenario::load(path)
    } else {
        Ok(Scenario::builtin(arg))
    }
}

fn load_config(path: &Path) -> Result<SimConfig, ScenarioError> {
    if !path.exists() {
        return Err(ScenarioError::FileNotFound(path.display().to_string()));
    }
    let text = std::fs::read_to_string(path)?;
    Ok(SimConfig::from_ron_str(&path.display().to_string(), &text)?)
}

fn emit<T: Serialize>(value: &T, output: Option<&Path>) -> Result<(), ScenarioError> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, json)?;
            tracing::info!(path = %path.display(), "Report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_run(
    scenario: &str,
    config: Option<&Path>,
    seed: Option<u64>,
    output: Option<&Path>,
) -> Result<(), ScenarioError> {
    let scenario = resolve_scenario(scenario)?;
    let options = RunOptions {
        seed,
        config: config.map(load_config).transpose()?,
    };
    let report = run_scenario(scenario, &options)?;
    emit(&report, output)
}

fn cmd_batch(
    scenario: &str,
    count: u32,
    parallel: u32,
    seed: u64,
    output: Option<&Path>,
) -> Result<(), ScenarioError> {
    let scenario = resolve_scenario(scenario)?;
    let config = BatchConfig {
        parallel_games: parallel,
        ..BatchConfig::new(count).with_seed(seed)
    };
    let results = run_batch(&scenario, config);

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played: {}", results.games.len());
    if !results.errors.is_empty() {
        eprintln!("Games FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!("Win rate: {:.1}%", results.summary.win_rate * 100.0);
    eprintln!("Mean leaks: {:.2}", results.summary.mean_leaks);

    match output {
        Some(path) => {
            results.save(path)?;
            eprintln!("\nResults saved to: {}", path.display());
            Ok(())
        }
        None => emit(&results, None),
    }
}

fn cmd_verify(scenario: &str, seed: u64, runs: u32) -> Result<(), ScenarioError> {
    let scenario = resolve_scenario(scenario)?;
    if verify_determinism(&scenario, seed, runs)? {
        eprintln!("Determinism verified: {runs} runs of seed {seed} match");
        Ok(())
    } else {
        eprintln!("DETERMINISM FAILURE: seed {seed} diverged");
        std::process::exit(1);
    }
}
