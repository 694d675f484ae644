//! Batch runner for balance testing.
//!
//! Runs one scenario over many seeds in parallel using rayon and
//! aggregates the reports.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::metrics::{BatchSummary, MatchReport};
use crate::runner::{run_scenario, RunOptions};
use crate::scenario::{Scenario, ScenarioError};

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of matches to run.
    pub game_count: u32,
    /// Seed of the first match; later matches count up from it.
    pub seed_start: u64,
    /// Maximum parallel matches (0 = use rayon default).
    pub parallel_games: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            game_count: 100,
            seed_start: 0,
            parallel_games: 0,
        }
    }
}

impl BatchConfig {
    /// Config for `game_count` matches.
    #[must_use]
    pub fn new(game_count: u32) -> Self {
        Self {
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }
}

/// Error during a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Scenario name.
    pub scenario: String,
    /// Configuration used.
    pub config: BatchConfig,
    /// Individual match reports, in seed order.
    pub games: Vec<MatchReport>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
    /// Matches that could not be set up.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), ScenarioError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Run `scenario` once per seed.
pub fn run_batch(scenario: &Scenario, config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    info!(
        scenario = %scenario.name,
        games = config.game_count,
        seed_start = config.seed_start,
        "Starting batch run"
    );

    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<Result<MatchReport, BatchError>> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            let options = RunOptions {
                seed: Some(seed),
                config: None,
            };
            run_scenario(scenario.clone(), &options).map_err(|e| {
                warn!(seed, error = %e, "Match failed");
                BatchError {
                    seed,
                    message: e.to_string(),
                }
            })
        })
        .collect();

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<MatchReport> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        games = games.len(),
        win_rate = summary.win_rate,
        seconds = duration_seconds,
        "Batch complete"
    );

    BatchResults {
        scenario: scenario.name.clone(),
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Run the same seed `runs` times in parallel and compare final hashes.
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32) -> Result<bool, ScenarioError> {
    let options = RunOptions {
        seed: Some(seed),
        config: None,
    };
    let hashes: Vec<u64> = (0..runs.max(1))
        .into_par_iter()
        .map(|_| run_scenario(scenario.clone(), &options).map(|r| r.final_state_hash))
        .collect::<Result<_, _>>()?;

    let first = hashes[0];
    let deterministic = hashes.iter().all(|h| *h == first);
    if !deterministic {
        warn!(seed, ?hashes, "Runs diverged");
    }
    Ok(deterministic)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_quad() -> Scenario {
        Scenario {
            max_duration_ms: 12_000,
            auto_wave_gap_ms: Some(1_000),
            ..Scenario::builtin("quad")
        }
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(500).with_seed(12345);
        assert_eq!(config.game_count, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.parallel_games, 0);
    }

    #[test]
    fn test_run_batch_small() {
        let results = run_batch(&short_quad(), BatchConfig::new(4).with_seed(10));
        assert_eq!(results.games.len(), 4);
        assert!(results.errors.is_empty());
        let seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        assert_eq!(seeds, vec![10, 11, 12, 13]);
        assert_eq!(results.summary.total_games, 4);
    }

    #[test]
    fn test_bad_scenario_reports_errors() {
        let results = run_batch(&Scenario::builtin("nowhere"), BatchConfig::new(2));
        assert!(results.games.is_empty());
        assert_eq!(results.errors.len(), 2);
    }

    #[test]
    fn test_verify_determinism() {
        assert!(verify_determinism(&short_quad(), 12345, 3).unwrap());
    }

    #[test]
    fn test_batch_results_save_load() {
        let results = run_batch(&short_quad(), BatchConfig::new(2));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("results.json");

        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.games.len(), 2);
        assert_eq!(loaded.scenario, "quad");
        assert_eq!(
            loaded.games[1].final_state_hash,
            results.games[1].final_state_hash
        );
    }
}
