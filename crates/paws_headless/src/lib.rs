//! Headless scenario runner for balance checks and CI verification.
//!
//! A [`Scenario`] names a level, optional data and tuning overrides, and a
//! timed command script. The runner plays it to the end without graphics
//! and produces a [`MatchReport`]:
//!
//! - **Balance checks**: run a scenario over many seeds with [`run_batch`]
//! - **CI verification**: confirm identical seeds give identical state hashes
//! - **Scripted regressions**: replay a fixed command script and diff reports
//!
//! # Example
//!
//! ```bash
//! # Play a built-in level with automatic wave starts
//! cargo run -p paws_headless -- run --scenario quad
//!
//! # Run a scenario file over 200 seeds
//! cargo run -p paws_headless -- batch --scenario scenarios/quad_opener.ron --count 200
//!
//! # Verify determinism
//! cargo run -p paws_headless -- verify --scenario crossroads --seed 7
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod metrics;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, MatchReport, MetricsCollector};
pub use runner::{run_scenario, HeadlessRunner, RunOptions};
pub use scenario::{LevelSource, Scenario, ScenarioError, TimedCommand};
