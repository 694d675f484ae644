//! # Paws Core
//!
//! Deterministic lane-defense simulation core for Paw Defense.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Headless runners and automated balance checks
//! - Replays from a seed plus a command script
//! - Determinism testing via state hashes
//!
//! ## Crate Structure
//!
//! - [`simulation`] - Match container, tick pipeline and commands
//! - [`components`] - Entity records (towers, enemies, heroes, troops)
//! - [`path`] - Path geometry and multi-path merging
//! - [`waves`] - Wave templates and the spawn scheduler
//! - [`combat`] - Targeting, damage, statuses and auras
//! - [`movement`] - Path following and unit state machines
//! - [`progression`] - Tower levels, branches and stat calculation
//! - [`level`] - Level data and the level registry
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod components;
pub mod config;
pub mod data;
pub mod economy;
pub mod error;
pub mod events;
pub mod level;
pub mod math;
pub mod movement;
pub mod path;
pub mod progression;
pub mod projectile;
pub mod simulation;
pub mod snapshot;
pub mod spells;
pub mod status;
pub mod waves;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::{
        Enemy, EnemyState, EntityId, GridPoint, Hero, PathId, Tower, TrainPhase, Troop, UnitState,
        MAX_STATION_TROOPS,
    };
    pub use crate::config::SimConfig;
    pub use crate::data::DataTables;
    pub use crate::economy::Wallet;
    pub use crate::error::{GameError, Result, ValidationError};
    pub use crate::events::{GameEvent, MatchOutcome, TickEvents};
    pub use crate::level::{CustomLevel, LevelData, LevelRegistry, LevelWaves};
    pub use crate::math::{Fixed, Millis, Vec2Fixed};
    pub use crate::progression::{TowerKind, UpgradeBranch};
    pub use crate::simulation::{GameCommand, Simulation, TICK_DURATION_MS};
    pub use crate::snapshot::Snapshot;
    pub use crate::spells::SpellKind;
    pub use crate::waves::{SpawnGroup, WaveTemplate};
}
