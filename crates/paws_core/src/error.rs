//! Error types for the game simulation.
//!
//! Nothing in normal gameplay is fatal. Commands that cannot be honoured
//! return an error and leave the simulation untouched; stale entity
//! references are cleared silently by the systems and never surface here.

use thiserror::Error;

use crate::components::EntityId;
use crate::progression::{TowerKind, UpgradeBranch};

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Level or wave data failed validation before the match started.
    #[error("Invalid level data: {} problem(s), first: {}", .0.len(), first_problem(.0))]
    InvalidLevel(Vec<ValidationError>),

    /// Failed to parse a data table or config file.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParseError {
        /// Name of the data source (file or table name).
        source_name: String,
        /// Parser error message.
        message: String,
    },

    /// Invalid entity reference in a command.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Level id not present in the registry.
    #[error("Unknown level: {0}")]
    UnknownLevel(String),

    /// Not enough Paw Points for the requested action.
    #[error("Insufficient Paw Points: need {required}, have {available}")]
    InsufficientFunds {
        /// Amount required.
        required: u32,
        /// Amount available.
        available: u32,
    },

    /// Tower already at maximum level.
    #[error("Tower {0} is already fully upgraded")]
    MaxLevel(EntityId),

    /// Tower already committed to the other upgrade branch.
    #[error("Tower {tower} is locked to branch {held:?}")]
    BranchLocked {
        /// Tower being upgraded.
        tower: EntityId,
        /// Branch the tower already holds.
        held: UpgradeBranch,
    },

    /// Level-4 upgrade requested without choosing a branch, or a branch
    /// chosen before level 3.
    #[error("Upgrade branch choice invalid for {kind:?} at level {level}")]
    BranchChoice {
        /// Kind of the tower.
        kind: TowerKind,
        /// Current level of the tower.
        level: u8,
    },

    /// Tile cannot hold a tower.
    #[error("Cannot place tower at ({x}, {y}): {reason}")]
    InvalidPlacement {
        /// Grid column.
        x: i32,
        /// Grid row.
        y: i32,
        /// Why placement was refused.
        reason: &'static str,
    },

    /// Spell or ability is still cooling down.
    #[error("{name} is on cooldown for another {remaining_ms} ms")]
    OnCooldown {
        /// Name of the spell.
        name: String,
        /// Milliseconds until ready.
        remaining_ms: u64,
    },

    /// Command is not valid in the current state.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}

fn first_problem(problems: &[ValidationError]) -> String {
    problems
        .first()
        .map_or_else(|| "none".to_string(), ToString::to_string)
}

/// A single configuration problem found while validating level or wave data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A path has fewer than two waypoints.
    #[error("path {path} has {points} waypoint(s), at least 2 required")]
    PathTooShort {
        /// Index of the path in the level.
        path: usize,
        /// Number of waypoints found.
        points: usize,
    },

    /// All waypoints of a path coincide.
    #[error("path {path} has zero length")]
    PathZeroLength {
        /// Index of the path in the level.
        path: usize,
    },

    /// A waypoint lies outside the grid.
    #[error("path {path} waypoint {index} at ({x}, {y}) is outside the grid")]
    WaypointOutOfBounds {
        /// Index of the path.
        path: usize,
        /// Index of the waypoint.
        index: usize,
        /// Grid column.
        x: i32,
        /// Grid row.
        y: i32,
    },

    /// The level defines no path at all.
    #[error("level defines no paths")]
    NoPaths,

    /// The hero spawn lies outside the grid.
    #[error("hero spawn ({x}, {y}) is outside the grid")]
    HeroSpawnOutOfBounds {
        /// Grid column.
        x: i32,
        /// Grid row.
        y: i32,
    },

    /// The grid has zero width or height.
    #[error("grid must be at least 1x1")]
    EmptyGrid,

    /// Referenced named wave set does not exist.
    #[error("unknown wave template '{0}'")]
    UnknownWaveTemplate(String),

    /// A level has no waves.
    #[error("level has no waves")]
    NoWaves,

    /// A wave has no spawn groups.
    #[error("wave {wave} has no spawn groups")]
    EmptyWave {
        /// Wave index.
        wave: usize,
    },

    /// A spawn group references an enemy type missing from the tables.
    #[error("wave {wave} group {group} references unknown enemy type '{enemy}'")]
    UnknownEnemyType {
        /// Wave index.
        wave: usize,
        /// Group index within the wave.
        group: usize,
        /// The unknown type name.
        enemy: String,
    },

    /// A spawn group has a zero count.
    #[error("wave {wave} group {group} spawns zero enemies")]
    ZeroCount {
        /// Wave index.
        wave: usize,
        /// Group index within the wave.
        group: usize,
    },

    /// A spawn group pins a path the level does not have.
    #[error("wave {wave} group {group} pins missing path {path}")]
    UnknownPath {
        /// Wave index.
        wave: usize,
        /// Group index within the wave.
        group: usize,
        /// The missing path index.
        path: u32,
    },

    /// A tower upgrade costs less than the upgrade before it.
    #[error("tower {kind:?} upgrade to level {level} costs {cost}, below the previous {previous}")]
    DecreasingUpgradeCost {
        /// Tower kind.
        kind: TowerKind,
        /// Level the upgrade reaches.
        level: u8,
        /// Cost of this upgrade.
        cost: u32,
        /// Cost of the upgrade before it.
        previous: u32,
    },
}
