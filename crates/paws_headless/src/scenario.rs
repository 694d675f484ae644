//! Scenario loading and configuration.
//!
//! A scenario names the level to play (built-in id or an inline custom
//! level), optional data and tuning overrides, and a timed command script.
//!
//! # Example RON
//!
//! ```ron
//! (
//!     name: "Quad opener",
//!     level: Builtin("quad"),
//!     seed: 7,
//!     auto_wave_gap_ms: Some(3000),
//!     commands: [
//!         (at_ms: 0, command: PlaceTower(kind: Archer, at: (x: 3, y: 4))),
//!         (at_ms: 500, command: StartNextWave),
//!     ],
//!     max_duration_ms: 600000,
//! )
//! ```

use std::path::{Path, PathBuf};

use paws_core::config::SimConfig;
use paws_core::data::{DataTables, EnemyDefinition};
use paws_core::error::GameError;
use paws_core::level::{CustomLevel, LevelData, LevelRegistry};
use paws_core::math::Millis;
use paws_core::simulation::GameCommand;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The simulation refused the scenario's level or data.
    #[error("Scenario rejected: {0}")]
    Game(#[from] GameError),
    /// Failed to write the report.
    #[error("Failed to encode report: {0}")]
    ReportError(#[from] serde_json::Error),
}

/// Where the scenario's level comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelSource {
    /// A level registered by [`LevelRegistry::with_builtin`].
    Builtin(String),
    /// An inline player-authored level, validated before use.
    Custom(CustomLevel),
}

impl Default for LevelSource {
    fn default() -> Self {
        Self::Builtin("quad".to_string())
    }
}

/// A command applied once simulation time reaches `at_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedCommand {
    /// Simulation time in milliseconds.
    pub at_ms: Millis,
    /// The command.
    pub command: GameCommand,
}

impl TimedCommand {
    /// Command due at `at_ms`.
    #[must_use]
    pub fn new(at_ms: Millis, command: GameCommand) -> Self {
        Self { at_ms, command }
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Level to play.
    pub level: LevelSource,
    /// Seed used when none is given on the command line.
    pub seed: u64,
    /// Data table file replacing the built-in tables, relative to the
    /// scenario file.
    pub tables_file: Option<PathBuf>,
    /// Extra enemy types added on top of the tables.
    pub extra_enemies: Vec<EnemyDefinition>,
    /// Tuning overrides.
    pub config: Option<SimConfig>,
    /// Start the next wave this long after the previous one finished
    /// spawning. `None` leaves waves to the script.
    pub auto_wave_gap_ms: Option<u32>,
    /// Scripted commands, applied in time order.
    pub commands: Vec<TimedCommand>,
    /// Stop the match after this much simulation time.
    pub max_duration_ms: Millis,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            description: String::new(),
            level: LevelSource::default(),
            seed: 0,
            tables_file: None,
            extra_enemies: Vec::new(),
            config: None,
            auto_wave_gap_ms: Some(5_000),
            commands: Vec::new(),
            max_duration_ms: 30 * 60 * 1000,
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// A relative `tables_file` is resolved against the scenario's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let mut scenario = Self::from_ron_str(&contents)?;
        if let (Some(tables), Some(dir)) = (&scenario.tables_file, path.parent()) {
            if tables.is_relative() {
                scenario.tables_file = Some(dir.join(tables));
            }
        }
        tracing::debug!(path = %path.display(), name = %scenario.name, "Scenario loaded");
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Scenario on a built-in level with waves started automatically.
    #[must_use]
    pub fn builtin(level_id: &str) -> Self {
        Self {
            name: level_id.to_string(),
            level: LevelSource::Builtin(level_id.to_string()),
            ..Self::default()
        }
    }

    /// Data tables: the tables file or the built-in set, plus extra enemies.
    pub fn tables(&self) -> Result<DataTables, ScenarioError> {
        let mut tables = match &self.tables_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ScenarioError::FileNotFound(path.display().to_string()));
                }
                let text = std::fs::read_to_string(path)?;
                DataTables::from_ron_str(&path.display().to_string(), &text)?
            }
            None => DataTables::builtin(),
        };
        for enemy in &self.extra_enemies {
            tables.insert_enemy(enemy.clone());
        }
        Ok(tables)
    }

    /// Resolve and validate the level against `tables`.
    pub fn level_data(&self, tables: &DataTables) -> Result<LevelData, ScenarioError> {
        let mut registry = LevelRegistry::with_builtin();
        let id = match &self.level {
            LevelSource::Builtin(id) => id.clone(),
            LevelSource::Custom(custom) => {
                let id = format!("custom:{}", self.name);
                registry.register_custom(id.clone(), custom.clone(), tables)?;
                id
            }
        };
        Ok(registry.get(&id)?.clone())
    }

    /// Script sorted by time; equal times keep file order.
    #[must_use]
    pub fn sorted_commands(&self) -> Vec<TimedCommand> {
        let mut commands = self.commands.clone();
        commands.sort_by_key(|c| c.at_ms);
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paws_core::prelude::*;

    #[test]
    fn test_default_scenario() {
        let scenario = Scenario::default();
        assert_eq!(scenario.level, LevelSource::Builtin("quad".to_string()));
        assert!(scenario.commands.is_empty());
    }

    #[test]
    fn test_parse_from_ron() {
        let ron = r#"(
            name: "Test Scenario",
            level: Builtin("crossroads"),
            seed: 11,
            auto_wave_gap_ms: None,
            commands: [
                (at_ms: 0, command: PlaceTower(kind: Archer, at: (x: 3, y: 4))),
                (at_ms: 100, command: StartNextWave),
            ],
            max_duration_ms: 1000,
        )"#;

        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.name, "Test Scenario");
        assert_eq!(scenario.seed, 11);
        assert_eq!(scenario.auto_wave_gap_ms, None);
        assert_eq!(scenario.commands.len(), 2);
        assert_eq!(
            scenario.commands[0].command,
            GameCommand::PlaceTower {
                kind: TowerKind::Archer,
                at: GridPoint::new(3, 4),
            }
        );
    }

    #[test]
    fn test_commands_sorted_stably() {
        let scenario = Scenario {
            commands: vec![
                TimedCommand::new(500, GameCommand::Resume),
                TimedCommand::new(0, GameCommand::StartNextWave),
                TimedCommand::new(500, GameCommand::Pause),
            ],
            ..Scenario::default()
        };
        let order: Vec<GameCommand> = scenario
            .sorted_commands()
            .into_iter()
            .map(|c| c.command)
            .collect();
        assert_eq!(
            order,
            vec![
                GameCommand::StartNextWave,
                GameCommand::Resume,
                GameCommand::Pause
            ]
        );
    }

    #[test]
    fn test_unknown_builtin_level() {
        let scenario = Scenario::builtin("nowhere");
        let err = scenario.level_data(&DataTables::builtin()).unwrap_err();
        assert!(matches!(err, ScenarioError::Game(GameError::UnknownLevel(_))));
    }

    #[test]
    fn test_invalid_custom_level_lists_problems() {
        let scenario = Scenario {
            level: LevelSource::Custom(CustomLevel {
                name: "Broken".to_string(),
                primary_path: vec![GridPoint::new(0, 0)],
                secondary_path: None,
                hero_spawn: GridPoint::new(5, 5),
                waves: LevelWaves::Custom(vec![WaveTemplate::new(vec![SpawnGroup::new(
                    "ghost", 1, 100,
                )])]),
                starting_resources: 100,
                grid_width: 20,
                grid_height: 12,
            }),
            ..Scenario::default()
        };
        let err = scenario.level_data(&DataTables::builtin()).unwrap_err();
        match err {
            ScenarioError::Game(GameError::InvalidLevel(problems)) => {
                assert!(problems.len() >= 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = Scenario::load("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }
}
