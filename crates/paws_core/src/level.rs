//! Level data and the level registry.
//!
//! A level is a grid, one or more enemy paths, a hero spawn point and a wave
//! list. Levels are validated once on registration; the simulation trusts
//! registered levels.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::GridPoint;
use crate::data::{DataTables, GAUNTLET_WAVES, STANDARD_WAVES};
use crate::error::{GameError, Result, ValidationError};
use crate::path::{Path, PathNetwork};
use crate::waves::WaveTemplate;

/// Where a level's waves come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelWaves {
    /// A named wave set from the data tables.
    Template(String),
    /// Waves embedded in the level.
    Custom(Vec<WaveTemplate>),
}

/// Static description of a level.
///
/// # Example RON
///
/// ```ron
/// (
///     id: "quad",
///     name: "The Quad",
///     grid_width: 20,
///     grid_height: 12,
///     paths: [[(x: 0, y: 5), (x: 19, y: 5)]],
///     hero_spawn: (x: 15, y: 8),
///     waves: Template("standard"),
///     starting_resources: 250,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelData {
    /// Registry id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Grid columns.
    pub grid_width: u32,
    /// Grid rows.
    pub grid_height: u32,
    /// Enemy paths as grid waypoints; all paths are equal.
    pub paths: Vec<Vec<GridPoint>>,
    /// Hero spawn tile.
    pub hero_spawn: GridPoint,
    /// Hero type; the default hero when absent.
    #[serde(default)]
    pub hero: Option<String>,
    /// Wave source.
    pub waves: LevelWaves,
    /// Paw Points at match start.
    pub starting_resources: u32,
}

impl LevelData {
    /// Collect every configuration problem of this level.
    #[must_use]
    pub fn validate(&self, tables: &DataTables) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.grid_width == 0 || self.grid_height == 0 {
            errors.push(ValidationError::EmptyGrid);
        }
        if self.paths.is_empty() {
            errors.push(ValidationError::NoPaths);
        }
        for (index, waypoints) in self.paths.iter().enumerate() {
            if let Err(e) = Path::new(index, waypoints.clone()) {
                errors.push(e);
            }
            for (point, waypoint) in waypoints.iter().enumerate() {
                if !waypoint.in_bounds(self.grid_width, self.grid_height) {
                    errors.push(ValidationError::WaypointOutOfBounds {
                        path: index,
                        index: point,
                        x: waypoint.x,
                        y: waypoint.y,
                    });
                }
            }
        }
        if !self.hero_spawn.in_bounds(self.grid_width, self.grid_height) {
            errors.push(ValidationError::HeroSpawnOutOfBounds {
                x: self.hero_spawn.x,
                y: self.hero_spawn.y,
            });
        }

        match self.resolve_waves(tables) {
            Ok(waves) => errors.extend(validate_waves(&waves, self.paths.len(), tables)),
            Err(e) => errors.push(e),
        }
        errors
    }

    /// Build the path network.
    pub fn build_paths(&self) -> Result<PathNetwork> {
        let mut paths = Vec::with_capacity(self.paths.len());
        let mut errors = Vec::new();
        for (index, waypoints) in self.paths.iter().enumerate() {
            match Path::new(index, waypoints.clone()) {
                Ok(path) => paths.push(path),
                Err(e) => errors.push(e),
            }
        }
        if paths.is_empty() && errors.is_empty() {
            errors.push(ValidationError::NoPaths);
        }
        if errors.is_empty() {
            Ok(PathNetwork::new(paths))
        } else {
            Err(GameError::InvalidLevel(errors))
        }
    }

    /// The level's waves.
    pub fn resolve_waves(&self, tables: &DataTables) -> std::result::Result<Vec<WaveTemplate>, ValidationError> {
        match &self.waves {
            LevelWaves::Template(name) => tables
                .wave_set(name)
                .map(<[WaveTemplate]>::to_vec)
                .ok_or_else(|| ValidationError::UnknownWaveTemplate(name.clone())),
            LevelWaves::Custom(waves) => Ok(waves.clone()),
        }
    }
}

fn validate_waves(waves: &[WaveTemplate], path_count: usize, tables: &DataTables) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if waves.is_empty() {
        errors.push(ValidationError::NoWaves);
    }
    for (wave, template) in waves.iter().enumerate() {
        if template.groups.is_empty() {
            errors.push(ValidationError::EmptyWave { wave });
        }
        for (group, spawn) in template.groups.iter().enumerate() {
            if tables.enemy(&spawn.enemy).is_none() {
                errors.push(ValidationError::UnknownEnemyType {
                    wave,
                    group,
                    enemy: spawn.enemy.clone(),
                });
            }
            if spawn.count == 0 {
                errors.push(ValidationError::ZeroCount { wave, group });
            }
            if let Some(path) = spawn.path.filter(|p| *p as usize >= path_count) {
                errors.push(ValidationError::UnknownPath { wave, group, path });
            }
        }
    }
    errors
}

// ============================================================================
// Custom Levels
// ============================================================================

/// Player-authored level input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomLevel {
    /// Display name.
    pub name: String,
    /// First path.
    pub primary_path: Vec<GridPoint>,
    /// Optional second path.
    #[serde(default)]
    pub secondary_path: Option<Vec<GridPoint>>,
    /// Hero spawn tile.
    pub hero_spawn: GridPoint,
    /// Wave source.
    pub waves: LevelWaves,
    /// Paw Points at match start.
    pub starting_resources: u32,
    /// Grid columns.
    #[serde(default = "default_grid_width")]
    pub grid_width: u32,
    /// Grid rows.
    #[serde(default = "default_grid_height")]
    pub grid_height: u32,
}

const fn default_grid_width() -> u32 {
    20
}

const fn default_grid_height() -> u32 {
    12
}

impl CustomLevel {
    /// Convert to level data under `id`.
    #[must_use]
    pub fn into_level(self, id: impl Into<String>) -> LevelData {
        let mut paths = vec![self.primary_path];
        paths.extend(self.secondary_path);
        LevelData {
            id: id.into(),
            name: self.name,
            grid_width: self.grid_width,
            grid_height: self.grid_height,
            paths,
            hero_spawn: self.hero_spawn,
            hero: None,
            waves: self.waves,
            starting_resources: self.starting_resources,
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Levels available to a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRegistry {
    levels: BTreeMap<String, LevelData>,
}

impl LevelRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in levels.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for level in builtin_levels() {
            registry.levels.insert(level.id.clone(), level);
        }
        registry
    }

    /// Validate and register a level, replacing any level with the same id.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidLevel`] with every problem found.
    pub fn register(&mut self, id: impl Into<String>, mut data: LevelData, tables: &DataTables) -> Result<()> {
        let id = id.into();
        let errors = data.validate(tables);
        if !errors.is_empty() {
            tracing::debug!(level = %id, problems = errors.len(), "Level rejected");
            return Err(GameError::InvalidLevel(errors));
        }
        data.id.clone_from(&id);
        self.levels.insert(id, data);
        Ok(())
    }

    /// Validate and register a custom level.
    pub fn register_custom(&mut self, id: impl Into<String>, custom: CustomLevel, tables: &DataTables) -> Result<()> {
        let id = id.into();
        let level = custom.into_level(id.clone());
        self.register(id, level, tables)
    }

    /// Remove a level. Returns it if it was registered.
    pub fn unregister(&mut self, id: &str) -> Option<LevelData> {
        self.levels.remove(id)
    }

    /// Look up a level.
    pub fn get(&self, id: &str) -> Result<&LevelData> {
        self.levels
            .get(id)
            .ok_or_else(|| GameError::UnknownLevel(id.to_string()))
    }

    /// Registered ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.levels.keys().map(String::as_str)
    }

    /// Number of registered levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether no levels are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

fn g(x: i32, y: i32) -> GridPoint {
    GridPoint::new(x, y)
}

/// Built-in levels.
#[must_use]
pub fn builtin_levels() -> Vec<LevelData> {
    vec![
        LevelData {
            id: "quad".to_string(),
            name: "The Quad".to_string(),
            grid_width: 20,
            grid_height: 12,
            paths: vec![vec![g(0, 2), g(6, 2), g(6, 8), g(13, 8), g(13, 4), g(19, 4)]],
            hero_spawn: g(15, 6),
            hero: None,
            waves: LevelWaves::Template(STANDARD_WAVES.to_string()),
            starting_resources: 250,
        },
        LevelData {
            id: "crossroads".to_string(),
            name: "Crossroads".to_string(),
            grid_width: 20,
            grid_height: 12,
            paths: vec![
                vec![g(0, 1), g(8, 1), g(8, 6), g(19, 6)],
                vec![g(0, 10), g(8, 10), g(8, 6), g(19, 6)],
            ],
            hero_spawn: g(14, 8),
            hero: None,
            waves: LevelWaves::Template(GAUNTLET_WAVES.to_string()),
            starting_resources: 300,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waves::SpawnGroup;

    #[test]
    fn test_builtin_levels_validate() {
        let tables = DataTables::builtin();
        for level in builtin_levels() {
            assert!(level.validate(&tables).is_empty(), "{}", level.id);
            assert!(level.build_paths().is_ok());
        }
        let registry = LevelRegistry::with_builtin();
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["crossroads", "quad"]);
    }

    #[test]
    fn test_register_collects_every_problem() {
        let tables = DataTables::builtin();
        let mut registry = LevelRegistry::new();
        let custom = CustomLevel {
            name: "Broken".to_string(),
            primary_path: vec![g(0, 0)],
            secondary_path: Some(vec![g(0, 0), g(40, 0)]),
            hero_spawn: g(-1, 3),
            waves: LevelWaves::Custom(vec![WaveTemplate::new(vec![
                SpawnGroup::new("ghost", 3, 500),
                SpawnGroup::new("frosh", 0, 500).on_path(7),
            ])]),
            starting_resources: 100,
            grid_width: 20,
            grid_height: 12,
        };

        let Err(GameError::InvalidLevel(errors)) = registry.register_custom("broken", custom, &tables) else {
            panic!("broken level accepted");
        };
        assert!(errors.contains(&ValidationError::PathTooShort { path: 0, points: 1 }));
        assert!(errors.contains(&ValidationError::WaypointOutOfBounds {
            path: 1,
            index: 1,
            x: 40,
            y: 0
        }));
        assert!(errors.contains(&ValidationError::HeroSpawnOutOfBounds { x: -1, y: 3 }));
        assert!(errors.contains(&ValidationError::UnknownEnemyType {
            wave: 0,
            group: 0,
            enemy: "ghost".to_string()
        }));
        assert!(errors.contains(&ValidationError::ZeroCount { wave: 0, group: 1 }));
        assert!(errors.contains(&ValidationError::UnknownPath {
            wave: 0,
            group: 1,
            path: 7
        }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_and_unregister_custom() {
        let tables = DataTables::builtin();
        let mut registry = LevelRegistry::new();
        let custom = CustomLevel {
            name: "Library Run".to_string(),
            primary_path: vec![g(0, 3), g(12, 3)],
            secondary_path: None,
            hero_spawn: g(5, 5),
            waves: LevelWaves::Template(STANDARD_WAVES.to_string()),
            starting_resources: 180,
            grid_width: 16,
            grid_height: 8,
        };
        registry.register_custom("library", custom, &tables).unwrap();
        assert_eq!(registry.get("library").unwrap().id, "library");

        assert!(registry.unregister("library").is_some());
        assert!(matches!(
            registry.get("library"),
            Err(GameError::UnknownLevel(_))
        ));
    }

    #[test]
    fn test_unknown_template_reported() {
        let tables = DataTables::builtin();
        let mut level = builtin_levels().remove(0);
        level.waves = LevelWaves::Template("nope".to_string());
        assert_eq!(
            level.validate(&tables),
            vec![ValidationError::UnknownWaveTemplate("nope".to_string())]
        );
    }
}
