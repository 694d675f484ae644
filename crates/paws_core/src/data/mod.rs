//! Static data tables.
//!
//! Tower, enemy, hero, spell and wave definitions. The engine only reads
//! these; a built-in set ships with the crate and alternative tables can be
//! parsed from RON text.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `paws_headless`.

mod enemy_data;
mod hero_data;
mod spell_data;
mod tower_data;
mod wave_data;

use serde::{Deserialize, Serialize};

pub use enemy_data::{builtin_enemies, EnemyAura, EnemyDefinition};
pub use hero_data::{builtin_heroes, HeroAbility, HeroDefinition};
pub use spell_data::{builtin_spells, SpellDefinition};
pub use tower_data::{builtin_towers, BranchPair, TowerDefinition, TroopDefinition};
pub use wave_data::{gauntlet_waves, standard_waves, GAUNTLET_WAVES, STANDARD_WAVES};

use crate::error::{GameError, Result, ValidationError};
use crate::progression::TowerKind;
use crate::spells::SpellKind;
use crate::waves::WaveTemplate;

/// A named list of waves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveSet {
    /// Set name referenced by levels.
    pub name: String,
    /// Waves in order.
    pub waves: Vec<WaveTemplate>,
}

/// Unvalidated table file layout.
#[derive(Debug, Clone, Deserialize)]
struct TableFile {
    towers: Vec<TowerDefinition>,
    enemies: Vec<EnemyDefinition>,
    heroes: Vec<HeroDefinition>,
    spells: Vec<SpellDefinition>,
    #[serde(default)]
    wave_sets: Vec<WaveSet>,
}

/// All static definitions the engine reads.
///
/// Every [`TowerKind`] and [`SpellKind`] has exactly one definition, so the
/// per-kind accessors are infallible.
///
/// # Example RON
///
/// ```ron
/// (
///     towers: [ /* one TowerDefinition per kind */ ],
///     enemies: [ (id: "frosh", name: "Freshman", hp: "50", speed: "1", bounty: 5) ],
///     heroes: [ /* HeroDefinition */ ],
///     spells: [ /* one SpellDefinition per kind */ ],
///     wave_sets: [ (name: "standard", waves: [ /* WaveTemplate */ ]) ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TableFile")]
pub struct DataTables {
    towers: Vec<TowerDefinition>,
    enemies: Vec<EnemyDefinition>,
    heroes: Vec<HeroDefinition>,
    spells: Vec<SpellDefinition>,
    wave_sets: Vec<WaveSet>,
}

impl TryFrom<TableFile> for DataTables {
    type Error = String;

    fn try_from(mut file: TableFile) -> std::result::Result<Self, Self::Error> {
        for kind in TowerKind::ALL {
            let count = file.towers.iter().filter(|t| t.kind == kind).count();
            if count != 1 {
                return Err(format!("expected one definition for tower {kind:?}, found {count}"));
            }
        }
        for kind in SpellKind::ALL {
            let count = file.spells.iter().filter(|s| s.kind == kind).count();
            if count != 1 {
                return Err(format!("expected one definition for spell {kind:?}, found {count}"));
            }
        }
        if let Some(dup) = first_duplicate(file.enemies.iter().map(|e| e.id.as_str())) {
            return Err(format!("duplicate enemy id '{dup}'"));
        }
        if let Some(dup) = first_duplicate(file.heroes.iter().map(|h| h.id.as_str())) {
            return Err(format!("duplicate hero id '{dup}'"));
        }
        if file.heroes.is_empty() {
            return Err("at least one hero is required".to_string());
        }
        if let Some(err) = file.towers.iter().find_map(cost_problem) {
            return Err(err.to_string());
        }

        file.towers.sort_by_key(|t| t.kind);
        file.spells.sort_by_key(|s| s.kind);
        Ok(Self {
            towers: file.towers,
            enemies: file.enemies,
            heroes: file.heroes,
            spells: file.spells,
            wave_sets: file.wave_sets,
        })
    }
}

/// Upgrade costs must not decrease: level 2, level 3, then either branch.
fn cost_problem(tower: &TowerDefinition) -> Option<ValidationError> {
    let (to_two, to_three) = tower.level_costs;
    let steps = [
        (3, to_three, to_two),
        (4, tower.branch_costs.a, to_three),
        (4, tower.branch_costs.b, to_three),
    ];
    steps
        .into_iter()
        .find(|&(_, cost, previous)| cost < previous)
        .map(|(level, cost, previous)| ValidationError::DecreasingUpgradeCost {
            kind: tower.kind,
            level,
            cost,
            previous,
        })
}

fn first_duplicate<'a>(ids: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = std::collections::BTreeSet::new();
    ids.into_iter().find(|id| !seen.insert(*id))
}

impl DataTables {
    /// The built-in tables.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            towers: builtin_towers(),
            enemies: builtin_enemies(),
            heroes: builtin_heroes(),
            spells: builtin_spells(),
            wave_sets: vec![
                WaveSet {
                    name: STANDARD_WAVES.to_string(),
                    waves: standard_waves(),
                },
                WaveSet {
                    name: GAUNTLET_WAVES.to_string(),
                    waves: gauntlet_waves(),
                },
            ],
        }
    }

    /// Parse tables from RON text.
    ///
    /// `source_name` only labels errors.
    pub fn from_ron_str(source_name: &str, text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::DataParseError {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }

    /// Render the tables as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::InvalidState(format!("Failed to render data tables: {e}")))
    }

    /// Definition of a tower kind.
    #[must_use]
    pub fn tower(&self, kind: TowerKind) -> &TowerDefinition {
        &self.towers[kind as usize]
    }

    /// All tower definitions in kind order.
    #[must_use]
    pub fn towers(&self) -> &[TowerDefinition] {
        &self.towers
    }

    /// Definition of an enemy type.
    #[must_use]
    pub fn enemy(&self, id: &str) -> Option<&EnemyDefinition> {
        self.enemies.iter().find(|e| e.id == id)
    }

    /// All enemy definitions.
    #[must_use]
    pub fn enemies(&self) -> &[EnemyDefinition] {
        &self.enemies
    }

    /// Definition of a hero type.
    #[must_use]
    pub fn hero(&self, id: &str) -> Option<&HeroDefinition> {
        self.heroes.iter().find(|h| h.id == id)
    }

    /// The first hero, used when a level names none.
    #[must_use]
    pub fn default_hero(&self) -> &HeroDefinition {
        &self.heroes[0]
    }

    /// Definition of a spell.
    #[must_use]
    pub fn spell(&self, kind: SpellKind) -> &SpellDefinition {
        &self.spells[kind as usize]
    }

    /// Waves of a named set.
    #[must_use]
    pub fn wave_set(&self, name: &str) -> Option<&[WaveTemplate]> {
        self.wave_sets
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.waves.as_slice())
    }

    /// Add or replace a named wave set.
    pub fn insert_wave_set(&mut self, name: impl Into<String>, waves: Vec<WaveTemplate>) {
        let name = name.into();
        self.wave_sets.retain(|s| s.name != name);
        self.wave_sets.push(WaveSet { name, waves });
    }

    /// Replace the definition of `definition.kind`.
    pub fn replace_tower(&mut self, definition: TowerDefinition) {
        if let Some(slot) = self.towers.iter_mut().find(|t| t.kind == definition.kind) {
            *slot = definition;
        }
    }

    /// Add or replace an enemy type.
    pub fn insert_enemy(&mut self, definition: EnemyDefinition) {
        match self.enemies.iter_mut().find(|e| e.id == definition.id) {
            Some(slot) => *slot = definition,
            None => self.enemies.push(definition),
        }
    }
}

impl Default for DataTables {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_are_complete() {
        let tables = DataTables::builtin();
        for kind in TowerKind::ALL {
            assert_eq!(tables.tower(kind).kind, kind);
        }
        for kind in SpellKind::ALL {
            assert_eq!(tables.spell(kind).kind, kind);
        }
        assert!(tables.enemy("frosh").is_some());
        assert!(tables.enemy("nobody").is_none());
        assert!(tables.wave_set(STANDARD_WAVES).is_some());
    }

    #[test]
    fn test_builtin_waves_reference_known_enemies() {
        let tables = DataTables::builtin();
        for set in [STANDARD_WAVES, GAUNTLET_WAVES] {
            for wave in tables.wave_set(set).unwrap() {
                for group in &wave.groups {
                    assert!(tables.enemy(&group.enemy).is_some(), "{}", group.enemy);
                }
            }
        }
    }

    #[test]
    fn test_ron_round_trip() {
        let tables = DataTables::builtin();
        let text = tables.to_ron_string().unwrap();
        let parsed = DataTables::from_ron_str("builtin", &text).unwrap();
        assert_eq!(parsed, tables);
    }

    #[test]
    fn test_decreasing_upgrade_costs_rejected() {
        let mut tables = DataTables::builtin();
        let cannon = tables
            .towers
            .iter_mut()
            .find(|t| t.kind == TowerKind::Cannon)
            .unwrap();
        cannon.level_costs = (500, 10);
        let text = tables.to_ron_string().unwrap();
        let err = DataTables::from_ron_str("cheap.ron", &text).unwrap_err();
        assert!(err.to_string().contains("below the previous 500"), "{err}");
    }

    #[test]
    fn test_branch_cheaper_than_level_three_rejected() {
        let mut cannon = DataTables::builtin().tower(TowerKind::Cannon).clone();
        cannon.branch_costs.b = cannon.level_costs.1 - 1;
        let err = cost_problem(&cannon).unwrap();
        assert!(matches!(
            err,
            ValidationError::DecreasingUpgradeCost { level: 4, .. }
        ));
        assert!(DataTables::builtin().towers().iter().all(|t| cost_problem(t).is_none()));
    }

    #[test]
    fn test_incomplete_tables_rejected() {
        let text = "(towers: [], enemies: [], heroes: [], spells: [])";
        let err = DataTables::from_ron_str("empty.ron", text).unwrap_err();
        assert!(matches!(err, GameError::DataParseError { .. }));
        assert!(err.to_string().contains("empty.ron"));
    }
}
