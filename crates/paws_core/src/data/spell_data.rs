//! Spell definitions.

use serde::{Deserialize, Serialize};

use crate::math::{pct, Fixed};
use crate::spells::SpellKind;

/// Static definition of a player spell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellDefinition {
    /// Spell kind.
    pub kind: SpellKind,
    /// Display name.
    pub name: String,
    /// Paw Points per cast.
    pub cost: u32,
    /// Milliseconds before the spell may be cast again.
    pub cooldown_ms: u32,
    /// Area of effect in tiles.
    pub radius: Fixed,
    /// Instant damage (meteor).
    #[serde(default)]
    pub damage: Fixed,
    /// Status or boost strength (burn per second, boost fraction).
    #[serde(default)]
    pub intensity: Fixed,
    /// Duration of the applied status or boost.
    pub duration_ms: u32,
}

/// Built-in spell table, one entry per [`SpellKind`] in declaration order.
#[must_use]
pub fn builtin_spells() -> Vec<SpellDefinition> {
    vec![
        SpellDefinition {
            kind: SpellKind::Meteor,
            name: "Meteor".to_string(),
            cost: 60,
            cooldown_ms: 30_000,
            radius: pct(180),
            damage: Fixed::from_num(120),
            intensity: Fixed::from_num(10),
            duration_ms: 3_000,
        },
        SpellDefinition {
            kind: SpellKind::Blizzard,
            name: "Blizzard".to_string(),
            cost: 50,
            cooldown_ms: 25_000,
            radius: pct(250),
            damage: Fixed::ZERO,
            intensity: Fixed::ONE,
            duration_ms: 2_500,
        },
        SpellDefinition {
            kind: SpellKind::Overclock,
            name: "Overclock".to_string(),
            cost: 40,
            cooldown_ms: 20_000,
            radius: Fixed::from_num(3),
            damage: Fixed::ZERO,
            intensity: pct(50),
            duration_ms: 8_000,
        },
        SpellDefinition {
            kind: SpellKind::Spotlight,
            name: "Spotlight".to_string(),
            cost: 30,
            cooldown_ms: 20_000,
            radius: Fixed::from_num(3),
            damage: Fixed::ZERO,
            intensity: pct(30),
            duration_ms: 8_000,
        },
    ]
}
