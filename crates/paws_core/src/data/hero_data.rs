//! Hero definitions.

use serde::{Deserialize, Serialize};

use crate::components::CombatProfile;
use crate::math::{pct, Fixed};

/// Ability a hero fires automatically while engaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeroAbility {
    /// Damage and stun every enemy around the hero.
    Shockwave {
        /// Damage dealt.
        damage: Fixed,
        /// Radius in tiles.
        radius: Fixed,
        /// Stun duration.
        stun_ms: u32,
    },
    /// Absorb incoming damage.
    Shield {
        /// Damage absorbed.
        amount: Fixed,
        /// Shield lifetime.
        duration_ms: u32,
    },
    /// Boost towers around the hero.
    Rally {
        /// Damage boost granted.
        damage_boost: Fixed,
        /// Range boost granted.
        range_boost: Fixed,
        /// Radius in tiles.
        radius: Fixed,
        /// Boost lifetime.
        duration_ms: u32,
    },
}

/// Static definition of a hero type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroDefinition {
    /// Unique type id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Maximum hit points.
    pub hp: Fixed,
    /// Attack parameters.
    pub profile: CombatProfile,
    /// Maximum distance from home while engaging.
    pub leash: Fixed,
    /// Longest single engagement before walking home.
    #[serde(default = "default_aggro_timeout")]
    pub aggro_timeout_ms: u32,
    /// Respawn delay after death.
    pub respawn_ms: u32,
    /// Auto-cast ability.
    pub ability: HeroAbility,
    /// Ability cooldown.
    pub ability_cooldown_ms: u32,
}

const fn default_aggro_timeout() -> u32 {
    8_000
}

/// Built-in hero table.
#[must_use]
pub fn builtin_heroes() -> Vec<HeroDefinition> {
    vec![
        HeroDefinition {
            id: "captain".to_string(),
            name: "Team Captain".to_string(),
            hp: Fixed::from_num(400),
            profile: CombatProfile {
                damage: Fixed::from_num(18),
                range: pct(80),
                aggro_range: Fixed::from_num(3),
                attack_interval_ms: 900,
                speed: Fixed::from_num(2),
            },
            leash: Fixed::from_num(5),
            aggro_timeout_ms: default_aggro_timeout(),
            respawn_ms: 12_000,
            ability: HeroAbility::Shockwave {
                damage: Fixed::from_num(40),
                radius: pct(200),
                stun_ms: 1_000,
            },
            ability_cooldown_ms: 10_000,
        },
        HeroDefinition {
            id: "guardian".to_string(),
            name: "Campus Guardian".to_string(),
            hp: Fixed::from_num(550),
            profile: CombatProfile {
                damage: Fixed::from_num(12),
                range: pct(80),
                aggro_range: pct(250),
                attack_interval_ms: 1000,
                speed: pct(160),
            },
            leash: Fixed::from_num(4),
            aggro_timeout_ms: default_aggro_timeout(),
            respawn_ms: 15_000,
            ability: HeroAbility::Shield {
                amount: Fixed::from_num(150),
                duration_ms: 5_000,
            },
            ability_cooldown_ms: 12_000,
        },
        HeroDefinition {
            id: "coach".to_string(),
            name: "Coach".to_string(),
            hp: Fixed::from_num(320),
            profile: CombatProfile {
                damage: Fixed::from_num(10),
                range: Fixed::from_num(2),
                aggro_range: Fixed::from_num(3),
                attack_interval_ms: 800,
                speed: pct(180),
            },
            leash: Fixed::from_num(5),
            aggro_timeout_ms: default_aggro_timeout(),
            respawn_ms: 10_000,
            ability: HeroAbility::Rally {
                damage_boost: pct(25),
                range_boost: pct(15),
                radius: Fixed::from_num(3),
                duration_ms: 5_000,
            },
            ability_cooldown_ms: 15_000,
        },
    ]
}
