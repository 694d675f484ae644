//! Enemy definitions.

use serde::{Deserialize, Serialize};

use crate::math::{pct, Fixed};
use crate::status::{StatusApplication, StatusKind};

/// Tower debuff pulsed by an enemy while it walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyAura {
    /// Status applied to every tower in range.
    pub status: StatusKind,
    /// Intensity of the status.
    pub intensity: Fixed,
    /// Aura radius in tiles.
    pub radius: Fixed,
    /// How long each pulse lasts.
    pub duration_ms: u32,
    /// Milliseconds between pulses.
    pub interval_ms: u32,
}

impl EnemyAura {
    /// Status application carried by one pulse.
    #[must_use]
    pub const fn application(&self) -> StatusApplication {
        StatusApplication::new(self.status, self.intensity, self.duration_ms)
    }
}

/// Static definition of an enemy type.
///
/// # Example RON
///
/// ```ron
/// EnemyDefinition(
///     id: "frosh",
///     name: "Freshman",
///     hp: "50",
///     speed: "1",
///     bounty: 5,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyDefinition {
    /// Unique type id referenced by wave templates.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Maximum hit points.
    pub hp: Fixed,
    /// Tiles per second.
    pub speed: Fixed,
    /// Fraction of damage mitigated.
    #[serde(default)]
    pub armor: Fixed,
    /// Paw Points on kill.
    pub bounty: u32,
    /// Damage to the base on leaking.
    #[serde(default = "default_leak_damage")]
    pub leak_damage: u32,
    /// Melee damage against heroes and troops.
    #[serde(default)]
    pub attack_damage: Fixed,
    /// Milliseconds between melee attacks.
    #[serde(default = "default_attack_interval")]
    pub attack_interval_ms: u32,
    /// Boss flag; any wave containing a boss type is a boss wave.
    #[serde(default)]
    pub boss: bool,
    /// Optional tower debuff aura.
    #[serde(default)]
    pub aura: Option<EnemyAura>,
}

const fn default_leak_damage() -> u32 {
    1
}

const fn default_attack_interval() -> u32 {
    1000
}

fn enemy(id: &str, name: &str, hp: i32, speed: Fixed, bounty: u32) -> EnemyDefinition {
    EnemyDefinition {
        id: id.to_string(),
        name: name.to_string(),
        hp: Fixed::from_num(hp),
        speed,
        armor: Fixed::ZERO,
        bounty,
        leak_damage: default_leak_damage(),
        attack_damage: Fixed::from_num(3),
        attack_interval_ms: default_attack_interval(),
        boss: false,
        aura: None,
    }
}

fn tower_aura(status: StatusKind, intensity: Fixed, interval_ms: u32) -> EnemyAura {
    EnemyAura {
        status,
        intensity,
        radius: pct(250),
        duration_ms: 2_000,
        interval_ms,
    }
}

/// Built-in enemy table.
#[must_use]
pub fn builtin_enemies() -> Vec<EnemyDefinition> {
    vec![
        enemy("frosh", "Freshman", 50, Fixed::ONE, 5),
        EnemyDefinition {
            attack_damage: Fixed::from_num(2),
            attack_interval_ms: 800,
            ..enemy("goose", "Campus Goose", 35, pct(180), 6)
        },
        EnemyDefinition {
            armor: pct(30),
            leak_damage: 2,
            attack_damage: Fixed::from_num(8),
            attack_interval_ms: 1200,
            ..enemy("jock", "Varsity Jock", 140, pct(80), 12)
        },
        EnemyDefinition {
            armor: pct(10),
            aura: Some(tower_aura(StatusKind::Weaken, pct(25), 1_000)),
            ..enemy("hacker", "Hacker", 80, Fixed::ONE, 10)
        },
        EnemyDefinition {
            aura: Some(tower_aura(StatusKind::Blind, pct(30), 1_000)),
            ..enemy("ta", "Teaching Assistant", 90, pct(110), 10)
        },
        EnemyDefinition {
            aura: Some(tower_aura(StatusKind::Slow, pct(30), 1_000)),
            ..enemy("mascot", "Rival Mascot", 120, pct(90), 11)
        },
        EnemyDefinition {
            armor: pct(40),
            leak_damage: 10,
            attack_damage: Fixed::from_num(25),
            attack_interval_ms: 1500,
            boss: true,
            aura: Some(EnemyAura {
                status: StatusKind::Disable,
                intensity: Fixed::ONE,
                radius: Fixed::from_num(3),
                duration_ms: 1_500,
                interval_ms: 6_000,
            }),
            ..enemy("dean", "The Dean", 1200, pct(60), 150)
        },
    ]
}
