//! Tower definitions.

use serde::{Deserialize, Serialize};

use crate::math::{pct, Fixed};
use crate::progression::{TargetPriority, TowerKind, TowerStats, UpgradeBranch};
use crate::projectile::{Flight, ProjectileSpec, TargetLostPolicy};

/// A value per upgrade branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchPair<T> {
    /// Branch A.
    pub a: T,
    /// Branch B.
    pub b: T,
}

impl<T> BranchPair<T> {
    /// Value for a branch.
    #[must_use]
    pub const fn get(&self, branch: UpgradeBranch) -> &T {
        match branch {
            UpgradeBranch::A => &self.a,
            UpgradeBranch::B => &self.b,
        }
    }
}

/// Troops garrisoned by a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopDefinition {
    /// How far a troop may stray from its spawn point.
    pub move_radius: Fixed,
    /// Melee reach.
    pub melee_range: Fixed,
    /// Walking speed in tiles per second.
    pub speed: Fixed,
    /// Delay before a freed slot may be refilled.
    pub respawn_ms: u32,
}

/// Static definition of a tower kind.
///
/// # Example RON
///
/// ```ron
/// TowerDefinition(
///     kind: Archer,
///     name: "Archer",
///     build_cost: 70,
///     level_costs: (60, 90),
///     branch_costs: (a: 180, b: 190),
///     branch_names: (a: "Sniper", b: "Volley"),
///     levels: [
///         (damage: "8", range: "3", attack_interval_ms: 600),
///         (damage: "11", range: "3.2", attack_interval_ms: 550),
///         (damage: "15", range: "3.5", attack_interval_ms: 500),
///     ],
///     branches: (
///         a: (damage: "40", range: "5", attack_interval_ms: 900, priority: Strongest),
///         b: (damage: "12", range: "3.5", attack_interval_ms: 500, multi_targets: Some(3)),
///     ),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TowerDefinition {
    /// Tower kind.
    pub kind: TowerKind,
    /// Display name.
    pub name: String,
    /// Cost to place at level 1.
    pub build_cost: u32,
    /// Cost of the 1→2 and 2→3 upgrades.
    pub level_costs: (u32, u32),
    /// Cost of the 3→4 upgrade per branch.
    pub branch_costs: BranchPair<u32>,
    /// Display names of the branches.
    #[serde(default = "default_branch_names")]
    pub branch_names: BranchPair<String>,
    /// Stat rows for levels 1-3.
    pub levels: [TowerStats; 3],
    /// Stat rows for the level-4 branches.
    pub branches: BranchPair<TowerStats>,
    /// Projectile fired on attack; instant hits when absent.
    #[serde(default)]
    pub projectile: Option<ProjectileSpec>,
    /// Garrison parameters for stations.
    #[serde(default)]
    pub troop: Option<TroopDefinition>,
}

fn default_branch_names() -> BranchPair<String> {
    BranchPair {
        a: "A".to_string(),
        b: "B".to_string(),
    }
}

fn t(value: i32) -> Fixed {
    Fixed::from_num(value)
}

fn income(amount: u32, interval_ms: u32) -> TowerStats {
    TowerStats {
        income: Some(amount),
        income_interval_ms: Some(interval_ms),
        ..TowerStats::default()
    }
}

fn aura(radius: Fixed, range_buff: i32, damage_buff: i32) -> TowerStats {
    TowerStats {
        range: radius,
        aura_range_buff: Some(pct(range_buff)),
        aura_damage_buff: Some(pct(damage_buff)),
        ..TowerStats::default()
    }
}

fn garrison(damage: i32, aggro: Fixed, interval_ms: u32, troop_hp: u32) -> TowerStats {
    TowerStats {
        troop_hp: Some(troop_hp),
        ..TowerStats::attack(t(damage), aggro, interval_ms)
    }
}

/// Built-in tower table, one entry per [`TowerKind`] in declaration order.
#[must_use]
pub fn builtin_towers() -> Vec<TowerDefinition> {
    vec![
        TowerDefinition {
            kind: TowerKind::Cannon,
            name: "Cannon".to_string(),
            build_cost: 100,
            level_costs: (80, 120),
            branch_costs: BranchPair { a: 200, b: 220 },
            branch_names: BranchPair {
                a: "Mortar".to_string(),
                b: "Concussion".to_string(),
            },
            levels: [
                TowerStats::attack(t(20), pct(250), 1000).with_splash(t(1)),
                TowerStats::attack(t(30), pct(260), 1000).with_splash(pct(110)),
                TowerStats::attack(t(42), pct(280), 950).with_splash(pct(120)),
            ],
            branches: BranchPair {
                a: TowerStats::attack(t(70), pct(350), 1400).with_splash(pct(180)),
                b: TowerStats::attack(t(45), pct(280), 900)
                    .with_splash(pct(120))
                    .with_stun(pct(25), 800),
            },
            projectile: Some(ProjectileSpec {
                flight: Flight::Duration(600),
                arc_height: pct(150),
                guided: false,
                on_target_lost: TargetLostPolicy::Splash,
            }),
            troop: None,
        },
        TowerDefinition {
            kind: TowerKind::Archer,
            name: "Archer".to_string(),
            build_cost: 70,
            level_costs: (60, 90),
            branch_costs: BranchPair { a: 180, b: 190 },
            branch_names: BranchPair {
                a: "Sniper".to_string(),
                b: "Volley".to_string(),
            },
            levels: [
                TowerStats::attack(t(8), t(3), 600),
                TowerStats::attack(t(11), pct(320), 550),
                TowerStats::attack(t(15), pct(350), 500),
            ],
            branches: BranchPair {
                a: TowerStats::attack(t(40), t(5), 900).with_priority(TargetPriority::Strongest),
                b: TowerStats::attack(t(12), pct(350), 500).with_multi(3),
            },
            projectile: Some(ProjectileSpec {
                flight: Flight::Speed(t(10)),
                arc_height: pct(30),
                guided: true,
                on_target_lost: TargetLostPolicy::Miss,
            }),
            troop: None,
        },
        TowerDefinition {
            kind: TowerKind::Frost,
            name: "Frost".to_string(),
            build_cost: 90,
            level_costs: (70, 100),
            branch_costs: BranchPair { a: 190, b: 200 },
            branch_names: BranchPair {
                a: "Glacier".to_string(),
                b: "Shatter".to_string(),
            },
            levels: [
                TowerStats::attack(t(4), pct(250), 900).with_slow(pct(30), 1500),
                TowerStats::attack(t(6), pct(260), 900).with_slow(pct(35), 1500),
                TowerStats::attack(t(8), pct(280), 850).with_slow(pct(40), 1800),
            ],
            branches: BranchPair {
                a: TowerStats::attack(t(10), t(3), 850).with_slow(pct(60), 2000),
                b: TowerStats::attack(t(12), pct(280), 1000)
                    .with_splash(pct(120))
                    .with_slow(pct(40), 1500),
            },
            projectile: Some(ProjectileSpec {
                flight: Flight::Speed(t(8)),
                arc_height: Fixed::ZERO,
                guided: true,
                on_target_lost: TargetLostPolicy::Miss,
            }),
            troop: None,
        },
        TowerDefinition {
            kind: TowerKind::Tesla,
            name: "Tesla".to_string(),
            build_cost: 120,
            level_costs: (90, 130),
            branch_costs: BranchPair { a: 240, b: 250 },
            branch_names: BranchPair {
                a: "Storm".to_string(),
                b: "Overload".to_string(),
            },
            levels: [
                TowerStats::attack(t(14), pct(250), 1200).with_chain(2),
                TowerStats::attack(t(18), pct(260), 1150).with_chain(3),
                TowerStats::attack(t(24), pct(280), 1100).with_chain(3),
            ],
            branches: BranchPair {
                a: TowerStats::attack(t(28), t(3), 1100).with_chain(6),
                b: TowerStats::attack(t(55), pct(280), 1300)
                    .with_chain(2)
                    .with_stun(pct(30), 600),
            },
            projectile: None,
            troop: None,
        },
        TowerDefinition {
            kind: TowerKind::Flame,
            name: "Flame".to_string(),
            build_cost: 85,
            level_costs: (65, 95),
            branch_costs: BranchPair { a: 185, b: 195 },
            branch_names: BranchPair {
                a: "Inferno".to_string(),
                b: "Napalm".to_string(),
            },
            levels: [
                TowerStats::attack(t(5), pct(180), 400).with_burn(t(4), 2000),
                TowerStats::attack(t(7), pct(190), 400).with_burn(t(6), 2000),
                TowerStats::attack(t(9), t(2), 380).with_burn(t(8), 2200),
            ],
            branches: BranchPair {
                a: TowerStats::attack(t(12), pct(220), 350).with_burn(t(16), 3000),
                b: TowerStats::attack(t(8), t(2), 400)
                    .with_splash(t(1))
                    .with_burn(t(10), 2500),
            },
            projectile: None,
            troop: None,
        },
        TowerDefinition {
            kind: TowerKind::Bank,
            name: "Bank".to_string(),
            build_cost: 110,
            level_costs: (80, 120),
            branch_costs: BranchPair { a: 220, b: 220 },
            branch_names: BranchPair {
                a: "Vault".to_string(),
                b: "Exchange".to_string(),
            },
            levels: [
                income(15, 10_000),
                income(22, 10_000),
                income(30, 9_000),
            ],
            branches: BranchPair {
                a: income(60, 9_000),
                b: income(40, 6_000),
            },
            projectile: None,
            troop: None,
        },
        TowerDefinition {
            kind: TowerKind::Beacon,
            name: "Beacon".to_string(),
            build_cost: 100,
            level_costs: (80, 110),
            branch_costs: BranchPair { a: 210, b: 210 },
            branch_names: BranchPair {
                a: "Lighthouse".to_string(),
                b: "Rally".to_string(),
            },
            levels: [
                aura(pct(250), 10, 10),
                aura(t(3), 15, 15),
                aura(pct(320), 20, 20),
            ],
            branches: BranchPair {
                a: aura(t(4), 35, 15),
                b: aura(pct(320), 15, 40),
            },
            projectile: None,
            troop: None,
        },
        TowerDefinition {
            kind: TowerKind::Station,
            name: "Station".to_string(),
            build_cost: 120,
            level_costs: (90, 120),
            branch_costs: BranchPair { a: 230, b: 240 },
            branch_names: BranchPair {
                a: "Elite".to_string(),
                b: "Express".to_string(),
            },
            levels: [
                garrison(6, t(2), 1000, 60),
                garrison(8, t(2), 1000, 80),
                garrison(11, pct(220), 950, 100),
            ],
            branches: BranchPair {
                a: garrison(18, pct(220), 900, 160),
                b: garrison(10, pct(250), 700, 100),
            },
            projectile: None,
            troop: Some(TroopDefinition {
                move_radius: t(2),
                melee_range: pct(60),
                speed: pct(150),
                respawn_ms: 8_000,
            }),
        },
    ]
}
