//! Tower progression and stat calculation.
//!
//! Levels 1-3 follow a single progression table per tower kind; level 4
//! branches into one of two mutually exclusive specializations. The
//! `(kind, level, branch)` triple is modelled as [`TowerVariant`] and resolved
//! with a `match` against the tower's [`TowerDefinition`] table.
//!
//! Everything here is pure: no live entities, no side effects.

use serde::{Deserialize, Serialize};

use crate::data::TowerDefinition;
use crate::math::Fixed;

/// Highest tower level.
pub const MAX_LEVEL: u8 = 4;

/// Level at which a tower commits to an upgrade branch.
pub const BRANCH_LEVEL: u8 = 4;

/// Tower types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TowerKind {
    /// Lobbed shells with splash damage.
    Cannon,
    /// Fast guided arrows, single target.
    Archer,
    /// Slowing shots.
    Frost,
    /// Instant chain lightning.
    Tesla,
    /// Short-range burning damage.
    Flame,
    /// Generates Paw Points over time.
    Bank,
    /// Buffs nearby towers.
    Beacon,
    /// Garrison that spawns troops from a train.
    Station,
}

impl TowerKind {
    /// All tower kinds in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Cannon,
        Self::Archer,
        Self::Frost,
        Self::Tesla,
        Self::Flame,
        Self::Bank,
        Self::Beacon,
        Self::Station,
    ];

    /// What the tower does each tick.
    #[must_use]
    pub const fn role(self) -> TowerRole {
        match self {
            Self::Cannon | Self::Archer | Self::Frost | Self::Tesla | Self::Flame => {
                TowerRole::Attack
            }
            Self::Bank => TowerRole::Income,
            Self::Beacon => TowerRole::Aura,
            Self::Station => TowerRole::Garrison,
        }
    }
}

/// Behavioural role of a tower kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerRole {
    /// Attacks enemies directly.
    Attack,
    /// Produces Paw Points.
    Income,
    /// Boosts other towers.
    Aura,
    /// Spawns troops.
    Garrison,
}

/// Level-4 specialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UpgradeBranch {
    /// First specialization.
    A,
    /// Second specialization.
    B,
}

/// Target selection order when no sticky target is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetPriority {
    /// Enemy with the least remaining distance to the goal.
    #[default]
    First,
    /// Enemy with the most current hp.
    Strongest,
}

/// How an attack distributes damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackPattern {
    /// Tower does not attack.
    None,
    /// One target.
    Single,
    /// Primary target plus up to `extra_targets` hops.
    Chain {
        /// Additional enemies hit after the primary.
        extra_targets: u32,
    },
    /// Radial damage around the impact point.
    Splash {
        /// Outer radius of the blast.
        radius: Fixed,
    },
    /// Several independent targets at once.
    Multi {
        /// Maximum simultaneous targets.
        targets: u32,
    },
}

/// A tower's level/branch identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerVariant {
    /// Levels 1-3 on the shared progression table.
    Base {
        /// Tower kind.
        kind: TowerKind,
        /// Level in `1..=3`.
        level: u8,
    },
    /// Level 4, specialized.
    Branch {
        /// Tower kind.
        kind: TowerKind,
        /// Chosen specialization.
        branch: UpgradeBranch,
    },
}

/// Why an upgrade step is not possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeRefusal {
    /// Already level 4 on the requested branch (or no branch requested).
    MaxLevel,
    /// Already level 4 on the other branch.
    BranchLocked(UpgradeBranch),
    /// Level 3 towers must name a branch.
    BranchRequired,
    /// A branch was named before level 3.
    BranchTooEarly,
}

impl TowerVariant {
    /// Build a variant from stored tower fields.
    ///
    /// Returns `None` if the fields break the invariant that a branch is set
    /// exactly at level 4.
    #[must_use]
    pub fn new(kind: TowerKind, level: u8, upgrade: Option<UpgradeBranch>) -> Option<Self> {
        match (level, upgrade) {
            (1..=3, None) => Some(Self::Base { kind, level }),
            (BRANCH_LEVEL, Some(branch)) => Some(Self::Branch { kind, branch }),
            _ => None,
        }
    }

    /// Tower kind.
    #[must_use]
    pub const fn kind(self) -> TowerKind {
        match self {
            Self::Base { kind, .. } | Self::Branch { kind, .. } => kind,
        }
    }

    /// Numeric level (1-4).
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Base { level, .. } => level,
            Self::Branch { .. } => BRANCH_LEVEL,
        }
    }

    /// Branch, if specialized.
    #[must_use]
    pub const fn branch(self) -> Option<UpgradeBranch> {
        match self {
            Self::Base { .. } => None,
            Self::Branch { branch, .. } => Some(branch),
        }
    }

    /// The variant reached by upgrading once.
    pub fn next(self, requested: Option<UpgradeBranch>) -> Result<Self, UpgradeRefusal> {
        match (self, requested) {
            (Self::Branch { branch: held, .. }, Some(wanted)) if held != wanted => {
                Err(UpgradeRefusal::BranchLocked(held))
            }
            (Self::Branch { .. }, _) => Err(UpgradeRefusal::MaxLevel),
            (Self::Base { level: 3, .. }, None) => Err(UpgradeRefusal::BranchRequired),
            (Self::Base { kind, level: 3 }, Some(branch)) => Ok(Self::Branch { kind, branch }),
            (Self::Base { .. }, Some(_)) => Err(UpgradeRefusal::BranchTooEarly),
            (Self::Base { kind, level }, None) => Ok(Self::Base {
                kind,
                level: level + 1,
            }),
        }
    }
}

/// Stat bundle of a tower variant.
///
/// Table rows in [`TowerDefinition`] use this type directly; the calculator
/// returns a copy with active boosts folded in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerStats {
    /// Damage per hit (troop damage for stations).
    pub damage: Fixed,
    /// Attack range in tiles (aura radius for beacons, troop aggro for stations).
    pub range: Fixed,
    /// Milliseconds between attacks.
    pub attack_interval_ms: u32,
    /// Target selection order.
    pub priority: TargetPriority,
    /// Duration of slow/burn/stun applied on hit.
    pub effect_duration_ms: u32,
    /// Slow intensity applied on hit.
    pub slow_amount: Option<Fixed>,
    /// Additional chain hops.
    pub chain_targets: Option<u32>,
    /// Splash radius at impact.
    pub splash_radius: Option<Fixed>,
    /// Simultaneous targets.
    pub multi_targets: Option<u32>,
    /// Probability of stunning on hit.
    pub stun_chance: Option<Fixed>,
    /// Burn damage per second applied on hit.
    pub burn_damage: Option<Fixed>,
    /// Paw Points granted per income interval.
    pub income: Option<u32>,
    /// Milliseconds between income payouts.
    pub income_interval_ms: Option<u32>,
    /// Range boost granted to towers inside the aura.
    pub aura_range_buff: Option<Fixed>,
    /// Damage boost granted to towers inside the aura.
    pub aura_damage_buff: Option<Fixed>,
    /// Hit points of each garrison troop.
    pub troop_hp: Option<u32>,
}

impl Default for TowerStats {
    fn default() -> Self {
        Self {
            damage: Fixed::ZERO,
            range: Fixed::ZERO,
            attack_interval_ms: 1000,
            priority: TargetPriority::First,
            effect_duration_ms: 0,
            slow_amount: None,
            chain_targets: None,
            splash_radius: None,
            multi_targets: None,
            stun_chance: None,
            burn_damage: None,
            income: None,
            income_interval_ms: None,
            aura_range_buff: None,
            aura_damage_buff: None,
            troop_hp: None,
        }
    }
}

impl TowerStats {
    /// Row for an attacking variant.
    #[must_use]
    pub fn attack(damage: Fixed, range: Fixed, attack_interval_ms: u32) -> Self {
        Self {
            damage,
            range,
            attack_interval_ms,
            ..Self::default()
        }
    }

    /// Builder: target priority.
    #[must_use]
    pub fn with_priority(mut self, priority: TargetPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: slow on hit.
    #[must_use]
    pub fn with_slow(mut self, amount: Fixed, duration_ms: u32) -> Self {
        self.slow_amount = Some(amount);
        self.effect_duration_ms = duration_ms;
        self
    }

    /// Builder: burn on hit.
    #[must_use]
    pub fn with_burn(mut self, per_second: Fixed, duration_ms: u32) -> Self {
        self.burn_damage = Some(per_second);
        self.effect_duration_ms = duration_ms;
        self
    }

    /// Builder: stun chance on hit.
    #[must_use]
    pub fn with_stun(mut self, chance: Fixed, duration_ms: u32) -> Self {
        self.stun_chance = Some(chance);
        self.effect_duration_ms = duration_ms;
        self
    }

    /// Builder: chain hops.
    #[must_use]
    pub fn with_chain(mut self, extra_targets: u32) -> Self {
        self.chain_targets = Some(extra_targets);
        self
    }

    /// Builder: splash radius.
    #[must_use]
    pub fn with_splash(mut self, radius: Fixed) -> Self {
        self.splash_radius = Some(radius);
        self
    }

    /// Builder: multiple targets.
    #[must_use]
    pub fn with_multi(mut self, targets: u32) -> Self {
        self.multi_targets = Some(targets);
        self
    }

    /// Whether this variant attacks enemies itself.
    #[must_use]
    pub fn is_attacker(&self) -> bool {
        self.damage > Fixed::ZERO && self.range > Fixed::ZERO && self.troop_hp.is_none()
    }

    /// Attack pattern implied by the optional fields.
    ///
    /// Chain wins over splash, splash over multi-target.
    #[must_use]
    pub fn pattern(&self) -> AttackPattern {
        if !self.is_attacker() {
            return AttackPattern::None;
        }
        if let Some(extra_targets) = self.chain_targets {
            AttackPattern::Chain { extra_targets }
        } else if let Some(radius) = self.splash_radius {
            AttackPattern::Splash { radius }
        } else if let Some(targets) = self.multi_targets {
            AttackPattern::Multi { targets }
        } else {
            AttackPattern::Single
        }
    }
}

/// Calculate the stats of a tower variant under active boosts.
///
/// Boosts are multiplicative: `damage × (1 + damage_boost)`,
/// `range × (1 + range_boost)`. Negative boosts are treated as zero.
#[must_use]
pub fn calculate_stats(
    definition: &TowerDefinition,
    variant: TowerVariant,
    range_boost: Fixed,
    damage_boost: Fixed,
) -> TowerStats {
    let base = match variant {
        TowerVariant::Base { level, .. } => {
            let index = usize::from(level.clamp(1, 3) - 1);
            &definition.levels[index]
        }
        TowerVariant::Branch { branch, .. } => definition.branches.get(branch),
    };

    let mut stats = base.clone();
    stats.damage = stats.damage * (Fixed::ONE + damage_boost.max(Fixed::ZERO));
    stats.range = stats.range * (Fixed::ONE + range_boost.max(Fixed::ZERO));
    stats
}

/// Cost to move a tower from `level` to the next level.
///
/// At level 3 the cost depends on the requested branch; `None` at level 3
/// returns the cheaper branch. Returns `None` at level 4.
#[must_use]
pub fn upgrade_cost(
    definition: &TowerDefinition,
    level: u8,
    branch: Option<UpgradeBranch>,
) -> Option<u32> {
    match level {
        1 => Some(definition.level_costs.0),
        2 => Some(definition.level_costs.1),
        3 => Some(match branch {
            Some(b) => *definition.branch_costs.get(b),
            None => definition.branch_costs.a.min(definition.branch_costs.b),
        }),
        _ => None,
    }
}

/// Cost to place a level-1 tower.
#[must_use]
pub fn build_cost(definition: &TowerDefinition) -> u32 {
    definition.build_cost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataTables;
    use crate::math::pct;

    #[test]
    fn test_cannon_level_one_matches_table() {
        let tables = DataTables::builtin();
        let def = tables.tower(TowerKind::Cannon);
        let stats = calculate_stats(
            def,
            TowerVariant::Base {
                kind: TowerKind::Cannon,
                level: 1,
            },
            Fixed::ZERO,
            Fixed::ZERO,
        );
        assert_eq!(stats.damage, Fixed::from_num(20));
        assert_eq!(stats.attack_interval_ms, 1000);
        assert!(matches!(stats.pattern(), AttackPattern::Splash { .. }));
    }

    #[test]
    fn test_boosts_are_multiplicative() {
        let tables = DataTables::builtin();
        let def = tables.tower(TowerKind::Archer);
        let variant = TowerVariant::Base {
            kind: TowerKind::Archer,
            level: 2,
        };
        let plain = calculate_stats(def, variant, Fixed::ZERO, Fixed::ZERO);
        let boosted = calculate_stats(def, variant, pct(50), pct(25));
        assert_eq!(boosted.range, plain.range * pct(150));
        assert_eq!(boosted.damage, plain.damage * pct(125));
        assert_eq!(boosted.attack_interval_ms, plain.attack_interval_ms);
    }

    #[test]
    fn test_branches_differ() {
        let tables = DataTables::builtin();
        for kind in TowerKind::ALL {
            let def = tables.tower(kind);
            let a = calculate_stats(
                def,
                TowerVariant::Branch {
                    kind,
                    branch: UpgradeBranch::A,
                },
                Fixed::ZERO,
                Fixed::ZERO,
            );
            let b = calculate_stats(
                def,
                TowerVariant::Branch {
                    kind,
                    branch: UpgradeBranch::B,
                },
                Fixed::ZERO,
                Fixed::ZERO,
            );
            assert_ne!(a, b, "{kind:?} branches should have distinct tables");
        }
    }

    #[test]
    fn test_upgrade_costs_non_decreasing() {
        let tables = DataTables::builtin();
        for kind in TowerKind::ALL {
            let def = tables.tower(kind);
            let c1 = upgrade_cost(def, 1, None).unwrap();
            let c2 = upgrade_cost(def, 2, None).unwrap();
            assert!(c2 >= c1, "{kind:?}");
            for branch in [UpgradeBranch::A, UpgradeBranch::B] {
                let c3 = upgrade_cost(def, 3, Some(branch)).unwrap();
                assert!(c3 >= c2, "{kind:?} {branch:?}");
            }
            assert_eq!(upgrade_cost(def, 4, None), None);
        }
    }

    #[test]
    fn test_variant_invariant() {
        assert!(TowerVariant::new(TowerKind::Frost, 4, None).is_none());
        assert!(TowerVariant::new(TowerKind::Frost, 2, Some(UpgradeBranch::A)).is_none());
        assert!(TowerVariant::new(TowerKind::Frost, 4, Some(UpgradeBranch::B)).is_some());
    }

    #[test]
    fn test_branch_is_exclusive() {
        let level3 = TowerVariant::Base {
            kind: TowerKind::Tesla,
            level: 3,
        };
        let branched = level3.next(Some(UpgradeBranch::A)).unwrap();
        assert_eq!(branched.level(), 4);
        assert_eq!(
            branched.next(Some(UpgradeBranch::B)),
            Err(UpgradeRefusal::BranchLocked(UpgradeBranch::A))
        );
        assert_eq!(
            branched.next(Some(UpgradeBranch::A)),
            Err(UpgradeRefusal::MaxLevel)
        );
        assert_eq!(level3.next(None), Err(UpgradeRefusal::BranchRequired));

        let level1 = TowerVariant::Base {
            kind: TowerKind::Tesla,
            level: 1,
        };
        assert_eq!(
            level1.next(Some(UpgradeBranch::B)),
            Err(UpgradeRefusal::BranchTooEarly)
        );
        assert_eq!(level1.next(None).unwrap().level(), 2);
    }
}
