//! Events and effect signals produced by the simulation.
//!
//! Events are consumed by scoring, progress tracking and rendering outside
//! the core. The core never reads them back.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, EntityKind, PathId, TargetRef};
use crate::math::{Fixed, Vec2Fixed};
use crate::progression::{TowerKind, UpgradeBranch};
use crate::spells::SpellKind;

/// Where Paw Points came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncomeSource {
    /// Kill bounty for an enemy.
    Bounty(EntityId),
    /// Payout of an income tower.
    Tower(EntityId),
    /// Bonus for clearing a wave.
    WaveClear(u32),
}

/// How a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// Still being played.
    InProgress,
    /// Every wave cleared with base health left.
    Victory,
    /// Base health reached zero.
    Defeat,
}

/// Gameplay event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// An enemy entered the field.
    EnemySpawned {
        /// New enemy.
        enemy: EntityId,
        /// Enemy type id.
        kind: String,
        /// Path it follows.
        path: PathId,
        /// Wave index.
        wave: u32,
    },
    /// An enemy reached the end of its path.
    EnemyReachedGoal {
        /// The enemy.
        enemy: EntityId,
        /// Damage dealt to the base.
        damage: u32,
    },
    /// An entity's hit points reached zero.
    EntityDied {
        /// The entity.
        entity: EntityId,
        /// Its collection.
        kind: EntityKind,
    },
    /// Paw Points were credited.
    IncomeEarned {
        /// Amount credited.
        amount: u32,
        /// Origin of the credit.
        source: IncomeSource,
    },
    /// A wave started spawning.
    WaveStarted {
        /// Wave index.
        wave: u32,
        /// Boss wave flag.
        boss: bool,
    },
    /// A wave finished spawning and has no enemies left.
    WaveComplete {
        /// Wave index.
        wave: u32,
    },
    /// A spawn group was dropped for naming an unknown enemy type.
    SpawnDropped {
        /// Wave index.
        wave: u32,
        /// Group index.
        group: usize,
        /// The unknown type.
        enemy: String,
    },
    /// A tower was placed.
    TowerPlaced {
        /// New tower.
        tower: EntityId,
        /// Its kind.
        kind: TowerKind,
    },
    /// A tower gained a level.
    TowerUpgraded {
        /// The tower.
        tower: EntityId,
        /// New level.
        level: u8,
        /// Branch, at level 4.
        branch: Option<UpgradeBranch>,
    },
    /// A tower was sold and removed.
    TowerDestroyed {
        /// The tower.
        tower: EntityId,
        /// Paw Points refunded.
        refund: u32,
    },
    /// A station troop disembarked.
    TroopSpawned {
        /// New troop.
        troop: EntityId,
        /// Owning station.
        owner: EntityId,
        /// Slot index.
        slot: usize,
    },
    /// A hero came back from respawning.
    HeroRespawned {
        /// The hero.
        hero: EntityId,
    },
    /// A hero fired its ability.
    AbilityUsed {
        /// The hero.
        hero: EntityId,
    },
    /// A spell was cast.
    SpellCast {
        /// The spell.
        spell: SpellKind,
        /// Target point.
        at: Vec2Fixed,
    },
    /// The match ended.
    MatchEnded {
        /// Result.
        outcome: MatchOutcome,
    },
}

/// One hit applied to a combat participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Attacker, if any (burn and spells have none).
    pub source: Option<EntityId>,
    /// Victim.
    pub target: TargetRef,
    /// Hit points removed.
    pub amount: Fixed,
    /// Whether the hit was lethal.
    pub lethal: bool,
}

/// Visual category of an effect signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Splash impact.
    Explosion,
    /// Chain lightning hop.
    Lightning,
    /// Frost impact.
    Frost,
    /// Flame jet.
    Fire,
    /// Plain projectile or melee hit.
    Hit,
    /// Projectile lost its target and missed.
    Miss,
    /// Hero shockwave.
    Shockwave,
    /// Spell area.
    Spell(SpellKind),
}

/// Signal for the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    /// Category.
    pub kind: EffectKind,
    /// World position.
    pub position: Vec2Fixed,
    /// Animation progress at emission (`0` = just started).
    pub progress: Fixed,
    /// Radius or scale.
    pub size: Fixed,
}

impl Effect {
    /// New effect at the start of its animation.
    #[must_use]
    pub fn new(kind: EffectKind, position: Vec2Fixed, size: Fixed) -> Self {
        Self {
            kind,
            position,
            progress: Fixed::ZERO,
            size,
        }
    }
}

/// Everything produced by one tick (plus events of commands applied since
/// the previous tick).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Gameplay events in emission order.
    pub events: Vec<GameEvent>,
    /// Hits applied this tick.
    pub damage: Vec<DamageEvent>,
    /// Effect signals.
    pub effects: Vec<Effect>,
}

impl TickEvents {
    /// Record a gameplay event.
    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Record an effect signal.
    pub fn effect(&mut self, kind: EffectKind, position: Vec2Fixed, size: Fixed) {
        self.effects.push(Effect::new(kind, position, size));
    }

    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.damage.is_empty() && self.effects.is_empty()
    }

    /// Ids of entities that died this tick.
    pub fn deaths(&self) -> impl Iterator<Item = (EntityId, EntityKind)> + '_ {
        self.events.iter().filter_map(|e| match e {
            GameEvent::EntityDied { entity, kind } => Some((*entity, *kind)),
            _ => None,
        })
    }
}
