//! Entity records.
//!
//! Entities are plain data held in per-kind collections owned by the
//! simulation. Behaviour lives in the systems (`movement`, `combat`,
//! `projectile`); the helpers here only read or adjust a single record.

use serde::{Deserialize, Serialize};

use crate::data::{EnemyDefinition, HeroDefinition, TowerDefinition};
use crate::math::{pct, Fixed, Millis, Vec2Fixed};
use crate::path::PathCursor;
use crate::progression::{calculate_stats, TowerKind, TowerStats, TowerVariant, UpgradeBranch};
use crate::status::{StatusKind, StatusList};

/// Unique identifier for entities.
pub type EntityId = u64;

/// Identifier of a path within a level (index into the path network).
pub type PathId = u32;

/// Number of troop spawn slots on a station tower.
pub const MAX_STATION_TROOPS: usize = 3;

// ============================================================================
// Shared Types
// ============================================================================

/// Integer tile coordinate on the level grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPoint {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl GridPoint {
    /// Create a grid point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// World position of the tile centre (one world unit per tile).
    #[must_use]
    pub fn to_world(self) -> Vec2Fixed {
        let half = Fixed::ONE / Fixed::from_num(2);
        Vec2Fixed::new(
            Fixed::from_num(self.x) + half,
            Fixed::from_num(self.y) + half,
        )
    }

    /// Tile containing a world position.
    #[must_use]
    pub fn from_world(position: Vec2Fixed) -> Self {
        Self::new(position.x.floor().to_num(), position.y.floor().to_num())
    }

    /// Whether the point lies on a `width × height` grid.
    #[must_use]
    pub const fn in_bounds(self, width: u32, height: u32) -> bool {
        self.x >= 0 && self.y >= 0 && (self.x as u32) < width && (self.y as u32) < height
    }
}

/// Weak reference to a combat participant.
///
/// Lookups through a `TargetRef` may fail at any time; callers treat a
/// missing entity as "no target".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetRef {
    /// An enemy.
    Enemy(EntityId),
    /// A hero.
    Hero(EntityId),
    /// A troop.
    Troop(EntityId),
}

impl TargetRef {
    /// Referenced id.
    #[must_use]
    pub const fn id(self) -> EntityId {
        match self {
            Self::Enemy(id) | Self::Hero(id) | Self::Troop(id) => id,
        }
    }
}

/// Entity collection an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Tower collection.
    Tower,
    /// Enemy collection.
    Enemy,
    /// Hero collection.
    Hero,
    /// Troop collection.
    Troop,
    /// Projectile collection.
    Projectile,
}

/// Hit points.
///
/// Invariant: `0 <= current <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Current hit points.
    pub current: Fixed,
    /// Maximum hit points.
    pub max: Fixed,
}

impl Health {
    /// Full health with the given maximum.
    #[must_use]
    pub fn new(max: Fixed) -> Self {
        let max = max.max(Fixed::ZERO);
        Self { current: max, max }
    }

    /// Whether hit points reached zero.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current <= Fixed::ZERO
    }

    /// Apply damage, returning the amount actually removed.
    pub fn apply_damage(&mut self, amount: Fixed) -> Fixed {
        let dealt = amount.max(Fixed::ZERO).min(self.current);
        self.current -= dealt;
        dealt
    }

    /// Heal, returning the amount actually restored.
    pub fn heal(&mut self, amount: Fixed) -> Fixed {
        let healed = amount.max(Fixed::ZERO).min(self.max - self.current);
        self.current += healed;
        healed
    }

    /// Restore to full.
    pub fn restore(&mut self) {
        self.current = self.max;
    }
}

/// A multiplicative boost with an expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boost {
    /// Fractional bonus (`0.25` is +25%).
    pub amount: Fixed,
    /// Simulation time at which the boost lapses.
    pub until: Millis,
}

/// Where a boost comes from. Each source keeps its own expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoostSource {
    /// Re-applied every tick by a nearby aura tower.
    Aura,
    /// Spells and hero abilities with a fixed duration.
    Timed,
}

/// Range and damage boost from one source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostSlots {
    /// Range boost.
    pub range: Option<Boost>,
    /// Damage boost.
    pub damage: Option<Boost>,
}

/// Range and damage boosts active on a tower.
///
/// The effective bonus of each stat is the larger of the active aura and
/// timed boosts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boosts {
    /// Aura boosts.
    pub aura: BoostSlots,
    /// Spell and ability boosts.
    pub timed: BoostSlots,
}

fn active(slot: Option<Boost>, now: Millis) -> Fixed {
    slot.filter(|b| now < b.until).map_or(Fixed::ZERO, |b| b.amount)
}

impl Boosts {
    /// A stronger boost replaces the stored one; an equal one extends it;
    /// a weaker one is ignored while the stored boost is live.
    fn merge(slot: &mut Option<Boost>, amount: Fixed, until: Millis, now: Millis) -> bool {
        match slot {
            Some(existing) if now < existing.until => {
                if amount > existing.amount {
                    *existing = Boost { amount, until };
                    true
                } else {
                    if amount == existing.amount {
                        existing.until = existing.until.max(until);
                    }
                    false
                }
            }
            _ => {
                let changed = !slot.is_some_and(|old| old.amount == amount);
                *slot = Some(Boost { amount, until });
                changed
            }
        }
    }

    fn slots(&mut self, source: BoostSource) -> &mut BoostSlots {
        match source {
            BoostSource::Aura => &mut self.aura,
            BoostSource::Timed => &mut self.timed,
        }
    }

    /// Apply a range boost. Returns true if the stored amount changed.
    pub fn apply_range(
        &mut self,
        source: BoostSource,
        amount: Fixed,
        until: Millis,
        now: Millis,
    ) -> bool {
        Self::merge(&mut self.slots(source).range, amount, until, now)
    }

    /// Apply a damage boost. Returns true if the stored amount changed.
    pub fn apply_damage(
        &mut self,
        source: BoostSource,
        amount: Fixed,
        until: Millis,
        now: Millis,
    ) -> bool {
        Self::merge(&mut self.slots(source).damage, amount, until, now)
    }

    /// Drop lapsed boosts. Returns true if anything was removed.
    pub fn expire(&mut self, now: Millis) -> bool {
        let mut changed = false;
        for slot in [
            &mut self.aura.range,
            &mut self.aura.damage,
            &mut self.timed.range,
            &mut self.timed.damage,
        ] {
            if slot.is_some_and(|b| now >= b.until) {
                *slot = None;
                changed = true;
            }
        }
        changed
    }

    /// Active range bonus.
    #[must_use]
    pub fn range_amount(&self, now: Millis) -> Fixed {
        active(self.aura.range, now).max(active(self.timed.range, now))
    }

    /// Active damage bonus.
    #[must_use]
    pub fn damage_amount(&self, now: Millis) -> Fixed {
        active(self.aura.damage, now).max(active(self.timed.damage, now))
    }
}

/// Attack parameters shared by heroes and troops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatProfile {
    /// Damage per hit.
    pub damage: Fixed,
    /// Melee/attack reach in tiles.
    pub range: Fixed,
    /// Radius in which enemies are noticed.
    pub aggro_range: Fixed,
    /// Milliseconds between attacks.
    pub attack_interval_ms: u32,
    /// Movement speed in tiles per second.
    pub speed: Fixed,
}

// ============================================================================
// Towers
// ============================================================================

/// A placed tower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tower {
    /// Entity id.
    pub id: EntityId,
    /// Tower kind.
    pub kind: TowerKind,
    /// Tile the tower occupies.
    pub grid: GridPoint,
    /// World position (tile centre).
    pub position: Vec2Fixed,
    /// Level 1-4.
    pub level: u8,
    /// Branch; set iff `level == 4`.
    pub upgrade: Option<UpgradeBranch>,
    /// Time of the last attack.
    pub last_attack: Option<Millis>,
    /// Direction toward the last target.
    pub facing: Vec2Fixed,
    /// Locked target (weak).
    pub target: Option<EntityId>,
    /// Active boosts.
    pub boosts: Boosts,
    /// Timed debuffs (slow, weaken, blind, disable, stun).
    pub debuffs: StatusList,
    /// Paw Points spent on this tower so far.
    pub invested: u32,
    /// Stats with current boosts folded in.
    pub stats: TowerStats,
    /// Time of the last income payout.
    pub last_income: Millis,
    /// Garrison state for station towers.
    pub station: Option<StationState>,
}

impl Tower {
    /// A level-1 tower of `definition` placed on `grid` at `now`.
    #[must_use]
    pub fn new(id: EntityId, definition: &TowerDefinition, grid: GridPoint, now: Millis) -> Self {
        let position = grid.to_world();
        let variant = TowerVariant::Base {
            kind: definition.kind,
            level: 1,
        };
        Self {
            id,
            kind: definition.kind,
            grid,
            position,
            level: 1,
            upgrade: None,
            last_attack: None,
            facing: Vec2Fixed::new(Fixed::ZERO, Fixed::ONE),
            target: None,
            boosts: Boosts::default(),
            debuffs: StatusList::new(),
            invested: definition.build_cost,
            stats: calculate_stats(definition, variant, Fixed::ZERO, Fixed::ZERO),
            last_income: now,
            station: definition.troop.map(|_| StationState::new(position)),
        }
    }

    /// Recompute cached stats from the variant and the boosts active at `now`.
    pub fn refresh_stats(&mut self, definition: &TowerDefinition, now: Millis) {
        self.stats = calculate_stats(
            definition,
            self.variant(),
            self.boosts.range_amount(now),
            self.boosts.damage_amount(now),
        );
    }

    /// Level/branch identity of the tower.
    #[must_use]
    pub fn variant(&self) -> TowerVariant {
        match self.upgrade {
            Some(branch) => TowerVariant::Branch {
                kind: self.kind,
                branch,
            },
            None => TowerVariant::Base {
                kind: self.kind,
                level: self.level.clamp(1, 3),
            },
        }
    }

    /// Whether the tower may attack at all right now.
    #[must_use]
    pub fn can_act(&self, now: Millis) -> bool {
        !self.debuffs.has(StatusKind::Disable, now) && !self.debuffs.is_immobilized(now)
    }

    /// Attack interval after slow: `interval / (1 - slow)`.
    #[must_use]
    pub fn effective_interval(&self, now: Millis) -> Millis {
        let base = u64::from(self.stats.attack_interval_ms);
        let slow = self.debuffs.fraction(StatusKind::Slow, now);
        if slow <= Fixed::ZERO {
            return base;
        }
        (Fixed::from_num(base) / (Fixed::ONE - slow))
            .ceil()
            .to_num()
    }

    /// Attack range after blind.
    #[must_use]
    pub fn effective_range(&self, now: Millis) -> Fixed {
        let blind = self.debuffs.fraction(StatusKind::Blind, now);
        self.stats.range * (Fixed::ONE - blind)
    }

    /// Multiplier on outgoing damage from weaken.
    #[must_use]
    pub fn damage_factor(&self, now: Millis) -> Fixed {
        Fixed::ONE - self.debuffs.fraction(StatusKind::Weaken, now)
    }

    /// Whether enough time passed since the last attack.
    #[must_use]
    pub fn is_ready(&self, now: Millis) -> bool {
        self.last_attack
            .map_or(true, |last| now.saturating_sub(last) >= self.effective_interval(now))
    }
}

/// Phase of the station train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrainPhase {
    /// No train at the station.
    #[default]
    Away,
    /// Train pulling in.
    Arriving,
    /// Train stopped; troops may disembark.
    Docked,
    /// Train pulling out.
    Departing,
}

/// Train timer of a station tower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrainState {
    /// Current phase.
    pub phase: TrainPhase,
    /// When the current phase began.
    pub phase_started: Millis,
}

impl TrainState {
    /// Gameplay flag: troops may spawn only while docked.
    #[must_use]
    pub fn may_spawn(&self) -> bool {
        self.phase == TrainPhase::Docked
    }

    /// Presentation progress of the current phase in `[0, 1]`.
    #[must_use]
    pub fn animation_progress(&self, now: Millis, phase_duration_ms: u32) -> Fixed {
        if phase_duration_ms == 0 || self.phase == TrainPhase::Away {
            return Fixed::ZERO;
        }
        let elapsed = now.saturating_sub(self.phase_started);
        crate::math::clamp_unit(crate::math::ratio(
            i64::try_from(elapsed).unwrap_or(i64::MAX),
            i64::from(phase_duration_ms),
        ))
    }

    /// Enter a new phase at `now`.
    pub fn enter(&mut self, phase: TrainPhase, now: Millis) {
        self.phase = phase;
        self.phase_started = now;
    }
}

/// Garrison state of a station tower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationState {
    /// Troop resident in each slot.
    pub slots: [Option<EntityId>; MAX_STATION_TROOPS],
    /// Earliest time a freed slot may be refilled.
    pub respawn_at: [Option<Millis>; MAX_STATION_TROOPS],
    /// Where troops gather.
    pub rally_point: Vec2Fixed,
    /// Train timer gating spawns.
    pub train: TrainState,
}

impl StationState {
    /// Empty garrison rallying at `rally_point`.
    #[must_use]
    pub fn new(rally_point: Vec2Fixed) -> Self {
        Self {
            slots: [None; MAX_STATION_TROOPS],
            respawn_at: [None; MAX_STATION_TROOPS],
            rally_point,
            train: TrainState::default(),
        }
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Slots that are empty and past their respawn timer.
    pub fn ready_slots(&self, now: Millis) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_STATION_TROOPS).filter(move |&i| {
            self.slots[i].is_none() && self.respawn_at[i].map_or(true, |t| now >= t)
        })
    }

    /// Release a slot held by `troop`, starting its respawn timer.
    pub fn release(&mut self, troop: EntityId, respawn_at: Millis) -> bool {
        for i in 0..MAX_STATION_TROOPS {
            if self.slots[i] == Some(troop) {
                self.slots[i] = None;
                self.respawn_at[i] = Some(respawn_at);
                return true;
            }
        }
        false
    }
}

/// Offset of a station spawn slot from the station centre.
#[must_use]
pub fn slot_offset(slot: usize) -> Vec2Fixed {
    match slot {
        0 => Vec2Fixed::new(Fixed::ZERO, pct(60)),
        1 => Vec2Fixed::new(pct(-50), pct(-30)),
        _ => Vec2Fixed::new(pct(50), pct(-30)),
    }
}

// ============================================================================
// Enemies
// ============================================================================

/// Lifecycle of an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyState {
    /// Entering the lane; speed ramps up.
    Spawning,
    /// Following its path.
    Moving,
    /// Fighting a hero or troop that taunted it.
    InCombat,
    /// Hit points reached zero.
    Dead,
    /// Reached the end of its path.
    ReachedGoal,
}

/// An advancing enemy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enemy {
    /// Entity id.
    pub id: EntityId,
    /// Enemy type id from the data tables.
    pub kind: String,
    /// Wave that spawned this enemy.
    pub wave: u32,
    /// Position along the path.
    pub cursor: PathCursor,
    /// Authoritative world position (on the path centre line).
    pub position: Vec2Fixed,
    /// Direction of travel.
    pub facing: Vec2Fixed,
    /// Hit points.
    pub health: Health,
    /// Base speed in tiles per second.
    pub speed: Fixed,
    /// Fraction of incoming damage mitigated.
    pub armor: Fixed,
    /// Paw Points awarded on death.
    pub bounty: u32,
    /// Damage dealt to the base on reaching the goal.
    pub leak_damage: u32,
    /// Melee damage against heroes and troops.
    pub attack_damage: Fixed,
    /// Milliseconds between melee attacks.
    pub attack_interval_ms: u32,
    /// Time of the last melee attack.
    pub last_attack: Option<Millis>,
    /// Active statuses (slow, burn, stun, freeze).
    pub statuses: StatusList,
    /// Hero or troop engaging this enemy (weak).
    pub taunt: Option<TargetRef>,
    /// Troop physically blocking this enemy (weak).
    pub blocked_by: Option<EntityId>,
    /// Cosmetic lateral offset.
    pub lane_offset: Fixed,
    /// Per-enemy random part of the lane offset.
    pub jitter: Fixed,
    /// Lifecycle state.
    pub state: EnemyState,
    /// When the enemy entered the lane.
    pub spawned_at: Millis,
    /// Boss flag.
    pub is_boss: bool,
    /// Time the tower aura last pulsed.
    pub last_aura: Option<Millis>,
}

impl Enemy {
    /// Build an enemy from its definition.
    #[must_use]
    pub fn from_definition(
        id: EntityId,
        definition: &EnemyDefinition,
        wave: u32,
        hp_multiplier: Fixed,
        cursor: PathCursor,
        now: Millis,
    ) -> Self {
        Self {
            id,
            kind: definition.id.clone(),
            wave,
            cursor,
            position: Vec2Fixed::ZERO,
            facing: Vec2Fixed::ZERO,
            health: Health::new(definition.hp * hp_multiplier),
            speed: definition.speed,
            armor: crate::math::clamp_unit(definition.armor),
            bounty: definition.bounty,
            leak_damage: definition.leak_damage,
            attack_damage: definition.attack_damage,
            attack_interval_ms: definition.attack_interval_ms,
            last_attack: None,
            statuses: StatusList::new(),
            taunt: None,
            blocked_by: None,
            lane_offset: Fixed::ZERO,
            jitter: Fixed::ZERO,
            state: EnemyState::Spawning,
            spawned_at: now,
            is_boss: definition.boss,
            last_aura: None,
        }
    }

    /// Whether the enemy is still on the field and targetable.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.health.is_dead()
            && !matches!(self.state, EnemyState::Dead | EnemyState::ReachedGoal)
    }
}

// ============================================================================
// Heroes and Troops
// ============================================================================

/// Lifecycle shared by heroes and troops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitState {
    /// Idle at the home/rally point.
    AtHome,
    /// Walking to a commanded point.
    Moving,
    /// Fighting an enemy.
    Engaging,
    /// Walking back home; ignores enemies until arrival.
    Returning,
    /// Hit points reached zero this tick.
    Dead {
        /// When the respawn timer ends.
        respawn_at: Millis,
    },
    /// Waiting to come back.
    Respawning {
        /// When the unit is back at home.
        ready_at: Millis,
    },
}

impl UnitState {
    /// Whether the unit is on the field.
    #[must_use]
    pub const fn is_alive(self) -> bool {
        !matches!(self, Self::Dead { .. } | Self::Respawning { .. })
    }
}

/// A damage shield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shield {
    /// Damage the shield can still absorb.
    pub amount: Fixed,
    /// Expiry time.
    pub until: Millis,
}

/// A player hero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hero {
    /// Entity id.
    pub id: EntityId,
    /// Hero type id.
    pub kind: String,
    /// Current position.
    pub position: Vec2Fixed,
    /// Point the hero returns to.
    pub home: Vec2Fixed,
    /// Point where the hero respawns.
    pub spawn: Vec2Fixed,
    /// Commanded destination.
    pub move_target: Option<Vec2Fixed>,
    /// Hit points.
    pub health: Health,
    /// Attack parameters.
    pub profile: CombatProfile,
    /// Maximum distance from home while engaging.
    pub leash: Fixed,
    /// Longest a single engagement may last.
    pub aggro_timeout_ms: u32,
    /// Respawn delay.
    pub respawn_ms: u32,
    /// Time of the last attack.
    pub last_attack: Option<Millis>,
    /// Engaged enemy (weak).
    pub target: Option<EntityId>,
    /// When the current engagement began.
    pub engaged_since: Option<Millis>,
    /// Lifecycle state.
    pub state: UnitState,
    /// Earliest time the ability may fire again.
    pub ability_ready_at: Millis,
    /// Active shield.
    pub shield: Option<Shield>,
    /// Active statuses.
    pub statuses: StatusList,
}

impl Hero {
    /// Build a hero at its spawn point.
    #[must_use]
    pub fn from_definition(id: EntityId, definition: &HeroDefinition, spawn: Vec2Fixed) -> Self {
        Self {
            id,
            kind: definition.id.clone(),
            position: spawn,
            home: spawn,
            spawn,
            move_target: None,
            health: Health::new(definition.hp),
            profile: definition.profile,
            leash: definition.leash,
            aggro_timeout_ms: definition.aggro_timeout_ms,
            respawn_ms: definition.respawn_ms,
            last_attack: None,
            target: None,
            engaged_since: None,
            state: UnitState::AtHome,
            ability_ready_at: 0,
            shield: None,
            statuses: StatusList::new(),
        }
    }

    /// Whether the hero is walking home.
    #[must_use]
    pub fn is_returning(&self) -> bool {
        self.state == UnitState::Returning
    }

    /// Apply damage, draining the shield first. Returns hp removed.
    pub fn take_damage(&mut self, amount: Fixed, now: Millis) -> Fixed {
        let mut remaining = amount.max(Fixed::ZERO);
        if let Some(shield) = self.shield.as_mut().filter(|s| now < s.until) {
            let absorbed = remaining.min(shield.amount);
            shield.amount -= absorbed;
            remaining -= absorbed;
        }
        if self
            .shield
            .is_some_and(|s| s.amount <= Fixed::ZERO || now >= s.until)
        {
            self.shield = None;
        }
        self.health.apply_damage(remaining)
    }
}

/// A garrison troop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Troop {
    /// Entity id.
    pub id: EntityId,
    /// Station tower that owns this troop.
    pub owner: EntityId,
    /// Spawn slot index on the owner.
    pub slot: usize,
    /// Where the troop spawned.
    pub spawn_point: Vec2Fixed,
    /// Maximum distance from the spawn point.
    pub move_radius: Fixed,
    /// Gathering point (always within `move_radius` of `spawn_point`).
    pub rally_point: Vec2Fixed,
    /// Current position.
    pub position: Vec2Fixed,
    /// Hit points.
    pub health: Health,
    /// Attack parameters.
    pub profile: CombatProfile,
    /// Time of the last attack.
    pub last_attack: Option<Millis>,
    /// Engaged enemy (weak).
    pub target: Option<EntityId>,
    /// Lifecycle state.
    pub state: UnitState,
}

impl Troop {
    /// Set the rally point, clamped onto the move radius.
    pub fn set_rally(&mut self, requested: Vec2Fixed) {
        self.rally_point = requested.clamp_within(self.spawn_point, self.move_radius);
    }
}
