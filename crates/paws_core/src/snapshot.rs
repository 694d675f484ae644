//! Read-only views of the match for renderers, UIs and tests.
//!
//! Views are owned copies in ascending id order; holding one never borrows
//! the simulation.

use serde::{Deserialize, Serialize};

use crate::components::{
    Enemy, EnemyState, EntityId, GridPoint, Hero, PathId, Tower, TrainPhase, Troop, UnitState,
    MAX_STATION_TROOPS,
};
use crate::config::TrainTimings;
use crate::economy::Wallet;
use crate::events::MatchOutcome;
use crate::math::{Fixed, Millis, Vec2Fixed};
use crate::path::PathNetwork;
use crate::progression::{TowerKind, UpgradeBranch};
use crate::projectile::Projectile;
use crate::status::StatusKind;
use crate::waves::WavePhase;

/// Station garrison view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationView {
    /// Troop in each slot.
    pub slots: [Option<EntityId>; MAX_STATION_TROOPS],
    /// Train phase.
    pub train: TrainPhase,
    /// Animation progress of the current train phase.
    pub train_progress: Fixed,
    /// Whether troops may disembark right now.
    pub may_spawn: bool,
    /// Garrison rally point.
    pub rally_point: Vec2Fixed,
}

/// Tower view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TowerView {
    /// Entity id.
    pub id: EntityId,
    /// Kind.
    pub kind: TowerKind,
    /// Tile.
    pub grid: GridPoint,
    /// World position.
    pub position: Vec2Fixed,
    /// Level 1-4.
    pub level: u8,
    /// Branch at level 4.
    pub upgrade: Option<UpgradeBranch>,
    /// Facing toward the last target.
    pub facing: Vec2Fixed,
    /// Locked target.
    pub target: Option<EntityId>,
    /// Current damage with boosts.
    pub damage: Fixed,
    /// Current range with boosts and blind.
    pub range: Fixed,
    /// Whether any boost is active.
    pub boosted: bool,
    /// Active debuff kinds.
    pub debuffs: Vec<StatusKind>,
    /// Paw Points invested.
    pub invested: u32,
    /// Garrison, for stations.
    pub station: Option<StationView>,
}

impl TowerView {
    fn new(tower: &Tower, now: Millis, timings: TrainTimings) -> Self {
        Self {
            id: tower.id,
            kind: tower.kind,
            grid: tower.grid,
            position: tower.position,
            level: tower.level,
            upgrade: tower.upgrade,
            facing: tower.facing,
            target: tower.target,
            damage: tower.stats.damage,
            range: tower.effective_range(now),
            boosted: tower.boosts.range_amount(now) > Fixed::ZERO
                || tower.boosts.damage_amount(now) > Fixed::ZERO,
            debuffs: tower
                .debuffs
                .iter()
                .filter(|d| d.is_active(now))
                .map(|d| d.kind)
                .collect(),
            invested: tower.invested,
            station: tower.station.as_ref().map(|station| {
                let phase_ms = match station.train.phase {
                    TrainPhase::Away => 0,
                    TrainPhase::Arriving => timings.arrive_ms,
                    TrainPhase::Docked => timings.dock_ms,
                    TrainPhase::Departing => timings.depart_ms,
                };
                StationView {
                    slots: station.slots,
                    train: station.train.phase,
                    train_progress: station.train.animation_progress(now, phase_ms),
                    may_spawn: station.train.may_spawn(),
                    rally_point: station.rally_point,
                }
            }),
        }
    }
}

/// Enemy view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyView {
    /// Entity id.
    pub id: EntityId,
    /// Type id.
    pub kind: String,
    /// Wave index.
    pub wave: u32,
    /// Path followed.
    pub path: PathId,
    /// Logical position on the path centre line.
    pub position: Vec2Fixed,
    /// Position shifted by the lane offset, for drawing.
    pub display_position: Vec2Fixed,
    /// Heading.
    pub facing: Vec2Fixed,
    /// Fraction of the path covered.
    pub progress: Fixed,
    /// Hit points.
    pub hp: Fixed,
    /// Maximum hit points.
    pub max_hp: Fixed,
    /// Lifecycle state.
    pub state: EnemyState,
    /// Active status kinds.
    pub statuses: Vec<StatusKind>,
    /// Boss flag.
    pub is_boss: bool,
}

impl EnemyView {
    fn new(enemy: &Enemy, paths: &PathNetwork, now: Millis) -> Self {
        Self {
            id: enemy.id,
            kind: enemy.kind.clone(),
            wave: enemy.wave,
            path: enemy.cursor.path,
            position: enemy.position,
            display_position: enemy.position
                + enemy.facing.perpendicular().scale(enemy.lane_offset),
            facing: enemy.facing,
            progress: paths
                .get(enemy.cursor.path)
                .map_or(Fixed::ZERO, |p| p.progress(&enemy.cursor)),
            hp: enemy.health.current,
            max_hp: enemy.health.max,
            state: enemy.state,
            statuses: enemy
                .statuses
                .iter()
                .filter(|s| s.is_active(now))
                .map(|s| s.kind)
                .collect(),
            is_boss: enemy.is_boss,
        }
    }
}

/// Hero view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroView {
    /// Entity id.
    pub id: EntityId,
    /// Type id.
    pub kind: String,
    /// Position.
    pub position: Vec2Fixed,
    /// Home point.
    pub home: Vec2Fixed,
    /// Hit points.
    pub hp: Fixed,
    /// Maximum hit points.
    pub max_hp: Fixed,
    /// Lifecycle state.
    pub state: UnitState,
    /// Engaged enemy.
    pub target: Option<EntityId>,
    /// Remaining shield.
    pub shield: Fixed,
    /// Milliseconds until the ability is ready.
    pub ability_ready_in: Millis,
}

impl HeroView {
    fn new(hero: &Hero, now: Millis) -> Self {
        Self {
            id: hero.id,
            kind: hero.kind.clone(),
            position: hero.position,
            home: hero.home,
            hp: hero.health.current,
            max_hp: hero.health.max,
            state: hero.state,
            target: hero.target,
            shield: hero
                .shield
                .filter(|s| now < s.until)
                .map_or(Fixed::ZERO, |s| s.amount),
            ability_ready_in: hero.ability_ready_at.saturating_sub(now),
        }
    }
}

/// Troop view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopView {
    /// Entity id.
    pub id: EntityId,
    /// Owning station.
    pub owner: EntityId,
    /// Slot on the owner.
    pub slot: usize,
    /// Position.
    pub position: Vec2Fixed,
    /// Rally point.
    pub rally_point: Vec2Fixed,
    /// Hit points.
    pub hp: Fixed,
    /// Maximum hit points.
    pub max_hp: Fixed,
    /// Lifecycle state.
    pub state: UnitState,
    /// Engaged enemy.
    pub target: Option<EntityId>,
}

impl From<&Troop> for TroopView {
    fn from(troop: &Troop) -> Self {
        Self {
            id: troop.id,
            owner: troop.owner,
            slot: troop.slot,
            position: troop.position,
            rally_point: troop.rally_point,
            hp: troop.health.current,
            max_hp: troop.health.max,
            state: troop.state,
            target: troop.target,
        }
    }
}

/// Projectile view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileView {
    /// Entity id.
    pub id: EntityId,
    /// Ground position.
    pub position: Vec2Fixed,
    /// Height above ground.
    pub height: Fixed,
    /// Flight progress.
    pub progress: Fixed,
    /// Target enemy.
    pub target: Option<EntityId>,
}

impl From<&Projectile> for ProjectileView {
    fn from(projectile: &Projectile) -> Self {
        Self {
            id: projectile.id,
            position: projectile.position,
            height: projectile.height(),
            progress: projectile.progress,
            target: projectile.target,
        }
    }
}

/// Wave progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveStatus {
    /// Director phase.
    pub phase: WavePhase,
    /// Wave currently spawning.
    pub current: Option<u32>,
    /// Index of the next wave to start.
    pub next: u32,
    /// Total waves in the level.
    pub total: u32,
    /// Spawns still queued.
    pub pending_spawns: usize,
}

/// Complete view of a match at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Tick counter.
    pub tick: u64,
    /// Simulation time.
    pub now: Millis,
    /// Whether the match is paused.
    pub paused: bool,
    /// Paw Points.
    pub wallet: Wallet,
    /// Remaining base health.
    pub base_health: u32,
    /// Match result so far.
    pub outcome: MatchOutcome,
    /// Wave progress.
    pub wave: WaveStatus,
    /// Towers.
    pub towers: Vec<TowerView>,
    /// Enemies.
    pub enemies: Vec<EnemyView>,
    /// Heroes.
    pub heroes: Vec<HeroView>,
    /// Troops.
    pub troops: Vec<TroopView>,
    /// Projectiles.
    pub projectiles: Vec<ProjectileView>,
}

/// Inputs for [`Snapshot::capture`] that are not part of the world.
#[derive(Debug, Clone, Copy)]
pub struct MatchStatus {
    /// Tick counter.
    pub tick: u64,
    /// Pause flag.
    pub paused: bool,
    /// Base health.
    pub base_health: u32,
    /// Outcome.
    pub outcome: MatchOutcome,
    /// Wave progress.
    pub wave: WaveStatus,
}

impl Snapshot {
    /// Copy the world into views.
    #[must_use]
    pub fn capture(
        world: &crate::world::World,
        paths: &PathNetwork,
        timings: TrainTimings,
        status: MatchStatus,
    ) -> Self {
        let now = world.now;
        Self {
            tick: status.tick,
            now,
            paused: status.paused,
            wallet: world.wallet,
            base_health: status.base_health,
            outcome: status.outcome,
            wave: status.wave,
            towers: world
                .towers
                .sorted()
                .map(|t| TowerView::new(t, now, timings))
                .collect(),
            enemies: world
                .enemies
                .sorted()
                .map(|e| EnemyView::new(e, paths, now))
                .collect(),
            heroes: world.heroes.sorted().map(|h| HeroView::new(h, now)).collect(),
            troops: world.troops.sorted().map(TroopView::from).collect(),
            projectiles: world.projectiles.sorted().map(ProjectileView::from).collect(),
        }
    }

    /// Tower view by id.
    #[must_use]
    pub fn tower(&self, id: EntityId) -> Option<&TowerView> {
        self.towers.iter().find(|t| t.id == id)
    }

    /// Enemy view by id.
    #[must_use]
    pub fn enemy(&self, id: EntityId) -> Option<&EnemyView> {
        self.enemies.iter().find(|e| e.id == id)
    }
}
