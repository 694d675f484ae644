//! Core simulation loop.
//!
//! [`Simulation`] owns every entity collection for one match, runs the tick
//! pipeline and applies player commands.
//!
//! # Determinism
//!
//! All operations in this module are fully deterministic:
//! - No floating-point math (uses fixed-point via [`Fixed`])
//! - Randomness only from the seeded generator in [`World`]
//! - Consistent iteration order (sorted entity IDs)
//! - Same seed and command script always produce the same state hash
//!
//! # Tick pipeline
//!
//! 1. **Spawns** - due wave requests become enemies
//! 2. **Movement** - enemies, heroes, troops, station trains, income
//! 3. **Combat** - auras, tower attacks, melee, hero abilities
//! 4. **Projectiles** - flights advance and impacts resolve
//! 5. **Cleanup** - dead and leaked enemies leave, references are cleared
//! 6. **Waves** - completion, bonuses and the match outcome
//!
//! # Example
//!
//! ```
//! use paws_core::level::LevelRegistry;
//! use paws_core::prelude::*;
//!
//! let tables = DataTables::builtin();
//! let registry = LevelRegistry::with_builtin();
//! let level = registry.get("quad").unwrap();
//! let mut sim = Simulation::new(level, tables, SimConfig::default(), 7).unwrap();
//!
//! sim.apply_command(GameCommand::StartNextWave).unwrap();
//! let events = sim.tick(TICK_DURATION_MS);
//! assert_eq!(sim.tick_count(), 1);
//! assert!(events.events.iter().any(|e| matches!(e, GameEvent::WaveStarted { .. })));
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::{
    aura_system, enemy_attack_system, enemy_aura_system, hero_ability_system, tower_attack_system,
    unit_melee_system,
};
use crate::components::{
    Enemy, EnemyState, EntityId, GridPoint, Hero, PathId, TargetRef, Tower, UnitState,
};
use crate::config::SimConfig;
use crate::data::DataTables;
use crate::economy::{income_system, sell_refund, Wallet};
use crate::error::{GameError, Result};
use crate::events::{GameEvent, IncomeSource, MatchOutcome, TickEvents};
use crate::level::LevelData;
use crate::math::{Fixed, Millis, Vec2Fixed};
use crate::movement::{
    enemy_movement_system, hero_system, place_on_path, station_system, troop_system,
};
use crate::path::{PathCursor, PathNetwork};
use crate::progression::{upgrade_cost, TowerKind, UpgradeBranch, UpgradeRefusal};
use crate::projectile::projectile_system;
use crate::snapshot::{MatchStatus, Snapshot, WaveStatus};
use crate::spells::{SpellBook, SpellKind};
use crate::waves::{SpawnRequest, WaveDirector};
use crate::world::{EntityStorage, Rules, World};

/// Ticks per second a frontend is expected to run.
pub const TICK_RATE: u32 = 20;

/// Duration of one tick at [`TICK_RATE`] in milliseconds.
pub const TICK_DURATION_MS: u32 = 1000 / TICK_RATE;

/// A player command.
///
/// Commands are validated in full before anything changes; a rejected
/// command leaves the match untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameCommand {
    /// Build a level-1 tower on a free tile.
    PlaceTower {
        /// Tower kind.
        kind: TowerKind,
        /// Target tile.
        at: GridPoint,
    },
    /// Raise a tower one level. A branch is required at level 3.
    UpgradeTower {
        /// The tower.
        tower: EntityId,
        /// Branch for the level-4 upgrade.
        branch: Option<UpgradeBranch>,
    },
    /// Remove a tower for a partial refund.
    SellTower {
        /// The tower.
        tower: EntityId,
    },
    /// Send a hero to a point, which becomes its new home.
    MoveHero {
        /// The hero.
        hero: EntityId,
        /// Destination.
        to: Vec2Fixed,
    },
    /// Break off combat and walk home.
    RecallHero {
        /// The hero.
        hero: EntityId,
    },
    /// Move a station's rally point.
    MoveTroops {
        /// The station.
        tower: EntityId,
        /// Requested rally point; clamped per troop.
        to: Vec2Fixed,
    },
    /// Cast a spell centred on a point.
    CastSpell {
        /// The spell.
        spell: SpellKind,
        /// Centre of the area.
        at: Vec2Fixed,
    },
    /// Start spawning the next wave.
    StartNextWave,
    /// Freeze all timers.
    Pause,
    /// Continue after a pause.
    Resume,
}

/// One lane-defense match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    tick: u64,
    paused: bool,
    level_id: String,
    grid_width: u32,
    grid_height: u32,
    paths: PathNetwork,
    tables: DataTables,
    config: SimConfig,
    world: World,
    director: WaveDirector,
    spells: SpellBook,
    spawn_counter: u32,
    base_health: u32,
    outcome: MatchOutcome,
    #[serde(skip)]
    pending: TickEvents,
}

impl Simulation {
    /// Start a match on a level.
    ///
    /// Builds the path network, resolves the wave list and places the
    /// level's hero at its spawn tile. Waves are expected to have been
    /// validated by a [`crate::level::LevelRegistry`]; spawn groups naming
    /// unknown enemy types are dropped with a warning when their wave starts.
    pub fn new(level: &LevelData, tables: DataTables, config: SimConfig, seed: u64) -> Result<Self> {
        let paths = level.build_paths()?;
        let waves = level
            .resolve_waves(&tables)
            .map_err(|e| GameError::InvalidLevel(vec![e]))?;

        let mut world = World::new(seed, level.starting_resources);
        let hero_def = match level.hero.as_deref() {
            Some(id) => tables.hero(id).unwrap_or_else(|| {
                tracing::warn!(hero = id, "Unknown hero type, using the default hero");
                tables.default_hero()
            }),
            None => tables.default_hero(),
        };
        let hero_id = world.allocate_id();
        world.heroes.insert(
            hero_id,
            Hero::from_definition(hero_id, hero_def, level.hero_spawn.to_world()),
        );

        tracing::debug!(
            level = %level.id,
            seed,
            waves = waves.len(),
            paths = paths.len(),
            "Simulation created"
        );

        Ok(Self {
            tick: 0,
            paused: false,
            level_id: level.id.clone(),
            grid_width: level.grid_width,
            grid_height: level.grid_height,
            paths,
            director: WaveDirector::new(waves, config.boss_every),
            base_health: config.base_health,
            tables,
            config,
            world,
            spells: SpellBook::new(),
            spawn_counter: 0,
            outcome: MatchOutcome::InProgress,
            pending: TickEvents::default(),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Ticks advanced so far. Paused ticks do not count.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Simulation time in milliseconds.
    #[must_use]
    pub const fn now(&self) -> Millis {
        self.world.now
    }

    /// Whether the match is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Match result so far.
    #[must_use]
    pub const fn outcome(&self) -> MatchOutcome {
        self.outcome
    }

    /// Remaining base health.
    #[must_use]
    pub const fn base_health(&self) -> u32 {
        self.base_health
    }

    /// The player's Paw Points.
    #[must_use]
    pub const fn wallet(&self) -> &Wallet {
        &self.world.wallet
    }

    /// Level this match was created from.
    #[must_use]
    pub fn level_id(&self) -> &str {
        &self.level_id
    }

    /// Grid width and height in tiles.
    #[must_use]
    pub const fn grid_size(&self) -> (u32, u32) {
        (self.grid_width, self.grid_height)
    }

    /// All entity state.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Mutable entity state, for tools and tests that stage positions.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Path network of the level.
    #[must_use]
    pub const fn paths(&self) -> &PathNetwork {
        &self.paths
    }

    /// Static definitions.
    #[must_use]
    pub const fn tables(&self) -> &DataTables {
        &self.tables
    }

    /// Gameplay constants.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Wave scheduling state.
    #[must_use]
    pub const fn director(&self) -> &WaveDirector {
        &self.director
    }

    /// Spell cooldowns.
    #[must_use]
    pub const fn spells(&self) -> &SpellBook {
        &self.spells
    }

    /// Wave progress summary.
    #[must_use]
    pub fn wave_status(&self) -> WaveStatus {
        WaveStatus {
            phase: self.director.phase(),
            current: self.director.current_wave(),
            next: self.director.next_wave(),
            total: self.director.wave_count(),
            pending_spawns: self.director.pending(),
        }
    }

    /// Owned view of the whole match.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(
            &self.world,
            &self.paths,
            self.config.train,
            MatchStatus {
                tick: self.tick,
                paused: self.paused,
                base_health: self.base_health,
                outcome: self.outcome,
                wave: self.wave_status(),
            },
        )
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advance the match by `dt_ms` milliseconds.
    ///
    /// `dt_ms` is clamped to `max_step_ms`. While paused, or once the match
    /// has ended, a tick advances nothing and only returns events produced
    /// by commands since the previous tick.
    pub fn tick(&mut self, dt_ms: u32) -> TickEvents {
        let mut events = std::mem::take(&mut self.pending);
        if self.paused || self.outcome != MatchOutcome::InProgress {
            return events;
        }

        let dt = u64::from(dt_ms.min(self.config.max_step_ms));
        self.world.dt = dt;
        self.world.now += dt;
        self.tick += 1;

        let rules = Rules {
            tables: &self.tables,
            config: &self.config,
            paths: &self.paths,
        };

        // 1. Spawns
        for request in self.director.poll(self.world.now) {
            spawn_from_request(
                &mut self.world,
                &mut self.director,
                &mut self.spawn_counter,
                &rules,
                &request,
                &mut events,
            );
        }

        // 2. Movement and lifecycle
        enemy_movement_system(&mut self.world, &rules, &mut events);
        hero_system(&mut self.world, &mut events);
        troop_system(&mut self.world);
        station_system(&mut self.world, &rules, &mut events);
        income_system(&mut self.world, &mut events);

        // 3. Combat
        aura_system(&mut self.world, &rules);
        enemy_aura_system(&mut self.world, &rules);
        tower_attack_system(&mut self.world, &rules, &mut events);
        unit_melee_system(&mut self.world, &rules, &mut events);
        enemy_attack_system(&mut self.world, &rules, &mut events);
        hero_ability_system(&mut self.world, &rules, &mut events);

        // 4. Projectiles
        projectile_system(&mut self.world, &rules, &mut events);

        // 5. Cleanup
        self.remove_finished_enemies(&mut events);
        self.remove_dead_troops();
        clear_dangling_refs(&mut self.world);

        // 6. Waves and outcome
        self.complete_waves(&mut events);
        self.update_outcome(&mut events);

        #[cfg(feature = "debug-validation")]
        self.check_invariants();

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        events
    }

    fn remove_finished_enemies(&mut self, events: &mut TickEvents) {
        for id in self.world.enemies.sorted_ids() {
            let finished = self.world.enemies.get(id).is_some_and(|e| {
                matches!(e.state, EnemyState::Dead | EnemyState::ReachedGoal) || e.health.is_dead()
            });
            if !finished {
                continue;
            }
            let Some(enemy) = self.world.enemies.remove(id) else {
                continue;
            };
            if enemy.state == EnemyState::ReachedGoal {
                self.base_health = self.base_health.saturating_sub(enemy.leak_damage);
            } else if enemy.bounty > 0 {
                self.world.wallet.earn(enemy.bounty);
                events.push(GameEvent::IncomeEarned {
                    amount: enemy.bounty,
                    source: IncomeSource::Bounty(id),
                });
            }
            self.director.on_removed(enemy.wave);
        }
    }

    fn remove_dead_troops(&mut self) {
        let now = self.world.now;
        for id in self.world.troops.sorted_ids() {
            let dead = self
                .world
                .troops
                .get(id)
                .is_some_and(|t| !t.state.is_alive() || t.health.is_dead());
            if !dead {
                continue;
            }
            let Some(troop) = self.world.troops.remove(id) else {
                continue;
            };
            let Some(owner) = self.world.towers.get_mut(troop.owner) else {
                continue;
            };
            let respawn_ms = self.tables.tower(owner.kind).troop.map_or(0, |t| t.respawn_ms);
            if let Some(station) = owner.station.as_mut() {
                station.release(id, now + u64::from(respawn_ms));
            }
        }
    }

    fn complete_waves(&mut self, events: &mut TickEvents) {
        for wave in self.director.collect_completed() {
            events.push(GameEvent::WaveComplete { wave });
            let bonus = self.config.wave_clear_bonus;
            if bonus > 0 {
                self.world.wallet.earn(bonus);
                events.push(GameEvent::IncomeEarned {
                    amount: bonus,
                    source: IncomeSource::WaveClear(wave),
                });
            }
            tracing::info!(wave = wave + 1, now = self.world.now, "Wave complete");
        }
    }

    fn update_outcome(&mut self, events: &mut TickEvents) {
        let outcome = if self.base_health == 0 {
            MatchOutcome::Defeat
        } else if self.director.all_complete() && self.world.enemies.is_empty() {
            MatchOutcome::Victory
        } else {
            return;
        };
        self.outcome = outcome;
        events.push(GameEvent::MatchEnded { outcome });
        tracing::info!(?outcome, tick = self.tick, "Match ended");
    }

    #[cfg(feature = "debug-validation")]
    fn check_invariants(&self) {
        for enemy in self.world.enemies.sorted() {
            debug_assert!(enemy.health.current >= Fixed::ZERO);
            debug_assert!(enemy.health.current <= enemy.health.max);
            debug_assert!(!enemy.health.is_dead(), "dead enemy {} survived cleanup", enemy.id);
        }
        for tower in self.world.towers.sorted() {
            debug_assert_eq!(tower.upgrade.is_some(), tower.level == 4);
            if let Some(station) = &tower.station {
                debug_assert!(station.occupied() <= crate::components::MAX_STATION_TROOPS);
            }
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Apply a player command.
    ///
    /// Events the command produces are returned by the next [`tick`].
    ///
    /// [`tick`]: Self::tick
    pub fn apply_command(&mut self, command: GameCommand) -> Result<()> {
        let result = self.dispatch(&command);
        if let Err(err) = &result {
            tracing::debug!(?command, error = %err, "Command rejected");
        }
        result
    }

    fn dispatch(&mut self, command: &GameCommand) -> Result<()> {
        match *command {
            GameCommand::Pause => {
                self.paused = true;
                return Ok(());
            }
            GameCommand::Resume => {
                self.paused = false;
                return Ok(());
            }
            _ => {}
        }
        if self.outcome != MatchOutcome::InProgress {
            return Err(GameError::InvalidCommand("match is over".to_string()));
        }

        match *command {
            GameCommand::PlaceTower { kind, at } => self.place_tower(kind, at).map(|_| ()),
            GameCommand::UpgradeTower { tower, branch } => self.upgrade_tower(tower, branch),
            GameCommand::SellTower { tower } => self.sell_tower(tower).map(|_| ()),
            GameCommand::MoveHero { hero, to } => self.move_hero(hero, to),
            GameCommand::RecallHero { hero } => self.recall_hero(hero),
            GameCommand::MoveTroops { tower, to } => self.move_troops(tower, to),
            GameCommand::CastSpell { spell, at } => {
                let rules = Rules {
                    tables: &self.tables,
                    config: &self.config,
                    paths: &self.paths,
                };
                self.spells
                    .cast(spell, at, &mut self.world, &rules, &mut self.pending)
            }
            GameCommand::StartNextWave => self.start_next_wave().map(|_| ()),
            GameCommand::Pause | GameCommand::Resume => Ok(()),
        }
    }

    /// Build a tower and return its id.
    pub fn place_tower(&mut self, kind: TowerKind, at: GridPoint) -> Result<EntityId> {
        let refuse = |reason| GameError::InvalidPlacement {
            x: at.x,
            y: at.y,
            reason,
        };
        if !at.in_bounds(self.grid_width, self.grid_height) {
            return Err(refuse("outside the grid"));
        }
        if self.paths.covers(at) {
            return Err(refuse("tile is on a path"));
        }
        if self.world.towers.sorted().any(|t| t.grid == at) {
            return Err(refuse("tile is occupied"));
        }
        if self.paths.distance_to(at.to_world()) < self.config.path_clearance {
            return Err(refuse("too close to the path"));
        }

        let definition = self.tables.tower(kind);
        self.world.wallet.spend(definition.build_cost)?;

        let id = self.world.allocate_id();
        let tower = Tower::new(id, definition, at, self.world.now);
        self.world.towers.insert(id, tower);
        self.pending.push(GameEvent::TowerPlaced { tower: id, kind });
        tracing::debug!(tower = id, ?kind, x = at.x, y = at.y, "Tower placed");
        Ok(id)
    }

    /// Upgrade a tower one level.
    pub fn upgrade_tower(&mut self, id: EntityId, branch: Option<UpgradeBranch>) -> Result<()> {
        let tower = self
            .world
            .towers
            .get(id)
            .ok_or(GameError::EntityNotFound(id))?;
        let next = tower.variant().next(branch).map_err(|refusal| match refusal {
            UpgradeRefusal::MaxLevel => GameError::MaxLevel(id),
            UpgradeRefusal::BranchLocked(held) => GameError::BranchLocked { tower: id, held },
            UpgradeRefusal::BranchRequired | UpgradeRefusal::BranchTooEarly => {
                GameError::BranchChoice {
                    kind: tower.kind,
                    level: tower.level,
                }
            }
        })?;
        let definition = self.tables.tower(tower.kind);
        let cost =
            upgrade_cost(definition, tower.level, branch).ok_or(GameError::MaxLevel(id))?;
        self.world.wallet.spend(cost)?;

        let now = self.world.now;
        let Some(tower) = self.world.towers.get_mut(id) else {
            return Err(GameError::EntityNotFound(id));
        };
        tower.level = next.level();
        tower.upgrade = next.branch();
        tower.invested += cost;
        tower.refresh_stats(definition, now);
        self.pending.push(GameEvent::TowerUpgraded {
            tower: id,
            level: tower.level,
            branch: tower.upgrade,
        });
        tracing::debug!(tower = id, level = tower.level, cost, "Tower upgraded");
        Ok(())
    }

    /// Sell a tower and its troops, returning the refund.
    pub fn sell_tower(&mut self, id: EntityId) -> Result<u32> {
        let tower = self
            .world
            .towers
            .remove(id)
            .ok_or(GameError::EntityNotFound(id))?;
        self.world.troops.retain(|t| t.owner != id);
        clear_dangling_refs(&mut self.world);

        let refund = sell_refund(tower.invested, self.config.sell_refund_percent);
        self.world.wallet.earn(refund);
        self.pending.push(GameEvent::TowerDestroyed { tower: id, refund });
        tracing::debug!(tower = id, refund, "Tower sold");
        Ok(refund)
    }

    fn live_hero(&mut self, id: EntityId) -> Result<&mut Hero> {
        let hero = self
            .world
            .heroes
            .get_mut(id)
            .ok_or(GameError::EntityNotFound(id))?;
        if hero.state.is_alive() {
            Ok(hero)
        } else {
            Err(GameError::InvalidCommand(format!("hero {id} is not on the field")))
        }
    }

    fn move_hero(&mut self, id: EntityId, to: Vec2Fixed) -> Result<()> {
        let hero = self.live_hero(id)?;
        hero.home = to;
        hero.move_target = Some(to);
        hero.target = None;
        hero.engaged_since = None;
        hero.state = UnitState::Moving;
        Ok(())
    }

    fn recall_hero(&mut self, id: EntityId) -> Result<()> {
        let hero = self.live_hero(id)?;
        hero.move_target = None;
        hero.target = None;
        hero.engaged_since = None;
        hero.state = UnitState::Returning;
        Ok(())
    }

    fn move_troops(&mut self, id: EntityId, to: Vec2Fixed) -> Result<()> {
        let station = self
            .world
            .towers
            .get_mut(id)
            .ok_or(GameError::EntityNotFound(id))?
            .station
            .as_mut()
            .ok_or_else(|| GameError::InvalidCommand(format!("tower {id} has no troops")))?;
        station.rally_point = to;

        for troop_id in self.world.troops.sorted_ids() {
            let Some(troop) = self.world.troops.get_mut(troop_id) else {
                continue;
            };
            if troop.owner != id || !troop.state.is_alive() {
                continue;
            }
            troop.set_rally(to);
            troop.target = None;
            troop.state = UnitState::Moving;
        }
        Ok(())
    }

    /// Start the next wave and return its index.
    pub fn start_next_wave(&mut self) -> Result<u32> {
        let warned = self.director.warnings().len();
        let wave = self.director.start_wave(self.world.now, &self.tables)?;
        for warning in &self.director.warnings()[warned..] {
            self.pending.push(GameEvent::SpawnDropped {
                wave: warning.wave,
                group: warning.group,
                enemy: warning.enemy.clone(),
            });
        }
        let boss = self.director.is_boss_wave(wave, &self.tables);
        self.pending.push(GameEvent::WaveStarted { wave, boss });
        tracing::info!(wave = wave + 1, boss, now = self.world.now, "Wave started");
        Ok(wave)
    }

    /// Put an enemy on the field outside the wave schedule.
    ///
    /// The enemy belongs to no wave that is still tracked, so it does not
    /// hold back wave completion. Used by scripted scenarios and tests.
    pub fn spawn_enemy(&mut self, kind: &str, path: Option<PathId>) -> Result<EntityId> {
        if self.tables.enemy(kind).is_none() {
            return Err(GameError::InvalidCommand(format!("unknown enemy type '{kind}'")));
        }
        let request = SpawnRequest {
            wave: u32::MAX,
            group: 0,
            enemy: kind.to_string(),
            fire_at: self.world.now,
            path,
            hp_multiplier: Fixed::ONE,
        };
        let rules = Rules {
            tables: &self.tables,
            config: &self.config,
            paths: &self.paths,
        };
        spawn_from_request(
            &mut self.world,
            &mut self.director,
            &mut self.spawn_counter,
            &rules,
            &request,
            &mut self.pending,
        )
        .ok_or_else(|| GameError::InvalidCommand(format!("cannot spawn '{kind}'")))
    }

    // ========================================================================
    // Hashing and persistence
    // ========================================================================

    /// Hash of all gameplay state, for desync detection.
    ///
    /// Collections are hashed in ascending id order so equal states hash
    /// equally regardless of map layout.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.world.now.hash(&mut hasher);
        self.world.peek_next_id().hash(&mut hasher);
        self.paused.hash(&mut hasher);
        self.base_health.hash(&mut hasher);
        self.outcome.hash(&mut hasher);
        self.spawn_counter.hash(&mut hasher);

        let wallet = &self.world.wallet;
        wallet.balance.hash(&mut hasher);
        wallet.earned.hash(&mut hasher);
        wallet.spent.hash(&mut hasher);

        hash_storage(&mut hasher, &self.world.towers);
        hash_storage(&mut hasher, &self.world.enemies);
        hash_storage(&mut hasher, &self.world.heroes);
        hash_storage(&mut hasher, &self.world.troops);
        hash_storage(&mut hasher, &self.world.projectiles);

        hash_encoded(&mut hasher, &self.world.rng);
        hash_encoded(&mut hasher, &self.director);
        hash_encoded(&mut hasher, &self.spells);

        hasher.finish()
    }

    /// Serialize the whole match with bincode.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Serialization failed: {e}")))
    }

    /// Restore a match from [`serialize`](Self::serialize) output.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::InvalidState(format!("Deserialization failed: {e}")))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Create the enemy described by a spawn request.
///
/// Returns `None` when the enemy type is unknown.
fn spawn_from_request(
    world: &mut World,
    director: &mut WaveDirector,
    spawn_counter: &mut u32,
    rules: &Rules<'_>,
    request: &SpawnRequest,
    events: &mut TickEvents,
) -> Option<EntityId> {
    let definition = rules.tables.enemy(&request.enemy)?;
    let path = rules.paths.spawn_path(*spawn_counter, request.path);
    *spawn_counter = spawn_counter.wrapping_add(1);

    let id = world.allocate_id();
    let mut enemy = Enemy::from_definition(
        id,
        definition,
        request.wave,
        request.hp_multiplier,
        PathCursor::start(path),
        world.now,
    );
    enemy.jitter = lane_jitter(world, rules.config.lane_jitter);
    place_on_path(&mut enemy, rules);
    world.enemies.insert(id, enemy);
    director.on_spawned(request.wave);

    events.push(GameEvent::EnemySpawned {
        enemy: id,
        kind: request.enemy.clone(),
        path,
        wave: request.wave,
    });
    Some(id)
}

fn lane_jitter(world: &mut World, max: Fixed) -> Fixed {
    let bits = max.to_bits();
    if bits <= 0 {
        return Fixed::ZERO;
    }
    Fixed::from_bits(world.rng.gen_range(-bits..=bits))
}

/// Drop every reference to an entity that no longer exists or is dead.
fn clear_dangling_refs(world: &mut World) {
    let World {
        towers,
        enemies,
        heroes,
        troops,
        projectiles,
        ..
    } = world;

    let enemy_alive = |id: EntityId| enemies.get(id).is_some_and(Enemy::is_alive);
    let enemy_ids: Vec<(EntityId, bool)> = enemies
        .sorted_ids()
        .into_iter()
        .map(|id| (id, enemy_alive(id)))
        .collect();
    let live_enemy = |id: EntityId| {
        enemy_ids
            .binary_search_by_key(&id, |(i, _)| *i)
            .is_ok_and(|i| enemy_ids[i].1)
    };

    for id in towers.sorted_ids() {
        if let Some(tower) = towers.get_mut(id) {
            if tower.target.is_some_and(|t| !live_enemy(t)) {
                tower.target = None;
            }
        }
    }
    for id in heroes.sorted_ids() {
        if let Some(hero) = heroes.get_mut(id) {
            if hero.target.is_some_and(|t| !live_enemy(t)) {
                hero.target = None;
            }
        }
    }
    for id in troops.sorted_ids() {
        if let Some(troop) = troops.get_mut(id) {
            if troop.target.is_some_and(|t| !live_enemy(t)) {
                troop.target = None;
            }
        }
    }
    for id in projectiles.sorted_ids() {
        if let Some(projectile) = projectiles.get_mut(id) {
            if projectile.target.is_some_and(|t| !live_enemy(t)) {
                projectile.target = None;
            }
        }
    }

    let hero_alive = |id: EntityId| heroes.get(id).is_some_and(|h| h.state.is_alive());
    let troop_alive = |id: EntityId| troops.get(id).is_some_and(|t| t.state.is_alive());
    for id in enemies.sorted_ids() {
        let Some(enemy) = enemies.get_mut(id) else {
            continue;
        };
        let taunt_live = match enemy.taunt {
            Some(TargetRef::Hero(h)) => hero_alive(h),
            Some(TargetRef::Troop(t)) => troop_alive(t),
            Some(TargetRef::Enemy(_)) | None => false,
        };
        if !taunt_live {
            enemy.taunt = None;
        }
        if enemy.blocked_by.is_some_and(|t| !troop_alive(t)) {
            enemy.blocked_by = None;
        }
    }
}

fn hash_storage<T: Serialize>(hasher: &mut DefaultHasher, storage: &EntityStorage<T>) {
    storage.len().hash(hasher);
    for id in storage.sorted_ids() {
        id.hash(hasher);
        if let Some(entity) = storage.get(id) {
            hash_encoded(hasher, entity);
        }
    }
}

fn hash_encoded<T: Serialize + ?Sized>(hasher: &mut DefaultHasher, value: &T) {
    if let Ok(bytes) = bincode::serialize(value) {
        bytes.hash(hasher);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelRegistry;
    use crate::progression::UpgradeBranch;

    fn quad(seed: u64) -> Simulation {
        let tables = DataTables::builtin();
        let registry = LevelRegistry::with_builtin();
        let level = registry.get("quad").unwrap().clone();
        Simulation::new(&level, tables, SimConfig::default(), seed).unwrap()
    }

    fn run(sim: &mut Simulation, ms: u32) -> Vec<TickEvents> {
        (0..ms / TICK_DURATION_MS)
            .map(|_| sim.tick(TICK_DURATION_MS))
            .collect()
    }

    #[test]
    fn test_new_places_hero_at_spawn() {
        let sim = quad(1);
        assert_eq!(sim.tick_count(), 0);
        assert_eq!(sim.world().heroes.len(), 1);
        let hero = sim.world().heroes.sorted().next().unwrap();
        assert_eq!(hero.position, GridPoint::new(15, 6).to_world());
        assert_eq!(sim.wallet().balance, 250);
    }

    #[test]
    fn test_tick_clamps_dt() {
        let mut sim = quad(1);
        sim.tick(10_000);
        assert_eq!(sim.now(), u64::from(sim.config().max_step_ms));
        assert_eq!(sim.tick_count(), 1);
    }

    #[test]
    fn test_pause_freezes_time() {
        let mut sim = quad(1);
        sim.tick(50);
        sim.apply_command(GameCommand::Pause).unwrap();
        run(&mut sim, 1000);
        assert_eq!(sim.now(), 50);
        assert_eq!(sim.tick_count(), 1);
        sim.apply_command(GameCommand::Resume).unwrap();
        sim.tick(50);
        assert_eq!(sim.now(), 100);
    }

    #[test]
    fn test_placement_rules() {
        let mut sim = quad(1);
        let err = sim.place_tower(TowerKind::Archer, GridPoint::new(0, 2)).unwrap_err();
        assert!(matches!(err, GameError::InvalidPlacement { .. }));
        let err = sim.place_tower(TowerKind::Archer, GridPoint::new(50, 2)).unwrap_err();
        assert!(matches!(err, GameError::InvalidPlacement { .. }));

        let id = sim.place_tower(TowerKind::Archer, GridPoint::new(3, 4)).unwrap();
        assert!(sim.world().towers.contains(id));
        let err = sim.place_tower(TowerKind::Archer, GridPoint::new(3, 4)).unwrap_err();
        assert!(matches!(err, GameError::InvalidPlacement { .. }));

        let events = sim.tick(TICK_DURATION_MS);
        assert!(events.events.contains(&GameEvent::TowerPlaced {
            tower: id,
            kind: TowerKind::Archer
        }));
    }

    #[test]
    fn test_branch_lock_rejected() {
        let mut sim = quad(1);
        sim.world_mut().wallet.earn(10_000);
        let id = sim.place_tower(TowerKind::Archer, GridPoint::new(3, 4)).unwrap();
        sim.upgrade_tower(id, None).unwrap();
        sim.upgrade_tower(id, None).unwrap();
        let err = sim.upgrade_tower(id, None).unwrap_err();
        assert!(matches!(err, GameError::BranchChoice { level: 3, .. }));

        sim.upgrade_tower(id, Some(UpgradeBranch::A)).unwrap();
        let err = sim.upgrade_tower(id, Some(UpgradeBranch::B)).unwrap_err();
        assert!(matches!(
            err,
            GameError::BranchLocked {
                held: UpgradeBranch::A,
                ..
            }
        ));
        let err = sim.upgrade_tower(id, Some(UpgradeBranch::A)).unwrap_err();
        assert!(matches!(err, GameError::MaxLevel(_)));

        let tower = sim.world().towers.get(id).unwrap();
        assert_eq!(tower.level, 4);
        assert_eq!(tower.upgrade, Some(UpgradeBranch::A));
    }

    #[test]
    fn test_sell_refunds_percentage_of_investment() {
        let mut sim = quad(1);
        let before = sim.wallet().balance;
        let id = sim.place_tower(TowerKind::Archer, GridPoint::new(3, 4)).unwrap();
        let cost = before - sim.wallet().balance;
        let refund = sim.sell_tower(id).unwrap();
        assert_eq!(refund, cost * 70 / 100);
        assert!(!sim.world().towers.contains(id));
        assert!(matches!(
            sim.sell_tower(id).unwrap_err(),
            GameError::EntityNotFound(_)
        ));
    }

    #[test]
    fn test_start_wave_spawns_enemies() {
        let mut sim = quad(3);
        assert_eq!(sim.start_next_wave().unwrap(), 0);
        let spawned: usize = run(&mut sim, 2000)
            .iter()
            .flat_map(|e| e.events.iter())
            .filter(|e| matches!(e, GameEvent::EnemySpawned { .. }))
            .count();
        assert!(spawned > 0);
        assert_eq!(sim.world().enemies.len(), spawned);
    }

    #[test]
    fn test_identical_seeds_hash_identically() {
        let mut a = quad(42);
        let mut b = quad(42);
        for sim in [&mut a, &mut b] {
            sim.place_tower(TowerKind::Archer, GridPoint::new(3, 4)).unwrap();
            sim.start_next_wave().unwrap();
            run(sim, 5000);
        }
        assert_eq!(a.state_hash(), b.state_hash());

        let mut c = quad(43);
        c.place_tower(TowerKind::Archer, GridPoint::new(3, 4)).unwrap();
        c.start_next_wave().unwrap();
        run(&mut c, 5000);
        assert_ne!(a.state_hash(), c.state_hash());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut sim = quad(9);
        sim.place_tower(TowerKind::Cannon, GridPoint::new(3, 4)).unwrap();
        sim.start_next_wave().unwrap();
        run(&mut sim, 3000);

        let bytes = sim.serialize().unwrap();
        let mut restored = Simulation::deserialize(&bytes).unwrap();
        assert_eq!(sim.state_hash(), restored.state_hash());

        run(&mut sim, 2000);
        run(&mut restored, 2000);
        assert_eq!(sim.state_hash(), restored.state_hash());
    }

    #[test]
    fn test_garbage_bytes_are_invalid_state() {
        let err = Simulation::deserialize(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, GameError::InvalidState(_)));
    }

    #[test]
    fn test_leaks_end_match_in_defeat() {
        let mut sim = quad(5);
        sim.base_health = 1;
        let id = sim.spawn_enemy("frosh", None).unwrap();
        let mut ended = None;
        for _ in 0..2000 {
            let events = sim.tick(TICK_DURATION_MS);
            if let Some(GameEvent::MatchEnded { outcome }) = events
                .events
                .iter()
                .find(|e| matches!(e, GameEvent::MatchEnded { .. }))
            {
                ended = Some(*outcome);
                break;
            }
            // Keep the hero out of the way.
            if let Some(hero) = sim.world_mut().heroes.sorted_ids().first().copied() {
                sim.world_mut().heroes.get_mut(hero).unwrap().state = UnitState::Respawning {
                    ready_at: u64::MAX,
                };
            }
        }
        assert_eq!(ended, Some(MatchOutcome::Defeat));
        assert!(!sim.world().enemies.contains(id));
        assert!(sim.apply_command(GameCommand::StartNextWave).is_err());
    }
}
