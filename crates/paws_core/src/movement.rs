//! Movement and lifecycle updates.
//!
//! Advances enemies along their paths, drives the hero and troop state
//! machines and runs the station trains that deliver troops.

use crate::components::{
    slot_offset, CombatProfile, Enemy, EnemyState, EntityId, EntityKind, GridPoint, Health, Hero,
    TargetRef, TrainPhase, Troop, UnitState,
};
use crate::events::{DamageEvent, GameEvent, TickEvents};
use crate::math::{ratio, seconds, Fixed, Millis, Vec2Fixed};
use crate::path::Advance;
use crate::status::StatusKind;
use crate::world::{EntityStorage, Rules, World};

// ============================================================================
// Enemies
// ============================================================================

fn hero_engages(heroes: &EntityStorage<Hero>, hero: EntityId, enemy: EntityId, at: Vec2Fixed) -> bool {
    heroes.get(hero).is_some_and(|h| {
        h.state == UnitState::Engaging && h.target == Some(enemy) && at.within(h.position, h.profile.range)
    })
}

fn troop_engages(troops: &EntityStorage<Troop>, troop: EntityId, enemy: EntityId, at: Vec2Fixed) -> bool {
    troops.get(troop).is_some_and(|t| {
        t.state == UnitState::Engaging && t.target == Some(enemy) && at.within(t.position, t.profile.range)
    })
}

/// Advance every live enemy by one tick.
///
/// Burn ticks even while the enemy is stunned or frozen; only path progress
/// stops. Enemies blocked by a live troop hold position.
pub fn enemy_movement_system(world: &mut World, rules: &Rules<'_>, events: &mut TickEvents) {
    let now = world.now;
    let dt = world.dt;
    let config = rules.config;

    for id in world.enemies.sorted_ids() {
        let Some(enemy) = world.enemies.get_mut(id) else {
            continue;
        };
        if !enemy.is_alive() {
            continue;
        }

        let burn = enemy.statuses.intensity(StatusKind::Burn, now);
        enemy.statuses.expire(now);
        if burn > Fixed::ZERO && dt > 0 {
            let dealt = enemy.health.apply_damage(burn * seconds(dt));
            let lethal = enemy.health.is_dead();
            events.damage.push(DamageEvent {
                source: None,
                target: TargetRef::Enemy(id),
                amount: dealt,
                lethal,
            });
            if lethal {
                enemy.state = EnemyState::Dead;
                events.push(GameEvent::EntityDied {
                    entity: id,
                    kind: EntityKind::Enemy,
                });
                continue;
            }
        }

        let ramp = if enemy.state == EnemyState::Spawning {
            let elapsed = now.saturating_sub(enemy.spawned_at);
            if elapsed >= u64::from(config.spawn_ramp_ms) {
                enemy.state = EnemyState::Moving;
                Fixed::ONE
            } else {
                ratio(
                    i64::try_from(elapsed).unwrap_or(i64::MAX),
                    i64::from(config.spawn_ramp_ms),
                )
            }
        } else {
            Fixed::ONE
        };

        // Drop engagements whose engager moved on.
        let position = enemy.position;
        let taunt_holds = enemy.taunt.is_some_and(|taunt| match taunt {
            TargetRef::Hero(hero) => hero_engages(&world.heroes, hero, id, position),
            TargetRef::Troop(troop) => troop_engages(&world.troops, troop, id, position),
            TargetRef::Enemy(_) => false,
        });
        if !taunt_holds {
            enemy.taunt = None;
        }
        if enemy
            .blocked_by
            .is_some_and(|troop| !troop_engages(&world.troops, troop, id, position))
        {
            enemy.blocked_by = None;
        }

        if enemy.state != EnemyState::Spawning {
            enemy.state = if enemy.taunt.is_some() {
                EnemyState::InCombat
            } else {
                EnemyState::Moving
            };
        }
        if enemy.blocked_by.is_some() || enemy.statuses.is_immobilized(now) {
            continue;
        }

        let Some(path) = rules.paths.get(enemy.cursor.path) else {
            continue;
        };
        let slow = enemy.statuses.fraction(StatusKind::Slow, now);
        let speed = enemy.speed * ramp * (Fixed::ONE - slow);
        if path.advance(&mut enemy.cursor, speed * seconds(dt)) == Advance::ReachedGoal {
            enemy.state = EnemyState::ReachedGoal;
            events.push(GameEvent::EnemyReachedGoal {
                enemy: id,
                damage: enemy.leak_damage,
            });
        }
        place_on_path(enemy, rules);
    }
}

/// Set position, facing and lane offset from the enemy's cursor.
pub fn place_on_path(enemy: &mut Enemy, rules: &Rules<'_>) {
    let Some(path) = rules.paths.get(enemy.cursor.path) else {
        return;
    };
    let sample = path.sample(&enemy.cursor);
    enemy.position = sample.position;
    enemy.facing = sample.facing;
    let merge = rules.paths.merge_lane_offset(
        enemy.cursor.path,
        GridPoint::from_world(sample.position),
        rules.config.lane_spacing,
    );
    enemy.lane_offset = enemy.jitter + merge;
}

// ============================================================================
// Heroes and Troops
// ============================================================================

/// Nearest live enemy within `aggro` of `from` and `leash` of `home`.
fn acquire(
    enemies: &EntityStorage<Enemy>,
    from: Vec2Fixed,
    aggro: Fixed,
    home: Vec2Fixed,
    leash: Fixed,
) -> Option<EntityId> {
    enemies
        .sorted()
        .filter(|e| {
            e.is_alive()
                && e.state != EnemyState::Spawning
                && e.position.within(from, aggro)
                && e.position.within(home, leash)
        })
        .min_by(|a, b| {
            a.position
                .distance_squared(from)
                .cmp(&b.position.distance_squared(from))
                .then(a.id.cmp(&b.id))
        })
        .map(|e| e.id)
}

fn step(dt: Millis, speed: Fixed) -> Fixed {
    speed * seconds(dt)
}

/// Advance every hero's state machine.
pub fn hero_system(world: &mut World, events: &mut TickEvents) {
    let now = world.now;
    let dt = world.dt;

    for id in world.heroes.sorted_ids() {
        let Some(hero) = world.heroes.get_mut(id) else {
            continue;
        };
        hero.statuses.expire(now);
        if hero.shield.is_some_and(|s| now >= s.until) {
            hero.shield = None;
        }

        match hero.state {
            UnitState::Dead { respawn_at } => {
                hero.state = UnitState::Respawning {
                    ready_at: respawn_at,
                };
                hero.position = hero.spawn;
                hero.target = None;
                hero.engaged_since = None;
                hero.move_target = None;
                continue;
            }
            UnitState::Respawning { ready_at } => {
                if now >= ready_at {
                    hero.health.restore();
                    hero.home = hero.spawn;
                    hero.position = hero.spawn;
                    hero.state = UnitState::AtHome;
                    events.push(GameEvent::HeroRespawned { hero: id });
                }
                continue;
            }
            _ => {}
        }
        if hero.statuses.is_immobilized(now) {
            continue;
        }

        let max_step = step(dt, hero.profile.speed);
        match hero.state {
            UnitState::AtHome | UnitState::Moving => {
                if let Some(target) = hero.move_target {
                    hero.position = hero.position.step_toward(target, max_step);
                    if hero.position == target {
                        hero.state = UnitState::AtHome;
                        hero.move_target = None;
                    }
                }
                if let Some(enemy) = acquire(
                    &world.enemies,
                    hero.position,
                    hero.profile.aggro_range,
                    hero.home,
                    hero.leash,
                ) {
                    hero.state = UnitState::Engaging;
                    hero.target = Some(enemy);
                    hero.engaged_since = Some(now);
                    hero.move_target = None;
                }
            }
            UnitState::Engaging => {
                let timed_out = hero.engaged_since.is_some_and(|since| {
                    now.saturating_sub(since) >= u64::from(hero.aggro_timeout_ms)
                });
                let current = hero.target.filter(|t| {
                    world
                        .enemies
                        .get(*t)
                        .is_some_and(|e| e.is_alive() && e.position.within(hero.home, hero.leash))
                });
                let target = current.or_else(|| {
                    acquire(
                        &world.enemies,
                        hero.position,
                        hero.profile.aggro_range,
                        hero.home,
                        hero.leash,
                    )
                });
                match target {
                    Some(target) if !timed_out => {
                        hero.target = Some(target);
                        if let Some(enemy) = world.enemies.get_mut(target) {
                            if enemy.position.within(hero.position, hero.profile.range) {
                                if enemy.taunt.is_none() {
                                    enemy.taunt = Some(TargetRef::Hero(id));
                                }
                            } else {
                                hero.position = hero
                                    .position
                                    .step_toward(enemy.position, max_step)
                                    .clamp_within(hero.home, hero.leash);
                            }
                        }
                    }
                    _ => {
                        hero.state = UnitState::Returning;
                        hero.target = None;
                        hero.engaged_since = None;
                    }
                }
            }
            UnitState::Returning => {
                hero.position = hero.position.step_toward(hero.home, max_step);
                if hero.position == hero.home {
                    hero.state = UnitState::AtHome;
                }
            }
            UnitState::Dead { .. } | UnitState::Respawning { .. } => {}
        }
    }
}

/// Advance every troop's state machine.
///
/// Troops never leave `move_radius` around their spawn point. A troop in
/// melee reach blocks its target.
pub fn troop_system(world: &mut World) {
    let dt = world.dt;

    for id in world.troops.sorted_ids() {
        let Some(troop) = world.troops.get_mut(id) else {
            continue;
        };
        if !troop.state.is_alive() {
            continue;
        }
        let max_step = step(dt, troop.profile.speed);
        let leash = troop.move_radius + troop.profile.range;

        match troop.state {
            UnitState::AtHome | UnitState::Moving => {
                if troop.position != troop.rally_point {
                    troop.position = troop.position.step_toward(troop.rally_point, max_step);
                    troop.state = if troop.position == troop.rally_point {
                        UnitState::AtHome
                    } else {
                        UnitState::Moving
                    };
                }
                if let Some(enemy) = acquire(
                    &world.enemies,
                    troop.position,
                    troop.profile.aggro_range,
                    troop.spawn_point,
                    leash,
                ) {
                    troop.state = UnitState::Engaging;
                    troop.target = Some(enemy);
                }
            }
            UnitState::Engaging => {
                let current = troop.target.filter(|t| {
                    world
                        .enemies
                        .get(*t)
                        .is_some_and(|e| e.is_alive() && e.position.within(troop.spawn_point, leash))
                });
                let target = current.or_else(|| {
                    acquire(
                        &world.enemies,
                        troop.position,
                        troop.profile.aggro_range,
                        troop.spawn_point,
                        leash,
                    )
                });
                match target {
                    Some(target) => {
                        troop.target = Some(target);
                        if let Some(enemy) = world.enemies.get_mut(target) {
                            if enemy.position.within(troop.position, troop.profile.range) {
                                if enemy.blocked_by.is_none() {
                                    enemy.blocked_by = Some(id);
                                }
                                if enemy.taunt.is_none() {
                                    enemy.taunt = Some(TargetRef::Troop(id));
                                }
                            } else {
                                troop.position = troop
                                    .position
                                    .step_toward(enemy.position, max_step)
                                    .clamp_within(troop.spawn_point, troop.move_radius);
                            }
                        }
                    }
                    None => {
                        troop.state = UnitState::Returning;
                        troop.target = None;
                    }
                }
            }
            UnitState::Returning => {
                troop.position = troop.position.step_toward(troop.rally_point, max_step);
                if troop.position == troop.rally_point {
                    troop.state = UnitState::AtHome;
                }
            }
            UnitState::Dead { .. } | UnitState::Respawning { .. } => {}
        }
        troop.position = troop
            .position
            .clamp_within(troop.spawn_point, troop.move_radius);
    }
}

// ============================================================================
// Stations
// ============================================================================

/// Run station trains and disembark troops into free slots while docked.
pub fn station_system(world: &mut World, rules: &Rules<'_>, events: &mut TickEvents) {
    let now = world.now;
    let timings = rules.config.train;

    for id in world.towers.sorted_ids() {
        let Some(tower) = world.towers.get_mut(id) else {
            continue;
        };
        let can_act = tower.can_act(now);
        let kind = tower.kind;
        let stats = tower.stats.clone();
        let origin = tower.position;
        let Some(station) = tower.station.as_mut() else {
            continue;
        };

        let elapsed = now.saturating_sub(station.train.phase_started);
        match station.train.phase {
            TrainPhase::Away => {
                if can_act && station.ready_slots(now).next().is_some() {
                    station.train.enter(TrainPhase::Arriving, now);
                }
            }
            TrainPhase::Arriving => {
                if elapsed >= u64::from(timings.arrive_ms) {
                    station.train.enter(TrainPhase::Docked, now);
                }
            }
            TrainPhase::Docked => {
                if elapsed >= u64::from(timings.dock_ms) {
                    station.train.enter(TrainPhase::Departing, now);
                }
            }
            TrainPhase::Departing => {
                if elapsed >= u64::from(timings.depart_ms) {
                    station.train.enter(TrainPhase::Away, now);
                }
            }
        }

        if !can_act || !station.train.may_spawn() {
            continue;
        }
        let ready: Vec<usize> = station.ready_slots(now).collect();
        let rally = station.rally_point;
        let Some(troop_def) = rules.tables.tower(kind).troop else {
            continue;
        };

        for slot in ready {
            let troop_id = world.allocate_id();
            let spawn_point = origin + slot_offset(slot);
            let mut troop = Troop {
                id: troop_id,
                owner: id,
                slot,
                spawn_point,
                move_radius: troop_def.move_radius,
                rally_point: spawn_point,
                position: spawn_point,
                health: Health::new(Fixed::from_num(stats.troop_hp.unwrap_or(1))),
                profile: CombatProfile {
                    damage: stats.damage,
                    range: troop_def.melee_range,
                    aggro_range: stats.range,
                    attack_interval_ms: stats.attack_interval_ms,
                    speed: troop_def.speed,
                },
                last_attack: None,
                target: None,
                state: UnitState::AtHome,
            };
            troop.set_rally(rally);
            world.troops.insert(troop_id, troop);
            if let Some(station) = world.towers.get_mut(id).and_then(|t| t.station.as_mut()) {
                station.slots[slot] = Some(troop_id);
                station.respawn_at[slot] = None;
            }
            events.push(GameEvent::TroopSpawned {
                troop: troop_id,
                owner: id,
                slot,
            });
        }
    }
}
