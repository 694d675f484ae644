//! Combat resolution.
//!
//! This module implements:
//! - Damage after armor, boosts and weaken, floored at the configured minimum
//! - Target acquisition with lock stickiness and `First`/`Strongest` priority
//! - Single, chain, splash and multi-target tower attacks
//! - Tower auras and enemy debuff auras
//! - Hero and troop melee, enemy counter-attacks and hero abilities
//!
//! All iteration is in ascending id order and every random roll comes from
//! the world's seeded generator.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::components::{
    BoostSource, EnemyState, EntityId, EntityKind, Shield, TargetRef, Tower, UnitState,
};
use crate::data::HeroAbility;
use crate::events::{DamageEvent, EffectKind, GameEvent, TickEvents};
use crate::math::{clamp_unit, Fixed, Millis, Vec2Fixed};
use crate::path::PathNetwork;
use crate::progression::{AttackPattern, TargetPriority, TowerKind, TowerRole};
use crate::projectile::Projectile;
use crate::status::{StatusApplication, StatusKind};
use crate::world::{Rules, World};

// ============================================================================
// Damage
// ============================================================================

/// Damage dealt by one hit.
///
/// `base × (1 − armor) × (1 + damage_boost) × (1 − weaken)`, floored at
/// `min_damage`. A non-positive base deals nothing.
#[must_use]
pub fn effective_damage(
    base: Fixed,
    armor: Fixed,
    damage_boost: Fixed,
    weaken: Fixed,
    min_damage: Fixed,
) -> Fixed {
    if base <= Fixed::ZERO {
        return Fixed::ZERO;
    }
    let damage = base
        * (Fixed::ONE - clamp_unit(armor))
        * (Fixed::ONE + damage_boost.max(Fixed::ZERO))
        * (Fixed::ONE - clamp_unit(weaken));
    damage.max(min_damage.max(Fixed::ZERO))
}

/// Damage multiplier at `distance` from a blast centre.
///
/// Linear from 1 at the centre to `edge_factor` at `radius`.
#[must_use]
pub fn splash_factor(distance: Fixed, radius: Fixed, edge_factor: Fixed) -> Fixed {
    if radius <= Fixed::ZERO {
        return Fixed::ONE;
    }
    let t = (distance / radius).min(Fixed::ONE);
    Fixed::ONE - (Fixed::ONE - edge_factor) * t
}

fn roll(rng: &mut ChaCha8Rng, chance: Fixed) -> bool {
    if chance <= Fixed::ZERO {
        return false;
    }
    if chance >= Fixed::ONE {
        return true;
    }
    let sample: u32 = rng.gen_range(0..10_000);
    Fixed::from_num(sample) < chance * Fixed::from_num(10_000)
}

// ============================================================================
// Impact Payload
// ============================================================================

/// What a hit delivers: damage plus side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactPayload {
    /// Attacker.
    pub source: Option<EntityId>,
    /// Damage before the victim's armor (attacker weaken already applied).
    pub damage: Fixed,
    /// Blast radius; `None` for single-target hits.
    pub splash: Option<Fixed>,
    /// Statuses applied to every victim.
    pub statuses: Vec<StatusApplication>,
    /// Stun chance and duration.
    pub stun: Option<(Fixed, u32)>,
    /// Effect signal on impact.
    pub effect: EffectKind,
}

impl ImpactPayload {
    /// Plain damage from `source`.
    #[must_use]
    pub fn new(source: EntityId, damage: Fixed) -> Self {
        Self {
            source: Some(source),
            damage,
            splash: None,
            statuses: Vec::new(),
            stun: None,
            effect: EffectKind::Hit,
        }
    }

    /// Payload of a tower attack at `now`.
    #[must_use]
    pub fn from_tower(tower: &Tower, now: Millis) -> Self {
        let stats = &tower.stats;
        let duration = stats.effect_duration_ms;
        let mut statuses = Vec::new();
        if let Some(slow) = stats.slow_amount {
            statuses.push(StatusApplication::new(StatusKind::Slow, slow, duration));
        }
        if let Some(burn) = stats.burn_damage {
            statuses.push(StatusApplication::new(StatusKind::Burn, burn, duration));
        }
        let effect = match tower.kind {
            TowerKind::Cannon => EffectKind::Explosion,
            TowerKind::Frost => EffectKind::Frost,
            TowerKind::Tesla => EffectKind::Lightning,
            TowerKind::Flame => EffectKind::Fire,
            _ => EffectKind::Hit,
        };
        Self {
            source: Some(tower.id),
            damage: stats.damage * tower.damage_factor(now),
            splash: stats.splash_radius,
            statuses,
            stun: stats.stun_chance.map(|chance| (chance, duration)),
            effect,
        }
    }
}

/// Apply one hit to an enemy. Returns false if the enemy is gone or dead.
pub fn strike_enemy(
    world: &mut World,
    rules: &Rules<'_>,
    target: EntityId,
    damage: Fixed,
    payload: &ImpactPayload,
    events: &mut TickEvents,
) -> bool {
    let now = world.now;
    let Some(enemy) = world.enemies.get_mut(target) else {
        return false;
    };
    if !enemy.is_alive() {
        return false;
    }

    let amount = effective_damage(
        damage,
        enemy.armor,
        Fixed::ZERO,
        Fixed::ZERO,
        rules.config.min_damage,
    );
    let dealt = enemy.health.apply_damage(amount);
    for status in &payload.statuses {
        enemy.statuses.apply(status.at(now), now);
    }
    if let Some((chance, duration_ms)) = payload.stun {
        if roll(&mut world.rng, chance) {
            enemy
                .statuses
                .apply(
                    StatusApplication::new(StatusKind::Stun, Fixed::ONE, duration_ms).at(now),
                    now,
                );
        }
    }

    let lethal = enemy.health.is_dead();
    if lethal {
        enemy.state = EnemyState::Dead;
        events.push(GameEvent::EntityDied {
            entity: target,
            kind: EntityKind::Enemy,
        });
    }
    events.damage.push(DamageEvent {
        source: payload.source,
        target: TargetRef::Enemy(target),
        amount: dealt,
        lethal,
    });
    true
}

/// Resolve an impact at `point`.
///
/// Splash payloads hit every live enemy in the blast with radial falloff;
/// otherwise only `target` is hit, if it is still alive.
pub fn resolve_impact(
    world: &mut World,
    rules: &Rules<'_>,
    payload: &ImpactPayload,
    target: Option<EntityId>,
    point: Vec2Fixed,
    events: &mut TickEvents,
) {
    if let Some(radius) = payload.splash {
        let edge = rules.config.splash_edge_factor;
        let victims: Vec<(EntityId, Fixed)> = world
            .enemies
            .sorted()
            .filter(|e| e.is_alive() && e.position.within(point, radius))
            .map(|e| (e.id, splash_factor(e.position.distance(point), radius, edge)))
            .collect();
        for (id, factor) in victims {
            strike_enemy(world, rules, id, payload.damage * factor, payload, events);
        }
        events.effect(EffectKind::Explosion, point, radius);
    } else if let Some(id) = target {
        if strike_enemy(world, rules, id, payload.damage, payload, events) {
            events.effect(payload.effect, point, Fixed::ZERO);
        }
    }
}

// ============================================================================
// Targeting
// ============================================================================

/// An enemy eligible for targeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Enemy id.
    pub id: EntityId,
    /// Enemy position.
    pub position: Vec2Fixed,
    /// Distance left to the goal.
    pub remaining: Fixed,
    /// Current hit points.
    pub hp: Fixed,
}

/// Live enemies within `range` of `center`, in id order.
#[must_use]
pub fn enemy_candidates(
    world: &World,
    paths: &PathNetwork,
    center: Vec2Fixed,
    range: Fixed,
) -> Vec<Candidate> {
    world
        .enemies
        .sorted()
        .filter(|e| e.is_alive() && e.position.within(center, range))
        .map(|e| Candidate {
            id: e.id,
            position: e.position,
            remaining: paths
                .get(e.cursor.path)
                .map_or(Fixed::MAX, |p| p.remaining(&e.cursor)),
            hp: e.health.current,
        })
        .collect()
}

/// Pick up to `count` targets.
///
/// A locked target that is still a candidate is kept first; the rest are
/// ordered by priority with ties broken by id.
#[must_use]
pub fn select_targets(
    candidates: &[Candidate],
    priority: TargetPriority,
    locked: Option<EntityId>,
    count: usize,
) -> Vec<EntityId> {
    let mut ordered: Vec<&Candidate> = candidates.iter().collect();
    match priority {
        TargetPriority::First => {
            ordered.sort_by(|a, b| a.remaining.cmp(&b.remaining).then(a.id.cmp(&b.id)));
        }
        TargetPriority::Strongest => {
            ordered.sort_by(|a, b| b.hp.cmp(&a.hp).then(a.id.cmp(&b.id)));
        }
    }

    let mut picked = Vec::with_capacity(count);
    if let Some(lock) = locked.filter(|l| candidates.iter().any(|c| c.id == *l)) {
        picked.push(lock);
    }
    for candidate in ordered {
        if picked.len() >= count {
            break;
        }
        if !picked.contains(&candidate.id) {
            picked.push(candidate.id);
        }
    }
    picked.truncate(count);
    picked
}

/// Chain sequence starting at `first`: each hop goes to the nearest
/// not-yet-hit live enemy within `radius` of the previous one.
#[must_use]
pub fn chain_hops(
    world: &World,
    first: EntityId,
    extra_targets: u32,
    radius: Fixed,
) -> Vec<(EntityId, Vec2Fixed)> {
    let Some(start) = world.enemies.get(first).filter(|e| e.is_alive()) else {
        return Vec::new();
    };
    let mut hops = vec![(first, start.position)];
    let mut last = start.position;
    for _ in 0..extra_targets {
        let next = world
            .enemies
            .sorted()
            .filter(|e| {
                e.is_alive()
                    && e.position.within(last, radius)
                    && !hops.iter().any(|(id, _)| *id == e.id)
            })
            .min_by(|a, b| {
                a.position
                    .distance_squared(last)
                    .cmp(&b.position.distance_squared(last))
                    .then(a.id.cmp(&b.id))
            })
            .map(|e| (e.id, e.position));
        let Some((id, position)) = next else {
            break;
        };
        hops.push((id, position));
        last = position;
    }
    hops
}

// ============================================================================
// Tower Attacks
// ============================================================================

/// Let every ready tower attack once.
pub fn tower_attack_system(world: &mut World, rules: &Rules<'_>, events: &mut TickEvents) {
    let now = world.now;
    for id in world.towers.sorted_ids() {
        let Some(tower) = world.towers.get(id) else {
            continue;
        };
        let pattern = tower.stats.pattern();
        if pattern == AttackPattern::None || !tower.can_act(now) || !tower.is_ready(now) {
            continue;
        }

        let count = match pattern {
            AttackPattern::Multi { targets } => targets.max(1) as usize,
            _ => 1,
        };
        let candidates =
            enemy_candidates(world, rules.paths, tower.position, tower.effective_range(now));
        let targets = select_targets(&candidates, tower.stats.priority, tower.target, count);
        let origin = tower.position;
        let kind = tower.kind;
        let payload = ImpactPayload::from_tower(tower, now);

        let Some(&primary) = targets.first() else {
            if let Some(tower) = world.towers.get_mut(id) {
                tower.target = None;
            }
            continue;
        };
        let position_of = |target: EntityId| {
            candidates
                .iter()
                .find(|c| c.id == target)
                .map_or(origin, |c| c.position)
        };
        let aim = position_of(primary);
        if let Some(tower) = world.towers.get_mut(id) {
            tower.last_attack = Some(now);
            tower.target = Some(primary);
            if aim != origin {
                tower.facing = (aim - origin).normalize();
            }
        }

        if let AttackPattern::Chain { extra_targets } = pattern {
            let falloff = rules.config.chain_falloff;
            let mut damage = payload.damage;
            for (hop, position) in chain_hops(world, primary, extra_targets, rules.config.chain_radius) {
                strike_enemy(world, rules, hop, damage, &payload, events);
                events.effect(EffectKind::Lightning, position, Fixed::ZERO);
                damage *= falloff;
            }
            continue;
        }

        let spec = rules.tables.tower(kind).projectile;
        for target in targets {
            let destination = position_of(target);
            match spec {
                Some(spec) => {
                    let projectile_id = world.allocate_id();
                    world.projectiles.insert(
                        projectile_id,
                        Projectile::launch(
                            projectile_id,
                            &spec,
                            origin,
                            destination,
                            target,
                            payload.clone(),
                        ),
                    );
                }
                None => resolve_impact(world, rules, &payload, Some(target), destination, events),
            }
        }
    }
}

// ============================================================================
// Auras
// ============================================================================

/// Refresh aura-tower boosts and drop lapsed boosts and debuffs.
///
/// Boosts granted here expire after `aura_refresh_ms`, so a tower that
/// leaves an aura (or whose beacon is sold) loses the bonus shortly after.
pub fn aura_system(world: &mut World, rules: &Rules<'_>) {
    let now = world.now;
    let until = now + u64::from(rules.config.aura_refresh_ms);
    let auras: Vec<(EntityId, Vec2Fixed, Fixed, Fixed, Fixed)> = world
        .towers
        .sorted()
        .filter(|t| t.kind.role() == TowerRole::Aura && t.can_act(now))
        .map(|t| {
            (
                t.id,
                t.position,
                t.stats.range,
                t.stats.aura_range_buff.unwrap_or(Fixed::ZERO),
                t.stats.aura_damage_buff.unwrap_or(Fixed::ZERO),
            )
        })
        .collect();

    for id in world.towers.sorted_ids() {
        let Some(tower) = world.towers.get_mut(id) else {
            continue;
        };
        tower.debuffs.expire(now);
        let mut changed = tower.boosts.expire(now);
        if tower.kind.role() != TowerRole::Aura {
            for &(source, center, radius, range_buff, damage_buff) in &auras {
                if source == id || !tower.position.within(center, radius) {
                    continue;
                }
                if range_buff > Fixed::ZERO {
                    changed |= tower.boosts.apply_range(BoostSource::Aura, range_buff, until, now);
                }
                if damage_buff > Fixed::ZERO {
                    changed |= tower.boosts.apply_damage(BoostSource::Aura, damage_buff, until, now);
                }
            }
        }
        if changed {
            tower.refresh_stats(rules.tables.tower(tower.kind), now);
        }
    }
}

/// Pulse enemy debuff auras onto nearby towers.
pub fn enemy_aura_system(world: &mut World, rules: &Rules<'_>) {
    let now = world.now;
    let mut pulses = Vec::new();
    for id in world.enemies.sorted_ids() {
        let Some(enemy) = world.enemies.get_mut(id) else {
            continue;
        };
        if !enemy.is_alive() {
            continue;
        }
        let Some(aura) = rules.tables.enemy(&enemy.kind).and_then(|d| d.aura) else {
            continue;
        };
        let due = enemy
            .last_aura
            .map_or(true, |last| now.saturating_sub(last) >= u64::from(aura.interval_ms));
        if due {
            enemy.last_aura = Some(now);
            pulses.push((enemy.position, aura));
        }
    }

    for (center, aura) in pulses {
        for id in world.towers.sorted_ids() {
            if let Some(tower) = world.towers.get_mut(id) {
                if tower.position.within(center, aura.radius) {
                    tower.debuffs.apply(aura.application().at(now), now);
                }
            }
        }
    }
}

// ============================================================================
// Melee
// ============================================================================

fn melee_ready(last_attack: Option<Millis>, interval_ms: u32, now: Millis) -> bool {
    last_attack.map_or(true, |last| now.saturating_sub(last) >= u64::from(interval_ms))
}

/// Engaged heroes and troops strike their target when in reach.
pub fn unit_melee_system(world: &mut World, rules: &Rules<'_>, events: &mut TickEvents) {
    let now = world.now;
    let min_damage = rules.config.min_damage;

    for id in world.heroes.sorted_ids() {
        let Some(hero) = world.heroes.get(id) else {
            continue;
        };
        let Some(target) = hero.target.filter(|_| hero.state == UnitState::Engaging) else {
            continue;
        };
        if !melee_ready(hero.last_attack, hero.profile.attack_interval_ms, now) {
            continue;
        }
        let in_reach = world
            .enemies
            .get(target)
            .is_some_and(|e| e.is_alive() && e.position.within(hero.position, hero.profile.range));
        if !in_reach {
            continue;
        }
        let weaken = hero.statuses.fraction(StatusKind::Weaken, now);
        let damage = effective_damage(hero.profile.damage, Fixed::ZERO, Fixed::ZERO, weaken, min_damage);
        let position = hero.position;
        if let Some(hero) = world.heroes.get_mut(id) {
            hero.last_attack = Some(now);
        }
        if strike_enemy(world, rules, target, damage, &ImpactPayload::new(id, damage), events) {
            events.effect(EffectKind::Hit, position, Fixed::ZERO);
        }
    }

    for id in world.troops.sorted_ids() {
        let Some(troop) = world.troops.get(id) else {
            continue;
        };
        let Some(target) = troop.target.filter(|_| troop.state == UnitState::Engaging) else {
            continue;
        };
        if !melee_ready(troop.last_attack, troop.profile.attack_interval_ms, now) {
            continue;
        }
        let in_reach = world
            .enemies
            .get(target)
            .is_some_and(|e| e.is_alive() && e.position.within(troop.position, troop.profile.range));
        if !in_reach {
            continue;
        }
        let damage = troop.profile.damage;
        let position = troop.position;
        if let Some(troop) = world.troops.get_mut(id) {
            troop.last_attack = Some(now);
        }
        if strike_enemy(world, rules, target, damage, &ImpactPayload::new(id, damage), events) {
            events.effect(EffectKind::Hit, position, Fixed::ZERO);
        }
    }
}

/// Taunted enemies fight back against the unit engaging them.
pub fn enemy_attack_system(world: &mut World, rules: &Rules<'_>, events: &mut TickEvents) {
    let now = world.now;
    for id in world.enemies.sorted_ids() {
        let Some(enemy) = world.enemies.get(id) else {
            continue;
        };
        if enemy.state != EnemyState::InCombat
            || enemy.attack_damage <= Fixed::ZERO
            || enemy.statuses.is_immobilized(now)
            || !melee_ready(enemy.last_attack, enemy.attack_interval_ms, now)
        {
            continue;
        }
        let Some(taunt) = enemy.taunt else {
            continue;
        };
        let weaken = enemy.statuses.fraction(StatusKind::Weaken, now);
        let damage = effective_damage(
            enemy.attack_damage,
            Fixed::ZERO,
            Fixed::ZERO,
            weaken,
            rules.config.min_damage,
        );
        let position = enemy.position;

        let (dealt, lethal) = match taunt {
            TargetRef::Hero(hero_id) => {
                let Some(hero) = world
                    .heroes
                    .get_mut(hero_id)
                    .filter(|h| h.state.is_alive() && h.position.within(position, h.profile.range))
                else {
                    continue;
                };
                let dealt = hero.take_damage(damage, now);
                let lethal = hero.health.is_dead();
                if lethal {
                    hero.state = UnitState::Dead {
                        respawn_at: now + u64::from(hero.respawn_ms),
                    };
                    hero.target = None;
                    hero.engaged_since = None;
                }
                (dealt, lethal)
            }
            TargetRef::Troop(troop_id) => {
                let Some(troop) = world
                    .troops
                    .get_mut(troop_id)
                    .filter(|t| t.state.is_alive() && t.position.within(position, t.profile.range))
                else {
                    continue;
                };
                let dealt = troop.health.apply_damage(damage);
                let lethal = troop.health.is_dead();
                if lethal {
                    troop.state = UnitState::Dead { respawn_at: now };
                    troop.target = None;
                }
                (dealt, lethal)
            }
            TargetRef::Enemy(_) => continue,
        };

        if let Some(enemy) = world.enemies.get_mut(id) {
            enemy.last_attack = Some(now);
        }
        if lethal {
            let kind = match taunt {
                TargetRef::Hero(_) => EntityKind::Hero,
                _ => EntityKind::Troop,
            };
            events.push(GameEvent::EntityDied {
                entity: taunt.id(),
                kind,
            });
        }
        events.damage.push(DamageEvent {
            source: Some(id),
            target: taunt,
            amount: dealt,
            lethal,
        });
    }
}

// ============================================================================
// Hero Abilities
// ============================================================================

/// Fire hero abilities that are off cooldown while the hero is engaging.
pub fn hero_ability_system(world: &mut World, rules: &Rules<'_>, events: &mut TickEvents) {
    let now = world.now;
    for id in world.heroes.sorted_ids() {
        let Some(hero) = world.heroes.get(id) else {
            continue;
        };
        if hero.state != UnitState::Engaging || now < hero.ability_ready_at {
            continue;
        }
        let Some(definition) = rules.tables.hero(&hero.kind) else {
            continue;
        };
        let ability = definition.ability;
        let cooldown = u64::from(definition.ability_cooldown_ms);
        let center = hero.position;

        match ability {
            HeroAbility::Shockwave {
                damage,
                radius,
                stun_ms,
            } => {
                let payload = ImpactPayload {
                    statuses: vec![StatusApplication::new(StatusKind::Stun, Fixed::ONE, stun_ms)],
                    effect: EffectKind::Shockwave,
                    ..ImpactPayload::new(id, damage)
                };
                let victims: Vec<EntityId> = world
                    .enemies
                    .sorted()
                    .filter(|e| e.is_alive() && e.position.within(center, radius))
                    .map(|e| e.id)
                    .collect();
                for victim in victims {
                    strike_enemy(world, rules, victim, damage, &payload, events);
                }
                events.effect(EffectKind::Shockwave, center, radius);
            }
            HeroAbility::Shield {
                amount,
                duration_ms,
            } => {
                if let Some(hero) = world.heroes.get_mut(id) {
                    hero.shield = Some(Shield {
                        amount,
                        until: now + u64::from(duration_ms),
                    });
                }
            }
            HeroAbility::Rally {
                damage_boost,
                range_boost,
                radius,
                duration_ms,
            } => {
                let until = now + u64::from(duration_ms);
                boost_towers(world, rules, center, radius, range_boost, damage_boost, until);
            }
        }

        if let Some(hero) = world.heroes.get_mut(id) {
            hero.ability_ready_at = now + cooldown;
        }
        events.push(GameEvent::AbilityUsed { hero: id });
    }
}

/// Grant range/damage boosts to every tower within `radius` of `center`.
pub fn boost_towers(
    world: &mut World,
    rules: &Rules<'_>,
    center: Vec2Fixed,
    radius: Fixed,
    range_boost: Fixed,
    damage_boost: Fixed,
    until: Millis,
) {
    let now = world.now;
    for id in world.towers.sorted_ids() {
        let Some(tower) = world.towers.get_mut(id) else {
            continue;
        };
        if !tower.position.within(center, radius) {
            continue;
        }
        let mut changed = false;
        if range_boost > Fixed::ZERO {
            changed |= tower.boosts.apply_range(BoostSource::Timed, range_boost, until, now);
        }
        if damage_boost > Fixed::ZERO {
            changed |= tower.boosts.apply_damage(BoostSource::Timed, damage_boost, until, now);
        }
        if changed {
            tower.refresh_stats(rules.tables.tower(tower.kind), now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Enemy, GridPoint};
    use crate::config::SimConfig;
    use crate::data::DataTables;
    use crate::math::pct;
    use crate::path::{Path, PathCursor};

    fn network() -> PathNetwork {
        let path = Path::new(0, vec![GridPoint::new(0, 0), GridPoint::new(12, 0)]).unwrap();
        PathNetwork::new(vec![path])
    }

    fn add_enemy(world: &mut World, tables: &DataTables, kind: &str, x: i32) -> EntityId {
        let id = world.allocate_id();
        let mut enemy = Enemy::from_definition(
            id,
            tables.enemy(kind).unwrap(),
            0,
            Fixed::ONE,
            PathCursor::start(0),
            0,
        );
        enemy.position = Vec2Fixed::new(Fixed::from_num(x) + pct(50), pct(50));
        enemy.cursor.travelled = Fixed::from_num(x);
        enemy.cursor.segment = 0;
        enemy.cursor.t = Fixed::from_num(x) / Fixed::from_num(12);
        world.enemies.insert(id, enemy);
        id
    }

    fn add_tower(world: &mut World, tables: &DataTables, kind: TowerKind, x: i32, y: i32) -> EntityId {
        let id = world.allocate_id();
        let tower = Tower::new(id, tables.tower(kind), GridPoint::new(x, y), 0);
        world.towers.insert(id, tower);
        id
    }

    #[test]
    fn test_effective_damage_formula() {
        let min = Fixed::ONE;
        assert_eq!(
            effective_damage(Fixed::from_num(20), Fixed::ZERO, Fixed::ZERO, Fixed::ZERO, min),
            Fixed::from_num(20)
        );
        assert_eq!(
            effective_damage(Fixed::from_num(20), pct(50), pct(50), pct(50), min),
            pct(750)
        );
        assert_eq!(
            effective_damage(Fixed::from_num(2), pct(90), Fixed::ZERO, Fixed::ZERO, min),
            min
        );
        assert_eq!(
            effective_damage(Fixed::ZERO, Fixed::ZERO, Fixed::ZERO, Fixed::ZERO, min),
            Fixed::ZERO
        );
    }

    #[test]
    fn test_splash_factor_edges() {
        let edge = pct(50);
        assert_eq!(splash_factor(Fixed::ZERO, Fixed::from_num(2), edge), Fixed::ONE);
        assert_eq!(splash_factor(Fixed::ONE, Fixed::from_num(2), edge), pct(75));
        assert_eq!(splash_factor(Fixed::from_num(2), Fixed::from_num(2), edge), edge);
    }

    #[test]
    fn test_select_targets_priority_and_lock() {
        let c = |id, remaining: i32, hp: i32| Candidate {
            id,
            position: Vec2Fixed::ZERO,
            remaining: Fixed::from_num(remaining),
            hp: Fixed::from_num(hp),
        };
        let candidates = [c(3, 5, 10), c(1, 5, 80), c(2, 9, 200)];

        // Tie on remaining distance breaks by id.
        assert_eq!(
            select_targets(&candidates, TargetPriority::First, None, 1),
            vec![1]
        );
        assert_eq!(
            select_targets(&candidates, TargetPriority::Strongest, None, 1),
            vec![2]
        );
        assert_eq!(
            select_targets(&candidates, TargetPriority::First, Some(2), 1),
            vec![2]
        );
        assert_eq!(
            select_targets(&candidates, TargetPriority::First, Some(99), 2),
            vec![1, 3]
        );
        assert_eq!(
            select_targets(&candidates, TargetPriority::First, Some(3), 3),
            vec![3, 1, 2]
        );
    }

    #[test]
    fn test_chain_hops_nearest_unhit() {
        let tables = DataTables::builtin();
        let mut world = World::new(1, 0);
        let a = add_enemy(&mut world, &tables, "frosh", 2);
        let far = add_enemy(&mut world, &tables, "frosh", 9);
        let b = add_enemy(&mut world, &tables, "frosh", 4);
        let c = add_enemy(&mut world, &tables, "frosh", 5);

        let hops: Vec<EntityId> = chain_hops(&world, a, 5, Fixed::from_num(2))
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(hops, vec![a, b, c]);
        assert!(!hops.contains(&far));
    }

    #[test]
    fn test_tesla_chain_falloff() {
        let tables = DataTables::builtin();
        let config = SimConfig::default();
        let paths = network();
        let rules = Rules {
            tables: &tables,
            config: &config,
            paths: &paths,
        };
        let mut world = World::new(1, 0);
        add_tower(&mut world, &tables, TowerKind::Tesla, 3, 1);
        let behind = add_enemy(&mut world, &tables, "frosh", 3);
        let leader = add_enemy(&mut world, &tables, "frosh", 4);

        let mut events = TickEvents::default();
        tower_attack_system(&mut world, &rules, &mut events);

        let base = tables.tower(TowerKind::Tesla).levels[0].damage;
        let hits: Vec<_> = events.damage.iter().map(|d| (d.target, d.amount)).collect();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0], (TargetRef::Enemy(leader), base));
        assert_eq!(hits[1], (TargetRef::Enemy(behind), base * config.chain_falloff));
        assert!(world.projectiles.is_empty());
    }

    #[test]
    fn test_tower_attacks_once_per_interval() {
        let tables = DataTables::builtin();
        let config = SimConfig::default();
        let paths = network();
        let rules = Rules {
            tables: &tables,
            config: &config,
            paths: &paths,
        };
        let mut world = World::new(1, 0);
        let tower = add_tower(&mut world, &tables, TowerKind::Archer, 2, 1);
        add_enemy(&mut world, &tables, "jock", 2);

        let mut events = TickEvents::default();
        tower_attack_system(&mut world, &rules, &mut events);
        assert_eq!(world.projectiles.len(), 1);

        world.now = 100;
        tower_attack_system(&mut world, &rules, &mut events);
        assert_eq!(world.projectiles.len(), 1);
        assert_eq!(world.towers.get(tower).unwrap().last_attack, Some(0));
    }

    #[test]
    fn test_disabled_tower_holds_fire() {
        let tables = DataTables::builtin();
        let config = SimConfig::default();
        let paths = network();
        let rules = Rules {
            tables: &tables,
            config: &config,
            paths: &paths,
        };
        let mut world = World::new(1, 0);
        let tower = add_tower(&mut world, &tables, TowerKind::Tesla, 2, 1);
        add_enemy(&mut world, &tables, "frosh", 2);
        world
            .towers
            .get_mut(tower)
            .unwrap()
            .debuffs
            .apply(StatusApplication::new(StatusKind::Disable, Fixed::ONE, 1000).at(0), 0);

        let mut events = TickEvents::default();
        tower_attack_system(&mut world, &rules, &mut events);
        assert!(events.damage.is_empty());
    }

    #[test]
    fn test_beacon_boosts_neighbours() {
        let tables = DataTables::builtin();
        let config = SimConfig::default();
        let paths = network();
        let rules = Rules {
            tables: &tables,
            config: &config,
            paths: &paths,
        };
        let mut world = World::new(1, 0);
        let archer = add_tower(&mut world, &tables, TowerKind::Archer, 2, 2);
        add_tower(&mut world, &tables, TowerKind::Beacon, 3, 2);

        aura_system(&mut world, &rules);
        let base = tables.tower(TowerKind::Archer).levels[0].clone();
        let boosted = &world.towers.get(archer).unwrap().stats;
        assert!(boosted.range > base.range);
        assert!(boosted.damage > base.damage);

        world.towers.retain(|t| t.kind != TowerKind::Beacon);
        world.now = u64::from(config.aura_refresh_ms);
        aura_system(&mut world, &rules);
        assert_eq!(world.towers.get(archer).unwrap().stats, base);
    }

    #[test]
    fn test_lethal_strike_marks_dead() {
        let tables = DataTables::builtin();
        let config = SimConfig::default();
        let paths = network();
        let rules = Rules {
            tables: &tables,
            config: &config,
            paths: &paths,
        };
        let mut world = World::new(1, 0);
        let enemy = add_enemy(&mut world, &tables, "goose", 1);
        let mut events = TickEvents::default();
        let payload = ImpactPayload::new(0, Fixed::from_num(1000));
        assert!(strike_enemy(&mut world, &rules, enemy, payload.damage, &payload, &mut events));
        assert!(!strike_enemy(&mut world, &rules, enemy, payload.damage, &payload, &mut events));
        assert_eq!(world.enemies.get(enemy).unwrap().state, EnemyState::Dead);
        assert_eq!(events.deaths().count(), 1);
        assert!(events.damage[0].lethal);
    }
}
