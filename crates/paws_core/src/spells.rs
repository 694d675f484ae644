//! Player-cast area spells.
//!
//! Each spell has a Paw Points cost and a cooldown in simulation time.
//! Casting checks both before touching any state.

use serde::{Deserialize, Serialize};

use crate::combat::{boost_towers, strike_enemy, ImpactPayload};
use crate::components::EntityId;
use crate::error::{GameError, Result};
use crate::events::{EffectKind, GameEvent, TickEvents};
use crate::math::{Fixed, Millis, Vec2Fixed};
use crate::status::{StatusApplication, StatusKind};
use crate::world::{Rules, World};

/// Spell kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpellKind {
    /// Area damage plus burn.
    Meteor,
    /// Freeze enemies in radius.
    Blizzard,
    /// Damage boost for towers in radius.
    Overclock,
    /// Range boost for towers in radius.
    Spotlight,
}

impl SpellKind {
    /// Every spell kind in declaration order.
    pub const ALL: [SpellKind; 4] = [
        SpellKind::Meteor,
        SpellKind::Blizzard,
        SpellKind::Overclock,
        SpellKind::Spotlight,
    ];
}

/// Per-spell cooldown tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellBook {
    ready_at: [Millis; 4],
}

impl SpellBook {
    /// All spells ready.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Time at which `kind` may be cast again.
    #[must_use]
    pub const fn ready_at(&self, kind: SpellKind) -> Millis {
        self.ready_at[kind as usize]
    }

    /// Milliseconds of cooldown left at `now`.
    #[must_use]
    pub const fn remaining(&self, kind: SpellKind, now: Millis) -> Millis {
        self.ready_at(kind).saturating_sub(now)
    }

    /// Cast `kind` centred on `at`.
    ///
    /// Fails with [`GameError::OnCooldown`] or
    /// [`GameError::InsufficientFunds`] without changing any state.
    pub fn cast(
        &mut self,
        kind: SpellKind,
        at: Vec2Fixed,
        world: &mut World,
        rules: &Rules<'_>,
        events: &mut TickEvents,
    ) -> Result<()> {
        let now = world.now;
        let definition = rules.tables.spell(kind);
        let remaining = self.remaining(kind, now);
        if remaining > 0 {
            return Err(GameError::OnCooldown {
                name: definition.name.clone(),
                remaining_ms: remaining,
            });
        }
        world.wallet.spend(definition.cost)?;
        self.ready_at[kind as usize] = now + u64::from(definition.cooldown_ms);

        let radius = definition.radius;
        let until = now + u64::from(definition.duration_ms);
        match kind {
            SpellKind::Meteor => {
                let payload = ImpactPayload {
                    source: None,
                    damage: definition.damage,
                    splash: None,
                    statuses: vec![StatusApplication::new(
                        StatusKind::Burn,
                        definition.intensity,
                        definition.duration_ms,
                    )],
                    stun: None,
                    effect: EffectKind::Spell(kind),
                };
                for id in enemies_in(world, at, radius) {
                    strike_enemy(world, rules, id, definition.damage, &payload, events);
                }
            }
            SpellKind::Blizzard => {
                let freeze = StatusApplication::new(
                    StatusKind::Freeze,
                    definition.intensity,
                    definition.duration_ms,
                );
                for id in enemies_in(world, at, radius) {
                    if let Some(enemy) = world.enemies.get_mut(id) {
                        enemy.statuses.apply(freeze.at(now), now);
                    }
                }
            }
            SpellKind::Overclock => {
                boost_towers(
                    world,
                    rules,
                    at,
                    radius,
                    Fixed::ZERO,
                    definition.intensity,
                    until,
                );
            }
            SpellKind::Spotlight => {
                boost_towers(
                    world,
                    rules,
                    at,
                    radius,
                    definition.intensity,
                    Fixed::ZERO,
                    until,
                );
            }
        }

        events.effect(EffectKind::Spell(kind), at, radius);
        events.push(GameEvent::SpellCast { spell: kind, at });
        tracing::debug!(spell = ?kind, now, "Spell cast");
        Ok(())
    }
}

fn enemies_in(world: &World, center: Vec2Fixed, radius: Fixed) -> Vec<EntityId> {
    world
        .enemies
        .sorted()
        .filter(|e| e.is_alive() && e.position.within(center, radius))
        .map(|e| e.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Enemy, GridPoint, Tower};
    use crate::config::SimConfig;
    use crate::data::DataTables;
    use crate::path::{Path, PathCursor, PathNetwork};
    use crate::progression::TowerKind;

    fn setup() -> (DataTables, SimConfig, PathNetwork) {
        let path = Path::new(0, vec![GridPoint::new(0, 0), GridPoint::new(8, 0)]).unwrap();
        (
            DataTables::builtin(),
            SimConfig::default(),
            PathNetwork::new(vec![path]),
        )
    }

    #[test]
    fn test_cooldown_and_funds_checked_first() {
        let (tables, config, paths) = setup();
        let rules = Rules {
            tables: &tables,
            config: &config,
            paths: &paths,
        };
        let mut world = World::new(1, 1000);
        let mut book = SpellBook::new();
        let mut events = TickEvents::default();
        let at = Vec2Fixed::from_ints(2, 1);

        book.cast(SpellKind::Blizzard, at, &mut world, &rules, &mut events)
            .unwrap();
        let balance = world.wallet.balance;
        let err = book
            .cast(SpellKind::Blizzard, at, &mut world, &rules, &mut events)
            .unwrap_err();
        assert!(matches!(err, GameError::OnCooldown { .. }));
        assert_eq!(world.wallet.balance, balance);

        let mut poor = World::new(1, 5);
        let mut fresh = SpellBook::new();
        let err = fresh
            .cast(SpellKind::Meteor, at, &mut poor, &rules, &mut events)
            .unwrap_err();
        assert!(matches!(err, GameError::InsufficientFunds { .. }));
        assert_eq!(fresh.remaining(SpellKind::Meteor, 0), 0);
    }

    #[test]
    fn test_blizzard_freezes_enemies_in_radius() {
        let (tables, config, paths) = setup();
        let rules = Rules {
            tables: &tables,
            config: &config,
            paths: &paths,
        };
        let mut world = World::new(1, 1000);
        let id = world.allocate_id();
        let mut enemy = Enemy::from_definition(
            id,
            tables.enemy("frosh").unwrap(),
            0,
            Fixed::ONE,
            PathCursor::start(0),
            0,
        );
        enemy.position = Vec2Fixed::from_ints(2, 1);
        world.enemies.insert(id, enemy);

        let mut book = SpellBook::new();
        let mut events = TickEvents::default();
        book.cast(SpellKind::Blizzard, Vec2Fixed::from_ints(2, 1), &mut world, &rules, &mut events)
            .unwrap();
        assert!(world.enemies.get(id).unwrap().statuses.is_immobilized(0));
        assert!(events
            .events
            .contains(&GameEvent::SpellCast {
                spell: SpellKind::Blizzard,
                at: Vec2Fixed::from_ints(2, 1)
            }));
    }

    #[test]
    fn test_overclock_boosts_tower_damage() {
        let (tables, config, paths) = setup();
        let rules = Rules {
            tables: &tables,
            config: &config,
            paths: &paths,
        };
        let mut world = World::new(1, 1000);
        let id = world.allocate_id();
        world.towers.insert(
            id,
            Tower::new(id, tables.tower(TowerKind::Cannon), GridPoint::new(3, 3), 0),
        );
        let base = world.towers.get(id).unwrap().stats.damage;

        let mut book = SpellBook::new();
        let mut events = TickEvents::default();
        book.cast(SpellKind::Overclock, GridPoint::new(3, 3).to_world(), &mut world, &rules, &mut events)
            .unwrap();
        assert!(world.towers.get(id).unwrap().stats.damage > base);
    }
}
