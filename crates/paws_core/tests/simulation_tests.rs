//! Simulation tests that drive whole matches through the public API.
//!
//! These tests exercise combat, waves, stations and the economy end to end
//! on small fixture levels rather than calling systems directly.

use paws_core::prelude::*;
use paws_test_utils::fixtures::{
    bench_heroes, fixed, frosh_waves, run_for, run_until, straight_sim, straight_sim_with, tile,
    DUMMY,
};

/// Cannon tile two rows above the straight path start, in range of it.
const CANNON_TILE: GridPoint = GridPoint::new(1, 3);

fn events_of(ticks: &[TickEvents]) -> impl Iterator<Item = &GameEvent> {
    ticks.iter().flat_map(|t| t.events.iter())
}

fn dummy_range(sim: &mut Simulation) -> (EntityId, EntityId) {
    bench_heroes(sim);
    let cannon = sim.place_tower(TowerKind::Cannon, CANNON_TILE).unwrap();
    let dummy = sim.spawn_enemy(DUMMY, None).unwrap();
    (cannon, dummy)
}

// =============================================================================
// Combat
// =============================================================================

mod combat {
    use super::*;

    #[test]
    fn test_cannon_kills_dummy_in_three_shells() {
        let mut sim = straight_sim(1);
        let (cannon, dummy) = dummy_range(&mut sim);

        run_for(&mut sim, 1000);
        let hp = sim.world().enemies.get(dummy).unwrap().health.current;
        assert_eq!(hp, fixed(30), "one 20-damage shell should have landed");

        run_for(&mut sim, 1000);
        let hp = sim.world().enemies.get(dummy).unwrap().health.current;
        assert_eq!(hp, fixed(10));

        let removed = run_until(&mut sim, 2000, |s| !s.world().enemies.contains(dummy));
        assert!(removed, "third shell should kill the dummy");
        assert_eq!(sim.world().towers.get(cannon).unwrap().target, None);
    }

    #[test]
    fn test_death_event_reported_once() {
        let mut sim = straight_sim(2);
        let (_, dummy) = dummy_range(&mut sim);

        let ticks = run_for(&mut sim, 5000);
        let deaths = ticks
            .iter()
            .flat_map(|t| t.deaths())
            .filter(|(id, _)| *id == dummy)
            .count();
        assert_eq!(deaths, 1);
    }

    #[test]
    fn test_references_cleared_after_kill() {
        let mut sim = straight_sim(3);
        let (_, dummy) = dummy_range(&mut sim);
        run_until(&mut sim, 5000, |s| !s.world().enemies.contains(dummy));

        let world = sim.world();
        assert!(world.towers.sorted().all(|t| t.target != Some(dummy)));
        assert!(world.heroes.sorted().all(|h| h.target != Some(dummy)));
        assert!(world.troops.sorted().all(|t| t.target != Some(dummy)));
        assert!(world.projectiles.sorted().all(|p| p.target != Some(dummy)));
    }

    #[test]
    fn test_out_of_range_enemy_is_ignored() {
        let mut sim = straight_sim(4);
        bench_heroes(&mut sim);
        let cannon = sim
            .place_tower(TowerKind::Cannon, GridPoint::new(15, 2))
            .unwrap();
        let dummy = sim.spawn_enemy(DUMMY, None).unwrap();

        run_for(&mut sim, 3000);
        let enemy = sim.world().enemies.get(dummy).unwrap();
        assert_eq!(enemy.health.current, enemy.health.max);
        assert_eq!(sim.world().towers.get(cannon).unwrap().last_attack, None);
    }
}

// =============================================================================
// Pause
// =============================================================================

mod pause {
    use super::*;

    #[test]
    fn test_pause_resume_cycles_do_not_add_attacks() {
        let mut sim = straight_sim(5);
        let (cannon, dummy) = dummy_range(&mut sim);

        sim.tick(TICK_DURATION_MS);
        let first = sim.world().towers.get(cannon).unwrap().last_attack;
        assert!(first.is_some(), "cannon fires on its first tick");
        let hash = sim.state_hash();

        for _ in 0..10 {
            sim.apply_command(GameCommand::Pause).unwrap();
            run_for(&mut sim, 500);
            sim.apply_command(GameCommand::Resume).unwrap();
        }
        sim.apply_command(GameCommand::Pause).unwrap();
        sim.apply_command(GameCommand::Resume).unwrap();

        assert_eq!(sim.state_hash(), hash);
        assert_eq!(sim.world().towers.get(cannon).unwrap().last_attack, first);
        assert_eq!(
            sim.world().enemies.get(dummy).unwrap().health.current,
            fixed(50)
        );
    }

    #[test]
    fn test_resume_tick_fires_at_most_once() {
        let mut sim = straight_sim(23);
        let (cannon, _) = dummy_range(&mut sim);
        run_for(&mut sim, 2000);
        let fired = sim.world().towers.get(cannon).unwrap().last_attack;

        sim.apply_command(GameCommand::Pause).unwrap();
        run_for(&mut sim, 10_000);
        sim.apply_command(GameCommand::Resume).unwrap();

        let in_flight = sim.world().projectiles.len();
        sim.tick(60_000);
        let launched = sim.world().projectiles.len().saturating_sub(in_flight);
        assert!(launched <= 1);
        assert_ne!(sim.world().towers.get(cannon).unwrap().last_attack, fired);
    }

    #[test]
    fn test_paused_tick_returns_command_events() {
        let mut sim = straight_sim(6);
        sim.apply_command(GameCommand::Pause).unwrap();
        let tower = sim
            .place_tower(TowerKind::Archer, GridPoint::new(4, 3))
            .unwrap();

        let events = sim.tick(TICK_DURATION_MS);
        assert_eq!(sim.tick_count(), 0);
        assert!(events.events.contains(&GameEvent::TowerPlaced {
            tower,
            kind: TowerKind::Archer,
        }));
        assert!(sim.tick(TICK_DURATION_MS).is_empty());
    }
}

// =============================================================================
// Waves
// =============================================================================

mod waves {
    use super::*;

    #[test]
    fn test_group_spawns_on_interval() {
        let mut sim = straight_sim_with(frosh_waves(3, 600), 7);
        bench_heroes(&mut sim);
        sim.start_next_wave().unwrap();

        let mut spawned_at = Vec::new();
        for _ in 0..40 {
            let events = sim.tick(TICK_DURATION_MS);
            let count = events
                .events
                .iter()
                .filter(|e| matches!(e, GameEvent::EnemySpawned { .. }))
                .count();
            spawned_at.extend(std::iter::repeat(sim.now()).take(count));
        }
        assert_eq!(spawned_at, vec![50, 600, 1200]);
    }

    #[test]
    fn test_cannot_start_wave_while_spawning() {
        let mut sim = straight_sim_with(
            vec![
                WaveTemplate::new(vec![SpawnGroup::new(DUMMY, 3, 1000)]),
                WaveTemplate::new(vec![SpawnGroup::new(DUMMY, 1, 1000)]),
            ],
            8,
        );
        assert_eq!(sim.start_next_wave().unwrap(), 0);
        assert!(matches!(
            sim.start_next_wave(),
            Err(GameError::InvalidCommand(_))
        ));

        run_for(&mut sim, 2500);
        assert_eq!(sim.start_next_wave().unwrap(), 1);
        assert!(sim.start_next_wave().is_err());
    }

    #[test]
    fn test_unknown_group_is_dropped_with_event() {
        let mut sim = straight_sim_with(
            vec![WaveTemplate::new(vec![
                SpawnGroup::new("nobody", 2, 500),
                SpawnGroup::new(DUMMY, 1, 500),
            ])],
            9,
        );
        sim.start_next_wave().unwrap();
        let ticks = run_for(&mut sim, 2000);

        assert!(events_of(&ticks).any(|e| matches!(
            e,
            GameEvent::SpawnDropped { group: 0, enemy, .. } if enemy == "nobody"
        )));
        let kinds: Vec<&str> = events_of(&ticks)
            .filter_map(|e| match e {
                GameEvent::EnemySpawned { kind, .. } => Some(kind.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec![DUMMY]);
    }

    #[test]
    fn test_clearing_last_wave_is_victory() {
        let mut sim = straight_sim_with(
            vec![WaveTemplate::new(vec![SpawnGroup::new(DUMMY, 2, 100)])],
            10,
        );
        bench_heroes(&mut sim);
        sim.place_tower(TowerKind::Cannon, CANNON_TILE).unwrap();
        sim.place_tower(TowerKind::Cannon, GridPoint::new(1, 7)).unwrap();
        sim.start_next_wave().unwrap();
        let balance = sim.wallet().balance;

        let ended = run_until(&mut sim, 20_000, |s| s.outcome() != MatchOutcome::InProgress);
        assert!(ended);
        let ticks = run_for(&mut sim, 100);

        assert_eq!(sim.outcome(), MatchOutcome::Victory);
        assert_eq!(
            sim.wallet().balance,
            balance + sim.config().wave_clear_bonus
        );
        assert!(sim.apply_command(GameCommand::StartNextWave).is_err());
        assert!(ticks.iter().all(TickEvents::is_empty), "ended match is frozen");
    }

    #[test]
    fn test_leak_costs_base_health() {
        let mut sim = straight_sim_with(frosh_waves(1, 100), 11);
        bench_heroes(&mut sim);
        let leak = sim.tables().enemy("frosh").unwrap().leak_damage;
        let start = sim.base_health();
        sim.start_next_wave().unwrap();

        let leaked = run_until(&mut sim, 60_000, |s| s.base_health() < start);
        assert!(leaked);
        assert_eq!(sim.base_health(), start - leak);
        assert!(sim.world().enemies.is_empty());
    }
}

// =============================================================================
// Towers and Economy
// =============================================================================

mod towers {
    use super::*;

    #[test]
    fn test_insufficient_funds_leaves_state_unchanged() {
        let mut sim = straight_sim(12);
        let balance = sim.wallet().balance;
        sim.world_mut().wallet.spend(balance - 10).unwrap();
        let hash = sim.state_hash();

        let err = sim
            .apply_command(GameCommand::PlaceTower {
                kind: TowerKind::Cannon,
                at: GridPoint::new(4, 3),
            })
            .unwrap_err();
        assert!(matches!(err, GameError::InsufficientFunds { available: 10, .. }));
        assert_eq!(sim.state_hash(), hash);
        assert!(sim.world().towers.is_empty());
    }

    #[test]
    fn test_spell_boost_lapses_next_to_beacon() {
        let mut sim = straight_sim(21);
        bench_heroes(&mut sim);
        let archer = sim
            .place_tower(TowerKind::Archer, GridPoint::new(4, 2))
            .unwrap();
        let damage = |sim: &Simulation| sim.world().towers.get(archer).unwrap().stats.damage;
        let base = damage(&sim);

        sim.place_tower(TowerKind::Beacon, GridPoint::new(5, 2))
            .unwrap();
        run_for(&mut sim, 200);
        let aura_only = damage(&sim);
        assert!(aura_only > base);

        sim.apply_command(GameCommand::CastSpell {
            spell: SpellKind::Overclock,
            at: tile(4, 2),
        })
        .unwrap();
        run_for(&mut sim, 200);
        assert!(damage(&sim) > aura_only);

        run_for(&mut sim, 30_000);
        assert_eq!(damage(&sim), aura_only);
    }

    #[test]
    fn test_branch_choice_is_permanent() {
        let mut sim = straight_sim(13);
        sim.world_mut().wallet.earn(5_000);
        let tower = sim
            .place_tower(TowerKind::Frost, GridPoint::new(4, 3))
            .unwrap();
        assert!(matches!(
            sim.upgrade_tower(tower, Some(UpgradeBranch::B)),
            Err(GameError::BranchChoice { level: 1, .. })
        ));

        sim.upgrade_tower(tower, None).unwrap();
        sim.upgrade_tower(tower, None).unwrap();
        sim.upgrade_tower(tower, Some(UpgradeBranch::B)).unwrap();

        let hash = sim.state_hash();
        assert!(matches!(
            sim.upgrade_tower(tower, Some(UpgradeBranch::A)),
            Err(GameError::BranchLocked {
                held: UpgradeBranch::B,
                ..
            })
        ));
        assert_eq!(sim.state_hash(), hash);

        let view = sim.snapshot();
        let tower = view.tower(tower).unwrap();
        assert_eq!(tower.level, 4);
        assert_eq!(tower.upgrade, Some(UpgradeBranch::B));
    }

    #[test]
    fn test_sell_refunds_everything_invested() {
        let mut sim = straight_sim(14);
        let start = sim.wallet().balance;
        let tower = sim
            .place_tower(TowerKind::Archer, GridPoint::new(4, 3))
            .unwrap();
        sim.upgrade_tower(tower, None).unwrap();
        let invested = start - sim.wallet().balance;

        let refund = sim.sell_tower(tower).unwrap();
        assert_eq!(refund, invested * sim.config().sell_refund_percent / 100);
        assert_eq!(sim.wallet().balance, start - invested + refund);
    }

    #[test]
    fn test_bank_pays_income() {
        let mut sim = straight_sim(15);
        sim.place_tower(TowerKind::Bank, GridPoint::new(4, 3)).unwrap();
        let ticks = run_for(&mut sim, 30_000);
        let paid: u32 = events_of(&ticks)
            .filter_map(|e| match e {
                GameEvent::IncomeEarned {
                    amount,
                    source: paws_core::events::IncomeSource::Tower(_),
                } => Some(*amount),
                _ => None,
            })
            .sum();
        assert!(paid > 0);
    }
}

// =============================================================================
// Stations
// =============================================================================

mod stations {
    use super::*;

    const STATION_TILE: GridPoint = GridPoint::new(4, 3);

    fn station_sim(seed: u64) -> (Simulation, EntityId) {
        let mut sim = straight_sim(seed);
        bench_heroes(&mut sim);
        let station = sim.place_tower(TowerKind::Station, STATION_TILE).unwrap();
        (sim, station)
    }

    fn troops_of(sim: &Simulation, station: EntityId) -> Vec<&Troop> {
        sim.world()
            .troops
            .sorted()
            .filter(|t| t.owner == station)
            .collect()
    }

    #[test]
    fn test_train_docks_before_troops_spawn() {
        let (mut sim, station) = station_sim(16);
        run_for(&mut sim, 1000);
        let view = sim.snapshot();
        let garrison = view.tower(station).unwrap().station.as_ref().unwrap();
        assert_eq!(garrison.train, TrainPhase::Arriving);
        assert!(!garrison.may_spawn);
        assert!(troops_of(&sim, station).is_empty());

        run_for(&mut sim, 1500);
        assert_eq!(troops_of(&sim, station).len(), MAX_STATION_TROOPS);
    }

    #[test]
    fn test_troop_rally_clamped_to_radius() {
        let (mut sim, station) = station_sim(17);
        run_for(&mut sim, 3000);
        sim.apply_command(GameCommand::MoveTroops {
            tower: station,
            to: tile(18, 0),
        })
        .unwrap();
        run_for(&mut sim, 5000);

        let troops = troops_of(&sim, station);
        assert!(!troops.is_empty());
        for troop in troops {
            let slack = troop.move_radius + fixed(1) / 100;
            assert!(troop.rally_point.distance(troop.spawn_point) <= slack);
            assert!(troop.position.distance(troop.spawn_point) <= slack);
        }
    }

    #[test]
    fn test_move_troops_needs_a_station() {
        let mut sim = straight_sim(18);
        let archer = sim
            .place_tower(TowerKind::Archer, GridPoint::new(4, 3))
            .unwrap();
        assert!(matches!(
            sim.apply_command(GameCommand::MoveTroops {
                tower: archer,
                to: tile(4, 4),
            }),
            Err(GameError::InvalidCommand(_))
        ));
    }

    #[test]
    fn test_garrison_never_exceeds_three() {
        let mut sim = straight_sim_with(
            vec![WaveTemplate::new(vec![SpawnGroup::new("jock", 6, 1500)])],
            19,
        );
        bench_heroes(&mut sim);
        let station = sim
            .place_tower(TowerKind::Station, GridPoint::new(3, 4))
            .unwrap();
        sim.start_next_wave().unwrap();

        for _ in 0..1200 {
            sim.tick(TICK_DURATION_MS);
            let tower = sim.world().towers.get(station).unwrap();
            let garrison = tower.station.as_ref().unwrap();
            assert!(garrison.occupied() <= MAX_STATION_TROOPS);
            assert!(troops_of(&sim, station).len() <= MAX_STATION_TROOPS);
        }
    }

    #[test]
    fn test_selling_station_removes_troops() {
        let (mut sim, station) = station_sim(20);
        run_for(&mut sim, 3000);
        assert!(!troops_of(&sim, station).is_empty());

        sim.sell_tower(station).unwrap();
        assert!(sim.world().troops.is_empty());
        assert!(sim.snapshot().troops.is_empty());
    }
}

// =============================================================================
// Heroes
// =============================================================================

mod heroes {
    use super::*;

    #[test]
    fn test_move_hero_walks_to_new_home() {
        let mut sim = straight_sim(21);
        let hero = sim.world().heroes.sorted_ids()[0];
        let destination = tile(15, 9);
        sim.apply_command(GameCommand::MoveHero {
            hero,
            to: destination,
        })
        .unwrap();

        let arrived = run_until(&mut sim, 10_000, |s| {
            s.world().heroes.get(hero).unwrap().state == UnitState::AtHome
        });
        assert!(arrived);
        let hero = sim.world().heroes.get(hero).unwrap();
        assert!(hero.position.distance(destination) < fixed(1) / 10);
        assert_eq!(hero.home, destination);
    }

    #[test]
    fn test_benched_hero_rejects_orders() {
        let mut sim = straight_sim(22);
        bench_heroes(&mut sim);
        let hero = sim.world().heroes.sorted_ids()[0];
        assert!(matches!(
            sim.apply_command(GameCommand::RecallHero { hero }),
            Err(GameError::InvalidCommand(_))
        ));
        assert!(matches!(
            sim.apply_command(GameCommand::RecallHero { hero: 999 }),
            Err(GameError::EntityNotFound(999))
        ));
    }
}
