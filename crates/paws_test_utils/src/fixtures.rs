//! Test fixtures and helpers.
//!
//! Pre-built levels, tables and simulations for consistent testing.

use fixed::types::I32F32;
use paws_core::data::{DataTables, EnemyDefinition};
use paws_core::prelude::*;

/// Id of the stationary training dummy added by [`tables_with_dummy`].
pub const DUMMY: &str = "dummy";

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// World position at the centre of a tile.
#[must_use]
pub fn tile(x: i32, y: i32) -> Vec2Fixed {
    GridPoint::new(x, y).to_world()
}

/// A 50 hp enemy that never moves, never hits back and pays nothing.
#[must_use]
pub fn dummy_enemy() -> EnemyDefinition {
    EnemyDefinition {
        id: DUMMY.to_string(),
        name: "Training Dummy".to_string(),
        hp: fixed(50),
        speed: Fixed::ZERO,
        armor: Fixed::ZERO,
        bounty: 0,
        leak_damage: 1,
        attack_damage: Fixed::ZERO,
        attack_interval_ms: 1000,
        boss: false,
        aura: None,
    }
}

/// Built-in tables plus [`dummy_enemy`].
#[must_use]
pub fn tables_with_dummy() -> DataTables {
    let mut tables = DataTables::builtin();
    tables.insert_enemy(dummy_enemy());
    tables
}

/// A 20x12 level with one straight path along row 5.
///
/// The hero spawns in the far corner, out of reach of the path start.
#[must_use]
pub fn straight_level(waves: Vec<WaveTemplate>) -> LevelData {
    LevelData {
        id: "straight".to_string(),
        name: "Straight".to_string(),
        grid_width: 20,
        grid_height: 12,
        paths: vec![vec![GridPoint::new(0, 5), GridPoint::new(19, 5)]],
        hero_spawn: GridPoint::new(19, 11),
        hero: None,
        waves: LevelWaves::Custom(waves),
        starting_resources: 1_000,
    }
}

/// A single-wave list spawning `count` frosh.
#[must_use]
pub fn frosh_waves(count: u32, interval_ms: u32) -> Vec<WaveTemplate> {
    vec![WaveTemplate::new(vec![SpawnGroup::new("frosh", count, interval_ms)])]
}

/// Simulation on [`straight_level`] with the dummy enemy available.
///
/// # Panics
///
/// Panics if the fixture level fails to build.
#[must_use]
pub fn straight_sim(seed: u64) -> Simulation {
    straight_sim_with(frosh_waves(5, 800), seed)
}

/// Simulation on [`straight_level`] with custom waves.
///
/// # Panics
///
/// Panics if the fixture level fails to build.
#[must_use]
pub fn straight_sim_with(waves: Vec<WaveTemplate>, seed: u64) -> Simulation {
    Simulation::new(&straight_level(waves), tables_with_dummy(), SimConfig::default(), seed)
        .expect("fixture level is valid")
}

/// Simulation on a built-in level.
///
/// # Panics
///
/// Panics if `level_id` is not a built-in level.
#[must_use]
pub fn builtin_sim(level_id: &str, seed: u64) -> Simulation {
    let registry = LevelRegistry::with_builtin();
    let level = registry.get(level_id).expect("built-in level");
    Simulation::new(level, DataTables::builtin(), SimConfig::default(), seed)
        .expect("built-in level is valid")
}

/// Run whole ticks covering `ms` milliseconds and collect their events.
pub fn run_for(sim: &mut Simulation, ms: u32) -> Vec<TickEvents> {
    (0..ms / TICK_DURATION_MS)
        .map(|_| sim.tick(TICK_DURATION_MS))
        .collect()
}

/// Tick until `done` returns true or `max_ms` elapses. Returns whether
/// `done` was reached.
pub fn run_until(sim: &mut Simulation, max_ms: u32, mut done: impl FnMut(&Simulation) -> bool) -> bool {
    for _ in 0..max_ms / TICK_DURATION_MS {
        if done(sim) {
            return true;
        }
        sim.tick(TICK_DURATION_MS);
    }
    done(sim)
}

/// Park every hero out of play for the rest of the match.
pub fn bench_heroes(sim: &mut Simulation) {
    let world = sim.world_mut();
    for id in world.heroes.sorted_ids() {
        if let Some(hero) = world.heroes.get_mut(id) {
            hero.state = UnitState::Respawning { ready_at: u64::MAX };
            hero.target = None;
        }
    }
}
