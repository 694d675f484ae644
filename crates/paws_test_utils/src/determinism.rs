//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! A match must replay exactly from its seed and command script.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`paws_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   We always iterate in sorted entity ID order.
//!
//! - **System randomness**: Stun rolls and lane jitter draw from the seeded
//!   generator stored in the world.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual system determinism (movement, combat, etc.)
//! 2. **Property tests**: Random command scripts must still replay exactly
//! 3. **Integration tests**: Full wave runs are reproducible
//! 4. **Parallel tests**: Running N simulations on threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use paws_core::simulation::{GameCommand, Simulation, TICK_DURATION_MS};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// A command issued at a given tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedCommand {
    /// Step before which the command is applied. Steps count every call,
    /// including ticks swallowed by a pause.
    pub tick: u64,
    /// The command.
    pub command: GameCommand,
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Apply the script entries due at `step`, then tick.
///
/// Rejected commands are ignored, exactly as a player's would be.
pub fn step_scripted(sim: &mut Simulation, script: &[ScriptedCommand], step: u64) {
    for entry in script.iter().filter(|c| c.tick == step) {
        let _ = sim.apply_command(entry.command.clone());
    }
    sim.tick(TICK_DURATION_MS);
}

/// Run a scripted match twice and compare final hashes.
///
/// # Example
///
/// ```ignore
/// use paws_test_utils::determinism::verify_script_determinism;
/// use paws_test_utils::fixtures::straight_sim;
///
/// let result = verify_script_determinism(|| straight_sim(7), &[], 400);
/// result.assert_deterministic();
/// ```
pub fn verify_script_determinism<F>(
    setup_fn: F,
    script: &[ScriptedCommand],
    num_ticks: u64,
) -> DeterminismResult
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        num_ticks,
        || (setup_fn(), 0u64),
        |(sim, step): &mut (Simulation, u64)| {
            step_scripted(sim, script, *step);
            *step += 1;
        },
        |(sim, _): &(Simulation, u64)| sim.state_hash(),
    )
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows under thread scheduling or
/// memory layout differences.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick(TICK_DURATION_MS);
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, script: &[ScriptedCommand], num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        step_scripted(&mut sim1, script, tick - 1);
        step_scripted(&mut sim2, script, tick - 1);

        if sim1.state_hash() != sim2.state_hash() {
            tracing::debug!(tick, "Simulations diverged");
            return Some(tick);
        }
    }

    None
}

/// Verify that a bincode round trip preserves state and future ticks.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();
    for _ in 0..num_ticks {
        sim.tick(TICK_DURATION_MS);
    }

    let Ok(bytes) = sim.serialize() else {
        return false;
    };
    let Ok(mut restored) = Simulation::deserialize(&bytes) else {
        return false;
    };
    if restored.state_hash() != sim.state_hash() {
        return false;
    }

    for _ in 0..num_ticks {
        sim.tick(TICK_DURATION_MS);
        restored.tick(TICK_DURATION_MS);
    }
    restored.state_hash() == sim.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for simulation inputs.
pub mod strategies {
    use paws_core::components::GridPoint;
    use paws_core::math::{Fixed, Vec2Fixed};
    use paws_core::progression::{TowerKind, UpgradeBranch};
    use paws_core::simulation::GameCommand;
    use paws_core::spells::SpellKind;
    use paws_core::waves::{SpawnGroup, WaveTemplate};
    use proptest::prelude::*;

    use super::ScriptedCommand;

    /// Any tower kind.
    pub fn arb_tower_kind() -> impl Strategy<Value = TowerKind> {
        prop::sample::select(TowerKind::ALL.to_vec())
    }

    /// Any spell kind.
    pub fn arb_spell_kind() -> impl Strategy<Value = SpellKind> {
        prop::sample::select(SpellKind::ALL.to_vec())
    }

    /// Optional upgrade branch.
    pub fn arb_branch() -> impl Strategy<Value = Option<UpgradeBranch>> {
        prop_oneof![
            Just(None),
            Just(Some(UpgradeBranch::A)),
            Just(Some(UpgradeBranch::B)),
        ]
    }

    /// Tile on a 20x12 grid.
    pub fn arb_tile() -> impl Strategy<Value = GridPoint> {
        (0i32..20, 0i32..12).prop_map(|(x, y)| GridPoint::new(x, y))
    }

    /// World point on a 20x12 grid, in hundredths of a tile.
    pub fn arb_point() -> impl Strategy<Value = Vec2Fixed> {
        (0i32..2000, 0i32..1200).prop_map(|(x, y)| {
            Vec2Fixed::new(Fixed::from_num(x) / 100, Fixed::from_num(y) / 100)
        })
    }

    /// A command with entity ids drawn from a small range, so some of them
    /// refer to real entities and some do not.
    pub fn arb_command() -> impl Strategy<Value = GameCommand> {
        prop_oneof![
            (arb_tower_kind(), arb_tile()).prop_map(|(kind, at)| GameCommand::PlaceTower { kind, at }),
            (1u64..12, arb_branch())
                .prop_map(|(tower, branch)| GameCommand::UpgradeTower { tower, branch }),
            (1u64..12).prop_map(|tower| GameCommand::SellTower { tower }),
            arb_point().prop_map(|to| GameCommand::MoveHero { hero: 1, to }),
            Just(GameCommand::RecallHero { hero: 1 }),
            ((1u64..12), arb_point()).prop_map(|(tower, to)| GameCommand::MoveTroops { tower, to }),
            (arb_spell_kind(), arb_point()).prop_map(|(spell, at)| GameCommand::CastSpell { spell, at }),
            Just(GameCommand::StartNextWave),
            Just(GameCommand::Pause),
            Just(GameCommand::Resume),
        ]
    }

    /// Command script over the first `max_tick` ticks.
    pub fn arb_script(max_len: usize, max_tick: u64) -> impl Strategy<Value = Vec<ScriptedCommand>> {
        proptest::collection::vec(
            (0..max_tick, arb_command()).prop_map(|(tick, command)| ScriptedCommand { tick, command }),
            0..max_len,
        )
    }

    /// Spawn group of a common enemy type.
    pub fn arb_group() -> impl Strategy<Value = SpawnGroup> {
        (
            prop::sample::select(vec!["frosh", "goose", "jock"]),
            1u32..12,
            100u32..2_000,
        )
            .prop_map(|(enemy, count, interval)| SpawnGroup::new(enemy, count, interval))
    }

    /// Wave of one to three groups.
    pub fn arb_wave() -> impl Strategy<Value = WaveTemplate> {
        proptest::collection::vec(arb_group(), 1..4).prop_map(WaveTemplate::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{builtin_sim, straight_sim};
    use paws_core::components::GridPoint;
    use paws_core::progression::TowerKind;
    use proptest::prelude::*;

    // =========================================================================
    // Basic determinism tests
    // =========================================================================

    fn defended_script() -> Vec<ScriptedCommand> {
        vec![
            ScriptedCommand {
                tick: 0,
                command: GameCommand::PlaceTower {
                    kind: TowerKind::Archer,
                    at: GridPoint::new(4, 4),
                },
            },
            ScriptedCommand {
                tick: 0,
                command: GameCommand::StartNextWave,
            },
            ScriptedCommand {
                tick: 40,
                command: GameCommand::PlaceTower {
                    kind: TowerKind::Cannon,
                    at: GridPoint::new(9, 6),
                },
            },
        ]
    }

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 10, || 0u64, |n| *n += 1, |n| *n);
        result.assert_deterministic();
        assert_eq!(result.unique_hashes(), vec![10]);
    }

    #[test]
    fn test_scripted_wave_is_deterministic() {
        let result = verify_script_determinism(|| straight_sim(11), &defended_script(), 600);
        result.assert_deterministic();
    }

    #[test]
    fn test_find_divergence_on_deterministic_sim() {
        assert_eq!(
            find_first_divergence(|| straight_sim(5), &defended_script(), 300),
            None
        );
    }

    #[test]
    fn test_parallel_builtin_simulations() {
        let result = run_parallel_simulations(
            || {
                let mut sim = builtin_sim("crossroads", 3);
                let _ = sim.apply_command(GameCommand::StartNextWave);
                sim
            },
            4,
            400,
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_serialization_preserves_running_match() {
        assert!(verify_serialization_determinism(
            || {
                let mut sim = straight_sim(8);
                let _ = sim.apply_command(GameCommand::PlaceTower {
                    kind: TowerKind::Tesla,
                    at: GridPoint::new(6, 4),
                });
                let _ = sim.apply_command(GameCommand::StartNextWave);
                sim
            },
            200,
        ));
    }

    // =========================================================================
    // Property-based tests using proptest
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// Random command scripts replay to the same state.
        #[test]
        fn prop_command_scripts_are_replayable(
            script in strategies::arb_script(20, 200),
            seed in 0u64..1_000,
        ) {
            let result = verify_script_determinism(|| builtin_sim("quad", seed), &script, 300);
            prop_assert!(result.is_deterministic);
        }

        /// Random custom waves replay to the same state.
        #[test]
        fn prop_random_waves_are_deterministic(
            waves in proptest::collection::vec(strategies::arb_wave(), 1..3),
            seed in 0u64..1_000,
        ) {
            let script = vec![ScriptedCommand { tick: 0, command: GameCommand::StartNextWave }];
            let setup = || crate::fixtures::straight_sim_with(waves.clone(), seed);
            let result = verify_script_determinism(setup, &script, 300);
            prop_assert!(result.is_deterministic);
        }
    }
}
