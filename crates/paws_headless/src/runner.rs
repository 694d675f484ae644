//! Headless match runner.
//!
//! Builds a [`Simulation`] from a [`Scenario`], feeds it the scripted
//! commands at their times, starts waves on a timer when asked to, and
//! returns a [`MatchReport`].

use paws_core::config::SimConfig;
use paws_core::events::MatchOutcome;
use paws_core::math::Millis;
use paws_core::simulation::{GameCommand, Simulation, TICK_DURATION_MS};
use paws_core::waves::WavePhase;

use crate::metrics::{MatchReport, MetricsCollector};
use crate::scenario::{Scenario, ScenarioError, TimedCommand};

/// Runner options not stored in the scenario.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Seed override.
    pub seed: Option<u64>,
    /// Tuning override, replacing the scenario's.
    pub config: Option<SimConfig>,
}

/// Drives one scenario to completion.
pub struct HeadlessRunner {
    scenario: Scenario,
    sim: Simulation,
    metrics: MetricsCollector,
    script: Vec<TimedCommand>,
    next_command: usize,
    next_wave_at: Option<Millis>,
}

impl HeadlessRunner {
    /// Prepare a match for `scenario`.
    pub fn new(scenario: Scenario, options: &RunOptions) -> Result<Self, ScenarioError> {
        let tables = scenario.tables()?;
        let level = scenario.level_data(&tables)?;
        let config = options
            .config
            .clone()
            .or_else(|| scenario.config.clone())
            .unwrap_or_default();
        let seed = options.seed.unwrap_or(scenario.seed);

        let sim = Simulation::new(&level, tables, config, seed)?;
        tracing::info!(
            scenario = %scenario.name,
            level = %level.id,
            seed,
            commands = scenario.commands.len(),
            "Match prepared"
        );

        Ok(Self {
            metrics: MetricsCollector::new(scenario.name.clone(), level.id, seed),
            script: scenario.sorted_commands(),
            scenario,
            sim,
            next_command: 0,
            next_wave_at: None,
        })
    }

    /// The simulation being driven.
    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Whether the match ended or ran out of time.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.sim.outcome() != MatchOutcome::InProgress
            || self.sim.now() >= self.scenario.max_duration_ms
    }

    /// Apply due commands and advance one tick.
    pub fn step(&mut self) {
        let now = self.sim.now();
        while let Some(entry) = self.script.get(self.next_command) {
            if entry.at_ms > now {
                break;
            }
            let result = self.sim.apply_command(entry.command.clone());
            self.metrics.record_command(now, &entry.command, &result);
            self.next_command += 1;
        }

        if let Some(gap) = self.scenario.auto_wave_gap_ms {
            self.auto_start_wave(gap);
        }

        let events = self.sim.tick(TICK_DURATION_MS);
        self.metrics.record(&events);
    }

    fn auto_start_wave(&mut self, gap_ms: u32) {
        let status = self.sim.wave_status();
        if status.phase == WavePhase::Spawning || status.next >= status.total {
            self.next_wave_at = None;
            return;
        }
        let now = self.sim.now();
        let due = *self.next_wave_at.get_or_insert(now + u64::from(gap_ms));
        if now >= due {
            let result = self.sim.apply_command(GameCommand::StartNextWave);
            if let Err(err) = result {
                tracing::warn!(error = %err, "Automatic wave start refused");
            }
            self.next_wave_at = None;
        }
    }

    /// Run until the match ends or the time limit passes.
    ///
    /// A script that pauses without resuming stops after as many ticks as
    /// the time limit allows.
    #[must_use]
    pub fn run(mut self) -> MatchReport {
        let max_ticks = self.scenario.max_duration_ms / u64::from(TICK_DURATION_MS) + 1;
        let mut ticks = 0;
        while !self.is_finished() && ticks < max_ticks {
            self.step();
            ticks += 1;
        }

        let report = self.metrics.finish(&self.sim);
        tracing::info!(
            outcome = ?report.outcome,
            ticks = report.ticks,
            base_health = report.base_health,
            waves = report.waves_completed,
            "Match finished"
        );
        report
    }
}

/// Run `scenario` once.
pub fn run_scenario(scenario: Scenario, options: &RunOptions) -> Result<MatchReport, ScenarioError> {
    Ok(HeadlessRunner::new(scenario, options)?.run())
}
