//! Match metrics collection for balance analysis.
//!
//! [`MetricsCollector`] folds every tick's events into a [`MatchReport`];
//! [`BatchSummary`] aggregates reports across seeds.

use serde::{Deserialize, Serialize};

use paws_core::components::{EntityKind, TargetRef};
use paws_core::error::Result;
use paws_core::events::{GameEvent, IncomeSource, MatchOutcome, TickEvents};
use paws_core::math::Millis;
use paws_core::simulation::{GameCommand, Simulation};

/// A scripted command the simulation refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedCommand {
    /// Simulation time the command was applied at.
    pub at_ms: Millis,
    /// The command, in debug form.
    pub command: String,
    /// Why it was refused.
    pub error: String,
}

/// Paw Points credited, by source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeBreakdown {
    /// Kill bounties.
    pub bounty: u64,
    /// Income towers.
    pub towers: u64,
    /// Wave-clear bonuses.
    pub wave_clear: u64,
}

/// Complete metrics for a single match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Scenario name.
    pub scenario: String,
    /// Level id.
    pub level: String,
    /// Seed used.
    pub seed: u64,
    /// How the match ended; `InProgress` if it hit the time limit.
    pub outcome: MatchOutcome,
    /// Ticks advanced.
    pub ticks: u64,
    /// Simulation time at the end.
    pub duration_ms: Millis,
    /// Base health left.
    pub base_health: u32,
    /// Waves cleared.
    pub waves_completed: u32,
    /// Waves in the level.
    pub total_waves: u32,
    /// Enemies that entered the field.
    pub enemies_spawned: u32,
    /// Enemies killed.
    pub enemies_killed: u32,
    /// Enemies that reached the goal.
    pub enemies_leaked: u32,
    /// Spawn groups dropped for unknown enemy types.
    pub spawns_dropped: u32,
    /// Towers built.
    pub towers_placed: u32,
    /// Tower upgrades bought.
    pub towers_upgraded: u32,
    /// Towers sold.
    pub towers_sold: u32,
    /// Troops that disembarked.
    pub troops_spawned: u32,
    /// Hero and troop deaths.
    pub defender_deaths: u32,
    /// Spells cast.
    pub spells_cast: u32,
    /// Damage dealt to enemies.
    pub damage_to_enemies: f64,
    /// Damage taken by heroes and troops.
    pub damage_to_defenders: f64,
    /// Paw Points credited by source.
    pub income: IncomeBreakdown,
    /// Paw Points spent.
    pub spent: u64,
    /// Balance at the end.
    pub final_balance: u32,
    /// Script entries applied successfully.
    pub commands_applied: u32,
    /// Script entries refused.
    pub rejected: Vec<RejectedCommand>,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl MatchReport {
    /// Whether the defenders won.
    #[must_use]
    pub fn is_victory(&self) -> bool {
        self.outcome == MatchOutcome::Victory
    }
}

/// Accumulates events while a match runs.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    report: MatchReport,
}

impl MetricsCollector {
    /// Empty report for a match.
    #[must_use]
    pub fn new(scenario: impl Into<String>, level: impl Into<String>, seed: u64) -> Self {
        Self {
            report: MatchReport {
                scenario: scenario.into(),
                level: level.into(),
                seed,
                outcome: MatchOutcome::InProgress,
                ticks: 0,
                duration_ms: 0,
                base_health: 0,
                waves_completed: 0,
                total_waves: 0,
                enemies_spawned: 0,
                enemies_killed: 0,
                enemies_leaked: 0,
                spawns_dropped: 0,
                towers_placed: 0,
                towers_upgraded: 0,
                towers_sold: 0,
                troops_spawned: 0,
                defender_deaths: 0,
                spells_cast: 0,
                damage_to_enemies: 0.0,
                damage_to_defenders: 0.0,
                income: IncomeBreakdown::default(),
                spent: 0,
                final_balance: 0,
                commands_applied: 0,
                rejected: Vec::new(),
                final_state_hash: 0,
            },
        }
    }

    /// Fold one tick's events into the report.
    pub fn record(&mut self, events: &TickEvents) {
        let report = &mut self.report;
        for event in &events.events {
            match event {
                GameEvent::EnemySpawned { .. } => report.enemies_spawned += 1,
                GameEvent::EnemyReachedGoal { .. } => report.enemies_leaked += 1,
                GameEvent::EntityDied {
                    kind: EntityKind::Enemy,
                    ..
                } => report.enemies_killed += 1,
                GameEvent::EntityDied {
                    kind: EntityKind::Hero | EntityKind::Troop,
                    ..
                } => report.defender_deaths += 1,
                GameEvent::IncomeEarned { amount, source } => {
                    let amount = u64::from(*amount);
                    match source {
                        IncomeSource::Bounty(_) => report.income.bounty += amount,
                        IncomeSource::Tower(_) => report.income.towers += amount,
                        IncomeSource::WaveClear(_) => report.income.wave_clear += amount,
                    }
                }
                GameEvent::WaveComplete { .. } => report.waves_completed += 1,
                GameEvent::SpawnDropped { .. } => report.spawns_dropped += 1,
                GameEvent::TowerPlaced { .. } => report.towers_placed += 1,
                GameEvent::TowerUpgraded { .. } => report.towers_upgraded += 1,
                GameEvent::TowerDestroyed { .. } => report.towers_sold += 1,
                GameEvent::TroopSpawned { .. } => report.troops_spawned += 1,
                GameEvent::SpellCast { .. } => report.spells_cast += 1,
                _ => {}
            }
        }
        for hit in &events.damage {
            let amount: f64 = hit.amount.to_num();
            match hit.target {
                TargetRef::Enemy(_) => report.damage_to_enemies += amount,
                _ => report.damage_to_defenders += amount,
            }
        }
    }

    /// Note a scripted command's result.
    pub fn record_command(&mut self, at_ms: Millis, command: &GameCommand, result: &Result<()>) {
        match result {
            Ok(()) => self.report.commands_applied += 1,
            Err(err) => self.report.rejected.push(RejectedCommand {
                at_ms,
                command: format!("{command:?}"),
                error: err.to_string(),
            }),
        }
    }

    /// Complete the report from the final simulation state.
    #[must_use]
    pub fn finish(mut self, sim: &Simulation) -> MatchReport {
        let report = &mut self.report;
        report.outcome = sim.outcome();
        report.ticks = sim.tick_count();
        report.duration_ms = sim.now();
        report.base_health = sim.base_health();
        report.total_waves = sim.wave_status().total;
        report.spent = sim.wallet().spent;
        report.final_balance = sim.wallet().balance;
        report.final_state_hash = sim.state_hash();
        self.report
    }
}

/// Aggregate over many matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Matches run.
    pub total_games: u32,
    /// Matches won.
    pub victories: u32,
    /// Matches lost.
    pub defeats: u32,
    /// Matches stopped by the time limit.
    pub unfinished: u32,
    /// Fraction of matches won.
    pub win_rate: f64,
    /// Mean match length.
    pub mean_duration_ms: f64,
    /// Mean base health left.
    pub mean_base_health: f64,
    /// Mean leaks per match.
    pub mean_leaks: f64,
    /// Mean waves cleared.
    pub mean_waves_completed: f64,
}

impl BatchSummary {
    /// Summarise reports.
    #[must_use]
    pub fn from_games(games: &[MatchReport]) -> Self {
        if games.is_empty() {
            return Self::default();
        }
        let n = games.len() as f64;
        let mean = |f: fn(&MatchReport) -> f64| games.iter().map(f).sum::<f64>() / n;
        let count = |outcome: MatchOutcome| games.iter().filter(|g| g.outcome == outcome).count() as u32;

        let victories = count(MatchOutcome::Victory);
        Self {
            total_games: games.len() as u32,
            victories,
            defeats: count(MatchOutcome::Defeat),
            unfinished: count(MatchOutcome::InProgress),
            win_rate: f64::from(victories) / n,
            mean_duration_ms: mean(|g| g.duration_ms as f64),
            mean_base_health: mean(|g| f64::from(g.base_health)),
            mean_leaks: mean(|g| f64::from(g.enemies_leaked)),
            mean_waves_completed: mean(|g| f64::from(g.waves_completed)),
        }
    }
}
