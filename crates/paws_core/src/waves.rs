//! Wave director.
//!
//! Expands wave templates into a time-ordered spawn queue and releases
//! enemy-creation requests as simulation time passes. The director also
//! counts wave-owned enemies so it can tell when a wave is fully cleared.
//!
//! Phases: `Idle → Spawning → Draining → Complete`. A wave drains once its
//! queue is empty and completes once none of its enemies remain alive.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::components::PathId;
use crate::data::DataTables;
use crate::error::{GameError, Result};
use crate::math::{Fixed, Millis};

/// One group of identical enemies within a wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnGroup {
    /// Enemy type id.
    pub enemy: String,
    /// Number of enemies.
    pub count: u32,
    /// Milliseconds between consecutive spawns.
    pub interval_ms: u32,
    /// Pause before the group starts. Defaults to 0 for the first group and
    /// to the group's own interval afterwards.
    #[serde(default)]
    pub delay_ms: Option<u32>,
    /// Pin the group to one path instead of round-robin assignment.
    #[serde(default)]
    pub path: Option<PathId>,
}

impl SpawnGroup {
    /// Group with default delay and no pinned path.
    #[must_use]
    pub fn new(enemy: impl Into<String>, count: u32, interval_ms: u32) -> Self {
        Self {
            enemy: enemy.into(),
            count,
            interval_ms,
            delay_ms: None,
            path: None,
        }
    }

    /// Builder: explicit delay.
    #[must_use]
    pub fn with_delay(mut self, delay_ms: u32) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    /// Builder: pinned path.
    #[must_use]
    pub fn on_path(mut self, path: PathId) -> Self {
        self.path = Some(path);
        self
    }
}

/// A wave: ordered spawn groups plus modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveTemplate {
    /// Groups in spawn order.
    pub groups: Vec<SpawnGroup>,
    /// Explicit boss flag.
    #[serde(default)]
    pub boss: bool,
    /// Multiplier on enemy hit points.
    #[serde(default = "default_hp_multiplier")]
    pub hp_multiplier: Fixed,
}

fn default_hp_multiplier() -> Fixed {
    Fixed::ONE
}

impl WaveTemplate {
    /// Wave with default modifiers.
    #[must_use]
    pub fn new(groups: Vec<SpawnGroup>) -> Self {
        Self {
            groups,
            boss: false,
            hp_multiplier: default_hp_multiplier(),
        }
    }

    /// Total enemies the template would spawn.
    #[must_use]
    pub fn enemy_count(&self) -> u32 {
        self.groups.iter().map(|g| g.count).sum()
    }
}

/// A queued enemy-creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Wave index (0-based).
    pub wave: u32,
    /// Group index within the wave.
    pub group: usize,
    /// Enemy type id.
    pub enemy: String,
    /// Absolute simulation time at which the enemy appears.
    pub fire_at: Millis,
    /// Pinned path.
    pub path: Option<PathId>,
    /// Hit point multiplier of the wave.
    pub hp_multiplier: Fixed,
}

/// A group dropped because its enemy type is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnWarning {
    /// Wave index.
    pub wave: u32,
    /// Group index.
    pub group: usize,
    /// The unknown enemy type.
    pub enemy: String,
}

/// Phase of the director.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WavePhase {
    /// No wave started yet.
    Idle,
    /// The current wave still has queued spawns.
    Spawning,
    /// Spawning finished; enemies of a started wave are still alive.
    Draining,
    /// Every started wave has been cleared.
    Complete,
}

/// Expand a template into absolute-time spawn requests.
///
/// The first group starts at `start + delay` (delay defaults to 0); each later
/// group starts at the previous group's last fire time plus its delay
/// (defaulting to its own interval). Groups naming unknown enemy types are
/// dropped but still occupy their slot in the timeline.
#[must_use]
pub fn expand_template(
    template: &WaveTemplate,
    wave: u32,
    start: Millis,
    tables: &DataTables,
) -> (Vec<SpawnRequest>, Vec<SpawnWarning>) {
    let mut requests = Vec::new();
    let mut warnings = Vec::new();
    let mut last_fire: Option<Millis> = None;

    for (index, group) in template.groups.iter().enumerate() {
        let group_start = match last_fire {
            None => start + u64::from(group.delay_ms.unwrap_or(0)),
            Some(last) => last + u64::from(group.delay_ms.unwrap_or(group.interval_ms)),
        };
        let interval = u64::from(group.interval_ms);

        if group.count > 0 {
            last_fire = Some(group_start + interval * u64::from(group.count - 1));
        }

        if tables.enemy(&group.enemy).is_none() {
            warnings.push(SpawnWarning {
                wave,
                group: index,
                enemy: group.enemy.clone(),
            });
            continue;
        }

        requests.extend((0..u64::from(group.count)).map(|i| SpawnRequest {
            wave,
            group: index,
            enemy: group.enemy.clone(),
            fire_at: group_start + interval * i,
            path: group.path,
            hp_multiplier: template.hp_multiplier,
        }));
    }

    // Stable: equal fire times keep group order.
    requests.sort_by_key(|r| r.fire_at);
    (requests, warnings)
}

/// Schedules and tracks waves for one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveDirector {
    waves: Vec<WaveTemplate>,
    boss_every: u32,
    next_wave: u32,
    spawning: Option<u32>,
    queue: VecDeque<SpawnRequest>,
    alive: BTreeMap<u32, u32>,
    draining: BTreeSet<u32>,
    completed: BTreeSet<u32>,
    warnings: Vec<SpawnWarning>,
}

impl WaveDirector {
    /// Director for a level's wave list.
    ///
    /// `boss_every` marks every Nth wave (1-based) as a boss wave; 0 disables
    /// the cadence rule.
    #[must_use]
    pub fn new(waves: Vec<WaveTemplate>, boss_every: u32) -> Self {
        Self {
            waves,
            boss_every,
            next_wave: 0,
            spawning: None,
            queue: VecDeque::new(),
            alive: BTreeMap::new(),
            draining: BTreeSet::new(),
            completed: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> WavePhase {
        if self.spawning.is_some() {
            WavePhase::Spawning
        } else if !self.draining.is_empty() {
            WavePhase::Draining
        } else if self.next_wave > 0 {
            WavePhase::Complete
        } else {
            WavePhase::Idle
        }
    }

    /// Number of waves in the level.
    #[must_use]
    pub fn wave_count(&self) -> u32 {
        self.waves.len() as u32
    }

    /// Index of the most recently started wave.
    #[must_use]
    pub fn current_wave(&self) -> Option<u32> {
        self.next_wave.checked_sub(1)
    }

    /// Index the next `start_wave` call would start.
    #[must_use]
    pub const fn next_wave(&self) -> u32 {
        self.next_wave
    }

    /// Whether every wave has been started.
    #[must_use]
    pub fn all_started(&self) -> bool {
        self.next_wave as usize >= self.waves.len()
    }

    /// Whether every wave has been started and cleared.
    #[must_use]
    pub fn all_complete(&self) -> bool {
        self.all_started() && self.completed.len() == self.waves.len()
    }

    /// Template of a wave.
    #[must_use]
    pub fn template(&self, wave: u32) -> Option<&WaveTemplate> {
        self.waves.get(wave as usize)
    }

    /// Whether a wave is a boss wave.
    ///
    /// True when the template says so, when any group spawns a boss type, or
    /// when the 1-based wave number is a multiple of the boss cadence.
    #[must_use]
    pub fn is_boss_wave(&self, wave: u32, tables: &DataTables) -> bool {
        let Some(template) = self.template(wave) else {
            return false;
        };
        template.boss
            || template
                .groups
                .iter()
                .any(|g| tables.enemy(&g.enemy).is_some_and(|e| e.boss))
            || (self.boss_every > 0 && (wave + 1) % self.boss_every == 0)
    }

    /// Start the next wave at `now`.
    ///
    /// Fails while the current wave is still spawning or when no waves remain.
    pub fn start_wave(&mut self, now: Millis, tables: &DataTables) -> Result<u32> {
        if let Some(wave) = self.spawning {
            return Err(GameError::InvalidCommand(format!(
                "wave {} is still spawning",
                wave + 1
            )));
        }
        let wave = self.next_wave;
        let template = self
            .waves
            .get(wave as usize)
            .ok_or_else(|| GameError::InvalidCommand("no waves remaining".to_string()))?;

        let (requests, warnings) = expand_template(template, wave, now, tables);
        for warning in &warnings {
            tracing::warn!(
                wave = warning.wave + 1,
                group = warning.group,
                enemy = %warning.enemy,
                "Dropping spawn group with unknown enemy type"
            );
        }
        self.warnings.extend(warnings);

        self.queue.extend(requests);
        self.alive.entry(wave).or_insert(0);
        self.next_wave += 1;
        self.spawning = Some(wave);
        if self.queue.is_empty() {
            self.finish_spawning();
        }
        Ok(wave)
    }

    fn finish_spawning(&mut self) {
        if let Some(wave) = self.spawning.take() {
            self.draining.insert(wave);
        }
    }

    /// Dequeue every request whose fire time has elapsed.
    pub fn poll(&mut self, now: Millis) -> Vec<SpawnRequest> {
        let mut due = Vec::new();
        while self.queue.front().is_some_and(|r| r.fire_at <= now) {
            if let Some(request) = self.queue.pop_front() {
                due.push(request);
            }
        }
        if self.queue.is_empty() {
            self.finish_spawning();
        }
        due
    }

    /// Record that an enemy of `wave` entered the field.
    pub fn on_spawned(&mut self, wave: u32) {
        *self.alive.entry(wave).or_insert(0) += 1;
    }

    /// Record that an enemy of `wave` left the field (died or leaked).
    pub fn on_removed(&mut self, wave: u32) {
        if let Some(count) = self.alive.get_mut(&wave) {
            *count = count.saturating_sub(1);
        }
    }

    /// Enemies of a wave still on the field.
    #[must_use]
    pub fn alive_in_wave(&self, wave: u32) -> u32 {
        self.alive.get(&wave).copied().unwrap_or(0)
    }

    /// Whether no spawns are queued.
    #[must_use]
    pub fn is_spawning_complete(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether a wave finished spawning and has no enemies left.
    #[must_use]
    pub fn is_wave_complete(&self, wave: u32) -> bool {
        self.completed.contains(&wave)
    }

    /// Move drained waves with no living enemies to complete.
    ///
    /// Returns the waves that completed during this call, ascending.
    pub fn collect_completed(&mut self) -> Vec<u32> {
        let done: Vec<u32> = self
            .draining
            .iter()
            .copied()
            .filter(|w| self.alive_in_wave(*w) == 0)
            .collect();
        for wave in &done {
            self.draining.remove(wave);
            self.completed.insert(*wave);
        }
        done
    }

    /// Requests still waiting to fire.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Fire time of the next queued request.
    #[must_use]
    pub fn next_fire_at(&self) -> Option<Millis> {
        self.queue.front().map(|r| r.fire_at)
    }

    /// Warnings recorded so far.
    #[must_use]
    pub fn warnings(&self) -> &[SpawnWarning] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frosh_wave() -> WaveTemplate {
        WaveTemplate::new(vec![SpawnGroup::new("frosh", 10, 600)])
    }

    #[test]
    fn test_frosh_group_fire_times() {
        let tables = DataTables::builtin();
        let (requests, warnings) = expand_template(&frosh_wave(), 0, 0, &tables);
        assert!(warnings.is_empty());
        let times: Vec<Millis> = requests.iter().map(|r| r.fire_at).collect();
        assert_eq!(times, (0..10).map(|i| i * 600).collect::<Vec<_>>());
    }

    #[test]
    fn test_poll_releases_exactly_count() {
        let tables = DataTables::builtin();
        let mut director = WaveDirector::new(vec![frosh_wave()], 0);
        director.start_wave(0, &tables).unwrap();
        assert_eq!(director.phase(), WavePhase::Spawning);

        let mut released = Vec::new();
        for now in (0..=10_000).step_by(50) {
            for request in director.poll(now) {
                assert!(request.fire_at <= now);
                released.push(request.fire_at);
            }
        }
        assert_eq!(released.len(), 10);
        assert_eq!(*released.last().unwrap(), 5400);
        assert!(director.is_spawning_complete());
        assert_eq!(director.phase(), WavePhase::Draining);
    }

    #[test]
    fn test_later_group_waits_for_previous() {
        let tables = DataTables::builtin();
        let template = WaveTemplate::new(vec![
            SpawnGroup::new("frosh", 3, 500),
            SpawnGroup::new("goose", 2, 300),
            SpawnGroup::new("jock", 1, 1000).with_delay(2000),
        ]);
        let (requests, _) = expand_template(&template, 0, 1000, &tables);
        let times: Vec<Millis> = requests.iter().map(|r| r.fire_at).collect();
        assert_eq!(times, vec![1000, 1500, 2000, 2300, 2600, 4600]);
    }

    #[test]
    fn test_unknown_enemy_dropped_with_warning() {
        let tables = DataTables::builtin();
        let template = WaveTemplate::new(vec![
            SpawnGroup::new("frosh", 2, 500),
            SpawnGroup::new("ghost", 5, 500),
            SpawnGroup::new("frosh", 1, 500),
        ]);
        let mut director = WaveDirector::new(vec![template], 0);
        director.start_wave(0, &tables).unwrap();

        assert_eq!(director.pending(), 3);
        assert_eq!(director.warnings().len(), 1);
        assert_eq!(director.warnings()[0].enemy, "ghost");
    }

    #[test]
    fn test_wave_complete_requires_spawning_and_clear() {
        let tables = DataTables::builtin();
        let template = WaveTemplate::new(vec![SpawnGroup::new("frosh", 2, 100)]);
        let mut director = WaveDirector::new(vec![template], 0);
        director.start_wave(0, &tables).unwrap();

        for _ in director.poll(0) {
            director.on_spawned(0);
        }
        assert!(director.collect_completed().is_empty());
        director.on_removed(0);
        assert!(director.collect_completed().is_empty(), "still spawning");

        for _ in director.poll(100) {
            director.on_spawned(0);
        }
        assert!(director.collect_completed().is_empty(), "one alive");
        director.on_removed(0);
        assert_eq!(director.collect_completed(), vec![0]);
        assert!(director.is_wave_complete(0));
        assert_eq!(director.phase(), WavePhase::Complete);
        assert!(director.all_complete());
    }

    #[test]
    fn test_cannot_start_while_spawning() {
        let tables = DataTables::builtin();
        let mut director = WaveDirector::new(vec![frosh_wave(), frosh_wave()], 0);
        director.start_wave(0, &tables).unwrap();
        assert!(director.start_wave(100, &tables).is_err());

        director.poll(5400);
        assert_eq!(director.start_wave(5400, &tables).unwrap(), 1);
        director.poll(20_000);
        assert!(director.start_wave(20_000, &tables).is_err());
    }

    #[test]
    fn test_boss_detection_is_deterministic() {
        let tables = DataTables::builtin();
        let dean = WaveTemplate::new(vec![SpawnGroup::new("dean", 1, 0)]);
        let flagged = WaveTemplate {
            boss: true,
            ..frosh_wave()
        };
        let director = WaveDirector::new(
            vec![frosh_wave(), dean, flagged, frosh_wave(), frosh_wave()],
            5,
        );
        let bosses: Vec<bool> = (0..5).map(|w| director.is_boss_wave(w, &tables)).collect();
        assert_eq!(bosses, vec![false, true, true, false, true]);
    }
}
