//! Simulation tuning.
//!
//! Every constant that shapes gameplay but is not part of a data table lives
//! in [`SimConfig`]. The defaults are the shipped balance; scenarios may load
//! overrides from RON, where missing fields fall back to the defaults.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{pct, Fixed};

/// Station train phase lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainTimings {
    /// Pull-in duration.
    pub arrive_ms: u32,
    /// Time spent docked.
    pub dock_ms: u32,
    /// Pull-out duration.
    pub depart_ms: u32,
}

impl Default for TrainTimings {
    fn default() -> Self {
        Self {
            arrive_ms: 1_500,
            dock_ms: 1_000,
            depart_ms: 1_500,
        }
    }
}

/// Gameplay constants.
///
/// # Example RON
///
/// ```ron
/// (
///     max_step_ms: 100,
///     min_damage: "1",
///     sell_refund_percent: 70,
///     boss_every: 5,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Largest `dt` a single tick may advance.
    pub max_step_ms: u32,
    /// Floor on the damage of any hit.
    pub min_damage: Fixed,
    /// Percentage of invested Paw Points returned on sell.
    pub sell_refund_percent: u32,
    /// Every Nth wave is a boss wave (0 disables).
    pub boss_every: u32,
    /// Time for a fresh enemy to reach full speed.
    pub spawn_ramp_ms: u32,
    /// Station train timings.
    pub train: TrainTimings,
    /// Lifetime of aura boosts; auras refresh every tick.
    pub aura_refresh_ms: u32,
    /// Largest cosmetic lane offset.
    pub lane_jitter: Fixed,
    /// Lateral spacing between merged lanes.
    pub lane_spacing: Fixed,
    /// Paw Points granted when a wave is cleared.
    pub wave_clear_bonus: u32,
    /// Hop radius of chain attacks.
    pub chain_radius: Fixed,
    /// Damage multiplier per chain hop.
    pub chain_falloff: Fixed,
    /// Splash damage multiplier at the blast edge.
    pub splash_edge_factor: Fixed,
    /// Minimum spacing between tower placements and the path centre line.
    pub path_clearance: Fixed,
    /// Base health; the match is lost when leaks reduce it to zero.
    pub base_health: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_step_ms: 100,
            min_damage: Fixed::ONE,
            sell_refund_percent: 70,
            boss_every: 5,
            spawn_ramp_ms: 500,
            train: TrainTimings::default(),
            aura_refresh_ms: 250,
            lane_jitter: pct(15),
            lane_spacing: pct(25),
            wave_clear_bonus: 25,
            chain_radius: Fixed::from_num(2),
            chain_falloff: pct(75),
            splash_edge_factor: pct(50),
            path_clearance: pct(50),
            base_health: 20,
        }
    }
}

impl SimConfig {
    /// Parse a config from RON text.
    pub fn from_ron_str(source_name: &str, text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::DataParseError {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }
}
