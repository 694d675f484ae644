//! Built-in wave sets.

use crate::math::pct;
use crate::waves::{SpawnGroup, WaveTemplate};

/// Name of the default wave set.
pub const STANDARD_WAVES: &str = "standard";

/// Name of the two-lane wave set.
pub const GAUNTLET_WAVES: &str = "gauntlet";

/// Ten waves ramping from freshmen to the Dean.
#[must_use]
pub fn standard_waves() -> Vec<WaveTemplate> {
    vec![
        WaveTemplate::new(vec![SpawnGroup::new("frosh", 10, 600)]),
        WaveTemplate::new(vec![
            SpawnGroup::new("frosh", 8, 600),
            SpawnGroup::new("goose", 6, 400),
        ]),
        WaveTemplate::new(vec![
            SpawnGroup::new("goose", 10, 350),
            SpawnGroup::new("jock", 3, 1500).with_delay(2000),
        ]),
        WaveTemplate::new(vec![
            SpawnGroup::new("frosh", 12, 400),
            SpawnGroup::new("hacker", 3, 1200),
        ]),
        WaveTemplate {
            hp_multiplier: pct(120),
            ..WaveTemplate::new(vec![
                SpawnGroup::new("jock", 6, 1000),
                SpawnGroup::new("ta", 2, 2000),
            ])
        },
        WaveTemplate::new(vec![
            SpawnGroup::new("goose", 15, 250),
            SpawnGroup::new("mascot", 3, 1500),
        ]),
        WaveTemplate {
            hp_multiplier: pct(130),
            ..WaveTemplate::new(vec![
                SpawnGroup::new("hacker", 5, 900),
                SpawnGroup::new("jock", 6, 900),
            ])
        },
        WaveTemplate {
            hp_multiplier: pct(140),
            ..WaveTemplate::new(vec![
                SpawnGroup::new("frosh", 20, 300),
                SpawnGroup::new("ta", 4, 1000),
                SpawnGroup::new("mascot", 4, 1000),
            ])
        },
        WaveTemplate {
            hp_multiplier: pct(150),
            ..WaveTemplate::new(vec![
                SpawnGroup::new("jock", 10, 700),
                SpawnGroup::new("hacker", 6, 700),
            ])
        },
        WaveTemplate {
            boss: true,
            hp_multiplier: pct(150),
            ..WaveTemplate::new(vec![
                SpawnGroup::new("frosh", 15, 300),
                SpawnGroup::new("dean", 1, 0).with_delay(3000),
                SpawnGroup::new("jock", 8, 600),
            ])
        },
    ]
}

/// Six waves that pin groups to both lanes of a two-path level.
#[must_use]
pub fn gauntlet_waves() -> Vec<WaveTemplate> {
    vec![
        WaveTemplate::new(vec![
            SpawnGroup::new("frosh", 6, 700).on_path(0),
            SpawnGroup::new("frosh", 6, 700).on_path(1).with_delay(0),
        ]),
        WaveTemplate::new(vec![
            SpawnGroup::new("goose", 8, 400),
            SpawnGroup::new("jock", 2, 1500).on_path(1),
        ]),
        WaveTemplate::new(vec![
            SpawnGroup::new("hacker", 3, 1200).on_path(0),
            SpawnGroup::new("ta", 3, 1200).on_path(1),
            SpawnGroup::new("frosh", 12, 300),
        ]),
        WaveTemplate {
            hp_multiplier: pct(125),
            ..WaveTemplate::new(vec![
                SpawnGroup::new("mascot", 4, 1000),
                SpawnGroup::new("jock", 6, 800),
            ])
        },
        WaveTemplate {
            hp_multiplier: pct(140),
            ..WaveTemplate::new(vec![
                SpawnGroup::new("goose", 20, 200),
                SpawnGroup::new("hacker", 4, 800),
            ])
        },
        WaveTemplate {
            boss: true,
            hp_multiplier: pct(150),
            ..WaveTemplate::new(vec![
                SpawnGroup::new("jock", 8, 600),
                SpawnGroup::new("dean", 1, 0).on_path(0).with_delay(2000),
                SpawnGroup::new("dean", 1, 0).on_path(1).with_delay(0),
            ])
        },
    ]
}
