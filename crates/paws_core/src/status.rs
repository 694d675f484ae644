//! Timed status effects (buffs and debuffs).
//!
//! Every status is stored as `{kind, intensity, until}`. A list holds at most
//! one entry per kind: re-applying a kind keeps the stronger intensity and
//! refreshes the expiry, so effects never stack into duplicates.

use serde::{Deserialize, Serialize};

use crate::math::{pct, Fixed, Millis};

/// Kinds of timed status effects.
///
/// Enemy-facing: `Slow`, `Burn`, `Stun`, `Freeze`.
/// Tower/unit-facing: `Slow`, `Weaken`, `Blind`, `Disable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusKind {
    /// Movement speed (enemies) or attack rate (towers) reduced by intensity.
    Slow,
    /// Damage over time; intensity is damage per second.
    Burn,
    /// No movement and no attacks.
    Stun,
    /// Like stun, from cold sources.
    Freeze,
    /// Outgoing damage reduced by intensity.
    Weaken,
    /// Attack range reduced by intensity.
    Blind,
    /// No attacks at all.
    Disable,
}

impl StatusKind {
    /// Whether this status stops movement.
    #[must_use]
    pub const fn immobilizes(self) -> bool {
        matches!(self, Self::Stun | Self::Freeze)
    }
}

/// Highest intensity a fractional status may reach.
///
/// Caps slow so that `interval / (1 - intensity)` stays finite.
#[must_use]
pub fn max_fraction() -> Fixed {
    pct(90)
}

/// A single active status effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    /// What the status does.
    pub kind: StatusKind,
    /// Strength; a fraction for most kinds, damage per second for burn.
    pub intensity: Fixed,
    /// Simulation time at which the status expires.
    pub until: Millis,
}

impl StatusEffect {
    /// Create a status effect.
    #[must_use]
    pub const fn new(kind: StatusKind, intensity: Fixed, until: Millis) -> Self {
        Self {
            kind,
            intensity,
            until,
        }
    }

    /// Whether the status is still in force at `now`.
    #[must_use]
    pub const fn is_active(&self, now: Millis) -> bool {
        now < self.until
    }
}

/// A status to be applied on hit, with a duration instead of an expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusApplication {
    /// Status kind.
    pub kind: StatusKind,
    /// Strength of the status.
    pub intensity: Fixed,
    /// How long it lasts once applied.
    pub duration_ms: u32,
}

impl StatusApplication {
    /// Create a status application.
    #[must_use]
    pub const fn new(kind: StatusKind, intensity: Fixed, duration_ms: u32) -> Self {
        Self {
            kind,
            intensity,
            duration_ms,
        }
    }

    /// Resolve to a concrete effect starting at `now`.
    #[must_use]
    pub fn at(self, now: Millis) -> StatusEffect {
        StatusEffect::new(self.kind, self.intensity, now + u64::from(self.duration_ms))
    }
}

/// Set of active statuses, at most one per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusList {
    effects: Vec<StatusEffect>,
}

impl StatusList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a status at `now`.
    ///
    /// If the kind is already active the stored intensity becomes the
    /// maximum of old and new, and `until` is refreshed to the later expiry.
    /// A lapsed entry of the same kind is replaced outright.
    pub fn apply(&mut self, effect: StatusEffect, now: Millis) {
        let intensity = if effect.kind == StatusKind::Burn {
            effect.intensity.max(Fixed::ZERO)
        } else {
            effect.intensity.clamp(Fixed::ZERO, Fixed::ONE)
        };

        let fresh = StatusEffect {
            intensity,
            ..effect
        };
        match self.effects.iter_mut().find(|e| e.kind == effect.kind) {
            Some(existing) if existing.is_active(now) => {
                existing.intensity = existing.intensity.max(intensity);
                existing.until = existing.until.max(effect.until);
            }
            Some(existing) => *existing = fresh,
            None => self.effects.push(fresh),
        }
    }

    /// Drop expired statuses. Returns true if anything was removed.
    pub fn expire(&mut self, now: Millis) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| e.is_active(now));
        before != self.effects.len()
    }

    /// Active status of the given kind.
    #[must_use]
    pub fn get(&self, kind: StatusKind, now: Millis) -> Option<&StatusEffect> {
        self.effects
            .iter()
            .find(|e| e.kind == kind && e.is_active(now))
    }

    /// Intensity of the given kind, or zero when absent.
    #[must_use]
    pub fn intensity(&self, kind: StatusKind, now: Millis) -> Fixed {
        self.get(kind, now).map_or(Fixed::ZERO, |e| e.intensity)
    }

    /// Fractional intensity clamped to the allowed maximum.
    #[must_use]
    pub fn fraction(&self, kind: StatusKind, now: Millis) -> Fixed {
        self.intensity(kind, now).min(max_fraction())
    }

    /// Whether the given kind is active.
    #[must_use]
    pub fn has(&self, kind: StatusKind, now: Millis) -> bool {
        self.get(kind, now).is_some()
    }

    /// Whether any immobilizing status (stun, freeze) is active.
    #[must_use]
    pub fn is_immobilized(&self, now: Millis) -> bool {
        self.effects
            .iter()
            .any(|e| e.kind.immobilizes() && e.is_active(now))
    }

    /// Remove a status kind outright.
    pub fn clear(&mut self, kind: StatusKind) {
        self.effects.retain(|e| e.kind != kind);
    }

    /// Iterate over stored statuses.
    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.iter()
    }

    /// Number of stored statuses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Whether no statuses are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reapply_weaker_keeps_intensity_refreshes_until() {
        let mut list = StatusList::new();
        list.apply(StatusEffect::new(StatusKind::Weaken, pct(40), 1000), 0);
        list.apply(StatusEffect::new(StatusKind::Weaken, pct(10), 3000), 0);

        assert_eq!(list.len(), 1);
        let weaken = list.get(StatusKind::Weaken, 0).unwrap();
        assert_eq!(weaken.intensity, pct(40));
        assert_eq!(weaken.until, 3000);
    }

    #[test]
    fn test_reapply_stronger_raises_intensity() {
        let mut list = StatusList::new();
        list.apply(StatusEffect::new(StatusKind::Slow, pct(20), 1000), 0);
        list.apply(StatusEffect::new(StatusKind::Slow, pct(50), 500), 0);

        let slow = list.get(StatusKind::Slow, 0).unwrap();
        assert_eq!(slow.intensity, pct(50));
        assert_eq!(slow.until, 1000);
    }

    #[test]
    fn test_lapsed_entry_is_replaced() {
        let mut list = StatusList::new();
        list.apply(StatusEffect::new(StatusKind::Slow, pct(80), 1000), 0);
        list.apply(StatusEffect::new(StatusKind::Slow, pct(20), 4000), 2000);

        assert_eq!(list.len(), 1);
        let slow = list.get(StatusKind::Slow, 2000).unwrap();
        assert_eq!(slow.intensity, pct(20));
        assert_eq!(slow.until, 4000);
    }

    #[test]
    fn test_expire_removes_only_elapsed() {
        let mut list = StatusList::new();
        list.apply(StatusEffect::new(StatusKind::Stun, Fixed::ONE, 100), 0);
        list.apply(StatusEffect::new(StatusKind::Burn, Fixed::from_num(5), 500), 0);

        assert!(list.is_immobilized(50));
        assert!(list.expire(100));
        assert!(!list.is_immobilized(100));
        assert!(list.has(StatusKind::Burn, 100));
        assert!(!list.expire(200));
    }

    #[test]
    fn test_fraction_is_capped() {
        let mut list = StatusList::new();
        list.apply(StatusEffect::new(StatusKind::Slow, Fixed::ONE, 100), 0);
        assert_eq!(list.fraction(StatusKind::Slow, 0), max_fraction());
    }

    #[test]
    fn test_application_resolves_expiry() {
        let effect = StatusApplication::new(StatusKind::Freeze, Fixed::ONE, 1500).at(2000);
        assert_eq!(effect.until, 3500);
    }
}
