//! Projectiles in flight.
//!
//! A projectile moves from its origin to its destination over a fixed travel
//! time, optionally along a parabolic arc. Guided projectiles follow their
//! target while it lives. On arrival the payload is handed to the combat
//! resolver and the projectile is removed.

use serde::{Deserialize, Serialize};

use crate::combat::{resolve_impact, ImpactPayload};
use crate::components::EntityId;
use crate::events::{EffectKind, TickEvents};
use crate::math::{Fixed, Millis, Vec2Fixed};
use crate::world::{Rules, World};

/// How a projectile's travel time is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flight {
    /// Tiles per second; travel time depends on distance.
    Speed(Fixed),
    /// Fixed travel time in milliseconds.
    Duration(u32),
}

/// What happens when a projectile's target dies mid-flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetLostPolicy {
    /// Fly on to the last known point and do nothing.
    Miss,
    /// Resolve splash damage at the last known point.
    Splash,
}

/// Projectile behaviour of a tower kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileSpec {
    /// Travel time rule.
    pub flight: Flight,
    /// Peak height of the arc in tiles (0 for straight shots).
    pub arc_height: Fixed,
    /// Whether the projectile tracks its target.
    pub guided: bool,
    /// Behaviour when the target is lost.
    pub on_target_lost: TargetLostPolicy,
}

impl ProjectileSpec {
    /// Travel time for a shot covering `distance` tiles (at least 1 ms).
    #[must_use]
    pub fn travel_ms(&self, distance: Fixed) -> u32 {
        match self.flight {
            Flight::Duration(ms) => ms.max(1),
            Flight::Speed(speed) if speed > Fixed::ZERO => {
                let ms: u32 = (distance * Fixed::from_num(1000) / speed).ceil().to_num();
                ms.max(1)
            }
            Flight::Speed(_) => 1,
        }
    }
}

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Entity id.
    pub id: EntityId,
    /// Launch point.
    pub origin: Vec2Fixed,
    /// Impact point (tracks the target when guided).
    pub destination: Vec2Fixed,
    /// Current ground position.
    pub position: Vec2Fixed,
    /// Flight progress in `[0, 1]`.
    pub progress: Fixed,
    /// Total flight time.
    pub travel_ms: u32,
    /// Peak arc height.
    pub arc_height: Fixed,
    /// Whether the destination follows the target.
    pub guided: bool,
    /// Behaviour if the target dies.
    pub on_target_lost: TargetLostPolicy,
    /// Target enemy (weak).
    pub target: Option<EntityId>,
    /// Damage and effects delivered on impact.
    pub payload: ImpactPayload,
}

impl Projectile {
    /// Launch a projectile at an enemy.
    #[must_use]
    pub fn launch(
        id: EntityId,
        spec: &ProjectileSpec,
        origin: Vec2Fixed,
        destination: Vec2Fixed,
        target: EntityId,
        payload: ImpactPayload,
    ) -> Self {
        Self {
            id,
            origin,
            destination,
            position: origin,
            progress: Fixed::ZERO,
            travel_ms: spec.travel_ms(origin.distance(destination)),
            arc_height: spec.arc_height,
            guided: spec.guided,
            on_target_lost: spec.on_target_lost,
            target: Some(target),
            payload,
        }
    }

    /// Current height above the ground: `4·h·p·(1−p)`.
    #[must_use]
    pub fn height(&self) -> Fixed {
        Fixed::from_num(4) * self.arc_height * self.progress * (Fixed::ONE - self.progress)
    }

    /// Advance by `dt` milliseconds. Returns true on arrival.
    pub fn step(&mut self, dt: Millis) -> bool {
        let travel = Fixed::from_num(self.travel_ms.max(1));
        let delta = Fixed::from_num(dt) / travel;
        self.progress = (self.progress + delta).min(Fixed::ONE);
        self.position = self.origin.lerp(self.destination, self.progress);
        self.progress >= Fixed::ONE
    }
}

/// Advance every projectile and resolve arrivals.
pub fn projectile_system(world: &mut World, rules: &Rules<'_>, events: &mut TickEvents) {
    let dt = world.dt;
    for id in world.projectiles.sorted_ids() {
        let Some(projectile) = world.projectiles.get_mut(id) else {
            continue;
        };

        let live_target = projectile
            .target
            .and_then(|t| world.enemies.get(t))
            .filter(|e| e.is_alive())
            .map(|e| e.position);
        match live_target {
            Some(position) if projectile.guided => projectile.destination = position,
            Some(_) => {}
            None => projectile.target = None,
        }

        if !projectile.step(dt) {
            continue;
        }

        let Some(projectile) = world.projectiles.remove(id) else {
            continue;
        };
        match (projectile.target, projectile.on_target_lost) {
            (Some(target), _) => resolve_impact(
                world,
                rules,
                &projectile.payload,
                Some(target),
                projectile.destination,
                events,
            ),
            (None, TargetLostPolicy::Splash) => {
                let payload = ImpactPayload {
                    splash: Some(projectile.payload.splash.unwrap_or(Fixed::ONE)),
                    ..projectile.payload.clone()
                };
                resolve_impact(world, rules, &payload, None, projectile.destination, events);
            }
            (None, TargetLostPolicy::Miss) => {
                events.effect(EffectKind::Miss, projectile.destination, Fixed::ZERO);
            }
        }
    }
}
