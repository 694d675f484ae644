//! Fixed-point math utilities for deterministic simulation.
//!
//! All simulation quantities (positions, ranges, speeds, multipliers) use
//! fixed-point arithmetic so identical inputs produce identical outputs on
//! every platform. Times are plain integer milliseconds.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Serializes as a decimal string in human-readable formats (RON, JSON) and
/// as raw bits in binary formats.
pub type Fixed = I32F32;

/// Simulation time in milliseconds since match start.
pub type Millis = u64;

/// Percentage as a fixed-point fraction (`pct(30)` is 0.3).
#[must_use]
pub fn pct(percent: i32) -> Fixed {
    Fixed::from_num(percent) / Fixed::from_num(100)
}

/// Ratio of two integers as a fixed-point number.
#[must_use]
pub fn ratio(numerator: i64, denominator: i64) -> Fixed {
    Fixed::from_num(numerator) / Fixed::from_num(denominator)
}

/// Milliseconds expressed as fixed-point seconds.
#[must_use]
pub fn seconds(ms: u64) -> Fixed {
    Fixed::from_num(ms) / Fixed::from_num(1000)
}

/// Clamp a fraction into `[0, 1]`.
#[must_use]
pub fn clamp_unit(value: Fixed) -> Fixed {
    value.clamp(Fixed::ZERO, Fixed::ONE)
}

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    pub x: Fixed,
    /// Y coordinate.
    pub y: Fixed,
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Whether `other` lies within `radius` of this point (inclusive).
    #[must_use]
    pub fn within(self, other: Self, radius: Fixed) -> bool {
        self.distance_squared(other) <= radius.saturating_mul(radius)
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Vector length.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.dot(self))
    }

    /// Scale by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Perpendicular vector (rotated 90 degrees counter-clockwise).
    #[must_use]
    pub fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }
        Self::new(self.x / len, self.y / len)
    }

    /// Move toward `target` by at most `max_step`, stopping exactly on it.
    #[must_use]
    pub fn step_toward(self, target: Self, max_step: Fixed) -> Self {
        let offset = target - self;
        let dist = offset.length();
        if dist <= max_step || dist == Fixed::ZERO {
            return target;
        }
        self + offset.scale(max_step / dist)
    }

    /// Clamp this point to lie within `radius` of `center`.
    ///
    /// Points already inside are returned unchanged; points outside are
    /// projected onto the circle along the line from the centre.
    #[must_use]
    pub fn clamp_within(self, center: Self, radius: Fixed) -> Self {
        let offset = self - center;
        let dist = offset.length();
        if dist <= radius || dist == Fixed::ZERO {
            return self;
        }
        center + offset.scale(radius / dist)
    }
}

/// Computes the square root of a fixed-point number using binary search.
pub(crate) fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    // 48 iterations reach the I32F32 resolution from the largest bracket.
    for _ in 0..48 {
        let mid = (low + high) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Fixed, b: Fixed) -> bool {
        (a - b).abs() < Fixed::ONE / Fixed::from_num(10_000)
    }

    #[test]
    fn test_vec2_distance() {
        let a = Vec2Fixed::from_ints(3, 0);
        let b = Vec2Fixed::from_ints(0, 4);
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
        assert!(close(a.distance(b), Fixed::from_num(5)));
    }

    #[test]
    fn test_within_is_inclusive() {
        let a = Vec2Fixed::ZERO;
        let b = Vec2Fixed::from_ints(2, 0);
        assert!(a.within(b, Fixed::from_num(2)));
        assert!(!a.within(b, pct(199)));
    }

    #[test]
    fn test_vec2_lerp() {
        let a = Vec2Fixed::ZERO;
        let b = Vec2Fixed::from_ints(10, 20);
        let mid = a.lerp(b, pct(50));
        assert_eq!(mid, Vec2Fixed::from_ints(5, 10));
    }

    #[test]
    fn test_step_toward_stops_on_target() {
        let start = Vec2Fixed::ZERO;
        let target = Vec2Fixed::from_ints(1, 0);
        assert_eq!(start.step_toward(target, Fixed::from_num(5)), target);

        let partial = start.step_toward(Vec2Fixed::from_ints(10, 0), Fixed::from_num(2));
        assert!(close(partial.x, Fixed::from_num(2)));
        assert_eq!(partial.y, Fixed::ZERO);
    }

    #[test]
    fn test_clamp_within_projects_onto_circle() {
        let center = Vec2Fixed::ZERO;
        let far = Vec2Fixed::from_ints(0, 5);
        let clamped = far.clamp_within(center, Fixed::from_num(2));
        assert!(close(clamped.y, Fixed::from_num(2)));
        assert!(close(clamped.x, Fixed::ZERO));

        let near = Vec2Fixed::from_ints(1, 0);
        assert_eq!(near.clamp_within(center, Fixed::from_num(2)), near);
    }

    #[test]
    fn test_vec2_normalize() {
        let norm = Vec2Fixed::from_ints(3, 4).normalize();
        assert!(close(norm.dot(norm), Fixed::ONE));
        // Direction preserved: x/y ratio 3/4
        assert!(close(norm.x * Fixed::from_num(4), norm.y * Fixed::from_num(3)));
    }

    #[test]
    fn test_fixed_determinism() {
        let a = ratio(1, 3);
        let b = ratio(1, 3);
        assert_eq!(a * Fixed::from_num(7), b * Fixed::from_num(7));
    }
}
