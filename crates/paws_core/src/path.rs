//! Path geometry.
//!
//! A [`Path`] is an ordered list of grid waypoints converted to world
//! coordinates. A [`PathCursor`] addresses a point on a path by segment and
//! progress within that segment. Levels may define several paths; the
//! [`PathNetwork`] treats them all alike and answers merge queries where
//! paths share tiles, so overlapping lanes can be spread symmetrically
//! without one path taking precedence.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::components::{GridPoint, PathId};
use crate::error::ValidationError;
use crate::math::{pct, Fixed, Vec2Fixed};

/// Position on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCursor {
    /// Path followed.
    pub path: PathId,
    /// Current segment (waypoint `segment` to `segment + 1`).
    pub segment: usize,
    /// Progress within the segment, in `[0, 1]`.
    pub t: Fixed,
    /// Distance covered since the start of the path.
    pub travelled: Fixed,
}

impl PathCursor {
    /// Cursor at the start of a path.
    #[must_use]
    pub const fn start(path: PathId) -> Self {
        Self {
            path,
            segment: 0,
            t: Fixed::ZERO,
            travelled: Fixed::ZERO,
        }
    }
}

/// World position and heading at a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSample {
    /// World position on the centre line.
    pub position: Vec2Fixed,
    /// Unit direction of travel.
    pub facing: Vec2Fixed,
}

/// Outcome of advancing a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Still on the path.
    Moving,
    /// Reached the final waypoint.
    ReachedGoal,
}

/// A validated waypoint path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    waypoints: Vec<GridPoint>,
    points: Vec<Vec2Fixed>,
    lengths: Vec<Fixed>,
    length: Fixed,
    tiles: Vec<GridPoint>,
}

impl Path {
    /// Build a path from grid waypoints.
    ///
    /// `index` only labels validation errors.
    ///
    /// # Errors
    ///
    /// Fewer than two waypoints, or waypoints that all coincide.
    pub fn new(index: usize, waypoints: Vec<GridPoint>) -> Result<Self, ValidationError> {
        if waypoints.len() < 2 {
            return Err(ValidationError::PathTooShort {
                path: index,
                points: waypoints.len(),
            });
        }

        let points: Vec<Vec2Fixed> = waypoints.iter().map(|p| p.to_world()).collect();
        let lengths: Vec<Fixed> = points.windows(2).map(|w| w[0].distance(w[1])).collect();
        let length = lengths.iter().fold(Fixed::ZERO, |acc, l| acc + *l);
        if length == Fixed::ZERO {
            return Err(ValidationError::PathZeroLength { path: index });
        }

        let tiles = rasterize(&points);
        Ok(Self {
            waypoints,
            points,
            lengths,
            length,
            tiles,
        })
    }

    /// Grid waypoints.
    #[must_use]
    pub fn waypoints(&self) -> &[GridPoint] {
        &self.waypoints
    }

    /// Total length in tiles.
    #[must_use]
    pub const fn length(&self) -> Fixed {
        self.length
    }

    /// Tiles the path passes through, sorted.
    #[must_use]
    pub fn tiles(&self) -> &[GridPoint] {
        &self.tiles
    }

    /// Whether the path crosses a tile.
    #[must_use]
    pub fn covers(&self, tile: GridPoint) -> bool {
        self.tiles.binary_search(&tile).is_ok()
    }

    /// World position of the first waypoint.
    #[must_use]
    pub fn start(&self) -> Vec2Fixed {
        self.points[0]
    }

    /// World position of the last waypoint.
    #[must_use]
    pub fn end(&self) -> Vec2Fixed {
        self.points[self.points.len() - 1]
    }

    /// Position and heading at a cursor.
    #[must_use]
    pub fn sample(&self, cursor: &PathCursor) -> PathSample {
        let segment = cursor.segment.min(self.lengths.len() - 1);
        let a = self.points[segment];
        let b = self.points[segment + 1];
        PathSample {
            position: a.lerp(b, cursor.t),
            facing: (b - a).normalize(),
        }
    }

    /// Move a cursor forward by `distance` tiles.
    ///
    /// Progress never decreases. Reaching the last waypoint parks the cursor
    /// at `t = 1` on the final segment.
    pub fn advance(&self, cursor: &mut PathCursor, distance: Fixed) -> Advance {
        let last = self.lengths.len() - 1;
        let mut remaining = distance.max(Fixed::ZERO);

        while cursor.segment <= last {
            let seg_len = self.lengths[cursor.segment];
            let left = seg_len * (Fixed::ONE - cursor.t);
            if seg_len > Fixed::ZERO && remaining < left {
                cursor.t = (cursor.t + remaining / seg_len).min(Fixed::ONE);
                cursor.travelled += remaining;
                return Advance::Moving;
            }
            remaining -= left;
            cursor.travelled += left;
            cursor.segment += 1;
            cursor.t = Fixed::ZERO;
        }

        cursor.segment = last;
        cursor.t = Fixed::ONE;
        Advance::ReachedGoal
    }

    /// Distance left to the final waypoint.
    #[must_use]
    pub fn remaining(&self, cursor: &PathCursor) -> Fixed {
        let segment = cursor.segment.min(self.lengths.len() - 1);
        let rest = self.lengths[segment + 1..]
            .iter()
            .fold(Fixed::ZERO, |acc, l| acc + *l);
        rest + self.lengths[segment] * (Fixed::ONE - cursor.t)
    }

    /// Fraction of the path covered, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self, cursor: &PathCursor) -> Fixed {
        crate::math::clamp_unit(Fixed::ONE - self.remaining(cursor) / self.length)
    }

    /// Shortest distance from a point to the path centre line.
    #[must_use]
    pub fn distance_to(&self, point: Vec2Fixed) -> Fixed {
        self.points
            .windows(2)
            .map(|w| segment_distance(point, w[0], w[1]))
            .min()
            .unwrap_or(Fixed::MAX)
    }
}

fn segment_distance(point: Vec2Fixed, a: Vec2Fixed, b: Vec2Fixed) -> Fixed {
    let ab = b - a;
    let len_sq = ab.dot(ab);
    if len_sq == Fixed::ZERO {
        return point.distance(a);
    }
    let t = crate::math::clamp_unit((point - a).dot(ab) / len_sq);
    point.distance(a.lerp(b, t))
}

fn rasterize(points: &[Vec2Fixed]) -> Vec<GridPoint> {
    let step = pct(25);
    let mut tiles = BTreeSet::new();
    for w in points.windows(2) {
        let len = w[0].distance(w[1]);
        let steps: u32 = (len / step).ceil().to_num::<u32>().max(1);
        for i in 0..=steps {
            let t = Fixed::from_num(i) / Fixed::from_num(steps);
            tiles.insert(GridPoint::from_world(w[0].lerp(w[1], t)));
        }
    }
    tiles.into_iter().collect()
}

/// All paths of a level, addressed by [`PathId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathNetwork {
    paths: Vec<Path>,
}

impl PathNetwork {
    /// Network over already-validated paths.
    #[must_use]
    pub fn new(paths: Vec<Path>) -> Self {
        Self { paths }
    }

    /// Path by id.
    #[must_use]
    pub fn get(&self, id: PathId) -> Option<&Path> {
        self.paths.get(id as usize)
    }

    /// Number of paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the network has no paths.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Paths with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (PathId, &Path)> {
        self.paths.iter().enumerate().map(|(i, p)| (i as PathId, p))
    }

    /// Tiles covered by both paths.
    #[must_use]
    pub fn shared_tiles(&self, a: PathId, b: PathId) -> Vec<GridPoint> {
        match (self.get(a), self.get(b)) {
            (Some(pa), Some(pb)) => pa
                .tiles()
                .iter()
                .copied()
                .filter(|t| pb.covers(*t))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Ids of the paths crossing a tile, ascending.
    #[must_use]
    pub fn paths_through(&self, tile: GridPoint) -> Vec<PathId> {
        self.iter()
            .filter(|(_, p)| p.covers(tile))
            .map(|(id, _)| id)
            .collect()
    }

    /// Lateral lane offset of `path` on `tile`.
    ///
    /// Zero where only one path covers the tile. Where `n` paths meet, they
    /// get offsets `(i - (n-1)/2) × spacing` in id order, symmetric around the
    /// centre line.
    #[must_use]
    pub fn merge_lane_offset(&self, path: PathId, tile: GridPoint, spacing: Fixed) -> Fixed {
        let through = self.paths_through(tile);
        let Some(index) = through.iter().position(|p| *p == path) else {
            return Fixed::ZERO;
        };
        if through.len() < 2 {
            return Fixed::ZERO;
        }
        let centre = Fixed::from_num(through.len() - 1) / Fixed::from_num(2);
        (Fixed::from_num(index) - centre) * spacing
    }

    /// Path for the `counter`-th spawn: the pinned path if valid, otherwise
    /// round-robin over all paths.
    #[must_use]
    pub fn spawn_path(&self, counter: u32, pinned: Option<PathId>) -> PathId {
        match pinned {
            Some(id) if self.get(id).is_some() => id,
            _ => counter % self.paths.len().max(1) as u32,
        }
    }

    /// Shortest distance from a point to any path.
    #[must_use]
    pub fn distance_to(&self, point: Vec2Fixed) -> Fixed {
        self.paths
            .iter()
            .map(|p| p.distance_to(point))
            .min()
            .unwrap_or(Fixed::MAX)
    }

    /// Whether any path crosses a tile.
    #[must_use]
    pub fn covers(&self, tile: GridPoint) -> bool {
        self.paths.iter().any(|p| p.covers(tile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(x: i32, y: i32) -> GridPoint {
        GridPoint::new(x, y)
    }

    fn l_path() -> Path {
        Path::new(0, vec![g(0, 0), g(4, 0), g(4, 3)]).unwrap()
    }

    #[test]
    fn test_rejects_short_and_degenerate_paths() {
        assert_eq!(
            Path::new(2, vec![g(1, 1)]),
            Err(ValidationError::PathTooShort { path: 2, points: 1 })
        );
        assert_eq!(
            Path::new(0, vec![g(1, 1), g(1, 1)]),
            Err(ValidationError::PathZeroLength { path: 0 })
        );
    }

    #[test]
    fn test_length_and_sample() {
        let path = l_path();
        assert_eq!(path.length(), Fixed::from_num(7));

        let mut cursor = PathCursor::start(0);
        assert_eq!(path.sample(&cursor).position, g(0, 0).to_world());

        assert_eq!(path.advance(&mut cursor, Fixed::from_num(2)), Advance::Moving);
        let sample = path.sample(&cursor);
        assert_eq!(sample.position, Vec2Fixed::new(pct(250), pct(50)));
        assert_eq!(sample.facing, Vec2Fixed::from_ints(1, 0));
        assert_eq!(path.remaining(&cursor), Fixed::from_num(5));
    }

    #[test]
    fn test_advance_crosses_segments_and_reaches_goal() {
        let path = l_path();
        let mut cursor = PathCursor::start(0);
        assert_eq!(path.advance(&mut cursor, Fixed::from_num(5)), Advance::Moving);
        assert_eq!(cursor.segment, 1);
        assert_eq!(path.sample(&cursor).facing, Vec2Fixed::from_ints(0, 1));

        assert_eq!(
            path.advance(&mut cursor, Fixed::from_num(10)),
            Advance::ReachedGoal
        );
        assert_eq!(path.sample(&cursor).position, path.end());
        assert_eq!(path.remaining(&cursor), Fixed::ZERO);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let path = l_path();
        let mut cursor = PathCursor::start(0);
        let mut last = Fixed::ZERO;
        for _ in 0..40 {
            path.advance(&mut cursor, pct(20));
            let p = path.progress(&cursor);
            assert!(p >= last);
            last = p;
        }
        assert_eq!(last, Fixed::ONE);
    }

    #[test]
    fn test_merge_offsets_are_symmetric() {
        let a = Path::new(0, vec![g(0, 2), g(5, 2), g(9, 2)]).unwrap();
        let b = Path::new(1, vec![g(5, 0), g(5, 2), g(9, 2)]).unwrap();
        let network = PathNetwork::new(vec![a, b]);

        let shared = network.shared_tiles(0, 1);
        assert!(shared.contains(&g(7, 2)));
        assert!(!shared.contains(&g(1, 2)));
        assert_eq!(network.paths_through(g(7, 2)), vec![0, 1]);

        let spacing = pct(50);
        let oa = network.merge_lane_offset(0, g(7, 2), spacing);
        let ob = network.merge_lane_offset(1, g(7, 2), spacing);
        assert_eq!(oa, -ob);
        assert_ne!(oa, Fixed::ZERO);
        assert_eq!(network.merge_lane_offset(0, g(1, 2), spacing), Fixed::ZERO);
    }

    #[test]
    fn test_spawn_path_round_robin_and_pinning() {
        let a = Path::new(0, vec![g(0, 0), g(3, 0)]).unwrap();
        let b = Path::new(1, vec![g(0, 3), g(3, 3)]).unwrap();
        let network = PathNetwork::new(vec![a, b]);
        let ids: Vec<PathId> = (0..4).map(|i| network.spawn_path(i, None)).collect();
        assert_eq!(ids, vec![0, 1, 0, 1]);
        assert_eq!(network.spawn_path(0, Some(1)), 1);
        assert_eq!(network.spawn_path(1, Some(9)), 1);
    }

    #[test]
    fn test_distance_to_path() {
        let path = l_path();
        let d = path.distance_to(g(2, 2).to_world());
        assert_eq!(d, Fixed::from_num(2));
    }
}
