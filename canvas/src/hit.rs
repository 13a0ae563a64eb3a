//! Geometry for erasing: bounding boxes and polyline crossing tests.
//!
//! Crossing is strict. Two segments intersect only when each one's endpoints
//! lie strictly on opposite sides of the other, so collinear overlaps,
//! T-junctions and shared endpoints do not count. An eraser that only grazes
//! the end of a stroke leaves it in place.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::Point;
use crate::doc::{StrokeId, StrokeStore};

/// Axis-aligned bounds of a path, in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// The inverted box returned for an empty path. Overlaps nothing.
    pub const EMPTY: Self = Self {
        min_x: f64::INFINITY,
        min_y: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        max_y: f64::NEG_INFINITY,
    };
}

/// Bounds of `path`. An empty path yields [`BoundingBox::EMPTY`].
#[must_use]
pub fn bounding_box(path: &[Point]) -> BoundingBox {
    path.iter().fold(BoundingBox::EMPTY, |b, p| BoundingBox {
        min_x: b.min_x.min(p.x),
        min_y: b.min_y.min(p.y),
        max_x: b.max_x.max(p.x),
        max_y: b.max_y.max(p.y),
    })
}

/// True unless the boxes are disjoint on either axis. Touching edges overlap.
#[must_use]
pub fn boxes_overlap(a: &BoundingBox, b: &BoundingBox) -> bool {
    !(a.max_x < b.min_x || a.min_x > b.max_x || a.max_y < b.min_y || a.min_y > b.max_y)
}

/// Z component of `(q - p) × (r - p)`.
fn cross(p: Point, q: Point, r: Point) -> f64 {
    (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x)
}

/// Whether segment `p1-p2` properly crosses segment `p3-p4`.
#[must_use]
pub fn segments_intersect(p1: Point, p2: Point, p3: Point, p4: Point) -> bool {
    let ab = cross(p1, p2, p3) * cross(p1, p2, p4);
    let cd = cross(p3, p4, p1) * cross(p3, p4, p2);
    ab < 0.0 && cd < 0.0
}

/// Whether any segment of `a` properly crosses any segment of `b`.
///
/// Paths with fewer than two points have no segments and never intersect.
#[must_use]
pub fn path_intersects(a: &[Point], b: &[Point]) -> bool {
    a.windows(2).any(|sa| {
        b.windows(2)
            .any(|sb| segments_intersect(sa[0], sa[1], sb[0], sb[1]))
    })
}

/// Ids of the strokes an eraser path removes, in store order.
///
/// The box test is only a pre-filter; a stroke is hit iff its path properly
/// crosses the eraser path.
#[must_use]
pub fn erase_hits(store: &StrokeStore, eraser: &[Point]) -> Vec<StrokeId> {
    if eraser.is_empty() {
        return Vec::new();
    }
    let eraser_box = bounding_box(eraser);
    store
        .iter()
        .filter(|stroke| !stroke.path.is_empty())
        .filter(|stroke| boxes_overlap(&bounding_box(&stroke.path), &eraser_box))
        .filter(|stroke| path_intersects(&stroke.path, eraser))
        .map(|stroke| stroke.id)
        .collect()
}
