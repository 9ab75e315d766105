//! Skyline profiles for collision-avoidance spacing
//!
//! Each staff accumulates two horizontal profiles of occupied vertical
//! space: a north line (upper envelope, most-negative y wins) and a south
//! line (lower envelope, most-positive y wins). Coordinates are staff-local
//! with y growing downward, so elements above the staff carry negative y.
//!
//! The only query the stacker needs is `min_distance`: the smallest vertical
//! translation of a lower staff such that no horizontally-overlapping pair
//! of (upper south, lower north) shapes collides. Profiles are rebuilt
//! externally whenever staff contents change; the query itself is pure.

use serde::{Deserialize, Serialize};

use crate::models::geometry::RectF;

/// One horizontal span of a profile with its vertical extent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkylineSegment {
    pub x: f64,
    pub w: f64,
    pub y: f64,
}

impl SkylineSegment {
    fn overlaps(&self, other: &SkylineSegment) -> bool {
        self.x < other.x + other.w && other.x < self.x + self.w
    }
}

/// A single envelope (upper or lower) of a staff's occupied space
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SkylineLine {
    segments: Vec<SkylineSegment>,
}

impl SkylineLine {
    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[SkylineSegment] {
        &self.segments
    }

    fn push(&mut self, x: f64, w: f64, y: f64) {
        if w <= 0.0 {
            return;
        }
        self.segments.push(SkylineSegment { x, w, y });
    }

    /// Furthest-down extent of the line, `None` when empty
    pub fn max(&self) -> Option<f64> {
        self.segments
            .iter()
            .map(|s| s.y)
            .fold(None, |acc, y| Some(acc.map_or(y, |a: f64| a.max(y))))
    }

    /// Furthest-up extent of the line, `None` when empty
    pub fn min(&self) -> Option<f64> {
        self.segments
            .iter()
            .map(|s| s.y)
            .fold(None, |acc, y| Some(acc.map_or(y, |a: f64| a.min(y))))
    }

    /// Minimal vertical translation of `north` (a lower staff's upper
    /// envelope, in that staff's local coordinates) below this line (an
    /// upper staff's lower envelope) so that no horizontally-overlapping
    /// pair collides. `None` when either profile is empty or the profiles
    /// never horizontally overlap — no constraint either way.
    pub fn min_distance(&self, north: &SkylineLine) -> Option<f64> {
        let mut best: Option<f64> = None;
        for s in &self.segments {
            for n in &north.segments {
                if s.overlaps(n) {
                    let d = s.y - n.y;
                    best = Some(best.map_or(d, |b: f64| b.max(d)));
                }
            }
        }
        best
    }
}

/// Paired north/south profiles for one staff
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Skyline {
    north: SkylineLine,
    south: SkylineLine,
}

impl Skyline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.north.clear();
        self.south.clear();
    }

    /// Add an element shape to both envelopes
    pub fn add(&mut self, rect: RectF) {
        self.north.push(rect.x, rect.width, rect.top());
        self.south.push(rect.x, rect.width, rect.bottom());
    }

    pub fn north(&self) -> &SkylineLine {
        &self.north
    }

    pub fn south(&self) -> &SkylineLine {
        &self.south
    }

    /// Minimal collision-free gap between this staff (above) and `other`
    /// (below); see [`SkylineLine::min_distance`]
    pub fn min_distance(&self, other: &Skyline) -> Option<f64> {
        self.south.min_distance(&other.north)
    }
}
