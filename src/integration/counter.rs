//! Counting tracked objects and selecting those inside a region of the frame.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::tracker::TrackedDetection;

/// Axis-aligned region in pixel coordinates, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Region {
    /// Region from its top-left and bottom-right corners.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Clip the region to a `width` x `height` frame.
    pub fn clamp_to(self, width: u32, height: u32) -> Self {
        Self {
            x1: self.x1.max(0.0),
            y1: self.y1.max(0.0),
            x2: self.x2.min(width as f32),
            y2: self.y2.min(height as f32),
        }
    }

    /// Whether the point lies inside the region, edges included.
    pub fn contains(&self, (x, y): (f32, f32)) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }
}

/// Counts for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameCount {
    /// Objects of interest visible this frame
    pub current: usize,
    /// Distinct tracks of interest seen so far
    pub total: usize,
}

/// Tallies tracked detections of selected labels.
///
/// Counts cover the whole frame. The optional region only selects which
/// detections are handed on for drawing or recording, see
/// [`ObjectCounter::in_region`].
#[derive(Debug, Clone, Default)]
pub struct ObjectCounter {
    labels: BTreeSet<String>,
    region: Option<Region>,
    seen: HashSet<u64>,
}

impl ObjectCounter {
    /// Count detections with one of `labels`. An empty set counts everything.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            region: None,
            seen: HashSet::new(),
        }
    }

    /// Restrict [`ObjectCounter::in_region`] to detections whose center falls
    /// inside `region`. Counting is unaffected.
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn region(&self) -> Option<Region> {
        self.region
    }

    /// Whether the detection carries a label of interest.
    pub fn is_counted(&self, detection: &TrackedDetection) -> bool {
        self.labels.is_empty() || self.labels.contains(&detection.detection.label)
    }

    /// Detections of interest inside the region, or all of them when no
    /// region is set.
    pub fn in_region<'a>(
        &'a self,
        detections: &'a [TrackedDetection],
    ) -> impl Iterator<Item = &'a TrackedDetection> + 'a {
        detections.iter().filter(move |d| {
            self.is_counted(d)
                && self
                    .region
                    .is_none_or(|r| r.contains(d.detection.center()))
        })
    }

    /// Record one frame of tracker output and return the updated counts.
    pub fn observe(&mut self, detections: &[TrackedDetection]) -> FrameCount {
        let counted: Vec<u64> = detections
            .iter()
            .filter(|d| self.is_counted(d))
            .map(|d| d.track_id)
            .collect();
        let current = counted.len();
        self.seen.extend(counted);
        FrameCount {
            current,
            total: self.seen.len(),
        }
    }

    /// Distinct tracks of interest seen so far.
    pub fn total(&self) -> usize {
        self.seen.len()
    }
}
