//! Per-frame observations and their tracked annotations.

use ndarray::Array1;

use crate::tracker::kalman_filter::Measurement;
use crate::tracker::rect::Rect;

/// Identity distance of a detection or track nobody has recognized yet.
pub const IDENTITY_UNKNOWN_DISTANCE: f32 = f32::INFINITY;

/// One detector output, optionally enriched by the recognizer.
#[derive(Debug, Clone)]
pub struct Detection {
    pub label: String,
    /// Detector confidence in 0..=1
    pub confidence: f32,
    /// Bounding box in TLWH format
    pub bbox: Rect,
    /// Appearance embedding used by the cascade stage
    pub feature: Option<Array1<f32>>,
    /// Candidate identity from the recognizer
    pub identity: Option<String>,
    /// Recognizer distance for `identity`, lower is better
    pub identity_distance: f32,
    pub person_id: Option<String>,
    pub face_id: Option<String>,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: Rect) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
            feature: None,
            identity: None,
            identity_distance: IDENTITY_UNKNOWN_DISTANCE,
            person_id: None,
            face_id: None,
        }
    }

    pub fn with_feature(mut self, feature: Array1<f32>) -> Self {
        self.feature = Some(feature);
        self
    }

    /// Attach a recognizer result.
    pub fn set_identity(
        &mut self,
        identity: impl Into<String>,
        distance: f32,
        person_id: Option<String>,
        face_id: Option<String>,
    ) {
        self.identity = Some(identity.into());
        self.identity_distance = distance;
        self.person_id = person_id;
        self.face_id = face_id;
    }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        self.bbox.center()
    }

    /// Box in the filter's observation space.
    pub fn to_measurement(&self) -> Measurement {
        let [cx, cy, a, h] = self.bbox.to_xyah();
        Measurement::new(cx as f64, cy as f64, a as f64, h as f64)
    }
}

/// A frame's detection after tracking.
#[derive(Debug, Clone)]
pub struct TrackedDetection {
    pub detection: Detection,
    pub track_id: u64,
    /// Whether the owning track has been confirmed
    pub confirmed: bool,
    /// Center points of the owning track, oldest first
    pub trail: Vec<(f32, f32)>,
    /// Best identity known for the owning track
    pub identity: Option<String>,
    pub identity_distance: f32,
    pub person_id: Option<String>,
    pub face_id: Option<String>,
}
