//! Builder for creating Detection objects from various input formats.

use ndarray::Array1;

use crate::tracker::{Detection, Rect};

/// Builder for creating `Detection` objects from various box formats.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    bbox: Rect,
    label: String,
    confidence: f32,
    feature: Option<Array1<f32>>,
    identity: Option<(String, f32)>,
}

impl DetectionBuilder {
    /// Create an empty builder: zero-sized box, empty label, confidence 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.bbox = Rect::from_tlbr(x1, y1, x2, y2);
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::new(cx - w / 2.0, cy - h / 2.0, w, h);
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::new(x, y, w, h);
        self
    }

    /// Set the class label, e.g. `"person"`.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the detector confidence score.
    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Appearance embedding for the cascade stage.
    pub fn feature(mut self, feature: impl Into<Array1<f32>>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    /// Attach a recognized identity and its match distance (lower is better).
    pub fn identity(mut self, identity: impl Into<String>, distance: f32) -> Self {
        self.identity = Some((identity.into(), distance));
        self
    }

    /// Build the `Detection`.
    pub fn build(self) -> Detection {
        let mut detection = Detection::new(self.label, self.confidence, self.bbox);
        detection.feature = self.feature;
        if let Some((identity, distance)) = self.identity {
            detection.set_identity(identity, distance, None, None);
        }
        detection
    }
}
