//! Traits for detection and recognition backends.

use crate::tracker::Detection;

/// Object detector.
///
/// Implement this trait to connect any detection model to the tracker.
///
/// # Example
///
/// ```ignore
/// use deepsort_rs::{DetectionSource, Detection};
///
/// struct MyDetector;
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, input: &[u8], width: u32, height: u32) -> Result<Vec<Detection>, Self::Error> {
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type returned by the backend. A detector error aborts the frame.
    type Error;

    /// Run inference on raw image data and return detections.
    ///
    /// Embeddings may be attached with [`Detection::with_feature`]; without
    /// one a detection can still be matched geometrically.
    fn detect(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, Self::Error>;
}

/// Best candidate a recognizer found for one detection.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityMatch {
    /// Display name of the recognized identity
    pub identity: String,
    /// Lower is more confident
    pub distance: f32,
    /// Registry key of the person, if the backend has one
    pub person_id: Option<String>,
    /// Registry key of the matched face sample
    pub face_id: Option<String>,
}

/// Identity recognizer, e.g. face recognition on person crops.
pub trait IdentitySource {
    /// Error type returned by the backend. Recognition errors are logged
    /// and the detection is tracked without an identity candidate.
    type Error;

    /// Look up the identity of the object inside `detection.bbox`.
    /// `Ok(None)` means no candidate was found.
    fn recognize(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
        detection: &Detection,
    ) -> Result<Option<IdentityMatch>, Self::Error>;
}

/// Helper trait for converting model-specific outputs to `Detection`.
pub trait IntoDetections {
    /// Convert into a list of detections without embeddings or identities.
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}

impl IntoDetections for Vec<(String, f32, crate::tracker::Rect)> {
    fn into_detections(self) -> Vec<Detection> {
        self.into_iter()
            .map(|(label, confidence, bbox)| Detection::new(label, confidence, bbox))
            .collect()
    }
}
