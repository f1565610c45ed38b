//! TrackerPipeline for combining detection and recognition with tracking.

use std::fmt::Display;

use log::warn;

use crate::error::ConfigError;
use crate::tracker::{TrackManager, TrackedDetection, TrackerConfig};

use super::{DetectionSource, IdentitySource};

/// A combined tracker that bundles detection, optional identity recognition
/// and the [`TrackManager`].
pub struct TrackerPipeline<D: DetectionSource, R: IdentitySource> {
    detector: D,
    recognizer: Option<R>,
    tracker: TrackManager,
}

impl<D: DetectionSource, R: IdentitySource> TrackerPipeline<D, R>
where
    R::Error: Display,
{
    /// Create a new tracking pipeline with the given backends and tracker config.
    pub fn new(detector: D, recognizer: Option<R>, config: TrackerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            detector,
            recognizer,
            tracker: TrackManager::new(config)?,
        })
    }

    /// Create a new tracking pipeline with default tracker configuration.
    pub fn with_default_config(detector: D, recognizer: Option<R>) -> Self {
        Self {
            detector,
            recognizer,
            tracker: TrackManager::new(TrackerConfig::default())
                .expect("default tracker config is valid"),
        }
    }

    /// Process a single frame and return the tracked detections.
    ///
    /// Detections carrying the configured identity label are passed to the
    /// recognizer first. A recognizer failure is logged and treated as "no
    /// candidate"; only a detector failure aborts the frame.
    ///
    /// # Arguments
    /// * `input` - Raw image bytes
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    pub fn process_frame(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<TrackedDetection>, D::Error> {
        let mut detections = self.detector.detect(input, width, height)?;

        if let Some(recognizer) = self.recognizer.as_mut() {
            let identity_label = self.tracker.config().identity_label.as_str();
            for detection in detections.iter_mut().filter(|d| d.label == identity_label) {
                match recognizer.recognize(input, width, height, detection) {
                    Ok(Some(found)) => detection.set_identity(
                        found.identity,
                        found.distance,
                        found.person_id,
                        found.face_id,
                    ),
                    Ok(None) => {}
                    Err(e) => warn!("identity recognition failed: {}", e),
                }
            }
        }

        Ok(self.tracker.update(detections))
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Get a reference to the recognizer, if one is attached.
    pub fn recognizer(&self) -> Option<&R> {
        self.recognizer.as_ref()
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &TrackManager {
        &self.tracker
    }

    /// Get a mutable reference to the underlying tracker.
    pub fn tracker_mut(&mut self) -> &mut TrackManager {
        &mut self.tracker
    }
}
