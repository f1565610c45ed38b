//! Deep SORT multi-object tracking.
//!
//! Detections come in per frame, tracks with stable identifiers come out.
//! The core lives in [`tracker`]; [`integration`] connects detector and
//! recognizer backends to it.

pub mod error;
pub mod integration;
pub mod tracker;

pub use error::ConfigError;
pub use integration::{
    DetectionBuilder, DetectionSource, FrameCount, IdentityMatch, IdentitySource,
    IntoDetections, ObjectCounter, Region, TrackerPipeline,
};
pub use tracker::{
    Associator, Detection, KalmanFilter, Rect, Track, TrackManager, TrackState,
    TrackedDetection, TrackerConfig,
};
