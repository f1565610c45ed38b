//! Integration module for connecting detector and recognizer backends with
//! the tracker.
//!
//! Inference itself happens outside this crate; these traits are the seams
//! a backend implements to feed a [`TrackerPipeline`].

mod builder;
mod counter;
mod detector;
mod pipeline;

pub use builder::DetectionBuilder;
pub use counter::{FrameCount, ObjectCounter, Region};
pub use detector::{DetectionSource, IdentityMatch, IdentitySource, IntoDetections};
pub use pipeline::TrackerPipeline;
