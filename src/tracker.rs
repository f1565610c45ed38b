mod detection;
mod history;
mod kalman_filter;
mod matching;
mod rect;
mod track;
mod track_manager;
mod track_state;

pub use detection::{Detection, IDENTITY_UNKNOWN_DISTANCE, TrackedDetection};
pub use history::History;
pub use kalman_filter::{
    KalmanFilter, Measurement, MeasurementCovariance, StateCovariance, StateMean, chi2inv95,
};
pub use matching::{
    Associator, AssignmentResult, INFTY_COST, appearance_distance, gate_cost_matrix,
    iou_distance, linear_assignment,
};
pub use rect::Rect;
pub use track::{Track, TrackParams};
pub use track_manager::{TrackManager, TrackerConfig};
pub use track_state::TrackState;
