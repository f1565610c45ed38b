//! Single target track.

use std::sync::Arc;

use ndarray::Array1;

use crate::tracker::detection::{Detection, IDENTITY_UNKNOWN_DISTANCE};
use crate::tracker::history::History;
use crate::tracker::kalman_filter::{KalmanFilter, StateCovariance, StateMean};
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

/// Per-track policy, fixed when the track is created.
#[derive(Debug, Clone)]
pub struct TrackParams {
    /// Hits needed before a tentative track is confirmed
    pub n_init: u32,
    /// Misses a confirmed track survives
    pub max_age: u32,
    /// Identity is only replaced by candidates strictly below this distance
    pub identity_threshold: f32,
    /// Only tracks carrying this label refine their identity
    pub identity_label: Arc<str>,
    /// Capacity of the appearance feature cache
    pub feature_budget: Option<usize>,
    /// Capacity of the center-point trail
    pub trail_length: Option<usize>,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            n_init: 3,
            max_age: 30,
            identity_threshold: 0.25,
            identity_label: Arc::from("person"),
            feature_budget: Some(100),
            trail_length: None,
        }
    }
}

/// A single target track with state space `(x, y, a, h)` and velocities.
#[derive(Debug, Clone)]
pub struct Track {
    pub track_id: u64,
    pub state: TrackState,
    /// Frames since creation
    pub age: u32,
    /// Successful measurement updates, including the spawning detection
    pub hits: u32,
    pub time_since_update: u32,
    mean: StateMean,
    covariance: StateCovariance,
    features: History<Array1<f32>>,
    trail: History<(f32, f32)>,
    label: String,
    confidence: f32,
    identity: Option<String>,
    identity_distance: f32,
    person_id: Option<String>,
    face_id: Option<String>,
    params: TrackParams,
}

impl Track {
    /// Start a tentative track from the detection that spawned it.
    pub fn new(
        mean: StateMean,
        covariance: StateCovariance,
        track_id: u64,
        params: TrackParams,
        detection: &Detection,
    ) -> Self {
        let mut track = Self {
            track_id,
            state: TrackState::Tentative,
            age: 1,
            hits: 1,
            time_since_update: 0,
            mean,
            covariance,
            features: History::new(params.feature_budget),
            trail: History::new(params.trail_length),
            label: detection.label.clone(),
            confidence: detection.confidence,
            identity: None,
            identity_distance: IDENTITY_UNKNOWN_DISTANCE,
            person_id: None,
            face_id: None,
            params,
        };
        if let Some(feature) = &detection.feature {
            track.features.push(feature.clone());
        }
        track.refine_identity(detection);
        track.trail.push(detection.center());
        track
    }

    pub fn mean(&self) -> &StateMean {
        &self.mean
    }

    pub fn covariance(&self) -> &StateCovariance {
        &self.covariance
    }

    /// Current box estimate in TLWH format.
    pub fn rect(&self) -> Rect {
        Rect::from_xyah(
            self.mean[0] as f32,
            self.mean[1] as f32,
            self.mean[2] as f32,
            self.mean[3] as f32,
        )
    }

    pub fn to_tlwh(&self) -> [f32; 4] {
        self.rect().to_tlwh()
    }

    pub fn to_tlbr(&self) -> [f32; 4] {
        self.rect().to_tlbr()
    }

    pub fn features(&self) -> &History<Array1<f32>> {
        &self.features
    }

    pub fn trail(&self) -> &History<(f32, f32)> {
        &self.trail
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn identity_distance(&self) -> f32 {
        self.identity_distance
    }

    pub fn person_id(&self) -> Option<&str> {
        self.person_id.as_deref()
    }

    pub fn face_id(&self) -> Option<&str> {
        self.face_id.as_deref()
    }

    pub fn is_tentative(&self) -> bool {
        self.state == TrackState::Tentative
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == TrackState::Confirmed
    }

    pub fn is_deleted(&self) -> bool {
        self.state == TrackState::Deleted
    }

    /// Propagate the state distribution to the current frame.
    pub fn predict(&mut self, kalman_filter: &KalmanFilter) {
        let (mean, covariance) = kalman_filter.predict(&self.mean, &self.covariance);
        self.mean = mean;
        self.covariance = covariance;
        self.age += 1;
        self.time_since_update += 1;
    }

    /// Measurement update with the associated detection.
    pub fn update(&mut self, kalman_filter: &KalmanFilter, detection: &Detection) {
        debug_assert!(!self.is_deleted(), "update on deleted track {}", self.track_id);

        let (mean, covariance) =
            kalman_filter.update(&self.mean, &self.covariance, &detection.to_measurement());
        self.mean = mean;
        self.covariance = covariance;
        if let Some(feature) = &detection.feature {
            self.features.push(feature.clone());
        }

        self.hits += 1;
        self.time_since_update = 0;
        if self.state == TrackState::Tentative && self.hits >= self.params.n_init {
            self.state = TrackState::Confirmed;
        }

        self.label.clone_from(&detection.label);
        self.confidence = detection.confidence;
        self.refine_identity(detection);
        self.trail.push(detection.center());
    }

    /// No detection was associated this frame.
    pub fn mark_missed(&mut self) {
        match self.state {
            TrackState::Tentative => self.delete(),
            TrackState::Confirmed if self.time_since_update > self.params.max_age => self.delete(),
            _ => {}
        }
    }

    fn delete(&mut self) {
        self.state = TrackState::Deleted;
        self.trail.clear();
    }

    /// Adopt the detection's identity only if it strictly improves on the
    /// stored distance and clears the acceptance threshold.
    fn refine_identity(&mut self, detection: &Detection) -> bool {
        if self.label != *self.params.identity_label {
            return false;
        }
        let Some(identity) = &detection.identity else {
            return false;
        };
        let distance = detection.identity_distance;
        if distance < self.identity_distance && distance < self.params.identity_threshold {
            self.identity = Some(identity.clone());
            self.identity_distance = distance;
            self.person_id.clone_from(&detection.person_id);
            self.face_id.clone_from(&detection.face_id);
            true
        } else {
            false
        }
    }
}
