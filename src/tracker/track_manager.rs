//! Per-frame tracking cycle: predict, associate, update, spawn, prune.

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tracker::detection::{Detection, TrackedDetection};
use crate::tracker::kalman_filter::{KalmanFilter, chi2inv95};
use crate::tracker::matching::{AssignmentResult, Associator};
use crate::tracker::track::{Track, TrackParams};

/// Configuration for the [`TrackManager`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Hits before a tentative track is confirmed
    pub n_init: u32,
    /// Consecutive misses a confirmed track survives
    pub max_age: u32,
    pub identity_threshold: f32,
    pub identity_label: String,
    /// Cosine distance ceiling for the appearance stage
    pub max_appearance_distance: f32,
    /// Squared Mahalanobis gate for the appearance stage
    pub gating_threshold: f64,
    /// Minimum overlap for the IoU stage
    pub min_iou: f32,
    pub feature_budget: Option<usize>,
    pub trail_length: Option<usize>,
    pub std_weight_position: f64,
    pub std_weight_velocity: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            n_init: 3,
            max_age: 30,
            identity_threshold: 0.25,
            identity_label: "person".to_string(),
            max_appearance_distance: 0.2,
            gating_threshold: chi2inv95(4),
            min_iou: 0.3,
            feature_budget: Some(100),
            trail_length: None,
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
        }
    }
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_init == 0 {
            return Err(ConfigError::ZeroInit);
        }
        if self.max_age == 0 {
            return Err(ConfigError::ZeroMaxAge);
        }
        if self.identity_label.is_empty() {
            return Err(ConfigError::EmptyIdentityLabel);
        }
        check_range("identity_threshold", self.identity_threshold as f64, 0.0, f64::MAX)?;
        check_range(
            "max_appearance_distance",
            self.max_appearance_distance as f64,
            0.0,
            2.0,
        )?;
        check_range("gating_threshold", self.gating_threshold, 0.0, f64::MAX)?;
        check_range("min_iou", self.min_iou as f64, 0.0, 1.0)?;
        check_range("std_weight_position", self.std_weight_position, f64::MIN_POSITIVE, f64::MAX)?;
        check_range("std_weight_velocity", self.std_weight_velocity, f64::MIN_POSITIVE, f64::MAX)?;
        if self.feature_budget == Some(0) {
            return Err(ConfigError::ZeroCapacity("feature_budget"));
        }
        if self.trail_length == Some(0) {
            return Err(ConfigError::ZeroCapacity("trail_length"));
        }
        Ok(())
    }

    fn track_params(&self) -> TrackParams {
        TrackParams {
            n_init: self.n_init,
            max_age: self.max_age,
            identity_threshold: self.identity_threshold,
            identity_label: Arc::from(self.identity_label.as_str()),
            feature_budget: self.feature_budget,
            trail_length: self.trail_length,
        }
    }
}

/// Owns the active track set and issues track identifiers.
pub struct TrackManager {
    tracks: Vec<Track>,
    next_id: u64,
    frame_id: u64,
    config: TrackerConfig,
    params: TrackParams,
    associator: Associator,
    kalman_filter: KalmanFilter,
}

impl TrackManager {
    pub fn new(config: TrackerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            tracks: Vec::new(),
            next_id: 1,
            frame_id: 0,
            params: config.track_params(),
            associator: Associator {
                max_appearance_distance: config.max_appearance_distance,
                gating_threshold: config.gating_threshold,
                min_iou: config.min_iou,
            },
            kalman_filter: KalmanFilter::with_weights(
                config.std_weight_position,
                config.std_weight_velocity,
            ),
            config,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Active tracks, in creation order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn confirmed_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| t.is_confirmed())
    }

    /// Frames processed so far.
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    /// Run one frame through the tracker and annotate each detection with
    /// the track that now owns it. Output order follows the input.
    ///
    /// Detections whose box is not finite or has a non-positive size are
    /// dropped before association and do not appear in the output.
    pub fn update(&mut self, detections: Vec<Detection>) -> Vec<TrackedDetection> {
        self.frame_id += 1;

        let total = detections.len();
        let detections: Vec<Detection> = detections
            .into_iter()
            .filter(|d| d.bbox.is_valid())
            .collect();
        if detections.len() < total {
            debug!(
                "frame {}: dropped {} degenerate detections",
                self.frame_id,
                total - detections.len()
            );
        }

        for track in &mut self.tracks {
            track.predict(&self.kalman_filter);
        }

        let AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = self
            .associator
            .associate(&self.kalman_filter, &self.tracks, &detections);

        let mut owners: Vec<Option<usize>> = vec![None; detections.len()];

        for (itrack, idet) in matches {
            let track = &mut self.tracks[itrack];
            let was_tentative = track.is_tentative();
            track.update(&self.kalman_filter, &detections[idet]);
            if was_tentative && track.is_confirmed() {
                debug!("track {} confirmed", track.track_id);
            }
            owners[idet] = Some(itrack);
        }

        for itrack in unmatched_tracks {
            self.tracks[itrack].mark_missed();
        }

        for idet in unmatched_detections {
            owners[idet] = Some(self.tracks.len());
            self.initiate_track(&detections[idet]);
        }

        let annotated = detections
            .into_iter()
            .zip(owners)
            .map(|(detection, owner)| {
                let track = &self.tracks[owner.expect("every detection is matched or spawned")];
                TrackedDetection {
                    track_id: track.track_id,
                    confirmed: track.is_confirmed(),
                    trail: track.trail().to_vec(),
                    identity: track.identity().map(str::to_owned),
                    identity_distance: track.identity_distance(),
                    person_id: track.person_id().map(str::to_owned),
                    face_id: track.face_id().map(str::to_owned),
                    detection,
                }
            })
            .collect();

        self.tracks.retain(|t| {
            if t.is_deleted() {
                debug!("track {} deleted after {} frames", t.track_id, t.age);
            }
            !t.is_deleted()
        });

        debug!(
            "frame {}: {} active tracks, next id {}",
            self.frame_id,
            self.tracks.len(),
            self.next_id
        );

        annotated
    }

    fn initiate_track(&mut self, detection: &Detection) {
        let (mean, covariance) = self.kalman_filter.initiate(&detection.to_measurement());
        let track_id = self.next_id;
        self.next_id += 1;
        debug!("track {} spawned as {}", track_id, detection.label);
        self.tracks.push(Track::new(
            mean,
            covariance,
            track_id,
            self.params.clone(),
            detection,
        ));
    }
}
