//! Detection-to-track association: gated appearance cascade followed by an
//! IoU fallback.

use std::collections::BTreeMap;

use log::trace;
use ndarray::{Array1, Array2};

use crate::tracker::detection::Detection;
use crate::tracker::kalman_filter::{KalmanFilter, Measurement};
use crate::tracker::rect::Rect;
use crate::tracker::track::Track;

/// Cost of a pair that must never be matched.
pub const INFTY_COST: f32 = 1e5;

/// Compute IoU distance matrix between tracks and detections.
pub fn iou_distance(track_boxes: &[Rect], det_boxes: &[Rect]) -> Array2<f32> {
    Array2::from_shape_fn((track_boxes.len(), det_boxes.len()), |(i, j)| {
        1.0 - track_boxes[i].iou(&det_boxes[j])
    })
}

fn cosine_distance(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
    assert_eq!(a.len(), b.len(), "appearance embeddings differ in length");
    let norm = (a.dot(a) * b.dot(b)).sqrt();
    if norm > 0.0 { 1.0 - a.dot(b) / norm } else { 1.0 }
}

/// Smallest cosine distance between each track's feature cache and each
/// detection's embedding. Tracks without features and detections without
/// an embedding get [`INFTY_COST`].
pub fn appearance_distance(tracks: &[&Track], detections: &[&Detection]) -> Array2<f32> {
    Array2::from_shape_fn((tracks.len(), detections.len()), |(i, j)| {
        let Some(feature) = &detections[j].feature else {
            return INFTY_COST;
        };
        tracks[i]
            .features()
            .iter()
            .map(|cached| cosine_distance(cached, feature))
            .fold(INFTY_COST, f32::min)
    })
}

/// Invalidate entries whose Mahalanobis distance exceeds `gating_threshold`.
pub fn gate_cost_matrix(
    cost_matrix: &mut Array2<f32>,
    kalman_filter: &KalmanFilter,
    tracks: &[&Track],
    detections: &[&Detection],
    gating_threshold: f64,
) {
    if detections.is_empty() {
        return;
    }
    let measurements: Vec<Measurement> = detections.iter().map(|d| d.to_measurement()).collect();
    for (row, track) in tracks.iter().enumerate() {
        let distances = kalman_filter.gating_distance(track.mean(), track.covariance(), &measurements);
        for (col, distance) in distances.into_iter().enumerate() {
            if distance > gating_threshold {
                cost_matrix[[row, col]] = INFTY_COST;
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Optimal minimum-cost assignment. Pairs costing more than `thresh` are
/// reported as unmatched.
pub fn linear_assignment(cost_matrix: &Array2<f32>, thresh: f32) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_tracks: (0..num_rows).collect(),
            unmatched_detections: (0..num_cols).collect(),
        };
    }

    // Clamp so infeasible entries cannot skew the optimum among feasible ones.
    let ceiling = thresh as f64 + 1e-5;
    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), ceiling);
    for ((i, j), &cost) in cost_matrix.indexed_iter() {
        padded[[i, j]] = (cost as f64).min(ceiling);
    }

    let mut matches = vec![];
    let mut unmatched_tracks = vec![];
    let mut unmatched_detections_mask = vec![true; num_cols];

    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => {
            for (row_idx, &col_idx) in row_to_col.iter().enumerate().take(num_rows) {
                if col_idx < num_cols && cost_matrix[[row_idx, col_idx]] <= thresh {
                    matches.push((row_idx, col_idx));
                    unmatched_detections_mask[col_idx] = false;
                } else {
                    unmatched_tracks.push(row_idx);
                }
            }
        }
        Err(_) => {
            unmatched_tracks = (0..num_rows).collect();
        }
    }

    let unmatched_detections = unmatched_detections_mask
        .iter()
        .enumerate()
        .filter_map(|(i, &u)| u.then_some(i))
        .collect();

    AssignmentResult {
        matches,
        unmatched_tracks,
        unmatched_detections,
    }
}

/// Two-stage matcher over predicted tracks and one frame's detections.
#[derive(Debug, Clone)]
pub struct Associator {
    /// Appearance cost ceiling for the cascade stage
    pub max_appearance_distance: f32,
    /// Squared Mahalanobis gate, see [`chi2inv95`](crate::tracker::chi2inv95)
    pub gating_threshold: f64,
    /// Pairs overlapping less than this are never matched by IoU
    pub min_iou: f32,
}

impl Default for Associator {
    fn default() -> Self {
        Self {
            max_appearance_distance: 0.2,
            gating_threshold: crate::tracker::chi2inv95(4),
            min_iou: 0.3,
        }
    }
}

impl Associator {
    /// Partition `tracks` and `detections` into matched pairs and leftovers.
    /// Indices refer to the input slices.
    pub fn associate(
        &self,
        kalman_filter: &KalmanFilter,
        tracks: &[Track],
        detections: &[Detection],
    ) -> AssignmentResult {
        let mut matches = Vec::new();
        let mut unmatched_detections: Vec<usize> = (0..detections.len()).collect();

        // Stage 1: appearance cascade, most recently updated tracks first.
        let mut buckets: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        let mut leftover_tracks = Vec::new();
        for (idx, track) in tracks.iter().enumerate() {
            if track.features().is_empty() {
                leftover_tracks.push(idx);
            } else {
                buckets.entry(track.time_since_update).or_default().push(idx);
            }
        }

        for (time_since_update, track_indices) in buckets {
            if unmatched_detections.is_empty() {
                leftover_tracks.extend(track_indices);
                continue;
            }
            let (level_matches, level_unmatched_tracks, remaining) = self.appearance_stage(
                kalman_filter,
                tracks,
                detections,
                &track_indices,
                &unmatched_detections,
            );
            trace!(
                "cascade level {}: {} matches out of {} tracks",
                time_since_update,
                level_matches.len(),
                track_indices.len()
            );
            matches.extend(level_matches);
            leftover_tracks.extend(level_unmatched_tracks);
            unmatched_detections = remaining;
        }

        // Stage 2: IoU on whatever is left.
        leftover_tracks.sort_unstable();
        let track_rects: Vec<Rect> = leftover_tracks.iter().map(|&i| tracks[i].rect()).collect();
        let det_rects: Vec<Rect> = unmatched_detections.iter().map(|&j| detections[j].bbox).collect();
        let dists = iou_distance(&track_rects, &det_rects);
        let result = linear_assignment(&dists, 1.0 - self.min_iou);
        trace!("iou stage: {} matches", result.matches.len());

        matches.extend(
            result
                .matches
                .iter()
                .map(|&(r, c)| (leftover_tracks[r], unmatched_detections[c])),
        );
        let unmatched_tracks = result.unmatched_tracks.iter().map(|&r| leftover_tracks[r]).collect();
        let unmatched_detections = result
            .unmatched_detections
            .iter()
            .map(|&c| unmatched_detections[c])
            .collect();

        AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        }
    }

    /// Solve one cascade level. Returns global indices of matches, unmatched
    /// tracks and still-unmatched detections.
    fn appearance_stage(
        &self,
        kalman_filter: &KalmanFilter,
        tracks: &[Track],
        detections: &[Detection],
        track_indices: &[usize],
        detection_indices: &[usize],
    ) -> (Vec<(usize, usize)>, Vec<usize>, Vec<usize>) {
        let level_tracks: Vec<&Track> = track_indices.iter().map(|&i| &tracks[i]).collect();
        let level_dets: Vec<&Detection> = detection_indices.iter().map(|&j| &detections[j]).collect();

        let mut cost = appearance_distance(&level_tracks, &level_dets);
        gate_cost_matrix(
            &mut cost,
            kalman_filter,
            &level_tracks,
            &level_dets,
            self.gating_threshold,
        );

        let AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = linear_assignment(&cost, self.max_appearance_distance);

        (
            matches
                .into_iter()
                .map(|(r, c)| (track_indices[r], detection_indices[c]))
                .collect(),
            unmatched_tracks.into_iter().map(|r| track_indices[r]).collect(),
            unmatched_detections
                .into_iter()
                .map(|c| detection_indices[c])
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::track::TrackParams;
    use ndarray::{array, Array2};

    fn det(x: f32, y: f32, feature: Option<Array1<f32>>) -> Detection {
        let d = Detection::new("person", 0.9, Rect::new(x, y, 40.0, 80.0));
        match feature {
            Some(f) => d.with_feature(f),
            None => d,
        }
    }

    fn track(id: u64, detection: &Detection, kf: &KalmanFilter) -> Track {
        let (mean, cov) = kf.initiate(&detection.to_measurement());
        Track::new(mean, cov, id, TrackParams::default(), detection)
    }

    #[test]
    fn test_linear_assignment_basic() {
        let cost = array![[0.1, 0.9], [0.8, 0.2]];
        let result = linear_assignment(&cost, 0.5);
        assert_eq!(result.matches, vec![(0, 0), (1, 1)]);
        assert!(result.unmatched_tracks.is_empty());
        assert!(result.unmatched_detections.is_empty());
    }

    #[test]
    fn test_linear_assignment_prefers_global_optimum() {
        // Greedy would take (0, 0) at 0.1 and force (1, 1) at 0.9.
        let cost = array![[0.1, 0.2], [0.15, 0.9]];
        let result = linear_assignment(&cost, 1.0);
        assert_eq!(result.matches, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_linear_assignment_rejects_above_threshold() {
        let cost = array![[0.9]];
        let result = linear_assignment(&cost, 0.5);
        assert!(result.matches.is_empty());
        assert_eq!(result.unmatched_tracks, vec![0]);
        assert_eq!(result.unmatched_detections, vec![0]);
    }

    #[test]
    fn test_linear_assignment_rectangular() {
        let cost = array![[0.3, 0.1, 0.7]];
        let result = linear_assignment(&cost, 0.5);
        assert_eq!(result.matches, vec![(0, 1)]);
        assert_eq!(result.unmatched_detections, vec![0, 2]);
    }

    #[test]
    fn test_linear_assignment_empty() {
        let result = linear_assignment(&Array2::zeros((0, 3)), 0.5);
        assert!(result.matches.is_empty());
        assert_eq!(result.unmatched_detections, vec![0, 1, 2]);

        let result = linear_assignment(&Array2::zeros((2, 0)), 0.5);
        assert_eq!(result.unmatched_tracks, vec![0, 1]);
    }

    #[test]
    fn test_appearance_distance_uses_nearest_cached_feature() {
        let kf = KalmanFilter::new();
        let first = det(0.0, 0.0, Some(array![1.0, 0.0]));
        let mut t = track(1, &first, &kf);
        t.predict(&kf);
        t.update(&kf, &det(0.0, 0.0, Some(array![0.0, 1.0])));

        let query = det(0.0, 0.0, Some(array![0.0, 2.0]));
        let cost = appearance_distance(&[&t], &[&query, &det(0.0, 0.0, None)]);
        assert!(cost[[0, 0]].abs() < 1e-6);
        assert_eq!(cost[[0, 1]], INFTY_COST);
    }

    #[test]
    fn test_gate_rejects_distant_detections() {
        let kf = KalmanFilter::new();
        let origin = det(100.0, 100.0, None);
        let t = track(1, &origin, &kf);
        let far = det(600.0, 100.0, None);
        let mut cost = Array2::zeros((1, 2));
        gate_cost_matrix(&mut cost, &kf, &[&t], &[&origin, &far], chi2inv95_4());
        assert_eq!(cost[[0, 0]], 0.0);
        assert_eq!(cost[[0, 1]], INFTY_COST);
    }

    fn chi2inv95_4() -> f64 {
        crate::tracker::chi2inv95(4)
    }

    #[test]
    fn test_associate_empty_inputs() {
        let kf = KalmanFilter::new();
        let associator = Associator::default();

        let result = associator.associate(&kf, &[], &[]);
        assert_eq!(result, AssignmentResult::default());

        let d = det(0.0, 0.0, None);
        let result = associator.associate(&kf, &[], std::slice::from_ref(&d));
        assert_eq!(result.unmatched_detections, vec![0]);

        let t = track(1, &d, &kf);
        let result = associator.associate(&kf, &[t], &[]);
        assert_eq!(result.unmatched_tracks, vec![0]);
    }

    #[test]
    fn test_cascade_keeps_lowest_cost_pairs() {
        let kf = KalmanFilter::new();
        let d1 = det(100.0, 100.0, Some(array![1.0, 0.0, 0.0]));
        let d2 = det(120.0, 100.0, Some(array![0.0, 1.0, 0.0]));

        let t1 = track(1, &d1, &kf);
        let mut t2 = track(2, &d2, &kf);
        for _ in 0..3 {
            t2.predict(&kf);
        }
        assert_eq!(t1.time_since_update, 0);
        assert_eq!(t2.time_since_update, 3);

        let query1 = det(101.0, 100.0, Some(array![0.99, 0.05, 0.0]));
        let query2 = det(119.0, 100.0, Some(array![0.05, 0.99, 0.0]));
        let result = Associator::default().associate(&kf, &[t1, t2], &[query1, query2]);

        let mut matches = result.matches.clone();
        matches.sort_unstable();
        assert_eq!(matches, vec![(0, 0), (1, 1)]);
        assert!(result.unmatched_tracks.is_empty());
        assert!(result.unmatched_detections.is_empty());
    }

    #[test]
    fn test_recent_track_gets_first_pick() {
        let kf = KalmanFilter::new();
        let d = det(100.0, 100.0, Some(array![1.0, 0.0]));
        let recent = track(1, &d, &kf);
        let mut stale = track(2, &d, &kf);
        for _ in 0..4 {
            stale.predict(&kf);
        }

        // Stale track is listed first but must not steal the detection.
        let result = Associator::default().associate(&kf, &[stale, recent], &[d.clone()]);
        assert_eq!(result.matches, vec![(1, 0)]);
        assert_eq!(result.unmatched_tracks, vec![0]);
    }

    #[test]
    fn test_detection_without_feature_falls_back_to_iou() {
        let kf = KalmanFilter::new();
        let seed = det(100.0, 100.0, Some(array![1.0, 0.0]));
        let t = track(1, &seed, &kf);

        let plain = det(102.0, 101.0, None);
        let result = Associator::default().associate(&kf, &[t], &[plain]);
        assert_eq!(result.matches, vec![(0, 0)]);
    }

    #[test]
    fn test_iou_floor_rejects_weak_overlap() {
        let kf = KalmanFilter::new();
        let seed = det(100.0, 100.0, None);
        let t = track(1, &seed, &kf);

        let shifted = det(135.0, 100.0, None);
        let result = Associator::default().associate(&kf, &[t], &[shifted]);
        assert!(result.matches.is_empty());
        assert_eq!(result.unmatched_tracks, vec![0]);
        assert_eq!(result.unmatched_detections, vec![0]);
    }
}
