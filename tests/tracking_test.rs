use deepsort_rs::tracker::TrackState;
use deepsort_rs::{Detection, DetectionBuilder, TrackManager, TrackerConfig};
use ndarray::array;

fn person(x: f32, feature: [f32; 3]) -> Detection {
    DetectionBuilder::new()
        .tlwh(x, 100.0, 40.0, 80.0)
        .label("person")
        .confidence(0.9)
        .feature(feature.to_vec())
        .build()
}

#[test]
fn test_basic_tracking() {
    let mut tracker = TrackManager::new(TrackerConfig::default()).unwrap();
    let feature = [1.0, 0.0, 0.0];

    let mut id = None;
    for frame in 0..5 {
        let out = tracker.update(vec![person(100.0 + frame as f32 * 3.0, feature)]);
        assert_eq!(out.len(), 1);
        let current = out[0].track_id;
        assert_eq!(*id.get_or_insert(current), current);
        assert_eq!(out[0].trail.len(), frame + 1);
    }
    assert!(tracker.tracks()[0].is_confirmed());

    // Occluded for a few frames, then seen again near its predicted spot.
    for _ in 0..4 {
        assert!(tracker.update(vec![]).is_empty());
    }
    assert_eq!(tracker.tracks().len(), 1);
    assert_eq!(tracker.tracks()[0].time_since_update, 4);

    let out = tracker.update(vec![person(127.0, feature)]);
    assert_eq!(Some(out[0].track_id), id);
    assert_eq!(tracker.tracks()[0].time_since_update, 0);
}

#[test]
fn test_identifiers_strictly_increase() {
    let mut tracker = TrackManager::new(TrackerConfig::default()).unwrap();
    let mut seen = Vec::new();
    for frame in 0..6 {
        // A new object every frame far from the others; every other frame
        // nothing else shows up, so tentative tracks die and ids keep growing.
        let x = frame as f32 * 500.0;
        for d in tracker.update(vec![person(x, [0.0, 0.0, 1.0])]) {
            if seen.last() != Some(&d.track_id) {
                seen.push(d.track_id);
            }
        }
        tracker.update(vec![]);
    }
    assert_eq!(seen, vec![1, 2, 3, 4, 5, 6]);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_confirmed_track_tolerates_max_age_misses() {
    let config = TrackerConfig {
        n_init: 2,
        max_age: 3,
        ..Default::default()
    };
    let mut tracker = TrackManager::new(config).unwrap();
    tracker.update(vec![person(100.0, [1.0, 0.0, 0.0])]);
    tracker.update(vec![person(100.0, [1.0, 0.0, 0.0])]);
    assert_eq!(tracker.tracks()[0].state, TrackState::Confirmed);

    for _ in 0..3 {
        tracker.update(vec![]);
        assert_eq!(tracker.tracks().len(), 1);
        assert_eq!(tracker.tracks()[0].state, TrackState::Confirmed);
    }
    tracker.update(vec![]);
    assert!(tracker.tracks().is_empty());
}

#[test]
fn test_crossing_objects_keep_identities() {
    let mut tracker = TrackManager::new(TrackerConfig::default()).unwrap();
    let a = [1.0, 0.0, 0.0];
    let b = [0.0, 1.0, 0.0];

    for frame in 0..20 {
        let step = frame as f32 * 10.0;
        let out = tracker.update(vec![person(step, a), person(200.0 - step, b)]);
        assert_eq!(out[0].track_id, 1, "frame {frame}");
        assert_eq!(out[1].track_id, 2, "frame {frame}");
    }
    assert_eq!(tracker.confirmed_tracks().count(), 2);
}

#[test]
fn test_identity_refined_through_tracker() {
    let mut tracker = TrackManager::new(TrackerConfig::default()).unwrap();
    let mut refined = Vec::new();
    for (i, distance) in [0.5, 0.3, 0.2, 0.22, 0.15].into_iter().enumerate() {
        let mut det = person(100.0, [1.0, 0.0, 0.0]);
        det.set_identity(format!("face-{i}"), distance, None, Some(format!("img-{i}")));
        let out = tracker.update(vec![det]);
        refined.push(out[0].identity.clone());
        assert_eq!(out[0].track_id, 1);
    }
    assert_eq!(
        refined,
        vec![
            None,
            None,
            Some("face-2".to_string()),
            Some("face-2".to_string()),
            Some("face-4".to_string()),
        ]
    );
    assert_eq!(tracker.tracks()[0].face_id(), Some("img-4"));
}

#[test]
fn test_detection_without_embedding_still_tracks() {
    let mut tracker = TrackManager::new(TrackerConfig::default()).unwrap();
    let first = tracker.update(vec![person(100.0, [1.0, 0.0, 0.0])]);
    let plain = Detection::new("person", 0.8, deepsort_rs::Rect::new(102.0, 100.0, 40.0, 80.0));
    let second = tracker.update(vec![plain]);
    assert_eq!(first[0].track_id, second[0].track_id);
    assert_eq!(tracker.tracks()[0].features().len(), 1);
}

#[test]
fn test_bounded_trail() {
    let config = TrackerConfig {
        trail_length: Some(4),
        ..Default::default()
    };
    let mut tracker = TrackManager::new(config).unwrap();
    let mut last = Vec::new();
    for frame in 0..10 {
        last = tracker.update(vec![person(frame as f32, [1.0, 0.0, 0.0])]);
    }
    assert_eq!(last[0].trail.len(), 4);
    assert_eq!(last[0].trail.last(), Some(&(29.0, 140.0)));
}

#[test]
fn test_config_from_json() {
    let config: TrackerConfig =
        serde_json::from_str(r#"{ "n_init": 1, "max_age": 10, "feature_budget": null }"#).unwrap();
    assert_eq!(config.n_init, 1);
    assert_eq!(config.max_age, 10);
    assert_eq!(config.feature_budget, None);
    assert_eq!(config.identity_label, "person");
    assert!(TrackManager::new(config).is_ok());

    let embedding = array![0.5f32, 0.5];
    let det = Detection::new("car", 0.5, deepsort_rs::Rect::default()).with_feature(embedding);
    assert!(det.feature.is_some());
}
