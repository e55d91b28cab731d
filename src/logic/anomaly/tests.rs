use std::collections::HashMap;

use super::types::{AnomalyKind, DetectionMethod};
use super::AnomalyEngine;
use crate::models::SensorType;

fn values(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[test]
fn test_threshold_violation_is_deterministic() {
    // 100 against max 85 must fire regardless of history
    let engine = AnomalyEngine::new(100);

    for _ in 0..5 {
        let result = engine.detect(
            "S-temp",
            &values(&[("temp", 100.0)]),
            SensorType::Temperature,
            None,
        );
        assert!(result.is_anomaly);
        assert_eq!(result.anomaly_type, Some(AnomalyKind::ThresholdViolation));
        assert!(result.score >= 0.5);
    }
}

#[test]
fn test_scores_stay_in_range() {
    let engine = AnomalyEngine::new(100);

    for i in 0..60 {
        let v = values(&[("temp", -100.0 + i as f64 * 17.0), ("humidity", i as f64)]);
        let result = engine.detect("S-range", &v, SensorType::Temperature, None);
        assert!((0.0..=1.0).contains(&result.score));
        assert!((0.0..=1.0).contains(&result.confidence));
        assert!(result.contributing_features.len() <= 5);
    }
}

#[test]
fn test_history_never_exceeds_window() {
    let engine = AnomalyEngine::new(100);

    for i in 0..250 {
        engine.detect(
            "S-hist",
            &values(&[("temp", 20.0 + (i % 3) as f64)]),
            SensorType::Temperature,
            None,
        );
        let expected = std::cmp::min(i + 1, 100);
        assert_eq!(engine.history_len("S-hist"), expected);
    }
}

#[test]
fn test_normal_reading_is_clean() {
    let engine = AnomalyEngine::new(100);

    let result = engine.detect(
        "S-ok",
        &values(&[("temp", 22.0)]),
        SensorType::Temperature,
        None,
    );
    assert!(!result.is_anomaly);
    assert_eq!(result.score, 0.0);
    assert_eq!(result.confidence, 0.95);
    assert!(result.anomaly_type.is_none());
    assert!(result.recommended_action.is_none());
    assert_eq!(result.explanation, "All readings within normal parameters.");
}

#[test]
fn test_first_reading_cannot_rate_fire() {
    // the current reading never contaminates its own baseline
    let engine = AnomalyEngine::new(100);

    let result = engine.detect(
        "S-fresh",
        &values(&[("temp", 50.0)]),
        SensorType::Temperature,
        None,
    );
    assert!(!result
        .detection_methods
        .contains(&DetectionMethod::RateOfChange));
}

#[test]
fn test_sudden_change_fires_after_history() {
    let engine = AnomalyEngine::new(100);

    engine.detect(
        "S-roc",
        &values(&[("temp", 20.0)]),
        SensorType::Temperature,
        None,
    );
    engine.detect(
        "S-roc",
        &values(&[("temp", 20.5)]),
        SensorType::Temperature,
        None,
    );
    // in bounds, but jumps 40 degrees against a rate threshold of 5
    let result = engine.detect(
        "S-roc",
        &values(&[("temp", 60.0)]),
        SensorType::Temperature,
        None,
    );
    assert!(result.is_anomaly);
    assert_eq!(result.anomaly_type, Some(AnomalyKind::SuddenChange));
    assert!(result.score >= 0.6);
}

#[test]
fn test_pattern_anomaly_after_warmup() {
    let engine = AnomalyEngine::new(100);

    // stable baseline around 21, alternating slightly
    for i in 0..30 {
        let v = 21.0 + if i % 2 == 0 { 0.2 } else { -0.2 };
        let result = engine.detect(
            "S-pat",
            &values(&[("temp", v)]),
            SensorType::Temperature,
            None,
        );
        assert!(!result.is_anomaly, "baseline reading {} flagged", i);
    }

    // within threshold bounds and below the rate threshold, but far off
    // the learned baseline
    let result = engine.detect(
        "S-pat",
        &values(&[("temp", 24.5)]),
        SensorType::Temperature,
        None,
    );
    assert!(result.is_anomaly);
    assert_eq!(result.anomaly_type, Some(AnomalyKind::PatternAnomaly));
    assert_eq!(
        result.detection_methods,
        vec![DetectionMethod::MultivariateOutlier]
    );
    assert!(result.score > 0.0 && result.score <= 1.0);
}

#[test]
fn test_confidence_grows_with_fired_methods() {
    let engine = AnomalyEngine::new(100);

    engine.detect(
        "S-conf",
        &values(&[("temp", 20.0)]),
        SensorType::Temperature,
        None,
    );
    engine.detect(
        "S-conf",
        &values(&[("temp", 20.0)]),
        SensorType::Temperature,
        None,
    );
    // violates max (85) and jumps far beyond the rate threshold
    let result = engine.detect(
        "S-conf",
        &values(&[("temp", 120.0)]),
        SensorType::Temperature,
        None,
    );
    assert!(result.detection_methods.len() >= 2);
    let expected = (0.5 + 0.15 * result.detection_methods.len() as f64).min(0.95);
    assert!((result.confidence - expected).abs() < 1e-9);
    assert_eq!(result.anomaly_type, Some(AnomalyKind::ThresholdViolation));
}

#[test]
fn test_recommended_action_tiers() {
    let engine = AnomalyEngine::new(100);

    // severity 1.0 caps the threshold score at 1.0
    let result = engine.detect(
        "S-act",
        &values(&[("temp", 200.0)]),
        SensorType::Temperature,
        None,
    );
    assert!(result.score > 0.8);
    assert!(result
        .recommended_action
        .as_deref()
        .unwrap()
        .starts_with("IMMEDIATE"));
}

#[test]
fn test_sensors_are_independent() {
    let engine = AnomalyEngine::new(100);

    for _ in 0..10 {
        engine.detect(
            "S-a",
            &values(&[("temp", 20.0)]),
            SensorType::Temperature,
            None,
        );
    }
    assert_eq!(engine.history_len("S-a"), 10);
    assert_eq!(engine.history_len("S-b"), 0);
}
