//! Detectors
//!
//! The closed set of detection methods behind one interface. Each detector
//! either fires with a `DetectionHit` or stays silent; insufficient history
//! or missing bounds silently skip the method (graceful degradation).

use std::collections::{HashMap, VecDeque};

use crate::models::{Reading, ThresholdProfile};

use super::outlier::OutlierModel;
use super::rules::{
    MIN_RATE_HISTORY, RATE_SCORE_BASE, RATE_SCORE_SPAN, THRESHOLD_SCORE_BASE, THRESHOLD_SCORE_SPAN,
};
use super::types::{ContributionKind, DetectionHit, DetectionMethod, FeatureContribution};

/// Everything a detector may look at for one reading
pub struct DetectionContext<'a> {
    pub values: &'a HashMap<String, f64>,
    pub thresholds: &'a ThresholdProfile,
    pub history: &'a VecDeque<Reading>,
    pub model: Option<&'a OutlierModel>,
}

pub trait Detector {
    fn evaluate(&self, ctx: &DetectionContext<'_>) -> Option<DetectionHit>;
}

/// Channels in deterministic order (map iteration order is not)
fn sorted_channels(values: &HashMap<String, f64>) -> Vec<(&String, f64)> {
    let mut channels: Vec<(&String, f64)> = values.iter().map(|(k, v)| (k, *v)).collect();
    channels.sort_by(|a, b| a.0.cmp(b.0));
    channels
}

// ============================================================================
// THRESHOLD DETECTOR
// ============================================================================

pub struct ThresholdDetector;

impl Detector for ThresholdDetector {
    fn evaluate(&self, ctx: &DetectionContext<'_>) -> Option<DetectionHit> {
        let mut features = Vec::new();
        let mut max_score = 0.0f64;

        for (key, value) in sorted_channels(ctx.values) {
            if !value.is_finite() {
                continue;
            }

            if let Some(min) = ctx.thresholds.min {
                if value < min {
                    let severity = if min != 0.0 {
                        ((min - value) / min.abs()).min(1.0)
                    } else {
                        1.0
                    };
                    features.push(FeatureContribution {
                        feature: key.clone(),
                        value,
                        severity,
                        kind: ContributionKind::BelowMinimum { threshold: min },
                    });
                    max_score =
                        max_score.max((THRESHOLD_SCORE_BASE + severity * THRESHOLD_SCORE_SPAN).min(1.0));
                }
            }

            if let Some(max) = ctx.thresholds.max {
                if value > max {
                    let severity = if max != 0.0 {
                        ((value - max) / max.abs()).min(1.0)
                    } else {
                        1.0
                    };
                    features.push(FeatureContribution {
                        feature: key.clone(),
                        value,
                        severity,
                        kind: ContributionKind::AboveMaximum { threshold: max },
                    });
                    max_score =
                        max_score.max((THRESHOLD_SCORE_BASE + severity * THRESHOLD_SCORE_SPAN).min(1.0));
                }
            }
        }

        if features.is_empty() {
            return None;
        }

        Some(DetectionHit {
            method: DetectionMethod::Threshold,
            score: max_score,
            features,
        })
    }
}

// ============================================================================
// RATE-OF-CHANGE DETECTOR
// ============================================================================

pub struct RateOfChangeDetector;

impl Detector for RateOfChangeDetector {
    fn evaluate(&self, ctx: &DetectionContext<'_>) -> Option<DetectionHit> {
        if ctx.history.len() < MIN_RATE_HISTORY {
            return None;
        }
        let rate = ctx.thresholds.rate?;
        let previous = &ctx.history.back()?.values;

        let mut features = Vec::new();
        let mut max_score = 0.0f64;

        for (key, value) in sorted_channels(ctx.values) {
            if !value.is_finite() {
                continue;
            }
            let Some(prev) = previous.get(key).copied() else {
                continue;
            };

            let change = (value - prev).abs();
            if change > rate {
                let severity = if rate > 0.0 {
                    ((change - rate) / rate).min(1.0)
                } else {
                    1.0
                };
                features.push(FeatureContribution {
                    feature: key.clone(),
                    value,
                    severity,
                    kind: ContributionKind::RapidChange {
                        previous_value: prev,
                        change,
                        threshold: rate,
                    },
                });
                max_score = max_score.max((RATE_SCORE_BASE + severity * RATE_SCORE_SPAN).min(1.0));
            }
        }

        if features.is_empty() {
            return None;
        }

        Some(DetectionHit {
            method: DetectionMethod::RateOfChange,
            score: max_score,
            features,
        })
    }
}

// ============================================================================
// MULTIVARIATE OUTLIER DETECTOR
// ============================================================================

pub struct OutlierDetector;

impl Detector for OutlierDetector {
    fn evaluate(&self, ctx: &DetectionContext<'_>) -> Option<DetectionHit> {
        let model = ctx.model?;
        let verdict = model.evaluate(ctx.values);

        if !verdict.is_outlier {
            return None;
        }

        Some(DetectionHit {
            method: DetectionMethod::MultivariateOutlier,
            score: verdict.score,
            features: verdict.features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn profile(min: f64, max: f64, rate: f64) -> ThresholdProfile {
        ThresholdProfile {
            min: Some(min),
            max: Some(max),
            rate: Some(rate),
        }
    }

    fn ctx<'a>(
        v: &'a HashMap<String, f64>,
        t: &'a ThresholdProfile,
        h: &'a VecDeque<Reading>,
    ) -> DetectionContext<'a> {
        DetectionContext {
            values: v,
            thresholds: t,
            history: h,
            model: None,
        }
    }

    #[test]
    fn test_threshold_above_maximum_fires() {
        let v = values(&[("temp", 100.0)]);
        let t = profile(-40.0, 85.0, 5.0);
        let h = VecDeque::new();

        let hit = ThresholdDetector.evaluate(&ctx(&v, &t, &h)).unwrap();
        assert!(hit.score >= 0.5);
        assert_eq!(hit.features.len(), 1);
        assert!(matches!(
            hit.features[0].kind,
            ContributionKind::AboveMaximum { threshold } if threshold == 85.0
        ));
    }

    #[test]
    fn test_threshold_within_bounds_is_silent() {
        let v = values(&[("temp", 25.0)]);
        let t = profile(-40.0, 85.0, 5.0);
        let h = VecDeque::new();

        assert!(ThresholdDetector.evaluate(&ctx(&v, &t, &h)).is_none());
    }

    #[test]
    fn test_threshold_ignores_non_finite_channel() {
        let v = values(&[("temp", f64::NAN), ("load", 120.0)]);
        let t = profile(0.0, 100.0, 5.0);
        let h = VecDeque::new();

        let hit = ThresholdDetector.evaluate(&ctx(&v, &t, &h)).unwrap();
        assert_eq!(hit.features.len(), 1);
        assert_eq!(hit.features[0].feature, "load");
    }

    #[test]
    fn test_rate_requires_history() {
        let v = values(&[("temp", 60.0)]);
        let t = profile(-40.0, 85.0, 5.0);
        let mut h = VecDeque::new();
        h.push_back(Reading {
            sensor_uid: "S-1".into(),
            timestamp: chrono::Utc::now(),
            values: values(&[("temp", 20.0)]),
        });

        // one entry is not enough
        assert!(RateOfChangeDetector.evaluate(&ctx(&v, &t, &h)).is_none());

        h.push_back(Reading {
            sensor_uid: "S-1".into(),
            timestamp: chrono::Utc::now(),
            values: values(&[("temp", 20.0)]),
        });
        let hit = RateOfChangeDetector.evaluate(&ctx(&v, &t, &h)).unwrap();
        assert!(hit.score >= 0.6);
        assert!(matches!(
            hit.features[0].kind,
            ContributionKind::RapidChange { change, .. } if (change - 40.0).abs() < 1e-9
        ));
    }

    #[test]
    fn test_rate_small_change_is_silent() {
        let v = values(&[("temp", 21.0)]);
        let t = profile(-40.0, 85.0, 5.0);
        let mut h = VecDeque::new();
        for _ in 0..2 {
            h.push_back(Reading {
                sensor_uid: "S-1".into(),
                timestamp: chrono::Utc::now(),
                values: values(&[("temp", 20.0)]),
            });
        }

        assert!(RateOfChangeDetector.evaluate(&ctx(&v, &t, &h)).is_none());
    }
}
