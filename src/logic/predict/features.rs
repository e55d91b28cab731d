//! Sensor feature extraction and contribution rules
//!
//! Features come from the sensor directory plus the event store; the fixed
//! rule set converts them into probability contributions.

use chrono::{Duration, Utc};

use crate::models::{SensorInfo, SensorStatus};
use crate::repo::EventStore;

use super::types::{ImpactLevel, PredictionFactor};

/// Alert count above this starts contributing
const ALERT_COUNT_FLOOR: usize = 5;

/// Feature vector for one sensor
#[derive(Debug, Clone)]
pub struct SensorFeatures {
    pub status: SensorStatus,
    pub uptime: f64,
    pub data_quality: f64,
    pub age_days: i64,
    pub last_heartbeat_hours: f64,
    pub alerts_last_week: usize,
}

impl SensorFeatures {
    pub fn extract(sensor: &SensorInfo, events: &dyn EventStore) -> Self {
        let now = Utc::now();
        let last_heartbeat_hours = sensor
            .last_heartbeat
            .map(|hb| (now - hb).num_seconds() as f64 / 3600.0)
            .unwrap_or(0.0)
            .max(0.0);

        Self {
            status: sensor.status,
            uptime: sensor.uptime_percentage,
            data_quality: sensor.data_quality_score,
            age_days: (now - sensor.created_at).num_days(),
            last_heartbeat_hours,
            alerts_last_week: events
                .count_sensor_alerts_since(sensor.id, now - Duration::days(7)),
        }
    }
}

/// Apply the fixed contribution rules; returns (clamped base probability, factors)
pub fn failure_probability(features: &SensorFeatures) -> (f64, Vec<PredictionFactor>) {
    let mut probability = 0.0f64;
    let mut factors = Vec::new();

    match features.status {
        SensorStatus::Offline => {
            probability += 0.8;
            factors.push(PredictionFactor {
                factor: "sensor_offline".to_string(),
                value: "true".to_string(),
                impact: ImpactLevel::Critical,
                contribution: 0.8,
            });
        }
        SensorStatus::Fault => {
            probability += 0.9;
            factors.push(PredictionFactor {
                factor: "sensor_fault".to_string(),
                value: "true".to_string(),
                impact: ImpactLevel::Critical,
                contribution: 0.9,
            });
        }
        SensorStatus::Degraded => {
            probability += 0.4;
            factors.push(PredictionFactor {
                factor: "sensor_degraded".to_string(),
                value: "true".to_string(),
                impact: ImpactLevel::Medium,
                contribution: 0.4,
            });
        }
        SensorStatus::Online | SensorStatus::Maintenance => {}
    }

    if features.uptime < 90.0 {
        let contribution = (90.0 - features.uptime) / 100.0 * 0.3;
        probability += contribution;
        factors.push(PredictionFactor {
            factor: "low_uptime".to_string(),
            value: format!("{:.1}%", features.uptime),
            impact: ImpactLevel::Medium,
            contribution,
        });
    }

    if features.data_quality < 0.8 {
        let contribution = (0.8 - features.data_quality) * 0.2;
        probability += contribution;
        factors.push(PredictionFactor {
            factor: "poor_data_quality".to_string(),
            value: format!("{:.2}", features.data_quality),
            impact: ImpactLevel::Low,
            contribution,
        });
    }

    if features.last_heartbeat_hours > 1.0 {
        let contribution = (features.last_heartbeat_hours / 24.0 * 0.5).min(0.5);
        probability += contribution;
        factors.push(PredictionFactor {
            factor: "stale_heartbeat".to_string(),
            value: format!("{:.1}h ago", features.last_heartbeat_hours),
            impact: if features.last_heartbeat_hours > 6.0 {
                ImpactLevel::High
            } else {
                ImpactLevel::Medium
            },
            contribution,
        });
    }

    if features.alerts_last_week > ALERT_COUNT_FLOOR {
        let contribution = (features.alerts_last_week as f64 / 20.0 * 0.3).min(0.3);
        probability += contribution;
        factors.push(PredictionFactor {
            factor: "high_alert_frequency".to_string(),
            value: format!("{} alerts", features.alerts_last_week),
            impact: ImpactLevel::Medium,
            contribution,
        });
    }

    (probability.clamp(0.0, 1.0), factors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(status: SensorStatus) -> SensorFeatures {
        SensorFeatures {
            status,
            uptime: 99.0,
            data_quality: 1.0,
            age_days: 100,
            last_heartbeat_hours: 0.1,
            alerts_last_week: 0,
        }
    }

    #[test]
    fn test_healthy_sensor_scores_zero() {
        let (probability, factors) = failure_probability(&features(SensorStatus::Online));
        assert_eq!(probability, 0.0);
        assert!(factors.is_empty());
    }

    #[test]
    fn test_fault_dominates() {
        let (probability, factors) = failure_probability(&features(SensorStatus::Fault));
        assert!((probability - 0.9).abs() < 1e-9);
        assert_eq!(factors[0].factor, "sensor_fault");
        assert_eq!(factors[0].impact, ImpactLevel::Critical);
    }

    #[test]
    fn test_contributions_accumulate_and_clamp() {
        let f = SensorFeatures {
            status: SensorStatus::Offline,
            uptime: 50.0,
            data_quality: 0.2,
            age_days: 900,
            last_heartbeat_hours: 48.0,
            alerts_last_week: 40,
        };
        let (probability, factors) = failure_probability(&f);
        assert_eq!(probability, 1.0);
        assert_eq!(factors.len(), 5);
        // stale heartbeat contribution is capped at 0.5
        let hb = factors.iter().find(|f| f.factor == "stale_heartbeat").unwrap();
        assert!((hb.contribution - 0.5).abs() < 1e-9);
        // alert contribution capped at 0.3
        let alerts = factors
            .iter()
            .find(|f| f.factor == "high_alert_frequency")
            .unwrap();
        assert!((alerts.contribution - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_uptime_rule_boundary() {
        let mut f = features(SensorStatus::Online);
        f.uptime = 90.0;
        let (probability, _) = failure_probability(&f);
        assert_eq!(probability, 0.0);

        f.uptime = 80.0;
        let (probability, factors) = failure_probability(&f);
        assert!((probability - 0.03).abs() < 1e-9);
        assert_eq!(factors[0].factor, "low_uptime");
    }
}
