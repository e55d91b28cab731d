//! Failure Predictor
//!
//! Rule-weighted failure probability for a single sensor or a whole site,
//! adjusted by the requested prediction horizon. Read-only against the
//! repositories; no state survives a call.

pub mod features;
pub mod types;

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::repo::{EventStore, SensorDirectory};

use features::{failure_probability, SensorFeatures};

pub use types::{FailurePrediction, ImpactLevel, PredictionFactor};

/// Horizon normalization constant: one week in hours
const HORIZON_FULL_HOURS: f64 = 168.0;

/// Site-level rule floors
const OFFLINE_RATIO_FLOOR: f64 = 0.1;
const DEGRADED_RATIO_FLOOR: f64 = 0.2;
const SITE_ALERT_FLOOR: usize = 10;

pub struct FailurePredictor {
    sensors: Arc<dyn SensorDirectory>,
    events: Arc<dyn EventStore>,
}

impl FailurePredictor {
    pub fn new(sensors: Arc<dyn SensorDirectory>, events: Arc<dyn EventStore>) -> Self {
        Self { sensors, events }
    }

    /// Predict failure probability within `horizon_hours`.
    ///
    /// With a sensor id the per-sensor path runs; otherwise the whole site
    /// is aggregated.
    pub fn predict(
        &self,
        site_id: Uuid,
        sensor_id: Option<Uuid>,
        horizon_hours: u32,
    ) -> FailurePrediction {
        match sensor_id {
            Some(id) => self.predict_sensor(id, horizon_hours),
            None => self.predict_site(site_id, horizon_hours),
        }
    }

    fn predict_sensor(&self, sensor_id: Uuid, horizon_hours: u32) -> FailurePrediction {
        let Some(sensor) = self.sensors.get_by_id(sensor_id) else {
            return FailurePrediction::empty("Sensor not found");
        };

        let features = SensorFeatures::extract(&sensor, self.events.as_ref());
        let (base, factors) = failure_probability(&features);

        let horizon_factor = (horizon_hours as f64 / HORIZON_FULL_HOURS).min(1.0);
        let probability = (base * (0.5 + 0.5 * horizon_factor)).min(1.0);
        let confidence = (0.5 + 0.2 * factors.len() as f64 / 5.0).min(0.95);

        let predicted_time = if probability > 0.5 {
            let hours_until = horizon_hours as f64 * (1.0 - probability);
            Some(Utc::now() + Duration::seconds((hours_until * 3600.0) as i64))
        } else {
            None
        };

        let explanation = sensor_explanation(&factors, probability, horizon_hours);

        tracing::debug!(
            %sensor_id,
            probability,
            factor_count = factors.len(),
            "sensor failure prediction completed"
        );

        FailurePrediction {
            probability,
            confidence,
            predicted_time,
            factors,
            explanation,
        }
    }

    fn predict_site(&self, site_id: Uuid, horizon_hours: u32) -> FailurePrediction {
        let sensors = self.sensors.list_by_site(site_id);
        if sensors.is_empty() {
            return FailurePrediction::empty("No sensors at site");
        }

        let total = sensors.len() as f64;
        let offline = sensors
            .iter()
            .filter(|s| s.status == crate::models::SensorStatus::Offline)
            .count() as f64;
        let degraded = sensors
            .iter()
            .filter(|s| s.status == crate::models::SensorStatus::Degraded)
            .count() as f64;

        let offline_ratio = offline / total;
        let degraded_ratio = degraded / total;

        let mut factors = Vec::new();

        if offline_ratio > OFFLINE_RATIO_FLOOR {
            factors.push(PredictionFactor {
                factor: "high_offline_rate".to_string(),
                value: format!("{:.1}%", offline_ratio * 100.0),
                impact: ImpactLevel::High,
                contribution: offline_ratio * 0.4,
            });
        }

        if degraded_ratio > DEGRADED_RATIO_FLOOR {
            factors.push(PredictionFactor {
                factor: "sensor_degradation".to_string(),
                value: format!("{:.1}%", degraded_ratio * 100.0),
                impact: ImpactLevel::Medium,
                contribution: degraded_ratio * 0.3,
            });
        }

        let recent_alerts = self
            .events
            .count_alerts_between(site_id, Utc::now() - Duration::hours(24), Utc::now());
        if recent_alerts > SITE_ALERT_FLOOR {
            factors.push(PredictionFactor {
                factor: "high_alert_frequency".to_string(),
                value: format!("{} in 24h", recent_alerts),
                impact: ImpactLevel::High,
                contribution: (recent_alerts as f64 / 20.0).min(0.5),
            });
        }

        let probability = factors
            .iter()
            .map(|f| f.contribution)
            .sum::<f64>()
            .clamp(0.0, 1.0);

        let mean_quality =
            sensors.iter().map(|s| s.data_quality_score).sum::<f64>() / total;
        let confidence = (0.5 + mean_quality * 0.4).min(0.95);

        let explanation = site_explanation(&factors, horizon_hours);

        FailurePrediction {
            probability,
            confidence,
            predicted_time: None,
            factors,
            explanation,
        }
    }
}

fn sensor_explanation(
    factors: &[PredictionFactor],
    probability: f64,
    horizon_hours: u32,
) -> String {
    let risk_tier = if probability < 0.2 {
        "Low"
    } else if probability < 0.5 {
        "Moderate"
    } else if probability < 0.8 {
        "High"
    } else {
        "Critical"
    };

    let mut explanation = format!(
        "{} failure risk ({:.1}%) within {} hours. ",
        risk_tier,
        probability * 100.0,
        horizon_hours
    );

    if let Some(top) = factors.iter().max_by(|a, b| {
        a.contribution
            .partial_cmp(&b.contribution)
            .unwrap_or(std::cmp::Ordering::Equal)
    }) {
        explanation.push_str(&format!(
            "Primary concern: {} ({}). ",
            top.factor.replace('_', " "),
            top.value
        ));
    }

    if probability > 0.5 {
        explanation.push_str("Recommend immediate inspection and preventive maintenance.");
    } else if probability > 0.2 {
        explanation.push_str("Schedule maintenance at next opportunity.");
    } else {
        explanation.push_str("Continue normal monitoring.");
    }

    explanation
}

fn site_explanation(factors: &[PredictionFactor], horizon_hours: u32) -> String {
    if factors.is_empty() {
        return format!(
            "Low failure risk for the next {} hours. All systems normal.",
            horizon_hours
        );
    }

    let total_risk: f64 = factors.iter().map(|f| f.contribution).sum();
    let mut explanation = format!("Site failure analysis for next {}h: ", horizon_hours);
    if total_risk > 0.5 {
        explanation.push_str("ELEVATED RISK detected. ");
    } else {
        explanation.push_str("Normal risk levels. ");
    }

    let names: Vec<String> = factors
        .iter()
        .map(|f| f.factor.replace('_', " "))
        .collect();
    explanation.push_str(&format!("Key factors: {}.", names.join(", ")));

    explanation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertRecord, AlertSeverity, SensorInfo, SensorStatus, SensorType};
    use crate::repo::{InMemoryEventStore, InMemorySensorDirectory};

    fn sensor(site_id: Uuid, uid: &str, status: SensorStatus) -> SensorInfo {
        SensorInfo {
            id: Uuid::new_v4(),
            sensor_uid: uid.to_string(),
            site_id,
            sensor_type: SensorType::Vibration,
            status,
            thresholds: None,
            data_quality_score: 1.0,
            uptime_percentage: 100.0,
            is_active: true,
            created_at: Utc::now() - Duration::days(30),
            last_heartbeat: Some(Utc::now()),
        }
    }

    fn predictor() -> (
        FailurePredictor,
        Arc<InMemorySensorDirectory>,
        Arc<InMemoryEventStore>,
    ) {
        let sensors = Arc::new(InMemorySensorDirectory::new());
        let events = Arc::new(InMemoryEventStore::new());
        let predictor = FailurePredictor::new(sensors.clone(), events.clone());
        (predictor, sensors, events)
    }

    #[test]
    fn test_unknown_sensor_yields_empty_prediction() {
        let (predictor, _, _) = predictor();
        let prediction = predictor.predict(Uuid::new_v4(), Some(Uuid::new_v4()), 24);
        assert_eq!(prediction.probability, 0.0);
        assert_eq!(prediction.confidence, 0.0);
        assert_eq!(prediction.explanation, "Sensor not found");
    }

    #[test]
    fn test_faulty_sensor_predicts_failure_time() {
        let (predictor, sensors, _) = predictor();
        let site_id = Uuid::new_v4();
        let s = sensor(site_id, "S-1", SensorStatus::Fault);
        let sensor_id = s.id;
        sensors.register(s);

        let prediction = predictor.predict(site_id, Some(sensor_id), 168);
        // base 0.9, full horizon => probability 0.9
        assert!((prediction.probability - 0.9).abs() < 1e-9);
        assert!(prediction.predicted_time.is_some());
        assert!(prediction.explanation.starts_with("Critical"));
    }

    #[test]
    fn test_horizon_scales_probability() {
        let (predictor, sensors, _) = predictor();
        let site_id = Uuid::new_v4();
        let s = sensor(site_id, "S-1", SensorStatus::Degraded);
        let sensor_id = s.id;
        sensors.register(s);

        let short = predictor.predict(site_id, Some(sensor_id), 24);
        let long = predictor.predict(site_id, Some(sensor_id), 168);
        assert!(short.probability < long.probability);
        // 0.4 * (0.5 + 0.5 * 24/168)
        let expected_short = 0.4 * (0.5 + 0.5 * (24.0 / 168.0));
        assert!((short.probability - expected_short).abs() < 1e-9);
        // below 0.5 => no predicted time
        assert!(short.predicted_time.is_none());
    }

    #[test]
    fn test_site_with_no_sensors_is_explicit_default() {
        let (predictor, _, _) = predictor();
        let prediction = predictor.predict(Uuid::new_v4(), None, 24);
        assert_eq!(prediction.probability, 0.0);
        assert_eq!(prediction.explanation, "No sensors at site");
    }

    #[test]
    fn test_site_aggregates_ratios_and_alerts() {
        let (predictor, sensors, events) = predictor();
        let site_id = Uuid::new_v4();

        // 2 of 5 offline (40%), none degraded
        for i in 0..5 {
            let status = if i < 2 {
                SensorStatus::Offline
            } else {
                SensorStatus::Online
            };
            sensors.register(sensor(site_id, &format!("S-{}", i), status));
        }
        // 12 alerts in the last 24h
        for _ in 0..12 {
            events.append_alert(AlertRecord::new(
                site_id,
                None,
                "rate_anomaly",
                "Spike",
                AlertSeverity::Medium,
                "anomaly_detection",
            ));
        }

        let prediction = predictor.predict(site_id, None, 72);
        let expected = 0.4 * 0.4 + (12.0 / 20.0_f64).min(0.5);
        assert!((prediction.probability - expected).abs() < 1e-9);
        assert_eq!(prediction.factors.len(), 2);
        assert!(prediction.confidence > 0.5);
        assert!(prediction.explanation.contains("ELEVATED RISK"));
    }
}
