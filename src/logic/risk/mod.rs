//! Risk Aggregator
//!
//! Multi-factor site risk scoring: six fixed-weight factors combined into
//! one overall score, a discrete level, a week-over-week trend and a short
//! list of recommendations. Read-only against the repositories.

pub mod types;

use std::sync::Arc;

use chrono::{Datelike, Duration, Timelike, Utc, Weekday};
use uuid::Uuid;

use crate::models::AlertSeverity;
use crate::repo::{EventStore, SensorDirectory};

pub use types::{RiskAssessment, RiskContext, RiskFactor, RiskFactorKind, RiskLevel, RiskTrend};

/// Factor score above this is material enough to produce an advisory
const MATERIALITY_BAR: f64 = 0.3;

/// Max recommendations returned
const MAX_RECOMMENDATIONS: usize = 5;

const ELEVATED_DIRECTIVE: &str = "IMMEDIATE: Review safety protocols and increase monitoring";

pub struct RiskAggregator {
    sensors: Arc<dyn SensorDirectory>,
    events: Arc<dyn EventStore>,
}

impl RiskAggregator {
    pub fn new(sensors: Arc<dyn SensorDirectory>, events: Arc<dyn EventStore>) -> Self {
        Self { sensors, events }
    }

    /// Compute the full assessment for a site
    pub fn assess(&self, site_id: Uuid, context: Option<&RiskContext>) -> RiskAssessment {
        let risk_factors = vec![
            self.sensor_health_factor(site_id),
            self.active_alerts_factor(site_id),
            self.historical_incidents_factor(site_id),
            anomaly_trend_factor(context),
            environmental_factor(context),
            time_pattern_factor(),
        ];

        let overall_risk = risk_factors
            .iter()
            .map(|f| f.score * f.weight)
            .sum::<f64>()
            .clamp(0.0, 1.0);
        let risk_level = RiskLevel::from_score(overall_risk);
        let trend = self.alert_trend(site_id);
        let recommendations = build_recommendations(&risk_factors, risk_level);

        tracing::debug!(
            %site_id,
            overall_risk,
            level = risk_level.as_str(),
            trend = trend.as_str(),
            "risk assessment completed"
        );

        RiskAssessment {
            overall_risk,
            risk_level,
            risk_factors,
            trend,
            recommendations,
        }
    }

    fn sensor_health_factor(&self, site_id: Uuid) -> RiskFactor {
        let sensors = self.sensors.list_by_site(site_id);
        let kind = RiskFactorKind::SensorHealth;

        if sensors.is_empty() {
            return RiskFactor {
                factor: kind,
                score: 0.5,
                weight: kind.weight(),
                details: "No sensors configured".to_string(),
            };
        }

        let total = sensors.len();
        let unhealthy = sensors.iter().filter(|s| s.status.is_unhealthy()).count();
        let score = ((unhealthy as f64 / total as f64) * 2.0).min(1.0);

        RiskFactor {
            factor: kind,
            score,
            weight: kind.weight(),
            details: format!("{}/{} sensors unhealthy", unhealthy, total),
        }
    }

    fn active_alerts_factor(&self, site_id: Uuid) -> RiskFactor {
        let counts = self.events.active_alert_counts(site_id);
        let kind = RiskFactorKind::ActiveAlerts;

        if counts.is_empty() {
            return RiskFactor {
                factor: kind,
                score: 0.0,
                weight: kind.weight(),
                details: "No active alerts".to_string(),
            };
        }

        let severities = [
            AlertSeverity::Critical,
            AlertSeverity::High,
            AlertSeverity::Medium,
            AlertSeverity::Low,
            AlertSeverity::Info,
        ];

        let weighted: f64 = severities
            .iter()
            .map(|s| *counts.get(s).unwrap_or(&0) as f64 * s.risk_weight())
            .sum();
        let score = (weighted / 10.0).min(1.0);

        let details = severities
            .iter()
            .filter_map(|s| {
                counts
                    .get(s)
                    .map(|count| format!("{}: {}", s.as_str(), count))
            })
            .collect::<Vec<_>>()
            .join(", ");

        RiskFactor {
            factor: kind,
            score,
            weight: kind.weight(),
            details: format!("Active alerts - {}", details),
        }
    }

    fn historical_incidents_factor(&self, site_id: Uuid) -> RiskFactor {
        let now = Utc::now();
        let incidents_30d = self
            .events
            .count_incidents_since(site_id, now - Duration::days(30));
        let incidents_7d = self
            .events
            .count_incidents_since(site_id, now - Duration::days(7));

        let base = (incidents_30d as f64 / 10.0).min(1.0);
        let recency_multiplier = 1.0 + (incidents_7d as f64 / 5.0) * 0.5;
        let score = (base * recency_multiplier).min(1.0);

        RiskFactor {
            factor: RiskFactorKind::HistoricalIncidents,
            score,
            weight: RiskFactorKind::HistoricalIncidents.weight(),
            details: format!(
                "{} incidents in 30 days, {} in last 7 days",
                incidents_30d, incidents_7d
            ),
        }
    }

    fn alert_trend(&self, site_id: Uuid) -> RiskTrend {
        let now = Utc::now();
        let recent = self
            .events
            .count_alerts_between(site_id, now - Duration::days(7), now);
        let previous = self.events.count_alerts_between(
            site_id,
            now - Duration::days(14),
            now - Duration::days(7),
        );

        if recent as f64 > previous as f64 * 1.2 {
            RiskTrend::Increasing
        } else if (recent as f64) < previous as f64 * 0.8 {
            RiskTrend::Decreasing
        } else {
            RiskTrend::Stable
        }
    }
}

fn anomaly_trend_factor(context: Option<&RiskContext>) -> RiskFactor {
    let kind = RiskFactorKind::AnomalyTrend;

    let Some(ctx) = context else {
        return RiskFactor {
            factor: kind,
            score: 0.0,
            weight: kind.weight(),
            details: "No anomaly context available".to_string(),
        };
    };

    let rate = ctx.anomaly_rate.unwrap_or(0.0);
    let increasing = ctx.anomaly_trend_increasing.unwrap_or(false);

    let mut score = (rate * 2.0).min(1.0);
    if increasing {
        score = (score * 1.3).min(1.0);
    }

    RiskFactor {
        factor: kind,
        score,
        weight: kind.weight(),
        details: format!(
            "Anomaly rate: {:.1}%, trending {}",
            rate * 100.0,
            if increasing { "up" } else { "stable" }
        ),
    }
}

fn environmental_factor(context: Option<&RiskContext>) -> RiskFactor {
    let kind = RiskFactorKind::Environmental;

    let Some(ctx) = context else {
        return RiskFactor {
            factor: kind,
            score: 0.1,
            weight: kind.weight(),
            details: "Default environmental risk".to_string(),
        };
    };

    let weather = ctx.weather_risk.unwrap_or(0.0);
    let time = ctx.time_risk.unwrap_or(0.0);
    let load = ctx.load_factor.unwrap_or(0.0);
    let score = (weather * 0.4 + time * 0.3 + load * 0.3).min(1.0);

    RiskFactor {
        factor: kind,
        score,
        weight: kind.weight(),
        details: format!(
            "Weather: {:.2}, Time: {:.2}, Load: {:.2}",
            weather, time, load
        ),
    }
}

fn time_pattern_factor() -> RiskFactor {
    let now = Utc::now();
    let hour = now.hour();
    let weekday = now.weekday();
    let weekend = matches!(weekday, Weekday::Sat | Weekday::Sun);

    let score = if hour >= 22 || hour <= 6 {
        0.6
    } else if weekend {
        0.4
    } else {
        0.1
    };

    RiskFactor {
        factor: RiskFactorKind::TimePattern,
        score,
        weight: RiskFactorKind::TimePattern.weight(),
        details: format!(
            "Hour: {}, Day: {} ({})",
            hour,
            now.weekday().num_days_from_monday(),
            if weekend { "weekend" } else { "weekday" }
        ),
    }
}

fn build_recommendations(factors: &[RiskFactor], level: RiskLevel) -> Vec<String> {
    let mut sorted: Vec<&RiskFactor> = factors.iter().collect();
    sorted.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut recommendations: Vec<String> = sorted
        .iter()
        .take(3)
        .filter(|f| f.score > MATERIALITY_BAR)
        .filter_map(|f| f.factor.advisory().map(String::from))
        .collect();

    if level.is_elevated() {
        recommendations.insert(0, ELEVATED_DIRECTIVE.to_string());
    }

    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertRecord, SensorInfo, SensorStatus, SensorType};
    use crate::repo::{InMemoryEventStore, InMemorySensorDirectory};

    fn sensor(site_id: Uuid, uid: &str, status: SensorStatus) -> SensorInfo {
        SensorInfo {
            id: Uuid::new_v4(),
            sensor_uid: uid.to_string(),
            site_id,
            sensor_type: SensorType::Temperature,
            status,
            thresholds: None,
            data_quality_score: 1.0,
            uptime_percentage: 100.0,
            is_active: true,
            created_at: Utc::now(),
            last_heartbeat: Some(Utc::now()),
        }
    }

    fn aggregator() -> (RiskAggregator, Arc<InMemorySensorDirectory>, Arc<InMemoryEventStore>) {
        let sensors = Arc::new(InMemorySensorDirectory::new());
        let events = Arc::new(InMemoryEventStore::new());
        let aggregator = RiskAggregator::new(sensors.clone(), events.clone());
        (aggregator, sensors, events)
    }

    #[test]
    fn test_sensor_health_reflects_unhealthy_ratio() {
        let (aggregator, sensors, _) = aggregator();
        let site_id = Uuid::new_v4();

        for i in 0..10 {
            let status = if i < 2 {
                SensorStatus::Offline
            } else {
                SensorStatus::Online
            };
            sensors.register(sensor(site_id, &format!("S-{}", i), status));
        }

        let assessment = aggregator.assess(site_id, None);
        let health = &assessment.risk_factors[0];
        assert_eq!(health.factor, RiskFactorKind::SensorHealth);
        assert!((health.score - 0.4).abs() < 1e-9);

        // overall = weighted health + environmental default + time pattern
        let time_score = assessment
            .risk_factors
            .iter()
            .find(|f| f.factor == RiskFactorKind::TimePattern)
            .unwrap()
            .score;
        let expected = 0.4 * 0.20 + 0.1 * 0.10 + time_score * 0.05;
        assert!((assessment.overall_risk - expected).abs() < 1e-9);
    }

    #[test]
    fn test_no_sensors_defaults_to_half() {
        let (aggregator, _, _) = aggregator();
        let assessment = aggregator.assess(Uuid::new_v4(), None);
        let health = &assessment.risk_factors[0];
        assert!((health.score - 0.5).abs() < 1e-9);
        assert_eq!(health.details, "No sensors configured");
    }

    #[test]
    fn test_active_alerts_weighted_score() {
        let (aggregator, _, events) = aggregator();
        let site_id = Uuid::new_v4();

        for _ in 0..2 {
            events.append_alert(AlertRecord::new(
                site_id,
                None,
                "gas_leak",
                "Gas leak",
                AlertSeverity::Critical,
                "manual",
            ));
        }
        events.append_alert(AlertRecord::new(
            site_id,
            None,
            "rate_anomaly",
            "Spike",
            AlertSeverity::High,
            "manual",
        ));

        let assessment = aggregator.assess(site_id, None);
        let alerts = assessment
            .risk_factors
            .iter()
            .find(|f| f.factor == RiskFactorKind::ActiveAlerts)
            .unwrap();
        // (2*1.0 + 1*0.7) / 10
        assert!((alerts.score - 0.27).abs() < 1e-9);
    }

    #[test]
    fn test_overall_risk_clamped() {
        let (aggregator, _, events) = aggregator();
        let site_id = Uuid::new_v4();

        for _ in 0..50 {
            events.append_alert(AlertRecord::new(
                site_id,
                None,
                "fire_detected",
                "Fire",
                AlertSeverity::Critical,
                "manual",
            ));
        }

        let context = RiskContext {
            anomaly_rate: Some(1.0),
            anomaly_trend_increasing: Some(true),
            weather_risk: Some(1.0),
            time_risk: Some(1.0),
            load_factor: Some(1.0),
        };
        let assessment = aggregator.assess(site_id, Some(&context));
        assert!(assessment.overall_risk <= 1.0);
        assert!(assessment.overall_risk >= 0.0);
        for factor in &assessment.risk_factors {
            assert!((0.0..=1.0).contains(&factor.score));
        }
    }

    #[test]
    fn test_trend_increasing_on_alert_growth() {
        let (aggregator, _, events) = aggregator();
        let site_id = Uuid::new_v4();

        // two alerts in the previous week
        for _ in 0..2 {
            let mut alert = AlertRecord::new(
                site_id,
                None,
                "rate_anomaly",
                "Old spike",
                AlertSeverity::Low,
                "manual",
            );
            alert.triggered_at = Utc::now() - Duration::days(10);
            events.append_alert(alert);
        }
        // five this week
        for _ in 0..5 {
            events.append_alert(AlertRecord::new(
                site_id,
                None,
                "rate_anomaly",
                "Fresh spike",
                AlertSeverity::Low,
                "manual",
            ));
        }

        let assessment = aggregator.assess(site_id, None);
        assert_eq!(assessment.trend, RiskTrend::Increasing);
    }

    #[test]
    fn test_elevated_level_prepends_directive() {
        let (aggregator, sensors, events) = aggregator();
        let site_id = Uuid::new_v4();

        for i in 0..4 {
            sensors.register(sensor(site_id, &format!("S-{}", i), SensorStatus::Fault));
        }
        for _ in 0..10 {
            events.append_alert(AlertRecord::new(
                site_id,
                None,
                "fire_detected",
                "Fire",
                AlertSeverity::Critical,
                "manual",
            ));
        }

        let assessment = aggregator.assess(site_id, None);
        assert!(assessment.risk_level.is_elevated());
        assert_eq!(assessment.recommendations[0], ELEVATED_DIRECTIVE);
        assert!(assessment.recommendations.len() <= 5);
    }
}
