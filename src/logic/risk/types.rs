//! Risk Types
//!
//! Core types cho risk assessment.
//! KHÔNG chứa logic - chỉ data structures.

use serde::{Deserialize, Serialize};

// ============================================================================
// FACTOR KINDS
// ============================================================================

/// The six weighted risk factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactorKind {
    SensorHealth,
    ActiveAlerts,
    HistoricalIncidents,
    AnomalyTrend,
    Environmental,
    TimePattern,
}

impl RiskFactorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskFactorKind::SensorHealth => "sensor_health",
            RiskFactorKind::ActiveAlerts => "active_alerts",
            RiskFactorKind::HistoricalIncidents => "historical_incidents",
            RiskFactorKind::AnomalyTrend => "anomaly_trend",
            RiskFactorKind::Environmental => "environmental",
            RiskFactorKind::TimePattern => "time_pattern",
        }
    }

    /// Fixed factor weight; all six sum to exactly 1.0
    pub fn weight(&self) -> f64 {
        match self {
            RiskFactorKind::SensorHealth => 0.20,
            RiskFactorKind::ActiveAlerts => 0.30,
            RiskFactorKind::HistoricalIncidents => 0.20,
            RiskFactorKind::AnomalyTrend => 0.15,
            RiskFactorKind::Environmental => 0.10,
            RiskFactorKind::TimePattern => 0.05,
        }
    }

    /// Fixed advisory issued when this factor is material
    pub fn advisory(&self) -> Option<&'static str> {
        match self {
            RiskFactorKind::SensorHealth => {
                Some("Check sensor connectivity and perform maintenance on offline devices")
            }
            RiskFactorKind::ActiveAlerts => {
                Some("Review and address active alerts, prioritizing critical severity")
            }
            RiskFactorKind::HistoricalIncidents => {
                Some("Conduct root cause analysis on recent incidents to prevent recurrence")
            }
            RiskFactorKind::AnomalyTrend => {
                Some("Investigate increasing anomaly patterns for potential system issues")
            }
            RiskFactorKind::Environmental => {
                Some("Adjust operations for current environmental conditions")
            }
            RiskFactorKind::TimePattern => None,
        }
    }
}

// ============================================================================
// FACTOR & LEVEL
// ============================================================================

/// One scored factor in an assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor: RiskFactorKind,
    pub score: f64,
    pub weight: f64,
    pub details: String,
}

/// Discrete risk level derived from the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            RiskLevel::Critical
        } else if score >= 0.6 {
            RiskLevel::High
        } else if score >= 0.4 {
            RiskLevel::Medium
        } else if score >= 0.2 {
            RiskLevel::Low
        } else {
            RiskLevel::Minimal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Minimal => "minimal",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    pub fn is_elevated(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

/// Week-over-week alert trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTrend {
    Increasing,
    Stable,
    Decreasing,
}

impl RiskTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTrend::Increasing => "increasing",
            RiskTrend::Stable => "stable",
            RiskTrend::Decreasing => "decreasing",
        }
    }
}

// ============================================================================
// CONTEXT & ASSESSMENT
// ============================================================================

/// Caller-supplied context for the anomaly-trend and environmental factors.
///
/// Absent fields fall back to documented defaults (0.0, environmental 0.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskContext {
    pub anomaly_rate: Option<f64>,
    pub anomaly_trend_increasing: Option<bool>,
    pub weather_risk: Option<f64>,
    pub time_risk: Option<f64>,
    pub load_factor: Option<f64>,
}

/// Complete assessment for a site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<RiskFactor>,
    pub trend: RiskTrend,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = [
            RiskFactorKind::SensorHealth,
            RiskFactorKind::ActiveAlerts,
            RiskFactorKind::HistoricalIncidents,
            RiskFactorKind::AnomalyTrend,
            RiskFactorKind::Environmental,
            RiskFactorKind::TimePattern,
        ]
        .iter()
        .map(|k| k.weight())
        .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(RiskLevel::from_score(0.85), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(0.8), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(0.65), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.45), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.25), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.1), RiskLevel::Minimal);
    }
}
