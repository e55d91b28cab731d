//! Alert model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Critical => "critical",
            AlertSeverity::High => "high",
            AlertSeverity::Medium => "medium",
            AlertSeverity::Low => "low",
            AlertSeverity::Info => "info",
        }
    }

    /// Weight used by the active-alert risk factor
    pub fn risk_weight(&self) -> f64 {
        match self {
            AlertSeverity::Critical => 1.0,
            AlertSeverity::High => 0.7,
            AlertSeverity::Medium => 0.4,
            AlertSeverity::Low => 0.2,
            AlertSeverity::Info => 0.05,
        }
    }

    /// Critical/high alerts count as incidents for historical risk
    pub fn is_incident(&self) -> bool {
        matches!(self, AlertSeverity::Critical | AlertSeverity::High)
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Alert lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
        }
    }
}

/// Alert record appended to the event store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: Uuid,
    pub site_id: Uuid,
    pub sensor_id: Option<Uuid>,
    /// Machine-readable code, e.g. "threshold_violation" or "gas_leak"
    pub alert_code: String,
    pub title: String,
    pub description: Option<String>,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    /// "manual", "anomaly_detection", ...
    pub source_type: String,
    pub triggered_at: DateTime<Utc>,
}

impl AlertRecord {
    pub fn new(
        site_id: Uuid,
        sensor_id: Option<Uuid>,
        alert_code: impl Into<String>,
        title: impl Into<String>,
        severity: AlertSeverity,
        source_type: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            site_id,
            sensor_id,
            alert_code: alert_code.into(),
            title: title.into(),
            description: None,
            severity,
            status: AlertStatus::Active,
            source_type: source_type.into(),
            triggered_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
