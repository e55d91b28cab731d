//! Audit records emitted for persistence
//!
//! The core never stores these itself; they are appended to the event store
//! so the external persistence layer can write them out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AlertSeverity;

/// Audit record for one model inference (anomaly detection call)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceAuditRecord {
    pub model_id: Uuid,
    pub site_id: Uuid,
    pub input_data: serde_json::Value,
    pub output_data: serde_json::Value,
    pub confidence: f64,
    pub feature_importance: serde_json::Value,
    pub explanation: String,
    pub recorded_at: DateTime<Utc>,
}

/// Audit record for one safety transition (stop, release, override)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyEventRecord {
    pub id: Uuid,
    pub site_id: Uuid,
    pub event_type: String,
    pub severity: AlertSeverity,
    pub description: String,
    /// "manual" or "auto"
    pub trigger_source: String,
    pub trigger_data: serde_json::Value,
    pub automated_response: Option<serde_json::Value>,
    pub occurred_at: DateTime<Utc>,
}

impl SafetyEventRecord {
    pub fn new(
        site_id: Uuid,
        event_type: impl Into<String>,
        severity: AlertSeverity,
        description: impl Into<String>,
        trigger_source: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            site_id,
            event_type: event_type.into(),
            severity,
            description: description.into(),
            trigger_source: trigger_source.into(),
            trigger_data: serde_json::Value::Null,
            automated_response: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_trigger_data(mut self, data: serde_json::Value) -> Self {
        self.trigger_data = data;
        self
    }

    pub fn with_automated_response(mut self, data: serde_json::Value) -> Self {
        self.automated_response = Some(data);
        self
    }
}
