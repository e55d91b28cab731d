//! Message Envelopes & Topics
//!
//! Wire format cho realtime stream.
//! KHÔNG chứa delivery logic - chỉ data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// TOPICS
// ============================================================================

/// Global room receiving every alert
pub const TOPIC_ALERTS: &str = "alerts";

pub fn site_topic(site_id: Uuid) -> String {
    format!("site_{}", site_id)
}

pub fn sensor_topic(sensor_uid: &str) -> String {
    format!("sensor_{}", sensor_uid)
}

// ============================================================================
// OUTBOUND ENVELOPE
// ============================================================================

/// Outbound message delivered over a subscriber connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl Envelope {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            event: None,
            data: None,
            timestamp: Utc::now(),
            priority: None,
        }
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }
}

// ============================================================================
// INBOUND CONTROL MESSAGES
// ============================================================================

/// Control messages a subscriber may send
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    Subscribe { channels: Vec<String> },
    Unsubscribe { channels: Vec<String> },
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_serialization_skips_empty_fields() {
        let env = Envelope::new("pong");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "pong");
        assert!(json.get("event").is_none());
        assert!(json.get("priority").is_none());
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn test_control_message_parsing() {
        let msg: ControlMessage =
            serde_json::from_str(r#"{"type":"subscribe","channels":["alerts","safety"]}"#).unwrap();
        assert!(matches!(msg, ControlMessage::Subscribe { channels } if channels.len() == 2));

        let ping: ControlMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(ping, ControlMessage::Ping));

        assert!(serde_json::from_str::<ControlMessage>(r#"{"type":"shout"}"#).is_err());
    }
}
