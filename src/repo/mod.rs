//! Repository seam for the external persistence layer
//!
//! The core reads sensor identity and recent event counts through these
//! traits and appends every record it produces back through them. The
//! in-memory implementations below back the running service and the tests;
//! a database-backed implementation lives outside this crate.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::models::{
    AlertRecord, AlertSeverity, AlertStatus, InferenceAuditRecord, SafetyEventRecord, SensorInfo,
    SensorStatus,
};

/// Sensor identity lookup (sensor registry is managed elsewhere)
pub trait SensorDirectory: Send + Sync {
    fn get_by_uid(&self, sensor_uid: &str) -> Option<SensorInfo>;
    fn get_by_id(&self, sensor_id: Uuid) -> Option<SensorInfo>;
    fn list_by_site(&self, site_id: Uuid) -> Vec<SensorInfo>;
    /// Ingestion touch: refresh heartbeat and flip the sensor online
    fn mark_data_received(&self, sensor_uid: &str, at: DateTime<Utc>);
}

/// Append/query access to alerts, safety events and inference audits
pub trait EventStore: Send + Sync {
    fn append_alert(&self, alert: AlertRecord);
    fn append_safety_event(&self, event: SafetyEventRecord);
    fn append_inference_audit(&self, record: InferenceAuditRecord);

    /// Active alerts for a site, grouped by severity
    fn active_alert_counts(&self, site_id: Uuid) -> HashMap<AlertSeverity, usize>;
    /// Critical/high alerts triggered at or after `since`
    fn count_incidents_since(&self, site_id: Uuid, since: DateTime<Utc>) -> usize;
    /// Alerts of any severity triggered in `[from, to)`
    fn count_alerts_between(&self, site_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> usize;
    /// Alerts attached to one sensor triggered at or after `since`
    fn count_sensor_alerts_since(&self, sensor_id: Uuid, since: DateTime<Utc>) -> usize;

    fn get_safety_event(&self, event_id: Uuid) -> Option<SafetyEventRecord>;
    fn recent_safety_events(&self, site_id: Uuid, limit: usize) -> Vec<SafetyEventRecord>;
}

// ============================================================================
// IN-MEMORY IMPLEMENTATIONS
// ============================================================================

/// In-memory sensor directory keyed by sensor UID
#[derive(Default)]
pub struct InMemorySensorDirectory {
    sensors: RwLock<HashMap<String, SensorInfo>>,
}

impl InMemorySensorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a sensor (wiring and tests; registration itself is external)
    pub fn register(&self, sensor: SensorInfo) {
        self.sensors
            .write()
            .insert(sensor.sensor_uid.clone(), sensor);
    }
}

impl SensorDirectory for InMemorySensorDirectory {
    fn get_by_uid(&self, sensor_uid: &str) -> Option<SensorInfo> {
        self.sensors.read().get(sensor_uid).cloned()
    }

    fn get_by_id(&self, sensor_id: Uuid) -> Option<SensorInfo> {
        self.sensors
            .read()
            .values()
            .find(|s| s.id == sensor_id)
            .cloned()
    }

    fn list_by_site(&self, site_id: Uuid) -> Vec<SensorInfo> {
        self.sensors
            .read()
            .values()
            .filter(|s| s.site_id == site_id)
            .cloned()
            .collect()
    }

    fn mark_data_received(&self, sensor_uid: &str, at: DateTime<Utc>) {
        let mut sensors = self.sensors.write();
        if let Some(sensor) = sensors.get_mut(sensor_uid) {
            sensor.last_heartbeat = Some(at);
            sensor.status = SensorStatus::Online;
        }
    }
}

/// In-memory event store backed by plain vectors
#[derive(Default)]
pub struct InMemoryEventStore {
    alerts: RwLock<Vec<AlertRecord>>,
    safety_events: RwLock<Vec<SafetyEventRecord>>,
    inference_audits: RwLock<Vec<InferenceAuditRecord>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.read().len()
    }

    pub fn inference_audit_count(&self) -> usize {
        self.inference_audits.read().len()
    }

    pub fn latest_safety_event(&self) -> Option<SafetyEventRecord> {
        self.safety_events.read().last().cloned()
    }
}

impl EventStore for InMemoryEventStore {
    fn append_alert(&self, alert: AlertRecord) {
        self.alerts.write().push(alert);
    }

    fn append_safety_event(&self, event: SafetyEventRecord) {
        self.safety_events.write().push(event);
    }

    fn append_inference_audit(&self, record: InferenceAuditRecord) {
        self.inference_audits.write().push(record);
    }

    fn active_alert_counts(&self, site_id: Uuid) -> HashMap<AlertSeverity, usize> {
        let mut counts = HashMap::new();
        for alert in self.alerts.read().iter() {
            if alert.site_id == site_id && alert.status == AlertStatus::Active {
                *counts.entry(alert.severity).or_insert(0) += 1;
            }
        }
        counts
    }

    fn count_incidents_since(&self, site_id: Uuid, since: DateTime<Utc>) -> usize {
        self.alerts
            .read()
            .iter()
            .filter(|a| {
                a.site_id == site_id && a.severity.is_incident() && a.triggered_at >= since
            })
            .count()
    }

    fn count_alerts_between(&self, site_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> usize {
        self.alerts
            .read()
            .iter()
            .filter(|a| a.site_id == site_id && a.triggered_at >= from && a.triggered_at < to)
            .count()
    }

    fn count_sensor_alerts_since(&self, sensor_id: Uuid, since: DateTime<Utc>) -> usize {
        self.alerts
            .read()
            .iter()
            .filter(|a| a.sensor_id == Some(sensor_id) && a.triggered_at >= since)
            .count()
    }

    fn get_safety_event(&self, event_id: Uuid) -> Option<SafetyEventRecord> {
        self.safety_events
            .read()
            .iter()
            .find(|e| e.id == event_id)
            .cloned()
    }

    fn recent_safety_events(&self, site_id: Uuid, limit: usize) -> Vec<SafetyEventRecord> {
        let events = self.safety_events.read();
        let mut recent: Vec<SafetyEventRecord> = events
            .iter()
            .filter(|e| e.site_id == site_id)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        recent.truncate(limit);
        recent
    }
}
