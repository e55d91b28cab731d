//! Sensor model

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Physical sensor categories supported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    Temperature,
    Humidity,
    Pressure,
    Vibration,
    Power,
    Radar,
    Thermal,
    Gas,
    Motion,
    Proximity,
    Network,
}

impl SensorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Temperature => "temperature",
            SensorType::Humidity => "humidity",
            SensorType::Pressure => "pressure",
            SensorType::Vibration => "vibration",
            SensorType::Power => "power",
            SensorType::Radar => "radar",
            SensorType::Thermal => "thermal",
            SensorType::Gas => "gas",
            SensorType::Motion => "motion",
            SensorType::Proximity => "proximity",
            SensorType::Network => "network",
        }
    }

    /// Default detection thresholds for this sensor type
    pub fn default_thresholds(&self) -> ThresholdProfile {
        let (min, max, rate) = match self {
            SensorType::Temperature => (-40.0, 85.0, 5.0),
            SensorType::Humidity => (0.0, 100.0, 10.0),
            SensorType::Pressure => (800.0, 1200.0, 50.0),
            SensorType::Vibration => (0.0, 50.0, 10.0),
            SensorType::Power => (0.0, 500.0, 100.0),
            SensorType::Radar => (0.0, 1000.0, 200.0),
            SensorType::Thermal => (-20.0, 200.0, 20.0),
            SensorType::Gas => (0.0, 1000.0, 50.0),
            SensorType::Motion => (0.0, 1.0, 1.0),
            SensorType::Proximity => (0.0, 1000.0, 500.0),
            SensorType::Network => (0.0, 100.0, 50.0),
        };

        ThresholdProfile {
            min: Some(min),
            max: Some(max),
            rate: Some(rate),
        }
    }
}

impl std::fmt::Display for SensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sensor operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorStatus {
    Online,
    Offline,
    Degraded,
    Fault,
    Maintenance,
}

impl SensorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorStatus::Online => "online",
            SensorStatus::Offline => "offline",
            SensorStatus::Degraded => "degraded",
            SensorStatus::Fault => "fault",
            SensorStatus::Maintenance => "maintenance",
        }
    }

    /// Offline, fault and degraded sensors count against site health
    pub fn is_unhealthy(&self) -> bool {
        matches!(
            self,
            SensorStatus::Offline | SensorStatus::Fault | SensorStatus::Degraded
        )
    }
}

impl std::fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Min/max/rate-of-change bounds applied during detection.
///
/// A `None` bound disables that check for the channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ThresholdProfile {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub rate: Option<f64>,
}

/// Registered sensor as exposed by the sensor directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorInfo {
    pub id: Uuid,
    pub sensor_uid: String,
    pub site_id: Uuid,
    pub sensor_type: SensorType,
    pub status: SensorStatus,
    /// Per-sensor override; falls back to the type default when absent
    pub thresholds: Option<ThresholdProfile>,
    pub data_quality_score: f64,
    pub uptime_percentage: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

/// One ingested reading: named numeric channels at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub sensor_uid: String,
    pub timestamp: DateTime<Utc>,
    pub values: HashMap<String, f64>,
}
