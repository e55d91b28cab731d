//! Sensor handlers: registration seam and data ingestion

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    AlertRecord, AlertSeverity, InferenceAuditRecord, SensorInfo, SensorStatus, SensorType,
    ThresholdProfile,
};
use crate::repo::{EventStore, SensorDirectory};
use crate::{AppError, AppResult, AppState};

// ============================================================================
// REGISTRATION (in-memory directory seam)
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct SensorRegisterRequest {
    #[validate(length(min = 1))]
    pub sensor_uid: String,
    pub site_id: Uuid,
    pub sensor_type: SensorType,
    pub thresholds: Option<ThresholdProfile>,
}

/// Seed a sensor into the in-memory directory.
///
/// The durable sensor registry lives in the external persistence layer;
/// this endpoint only feeds the directory this process reads from.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<SensorRegisterRequest>,
) -> AppResult<Json<SensorInfo>> {
    req.validate()?;

    if state.sensors.get_by_uid(&req.sensor_uid).is_some() {
        return Err(AppError::AlreadyExists(format!(
            "Sensor {} already registered",
            req.sensor_uid
        )));
    }

    let sensor = SensorInfo {
        id: Uuid::new_v4(),
        sensor_uid: req.sensor_uid,
        site_id: req.site_id,
        sensor_type: req.sensor_type,
        status: SensorStatus::Online,
        thresholds: req.thresholds,
        data_quality_score: 1.0,
        uptime_percentage: 100.0,
        is_active: true,
        created_at: Utc::now(),
        last_heartbeat: None,
    };
    state.sensors.register(sensor.clone());

    Ok(Json(sensor))
}

// ============================================================================
// INGESTION
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct SensorDataIngest {
    #[validate(length(min = 1))]
    pub sensor_uid: String,
    pub timestamp: DateTime<Utc>,
    pub values: HashMap<String, f64>,
    /// Optional per-request override of the configured thresholds
    pub thresholds: Option<ThresholdProfile>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub sensor_uid: String,
    pub timestamp: DateTime<Utc>,
    pub anomaly_detected: bool,
    pub anomaly_score: f64,
}

/// Ingest one reading: detect, audit, publish, alert, auto-stop check
pub async fn ingest(
    State(state): State<AppState>,
    Json(data): Json<SensorDataIngest>,
) -> AppResult<Json<IngestResponse>> {
    data.validate()?;

    let sensor = state
        .sensors
        .get_by_uid(&data.sensor_uid)
        .ok_or_else(|| AppError::NotFound(format!("Sensor {} not found", data.sensor_uid)))?;

    if !sensor.is_active {
        return Err(AppError::ValidationError("Sensor is not active".to_string()));
    }

    state.sensors.mark_data_received(&data.sensor_uid, Utc::now());

    let thresholds = data.thresholds.or(sensor.thresholds);
    let result = state
        .engine
        .detect(&data.sensor_uid, &data.values, sensor.sensor_type, thresholds);

    state.events.append_inference_audit(InferenceAuditRecord {
        model_id: state.engine.model_id(),
        site_id: sensor.site_id,
        input_data: json!({
            "sensor_uid": &data.sensor_uid,
            "values": &data.values,
        }),
        output_data: serde_json::to_value(&result).unwrap_or_default(),
        confidence: result.confidence,
        feature_importance: serde_json::to_value(&result.contributing_features)
            .unwrap_or_default(),
        explanation: result.explanation.clone(),
        recorded_at: Utc::now(),
    });

    state.hub.publish_sensor_data(
        &data.sensor_uid,
        sensor.site_id,
        json!({
            "sensor_uid": &data.sensor_uid,
            "site_id": sensor.site_id,
            "values": &data.values,
            "timestamp": data.timestamp,
            "anomaly": &result,
        }),
    );

    if result.is_anomaly {
        let alert_code = result
            .anomaly_type
            .map(|k| k.as_str())
            .unwrap_or("anomaly");
        let alert = AlertRecord::new(
            sensor.site_id,
            Some(sensor.id),
            alert_code,
            format!("Anomaly detected on sensor {}", data.sensor_uid),
            severity_for_score(result.score),
            "anomaly_detection",
        )
        .with_description(result.explanation.clone());

        state.events.append_alert(alert.clone());
        state
            .hub
            .publish_alert(sensor.site_id, serde_json::to_value(&alert).unwrap_or_default());
        state.safety.process_critical_alert(&alert);
    }

    Ok(Json(IngestResponse {
        status: "accepted",
        sensor_uid: data.sensor_uid,
        timestamp: data.timestamp,
        anomaly_detected: result.is_anomaly,
        anomaly_score: result.score,
    }))
}

fn severity_for_score(score: f64) -> AlertSeverity {
    if score > 0.8 {
        AlertSeverity::Critical
    } else if score > 0.6 {
        AlertSeverity::High
    } else if score > 0.4 {
        AlertSeverity::Medium
    } else {
        AlertSeverity::Low
    }
}
