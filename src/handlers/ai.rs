//! AI handlers: anomaly detection, risk scoring, failure prediction

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::logic::anomaly::types::{AnomalyKind, FeatureContribution};
use crate::logic::predict::FailurePrediction;
use crate::logic::risk::{RiskAssessment, RiskContext};
use crate::middleware::auth::CallerIdentity;
use crate::models::{InferenceAuditRecord, ThresholdProfile};
use crate::repo::{EventStore, SensorDirectory};
use crate::{AppError, AppResult, AppState};

// ============================================================================
// ANOMALY DETECTION
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct AnomalyDetectionRequest {
    #[validate(length(min = 1))]
    pub sensor_uid: String,
    pub values: HashMap<String, f64>,
    pub thresholds: Option<ThresholdProfile>,
}

#[derive(Debug, Serialize)]
pub struct AnomalyDetectionResponse {
    pub is_anomaly: bool,
    pub anomaly_score: f64,
    pub confidence: f64,
    pub anomaly_type: Option<AnomalyKind>,
    pub contributing_features: Vec<FeatureContribution>,
    pub explanation: String,
    pub recommended_action: Option<String>,
    pub inference_time_ms: f64,
}

/// Run detection without the ingestion side effects (the audit record is
/// still appended; every inference is accountable)
pub async fn detect_anomaly(
    State(state): State<AppState>,
    _user: CallerIdentity,
    Json(req): Json<AnomalyDetectionRequest>,
) -> AppResult<Json<AnomalyDetectionResponse>> {
    req.validate()?;

    let sensor = state
        .sensors
        .get_by_uid(&req.sensor_uid)
        .ok_or_else(|| AppError::NotFound(format!("Sensor {} not found", req.sensor_uid)))?;

    let thresholds = req.thresholds.or(sensor.thresholds);
    let result = state
        .engine
        .detect(&req.sensor_uid, &req.values, sensor.sensor_type, thresholds);

    state.events.append_inference_audit(InferenceAuditRecord {
        model_id: state.engine.model_id(),
        site_id: sensor.site_id,
        input_data: json!({
            "sensor_uid": &req.sensor_uid,
            "values": &req.values,
        }),
        output_data: serde_json::to_value(&result).unwrap_or_default(),
        confidence: result.confidence,
        feature_importance: serde_json::to_value(&result.contributing_features)
            .unwrap_or_default(),
        explanation: result.explanation.clone(),
        recorded_at: Utc::now(),
    });

    Ok(Json(AnomalyDetectionResponse {
        is_anomaly: result.is_anomaly,
        anomaly_score: result.score,
        confidence: result.confidence,
        anomaly_type: result.anomaly_type,
        contributing_features: result.contributing_features,
        explanation: result.explanation,
        recommended_action: result.recommended_action,
        inference_time_ms: result.inference_time_ms,
    }))
}

// ============================================================================
// RISK SCORING
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RiskScoreRequest {
    pub site_id: Uuid,
    pub context: Option<RiskContext>,
}

pub async fn risk_score(
    State(state): State<AppState>,
    _user: CallerIdentity,
    Json(req): Json<RiskScoreRequest>,
) -> AppResult<Json<RiskAssessment>> {
    let assessment = state.risk.assess(req.site_id, req.context.as_ref());
    Ok(Json(assessment))
}

// ============================================================================
// FAILURE PREDICTION
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct PredictionRequest {
    pub site_id: Uuid,
    pub sensor_id: Option<Uuid>,
    #[validate(range(min = 1, max = 720))]
    #[serde(default = "default_horizon")]
    pub horizon_hours: u32,
}

fn default_horizon() -> u32 {
    24
}

pub async fn predict_failure(
    State(state): State<AppState>,
    _user: CallerIdentity,
    Json(req): Json<PredictionRequest>,
) -> AppResult<Json<FailurePrediction>> {
    req.validate()?;

    let prediction = state
        .predictor
        .predict(req.site_id, req.sensor_id, req.horizon_hours);
    Ok(Json(prediction))
}
