//! Safety handlers: emergency stops, releases, overrides, status

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::logic::safety::{
    OverrideOutcome, ReleaseOutcome, SafetyStatus, SafetyStopRecord, TriggerSource,
};
use crate::middleware::auth::CallerIdentity;
use crate::models::SafetyEventRecord;
use crate::repo::EventStore;
use crate::{AppResult, AppState};

// ============================================================================
// EMERGENCY STOP
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct EmergencyStopRequest {
    pub site_id: Uuid,
    #[validate(length(min = 1))]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct EmergencyStopResponse {
    pub success: bool,
    pub stop_id: Uuid,
    pub stop: SafetyStopRecord,
    pub message: String,
}

pub async fn emergency_stop(
    State(state): State<AppState>,
    user: CallerIdentity,
    Json(req): Json<EmergencyStopRequest>,
) -> AppResult<Json<EmergencyStopResponse>> {
    req.validate()?;

    let stop = state.safety.trigger_stop(
        req.site_id,
        &req.reason,
        &user.user_id,
        TriggerSource::Manual,
    )?;

    Ok(Json(EmergencyStopResponse {
        success: true,
        stop_id: stop.stop_id,
        message: format!("Emergency stop executed for site {}.", req.site_id),
        stop,
    }))
}

// ============================================================================
// RELEASE (two-phase)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    pub site_id: Uuid,
    pub confirmation_code: Option<String>,
}

pub async fn release_emergency_stop(
    State(state): State<AppState>,
    user: CallerIdentity,
    Json(req): Json<ReleaseRequest>,
) -> AppResult<Json<ReleaseOutcome>> {
    let outcome = state.safety.release_stop(
        req.site_id,
        req.confirmation_code.as_deref(),
        &user.user_id,
    )?;
    Ok(Json(outcome))
}

// ============================================================================
// OVERRIDE (two-phase)
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct SafetyOverrideRequest {
    pub event_id: Uuid,
    #[validate(length(min = 10))]
    pub reason: String,
    pub confirmation_code: Option<String>,
}

pub async fn request_override(
    State(state): State<AppState>,
    user: CallerIdentity,
    Json(req): Json<SafetyOverrideRequest>,
) -> AppResult<Json<OverrideOutcome>> {
    req.validate()?;

    let outcome = state.safety.request_override(
        req.event_id,
        &req.reason,
        req.confirmation_code.as_deref(),
        &user.user_id,
    )?;
    Ok(Json(outcome))
}

// ============================================================================
// STATUS
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SafetyStatusResponse {
    #[serde(flatten)]
    pub status: SafetyStatus,
    pub recent_events: Vec<SafetyEventRecord>,
}

pub async fn safety_status(
    State(state): State<AppState>,
    _user: CallerIdentity,
    Path(site_id): Path<Uuid>,
) -> AppResult<Json<SafetyStatusResponse>> {
    let status = state.safety.safety_status(site_id);
    let recent_events = state.events.recent_safety_events(site_id, 10);

    Ok(Json(SafetyStatusResponse {
        status,
        recent_events,
    }))
}
