//! Alert handlers

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::middleware::auth::CallerIdentity;
use crate::models::{AlertRecord, AlertSeverity};
use crate::repo::EventStore;
use crate::{AppResult, AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct AlertCreate {
    pub site_id: Uuid,
    pub sensor_id: Option<Uuid>,
    #[validate(length(min = 1))]
    pub alert_code: String,
    #[validate(length(min = 1))]
    pub title: String,
    pub description: Option<String>,
    pub severity: AlertSeverity,
}

#[derive(Debug, Serialize)]
pub struct AlertCreateResponse {
    pub alert: AlertRecord,
    /// Set when the alert carried an automatic-stop code and tripped one
    pub auto_stop_triggered: bool,
}

/// Create an alert, publish it, and run the auto-stop evaluation
pub async fn create(
    State(state): State<AppState>,
    user: CallerIdentity,
    Json(req): Json<AlertCreate>,
) -> AppResult<Json<AlertCreateResponse>> {
    req.validate()?;

    let mut alert = AlertRecord::new(
        req.site_id,
        req.sensor_id,
        req.alert_code,
        req.title,
        req.severity,
        "manual",
    );
    if let Some(description) = req.description {
        alert = alert.with_description(description);
    }

    state.events.append_alert(alert.clone());
    state
        .hub
        .publish_alert(req.site_id, serde_json::to_value(&alert).unwrap_or_default());

    let auto_stop = state.safety.process_critical_alert(&alert);

    tracing::info!(
        alert_id = %alert.id,
        site_id = %alert.site_id,
        severity = alert.severity.as_str(),
        created_by = %user.user_id,
        auto_stop = auto_stop.is_some(),
        "alert created"
    );

    Ok(Json(AlertCreateResponse {
        alert,
        auto_stop_triggered: auto_stop.is_some(),
    }))
}
