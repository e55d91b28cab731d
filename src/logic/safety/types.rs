//! Safety Types
//!
//! Core types cho safety state machine.
//! KHÔNG chứa logic - chỉ data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// AUTO-STOP CONDITIONS
// ============================================================================

/// Critical alert codes that trigger an automatic emergency stop
pub const AUTO_STOP_CODES: [&str; 5] = [
    "collision_imminent",
    "fire_detected",
    "gas_leak",
    "structural_failure",
    "intrusion_safety_zone",
];

// ============================================================================
// STOP RECORDS
// ============================================================================

/// Who initiated a stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    Manual,
    Auto,
}

impl TriggerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::Manual => "manual",
            TriggerSource::Auto => "auto",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopStatus {
    Active,
    Released,
}

/// One emergency stop. Exactly one may be active per site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyStopRecord {
    pub stop_id: Uuid,
    pub site_id: Uuid,
    pub reason: String,
    pub trigger: TriggerSource,
    pub triggered_by: String,
    pub status: StopStatus,
    pub triggered_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
    pub released_by: Option<String>,
}

// ============================================================================
// OVERRIDE RECORDS
// ============================================================================

/// A time-bounded bypass of an automated safety action, per event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyOverrideRecord {
    pub override_id: Uuid,
    pub event_id: Uuid,
    pub site_id: Uuid,
    pub reason: String,
    pub approved_by: String,
    pub approved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SafetyOverrideRecord {
    /// Expiry is checked at read time, never swept
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// Result of a release attempt
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReleaseOutcome {
    /// First phase: a fresh single-use code was issued, state unchanged
    ConfirmationRequired {
        confirmation_code: String,
        code_expires_in_seconds: i64,
    },
    /// Second phase: code matched, stop released
    Released(SafetyStopRecord),
}

/// Result of an override request
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OverrideOutcome {
    ConfirmationRequired {
        confirmation_code: String,
        code_expires_in_seconds: i64,
    },
    Approved(SafetyOverrideRecord),
}

/// Site-wide safety snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SafetyStatus {
    pub site_id: Uuid,
    pub emergency_stop: bool,
    pub stop_info: Option<SafetyStopRecord>,
    pub active_overrides: Vec<SafetyOverrideRecord>,
    pub safety_level: &'static str,
}

// ============================================================================
// ERRORS
// ============================================================================

/// Rejections of safety transitions. State is never changed on rejection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SafetyError {
    #[error("An emergency stop is already active for this site")]
    StopAlreadyActive,
    #[error("No active emergency stop for this site")]
    NoActiveStop,
    #[error("Invalid confirmation code")]
    InvalidCode,
    #[error("Safety event not found")]
    EventNotFound,
}
