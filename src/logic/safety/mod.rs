//! Safety Coordinator
//!
//! Per-site emergency-stop state machine and time-bounded safety overrides,
//! both gated by two-phase confirmation. Every transition appends an audit
//! event and is broadcast to all connected subscribers.
//!
//! Invariants:
//! - at most one active stop per site (check-and-set under the stop lock)
//! - a confirmation code authorizes exactly one transition
//! - rejections never change state

pub mod confirm;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use parking_lot::Mutex;
use serde_json::json;
use uuid::Uuid;

use crate::models::{AlertRecord, AlertSeverity, SafetyEventRecord};
use crate::realtime::ConnectionHub;
use crate::repo::EventStore;

use confirm::{CodeCheck, ConfirmAction, ConfirmationCodes};

pub use types::{
    OverrideOutcome, ReleaseOutcome, SafetyError, SafetyOverrideRecord, SafetyStatus,
    SafetyStopRecord, StopStatus, TriggerSource, AUTO_STOP_CODES,
};

pub struct SafetyCoordinator {
    events: Arc<dyn EventStore>,
    hub: Arc<ConnectionHub>,
    stops: Mutex<HashMap<Uuid, SafetyStopRecord>>,
    overrides: Mutex<HashMap<Uuid, SafetyOverrideRecord>>,
    codes: ConfirmationCodes,
    release_code_ttl_secs: i64,
    override_code_ttl_secs: i64,
    override_duration_minutes: i64,
}

impl SafetyCoordinator {
    pub fn new(
        events: Arc<dyn EventStore>,
        hub: Arc<ConnectionHub>,
        release_code_ttl_secs: i64,
        override_code_ttl_secs: i64,
        override_duration_minutes: i64,
    ) -> Self {
        Self {
            events,
            hub,
            stops: Mutex::new(HashMap::new()),
            overrides: Mutex::new(HashMap::new()),
            codes: ConfirmationCodes::new(),
            release_code_ttl_secs,
            override_code_ttl_secs,
            override_duration_minutes,
        }
    }

    // ========================================================================
    // EMERGENCY STOP
    // ========================================================================

    /// NORMAL -> STOPPED. Rejected while a stop is already active.
    pub fn trigger_stop(
        &self,
        site_id: Uuid,
        reason: &str,
        triggered_by: &str,
        trigger: TriggerSource,
    ) -> Result<SafetyStopRecord, SafetyError> {
        let record = {
            let mut stops = self.stops.lock();
            if stops.contains_key(&site_id) {
                return Err(SafetyError::StopAlreadyActive);
            }

            let record = SafetyStopRecord {
                stop_id: Uuid::new_v4(),
                site_id,
                reason: reason.to_string(),
                trigger,
                triggered_by: triggered_by.to_string(),
                status: StopStatus::Active,
                triggered_at: Utc::now(),
                released_at: None,
                released_by: None,
            };
            stops.insert(site_id, record.clone());
            record
        };

        self.events.append_safety_event(
            SafetyEventRecord::new(
                site_id,
                "emergency_stop",
                AlertSeverity::Critical,
                format!("Emergency stop triggered by {}: {}", triggered_by, reason),
                record.trigger.as_str(),
            )
            .with_trigger_data(json!({
                "reason": reason,
                "triggered_by": triggered_by,
            }))
            .with_automated_response(json!({ "stop_id": record.stop_id })),
        );

        self.hub.publish_safety_event(
            "emergency_stop",
            serde_json::to_value(&record).unwrap_or_default(),
        );

        tracing::error!(
            %site_id,
            stop_id = %record.stop_id,
            reason,
            auto = record.trigger == TriggerSource::Auto,
            "EMERGENCY STOP TRIGGERED"
        );

        Ok(record)
    }

    /// STOPPED -> NORMAL via two-phase confirmation.
    ///
    /// The first call issues a single-use code and leaves the state
    /// untouched; the matching second call releases. A mismatched code is
    /// rejected without consuming the pending one.
    pub fn release_stop(
        &self,
        site_id: Uuid,
        confirmation_code: Option<&str>,
        released_by: &str,
    ) -> Result<ReleaseOutcome, SafetyError> {
        let released = {
            let mut stops = self.stops.lock();
            if !stops.contains_key(&site_id) {
                return Err(SafetyError::NoActiveStop);
            }

            match self
                .codes
                .check(ConfirmAction::ReleaseStop, site_id, confirmation_code)
            {
                CodeCheck::NoPending => {
                    let grant = self.codes.issue(
                        ConfirmAction::ReleaseStop,
                        site_id,
                        released_by,
                        self.release_code_ttl_secs,
                    );
                    return Ok(ReleaseOutcome::ConfirmationRequired {
                        confirmation_code: grant.code,
                        code_expires_in_seconds: grant.expires_in_seconds,
                    });
                }
                CodeCheck::Mismatch => return Err(SafetyError::InvalidCode),
                CodeCheck::Consumed => {
                    let Some(mut record) = stops.remove(&site_id) else {
                        return Err(SafetyError::NoActiveStop);
                    };
                    record.status = StopStatus::Released;
                    record.released_at = Some(Utc::now());
                    record.released_by = Some(released_by.to_string());
                    record
                }
            }
        };

        self.events.append_safety_event(
            SafetyEventRecord::new(
                site_id,
                "emergency_stop_released",
                AlertSeverity::High,
                format!("Emergency stop released by {}", released_by),
                "manual",
            )
            .with_trigger_data(json!({ "released_by": released_by })),
        );

        self.hub.publish_safety_event(
            "stop_released",
            serde_json::to_value(&released).unwrap_or_default(),
        );

        tracing::warn!(%site_id, released_by, "emergency stop released");

        Ok(ReleaseOutcome::Released(released))
    }

    /// Auto-stop evaluation for a freshly created alert.
    ///
    /// Fires only for critical alerts carrying one of the automatic-stop
    /// codes; a site that is already stopped keeps its existing stop.
    pub fn process_critical_alert(&self, alert: &AlertRecord) -> Option<SafetyStopRecord> {
        if alert.severity != AlertSeverity::Critical {
            return None;
        }
        if !AUTO_STOP_CODES.contains(&alert.alert_code.as_str()) {
            return None;
        }

        self.trigger_stop(
            alert.site_id,
            &format!("Auto-triggered by critical alert: {}", alert.title),
            "SYSTEM",
            TriggerSource::Auto,
        )
        .ok()
    }

    // ========================================================================
    // SAFETY OVERRIDES
    // ========================================================================

    /// Two-phase override of an automated safety action for one event.
    ///
    /// Approval never transitions the stop machine; it only records a
    /// time-bounded bypass (expiry checked lazily at query time).
    pub fn request_override(
        &self,
        event_id: Uuid,
        reason: &str,
        confirmation_code: Option<&str>,
        approved_by: &str,
    ) -> Result<OverrideOutcome, SafetyError> {
        let event = self
            .events
            .get_safety_event(event_id)
            .ok_or(SafetyError::EventNotFound)?;

        match self
            .codes
            .check(ConfirmAction::ApplyOverride, event_id, confirmation_code)
        {
            CodeCheck::NoPending => {
                let grant = self.codes.issue(
                    ConfirmAction::ApplyOverride,
                    event_id,
                    approved_by,
                    self.override_code_ttl_secs,
                );
                tracing::info!(%event_id, approved_by, "safety override code generated");
                Ok(OverrideOutcome::ConfirmationRequired {
                    confirmation_code: grant.code,
                    code_expires_in_seconds: grant.expires_in_seconds,
                })
            }
            CodeCheck::Mismatch => Err(SafetyError::InvalidCode),
            CodeCheck::Consumed => {
                let record = SafetyOverrideRecord {
                    override_id: Uuid::new_v4(),
                    event_id,
                    site_id: event.site_id,
                    reason: reason.to_string(),
                    approved_by: approved_by.to_string(),
                    approved_at: Utc::now(),
                    expires_at: Utc::now() + Duration::minutes(self.override_duration_minutes),
                };
                self.overrides
                    .lock()
                    .insert(record.override_id, record.clone());

                self.events.append_safety_event(
                    SafetyEventRecord::new(
                        event.site_id,
                        "safety_override_applied",
                        AlertSeverity::High,
                        format!("Safety override approved by {}: {}", approved_by, reason),
                        "manual",
                    )
                    .with_trigger_data(json!({
                        "event_id": event_id,
                        "override_id": record.override_id,
                        "reason": reason,
                    })),
                );

                self.hub.publish_safety_event(
                    "override_applied",
                    serde_json::to_value(&record).unwrap_or_default(),
                );

                tracing::warn!(
                    %event_id,
                    override_id = %record.override_id,
                    approved_by,
                    reason,
                    "safety override approved"
                );

                Ok(OverrideOutcome::Approved(record))
            }
        }
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn is_site_stopped(&self, site_id: Uuid) -> bool {
        self.stops.lock().contains_key(&site_id)
    }

    pub fn active_stops(&self) -> Vec<SafetyStopRecord> {
        self.stops.lock().values().cloned().collect()
    }

    /// Snapshot of the safety state for one site
    pub fn safety_status(&self, site_id: Uuid) -> SafetyStatus {
        let stop_info = self.stops.lock().get(&site_id).cloned();
        let now = Utc::now();
        let active_overrides: Vec<SafetyOverrideRecord> = self
            .overrides
            .lock()
            .values()
            .filter(|o| o.site_id == site_id && o.is_active(now))
            .cloned()
            .collect();

        let safety_level = if stop_info.is_some() {
            "critical"
        } else if !active_overrides.is_empty() {
            "warning"
        } else {
            "normal"
        };

        SafetyStatus {
            site_id,
            emergency_stop: stop_info.is_some(),
            stop_info,
            active_overrides,
            safety_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::InMemoryEventStore;

    fn coordinator() -> (SafetyCoordinator, Arc<InMemoryEventStore>) {
        let events = Arc::new(InMemoryEventStore::new());
        let hub = Arc::new(ConnectionHub::new());
        let coordinator = SafetyCoordinator::new(events.clone(), hub, 300, 120, 30);
        (coordinator, events)
    }

    fn release_code(coordinator: &SafetyCoordinator, site_id: Uuid) -> String {
        match coordinator.release_stop(site_id, None, "operator").unwrap() {
            ReleaseOutcome::ConfirmationRequired {
                confirmation_code, ..
            } => confirmation_code,
            other => panic!("expected confirmation_required, got {:?}", other),
        }
    }

    #[test]
    fn test_one_active_stop_per_site() {
        let (coordinator, _) = coordinator();
        let site_id = Uuid::new_v4();

        coordinator
            .trigger_stop(site_id, "gas reading spike", "operator", TriggerSource::Manual)
            .unwrap();
        let second =
            coordinator.trigger_stop(site_id, "second attempt", "operator", TriggerSource::Manual);
        assert_eq!(second.unwrap_err(), SafetyError::StopAlreadyActive);
        assert_eq!(coordinator.active_stops().len(), 1);
    }

    #[test]
    fn test_two_phase_release() {
        let (coordinator, events) = coordinator();
        let site_id = Uuid::new_v4();

        coordinator
            .trigger_stop(site_id, "fire alarm", "operator", TriggerSource::Manual)
            .unwrap();

        // phase one: no code yet, state must not change
        let code = release_code(&coordinator, site_id);
        assert!(coordinator.is_site_stopped(site_id));

        // phase two: matching code releases
        let outcome = coordinator
            .release_stop(site_id, Some(&code), "supervisor")
            .unwrap();
        match outcome {
            ReleaseOutcome::Released(record) => {
                assert_eq!(record.status, StopStatus::Released);
                assert_eq!(record.released_by.as_deref(), Some("supervisor"));
            }
            other => panic!("expected released, got {:?}", other),
        }
        assert!(!coordinator.is_site_stopped(site_id));

        // audit trail: trigger + release
        let last = events.latest_safety_event().unwrap();
        assert_eq!(last.event_type, "emergency_stop_released");

        // nothing left to release
        assert_eq!(
            coordinator
                .release_stop(site_id, Some(&code), "supervisor")
                .unwrap_err(),
            SafetyError::NoActiveStop
        );
    }

    #[test]
    fn test_mismatched_code_rejected_without_state_change() {
        let (coordinator, _) = coordinator();
        let site_id = Uuid::new_v4();

        coordinator
            .trigger_stop(site_id, "test", "operator", TriggerSource::Manual)
            .unwrap();
        let code = release_code(&coordinator, site_id);

        let rejected = coordinator.release_stop(site_id, Some("BADCOD"), "operator");
        assert_eq!(rejected.unwrap_err(), SafetyError::InvalidCode);
        assert!(coordinator.is_site_stopped(site_id));

        // the pending code survives a mismatch
        let outcome = coordinator
            .release_stop(site_id, Some(&code), "operator")
            .unwrap();
        assert!(matches!(outcome, ReleaseOutcome::Released(_)));
    }

    #[test]
    fn test_auto_stop_only_for_auto_stop_codes() {
        let (coordinator, _) = coordinator();
        let site_id = Uuid::new_v4();

        let benign = AlertRecord::new(
            site_id,
            None,
            "threshold_violation",
            "Overtemp",
            AlertSeverity::Critical,
            "anomaly_detection",
        );
        assert!(coordinator.process_critical_alert(&benign).is_none());

        let high_only = AlertRecord::new(
            site_id,
            None,
            "gas_leak",
            "Gas leak",
            AlertSeverity::High,
            "manual",
        );
        assert!(coordinator.process_critical_alert(&high_only).is_none());

        let critical = AlertRecord::new(
            site_id,
            None,
            "gas_leak",
            "Gas leak",
            AlertSeverity::Critical,
            "manual",
        );
        let stop = coordinator.process_critical_alert(&critical).unwrap();
        assert_eq!(stop.trigger, TriggerSource::Auto);
        assert_eq!(stop.triggered_by, "SYSTEM");

        // a second auto-stop alert keeps the existing stop
        assert!(coordinator.process_critical_alert(&critical).is_none());
        assert_eq!(coordinator.active_stops().len(), 1);
    }

    #[test]
    fn test_override_two_phase_and_expiry_window() {
        let (coordinator, events) = coordinator();
        let site_id = Uuid::new_v4();

        let event = SafetyEventRecord::new(
            site_id,
            "emergency_stop",
            AlertSeverity::Critical,
            "stop event",
            "auto",
        );
        let event_id = event.id;
        events.append_safety_event(event);

        let code = match coordinator
            .request_override(event_id, "inspection access", None, "supervisor")
            .unwrap()
        {
            OverrideOutcome::ConfirmationRequired {
                confirmation_code, ..
            } => confirmation_code,
            other => panic!("expected confirmation_required, got {:?}", other),
        };

        let outcome = coordinator
            .request_override(event_id, "inspection access", Some(&code), "supervisor")
            .unwrap();
        let record = match outcome {
            OverrideOutcome::Approved(record) => record,
            other => panic!("expected approved, got {:?}", other),
        };

        let window = record.expires_at - record.approved_at;
        assert_eq!(window.num_minutes(), 30);
        assert!(record.is_active(Utc::now()));
        assert!(!record.is_active(Utc::now() + Duration::minutes(31)));

        let status = coordinator.safety_status(site_id);
        assert_eq!(status.safety_level, "warning");
        assert_eq!(status.active_overrides.len(), 1);
        // the override never transitions the stop machine
        assert!(!status.emergency_stop);
    }

    #[test]
    fn test_override_unknown_event_rejected() {
        let (coordinator, _) = coordinator();
        assert_eq!(
            coordinator
                .request_override(Uuid::new_v4(), "reason", None, "supervisor")
                .unwrap_err(),
            SafetyError::EventNotFound
        );
    }

    #[test]
    fn test_safety_status_levels() {
        let (coordinator, _) = coordinator();
        let site_id = Uuid::new_v4();

        assert_eq!(coordinator.safety_status(site_id).safety_level, "normal");

        coordinator
            .trigger_stop(site_id, "test", "operator", TriggerSource::Manual)
            .unwrap();
        let status = coordinator.safety_status(site_id);
        assert_eq!(status.safety_level, "critical");
        assert!(status.emergency_stop);
        assert!(status.stop_info.is_some());
    }
}
