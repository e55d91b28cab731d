//! Confirmation Codes
//!
//! Single-use, time-bounded codes gating safety-critical transitions.
//! One pending code per (action, target); expiry is lazy - an expired entry
//! is dropped the next time its slot is read.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::Rng;
use uuid::Uuid;

const CODE_LENGTH: usize = 6;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Action a code authorizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfirmAction {
    ReleaseStop,
    ApplyOverride,
}

#[derive(Debug, Clone)]
struct PendingCode {
    code: String,
    issued_to: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Outcome of checking a presented code against the pending slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeCheck {
    /// Nothing pending (never issued, expired, or already consumed)
    NoPending,
    /// A code is pending but the presented one does not match
    Mismatch,
    /// Matched; the pending code has been consumed
    Consumed,
}

/// Grant returned when a fresh code is issued
#[derive(Debug, Clone)]
pub struct CodeGrant {
    pub code: String,
    pub expires_in_seconds: i64,
}

#[derive(Default)]
pub struct ConfirmationCodes {
    pending: Mutex<HashMap<(ConfirmAction, Uuid), PendingCode>>,
}

impl ConfirmationCodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh code for (action, target), replacing any stale one
    pub fn issue(
        &self,
        action: ConfirmAction,
        target: Uuid,
        issued_to: &str,
        ttl_secs: i64,
    ) -> CodeGrant {
        let code = generate_code();
        let now = Utc::now();

        self.pending.lock().insert(
            (action, target),
            PendingCode {
                code: code.clone(),
                issued_to: issued_to.to_string(),
                issued_at: now,
                expires_at: now + Duration::seconds(ttl_secs),
            },
        );

        CodeGrant {
            code,
            expires_in_seconds: ttl_secs,
        }
    }

    /// Check a presented code. Only a successful match consumes the pending
    /// entry; a mismatch leaves it in place for a corrected retry.
    pub fn check(&self, action: ConfirmAction, target: Uuid, presented: Option<&str>) -> CodeCheck {
        let mut pending = self.pending.lock();
        let key = (action, target);

        let Some(entry) = pending.get(&key) else {
            return CodeCheck::NoPending;
        };

        if entry.expires_at <= Utc::now() {
            pending.remove(&key);
            return CodeCheck::NoPending;
        }

        match presented {
            Some(code) if code == entry.code => {
                pending.remove(&key);
                CodeCheck::Consumed
            }
            _ => CodeCheck::Mismatch,
        }
    }

    /// True when an unexpired code is pending for (action, target)
    pub fn has_pending(&self, action: ConfirmAction, target: Uuid) -> bool {
        self.pending
            .lock()
            .get(&(action, target))
            .is_some_and(|e| e.expires_at > Utc::now())
    }

}

fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}
