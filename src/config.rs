//! Configuration module

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Rolling history window kept per sensor
    pub history_window: usize,

    /// TTL for emergency-stop release confirmation codes (seconds)
    pub release_code_ttl_secs: i64,

    /// TTL for safety-override confirmation codes (seconds)
    pub override_code_ttl_secs: i64,

    /// How long an approved safety override stays active (minutes)
    pub override_duration_minutes: i64,

    /// WebSocket idle timeout before a keepalive is emitted (seconds)
    pub ws_idle_timeout_secs: u64,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),

            history_window: env::var("HISTORY_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),

            release_code_ttl_secs: env::var("RELEASE_CODE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),

            override_code_ttl_secs: env::var("OVERRIDE_CODE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),

            override_duration_minutes: env::var("OVERRIDE_DURATION_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),

            ws_idle_timeout_secs: env::var("WS_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
