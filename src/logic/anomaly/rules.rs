//! Detection Rules & Thresholds
//!
//! Định nghĩa các tunables cho detection pipeline.
//! KHÔNG chứa logic detect - chỉ constants.

// ============================================================================
// HISTORY REQUIREMENTS
// ============================================================================

/// Rate-of-change needs at least this many past readings
pub const MIN_RATE_HISTORY: usize = 2;

/// Outlier model needs at least this many past readings before training
pub const MIN_OUTLIER_HISTORY: usize = 20;

/// Outlier model trains on at most this many recent readings
pub const TRAIN_WINDOW: usize = 50;

/// Retrain the outlier model after this many new samples
pub const RETRAIN_INTERVAL: usize = 20;

// ============================================================================
// SCORING
// ============================================================================

/// Threshold violation: score = min(1, BASE + severity * SPAN)
pub const THRESHOLD_SCORE_BASE: f64 = 0.5;
pub const THRESHOLD_SCORE_SPAN: f64 = 0.5;

/// Rate violation: score = min(1, BASE + severity * SPAN)
pub const RATE_SCORE_BASE: f64 = 0.6;
pub const RATE_SCORE_SPAN: f64 = 0.4;

/// Normalized deviation distance beyond this = outlier
pub const OUTLIER_CUTOFF: f64 = 2.0;

/// Channels deviating beyond this many sigma are reported as contributors
pub const DEVIATION_SIGMA: f64 = 2.0;

// ============================================================================
// COMBINATION
// ============================================================================

/// Confidence = min(CAP, BASE + PER_METHOD * fired_methods)
pub const CONFIDENCE_CAP: f64 = 0.95;
pub const CONFIDENCE_BASE: f64 = 0.5;
pub const CONFIDENCE_PER_METHOD: f64 = 0.15;

/// Contributing features kept on the result
pub const MAX_CONTRIBUTING_FEATURES: usize = 5;

/// Features rendered into the explanation text
pub const EXPLANATION_FEATURES: usize = 3;

/// Outlier contributors kept per detection
pub const MAX_OUTLIER_FEATURES: usize = 3;

// ============================================================================
// RECOMMENDED ACTIONS
// ============================================================================

/// Score above this = immediate investigation
pub const ACTION_IMMEDIATE_SCORE: f64 = 0.8;

/// Score above this = high priority review
pub const ACTION_HIGH_SCORE: f64 = 0.6;

pub const ACTION_IMMEDIATE: &str =
    "IMMEDIATE: Investigate sensor readings. Possible equipment failure.";
pub const ACTION_HIGH: &str = "HIGH: Review sensor data and check for environmental factors.";
pub const ACTION_MONITOR: &str = "MONITOR: Track readings for developing patterns.";
