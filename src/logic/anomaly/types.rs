//! Anomaly Types
//!
//! Core types cho anomaly detection.
//! KHÔNG chứa logic - chỉ data structures.

use serde::{Deserialize, Serialize};

// ============================================================================
// DETECTION METHODS
// ============================================================================

/// The closed set of detection methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Threshold,
    RateOfChange,
    MultivariateOutlier,
}

impl DetectionMethod {
    /// Anomaly type reported when this method fires
    pub fn anomaly_kind(&self) -> AnomalyKind {
        match self {
            DetectionMethod::Threshold => AnomalyKind::ThresholdViolation,
            DetectionMethod::RateOfChange => AnomalyKind::SuddenChange,
            DetectionMethod::MultivariateOutlier => AnomalyKind::PatternAnomaly,
        }
    }
}

// ============================================================================
// ANOMALY KIND
// ============================================================================

/// Classified anomaly type, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    ThresholdViolation,
    SuddenChange,
    PatternAnomaly,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::ThresholdViolation => "threshold_violation",
            AnomalyKind::SuddenChange => "sudden_change",
            AnomalyKind::PatternAnomaly => "pattern_anomaly",
        }
    }
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// FEATURE CONTRIBUTIONS
// ============================================================================

/// Why one channel contributed to a detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum ContributionKind {
    BelowMinimum {
        threshold: f64,
    },
    AboveMaximum {
        threshold: f64,
    },
    RapidChange {
        previous_value: f64,
        change: f64,
        threshold: f64,
    },
    Deviation {
        sigma: f64,
        mean: f64,
    },
}

/// One channel's contribution to a detection hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: String,
    pub value: f64,
    /// Relative severity in [0, 1]
    pub severity: f64,
    #[serde(flatten)]
    pub kind: ContributionKind,
}

impl FeatureContribution {
    /// Short natural-language clause for the explanation text
    pub fn describe(&self) -> String {
        match &self.kind {
            ContributionKind::BelowMinimum { threshold } => format!(
                "{} ({}) is below minimum threshold ({})",
                self.feature, self.value, threshold
            ),
            ContributionKind::AboveMaximum { threshold } => format!(
                "{} ({}) exceeds maximum threshold ({})",
                self.feature, self.value, threshold
            ),
            ContributionKind::RapidChange {
                change, threshold, ..
            } => format!(
                "{} changed by {:.2} (threshold: {})",
                self.feature, change, threshold
            ),
            ContributionKind::Deviation { sigma, .. } => format!(
                "{} is {:.2}\u{3c3} from normal (value: {})",
                self.feature, sigma, self.value
            ),
        }
    }
}

// ============================================================================
// DETECTION HIT
// ============================================================================

/// Output of one detector when it fires
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionHit {
    pub method: DetectionMethod,
    /// Method score in [0, 1]
    pub score: f64,
    pub features: Vec<FeatureContribution>,
}

// ============================================================================
// ANOMALY RESULT
// ============================================================================

/// Combined detection result for one reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub is_anomaly: bool,
    /// Mean of fired method scores, in [0, 1]
    pub score: f64,
    pub confidence: f64,
    pub anomaly_type: Option<AnomalyKind>,
    pub detection_methods: Vec<DetectionMethod>,
    pub contributing_features: Vec<FeatureContribution>,
    pub explanation: String,
    pub recommended_action: Option<String>,
    pub inference_time_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_above_maximum() {
        let c = FeatureContribution {
            feature: "temp".into(),
            value: 95.0,
            severity: 0.12,
            kind: ContributionKind::AboveMaximum { threshold: 85.0 },
        };
        assert_eq!(c.describe(), "temp (95) exceeds maximum threshold (85)");
    }

    #[test]
    fn test_method_precedence_mapping() {
        assert_eq!(
            DetectionMethod::Threshold.anomaly_kind(),
            AnomalyKind::ThresholdViolation
        );
        assert_eq!(
            DetectionMethod::RateOfChange.anomaly_kind(),
            AnomalyKind::SuddenChange
        );
        assert_eq!(
            DetectionMethod::MultivariateOutlier.anomaly_kind(),
            AnomalyKind::PatternAnomaly
        );
    }
}
