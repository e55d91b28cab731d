//! Prediction Types
//!
//! KHÔNG chứa logic - chỉ data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Impact level of one contributing factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl ImpactLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactLevel::Critical => "critical",
            ImpactLevel::High => "high",
            ImpactLevel::Medium => "medium",
            ImpactLevel::Low => "low",
        }
    }
}

/// One contributing factor with its probability contribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionFactor {
    pub factor: String,
    pub value: String,
    pub impact: ImpactLevel,
    pub contribution: f64,
}

/// Failure prediction for a sensor or a whole site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailurePrediction {
    pub probability: f64,
    pub confidence: f64,
    pub predicted_time: Option<DateTime<Utc>>,
    pub factors: Vec<PredictionFactor>,
    pub explanation: String,
}

impl FailurePrediction {
    /// Default result when the target has no data to predict from
    pub fn empty(explanation: impl Into<String>) -> Self {
        Self {
            probability: 0.0,
            confidence: 0.0,
            predicted_time: None,
            factors: Vec::new(),
            explanation: explanation.into(),
        }
    }
}
