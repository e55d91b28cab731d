//! Multivariate Outlier Model
//!
//! Per-channel mean/std statistics trained over the recent history window.
//! A reading is an outlier when its normalized deviation distance crosses
//! the cutoff; the score is that distance mapped into [0, 1].

use std::collections::HashMap;

use super::rules::{DEVIATION_SIGMA, MAX_OUTLIER_FEATURES, OUTLIER_CUTOFF};
use super::types::{ContributionKind, FeatureContribution};

const STD_EPSILON: f64 = 1e-6;

/// Trained statistics for one sensor
#[derive(Debug, Clone)]
pub struct OutlierModel {
    feature_names: Vec<String>,
    mean: Vec<f64>,
    std: Vec<f64>,
}

/// Verdict for one evaluated reading
#[derive(Debug, Clone)]
pub struct OutlierVerdict {
    pub is_outlier: bool,
    /// Normalized deviation distance in [0, 1]
    pub score: f64,
    /// Channels beyond DEVIATION_SIGMA, strongest first
    pub features: Vec<FeatureContribution>,
}

impl OutlierModel {
    /// Train from the rows of a history window.
    ///
    /// `feature_names` fixes the channel order; channels missing from a row
    /// are filled with 0.0, matching the evaluation-side fill.
    pub fn train(feature_names: Vec<String>, window: &[&HashMap<String, f64>]) -> Self {
        let cols = feature_names.len();
        let rows = window.len().max(1) as f64;

        let mut mean = vec![0.0f64; cols];
        for row in window {
            for (i, name) in feature_names.iter().enumerate() {
                mean[i] += row.get(name).copied().unwrap_or(0.0);
            }
        }
        for m in mean.iter_mut() {
            *m /= rows;
        }

        let mut std = vec![0.0f64; cols];
        for row in window {
            for (i, name) in feature_names.iter().enumerate() {
                let v = row.get(name).copied().unwrap_or(0.0);
                std[i] += (v - mean[i]).powi(2);
            }
        }
        for s in std.iter_mut() {
            *s = (*s / rows).sqrt() + STD_EPSILON;
        }

        Self {
            feature_names,
            mean,
            std,
        }
    }

    /// Score one reading against the trained statistics
    pub fn evaluate(&self, values: &HashMap<String, f64>) -> OutlierVerdict {
        let mut sum_sq = 0.0f64;
        let mut deviations: Vec<(usize, f64, f64)> = Vec::new();

        for (i, name) in self.feature_names.iter().enumerate() {
            let v = values.get(name).copied().unwrap_or(0.0);
            let v = if v.is_finite() { v } else { 0.0 };
            let sigma = (v - self.mean[i]).abs() / self.std[i];
            sum_sq += sigma * sigma;
            deviations.push((i, v, sigma));
        }

        let cols = self.feature_names.len().max(1) as f64;
        let distance = (sum_sq / cols).sqrt();
        let is_outlier = distance > OUTLIER_CUTOFF;
        let score = (distance / (OUTLIER_CUTOFF * 2.0)).clamp(0.0, 1.0);

        let mut features: Vec<FeatureContribution> = deviations
            .into_iter()
            .filter(|(_, _, sigma)| *sigma > DEVIATION_SIGMA)
            .map(|(i, value, sigma)| FeatureContribution {
                feature: self.feature_names[i].clone(),
                value,
                severity: (sigma / (DEVIATION_SIGMA * 2.0)).min(1.0),
                kind: ContributionKind::Deviation {
                    sigma,
                    mean: self.mean[i],
                },
            })
            .collect();
        features.sort_by(|a, b| {
            let sa = match a.kind {
                ContributionKind::Deviation { sigma, .. } => sigma,
                _ => 0.0,
            };
            let sb = match b.kind {
                ContributionKind::Deviation { sigma, .. } => sigma,
                _ => 0.0,
            };
            sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
        });
        features.truncate(MAX_OUTLIER_FEATURES);

        OutlierVerdict {
            is_outlier,
            score,
            features,
        }
    }
}
