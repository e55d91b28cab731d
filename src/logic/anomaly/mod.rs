//! Anomaly Engine
//!
//! Streaming anomaly detection per sensor: threshold, rate-of-change and
//! multivariate outlier checks over a bounded rolling history window.
//!
//! State is sharded per sensor behind its own mutex: readings for the same
//! sensor are serialized (append + amortized retrain), different sensors
//! proceed in parallel.

pub mod detectors;
pub mod outlier;
pub mod rules;
pub mod types;

#[cfg(test)]
mod tests;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::models::{Reading, SensorType, ThresholdProfile};

use detectors::{
    DetectionContext, Detector, OutlierDetector, RateOfChangeDetector, ThresholdDetector,
};
use outlier::OutlierModel;
use rules::{
    ACTION_HIGH, ACTION_HIGH_SCORE, ACTION_IMMEDIATE, ACTION_IMMEDIATE_SCORE, ACTION_MONITOR,
    CONFIDENCE_BASE, CONFIDENCE_CAP, CONFIDENCE_PER_METHOD, EXPLANATION_FEATURES,
    MAX_CONTRIBUTING_FEATURES, MIN_OUTLIER_HISTORY, RETRAIN_INTERVAL, TRAIN_WINDOW,
};
use types::{AnomalyResult, DetectionHit, DetectionMethod};

pub use types::{ContributionKind, FeatureContribution};

// ============================================================================
// PER-SENSOR STATE
// ============================================================================

struct SensorState {
    history: VecDeque<Reading>,
    model: Option<OutlierModel>,
    samples_since_train: usize,
}

impl SensorState {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            model: None,
            samples_since_train: 0,
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct AnomalyEngine {
    model_id: Uuid,
    history_window: usize,
    sensors: RwLock<HashMap<String, Arc<Mutex<SensorState>>>>,
}

impl AnomalyEngine {
    pub fn new(history_window: usize) -> Self {
        Self {
            model_id: Uuid::new_v4(),
            history_window,
            sensors: RwLock::new(HashMap::new()),
        }
    }

    /// Identifier stamped into inference audit records
    pub fn model_id(&self) -> Uuid {
        self.model_id
    }

    /// Current history length for a sensor (0 when never seen)
    pub fn history_len(&self, sensor_uid: &str) -> usize {
        self.sensors
            .read()
            .get(sensor_uid)
            .map(|s| s.lock().history.len())
            .unwrap_or(0)
    }

    /// Run all detectors against one reading.
    ///
    /// The reading is appended to the sensor history only after detection,
    /// so it never contaminates its own rate-of-change or outlier baseline.
    pub fn detect(
        &self,
        sensor_uid: &str,
        values: &HashMap<String, f64>,
        sensor_type: SensorType,
        thresholds: Option<ThresholdProfile>,
    ) -> AnomalyResult {
        let started = Instant::now();
        let thresholds = thresholds.unwrap_or_else(|| sensor_type.default_thresholds());

        let state = self.sensor_state(sensor_uid);
        let mut state = state.lock();

        // Amortized retraining: first when enough history exists, then
        // again every RETRAIN_INTERVAL appended samples.
        if state.history.len() >= MIN_OUTLIER_HISTORY
            && (state.model.is_none() || state.samples_since_train >= RETRAIN_INTERVAL)
        {
            let model = {
                let mut names: Vec<String> = values.keys().cloned().collect();
                names.sort();
                let skip = state.history.len().saturating_sub(TRAIN_WINDOW);
                let window: Vec<&HashMap<String, f64>> =
                    state.history.iter().skip(skip).map(|r| &r.values).collect();
                OutlierModel::train(names, &window)
            };
            state.model = Some(model);
            state.samples_since_train = 0;
        }

        let hits = {
            let ctx = DetectionContext {
                values,
                thresholds: &thresholds,
                history: &state.history,
                model: state.model.as_ref(),
            };
            let detectors: [&dyn Detector; 3] =
                [&ThresholdDetector, &RateOfChangeDetector, &OutlierDetector];
            detectors
                .iter()
                .filter_map(|d| d.evaluate(&ctx))
                .collect::<Vec<DetectionHit>>()
        };

        let mut result = combine(hits);

        state.history.push_back(Reading {
            sensor_uid: sensor_uid.to_string(),
            timestamp: Utc::now(),
            values: values.clone(),
        });
        while state.history.len() > self.history_window {
            state.history.pop_front();
        }
        state.samples_since_train += 1;

        result.inference_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        tracing::debug!(
            sensor_uid,
            is_anomaly = result.is_anomaly,
            score = result.score,
            methods = result.detection_methods.len(),
            "anomaly detection completed"
        );

        result
    }

    fn sensor_state(&self, sensor_uid: &str) -> Arc<Mutex<SensorState>> {
        if let Some(state) = self.sensors.read().get(sensor_uid) {
            return state.clone();
        }
        self.sensors
            .write()
            .entry(sensor_uid.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SensorState::new())))
            .clone()
    }
}

// ============================================================================
// REDUCER
// ============================================================================

/// Fixed reducer over the fired detectors.
///
/// Detectors are evaluated in precedence order (threshold, rate, outlier),
/// so the first hit also decides the reported anomaly type.
fn combine(hits: Vec<DetectionHit>) -> AnomalyResult {
    if hits.is_empty() {
        return AnomalyResult {
            is_anomaly: false,
            score: 0.0,
            confidence: CONFIDENCE_CAP,
            anomaly_type: None,
            detection_methods: Vec::new(),
            contributing_features: Vec::new(),
            explanation: "All readings within normal parameters.".to_string(),
            recommended_action: None,
            inference_time_ms: 0.0,
        };
    }

    let methods: Vec<DetectionMethod> = hits.iter().map(|h| h.method).collect();
    let score = (hits.iter().map(|h| h.score).sum::<f64>() / hits.len() as f64).clamp(0.0, 1.0);
    let confidence =
        (CONFIDENCE_BASE + CONFIDENCE_PER_METHOD * hits.len() as f64).min(CONFIDENCE_CAP);

    // detectors run in precedence order, so the first hit decides the type
    let anomaly_type = methods[0].anomaly_kind();

    let mut features: Vec<_> = hits.into_iter().flat_map(|h| h.features).collect();

    let clauses: Vec<String> = features
        .iter()
        .take(EXPLANATION_FEATURES)
        .map(|f| f.describe())
        .collect();
    let explanation = if clauses.is_empty() {
        "Anomaly detected based on pattern analysis.".to_string()
    } else {
        clauses.join("; ")
    };

    features.truncate(MAX_CONTRIBUTING_FEATURES);

    let recommended_action = if score > ACTION_IMMEDIATE_SCORE {
        ACTION_IMMEDIATE
    } else if score > ACTION_HIGH_SCORE {
        ACTION_HIGH
    } else {
        ACTION_MONITOR
    };

    AnomalyResult {
        is_anomaly: true,
        score,
        confidence,
        anomaly_type: Some(anomaly_type),
        detection_methods: methods,
        contributing_features: features,
        explanation,
        recommended_action: Some(recommended_action.to_string()),
        inference_time_ms: 0.0,
    }
}
