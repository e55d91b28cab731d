//! Grid-Shield Monitoring Core
//!
//! Real-time anomaly, risk and safety-response engine for critical
//! infrastructure sites.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  GRID-SHIELD MONITORING CORE                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  Ingest / │  │  Anomaly  │  │  Risk / Failure         │ │
//! │  │  API      │─▶│  Engine   │─▶│  Scoring                │ │
//! │  │  (Axum)   │  └─────┬─────┘  └────────────┬────────────┘ │
//! │  └─────┬─────┘        ▼                     ▼              │
//! │        │        ┌───────────┐       ┌─────────────┐        │
//! │        │        │  Safety   │──────▶│ Connection  │        │
//! │        └───────▶│Coordinator│       │    Hub      │──▶ ws  │
//! │                 └───────────┘       └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod logic;
mod middleware;
mod models;
mod realtime;
mod repo;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logic::anomaly::AnomalyEngine;
use logic::predict::FailurePredictor;
use logic::risk::RiskAggregator;
use logic::safety::SafetyCoordinator;
use realtime::ConnectionHub;
use repo::{EventStore, InMemoryEventStore, InMemorySensorDirectory, SensorDirectory};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging: structured JSON in production, readable elsewhere
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gridshield_core=debug,tower_http=debug".into());
    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Grid-Shield Monitoring Core starting...");
    tracing::info!("Environment: {}", config.environment);

    let state = AppState::build(config.clone());
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub sensors: Arc<InMemorySensorDirectory>,
    pub events: Arc<InMemoryEventStore>,
    pub engine: Arc<AnomalyEngine>,
    pub risk: Arc<RiskAggregator>,
    pub predictor: Arc<FailurePredictor>,
    pub safety: Arc<SafetyCoordinator>,
    pub hub: Arc<ConnectionHub>,
}

impl AppState {
    /// Wire every engine with its explicitly owned stores
    fn build(config: config::Config) -> Self {
        let sensors = Arc::new(InMemorySensorDirectory::new());
        let events = Arc::new(InMemoryEventStore::new());
        let hub = Arc::new(ConnectionHub::new());

        let sensors_dyn: Arc<dyn SensorDirectory> = sensors.clone();
        let events_dyn: Arc<dyn EventStore> = events.clone();

        let engine = Arc::new(AnomalyEngine::new(config.history_window));
        let risk = Arc::new(RiskAggregator::new(sensors_dyn.clone(), events_dyn.clone()));
        let predictor = Arc::new(FailurePredictor::new(sensors_dyn, events_dyn.clone()));
        let safety = Arc::new(SafetyCoordinator::new(
            events_dyn,
            hub.clone(),
            config.release_code_ttl_secs,
            config.override_code_ttl_secs,
            config.override_duration_minutes,
        ));

        Self {
            config,
            sensors,
            events,
            engine,
            risk,
            predictor,
            safety,
            hub,
        }
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))

        // Sensors
        .route("/api/v1/sensors", post(handlers::sensors::register))
        .route("/api/v1/sensors/ingest", post(handlers::sensors::ingest))

        // AI
        .route("/api/v1/ai/anomaly/detect", post(handlers::ai::detect_anomaly))
        .route("/api/v1/ai/risk/score", post(handlers::ai::risk_score))
        .route("/api/v1/ai/predict/failure", post(handlers::ai::predict_failure))

        // Alerts
        .route("/api/v1/alerts", post(handlers::alerts::create))

        // Safety
        .route("/api/v1/safety/emergency-stop", post(handlers::safety::emergency_stop))
        .route(
            "/api/v1/safety/emergency-stop/release",
            post(handlers::safety::release_emergency_stop),
        )
        .route("/api/v1/safety/override", post(handlers::safety::request_override))
        .route("/api/v1/safety/status/:site_id", get(handlers::safety::safety_status))

        // Realtime
        .route("/api/v1/ws/connect", get(handlers::ws::connect))
        .route("/api/v1/ws/stats", get(handlers::health::hub_stats))

        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
