// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{analytics_handler, generate_handler, health_handler, metrics_handler};
use super::middleware::request_id_layers;
use crate::config::AppConfig;
use crate::error::Result;
use crate::generation::Orchestrator;
use crate::policy::CostMode;
use axum::{routing::{get, post}, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub orchestrator: Arc<Orchestrator>,
    pub default_mode: CostMode,
}

pub fn create_router(config: AppConfig, orchestrator: Arc<Orchestrator>) -> Result<Router> {
    let default_mode = config.default_mode()?;
    let state = AppState {
        config,
        orchestrator,
        default_mode,
    };

    let (set_request_id, propagate_request_id) = request_id_layers();

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/v1/generate", post(generate_handler))
        .route("/v1/analytics", get(analytics_handler))
        // Requests are small structured forms
        .layer(tower_http::limit::RequestBodyLimitLayer::new(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state);

    Ok(app)
}
