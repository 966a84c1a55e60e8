// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::routes::AppState;
use crate::analytics::AnalyticsReport;
use crate::error::{EventForgeError, GenerationError, Stage};
use crate::models::{ContentKind, GenerationRequest, GenerationResult};
use crate::policy::{profile_for, CostMode};
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HashMap<String, HealthCheck>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: String,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();
    let mut overall_status = HealthStatus::Healthy;

    // Check response cache
    let stats = state.orchestrator.cache().stats();
    let cache_check = if stats.enabled {
        HealthCheck {
            status: "ok".to_string(),
            message: format!("{}/{} entries", stats.entries, stats.capacity),
        }
    } else {
        overall_status = HealthStatus::Degraded;
        HealthCheck {
            status: "warning".to_string(),
            message: "Cache disabled, every request goes upstream".to_string(),
        }
    };
    checks.insert("cache".to_string(), cache_check);

    // Check recent error rate
    let snapshot = state.orchestrator.analytics_snapshot();
    let error_rate = snapshot.error_rate();
    let upstream_check = if error_rate > 0.05 {
        overall_status = HealthStatus::Degraded;
        HealthCheck {
            status: "warning".to_string(),
            message: format!(
                "{:.1}% of {} requests failed",
                error_rate * 100.0,
                snapshot.total_requests
            ),
        }
    } else {
        HealthCheck {
            status: "ok".to_string(),
            message: format!("{} requests served", snapshot.total_requests),
        }
    };
    checks.insert("upstream".to_string(), upstream_check);

    // Check configuration
    let config_check = HealthCheck {
        status: "ok".to_string(),
        message: format!(
            "API base: {}, default mode: {}",
            state.config.provider.api_base_url, state.default_mode
        ),
    };
    checks.insert("configuration".to_string(), config_check);

    Json(HealthResponse {
        status: overall_status,
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// JSON body accepted by `POST /v1/generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub kind: ContentKind,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub tone: String,
    pub title: Option<String>,
    pub count: Option<u8>,
    pub max_chars: Option<u32>,
    pub context: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub mode: Option<String>,
}

impl GenerateBody {
    /// Build the domain request; unknown modes are rejected.
    pub fn into_request(self, default_mode: CostMode) -> Result<GenerationRequest, EventForgeError> {
        let mode = match self.mode.as_deref() {
            Some(mode) => profile_for(mode)?.mode,
            None => default_mode,
        };

        let mut builder = match self.kind {
            ContentKind::Title => {
                GenerationRequest::titles(self.category, self.event_type, self.tone)
            }
            ContentKind::Description => GenerationRequest::description(
                self.title.unwrap_or_default(),
                self.category,
                self.event_type,
                self.tone,
            ),
        };

        if let Some(count) = self.count {
            builder = builder.count(count);
        }
        if let Some(max_chars) = self.max_chars {
            builder = builder.max_chars(max_chars);
        }

        Ok(builder
            .maybe_context(self.context)
            .tags(self.tags)
            .mode(mode)
            .build())
    }
}

/// Handler for /v1/generate
pub async fn generate_handler(
    State(state): State<AppState>,
    body: String, // Raw body for clearer error messages
) -> Result<Json<GenerationResult>, GenerationError> {
    let body: GenerateBody = serde_json::from_str(&body).map_err(|e| {
        debug!("Rejected generate body: {}", e);
        GenerationError::new(
            Stage::Validate,
            EventForgeError::Validation(format!("JSON deserialization error: {}", e)),
        )
    })?;

    let request = body
        .into_request(state.default_mode)
        .map_err(|e| GenerationError::new(Stage::Validate, e))?;

    info!(
        "Received generate request: kind={}, mode={}",
        request.kind(),
        request.mode()
    );

    let result = state.orchestrator.generate(&request).await?;
    Ok(Json(result))
}

/// Handler for /v1/analytics
pub async fn analytics_handler(State(state): State<AppState>) -> Json<AnalyticsReport> {
    Json(state.orchestrator.analytics_snapshot().report())
}

/// Handler for /metrics (Prometheus text format)
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
}
