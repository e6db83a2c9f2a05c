//! Liveness and readiness probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use super::state::AppState;
use crate::api::types::Json;

/// Session probed by the readiness check; reads never create counters
const READINESS_PROBE_SESSION: &str = "__readiness_probe__";

/// Component states, ordered from best to worst
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    fn status_code(self) -> StatusCode {
        match self {
            Self::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
            Self::Healthy | Self::Degraded => StatusCode::OK,
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<ComponentCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl HealthResponse {
    fn new(status: HealthStatus) -> Self {
        Self {
            status,
            version: env!("CARGO_PKG_VERSION"),
            checks: Vec::new(),
            latency_ms: None,
        }
    }
}

#[derive(Serialize)]
pub struct ComponentCheck {
    pub name: &'static str,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl ComponentCheck {
    fn new(name: &'static str, status: HealthStatus) -> Self {
        Self {
            name,
            status,
            message: None,
            latency_ms: None,
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn timed(mut self, since: Instant) -> Self {
        self.latency_ms = Some(since.elapsed().as_millis() as u64);
        self
    }
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse::new(HealthStatus::Healthy))
}

pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness: the usage store must answer. Running without an AI analyzer
/// is reported as degraded, still 200.
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let checks = vec![usage_store_check(&state).await, ai_analyzer_check(&state)];

    let status = checks
        .iter()
        .map(|c| c.status)
        .max()
        .unwrap_or(HealthStatus::Healthy);

    let mut response = HealthResponse::new(status);
    response.checks = checks;
    response.latency_ms = Some(start.elapsed().as_millis() as u64);

    (status.status_code(), Json(response))
}

async fn usage_store_check(state: &AppState) -> ComponentCheck {
    let start = Instant::now();

    match state
        .quota_manager
        .check_usage_quota(READINESS_PROBE_SESSION)
        .await
    {
        Ok(_) => ComponentCheck::new("usage_store", HealthStatus::Healthy).timed(start),
        Err(e) => ComponentCheck::new("usage_store", HealthStatus::Unhealthy)
            .with_message(e.to_string())
            .timed(start),
    }
}

fn ai_analyzer_check(state: &AppState) -> ComponentCheck {
    if state.analysis_service.ai_available() {
        ComponentCheck::new("ai_analyzer", HealthStatus::Healthy)
    } else {
        ComponentCheck::new("ai_analyzer", HealthStatus::Degraded)
            .with_message("AI analysis disabled; serving rule-based results")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::state::test_support::rule_based_state;

    #[test]
    fn test_status_ordering() {
        assert!(HealthStatus::Unhealthy > HealthStatus::Degraded);
        assert!(HealthStatus::Degraded > HealthStatus::Healthy);
        assert_eq!(HealthStatus::Degraded.status_code(), StatusCode::OK);
    }

    #[test]
    fn test_plain_health_body() {
        let json = serde_json::to_value(HealthResponse::new(HealthStatus::Healthy)).unwrap();

        assert_eq!(json["status"], "healthy");
        assert!(json.get("checks").is_none());
        assert!(json.get("latency_ms").is_none());
    }

    #[tokio::test]
    async fn test_readiness_degraded_without_ai() {
        let state = rule_based_state();

        assert_eq!(usage_store_check(&state).await.status, HealthStatus::Healthy);
        assert_eq!(ai_analyzer_check(&state).status, HealthStatus::Degraded);

        let response = ready_check(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
