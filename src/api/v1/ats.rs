//! Résumé ATS endpoints

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::catalog::{Complexity, CostSensitivity, ModelDescriptor, TaskKind};
use crate::domain::usage::{QuotaState, UsageSummary};
use crate::infrastructure::analysis::{AnalyzeRequest, AnalyzeResponse};

/// POST /v1/ats/analyze
pub async fn analyze_resume(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    debug!(
        chars = request.resume_text.chars().count(),
        industry = ?request.target_industry,
        use_ai = request.use_ai,
        "Analyzing resume"
    );

    let response = state.analysis_service.analyze(request).await?;

    Ok(Json(response))
}

/// GET /v1/ats/quota/{session_id}
pub async fn get_quota(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<QuotaState>, ApiError> {
    let quota = state.quota_manager.check_usage_quota(&session_id).await?;

    Ok(Json(quota))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummaryResponse {
    #[serde(flatten)]
    pub summary: UsageSummary,
    pub total_cost_usd: f64,
}

/// GET /v1/ats/usage/{session_id}
pub async fn get_usage(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<UsageSummaryResponse>, ApiError> {
    let summary = state.quota_manager.usage_summary(&session_id).await?;

    Ok(Json(UsageSummaryResponse {
        total_cost_usd: summary.aggregate.total_cost_usd(),
        summary,
    }))
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub object: &'static str,
    pub data: Vec<ModelDescriptor>,
}

/// GET /v1/ats/models
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        object: "list",
        data: state.model_catalog.get_available_models(),
    })
}

/// GET /v1/ats/models/{model_id}
pub async fn get_model(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
) -> Result<Json<ModelDescriptor>, ApiError> {
    state
        .model_catalog
        .get_model(&model_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Model '{}' not found", model_id)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendParams {
    #[serde(default = "default_task")]
    pub task: TaskKind,
    #[serde(default = "default_complexity")]
    pub complexity: Complexity,
    #[serde(default = "default_cost_sensitivity")]
    pub cost_sensitivity: CostSensitivity,
}

fn default_task() -> TaskKind {
    TaskKind::Analysis
}

fn default_complexity() -> Complexity {
    Complexity::Medium
}

fn default_cost_sensitivity() -> CostSensitivity {
    CostSensitivity::Low
}

/// GET /v1/ats/models/recommend
pub async fn recommend_model(
    State(state): State<AppState>,
    Query(params): Query<RecommendParams>,
) -> Result<Json<ModelDescriptor>, ApiError> {
    let model = state.model_catalog.recommend_model_for_task(
        params.task,
        params.complexity,
        params.cost_sensitivity,
    )?;

    Ok(Json(model))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::api::router::create_router_with_state;
    use crate::api::state::test_support::rule_based_state;
    use crate::domain::analysis::SAMPLE_RESUME;

    async fn call(request: Request<Body>) -> (StatusCode, Value) {
        let response = create_router_with_state(rule_based_state(), None)
            .oneshot(request)
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_analyze_returns_rule_based_report() {
        let (status, body) = call(post_json(
            "/v1/ats/analyze",
            serde_json::json!({
                "resumeText": SAMPLE_RESUME,
                "targetIndustry": "technology",
                "sessionId": "user-1"
            }),
        ))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["aiEnhanced"], false);
        assert!(body["analysis"]["overallScore"].as_u64().unwrap() <= 100);
        assert!(body["analysis"]["sections"]["keywords"]["score"].is_u64());
        assert_eq!(body["quota"]["sessionId"], "user-1");
    }

    #[tokio::test]
    async fn test_analyze_rejects_short_text() {
        let (status, body) = call(post_json(
            "/v1/ats/analyze",
            serde_json::json!({ "resumeText": "hi" }),
        ))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request_error");
    }

    #[tokio::test]
    async fn test_analyze_rejects_missing_field() {
        let (status, body) = call(post_json("/v1/ats/analyze", serde_json::json!({}))).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "invalid_json");
    }

    #[tokio::test]
    async fn test_quota_for_new_session() {
        let (status, body) = call(get("/v1/ats/quota/fresh")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dailyTokensUsed"], 0);
        assert_eq!(body["canProceed"], true);
        assert_eq!(body["dailyTokenLimit"], 50_000);
    }

    #[tokio::test]
    async fn test_usage_summary_for_new_session() {
        let (status, body) = call(get("/v1/ats/usage/fresh")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessionId"], "fresh");
        assert_eq!(body["aggregate"]["total_requests"], 0);
        assert_eq!(body["totalCostUsd"], 0.0);
    }

    #[tokio::test]
    async fn test_models_endpoints() {
        let (status, body) = call(get("/v1/ats/models")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 5);

        let (status, body) = call(get("/v1/ats/models/gpt-4o")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["provider"], "openai");

        let (status, _) = call(get("/v1/ats/models/unknown")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_recommend_model() {
        let (status, body) = call(get(
            "/v1/ats/models/recommend?complexity=high&costSensitivity=high",
        ))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "gpt-4o-mini");
    }
}
