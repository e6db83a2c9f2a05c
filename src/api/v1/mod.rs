//! v1 API endpoints

pub mod ats;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

/// Create v1 API router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/ats/analyze", post(ats::analyze_resume))
        .route("/ats/quota/{session_id}", get(ats::get_quota))
        .route("/ats/usage/{session_id}", get(ats::get_usage))
        .route("/ats/models", get(ats::list_models))
        .route("/ats/models/recommend", get(ats::recommend_model))
        .route("/ats/models/{model_id}", get(ats::get_model))
}
