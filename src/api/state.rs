//! Application state for shared services

use std::sync::Arc;

use crate::domain::catalog::ModelCatalog;
use crate::infrastructure::analysis::AtsAnalysisServiceTrait;
use crate::infrastructure::usage::QuotaManagerTrait;

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub analysis_service: Arc<dyn AtsAnalysisServiceTrait>,
    pub quota_manager: Arc<dyn QuotaManagerTrait>,
    pub model_catalog: Arc<dyn ModelCatalog>,
}

impl AppState {
    pub fn new(
        analysis_service: Arc<dyn AtsAnalysisServiceTrait>,
        quota_manager: Arc<dyn QuotaManagerTrait>,
        model_catalog: Arc<dyn ModelCatalog>,
    ) -> Self {
        Self {
            analysis_service,
            quota_manager,
            model_catalog,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("ai_available", &self.analysis_service.ai_available())
            .field("models", &self.model_catalog.get_available_models().len())
            .finish()
    }
}
