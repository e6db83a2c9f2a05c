//! Résumé analysis services

mod ai_augmented;
mod service;

pub use ai_augmented::{AiAnalysis, AiAnalyzerConfig, AiAugmentedAnalyzer};
pub use service::{
    executor_for, AnalyzeRequest, AnalyzeResponse, AtsAnalysisService, AtsAnalysisServiceTrait,
};
