//! Résumé analysis pipeline
//!
//! Validates input, gates the AI path on the session quota, runs the AI
//! analyzer with the rule-based analyzer as fallback and records usage.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::ai_augmented::{AiAnalysis, AiAugmentedAnalyzer};
use crate::domain::fallback::{operation, AttemptRecord, FallbackExecutor};
use crate::domain::score::ScoreModel;
use crate::domain::usage::{QuotaState, UsageOperation};
use crate::domain::{DomainError, RuleBasedAnalyzer};
use crate::infrastructure::observability::{record_analysis, record_fallback};
use crate::infrastructure::usage::{QuotaManagerTrait, TrackUsageParams};

const ANALYSIS_LABEL: &str = "Resume ATS analysis";

fn default_use_ai() -> bool {
    true
}

/// Analysis request, as accepted by the HTTP API and the CLI
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub resume_text: String,
    #[serde(default)]
    pub target_industry: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Explicit model for the AI path
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_use_ai", rename = "useAI")]
    pub use_ai: bool,
}

impl AnalyzeRequest {
    pub fn new(resume_text: impl Into<String>) -> Self {
        Self {
            resume_text: resume_text.into(),
            target_industry: None,
            session_id: None,
            model: None,
            use_ai: true,
        }
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.target_industry = Some(industry.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_use_ai(mut self, use_ai: bool) -> Self {
        self.use_ai = use_ai;
        self
    }
}

/// Analysis result with the session's quota position after the call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub analysis: ScoreModel,
    pub ai_enhanced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaState>,
    pub response_time_ms: u64,
    /// Model that produced an AI-enhanced report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Operations tried, in order; empty when no fallback chain ran
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<AttemptRecord>,
}

/// Résumé analysis entry point
#[async_trait]
pub trait AtsAnalysisServiceTrait: Send + Sync + Debug {
    async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse, DomainError>;

    /// Whether an AI analyzer is configured
    fn ai_available(&self) -> bool;
}

enum Outcome {
    Ai(AiAnalysis),
    RuleBased(ScoreModel),
}

/// Analysis pipeline over the rule-based and AI analyzers
#[derive(Debug)]
pub struct AtsAnalysisService {
    rule_based: RuleBasedAnalyzer,
    ai: Option<Arc<AiAugmentedAnalyzer>>,
    quota: Arc<dyn QuotaManagerTrait>,
    executor: FallbackExecutor,
    anonymous_session_id: String,
}

impl AtsAnalysisService {
    pub fn new(rule_based: RuleBasedAnalyzer, quota: Arc<dyn QuotaManagerTrait>) -> Self {
        Self {
            rule_based,
            ai: None,
            quota,
            executor: FallbackExecutor::new(),
            anonymous_session_id: "anonymous".to_string(),
        }
    }

    pub fn with_ai_analyzer(mut self, ai: Arc<AiAugmentedAnalyzer>) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn with_executor(mut self, executor: FallbackExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Session charged when a request names none
    pub fn with_anonymous_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.anonymous_session_id = session_id.into();
        self
    }

    fn validate(&self, request: &AnalyzeRequest) -> Result<(), DomainError> {
        let config = self.rule_based.config();
        let meaningful = request.resume_text.trim().chars().count();
        let total = request.resume_text.chars().count();

        if meaningful < config.min_chars {
            return Err(DomainError::validation(format!(
                "Resume text must contain at least {} characters, got {}",
                config.min_chars, meaningful
            )));
        }

        if total > config.max_chars {
            return Err(DomainError::validation(format!(
                "Resume text must not exceed {} characters, got {}",
                config.max_chars, total
            )));
        }

        Ok(())
    }

    async fn quota_after(&self, session_id: &str) -> Option<QuotaState> {
        match self.quota.check_usage_quota(session_id).await {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(session_id, error = %e, "Failed to read quota after analysis");
                None
            }
        }
    }

    async fn rule_based_response(
        &self,
        request: &AnalyzeRequest,
        session_id: &str,
        quota: Option<QuotaState>,
        start: Instant,
        path: &'static str,
    ) -> AnalyzeResponse {
        let analysis = self
            .rule_based
            .analyze(&request.resume_text, request.target_industry.as_deref());
        let elapsed = start.elapsed();

        record_analysis(path, elapsed);

        let quota = match quota {
            Some(state) => Some(state),
            None => self.quota_after(session_id).await,
        };

        AnalyzeResponse {
            analysis,
            ai_enhanced: false,
            quota,
            response_time_ms: elapsed.as_millis() as u64,
            model: None,
            attempts: Vec::new(),
        }
    }

    async fn track(&self, session_id: &str, analysis: &AiAnalysis) {
        let params = TrackUsageParams::new(session_id, UsageOperation::AnalyzeResume, &analysis.model)
            .with_tokens(analysis.input_tokens, analysis.output_tokens)
            .with_text_sizes(analysis.prompt_chars, analysis.completion_chars)
            .with_response_time_ms(analysis.response_time_ms);

        if let Err(e) = self.quota.track_usage(params).await {
            warn!(session_id, error = %e, "Failed to track AI usage");
        }
    }
}

#[async_trait]
impl AtsAnalysisServiceTrait for AtsAnalysisService {
    async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse, DomainError> {
        let start = Instant::now();
        self.validate(&request)?;

        let session_id = request
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.anonymous_session_id)
            .to_string();

        let ai = match (&self.ai, request.use_ai) {
            (Some(ai), true) => ai.clone(),
            _ => {
                return Ok(self
                    .rule_based_response(&request, &session_id, None, start, "rule_based")
                    .await)
            }
        };

        // Held until usage is tracked, so one AI call per session is in flight
        let permit = match self.quota.acquire_ai_permit(&session_id).await {
            Ok(permit) => permit,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Quota check failed, using rule-based analysis");
                return Ok(self
                    .rule_based_response(&request, &session_id, None, start, "quota_unavailable")
                    .await);
            }
        };

        if !permit.can_proceed() {
            info!(session_id = %session_id, "Quota exhausted, using rule-based analysis");
            let quota = permit.state().clone();
            drop(permit);
            return Ok(self
                .rule_based_response(&request, &session_id, Some(quota), start, "quota_exhausted")
                .await);
        }

        let text = request.resume_text.as_str();
        let industry = request.target_industry.as_deref();
        let model = request.model.as_deref();
        let session = session_id.as_str();
        let quota_ref = permit.state();
        let rule_based = &self.rule_based;

        let outcome = self
            .executor
            .execute_with_fallback(
                operation(move || async move {
                    ai.analyze(text, industry, session, model, Some(quota_ref))
                        .await
                        .map(Outcome::Ai)
                }),
                operation(move || async move {
                    Ok(Outcome::RuleBased(rule_based.analyze(text, industry)))
                }),
                None,
                ANALYSIS_LABEL,
            )
            .await?;

        let stage = outcome.stage;
        let attempts = outcome.attempts;

        let (analysis, model) = match outcome.value {
            Outcome::Ai(ai_analysis) => {
                self.track(&session_id, &ai_analysis).await;
                (ai_analysis.score, Some(ai_analysis.model))
            }
            Outcome::RuleBased(score) => (score, None),
        };
        drop(permit);

        let elapsed = start.elapsed();
        record_fallback(ANALYSIS_LABEL, stage.as_str());
        record_analysis(if model.is_some() { "ai" } else { "ai_fallback" }, elapsed);

        Ok(AnalyzeResponse {
            ai_enhanced: analysis.ai_enhanced(),
            analysis,
            quota: self.quota_after(&session_id).await,
            response_time_ms: elapsed.as_millis() as u64,
            model,
            attempts,
        })
    }

    fn ai_available(&self) -> bool {
        self.ai.is_some()
    }
}

/// Per-attempt bound slightly above the AI call's own timeout
pub fn executor_for(ai_timeout: Duration) -> FallbackExecutor {
    FallbackExecutor::new().with_attempt_timeout(ai_timeout + Duration::from_secs(1))
}
