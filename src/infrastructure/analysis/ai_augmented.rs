//! AI-augmented résumé analyzer
//!
//! Asks a language model for the same four-section report the rule-based
//! analyzer produces, seeded with the rule-based scores. Anything short of a
//! complete, in-range report is an error so callers can fall back.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{AiConfig, QuotaConfig};
use crate::domain::catalog::{Complexity, CostSensitivity, ModelCatalog, TaskKind};
use crate::domain::llm::{LlmProvider, LlmRequest};
use crate::domain::score::{ScoreModel, SectionScore, Sections};
use crate::domain::usage::{QuotaState, UsageOperation};
use crate::domain::{DomainError, RuleBasedAnalyzer};
use crate::infrastructure::observability::{record_llm_request, LlmRequestMetricParams};
use crate::infrastructure::usage::{QuotaManagerTrait, TrackUsageParams};

const SYSTEM_PROMPT: &str = "You are an applicant tracking system (ATS) compatibility reviewer. \
Score the resume in four sections: formatting, content, keywords and structure. \
Respond with one JSON object and nothing else, shaped as \
{\"formatting\": {\"score\": <0-100>, \"issues\": [<string>], \"improvements\": [<string>]}, \
\"content\": {...}, \"keywords\": {...}, \"structure\": {...}}. \
List issues from most to least severe. Improvements must be concrete actions.";

/// Rough characters-per-token ratio used when the provider reports no usage
const CHARS_PER_TOKEN: u64 = 4;

/// Settings for the AI call
#[derive(Debug, Clone)]
pub struct AiAnalyzerConfig {
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    pub default_model: Option<String>,
    /// Charge the prompt of an abandoned call to the session
    pub track_cancelled_cost: bool,
}

impl Default for AiAnalyzerConfig {
    fn default() -> Self {
        Self::from_config(&AiConfig::default(), &QuotaConfig::default())
    }
}

impl AiAnalyzerConfig {
    pub fn from_config(ai: &AiConfig, quota: &QuotaConfig) -> Self {
        Self {
            timeout: Duration::from_millis(ai.timeout_ms),
            max_tokens: ai.max_tokens,
            temperature: ai.temperature,
            default_model: ai.default_model.clone(),
            track_cancelled_cost: quota.track_cancelled_cost,
        }
    }
}

/// A successfully parsed AI report and what it cost
#[derive(Debug, Clone)]
pub struct AiAnalysis {
    pub score: ScoreModel,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub prompt_chars: u64,
    pub completion_chars: u64,
    pub response_time_ms: u64,
}

/// Scores a résumé with a language model
#[derive(Debug)]
pub struct AiAugmentedAnalyzer {
    provider: Arc<dyn LlmProvider>,
    catalog: Arc<dyn ModelCatalog>,
    rule_based: RuleBasedAnalyzer,
    quota: Option<Arc<dyn QuotaManagerTrait>>,
    config: AiAnalyzerConfig,
}

impl AiAugmentedAnalyzer {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        catalog: Arc<dyn ModelCatalog>,
        rule_based: RuleBasedAnalyzer,
        config: AiAnalyzerConfig,
    ) -> Self {
        Self {
            provider,
            catalog,
            rule_based,
            quota: None,
            config,
        }
    }

    /// Quota manager charged for abandoned calls
    pub fn with_quota_manager(mut self, quota: Arc<dyn QuotaManagerTrait>) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Model for a call: the explicit choice, then the quota recommendation,
    /// then the configured default, then the catalog's pick for the budget.
    ///
    /// An explicit model the catalog cannot price is ignored.
    pub fn select_model(
        &self,
        requested: Option<&str>,
        quota: Option<&QuotaState>,
    ) -> Result<String, DomainError> {
        if let Some(model) = requested.map(str::trim).filter(|m| !m.is_empty()) {
            if self.catalog.get_model(model).is_some() {
                return Ok(model.to_string());
            }
            warn!(model, "Requested model is not in the catalog; selecting one");
        }

        if let Some(model) = quota.and_then(|q| q.recommended_model.as_deref()) {
            return Ok(model.to_string());
        }

        if let Some(ref model) = self.config.default_model {
            return Ok(model.clone());
        }

        let sensitivity = quota
            .map(QuotaState::cost_sensitivity)
            .unwrap_or(CostSensitivity::Low);

        self.catalog
            .recommend_model_for_task(TaskKind::Analysis, Complexity::Medium, sensitivity)
            .map(|m| m.id)
    }

    pub async fn analyze(
        &self,
        resume_text: &str,
        target_industry: Option<&str>,
        session_id: &str,
        model: Option<&str>,
        quota: Option<&QuotaState>,
    ) -> Result<AiAnalysis, DomainError> {
        let model = self.select_model(model, quota)?;
        let request = self.build_request(resume_text, target_industry);
        let prompt_chars = request.prompt_chars() as u64;

        let mut guard = match (&self.quota, self.config.track_cancelled_cost) {
            (Some(quota), true) => AbandonedCallGuard::armed(
                quota.clone(),
                TrackUsageParams::new(session_id, UsageOperation::AnalyzeResumeAbandoned, &model)
                    .with_tokens(estimate_tokens(prompt_chars), 0)
                    .with_text_sizes(prompt_chars, 0),
            ),
            _ => AbandonedCallGuard::disarmed(),
        };

        debug!(session_id, model = %model, prompt_chars, "Requesting AI analysis");

        let start = Instant::now();
        let result = tokio::time::timeout(self.config.timeout, self.provider.chat(&model, request)).await;
        let elapsed = start.elapsed();

        let response = match result {
            Err(_) => {
                self.record_call(&model, elapsed, false, None);
                // The guard charges the abandoned prompt when dropped
                return Err(DomainError::timeout(
                    "AI resume analysis",
                    self.config.timeout.as_millis() as u64,
                ));
            }
            Ok(Err(e)) => {
                guard.disarm();
                self.record_call(&model, elapsed, false, None);
                return Err(e);
            }
            Ok(Ok(response)) => {
                guard.disarm();
                response
            }
        };

        let content = response.content();
        let completion_chars = content.chars().count() as u64;
        let (input_tokens, output_tokens) = match response.usage {
            Some(ref usage) => (
                u64::from(usage.prompt_tokens),
                u64::from(usage.completion_tokens),
            ),
            None => (
                estimate_tokens(prompt_chars),
                estimate_tokens(completion_chars),
            ),
        };

        self.record_call(&model, elapsed, true, Some((input_tokens, output_tokens)));

        let sections = parse_sections(content).map_err(|e| match e {
            DomainError::MalformedResponse { message } if response.is_truncated() => {
                DomainError::malformed(format!("{} (completion hit the token limit)", message))
            }
            other => other,
        })?;
        let score = ScoreModel::from_sections(sections, self.rule_based.weights(), true);

        Ok(AiAnalysis {
            score,
            model,
            input_tokens,
            output_tokens,
            prompt_chars,
            completion_chars,
            response_time_ms: elapsed.as_millis() as u64,
        })
    }

    fn build_request(&self, resume_text: &str, target_industry: Option<&str>) -> LlmRequest {
        let max_chars = self.rule_based.config().max_chars;
        let text: String = resume_text.chars().take(max_chars).collect();
        let baseline = self.rule_based.analyze(&text, target_industry);

        let baseline_scores = serde_json::json!({
            "formatting": baseline.sections().formatting.score,
            "content": baseline.sections().content.score,
            "keywords": baseline.sections().keywords.score,
            "structure": baseline.sections().structure.score,
        });

        let prompt = format!(
            "Target industry: {}\n\nRule-based baseline scores: {}\n\nResume:\n\"\"\"\n{}\n\"\"\"",
            target_industry.unwrap_or("general"),
            baseline_scores,
            text
        );

        LlmRequest::builder()
            .system(SYSTEM_PROMPT)
            .user(prompt)
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
            .json_response(true)
            .build()
    }

    fn record_call(
        &self,
        model: &str,
        duration: Duration,
        success: bool,
        tokens: Option<(u64, u64)>,
    ) {
        record_llm_request(LlmRequestMetricParams {
            provider: self.provider.provider_name(),
            model,
            duration,
            success,
            input_tokens: tokens.map(|t| t.0),
            output_tokens: tokens.map(|t| t.1),
        });
    }
}

fn estimate_tokens(chars: u64) -> u64 {
    chars.div_ceil(CHARS_PER_TOKEN)
}

/// Charges an abandoned call to the session unless disarmed before drop
struct AbandonedCallGuard {
    pending: Option<(Arc<dyn QuotaManagerTrait>, TrackUsageParams)>,
}

impl AbandonedCallGuard {
    fn armed(quota: Arc<dyn QuotaManagerTrait>, params: TrackUsageParams) -> Self {
        Self {
            pending: Some((quota, params)),
        }
    }

    fn disarmed() -> Self {
        Self { pending: None }
    }

    fn disarm(&mut self) {
        self.pending = None;
    }
}

impl Drop for AbandonedCallGuard {
    fn drop(&mut self) {
        let Some((quota, params)) = self.pending.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let session_id = params.session_id.clone();
                    if let Err(e) = quota.track_usage(params).await {
                        warn!(session_id = %session_id, error = %e, "Failed to charge abandoned AI call");
                    }
                });
            }
            Err(_) => warn!(
                session_id = %params.session_id,
                "No runtime available to charge abandoned AI call"
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AiSections {
    formatting: AiSection,
    content: AiSection,
    keywords: AiSection,
    structure: AiSection,
}

#[derive(Debug, Deserialize)]
struct AiSection {
    score: f64,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
}

impl AiSection {
    fn into_section_score(self, name: &str) -> Result<SectionScore, DomainError> {
        if !self.score.is_finite() || !(0.0..=100.0).contains(&self.score) {
            return Err(DomainError::malformed(format!(
                "Score for {} out of range: {}",
                name, self.score
            )));
        }

        let issues = clean_list(self.issues, false);
        let improvements = clean_list(self.improvements, true);

        Ok(SectionScore::new(self.score.round() as u8, issues, improvements))
    }
}

fn clean_list(items: Vec<String>, dedupe: bool) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(items.len());

    for item in items {
        let item = item.trim().to_string();
        if item.is_empty() || (dedupe && cleaned.contains(&item)) {
            continue;
        }
        cleaned.push(item);
    }

    cleaned
}

/// Parse the model's reply into the four report sections
fn parse_sections(content: &str) -> Result<Sections, DomainError> {
    let json_str = extract_json(content)
        .ok_or_else(|| DomainError::malformed("AI response contains no JSON object"))?;

    let value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| DomainError::malformed(format!("AI response is not valid JSON: {}", e)))?;

    // Some models nest the report under "sections"
    let value = match value.get("sections") {
        Some(nested) if nested.is_object() => nested.clone(),
        _ => value,
    };

    let parsed: AiSections = serde_json::from_value(value)
        .map_err(|e| DomainError::malformed(format!("AI response has unexpected shape: {}", e)))?;

    Ok(Sections {
        formatting: parsed.formatting.into_section_score("formatting")?,
        content: parsed.content.into_section_score("content")?,
        keywords: parsed.keywords.into_section_score("keywords")?,
        structure: parsed.structure.into_section_score("structure")?,
    })
}

/// Extract JSON object from a string (handles markdown code blocks)
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;

    (start < end).then(|| &text[start..=end])
}
