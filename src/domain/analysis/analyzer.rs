//! Deterministic rule-based résumé analyzer

use serde::{Deserialize, Serialize};

use super::rules;
use super::tables::keyword_table_for;
use super::text::ResumeDocument;
use crate::domain::score::{ScoreModel, ScoreWeights, Sections};
use crate::domain::DomainError;

/// Sections are capped at this score when the input is too short to judge
const INSUFFICIENT_CONTENT_CAP: i32 = 10;

/// Analyzer tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Minimum résumé length, in characters
    pub min_chars: usize,
    /// Maximum résumé length, in characters; longer input is truncated
    pub max_chars: usize,
    pub weights: ScoreWeights,
    /// Number of matched keywords after which returns diminish
    pub keyword_saturation: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_chars: 50,
            max_chars: 15_000,
            weights: ScoreWeights::default(),
            keyword_saturation: 12,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.min_chars >= self.max_chars {
            return Err(DomainError::configuration(format!(
                "min_chars ({}) must be lower than max_chars ({})",
                self.min_chars, self.max_chars
            )));
        }

        if self.keyword_saturation == 0 {
            return Err(DomainError::configuration(
                "keyword_saturation must be at least 1",
            ));
        }

        self.weights.validate()
    }
}

/// Scores résumé text without any I/O.
///
/// Identical input always yields an identical [`ScoreModel`]. Out-of-range
/// input never panics: long text is truncated and short text is scored with
/// every section capped low.
#[derive(Debug, Clone)]
pub struct RuleBasedAnalyzer {
    config: AnalyzerConfig,
}

impl RuleBasedAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self, DomainError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.config.weights
    }

    pub fn analyze(&self, resume_text: &str, target_industry: Option<&str>) -> ScoreModel {
        let original_chars = resume_text.chars().count();
        let text = truncate_chars(resume_text, self.config.max_chars);
        let doc = ResumeDocument::parse(text);
        let (table, industry_known) = keyword_table_for(target_industry);

        let mut formatting = rules::formatting(&doc);
        let mut content = rules::content(&doc);
        let mut keywords = rules::keywords(
            &doc,
            table,
            industry_known,
            target_industry,
            self.config.keyword_saturation,
        );
        let mut structure = rules::structure(&doc);

        if original_chars > self.config.max_chars {
            formatting.penalize(
                5,
                format!(
                    "Résumé has {} characters; only the first {} were analyzed",
                    original_chars, self.config.max_chars
                ),
                "Trim the résumé to the most relevant two pages",
            );
        }

        let meaningful_chars = doc.text().trim().chars().count();
        if meaningful_chars < self.config.min_chars {
            for audit in [&mut formatting, &mut content, &mut keywords, &mut structure] {
                audit.cap(INSUFFICIENT_CONTENT_CAP);
            }

            content.note(
                i32::MAX,
                format!(
                    "Insufficient content: {} characters provided, at least {} expected",
                    meaningful_chars, self.config.min_chars
                ),
                Some("Paste the complete text of your résumé".to_string()),
            );
        }

        let sections = Sections {
            formatting: formatting.finish(),
            content: content.finish(),
            keywords: keywords.finish(),
            structure: structure.finish(),
        };

        ScoreModel::from_sections(sections, &self.config.weights, false)
    }
}

impl Default for RuleBasedAnalyzer {
    fn default() -> Self {
        Self {
            config: AnalyzerConfig::default(),
        }
    }
}

/// Prefix of `text` holding at most `max_chars` characters
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
