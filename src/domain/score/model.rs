//! Compatibility report entities

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Version tag of the built-in section weights
pub const DEFAULT_WEIGHTS_VERSION: &str = "weights-v1";

/// The four scored sections of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Formatting,
    Content,
    Keywords,
    Structure,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Formatting,
        SectionKind::Content,
        SectionKind::Keywords,
        SectionKind::Structure,
    ];
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Formatting => write!(f, "formatting"),
            Self::Content => write!(f, "content"),
            Self::Keywords => write!(f, "keywords"),
            Self::Structure => write!(f, "structure"),
        }
    }
}

/// Score and findings for a single section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionScore {
    /// Score in [0, 100]
    pub score: u8,
    /// Problems found, most severe first
    pub issues: Vec<String>,
    /// Actionable, deduplicated suggestions
    pub improvements: Vec<String>,
}

impl SectionScore {
    /// Create a section score, clamping to [0, 100]
    pub fn new(score: u8, issues: Vec<String>, improvements: Vec<String>) -> Self {
        Self {
            score: score.min(100),
            issues,
            improvements,
        }
    }
}

/// All four sections of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sections {
    pub formatting: SectionScore,
    pub content: SectionScore,
    pub keywords: SectionScore,
    pub structure: SectionScore,
}

impl Sections {
    pub fn get(&self, kind: SectionKind) -> &SectionScore {
        match kind {
            SectionKind::Formatting => &self.formatting,
            SectionKind::Content => &self.content,
            SectionKind::Keywords => &self.keywords,
            SectionKind::Structure => &self.structure,
        }
    }

    pub fn get_mut(&mut self, kind: SectionKind) -> &mut SectionScore {
        match kind {
            SectionKind::Formatting => &mut self.formatting,
            SectionKind::Content => &mut self.content,
            SectionKind::Keywords => &mut self.keywords,
            SectionKind::Structure => &mut self.structure,
        }
    }
}

/// Fixed weighting used to derive the overall score from the section scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub formatting: f64,
    pub content: f64,
    pub keywords: f64,
    pub structure: f64,
    /// Version tag reported with every score computed from these weights
    pub version: String,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            formatting: 0.25,
            content: 0.30,
            keywords: 0.25,
            structure: 0.20,
            version: DEFAULT_WEIGHTS_VERSION.to_string(),
        }
    }
}

impl ScoreWeights {
    pub fn weight(&self, kind: SectionKind) -> f64 {
        match kind {
            SectionKind::Formatting => self.formatting,
            SectionKind::Content => self.content,
            SectionKind::Keywords => self.keywords,
            SectionKind::Structure => self.structure,
        }
    }

    /// Weights must be finite, non-negative and sum to 1.0
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut total = 0.0;

        for kind in SectionKind::ALL {
            let weight = self.weight(kind);

            if !weight.is_finite() || weight < 0.0 {
                return Err(DomainError::configuration(format!(
                    "Weight for {} must be a non-negative number, got {}",
                    kind, weight
                )));
            }

            total += weight;
        }

        if (total - 1.0).abs() > 1e-6 {
            return Err(DomainError::configuration(format!(
                "Section weights must sum to 1.0, got {}",
                total
            )));
        }

        if self.version.trim().is_empty() {
            return Err(DomainError::configuration("Weights version cannot be empty"));
        }

        Ok(())
    }

    /// Weighted combination of the four section scores, rounded to the nearest integer
    pub fn overall(&self, sections: &Sections) -> u8 {
        let weighted: f64 = SectionKind::ALL
            .iter()
            .map(|kind| self.weight(*kind) * f64::from(sections.get(*kind).score))
            .sum();

        weighted.round().clamp(0.0, 100.0) as u8
    }
}

/// Compatibility report for a résumé
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreModel {
    overall_score: u8,
    sections: Sections,
    ai_enhanced: bool,
    weights_version: String,
}

impl ScoreModel {
    /// Build a report; the overall score is always derived from the sections
    pub fn from_sections(sections: Sections, weights: &ScoreWeights, ai_enhanced: bool) -> Self {
        Self {
            overall_score: weights.overall(&sections),
            sections,
            ai_enhanced,
            weights_version: weights.version.clone(),
        }
    }

    pub fn overall_score(&self) -> u8 {
        self.overall_score
    }

    pub fn sections(&self) -> &Sections {
        &self.sections
    }

    pub fn section(&self, kind: SectionKind) -> &SectionScore {
        self.sections.get(kind)
    }

    pub fn ai_enhanced(&self) -> bool {
        self.ai_enhanced
    }

    pub fn weights_version(&self) -> &str {
        &self.weights_version
    }

    pub fn into_sections(self) -> Sections {
        self.sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(score: u8) -> SectionScore {
        SectionScore::new(score, Vec::new(), Vec::new())
    }

    fn sections(f: u8, c: u8, k: u8, s: u8) -> Sections {
        Sections {
            formatting: section(f),
            content: section(c),
            keywords: section(k),
            structure: section(s),
        }
    }

    #[test]
    fn test_default_weights_are_valid() {
        assert!(ScoreWeights::default().validate().is_ok());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let weights = ScoreWeights {
            formatting: 0.5,
            ..ScoreWeights::default()
        };

        assert!(matches!(
            weights.validate(),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let weights = ScoreWeights {
            formatting: -0.25,
            content: 0.80,
            ..ScoreWeights::default()
        };

        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_overall_is_weighted_sum() {
        let weights = ScoreWeights::default();
        let model = ScoreModel::from_sections(sections(80, 60, 40, 100), &weights, false);

        // 0.25*80 + 0.30*60 + 0.25*40 + 0.20*100 = 20 + 18 + 10 + 20 = 68
        assert_eq!(model.overall_score(), 68);
        assert_eq!(model.weights_version(), DEFAULT_WEIGHTS_VERSION);
        assert!(!model.ai_enhanced());
    }

    #[test]
    fn test_overall_rounds_to_nearest() {
        let weights = ScoreWeights::default();
        let model = ScoreModel::from_sections(sections(1, 1, 1, 2), &weights, true);

        // 0.25 + 0.30 + 0.25 + 0.40 = 1.2
        assert_eq!(model.overall_score(), 1);
        assert!(model.ai_enhanced());
    }

    #[test]
    fn test_section_score_clamps() {
        assert_eq!(SectionScore::new(250, vec![], vec![]).score, 100);
    }

    #[test]
    fn test_serializes_camel_case() {
        let model = ScoreModel::from_sections(sections(50, 50, 50, 50), &ScoreWeights::default(), false);
        let json = serde_json::to_value(&model).unwrap();

        assert_eq!(json["overallScore"], 50);
        assert_eq!(json["aiEnhanced"], false);
        assert_eq!(json["sections"]["keywords"]["score"], 50);
    }
}
