//! Model descriptors

use serde::{Deserialize, Serialize};

use super::ModelPricing;

/// Kind of work a model is asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Scoring and critique of existing text
    Analysis,
    /// Writing new résumé content
    Generation,
}

/// Quality tier of a model, or complexity of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// How strongly model selection should favor cheap models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostSensitivity {
    Low,
    Medium,
    High,
}

impl CostSensitivity {
    /// Sensitivity derived from the fraction of budget still available
    pub fn from_remaining_fraction(fraction: f64) -> Self {
        if fraction < 0.2 {
            Self::High
        } else if fraction < 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// A language model available for AI augmentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub provider: String,
    pub pricing: ModelPricing,
    pub capabilities: Vec<TaskKind>,
    pub tier: Complexity,
    pub context_window: u32,
}

impl ModelDescriptor {
    pub fn new(
        id: impl Into<String>,
        provider: impl Into<String>,
        pricing: ModelPricing,
        tier: Complexity,
    ) -> Self {
        Self {
            id: id.into(),
            provider: provider.into(),
            pricing,
            capabilities: vec![TaskKind::Analysis, TaskKind::Generation],
            tier,
            context_window: 16_385,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Vec<TaskKind>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_context_window(mut self, tokens: u32) -> Self {
        self.context_window = tokens;
        self
    }

    pub fn supports(&self, task: TaskKind) -> bool {
        self.capabilities.contains(&task)
    }

    pub fn estimated_cost_micros(&self, input_tokens: u64, output_tokens: u64) -> i64 {
        self.pricing.calculate_cost(input_tokens, output_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_sensitivity_thresholds() {
        assert_eq!(CostSensitivity::from_remaining_fraction(1.0), CostSensitivity::Low);
        assert_eq!(CostSensitivity::from_remaining_fraction(0.5), CostSensitivity::Low);
        assert_eq!(CostSensitivity::from_remaining_fraction(0.3), CostSensitivity::Medium);
        assert_eq!(CostSensitivity::from_remaining_fraction(0.1), CostSensitivity::High);
        assert_eq!(CostSensitivity::from_remaining_fraction(0.0), CostSensitivity::High);
    }

    #[test]
    fn test_complexity_ordering() {
        assert!(Complexity::Low < Complexity::Medium);
        assert!(Complexity::Medium < Complexity::High);
    }

    #[test]
    fn test_descriptor_cost() {
        let model = ModelDescriptor::new("m", "openai", ModelPricing::new(0.001, 0.002), Complexity::Low)
            .with_capabilities(vec![TaskKind::Analysis]);

        assert!(model.supports(TaskKind::Analysis));
        assert!(!model.supports(TaskKind::Generation));
        assert_eq!(model.estimated_cost_micros(2000, 1000), 4000);
    }
}
