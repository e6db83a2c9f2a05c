//! Model catalog and selection policy

use std::fmt::Debug;

use super::{Complexity, CostSensitivity, ModelDescriptor, ModelPricing, TaskKind};
use crate::domain::DomainError;

/// Read-only view over the models available for AI augmentation
pub trait ModelCatalog: Send + Sync + Debug {
    /// All models, cheapest first
    fn get_available_models(&self) -> Vec<ModelDescriptor>;

    fn get_model(&self, id: &str) -> Option<ModelDescriptor>;

    /// Pick a model for a task.
    ///
    /// The cheapest model whose tier satisfies `complexity` wins. Medium cost
    /// sensitivity caps the requested tier at medium and high sensitivity
    /// always takes the cheapest capable model.
    fn recommend_model_for_task(
        &self,
        task: TaskKind,
        complexity: Complexity,
        cost_sensitivity: CostSensitivity,
    ) -> Result<ModelDescriptor, DomainError>;
}

/// Catalog backed by a fixed table
#[derive(Debug, Clone)]
pub struct StaticModelCatalog {
    /// Sorted by blended price, then id
    models: Vec<ModelDescriptor>,
}

impl StaticModelCatalog {
    pub fn new(mut models: Vec<ModelDescriptor>) -> Result<Self, DomainError> {
        if models.is_empty() {
            return Err(DomainError::configuration("Model catalog cannot be empty"));
        }

        models.sort_by(|a, b| {
            a.pricing
                .blended_price_per_1k_micros()
                .cmp(&b.pricing.blended_price_per_1k_micros())
                .then_with(|| a.id.cmp(&b.id))
        });

        if let Some(pair) = models.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(DomainError::configuration(format!(
                "Duplicate model id in catalog: {}",
                pair[0].id
            )));
        }

        Ok(Self { models })
    }

    /// Built-in catalog restricted to one provider
    pub fn for_provider(provider: &str) -> Result<Self, DomainError> {
        let models: Vec<_> = default_models()
            .into_iter()
            .filter(|m| m.provider == provider)
            .collect();

        if models.is_empty() {
            return Err(DomainError::configuration(format!(
                "No models known for provider '{}'",
                provider
            )));
        }

        Self::new(models)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Default for StaticModelCatalog {
    fn default() -> Self {
        let mut models = default_models();
        models.sort_by(|a, b| {
            a.pricing
                .blended_price_per_1k_micros()
                .cmp(&b.pricing.blended_price_per_1k_micros())
                .then_with(|| a.id.cmp(&b.id))
        });
        Self { models }
    }
}

impl ModelCatalog for StaticModelCatalog {
    fn get_available_models(&self) -> Vec<ModelDescriptor> {
        self.models.clone()
    }

    fn get_model(&self, id: &str) -> Option<ModelDescriptor> {
        self.models.iter().find(|m| m.id == id).cloned()
    }

    fn recommend_model_for_task(
        &self,
        task: TaskKind,
        complexity: Complexity,
        cost_sensitivity: CostSensitivity,
    ) -> Result<ModelDescriptor, DomainError> {
        let eligible: Vec<&ModelDescriptor> =
            self.models.iter().filter(|m| m.supports(task)).collect();

        let cheapest = eligible.first().ok_or_else(|| {
            DomainError::not_found(format!("No model in catalog supports {:?}", task))
        })?;

        let required = match cost_sensitivity {
            CostSensitivity::High => return Ok((*cheapest).clone()),
            CostSensitivity::Medium => complexity.min(Complexity::Medium),
            CostSensitivity::Low => complexity,
        };

        let chosen = eligible
            .iter()
            .find(|m| m.tier >= required)
            // Nothing is good enough; take the best tier, cheapest first
            .or_else(|| {
                let best = eligible.iter().map(|m| m.tier).max()?;
                eligible.iter().find(|m| m.tier == best)
            })
            .unwrap_or(cheapest);

        Ok((*chosen).clone())
    }
}

/// Built-in models and their list prices
pub fn default_models() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor::new(
            "gpt-4o-mini",
            "openai",
            ModelPricing::new(0.00015, 0.0006),
            Complexity::Medium,
        )
        .with_context_window(128_000),
        ModelDescriptor::new(
            "gpt-3.5-turbo",
            "openai",
            ModelPricing::new(0.0005, 0.0015),
            Complexity::Low,
        ),
        ModelDescriptor::new(
            "gpt-4o",
            "openai",
            ModelPricing::new(0.005, 0.015),
            Complexity::High,
        )
        .with_context_window(128_000),
        ModelDescriptor::new(
            "claude-3-haiku-20240307",
            "anthropic",
            ModelPricing::new(0.00025, 0.00125),
            Complexity::Low,
        )
        .with_context_window(200_000),
        ModelDescriptor::new(
            "claude-3-5-sonnet-20241022",
            "anthropic",
            ModelPricing::new(0.003, 0.015),
            Complexity::High,
        )
        .with_context_window(200_000),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> StaticModelCatalog {
        StaticModelCatalog::default()
    }

    #[test]
    fn test_models_sorted_by_cost() {
        let ids: Vec<String> = catalog()
            .get_available_models()
            .into_iter()
            .map(|m| m.id)
            .collect();

        assert_eq!(
            ids,
            vec![
                "gpt-4o-mini",
                "claude-3-haiku-20240307",
                "gpt-3.5-turbo",
                "claude-3-5-sonnet-20241022",
                "gpt-4o",
            ]
        );
    }

    #[test]
    fn test_recommend_cheapest_satisfying_tier() {
        let model = catalog()
            .recommend_model_for_task(TaskKind::Analysis, Complexity::High, CostSensitivity::Low)
            .unwrap();
        assert_eq!(model.id, "claude-3-5-sonnet-20241022");

        let model = catalog()
            .recommend_model_for_task(TaskKind::Analysis, Complexity::Low, CostSensitivity::Low)
            .unwrap();
        assert_eq!(model.id, "gpt-4o-mini");
    }

    #[test]
    fn test_medium_sensitivity_caps_tier() {
        let model = catalog()
            .recommend_model_for_task(TaskKind::Analysis, Complexity::High, CostSensitivity::Medium)
            .unwrap();

        assert_eq!(model.tier, Complexity::Medium);
        assert_eq!(model.id, "gpt-4o-mini");
    }

    #[test]
    fn test_high_sensitivity_takes_cheapest() {
        let catalog = StaticModelCatalog::for_provider("anthropic").unwrap();
        let model = catalog
            .recommend_model_for_task(TaskKind::Analysis, Complexity::High, CostSensitivity::High)
            .unwrap();

        assert_eq!(model.id, "claude-3-haiku-20240307");
    }

    #[test]
    fn test_falls_back_to_best_tier_available() {
        let catalog = StaticModelCatalog::new(vec![
            ModelDescriptor::new("a", "openai", ModelPricing::new(0.001, 0.001), Complexity::Low),
            ModelDescriptor::new("b", "openai", ModelPricing::new(0.002, 0.002), Complexity::Medium),
        ])
        .unwrap();

        let model = catalog
            .recommend_model_for_task(TaskKind::Analysis, Complexity::High, CostSensitivity::Low)
            .unwrap();

        assert_eq!(model.id, "b");
    }

    #[test]
    fn test_no_capable_model() {
        let catalog = StaticModelCatalog::new(vec![ModelDescriptor::new(
            "writer",
            "openai",
            ModelPricing::new(0.001, 0.001),
            Complexity::High,
        )
        .with_capabilities(vec![TaskKind::Generation])])
        .unwrap();

        let result =
            catalog.recommend_model_for_task(TaskKind::Analysis, Complexity::Low, CostSensitivity::Low);

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(StaticModelCatalog::new(vec![]).is_err());

        let dup = ModelDescriptor::new("x", "openai", ModelPricing::new(0.001, 0.001), Complexity::Low);
        assert!(StaticModelCatalog::new(vec![dup.clone(), dup]).is_err());
        assert!(StaticModelCatalog::for_provider("nobody").is_err());
    }
}
