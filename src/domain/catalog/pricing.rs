//! Model pricing

use serde::{Deserialize, Serialize};

const MICROS_PER_USD: f64 = 1_000_000.0;

fn usd_to_micros(usd: f64) -> i64 {
    (usd * MICROS_PER_USD).round() as i64
}

/// Volume discount tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTier {
    /// Minimum total tokens of a call for this tier to apply
    pub min_tokens: u64,
    /// Price per 1K input tokens in micro-dollars
    pub input_price_per_1k_micros: i64,
    /// Price per 1K output tokens in micro-dollars
    pub output_price_per_1k_micros: i64,
}

impl PricingTier {
    pub fn new(min_tokens: u64, input_per_1k: f64, output_per_1k: f64) -> Self {
        Self {
            min_tokens,
            input_price_per_1k_micros: usd_to_micros(input_per_1k),
            output_price_per_1k_micros: usd_to_micros(output_per_1k),
        }
    }
}

/// Per-token pricing of a model, held in micro-dollars
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_price_per_1k_micros: i64,
    pub output_price_per_1k_micros: i64,
    #[serde(default)]
    pub tiers: Vec<PricingTier>,
}

impl ModelPricing {
    pub fn new(input_per_1k: f64, output_per_1k: f64) -> Self {
        Self {
            input_price_per_1k_micros: usd_to_micros(input_per_1k),
            output_price_per_1k_micros: usd_to_micros(output_per_1k),
            tiers: Vec::new(),
        }
    }

    pub fn with_tier(mut self, tier: PricingTier) -> Self {
        self.tiers.push(tier);
        // Highest threshold first so lookup takes the first match
        self.tiers.sort_by(|a, b| b.min_tokens.cmp(&a.min_tokens));
        self
    }

    /// Blended price per 1K tokens, used to rank models by cost
    pub fn blended_price_per_1k_micros(&self) -> i64 {
        (self.input_price_per_1k_micros + self.output_price_per_1k_micros) / 2
    }

    /// Cost of a call in micro-dollars
    pub fn calculate_cost(&self, input_tokens: u64, output_tokens: u64) -> i64 {
        let total_tokens = input_tokens + output_tokens;

        let (input_price, output_price) = self
            .tiers
            .iter()
            .find(|t| total_tokens >= t.min_tokens)
            .map(|t| (t.input_price_per_1k_micros, t.output_price_per_1k_micros))
            .unwrap_or((self.input_price_per_1k_micros, self.output_price_per_1k_micros));

        let input_cost = (input_tokens as i64 * input_price) / 1000;
        let output_cost = (output_tokens as i64 * output_price) / 1000;

        input_cost + output_cost
    }

    pub fn calculate_cost_usd(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        self.calculate_cost(input_tokens, output_tokens) as f64 / MICROS_PER_USD
    }
}
