//! Per-session quota counters and the derived quota state

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::clock::{day_of, month_of};
use crate::domain::catalog::CostSensitivity;

/// Configured caps applied to every session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    pub daily_token_limit: u64,
    pub monthly_budget_micros: i64,
}

impl QuotaLimits {
    pub fn new(daily_token_limit: u64, monthly_budget_usd: f64) -> Self {
        Self {
            daily_token_limit,
            monthly_budget_micros: (monthly_budget_usd * 1_000_000.0).round() as i64,
        }
    }
}

/// Raw counters of one session, tagged with the windows they belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounters {
    pub session_id: String,
    /// Calendar day the daily counter belongs to
    pub day: NaiveDate,
    /// First day of the month the monthly counter belongs to
    pub month: NaiveDate,
    pub daily_tokens_used: u64,
    pub monthly_spent_micros: i64,
}

impl SessionCounters {
    pub fn empty(session_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            day: day_of(now),
            month: month_of(now),
            daily_tokens_used: 0,
            monthly_spent_micros: 0,
        }
    }

    /// Counters as seen at `now`; windows that have ended read as zero
    pub fn current(&self, now: DateTime<Utc>) -> Self {
        let mut counters = self.clone();
        counters.roll_over(now);
        counters
    }

    /// Reset any counter whose window has ended
    pub fn roll_over(&mut self, now: DateTime<Utc>) {
        let day = day_of(now);
        let month = month_of(now);

        if day != self.day {
            self.day = day;
            self.daily_tokens_used = 0;
        }

        if month != self.month {
            self.month = month;
            self.monthly_spent_micros = 0;
        }
    }

    /// Roll windows forward and add usage; counters never decrease within a window
    pub fn add(&mut self, tokens: u64, cost_micros: i64, now: DateTime<Utc>) {
        self.roll_over(now);
        self.daily_tokens_used = self.daily_tokens_used.saturating_add(tokens);
        self.monthly_spent_micros = self
            .monthly_spent_micros
            .saturating_add(cost_micros.max(0));
    }

    pub fn exceeds(&self, limits: &QuotaLimits) -> bool {
        self.daily_tokens_used > limits.daily_token_limit
            || self.monthly_spent_micros > limits.monthly_budget_micros
    }
}

/// Quota position of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaState {
    pub session_id: String,
    pub daily_tokens_used: u64,
    pub daily_token_limit: u64,
    pub monthly_spent_micros: i64,
    pub monthly_budget_micros: i64,
    pub remaining_tokens: u64,
    pub remaining_budget_micros: i64,
    pub can_proceed: bool,
    pub recommended_model: Option<String>,
}

impl QuotaState {
    pub fn evaluate(counters: &SessionCounters, limits: &QuotaLimits) -> Self {
        let remaining_tokens = limits
            .daily_token_limit
            .saturating_sub(counters.daily_tokens_used);
        let remaining_budget_micros =
            (limits.monthly_budget_micros - counters.monthly_spent_micros).max(0);

        Self {
            session_id: counters.session_id.clone(),
            daily_tokens_used: counters.daily_tokens_used,
            daily_token_limit: limits.daily_token_limit,
            monthly_spent_micros: counters.monthly_spent_micros,
            monthly_budget_micros: limits.monthly_budget_micros,
            remaining_tokens,
            remaining_budget_micros,
            can_proceed: remaining_tokens > 0 && remaining_budget_micros > 0,
            recommended_model: None,
        }
    }

    pub fn with_recommended_model(mut self, model: impl Into<String>) -> Self {
        self.recommended_model = Some(model.into());
        self
    }

    /// Fraction of the tighter of the two allowances still available, in [0, 1]
    pub fn remaining_fraction(&self) -> f64 {
        let tokens = if self.daily_token_limit == 0 {
            0.0
        } else {
            self.remaining_tokens as f64 / self.daily_token_limit as f64
        };

        let budget = if self.monthly_budget_micros <= 0 {
            0.0
        } else {
            self.remaining_budget_micros as f64 / self.monthly_budget_micros as f64
        };

        tokens.min(budget).clamp(0.0, 1.0)
    }

    pub fn cost_sensitivity(&self) -> CostSensitivity {
        CostSensitivity::from_remaining_fraction(self.remaining_fraction())
    }

    pub fn monthly_spent_usd(&self) -> f64 {
        self.monthly_spent_micros as f64 / 1_000_000.0
    }

    pub fn remaining_budget_usd(&self) -> f64 {
        self.remaining_budget_micros as f64 / 1_000_000.0
    }
}
