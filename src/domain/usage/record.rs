//! Usage record entities

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a usage record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageRecordId(String);

impl UsageRecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("usage-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UsageRecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for UsageRecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// AI operation a usage record was charged for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageOperation {
    AnalyzeResume,
    GenerateResumeSection,
    /// Analysis call abandoned before the provider answered
    AnalyzeResumeAbandoned,
}

impl UsageOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalyzeResume => "analyze_resume",
            Self::GenerateResumeSection => "generate_resume_section",
            Self::AnalyzeResumeAbandoned => "analyze_resume_abandoned",
        }
    }
}

impl std::fmt::Display for UsageOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UsageOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "analyze_resume" => Ok(Self::AnalyzeResume),
            "generate_resume_section" => Ok(Self::GenerateResumeSection),
            "analyze_resume_abandoned" => Ok(Self::AnalyzeResumeAbandoned),
            other => Err(format!("Unknown usage operation: {}", other)),
        }
    }
}

/// One tracked AI invocation. Records are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    id: UsageRecordId,
    pub session_id: String,
    pub operation: UsageOperation,
    pub model: String,
    pub tokens_used: u64,
    /// Characters of prompt text sent
    pub input_chars: u64,
    /// Characters of completion text received
    pub output_chars: u64,
    pub response_time_ms: u64,
    pub estimated_cost_micros: i64,
    pub timestamp: DateTime<Utc>,
}

impl UsageRecord {
    pub fn new(
        session_id: impl Into<String>,
        operation: UsageOperation,
        model: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UsageRecordId::generate(),
            session_id: session_id.into(),
            operation,
            model: model.into(),
            tokens_used: 0,
            input_chars: 0,
            output_chars: 0,
            response_time_ms: 0,
            estimated_cost_micros: 0,
            timestamp,
        }
    }

    pub fn with_id(mut self, id: impl Into<UsageRecordId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.tokens_used = tokens;
        self
    }

    pub fn with_text_sizes(mut self, input_chars: u64, output_chars: u64) -> Self {
        self.input_chars = input_chars;
        self.output_chars = output_chars;
        self
    }

    pub fn with_response_time_ms(mut self, ms: u64) -> Self {
        self.response_time_ms = ms;
        self
    }

    pub fn with_cost_micros(mut self, cost: i64) -> Self {
        self.estimated_cost_micros = cost;
        self
    }

    pub fn id(&self) -> &UsageRecordId {
        &self.id
    }

    pub fn cost_usd(&self) -> f64 {
        self.estimated_cost_micros as f64 / 1_000_000.0
    }
}

/// Aggregated usage statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageAggregate {
    pub total_requests: u64,
    pub total_tokens: u64,
    pub total_cost_micros: i64,
    pub avg_response_time_ms: f64,
    pub by_operation: BTreeMap<UsageOperation, u64>,
    pub by_model: BTreeMap<String, u64>,
}

impl UsageAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_record(&mut self, record: &UsageRecord) {
        self.total_requests += 1;
        self.total_tokens += record.tokens_used;
        self.total_cost_micros += record.estimated_cost_micros;

        // Running average
        let prev_total = self.avg_response_time_ms * (self.total_requests - 1) as f64;
        self.avg_response_time_ms =
            (prev_total + record.response_time_ms as f64) / self.total_requests as f64;

        *self.by_operation.entry(record.operation).or_insert(0) += 1;
        *self.by_model.entry(record.model.clone()).or_insert(0) += 1;
    }

    pub fn total_cost_usd(&self) -> f64 {
        self.total_cost_micros as f64 / 1_000_000.0
    }
}

impl<'a> FromIterator<&'a UsageRecord> for UsageAggregate {
    fn from_iter<I: IntoIterator<Item = &'a UsageRecord>>(iter: I) -> Self {
        let mut aggregate = Self::new();
        for record in iter {
            aggregate.add_record(record);
        }
        aggregate
    }
}

/// Usage of one session over the current month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub session_id: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub aggregate: UsageAggregate,
}
