//! Quota ledger and usage record repository traits

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::automock;

use super::{SessionCounters, UsageOperation, UsageRecord};
use crate::domain::DomainError;

/// Query parameters for usage records
#[derive(Debug, Clone, Default)]
pub struct UsageQuery {
    pub session_id: Option<String>,
    pub operation: Option<UsageOperation>,
    /// Inclusive
    pub from: Option<DateTime<Utc>>,
    /// Exclusive
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl UsageQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_operation(mut self, operation: UsageOperation) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn with_time_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &UsageRecord) -> bool {
        if let Some(ref session_id) = self.session_id {
            if &record.session_id != session_id {
                return false;
            }
        }

        if let Some(operation) = self.operation {
            if record.operation != operation {
                return false;
            }
        }

        if let Some(from) = self.from {
            if record.timestamp < from {
                return false;
            }
        }

        if let Some(to) = self.to {
            if record.timestamp >= to {
                return false;
            }
        }

        true
    }
}

/// Per-session quota counters.
///
/// Implementations must make `increment` linearizable per session: two
/// concurrent increments are both reflected in the result of the later one.
#[async_trait]
pub trait QuotaLedger: Send + Sync + Debug {
    /// Current counters, with ended windows read as zero. Never mutates.
    async fn snapshot(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionCounters, DomainError>;

    /// Atomically roll windows forward and add usage, returning the new counters
    async fn increment(
        &self,
        session_id: &str,
        tokens: u64,
        cost_micros: i64,
        now: DateTime<Utc>,
    ) -> Result<SessionCounters, DomainError>;
}

/// Append-only store of usage records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UsageRepository: Send + Sync + Debug {
    async fn append(&self, record: UsageRecord) -> Result<(), DomainError>;

    /// Matching records, oldest first
    async fn query(&self, query: &UsageQuery) -> Result<Vec<UsageRecord>, DomainError>;

    async fn count(&self, query: &UsageQuery) -> Result<usize, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_query_matching() {
        let at = Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap();
        let record = UsageRecord::new("s-1", UsageOperation::AnalyzeResume, "gpt-4o-mini", at);

        assert!(UsageQuery::new().matches(&record));
        assert!(UsageQuery::new().with_session("s-1").matches(&record));
        assert!(!UsageQuery::new().with_session("s-2").matches(&record));
        assert!(!UsageQuery::new()
            .with_operation(UsageOperation::GenerateResumeSection)
            .matches(&record));
        assert!(UsageQuery::new()
            .with_time_range(at, at + chrono::Duration::seconds(1))
            .matches(&record));
        assert!(!UsageQuery::new()
            .with_time_range(at - chrono::Duration::hours(1), at)
            .matches(&record));
    }
}
