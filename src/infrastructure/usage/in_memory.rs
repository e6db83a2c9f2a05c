//! In-memory quota ledger and usage repository

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::usage::{QuotaLedger, SessionCounters, UsageQuery, UsageRecord, UsageRepository};
use crate::domain::DomainError;

/// In-memory quota ledger.
///
/// Every increment runs under a single write lock, so increments for the same
/// session are serialized.
#[derive(Debug, Default)]
pub struct InMemoryQuotaLedger {
    sessions: RwLock<HashMap<String, SessionCounters>>,
}

impl InMemoryQuotaLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuotaLedger for InMemoryQuotaLedger {
    async fn snapshot(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionCounters, DomainError> {
        let sessions = self.sessions.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(sessions
            .get(session_id)
            .map(|counters| counters.current(now))
            .unwrap_or_else(|| SessionCounters::empty(session_id, now)))
    }

    async fn increment(
        &self,
        session_id: &str,
        tokens: u64,
        cost_micros: i64,
        now: DateTime<Utc>,
    ) -> Result<SessionCounters, DomainError> {
        let mut sessions = self.sessions.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        let counters = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionCounters::empty(session_id, now));
        counters.add(tokens, cost_micros, now);

        Ok(counters.clone())
    }
}

/// In-memory usage repository holding at most `max_records` records
#[derive(Debug)]
pub struct InMemoryUsageRepository {
    records: RwLock<VecDeque<UsageRecord>>,
    max_records: usize,
}

impl InMemoryUsageRepository {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            max_records: max_records.max(1),
        }
    }

    fn matching(&self, query: &UsageQuery) -> Result<Vec<UsageRecord>, DomainError> {
        let records = self.records.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        let mut results: Vec<_> = records.iter().filter(|r| query.matches(r)).cloned().collect();

        // Stable, so records with equal timestamps keep append order
        results.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        Ok(results)
    }
}

impl Default for InMemoryUsageRepository {
    fn default() -> Self {
        Self::new(100_000)
    }
}

#[async_trait]
impl UsageRepository for InMemoryUsageRepository {
    async fn append(&self, record: UsageRecord) -> Result<(), DomainError> {
        let mut records = self.records.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        records.push_back(record);

        while records.len() > self.max_records {
            records.pop_front();
        }

        Ok(())
    }

    async fn query(&self, query: &UsageQuery) -> Result<Vec<UsageRecord>, DomainError> {
        let results = self.matching(query)?;
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(results.into_iter().take(limit).collect())
    }

    async fn count(&self, query: &UsageQuery) -> Result<usize, DomainError> {
        Ok(self.matching(query)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::usage::UsageOperation;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn record(session: &str, when: DateTime<Utc>) -> UsageRecord {
        UsageRecord::new(session, UsageOperation::AnalyzeResume, "gpt-4o-mini", when)
            .with_tokens(100)
    }

    #[tokio::test]
    async fn test_snapshot_of_unknown_session_is_empty() {
        let ledger = InMemoryQuotaLedger::new();

        let counters = ledger.snapshot("nobody", at(1, 9)).await.unwrap();

        assert_eq!(counters.session_id, "nobody");
        assert_eq!(counters.daily_tokens_used, 0);
        assert_eq!(counters.monthly_spent_micros, 0);
    }

    #[tokio::test]
    async fn test_increment_accumulates() {
        let ledger = InMemoryQuotaLedger::new();

        ledger.increment("s", 100, 10, at(1, 9)).await.unwrap();
        let counters = ledger.increment("s", 50, 5, at(1, 10)).await.unwrap();

        assert_eq!(counters.daily_tokens_used, 150);
        assert_eq!(counters.monthly_spent_micros, 15);
        assert_eq!(ledger.snapshot("s", at(1, 11)).await.unwrap(), counters);
    }

    #[tokio::test]
    async fn test_snapshot_does_not_roll_stored_counters() {
        let ledger = InMemoryQuotaLedger::new();
        ledger.increment("s", 100, 10, at(1, 9)).await.unwrap();

        let next_day = ledger.snapshot("s", at(2, 9)).await.unwrap();
        let same_day = ledger.snapshot("s", at(1, 23)).await.unwrap();

        assert_eq!(next_day.daily_tokens_used, 0);
        assert_eq!(same_day.daily_tokens_used, 100);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let ledger = Arc::new(InMemoryQuotaLedger::new());

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.increment("s", 100, 1, at(1, 9)).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let counters = ledger.snapshot("s", at(1, 9)).await.unwrap();
        assert_eq!(counters.daily_tokens_used, 5000);
        assert_eq!(counters.monthly_spent_micros, 50);
    }

    #[tokio::test]
    async fn test_repository_evicts_oldest_first() {
        let repo = InMemoryUsageRepository::new(2);

        repo.append(record("s", at(1, 1)).with_id("first")).await.unwrap();
        repo.append(record("s", at(1, 2)).with_id("second")).await.unwrap();
        repo.append(record("s", at(1, 3)).with_id("third")).await.unwrap();

        let ids: Vec<String> = repo
            .query(&UsageQuery::new())
            .await
            .unwrap()
            .iter()
            .map(|r| r.id().to_string())
            .collect();

        assert_eq!(ids, vec!["second", "third"]);
    }

    #[tokio::test]
    async fn test_repository_query_filters_and_orders() {
        let repo = InMemoryUsageRepository::default();

        repo.append(record("a", at(2, 9)).with_id("late")).await.unwrap();
        repo.append(record("a", at(1, 9)).with_id("early")).await.unwrap();
        repo.append(record("b", at(1, 9))).await.unwrap();

        let query = UsageQuery::new().with_session("a");
        let results = repo.query(&query).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id().as_str(), "early");
        assert_eq!(results[1].id().as_str(), "late");
        assert_eq!(repo.count(&query).await.unwrap(), 2);

        let limited = repo.query(&query.with_limit(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id().as_str(), "early");
    }
}
