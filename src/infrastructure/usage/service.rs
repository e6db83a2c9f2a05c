//! Quota management service

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::domain::catalog::{Complexity, ModelCatalog, TaskKind};
use crate::domain::usage::{
    month_bounds, Clock, QuotaLedger, QuotaLimits, QuotaState, SystemClock, UsageAggregate,
    UsageOperation, UsageQuery, UsageRecord, UsageRepository, UsageSummary,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_quota_over_allocation;

/// Parameters for tracking one AI invocation
#[derive(Debug, Clone)]
pub struct TrackUsageParams {
    pub session_id: String,
    pub operation: UsageOperation,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub input_chars: u64,
    pub output_chars: u64,
    pub response_time_ms: u64,
    /// Priced from the model catalog when absent
    pub estimated_cost_micros: Option<i64>,
}

impl TrackUsageParams {
    pub fn new(
        session_id: impl Into<String>,
        operation: UsageOperation,
        model: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            operation,
            model: model.into(),
            input_tokens: 0,
            output_tokens: 0,
            input_chars: 0,
            output_chars: 0,
            response_time_ms: 0,
            estimated_cost_micros: None,
        }
    }

    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self
    }

    /// Characters of prompt and completion text
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
        self.estimated_cost_micros = Some(cost);
        self
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Quota position checked while holding the session's AI slot.
///
/// While a permit is alive no other permit exists for the same session, so
/// the check and the usage tracked under it cannot interleave with another
/// AI call of that session. Drop it after the call's usage is tracked.
#[derive(Debug)]
pub struct QuotaPermit {
    state: QuotaState,
    _slot: Option<OwnedMutexGuard<()>>,
}

impl QuotaPermit {
    /// Permit that holds no slot
    pub fn detached(state: QuotaState) -> Self {
        Self { state, _slot: None }
    }

    pub fn state(&self) -> &QuotaState {
        &self.state
    }

    pub fn can_proceed(&self) -> bool {
        self.state.can_proceed
    }
}

/// One async slot per session with an AI call in flight
#[derive(Debug, Default)]
struct SessionSlots {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SessionSlots {
    fn slot(&self, session_id: &str) -> Result<Arc<AsyncMutex<()>>, DomainError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|e| DomainError::internal(format!("Failed to acquire session slots: {}", e)))?;

        // Slots only referenced by the map are idle
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);

        Ok(slots
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone())
    }
}

/// Per-session quota gate and usage ledger
#[async_trait]
pub trait QuotaManagerTrait: Send + Sync + Debug {
    /// Current quota position of a session. Never mutates counters.
    async fn check_usage_quota(&self, session_id: &str) -> Result<QuotaState, DomainError>;

    /// Wait for the session's in-flight AI call to finish, then check its quota
    async fn acquire_ai_permit(&self, session_id: &str) -> Result<QuotaPermit, DomainError>;

    /// Append a usage record and atomically add it to the session counters
    async fn track_usage(&self, params: TrackUsageParams) -> Result<UsageRecord, DomainError>;

    /// Usage of a session over the current calendar month
    async fn usage_summary(&self, session_id: &str) -> Result<UsageSummary, DomainError>;

    fn limits(&self) -> QuotaLimits;
}

/// Quota manager over a ledger, a usage log and the model catalog
#[derive(Debug)]
pub struct QuotaManager {
    ledger: Arc<dyn QuotaLedger>,
    repository: Arc<dyn UsageRepository>,
    catalog: Arc<dyn ModelCatalog>,
    limits: QuotaLimits,
    clock: Arc<dyn Clock>,
    slots: SessionSlots,
}

impl QuotaManager {
    pub fn new(
        ledger: Arc<dyn QuotaLedger>,
        repository: Arc<dyn UsageRepository>,
        catalog: Arc<dyn ModelCatalog>,
        limits: QuotaLimits,
    ) -> Self {
        Self {
            ledger,
            repository,
            catalog,
            limits,
            clock: Arc::new(SystemClock),
            slots: SessionSlots::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn estimate_cost(&self, params: &TrackUsageParams) -> i64 {
        if let Some(cost) = params.estimated_cost_micros {
            return cost.max(0);
        }

        if let Some(model) = self.catalog.get_model(&params.model) {
            return model.estimated_cost_micros(params.input_tokens, params.output_tokens);
        }

        // Unknown models are billed at the highest catalog rate
        let cost = self
            .catalog
            .get_available_models()
            .iter()
            .map(|m| m.estimated_cost_micros(params.input_tokens, params.output_tokens))
            .max()
            .unwrap_or(0);

        warn!(model = %params.model, cost_micros = cost, "Model not in catalog; charging the highest catalog rate");
        cost
    }
}

#[async_trait]
impl QuotaManagerTrait for QuotaManager {
    async fn check_usage_quota(&self, session_id: &str) -> Result<QuotaState, DomainError> {
        let now = self.clock.now();
        let counters = self.ledger.snapshot(session_id, now).await?;
        let mut state = QuotaState::evaluate(&counters, &self.limits);

        match self.catalog.recommend_model_for_task(
            TaskKind::Analysis,
            Complexity::Medium,
            state.cost_sensitivity(),
        ) {
            Ok(model) => state = state.with_recommended_model(model.id),
            Err(e) => warn!(session_id, error = %e, "No model to recommend"),
        }

        if !state.can_proceed {
            info!(
                session_id,
                daily_tokens_used = state.daily_tokens_used,
                monthly_spent_micros = state.monthly_spent_micros,
                "Quota exhausted; AI augmentation disabled for session"
            );
        }

        Ok(state)
    }

    async fn acquire_ai_permit(&self, session_id: &str) -> Result<QuotaPermit, DomainError> {
        let slot = self.slots.slot(session_id)?.lock_owned().await;
        let state = self.check_usage_quota(session_id).await?;

        Ok(QuotaPermit {
            state,
            _slot: Some(slot),
        })
    }

    /// The usage log is authoritative: the record is appended first and the
    /// counters only move once it is stored.
    async fn track_usage(&self, params: TrackUsageParams) -> Result<UsageRecord, DomainError> {
        if params.session_id.trim().is_empty() {
            return Err(DomainError::validation("Session id cannot be empty"));
        }

        let now = self.clock.now();
        let cost = self.estimate_cost(&params);
        let tokens = params.total_tokens();

        let record = UsageRecord::new(params.session_id, params.operation, params.model, now)
            .with_tokens(tokens)
            .with_text_sizes(params.input_chars, params.output_chars)
            .with_response_time_ms(params.response_time_ms)
            .with_cost_micros(cost);

        self.repository.append(record.clone()).await?;

        let counters = self
            .ledger
            .increment(&record.session_id, tokens, cost, now)
            .await?;

        if counters.exceeds(&self.limits) {
            warn!(
                session_id = %record.session_id,
                daily_tokens_used = counters.daily_tokens_used,
                daily_token_limit = self.limits.daily_token_limit,
                monthly_spent_micros = counters.monthly_spent_micros,
                monthly_budget_micros = self.limits.monthly_budget_micros,
                "Usage recorded past quota"
            );
            record_quota_over_allocation();
        }

        debug!(
            session_id = %record.session_id,
            operation = %record.operation,
            model = %record.model,
            tokens,
            cost_micros = cost,
            "Usage tracked"
        );

        Ok(record)
    }

    async fn usage_summary(&self, session_id: &str) -> Result<UsageSummary, DomainError> {
        let (period_start, period_end) = month_bounds(self.clock.now());
        let query = UsageQuery::new()
            .with_session(session_id)
            .with_time_range(period_start, period_end);

        let records = self.repository.query(&query).await?;
        let aggregate: UsageAggregate = records.iter().collect();

        Ok(UsageSummary {
            session_id: session_id.to_string(),
            period_start,
            period_end,
            aggregate,
        })
    }

    fn limits(&self) -> QuotaLimits {
        self.limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::StaticModelCatalog;
    use crate::domain::usage::{ManualClock, MockUsageRepository};
    use crate::infrastructure::usage::{InMemoryQuotaLedger, InMemoryUsageRepository};
    use chrono::{DateTime, TimeZone, Utc};

    fn may(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap()
    }

    fn manager(limits: QuotaLimits, clock: Arc<ManualClock>) -> QuotaManager {
        QuotaManager::new(
            Arc::new(InMemoryQuotaLedger::new()),
            Arc::new(InMemoryUsageRepository::default()),
            Arc::new(StaticModelCatalog::default()),
            limits,
        )
        .with_clock(clock)
    }

    fn analysis(session: &str, tokens: u64) -> TrackUsageParams {
        TrackUsageParams::new(session, UsageOperation::AnalyzeResume, "gpt-4o-mini")
            .with_tokens(tokens, 0)
            .with_cost_micros(10)
    }

    #[tokio::test]
    async fn test_fresh_session_can_proceed_with_recommendation() {
        let quota = manager(QuotaLimits::new(1000, 1.0), Arc::new(ManualClock::new(may(1))));

        let state = quota.check_usage_quota("s").await.unwrap();

        assert!(state.can_proceed);
        assert_eq!(state.remaining_tokens, 1000);
        assert_eq!(state.recommended_model.as_deref(), Some("gpt-4o-mini"));
    }

    #[tokio::test]
    async fn test_check_reflects_tracked_usage() {
        let quota = manager(QuotaLimits::new(1000, 1.0), Arc::new(ManualClock::new(may(1))));

        quota.track_usage(analysis("s", 100)).await.unwrap();
        quota.track_usage(analysis("s", 250)).await.unwrap();
        quota.track_usage(analysis("other", 999)).await.unwrap();

        let state = quota.check_usage_quota("s").await.unwrap();
        assert_eq!(state.daily_tokens_used, 350);
        assert_eq!(state.monthly_spent_micros, 20);
        assert_eq!(state.remaining_tokens, 650);
    }

    #[tokio::test]
    async fn test_concurrent_tracking_adds_exactly() {
        let quota = Arc::new(manager(
            QuotaLimits::new(10_000, 1.0),
            Arc::new(ManualClock::new(may(1))),
        ));

        let first = {
            let quota = quota.clone();
            tokio::spawn(async move { quota.track_usage(analysis("s", 100)).await })
        };
        let second = {
            let quota = quota.clone();
            tokio::spawn(async move { quota.track_usage(analysis("s", 100)).await })
        };

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let state = quota.check_usage_quota("s").await.unwrap();
        assert_eq!(state.daily_tokens_used, 200);
    }

    #[tokio::test]
    async fn test_exhausted_tokens_block_session() {
        let quota = manager(QuotaLimits::new(100, 1.0), Arc::new(ManualClock::new(may(1))));

        quota.track_usage(analysis("s", 100)).await.unwrap();
        let state = quota.check_usage_quota("s").await.unwrap();

        assert_eq!(state.remaining_tokens, 0);
        assert!(!state.can_proceed);
    }

    #[tokio::test]
    async fn test_over_allocation_is_still_recorded() {
        let quota = manager(QuotaLimits::new(100, 1.0), Arc::new(ManualClock::new(may(1))));

        quota.track_usage(analysis("s", 80)).await.unwrap();
        quota.track_usage(analysis("s", 80)).await.unwrap();

        let state = quota.check_usage_quota("s").await.unwrap();
        assert_eq!(state.daily_tokens_used, 160);
        assert!(!state.can_proceed);
    }

    #[tokio::test]
    async fn test_windows_reset() {
        let clock = Arc::new(ManualClock::new(may(31)));
        let quota = manager(QuotaLimits::new(1000, 1.0), clock.clone());

        quota.track_usage(analysis("s", 400)).await.unwrap();

        clock.set(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 1).unwrap());
        let june = quota.check_usage_quota("s").await.unwrap();
        assert_eq!(june.daily_tokens_used, 0);
        assert_eq!(june.monthly_spent_micros, 0);

        quota.track_usage(analysis("s", 50)).await.unwrap();
        clock.set(Utc.with_ymd_and_hms(2024, 6, 2, 9, 0, 0).unwrap());
        let next_day = quota.check_usage_quota("s").await.unwrap();
        assert_eq!(next_day.daily_tokens_used, 0);
        assert_eq!(next_day.monthly_spent_micros, 10);
    }

    #[tokio::test]
    async fn test_cost_priced_from_catalog() {
        let quota = manager(QuotaLimits::new(100_000, 5.0), Arc::new(ManualClock::new(may(1))));
        let expected = StaticModelCatalog::default()
            .get_model("gpt-4o")
            .unwrap()
            .estimated_cost_micros(2000, 500);

        let record = quota
            .track_usage(
                TrackUsageParams::new("s", UsageOperation::AnalyzeResume, "gpt-4o")
                    .with_tokens(2000, 500)
                    .with_text_sizes(6, 10),
            )
            .await
            .unwrap();

        assert!(expected > 0);
        assert_eq!(record.estimated_cost_micros, expected);
        assert_eq!(record.tokens_used, 2500);
        assert_eq!(record.input_chars, 6);
        assert_eq!(record.output_chars, 10);
    }

    #[tokio::test]
    async fn test_unknown_model_charged_at_highest_rate() {
        let quota = manager(QuotaLimits::new(100_000, 1.0), Arc::new(ManualClock::new(may(1))));
        let highest = StaticModelCatalog::default()
            .get_available_models()
            .iter()
            .map(|m| m.estimated_cost_micros(1000, 1000))
            .max()
            .unwrap();

        let record = quota
            .track_usage(
                TrackUsageParams::new("s", UsageOperation::AnalyzeResume, "gpt-4-turbo")
                    .with_tokens(1000, 1000),
            )
            .await
            .unwrap();

        assert!(highest > 0);
        assert_eq!(record.estimated_cost_micros, highest);
        let state = quota.check_usage_quota("s").await.unwrap();
        assert_eq!(state.monthly_spent_micros, highest);
    }

    #[tokio::test]
    async fn test_failed_append_leaves_counters_untouched() {
        let mut repository = MockUsageRepository::new();
        repository
            .expect_append()
            .times(1)
            .returning(|_| Err(DomainError::storage("disk full")));

        let quota = QuotaManager::new(
            Arc::new(InMemoryQuotaLedger::new()),
            Arc::new(repository),
            Arc::new(StaticModelCatalog::default()),
            QuotaLimits::new(1000, 1.0),
        )
        .with_clock(Arc::new(ManualClock::new(may(1))));

        let result = quota.track_usage(analysis("s", 100)).await;

        assert!(matches!(result, Err(DomainError::Storage { .. })));
        let state = quota.check_usage_quota("s").await.unwrap();
        assert_eq!(state.daily_tokens_used, 0);
        assert_eq!(state.monthly_spent_micros, 0);
    }

    #[tokio::test]
    async fn test_ai_permit_is_exclusive_per_session() {
        let quota = Arc::new(manager(
            QuotaLimits::new(1000, 1.0),
            Arc::new(ManualClock::new(may(1))),
        ));

        let held = quota.acquire_ai_permit("s").await.unwrap();
        assert!(held.can_proceed());

        let waiting = {
            let quota = quota.clone();
            tokio::spawn(async move { quota.acquire_ai_permit("s").await.unwrap() })
        };

        let other = quota.acquire_ai_permit("other").await.unwrap();
        assert!(other.can_proceed());

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        quota.track_usage(analysis("s", 1000)).await.unwrap();
        drop(held);

        let next = waiting.await.unwrap();
        assert!(!next.can_proceed());
        assert_eq!(next.state().daily_tokens_used, 1000);
    }

    #[tokio::test]
    async fn test_empty_session_rejected() {
        let quota = manager(QuotaLimits::new(1000, 1.0), Arc::new(ManualClock::new(may(1))));

        let result = quota.track_usage(analysis("  ", 10)).await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_usage_summary_covers_current_month() {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 4, 30, 23, 0, 0).unwrap()));
        let quota = manager(QuotaLimits::new(10_000, 5.0), clock.clone());

        quota.track_usage(analysis("s", 100)).await.unwrap();
        clock.set(may(2));
        quota.track_usage(analysis("s", 200).with_response_time_ms(300)).await.unwrap();
        quota
            .track_usage(
                TrackUsageParams::new("s", UsageOperation::AnalyzeResumeAbandoned, "gpt-4o-mini")
                    .with_tokens(50, 0)
                    .with_cost_micros(1)
                    .with_response_time_ms(100),
            )
            .await
            .unwrap();

        let summary = quota.usage_summary("s").await.unwrap();

        assert_eq!(summary.period_start, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(summary.aggregate.total_requests, 2);
        assert_eq!(summary.aggregate.total_tokens, 250);
        assert_eq!(summary.aggregate.total_cost_micros, 11);
        assert_eq!(summary.aggregate.avg_response_time_ms, 200.0);
        assert_eq!(
            summary.aggregate.by_operation.get(&UsageOperation::AnalyzeResumeAbandoned),
            Some(&1)
        );
    }
}
