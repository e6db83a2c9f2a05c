//! Quota and usage infrastructure implementations

mod in_memory;
mod postgres;
mod service;

pub use in_memory::{InMemoryQuotaLedger, InMemoryUsageRepository};
pub use postgres::{ensure_usage_schema, PostgresQuotaLedger, PostgresUsageRepository};
pub use service::{QuotaManager, QuotaManagerTrait, QuotaPermit, TrackUsageParams};
