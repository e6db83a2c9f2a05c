//! Usage accounting domain
//!
//! Per-session quota counters over daily and monthly UTC windows, and the
//! append-only log of AI invocations they are derived from.

mod clock;
mod quota;
mod record;
mod repository;

pub use clock::{day_of, month_bounds, month_of, Clock, ManualClock, SystemClock};
pub use quota::{QuotaLimits, QuotaState, SessionCounters};
pub use record::{UsageAggregate, UsageOperation, UsageRecord, UsageRecordId, UsageSummary};
pub use repository::{QuotaLedger, UsageQuery, UsageRepository};

#[cfg(test)]
pub use repository::MockUsageRepository;
