//! Generic primary / fallback / degraded control flow

mod executor;

pub use executor::{
    operation, AttemptRecord, FallbackExecutor, FallbackOutcome, FallbackStage, Operation,
};
