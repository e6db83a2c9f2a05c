//! Domain layer - Core business logic and entities

pub mod analysis;
pub mod catalog;
pub mod error;
pub mod fallback;
pub mod llm;
pub mod score;
pub mod usage;

pub use analysis::{AnalyzerConfig, RuleBasedAnalyzer, KEYWORD_TABLE_VERSION};
pub use catalog::{
    Complexity, CostSensitivity, ModelCatalog, ModelDescriptor, ModelPricing, StaticModelCatalog,
    TaskKind,
};
pub use error::DomainError;
pub use fallback::{
    operation, AttemptRecord, FallbackExecutor, FallbackOutcome, FallbackStage, Operation,
};
pub use llm::{
    FinishReason, LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse, Message, MessageRole,
    Usage,
};
pub use score::{ScoreModel, ScoreWeights, SectionKind, SectionScore, Sections};
pub use usage::{
    Clock, QuotaLedger, QuotaLimits, QuotaState, SessionCounters, SystemClock, UsageOperation,
    UsageRecord, UsageRepository,
};
