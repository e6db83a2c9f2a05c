//! Infrastructure layer - External service implementations

pub mod analysis;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod usage;
