use std::fmt::Debug;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::{LlmRequest, LlmResponse};
use crate::domain::DomainError;

/// Remote chat model that turns an [`LlmRequest`] into a single completion.
///
/// Implementations report transport and HTTP failures as
/// [`DomainError::Provider`] tagged with [`provider_name`](Self::provider_name).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError>;

    fn provider_name(&self) -> &'static str;
}
