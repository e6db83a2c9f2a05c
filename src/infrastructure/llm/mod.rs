//! LLM provider implementations

mod anthropic;
mod factory;
mod http_client;
mod openai;

pub use anthropic::AnthropicProvider;
pub use factory::{LlmProviderFactory, LlmProviderKind};
pub use http_client::{HttpClient, HttpClientTrait};
pub use openai::OpenAiProvider;

use crate::domain::DomainError;

/// Re-attribute transport failures from the HTTP client to a named provider
fn tag_provider_error(provider: &'static str) -> impl Fn(DomainError) -> DomainError {
    move |error| match error {
        DomainError::Provider { message, .. } => DomainError::provider(provider, message),
        other => other,
    }
}
