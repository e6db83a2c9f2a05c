use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::HttpClientTrait;
use super::tag_provider_error;
use crate::domain::{
    DomainError, FinishReason, LlmProvider, LlmRequest, LlmResponse, Message, MessageRole, Usage,
};

const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const PROVIDER: &str = "anthropic";

/// Anthropic messages API provider
#[derive(Debug)]
pub struct AnthropicProvider<C: HttpClientTrait> {
    client: C,
    api_key: String,
    endpoint: String,
}

impl<C: HttpClientTrait> AnthropicProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_ANTHROPIC_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: format!("{}/v1/messages", base_url.into().trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for AnthropicProvider<C> {
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let body = MessagesBody::new(model, &request).to_json()?;
        let headers = vec![
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", ANTHROPIC_VERSION),
            ("Content-Type", "application/json"),
        ];

        let json = self
            .client
            .post_json(&self.endpoint, headers, &body)
            .await
            .map_err(tag_provider_error(PROVIDER))?;

        into_llm_response(json)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

fn into_llm_response(json: serde_json::Value) -> Result<LlmResponse, DomainError> {
    let reply: MessagesReply = serde_json::from_value(json).map_err(|e| {
        DomainError::provider(PROVIDER, format!("Failed to parse response: {}", e))
    })?;

    let text: String = reply
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();

    let finish_reason = match reply.stop_reason.as_deref() {
        Some("max_tokens") => FinishReason::Length,
        _ => FinishReason::Stop,
    };

    Ok(LlmResponse::new(reply.id, reply.model, Message::assistant(text))
        .with_finish_reason(finish_reason)
        .with_usage(Usage::new(reply.usage.input_tokens, reply.usage.output_tokens)))
}

/// Request body; system messages move to the top-level `system` field
#[derive(Debug, Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl<'a> MessagesBody<'a> {
    fn new(model: &'a str, request: &'a LlmRequest) -> Self {
        let (system, conversation): (Vec<&Message>, Vec<&Message>) = request
            .messages
            .iter()
            .partition(|m| m.role == MessageRole::System);

        let system = (!system.is_empty()).then(|| {
            system
                .iter()
                .map(|m| m.content_text())
                .collect::<Vec<_>>()
                .join("\n")
        });

        Self {
            model,
            system,
            messages: conversation
                .into_iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
        }
    }

    fn to_json(&self) -> Result<serde_json::Value, DomainError> {
        serde_json::to_value(self)
            .map_err(|e| DomainError::internal(format!("Failed to encode request: {}", e)))
    }
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    id: String,
    model: String,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: ReplyUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;

    const TEST_URL: &str = "https://api.anthropic.com/v1/messages";

    fn message_response(id: &str, text: &str, stop_reason: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "type": "message",
            "role": "assistant",
            "model": "claude-3-haiku-20240307",
            "content": [{"type": "text", "text": text}],
            "stop_reason": stop_reason,
            "usage": {"input_tokens": 12, "output_tokens": 10}
        })
    }

    #[tokio::test]
    async fn test_anthropic_chat() {
        let client = MockHttpClient::new()
            .with_response(TEST_URL, message_response("msg_123", "{\"ok\": true}", "end_turn"));
        let provider = AnthropicProvider::new(client, "test-api-key");

        let request = LlmRequest::builder()
            .system("You score resumes")
            .user("Hello!")
            .build();

        let response = provider
            .chat("claude-3-haiku-20240307", request)
            .await
            .unwrap();

        assert_eq!(response.id, "msg_123");
        assert_eq!(response.content(), "{\"ok\": true}");
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.unwrap().total_tokens, 22);
    }

    #[tokio::test]
    async fn test_anthropic_system_message_handling() {
        let client = MockHttpClient::new()
            .with_response(TEST_URL, message_response("msg_1", "Response", "end_turn"));
        let provider = AnthropicProvider::new(client, "test-key");

        let request = LlmRequest::builder()
            .system("System prompt 1")
            .system("System prompt 2")
            .user("Hello")
            .build();

        provider
            .chat("claude-3-haiku-20240307", request)
            .await
            .unwrap();

        let (_, body) = provider.client.requests().remove(0);
        assert_eq!(body["system"], "System prompt 1\nSystem prompt 2");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_anthropic_max_tokens_stop_reason() {
        let client = MockHttpClient::new()
            .with_response(TEST_URL, message_response("msg_2", "{\"trunc", "max_tokens"));
        let provider = AnthropicProvider::new(client, "test-key");

        let response = provider
            .chat("claude-3-haiku-20240307", LlmRequest::builder().user("Hi").build())
            .await
            .unwrap();

        assert_eq!(response.finish_reason, Some(FinishReason::Length));
    }

    #[tokio::test]
    async fn test_anthropic_custom_base_url() {
        let custom_url = "http://localhost:8081/v1/messages";
        let client = MockHttpClient::new()
            .with_response(custom_url, message_response("msg_custom", "Custom", "end_turn"));
        let provider =
            AnthropicProvider::with_base_url(client, "test-key", "http://localhost:8081");

        let response = provider
            .chat("claude-3-haiku-20240307", LlmRequest::builder().user("Test").build())
            .await
            .unwrap();

        assert_eq!(response.id, "msg_custom");
        assert_eq!(provider.provider_name(), "anthropic");
    }
}
