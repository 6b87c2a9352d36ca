//! Model gateway: the seam between the orchestrator and a hosted chat model.
//!
//! `ThinkNode` hands the message log and the registered tool specs to an
//! [`LlmClient`] and receives assistant text plus optional tool calls. The
//! gateway is stateless; retries belong to the graph's `RetryPolicy`, which
//! only re-runs a node when the error is [`GatewayError::Transient`].

mod mock;
mod openai;

pub use mock::MockLlm;
pub use openai::ChatOpenAI;

use async_trait::async_trait;
use thiserror::Error;

use crate::message::{Message, ToolCall};
use crate::tools::ToolSpec;

/// Gateway failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Network, rate limit or server-side failure; the same call may succeed later.
    #[error("transient gateway error: {0}")]
    Transient(String),
    /// The provider answered with something that is not a usable completion.
    #[error("malformed gateway response: {0}")]
    MalformedResponse(String),
    /// The provider refused the request (bad request, authentication, quota).
    #[error("gateway rejected request: {0}")]
    Rejected(String),
}

impl GatewayError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Transient(_))
    }
}

/// Token usage for one gateway call (prompt + completion).
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Response from one completion: assistant text and optional tool calls.
///
/// **Interaction**: Returned by `LlmClient::invoke()`; ThinkNode appends it as
/// an assistant message. Empty `tool_calls` means the turn is final.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LlmResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<LlmUsage>,
}

impl LlmResponse {
    /// Final answer with no tool calls.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Turn that requests the given tool calls.
    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            usage: None,
        }
    }
}

/// LLM client: given messages and the available tools, returns assistant text and optional tool_calls.
///
/// Implementations: `MockLlm` (scripted), `ChatOpenAI` (OpenAI / Azure OpenAI).
///
/// **Interaction**: Used by ThinkNode.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubLlm {
        content: String,
    }

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn invoke(
            &self,
            _messages: &[Message],
            _tools: &[ToolSpec],
        ) -> Result<LlmResponse, GatewayError> {
            Ok(LlmResponse::text(self.content.clone()))
        }
    }

    /// **Scenario**: A trait object dispatches to the implementation.
    #[tokio::test]
    async fn llm_client_trait_object_invoke() {
        let client: Box<dyn LlmClient> = Box::new(StubLlm {
            content: "hello".into(),
        });
        let resp = client.invoke(&[Message::user("hi")], &[]).await.unwrap();
        assert_eq!(resp.content, "hello");
        assert!(resp.tool_calls.is_empty());
    }

    /// **Scenario**: Only Transient is transient; display text names the kind.
    #[test]
    fn gateway_error_transient_classification() {
        let t = GatewayError::Transient("503".into());
        let m = GatewayError::MalformedResponse("no choices".into());
        assert!(t.is_transient());
        assert!(!m.is_transient());
        assert!(t.to_string().contains("transient"));
        assert!(m.to_string().contains("malformed"));
        assert!(!GatewayError::Rejected("401".into()).is_transient());
    }
}
