//! Mock LLM for tests and the offline demo.
//!
//! Replays a script of responses (or failures) in order. When the script is
//! exhausted it falls back to an optional responder closure, then to a fixed
//! text answer. Every call's message log is recorded for assertions.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::llm::{GatewayError, LlmClient, LlmResponse};
use crate::message::Message;
use crate::tools::ToolSpec;

/// Computes a response from the log when no scripted entry is left.
pub type MockResponder =
    Arc<dyn Fn(&[Message], &[ToolSpec]) -> Result<LlmResponse, GatewayError> + Send + Sync>;

/// Mock LLM: scripted responses, optional responder, recorded calls.
///
/// **Interaction**: Implements `LlmClient`; used by ThinkNode in tests and by
/// the CLI's `--mock` mode.
pub struct MockLlm {
    script: Mutex<VecDeque<Result<LlmResponse, GatewayError>>>,
    responder: Option<MockResponder>,
    fallback: Option<String>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl Default for MockLlm {
    fn default() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            responder: None,
            fallback: None,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockLlm {
    /// Always answers with `content` and no tool calls.
    pub fn with_no_tool_calls(content: impl Into<String>) -> Self {
        Self {
            fallback: Some(content.into()),
            ..Default::default()
        }
    }

    /// Returns the given responses in order.
    pub fn scripted(responses: impl IntoIterator<Item = LlmResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            ..Default::default()
        }
    }

    /// Answers every call with `responder`.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&[Message], &[ToolSpec]) -> Result<LlmResponse, GatewayError> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Arc::new(responder)),
            ..Default::default()
        }
    }

    /// Appends a response to the script.
    pub fn push_response(self, response: LlmResponse) -> Self {
        self.lock_script().push_back(Ok(response));
        self
    }

    /// Appends a failure to the script.
    pub fn push_error(self, error: GatewayError) -> Self {
        self.lock_script().push_back(Err(error));
        self
    }

    /// Message logs received so far, one entry per invoke.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<LlmResponse, GatewayError>>> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, GatewayError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(messages.to_vec());

        let scripted = self.lock_script().pop_front();
        if let Some(next) = scripted {
            return next;
        }
        if let Some(responder) = &self.responder {
            return responder(messages, tools);
        }
        match &self.fallback {
            Some(content) => Ok(LlmResponse::text(content.clone())),
            None => Err(GatewayError::MalformedResponse(
                "mock script exhausted".into(),
            )),
        }
    }
}
