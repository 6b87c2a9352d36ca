//! Think node: read messages, call the model gateway, append the assistant message.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::llm::LlmClient;
use crate::message::{Message, ToolCall};
use crate::state::SessionState;
use crate::tools::ToolRegistry;

/// Content used when the model returns neither text nor tool calls.
const EMPTY_RESPONSE_FALLBACK: &str =
    "No text response from the model. Please try again or check the API.";

pub struct ThinkNode {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
}

impl ThinkNode {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>) -> Self {
        Self { llm, registry }
    }
}

/// Gives every call a distinct id so each tool result links back to exactly one call.
///
/// Empty ids and ids repeated within the batch are replaced.
fn ensure_call_ids(tool_calls: Vec<ToolCall>) -> Vec<ToolCall> {
    let mut seen = HashSet::new();
    tool_calls
        .into_iter()
        .map(|mut tc| {
            if tc.id.is_empty() || seen.contains(&tc.id) {
                let fresh = format!("call_{}", uuid::Uuid::new_v4().simple());
                if !tc.id.is_empty() {
                    warn!(duplicate = %tc.id, replacement = %fresh, "duplicate tool call id");
                }
                tc.id = fresh;
            }
            seen.insert(tc.id.clone());
            tc
        })
        .collect()
}

#[async_trait]
impl Node<SessionState> for ThinkNode {
    fn id(&self) -> &str {
        "think"
    }

    async fn run(&self, state: SessionState) -> Result<(SessionState, Next), AgentError> {
        let specs = self.registry.list();
        let response = self.llm.invoke(&state.messages, &specs).await?;

        let tool_calls = ensure_call_ids(response.tool_calls);
        let content = if response.content.is_empty() && tool_calls.is_empty() {
            EMPTY_RESPONSE_FALLBACK.to_string()
        } else {
            response.content
        };
        debug!(
            tool_calls = tool_calls.len(),
            usage = ?response.usage,
            "model turn complete"
        );

        let mut state = state;
        state.push(Message::assistant_with_tool_calls(content, tool_calls));
        state.turn_count += 1;
        Ok((state, Next::Continue))
    }
}
