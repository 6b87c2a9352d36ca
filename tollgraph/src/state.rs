//! Session state: the message log plus the active suspension, if any.
//!
//! `SessionState` is the graph state threaded through `think` and `act` and the
//! value persisted by the checkpointer. Pending tool calls are derived from the
//! log rather than stored, so the log stays the single source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::Interrupt;
use crate::message::{Message, ToolCall};

/// A paused tool invocation awaiting an external value.
///
/// At most one exists per session. `token` is unique per suspension and must
/// be echoed back on resume; `call_id` marks which tool call to re-enter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suspension {
    pub session_id: String,
    pub token: String,
    pub call_id: String,
    pub tool_name: String,
    /// Parsed arguments of the paused call.
    pub arguments: Value,
    /// Human-readable prompt shown to the approver.
    pub prompt: String,
    /// Opaque value the tool asked to get back on resume.
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl Suspension {
    /// Interrupt raised to the graph runner when this suspension is created.
    pub fn to_interrupt(&self) -> Interrupt {
        Interrupt::with_id(
            serde_json::json!({
                "prompt": self.prompt,
                "tool_name": self.tool_name,
                "call_id": self.call_id,
                "arguments": self.arguments,
            }),
            self.token.clone(),
        )
    }
}

/// Value supplied by the caller to continue a paused session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeValue {
    /// Token from the `Paused` result being answered.
    pub token: String,
    pub value: Value,
}

impl ResumeValue {
    pub fn new(token: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            token: token.into(),
            value: value.into(),
        }
    }
}

/// Input that opened a session's most recent step.
///
/// Kept in the checkpoint so that repeating the same input after a failed step
/// continues that step instead of starting a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepOrigin {
    Message { content: String },
    Resume { token: String },
}

/// Checkpointed state of one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspension: Option<Suspension>,
    /// Resume value handed to `act`; consumed before the state is persisted again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<Value>,
    /// Completed model turns across the session's lifetime.
    #[serde(default)]
    pub turn_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<StepOrigin>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Index of the most recent assistant message.
    fn last_assistant_index(&self) -> Option<usize> {
        self.messages
            .iter()
            .rposition(|m| matches!(m, Message::Assistant { .. }))
    }

    /// Tool calls of the last assistant message that have no result yet, in request order.
    pub fn pending_tool_calls(&self) -> Vec<ToolCall> {
        let Some(idx) = self.last_assistant_index() else {
            return Vec::new();
        };
        let answered: Vec<&str> = self.messages[idx + 1..]
            .iter()
            .filter_map(Message::answers)
            .collect();
        self.messages[idx]
            .tool_calls()
            .iter()
            .filter(|tc| !answered.contains(&tc.id.as_str()))
            .cloned()
            .collect()
    }

    /// Finds a tool call by id in the last assistant message.
    pub fn find_tool_call(&self, call_id: &str) -> Option<ToolCall> {
        let idx = self.last_assistant_index()?;
        self.messages[idx]
            .tool_calls()
            .iter()
            .find(|tc| tc.id == call_id)
            .cloned()
    }

    /// Content of the last assistant message, used as the final answer of a step.
    pub fn last_assistant_content(&self) -> Option<&str> {
        self.last_assistant_index()
            .map(|idx| self.messages[idx].content())
    }

    pub fn is_suspended(&self) -> bool {
        self.suspension.is_some()
    }

    /// Node a step that stopped part-way must continue from, if any.
    ///
    /// `act` while the last assistant message still has unanswered calls,
    /// `think` when the log ends in tool results. Finished and suspended
    /// sessions return `None`.
    pub fn unfinished_at(&self) -> Option<&'static str> {
        if self.suspension.is_some() {
            return None;
        }
        if !self.pending_tool_calls().is_empty() {
            return Some("act");
        }
        match self.last_message() {
            Some(Message::Tool { .. }) => Some("think"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_calls() -> SessionState {
        let mut s = SessionState::new();
        s.push(Message::user("buy"));
        s.push(Message::assistant_with_tool_calls(
            "",
            vec![
                ToolCall::new("a", "get_stock_price", r#"{"symbol":"AMZN"}"#),
                ToolCall::new("b", "buy_stocks", "{}"),
            ],
        ));
        s
    }

    /// **Scenario**: All calls of the last assistant message are pending before any result.
    #[test]
    fn pending_tool_calls_all_unanswered() {
        let s = state_with_calls();
        let ids: Vec<_> = s.pending_tool_calls().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    /// **Scenario**: Answered calls drop out of the pending list; order is preserved.
    #[test]
    fn pending_tool_calls_skips_answered() {
        let mut s = state_with_calls();
        let call = s.find_tool_call("a").unwrap();
        s.push(Message::tool_result(&call, "135.0"));
        let ids: Vec<_> = s.pending_tool_calls().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["b"]);
    }

    /// **Scenario**: A final assistant message without tool calls leaves nothing pending.
    #[test]
    fn pending_tool_calls_empty_after_final_answer() {
        let mut s = state_with_calls();
        for id in ["a", "b"] {
            let call = s.find_tool_call(id).unwrap();
            s.push(Message::tool_result(&call, "ok"));
        }
        s.push(Message::assistant("all done"));
        assert!(s.pending_tool_calls().is_empty());
        assert_eq!(s.last_assistant_content(), Some("all done"));
    }

    /// **Scenario**: A log ending in unanswered calls continues at act, one ending in tool results at think.
    #[test]
    fn unfinished_at_follows_log_tail() {
        let mut s = state_with_calls();
        assert_eq!(s.unfinished_at(), Some("act"));
        for id in ["a", "b"] {
            let call = s.find_tool_call(id).unwrap();
            s.push(Message::tool_result(&call, "ok"));
        }
        assert_eq!(s.unfinished_at(), Some("think"));
        s.push(Message::assistant("done"));
        assert_eq!(s.unfinished_at(), None);
    }

    /// **Scenario**: A suspended session is paused, not unfinished.
    #[test]
    fn unfinished_at_none_while_suspended() {
        let mut s = state_with_calls();
        s.suspension = Some(Suspension {
            session_id: "s1".into(),
            token: "tok".into(),
            call_id: "b".into(),
            tool_name: "buy_stocks".into(),
            arguments: Value::Null,
            prompt: "Approve?".into(),
            payload: Value::Null,
            created_at: Utc::now(),
        });
        assert_eq!(s.unfinished_at(), None);
    }

    /// **Scenario**: Serialized state omits absent suspension and resume and round-trips.
    #[test]
    fn session_state_roundtrips_through_json() {
        let mut s = state_with_calls();
        s.suspension = Some(Suspension {
            session_id: "s1".into(),
            token: "tok".into(),
            call_id: "b".into(),
            tool_name: "buy_stocks".into(),
            arguments: serde_json::json!({"symbol": "AMZN"}),
            prompt: "Approve?".into(),
            payload: serde_json::json!({"quantity": 10}),
            created_at: Utc::now(),
        });
        let json = serde_json::to_string(&s).unwrap();
        assert!(!json.contains("\"resume\""));
        let back: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    /// **Scenario**: The interrupt raised for a suspension carries its token and prompt.
    #[test]
    fn suspension_to_interrupt_carries_token_and_prompt() {
        let sus = Suspension {
            session_id: "s1".into(),
            token: "tok-1".into(),
            call_id: "b".into(),
            tool_name: "buy_stocks".into(),
            arguments: serde_json::json!({}),
            prompt: "Approve buying".into(),
            payload: Value::Null,
            created_at: Utc::now(),
        };
        let interrupt = sus.to_interrupt();
        assert_eq!(interrupt.id.as_deref(), Some("tok-1"));
        assert_eq!(interrupt.prompt(), Some("Approve buying"));
    }
}
