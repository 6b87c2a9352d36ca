//! Interrupt raised when a node pauses for an external value (human approval).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interrupt value raised during graph execution.
///
/// `value` is the JSON payload surfaced to the caller; `id` identifies this
/// particular pause (the orchestrator uses the suspension token).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interrupt {
    pub value: serde_json::Value,
    pub id: Option<String>,
}

impl Interrupt {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value, id: None }
    }

    pub fn with_id(value: serde_json::Value, id: String) -> Self {
        Self {
            value,
            id: Some(id),
        }
    }

    /// The `prompt` field of the payload, when present.
    pub fn prompt(&self) -> Option<&str> {
        self.value.get("prompt").and_then(|p| p.as_str())
    }
}

/// Error carried by `AgentError::Interrupted` once the graph has checkpointed.
#[derive(Debug, Clone, Error)]
#[error("Graph interrupted: {0:?}")]
pub struct GraphInterrupt(pub Interrupt);

impl From<Interrupt> for GraphInterrupt {
    fn from(interrupt: Interrupt) -> Self {
        GraphInterrupt(interrupt)
    }
}
