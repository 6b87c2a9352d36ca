//! Graph execution error types.
//!
//! Returned by `Node::run` and `CompiledStateGraph::invoke`. Callers of the
//! orchestrator see `StepError` instead, which wraps this.

use thiserror::Error;

use crate::graph::GraphInterrupt;
use crate::llm::GatewayError;
use crate::memory::CheckpointError;
use crate::tools::ToolError;

/// Error raised while running the graph.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// A node paused execution. The graph persists state before returning this.
    #[error("graph interrupted: {0}")]
    Interrupted(GraphInterrupt),

    #[error("model gateway: {0}")]
    Gateway(#[from] GatewayError),

    /// Tool failure that the act node was configured not to absorb.
    #[error("tool: {0}")]
    Tool(#[from] ToolError),

    #[error("checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// Too many node executions in one invoke.
    #[error("recursion limit of {0} node executions reached")]
    RecursionLimit(usize),
}

impl AgentError {
    /// Whether re-running the failed node may succeed (transient gateway failures only).
    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentError::Gateway(e) if e.is_transient())
    }
}

impl From<GraphInterrupt> for AgentError {
    fn from(interrupt: GraphInterrupt) -> Self {
        AgentError::Interrupted(interrupt)
    }
}
