//! Errors returned to callers of `Orchestrator`.

use thiserror::Error;

use crate::error::AgentError;
use crate::graph::CompilationError;
use crate::llm::GatewayError;
use crate::memory::CheckpointError;

/// Error from `Orchestrator::step` and the session accessors.
///
/// A failed step keeps the tool results it already produced; everything else
/// about the session is as it was before the call.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// A resume value was sent to a session that is not paused.
    #[error("session {0} has no pending suspension")]
    NoPendingSuspension(String),

    /// The resume token does not belong to the session's active suspension.
    #[error("resume token does not match the pending suspension of session {session_id}")]
    StaleResumeToken { session_id: String },

    /// A new message was sent while the session waits for a resume value.
    #[error("session {session_id} is waiting for a resume value (token {token})")]
    SuspensionPending { session_id: String, token: String },

    /// A different message arrived while an earlier failed step still has tool calls to run.
    #[error("session {0} has an unfinished step; repeat its input to complete it")]
    UnfinishedStep(String),

    #[error(transparent)]
    Gateway(GatewayError),

    #[error("checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("recursion limit of {0} node executions reached")]
    RecursionLimit(usize),

    #[error(transparent)]
    Agent(AgentError),
}

impl StepError {
    /// Whether repeating the same step may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StepError::Gateway(e) if e.is_transient())
    }
}

impl From<AgentError> for StepError {
    fn from(e: AgentError) -> Self {
        match e {
            AgentError::Gateway(e) => StepError::Gateway(e),
            AgentError::Checkpoint(e) => StepError::Checkpoint(e),
            AgentError::RecursionLimit(n) => StepError::RecursionLimit(n),
            other => StepError::Agent(other),
        }
    }
}

/// Error from `OrchestratorBuilder::build`.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no model gateway configured")]
    MissingLlm,
    #[error("graph compilation failed: {0}")]
    Compilation(#[from] CompilationError),
}
