//! Act node: run the pending tool calls of the last assistant message.
//!
//! When the state carries a suspension, the paused call is re-entered alone
//! with the resume value; if calls remain the node routes back to itself so the
//! resumed result is checkpointed before they run. Otherwise pending calls run
//! in request order. A call that suspends stops the batch: the node records a
//! [`Suspension`] and returns `Next::Interrupt`, leaving later calls pending.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::AgentError;
use crate::graph::{Next, Node, RunContext};
use crate::message::ToolCall;
use crate::state::{SessionState, Suspension};
use crate::tools::{ExecOutcome, ResumeInput, ToolExecutor};

/// Act node: executes tool calls through a [`ToolExecutor`].
pub struct ActNode {
    executor: ToolExecutor,
}

impl ActNode {
    pub fn new(executor: ToolExecutor) -> Self {
        Self { executor }
    }

    fn suspension(
        ctx: &RunContext,
        call: &ToolCall,
        prompt: String,
        payload: Value,
    ) -> Suspension {
        let arguments = serde_json::from_str(&call.arguments)
            .unwrap_or_else(|_| Value::String(call.arguments.clone()));
        Suspension {
            session_id: ctx.thread_id().to_string(),
            token: uuid::Uuid::new_v4().to_string(),
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments,
            prompt,
            payload,
            created_at: Utc::now(),
        }
    }

    /// Runs one call; `Some(next)` means the call suspended and the node must stop.
    async fn execute(
        &self,
        state: &mut SessionState,
        ctx: &RunContext,
        call: &ToolCall,
        resume: Option<ResumeInput>,
    ) -> Result<Option<Next>, AgentError> {
        match self.executor.invoke(call, resume).await? {
            ExecOutcome::Result(message) => {
                state.push(message);
                Ok(None)
            }
            ExecOutcome::Suspend { prompt, payload } => {
                let suspension = Self::suspension(ctx, call, prompt, payload);
                info!(
                    session_id = %suspension.session_id,
                    tool = %call.name,
                    call_id = %call.id,
                    "tool call suspended awaiting resume"
                );
                let interrupt = suspension.to_interrupt();
                state.suspension = Some(suspension);
                Ok(Some(Next::Interrupt(interrupt)))
            }
        }
    }
}

#[async_trait]
impl Node<SessionState> for ActNode {
    fn id(&self) -> &str {
        "act"
    }

    async fn run(&self, state: SessionState) -> Result<(SessionState, Next), AgentError> {
        self.run_with_context(state, &RunContext::default()).await
    }

    async fn run_with_context(
        &self,
        state: SessionState,
        ctx: &RunContext,
    ) -> Result<(SessionState, Next), AgentError> {
        let mut state = state;

        if let Some(suspension) = state.suspension.take() {
            let value = state.resume.take().ok_or_else(|| {
                AgentError::ExecutionFailed(format!(
                    "session {} is suspended on {} but no resume value was supplied",
                    suspension.session_id, suspension.call_id
                ))
            })?;
            let call = state.find_tool_call(&suspension.call_id).ok_or_else(|| {
                AgentError::ExecutionFailed(format!(
                    "suspended tool call {} not found in log",
                    suspension.call_id
                ))
            })?;
            debug!(tool = %call.name, call_id = %call.id, "resuming suspended tool call");
            let resume = ResumeInput {
                payload: suspension.payload,
                value,
            };
            if let Some(next) = self.execute(&mut state, ctx, &call, Some(resume)).await? {
                return Ok((state, next));
            }
            if !state.pending_tool_calls().is_empty() {
                return Ok((state, Next::Node(self.id().to_string())));
            }
            return Ok((state, Next::Continue));
        }
        state.resume = None;

        for call in state.pending_tool_calls() {
            if let Some(next) = self.execute(&mut state, ctx, &call, None).await? {
                return Ok((state, next));
            }
        }
        Ok((state, Next::Continue))
    }
}
