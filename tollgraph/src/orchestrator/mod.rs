//! Orchestrator: drives one session step by step through the think/act graph.
//!
//! `step(session_id, input)` loads the session's checkpoint (or starts a new
//! session), applies the input, and runs the compiled graph until the model
//! gives a final answer or a tool suspends. Either outcome is checkpointed by
//! the graph before `step` returns. Tool results are also checkpointed as soon
//! as `act` finishes, so a step that fails afterwards never runs them twice.
//!
//! ```text
//! START → think ─(tool calls pending)→ act → think …
//!              └─(none)→ END
//! resume: → act → think …
//! ```

mod error;

pub use error::{BuildError, StepError};

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::agent::{tools_condition, ActNode, ThinkNode};
use crate::error::AgentError;
use crate::graph::{CompiledStateGraph, GraphInterrupt, RetryPolicy, StateGraph, END, START};
use crate::llm::LlmClient;
use crate::memory::{
    CheckpointError, CheckpointListItem, Checkpointer, MemorySaver, RunnableConfig,
};
use crate::message::Message;
use crate::state::{ResumeValue, SessionState, StepOrigin, Suspension};
use crate::tools::{HandleToolErrors, ToolExecutor, ToolRegistry};

/// Input to one step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepInput {
    /// A new user message.
    Message(String),
    /// The value answering the session's pending suspension.
    Resume(ResumeValue),
}

impl From<&str> for StepInput {
    fn from(text: &str) -> Self {
        StepInput::Message(text.to_string())
    }
}

impl From<String> for StepInput {
    fn from(text: String) -> Self {
        StepInput::Message(text)
    }
}

impl From<ResumeValue> for StepInput {
    fn from(resume: ResumeValue) -> Self {
        StepInput::Resume(resume)
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepResult {
    /// The model answered without requesting more tools.
    Final { content: String },
    /// A tool is waiting for an external value; answer with `StepInput::Resume` and `token`.
    Paused { prompt: String, token: String },
}

impl StepResult {
    pub fn is_final(&self) -> bool {
        matches!(self, StepResult::Final { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, StepResult::Paused { .. })
    }
}

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    llm: Option<Arc<dyn LlmClient>>,
    registry: Arc<ToolRegistry>,
    checkpointer: Option<Arc<dyn Checkpointer<SessionState>>>,
    recursion_limit: Option<usize>,
    retry_policy: RetryPolicy,
    handle_tool_errors: HandleToolErrors,
    system_prompt: Option<String>,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self {
            llm: None,
            registry: Arc::new(ToolRegistry::new()),
            checkpointer: None,
            recursion_limit: None,
            retry_policy: RetryPolicy::None,
            handle_tool_errors: HandleToolErrors::default(),
            system_prompt: None,
        }
    }
}

impl OrchestratorBuilder {
    pub fn llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Checkpoint store. Defaults to an in-memory `MemorySaver`.
    pub fn checkpointer(mut self, checkpointer: Arc<dyn Checkpointer<SessionState>>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Node executions allowed per step.
    pub fn recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = Some(limit);
        self
    }

    /// Retry policy for transient gateway failures.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn handle_tool_errors(mut self, policy: HandleToolErrors) -> Self {
        self.handle_tool_errors = policy;
        self
    }

    /// System message placed first in every new session.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn build(self) -> Result<Orchestrator, BuildError> {
        let llm = self.llm.ok_or(BuildError::MissingLlm)?;
        let checkpointer = self
            .checkpointer
            .unwrap_or_else(|| Arc::new(MemorySaver::<SessionState>::new()));

        let think = ThinkNode::new(llm, self.registry.clone());
        let act = ActNode::new(
            ToolExecutor::new(self.registry).with_handle_tool_errors(self.handle_tool_errors),
        );

        let mut graph = StateGraph::<SessionState>::new().with_retry_policy(self.retry_policy);
        if let Some(limit) = self.recursion_limit {
            graph = graph.with_recursion_limit(limit);
        }
        graph
            .add_node("think", Arc::new(think))
            .add_node("act", Arc::new(act))
            .add_edge(START, "think")
            .add_conditional_edges(
                "think",
                Arc::new(|s: &SessionState| tools_condition(s).as_str().to_string()),
                Some(HashMap::from([
                    ("tools".to_string(), "act".to_string()),
                    (END.to_string(), END.to_string()),
                ])),
            )
            .add_edge("act", "think")
            .checkpoint_after("act");
        let graph = graph.compile_with_checkpointer(checkpointer.clone())?;

        Ok(Orchestrator {
            graph,
            checkpointer,
            locks: DashMap::new(),
            system_prompt: self.system_prompt,
        })
    }
}

/// Runs sessions of the think/act loop with suspend/resume.
///
/// Steps on the same session id are serialized by a per-session async lock;
/// different sessions run concurrently.
///
/// **Interaction**: Owns the compiled graph and shares the checkpointer with it.
pub struct Orchestrator {
    graph: CompiledStateGraph<SessionState>,
    checkpointer: Arc<dyn Checkpointer<SessionState>>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    system_prompt: Option<String>,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Drops the session's lock entry unless another call still holds it.
    fn release_lock(&self, session_id: &str, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.locks
            .remove_if(session_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn load_existing(&self, session_id: &str) -> Result<Option<SessionState>, StepError> {
        match self.checkpointer.load(session_id).await {
            Ok(state) => Ok(Some(state)),
            Err(CheckpointError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Advances `session_id` by one input.
    ///
    /// Returns `Final` when the model answers, `Paused` when a tool waits for a
    /// resume value. A failed step keeps every tool result it produced; sending
    /// the same input again continues from there without re-running those tools.
    pub async fn step(
        &self,
        session_id: &str,
        input: impl Into<StepInput>,
    ) -> Result<StepResult, StepError> {
        let lock = self.session_lock(session_id);
        let result = {
            let _guard = lock.lock().await;
            self.step_locked(session_id, input.into()).await
        };
        self.release_lock(session_id, lock);
        result
    }

    async fn step_locked(
        &self,
        session_id: &str,
        input: StepInput,
    ) -> Result<StepResult, StepError> {
        let existing = self.load_existing(session_id).await?;
        let (state, config) = match input {
            StepInput::Message(text) => {
                let mut state = existing.unwrap_or_default();
                if let Some(suspension) = &state.suspension {
                    return Err(StepError::SuspensionPending {
                        session_id: session_id.to_string(),
                        token: suspension.token.clone(),
                    });
                }
                let origin = StepOrigin::Message {
                    content: text.clone(),
                };
                match state.unfinished_at() {
                    Some(node) if state.origin.as_ref() == Some(&origin) => {
                        tracing::info!(session_id, node, "step: continuing unfinished step");
                        (state, RunnableConfig::for_thread(session_id).resume_at(node))
                    }
                    Some("act") => {
                        return Err(StepError::UnfinishedStep(session_id.to_string()));
                    }
                    _ => {
                        if state.messages.is_empty() {
                            if let Some(prompt) = &self.system_prompt {
                                state.push(Message::system(prompt.clone()));
                            }
                        }
                        state.push(Message::user(text));
                        state.origin = Some(origin);
                        tracing::info!(session_id, turn = state.turn_count, "step: user message");
                        (state, RunnableConfig::for_thread(session_id))
                    }
                }
            }
            StepInput::Resume(resume) => {
                let mut state =
                    existing.ok_or_else(|| StepError::UnknownSession(session_id.to_string()))?;
                let origin = StepOrigin::Resume {
                    token: resume.token.clone(),
                };
                let Some(suspension) = state.suspension.clone() else {
                    return match state.unfinished_at() {
                        Some(node) if state.origin.as_ref() == Some(&origin) => {
                            tracing::info!(session_id, node, "step: continuing unfinished resume");
                            let config = RunnableConfig::for_thread(session_id).resume_at(node);
                            self.run_graph(session_id, state, config).await
                        }
                        _ => Err(StepError::NoPendingSuspension(session_id.to_string())),
                    };
                };
                if suspension.token != resume.token {
                    return Err(StepError::StaleResumeToken {
                        session_id: session_id.to_string(),
                    });
                }
                tracing::info!(
                    session_id,
                    tool = %suspension.tool_name,
                    call_id = %suspension.call_id,
                    "step: resume"
                );
                state.resume = Some(resume.value);
                state.origin = Some(origin);
                (
                    state,
                    RunnableConfig::for_thread(session_id).resume_at("act"),
                )
            }
        };
        self.run_graph(session_id, state, config).await
    }

    async fn run_graph(
        &self,
        session_id: &str,
        state: SessionState,
        config: RunnableConfig,
    ) -> Result<StepResult, StepError> {
        match self.graph.invoke(state, Some(config)).await {
            Ok(final_state) => Ok(StepResult::Final {
                content: final_state
                    .last_assistant_content()
                    .unwrap_or_default()
                    .to_string(),
            }),
            Err(AgentError::Interrupted(GraphInterrupt(interrupt))) => Ok(StepResult::Paused {
                prompt: interrupt.prompt().unwrap_or_default().to_string(),
                token: interrupt.id.unwrap_or_default(),
            }),
            Err(e) => {
                tracing::warn!(session_id, error = %e, "step failed");
                Err(e.into())
            }
        }
    }

    /// Current state of a session.
    pub async fn session(&self, session_id: &str) -> Result<SessionState, StepError> {
        self.load_existing(session_id)
            .await?
            .ok_or_else(|| StepError::UnknownSession(session_id.to_string()))
    }

    /// The session's active suspension, if it is paused.
    pub async fn pending(&self, session_id: &str) -> Result<Option<Suspension>, StepError> {
        Ok(self.session(session_id).await?.suspension)
    }

    /// Checkpoints written for a session, oldest first; `limit` keeps the newest `n`.
    pub async fn history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointListItem>, StepError> {
        Ok(self
            .checkpointer
            .list(&RunnableConfig::for_thread(session_id), limit)
            .await?)
    }

    /// Deletes a session. Clearing an unknown session is not an error.
    pub async fn clear(&self, session_id: &str) -> Result<(), StepError> {
        let lock = self.session_lock(session_id);
        let result = {
            let _guard = lock.lock().await;
            self.checkpointer
                .delete_thread(&RunnableConfig::for_thread(session_id))
                .await
        };
        self.release_lock(session_id, lock);
        result?;
        tracing::info!(session_id, "session cleared");
        Ok(())
    }

    pub fn recursion_limit(&self) -> usize {
        self.graph.recursion_limit()
    }
}
