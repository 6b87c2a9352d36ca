//! # Tollgraph
//!
//! An orchestration core that wires a hosted chat model to tools, with
//! suspend/resume at human-approval checkpoints. One explicit state value,
//! [`SessionState`], flows through a two-node graph and is checkpointed after
//! every completed or paused step, so a paused session can be resumed later
//! (from another process, with the SQLite store) using only its checkpoint.
//!
//! ## Main modules
//!
//! - [`orchestrator`]: [`Orchestrator::step`] with [`StepInput`] / [`StepResult`]; session inspection and clearing.
//! - [`agent`]: [`ThinkNode`], [`ActNode`], [`tools_condition`].
//! - [`graph`]: [`StateGraph`], [`CompiledStateGraph`], [`Node`], [`Next`], [`RetryPolicy`].
//! - [`tools`]: [`ToolRegistry`], [`Tool`], [`ArgSchema`], [`ToolExecutor`].
//! - [`llm`]: [`LlmClient`] trait, [`MockLlm`], [`ChatOpenAI`] (OpenAI or Azure OpenAI).
//! - [`memory`]: [`Checkpointer`], [`MemorySaver`], [`SqliteSaver`].
//! - [`message`] and [`state`]: the message log and session state.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use tollgraph::{
//!     ArgSchema, ArgType, LlmResponse, MockLlm, Orchestrator, ResumeValue, StepResult, ToolCall,
//!     ToolOutcome, ToolRegistry,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = ToolRegistry::new();
//! registry.register_fn(
//!     "delete_file",
//!     "Delete a file after confirmation",
//!     ArgSchema::new().required("path", ArgType::String, "File to delete"),
//!     true,
//!     |inv| match inv.resume_value() {
//!         None => Ok(ToolOutcome::suspend(format!("Delete {}?", inv.arg_str("path")?), json!(null))),
//!         Some(v) if v == "yes" => Ok(ToolOutcome::text("deleted")),
//!         Some(_) => Ok(ToolOutcome::text("kept")),
//!     },
//! );
//! let llm = MockLlm::scripted([
//!     LlmResponse::with_tool_calls("", vec![ToolCall::new("c1", "delete_file", r#"{"path":"a.txt"}"#)]),
//!     LlmResponse::text("Done."),
//! ]);
//! let orchestrator = Orchestrator::builder()
//!     .llm(Arc::new(llm))
//!     .registry(registry)
//!     .build()?;
//!
//! if let StepResult::Paused { prompt, token } = orchestrator.step("s1", "remove a.txt").await? {
//!     println!("{prompt}");
//!     let done = orchestrator.step("s1", ResumeValue::new(token, "yes")).await?;
//!     println!("{done:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod error;
pub mod graph;
pub mod llm;
pub mod memory;
pub mod message;
pub mod orchestrator;
pub mod state;
pub mod tools;

pub use agent::{tools_condition, ActNode, ThinkNode, ToolsConditionResult};
pub use error::AgentError;
pub use graph::{
    CompilationError, CompiledStateGraph, GraphInterrupt, Interrupt, Next, Node, RetryPolicy,
    RunContext, StateGraph, DEFAULT_RECURSION_LIMIT, END, START,
};
pub use llm::{ChatOpenAI, GatewayError, LlmClient, LlmResponse, LlmUsage, MockLlm};
pub use memory::{
    Checkpoint, CheckpointError, CheckpointListItem, CheckpointMetadata, CheckpointSource,
    Checkpointer, JsonSerializer, MemorySaver, RunnableConfig, Serializer, SqliteSaver,
};
pub use message::{Message, ToolCall};
pub use orchestrator::{
    BuildError, Orchestrator, OrchestratorBuilder, StepError, StepInput, StepResult,
};
pub use state::{ResumeValue, SessionState, StepOrigin, Suspension};
pub use tools::{
    ArgSchema, ArgType, ExecOutcome, HandleToolErrors, Tool, ToolError, ToolExecutor,
    ToolInvocation, ToolOutcome, ToolRegistry, ToolSpec,
};
