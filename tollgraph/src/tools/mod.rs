//! Tools: registry, argument schemas and the executor that runs tool calls.
//!
//! A tool is a named, described, schema-typed function the model can ask to
//! call. Tools that need an external value (human approval) return
//! [`ToolOutcome::Suspend`] and are called again with the resume value.

mod executor;
mod fn_tool;
mod registry;
mod schema;
mod r#trait;

pub use executor::{
    ErrorHandlerFn, ExecOutcome, HandleToolErrors, ResumeInput, ToolExecutor,
    DEFAULT_EXECUTION_ERROR_TEMPLATE, DEFAULT_TOOL_ERROR_TEMPLATE,
};
pub use fn_tool::{FnTool, ToolFn};
pub use r#trait::{Tool, ToolInvocation, ToolOutcome, ToolSpec};
pub use registry::ToolRegistry;
pub use schema::{ArgField, ArgSchema, ArgType};

use thiserror::Error;

/// Tool-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// The model asked for a tool that is not registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// Arguments did not parse or did not match the tool's schema.
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
    /// The tool ran and failed.
    #[error("{0}")]
    Failed(String),
    /// The tool suspended without being registered as `may_suspend`.
    #[error("tool {0} tried to suspend but is not allowed to")]
    UnexpectedSuspend(String),
}

impl ToolError {
    /// Whether the model produced a call that could not be dispatched.
    pub fn is_invalid_call(&self) -> bool {
        matches!(
            self,
            ToolError::UnknownTool(_) | ToolError::InvalidArguments { .. }
        )
    }
}
