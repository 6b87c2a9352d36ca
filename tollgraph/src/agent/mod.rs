//! Agent nodes: the think/act loop the orchestrator compiles into a graph.
//!
//! - **[`ThinkNode`]**: calls the model gateway with the log and the tool specs.
//! - **[`ActNode`]**: runs pending tool calls, resuming a suspended one first.
//! - **[`tools_condition`]**: routes `think` to `act` while calls are pending.

mod act_node;
mod think_node;

pub use act_node::ActNode;
pub use think_node::ThinkNode;

use crate::state::SessionState;

/// Output of the tools_condition function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolsConditionResult {
    /// Route to the tools execution node.
    Tools,
    /// Route to the end node ("__end__").
    End,
}

impl ToolsConditionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tools => "tools",
            Self::End => "__end__",
        }
    }
}

/// Conditional routing: if the last assistant message has unanswered tool calls, route to act; else end.
pub fn tools_condition(state: &SessionState) -> ToolsConditionResult {
    if state.pending_tool_calls().is_empty() {
        ToolsConditionResult::End
    } else {
        ToolsConditionResult::Tools
    }
}
