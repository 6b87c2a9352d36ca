//! Logging helpers for graph execution.

/// Log node execution start.
pub fn log_node_start(node_id: &str, step: usize) {
    tracing::debug!(node_id = node_id, step, "Starting node execution");
}

/// Log node execution completion.
pub fn log_node_complete(node_id: &str, next: &crate::graph::Next) {
    tracing::debug!(node_id = node_id, ?next, "Node execution complete");
}

pub fn log_graph_start(thread_id: Option<&str>, entry: &str) {
    tracing::info!(thread_id = thread_id.unwrap_or("-"), entry, "Starting graph execution");
}

pub fn log_graph_complete(thread_id: Option<&str>, steps: usize) {
    tracing::info!(thread_id = thread_id.unwrap_or("-"), steps, "Graph execution complete");
}

/// Log a pause; not an error from the graph's point of view.
pub fn log_graph_interrupted(thread_id: Option<&str>, node_id: &str) {
    tracing::info!(
        thread_id = thread_id.unwrap_or("-"),
        node_id,
        "Graph execution interrupted"
    );
}

pub fn log_graph_error(error: &crate::error::AgentError) {
    tracing::error!(?error, "Graph execution error");
}
