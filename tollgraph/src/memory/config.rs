//! Invoke config: thread id, checkpoint selection, resume entry point.

/// Config for a single invoke. Identifies the thread and optional checkpoint.
///
/// **Interaction**: Passed to `CompiledStateGraph::invoke(state, config)` and
/// `Checkpointer::put` / `get_tuple` / `list`. The orchestrator uses the
/// session id as `thread_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnableConfig {
    /// Conversation / session id. Required when using a checkpointer.
    pub thread_id: Option<String>,
    /// If set, `get_tuple` loads this checkpoint instead of the latest.
    pub checkpoint_id: Option<String>,
    /// Optional namespace for checkpoints. Default is empty.
    pub checkpoint_ns: String,
    /// When set, the graph starts from this node instead of the first (resume at `act`).
    pub resume_from_node_id: Option<String>,
}

impl RunnableConfig {
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Default::default()
        }
    }

    /// Same thread, entering the graph at `node_id`.
    pub fn resume_at(mut self, node_id: impl Into<String>) -> Self {
        self.resume_from_node_id = Some(node_id.into());
        self
    }
}
