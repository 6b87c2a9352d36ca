//! Per-invoke context handed to nodes.

use crate::memory::RunnableConfig;

/// Context for one `invoke`: the config the caller passed (thread id, resume node).
///
/// **Interaction**: Built by `CompiledStateGraph::invoke`; read by `Node::run_with_context`
/// (e.g. `ActNode` takes the session id from `config.thread_id`).
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub config: RunnableConfig,
}

impl RunContext {
    pub fn new(config: RunnableConfig) -> Self {
        Self { config }
    }

    /// Thread (session) id of this run, or an empty string when running without one.
    pub fn thread_id(&self) -> &str {
        self.config.thread_id.as_deref().unwrap_or_default()
    }
}
