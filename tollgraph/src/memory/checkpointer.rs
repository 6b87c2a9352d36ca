//! Checkpointer trait and CheckpointError.
//!
//! Saves and loads checkpoints by (thread_id, checkpoint_ns). Latest write wins.

use async_trait::async_trait;

use crate::memory::checkpoint::{
    Checkpoint, CheckpointListItem, CheckpointMetadata, CheckpointSource,
};
use crate::memory::config::RunnableConfig;

/// Error type for checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("thread_id required")]
    ThreadIdRequired,
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("not found: {0}")]
    NotFound(String),
}

/// Saves and loads checkpoints by thread.
///
/// Implementations must allow concurrent access to distinct threads without
/// interference. `save` / `load` are the session-level view: store a state
/// under a session id, and read back the latest one (or `NotFound`).
///
/// **Interaction**: Injected via `StateGraph::compile_with_checkpointer`;
/// `CompiledStateGraph::invoke` writes through it when `config.thread_id` is set.
#[async_trait]
pub trait Checkpointer<S>: Send + Sync
where
    S: Clone + Send + Sync + 'static,
{
    /// Persist a checkpoint. Returns the checkpoint id used.
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError>;

    /// Load the latest checkpoint for the thread (or the one named by `config.checkpoint_id`).
    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<(Checkpoint<S>, CheckpointMetadata)>, CheckpointError>;

    /// Checkpoints for the thread, oldest first; `limit` keeps the newest `n`.
    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError>;

    /// Removes every checkpoint of the thread. Missing threads are not an error.
    async fn delete_thread(&self, config: &RunnableConfig) -> Result<(), CheckpointError>;

    /// Stores `state` as the latest checkpoint of `session_id`.
    async fn save(&self, session_id: &str, state: &S) -> Result<String, CheckpointError> {
        let checkpoint = Checkpoint::from_state(state.clone(), CheckpointSource::Update, 0);
        self.put(&RunnableConfig::for_thread(session_id), &checkpoint)
            .await
    }

    /// Latest state of `session_id`, or `CheckpointError::NotFound`.
    async fn load(&self, session_id: &str) -> Result<S, CheckpointError> {
        self.get_tuple(&RunnableConfig::for_thread(session_id))
            .await?
            .map(|(checkpoint, _)| checkpoint.state)
            .ok_or_else(|| CheckpointError::NotFound(session_id.to_string()))
    }
}
