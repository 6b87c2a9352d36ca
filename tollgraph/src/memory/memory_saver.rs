//! In-memory checkpointer (MemorySaver). Not persistent; for dev and tests.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::memory::checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata};
use crate::memory::checkpointer::{CheckpointError, Checkpointer};
use crate::memory::config::RunnableConfig;

/// In-memory checkpointer. Key: (thread_id, checkpoint_ns); each thread has a list of checkpoints.
///
/// Threads live in separate map shards, so sessions do not contend with each other.
///
/// **Interaction**: Used as `Arc<dyn Checkpointer<S>>` in StateGraph::compile_with_checkpointer.
pub struct MemorySaver<S> {
    /// Key: `"{thread_id}:{checkpoint_ns}"`. Value: checkpoints, newest last.
    by_thread: DashMap<String, Vec<Checkpoint<S>>>,
}

impl<S> MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            by_thread: DashMap::new(),
        }
    }

    /// True when no checkpoint has been stored for any thread.
    pub fn is_empty(&self) -> bool {
        self.by_thread.iter().all(|entry| entry.value().is_empty())
    }

    fn thread_key(config: &RunnableConfig) -> Result<String, CheckpointError> {
        let thread_id = config
            .thread_id
            .as_deref()
            .ok_or(CheckpointError::ThreadIdRequired)?;
        Ok(format!("{}:{}", thread_id, config.checkpoint_ns))
    }
}

impl<S> Default for MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S> Checkpointer<S> for MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError> {
        let key = Self::thread_key(config)?;
        self.by_thread
            .entry(key)
            .or_default()
            .push(checkpoint.clone());
        Ok(checkpoint.id.clone())
    }

    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<(Checkpoint<S>, CheckpointMetadata)>, CheckpointError> {
        let key = Self::thread_key(config)?;
        let Some(list) = self.by_thread.get(&key) else {
            return Ok(None);
        };
        let found = match &config.checkpoint_id {
            Some(cid) => list.iter().find(|cp| &cp.id == cid),
            None => list.last(),
        };
        let result = found.map(|cp| (cp.clone(), cp.metadata.clone()));
        Ok(result)
    }

    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let key = Self::thread_key(config)?;
        let Some(list) = self.by_thread.get(&key) else {
            return Ok(Vec::new());
        };
        let skip = limit.map_or(0, |n| list.len().saturating_sub(n));
        let items = list
            .iter()
            .skip(skip)
            .map(|cp| CheckpointListItem {
                checkpoint_id: cp.id.clone(),
                metadata: cp.metadata.clone(),
            })
            .collect();
        Ok(items)
    }

    async fn delete_thread(&self, config: &RunnableConfig) -> Result<(), CheckpointError> {
        let key = Self::thread_key(config)?;
        self.by_thread.remove(&key);
        Ok(())
    }
}
