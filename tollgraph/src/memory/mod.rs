//! Checkpoint persistence: save and load session state by thread id.
//!
//! - [`Checkpointer`]: async trait (put / get_tuple / list / delete_thread, plus `save` / `load`).
//! - [`MemorySaver`]: in-process store for tests and single-process runs.
//! - [`SqliteSaver`]: durable store; a paused session can be resumed by another process.

mod checkpoint;
mod checkpointer;
mod config;
mod memory_saver;
mod serializer;
mod sqlite_saver;

pub use checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata, CheckpointSource, CHECKPOINT_VERSION};
pub use checkpointer::{CheckpointError, Checkpointer};
pub use config::RunnableConfig;
pub use memory_saver::MemorySaver;
pub use serializer::{JsonSerializer, Serializer};
pub use sqlite_saver::SqliteSaver;
