//! SQLite-backed checkpointer (SqliteSaver). Persistent across process restarts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::memory::checkpoint::{
    Checkpoint, CheckpointListItem, CheckpointMetadata, CheckpointSource, CHECKPOINT_VERSION,
};
use crate::memory::checkpointer::{CheckpointError, Checkpointer};
use crate::memory::config::RunnableConfig;
use crate::memory::serializer::Serializer;

fn storage_err(e: impl std::fmt::Display) -> CheckpointError {
    CheckpointError::Storage(e.to_string())
}

fn parse_created_at(s: &str) -> Result<DateTime<Utc>, CheckpointError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CheckpointError::Serialization(format!("created_at: {}", e)))
}

/// SQLite-backed checkpointer. Key: (thread_id, checkpoint_ns, checkpoint_id).
///
/// Rows are ordered by insertion sequence, so the latest write always wins
/// regardless of clock resolution. Uses spawn_blocking for async.
///
/// **Interaction**: Used as `Arc<dyn Checkpointer<S>>` in StateGraph::compile_with_checkpointer.
pub struct SqliteSaver<S> {
    db_path: PathBuf,
    serializer: Arc<dyn Serializer<S>>,
}

impl<S> SqliteSaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Opens (or creates) the database at `path` and ensures the table exists.
    pub fn new(
        path: impl AsRef<Path>,
        serializer: Arc<dyn Serializer<S>>,
    ) -> Result<Self, CheckpointError> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(storage_err)?;
        }
        let conn = rusqlite::Connection::open(&db_path).map_err(storage_err)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                thread_id TEXT NOT NULL,
                checkpoint_ns TEXT NOT NULL,
                checkpoint_id TEXT NOT NULL,
                ts TEXT NOT NULL,
                payload BLOB NOT NULL,
                metadata_source TEXT NOT NULL,
                metadata_step INTEGER NOT NULL,
                metadata_created_at TEXT NOT NULL,
                UNIQUE (thread_id, checkpoint_ns, checkpoint_id)
            );
            CREATE INDEX IF NOT EXISTS idx_checkpoints_thread
                ON checkpoints (thread_id, checkpoint_ns, seq);
            "#,
        )
        .map_err(storage_err)?;
        Ok(Self {
            db_path,
            serializer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn thread_id_required(config: &RunnableConfig) -> Result<String, CheckpointError> {
        config
            .thread_id
            .as_deref()
            .ok_or(CheckpointError::ThreadIdRequired)
            .map(String::from)
    }
}

#[async_trait]
impl<S> Checkpointer<S> for SqliteSaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let checkpoint_ns = config.checkpoint_ns.clone();
        let payload = self.serializer.serialize(&checkpoint.state)?;
        let metadata_source = checkpoint.metadata.source.as_str();
        let metadata_step = checkpoint.metadata.step;
        let metadata_created_at = checkpoint.metadata.created_at.to_rfc3339();
        let id = checkpoint.id.clone();
        let ts = checkpoint.ts.clone();

        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(storage_err)?;
            conn.execute(
                r#"
                INSERT OR REPLACE INTO checkpoints
                (thread_id, checkpoint_ns, checkpoint_id, ts, payload,
                 metadata_source, metadata_step, metadata_created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    thread_id,
                    checkpoint_ns,
                    id,
                    ts,
                    payload,
                    metadata_source,
                    metadata_step,
                    metadata_created_at,
                ],
            )
            .map_err(storage_err)?;
            Ok::<String, CheckpointError>(id)
        })
        .await
        .map_err(storage_err)?
    }

    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<(Checkpoint<S>, CheckpointMetadata)>, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let checkpoint_ns = config.checkpoint_ns.clone();
        let want_id = config.checkpoint_id.clone();
        let db_path = self.db_path.clone();

        type RowData = (String, String, Vec<u8>, String, i64, String);
        let row: Option<RowData> =
            tokio::task::spawn_blocking(move || -> Result<Option<RowData>, CheckpointError> {
                let conn = rusqlite::Connection::open(&db_path).map_err(storage_err)?;
                let sql = if want_id.is_some() {
                    "SELECT checkpoint_id, ts, payload, metadata_source, metadata_step, metadata_created_at
                     FROM checkpoints WHERE thread_id = ?1 AND checkpoint_ns = ?2 AND checkpoint_id = ?3"
                } else {
                    "SELECT checkpoint_id, ts, payload, metadata_source, metadata_step, metadata_created_at
                     FROM checkpoints WHERE thread_id = ?1 AND checkpoint_ns = ?2
                     ORDER BY seq DESC LIMIT 1"
                };
                let mut stmt = conn.prepare(sql).map_err(storage_err)?;
                let mut rows = match &want_id {
                    Some(cid) => stmt.query(params![thread_id, checkpoint_ns, cid]),
                    None => stmt.query(params![thread_id, checkpoint_ns]),
                }
                .map_err(storage_err)?;
                let Some(row) = rows.next().map_err(storage_err)? else {
                    return Ok(None);
                };
                Ok(Some((
                    row.get(0).map_err(storage_err)?,
                    row.get(1).map_err(storage_err)?,
                    row.get(2).map_err(storage_err)?,
                    row.get(3).map_err(storage_err)?,
                    row.get(4).map_err(storage_err)?,
                    row.get(5).map_err(storage_err)?,
                )))
            })
            .await
            .map_err(storage_err)??;

        let Some((checkpoint_id, ts, payload, metadata_source, metadata_step, created_at)) = row
        else {
            return Ok(None);
        };

        let state = self.serializer.deserialize(&payload)?;
        let metadata = CheckpointMetadata {
            source: CheckpointSource::parse(&metadata_source),
            step: metadata_step,
            created_at: parse_created_at(&created_at)?,
        };
        let checkpoint = Checkpoint {
            v: CHECKPOINT_VERSION,
            id: checkpoint_id,
            ts,
            state,
            metadata: metadata.clone(),
        };
        Ok(Some((checkpoint, metadata)))
    }

    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let checkpoint_ns = config.checkpoint_ns.clone();
        let db_path = self.db_path.clone();

        type ListRow = (String, String, i64, String);
        let rows: Vec<ListRow> = tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(storage_err)?;
            let mut stmt = conn
                .prepare(
                    "SELECT checkpoint_id, metadata_source, metadata_step, metadata_created_at
                     FROM checkpoints WHERE thread_id = ?1 AND checkpoint_ns = ?2
                     ORDER BY seq ASC",
                )
                .map_err(storage_err)?;
            let rows = stmt
                .query_map(params![thread_id, checkpoint_ns], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })
                .map_err(storage_err)?;
            let list = rows.collect::<Result<Vec<_>, _>>().map_err(storage_err)?;
            Ok::<Vec<ListRow>, CheckpointError>(list)
        })
        .await
        .map_err(storage_err)??;

        let skip = limit.map_or(0, |n| rows.len().saturating_sub(n));
        rows.into_iter()
            .skip(skip)
            .map(|(checkpoint_id, source, step, created_at)| {
                Ok(CheckpointListItem {
                    checkpoint_id,
                    metadata: CheckpointMetadata {
                        source: CheckpointSource::parse(&source),
                        step,
                        created_at: parse_created_at(&created_at)?,
                    },
                })
            })
            .collect()
    }

    async fn delete_thread(&self, config: &RunnableConfig) -> Result<(), CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let checkpoint_ns = config.checkpoint_ns.clone();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(storage_err)?;
            conn.execute(
                "DELETE FROM checkpoints WHERE thread_id = ?1 AND checkpoint_ns = ?2",
                params![thread_id, checkpoint_ns],
            )
            .map_err(storage_err)?;
            Ok::<(), CheckpointError>(())
        })
        .await
        .map_err(storage_err)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::JsonSerializer;
    use crate::message::Message;
    use crate::state::SessionState;

    fn saver(dir: &tempfile::TempDir) -> SqliteSaver<SessionState> {
        SqliteSaver::new(dir.path().join("checkpoints.db"), Arc::new(JsonSerializer)).unwrap()
    }

    fn state(text: &str) -> SessionState {
        let mut s = SessionState::new();
        s.push(Message::user(text));
        s
    }

    /// **Scenario**: put then get_tuple returns the same state and metadata.
    #[tokio::test]
    async fn put_and_get_tuple_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let saver = saver(&dir);
        let cfg = RunnableConfig::for_thread("s1");
        let cp = Checkpoint::from_state(state("hello"), CheckpointSource::Interrupt, 3);
        let id = saver.put(&cfg, &cp).await.unwrap();
        assert_eq!(id, cp.id);

        let (loaded, metadata) = saver.get_tuple(&cfg).await.unwrap().unwrap();
        assert_eq!(loaded.state, cp.state);
        assert_eq!(loaded.id, cp.id);
        assert_eq!(metadata.source, CheckpointSource::Interrupt);
        assert_eq!(metadata.step, 3);
    }

    /// **Scenario**: The latest write wins even when written within the same millisecond.
    #[tokio::test]
    async fn latest_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let saver = saver(&dir);
        for text in ["one", "two", "three"] {
            saver.save("s1", &state(text)).await.unwrap();
        }
        let loaded = saver.load("s1").await.unwrap();
        assert_eq!(loaded.messages[0].content(), "three");
        assert_eq!(saver.list(&RunnableConfig::for_thread("s1"), Some(2)).await.unwrap().len(), 2);
    }

    /// **Scenario**: A second saver on the same file sees state written by the first.
    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        saver(&dir).save("s1", &state("persisted")).await.unwrap();
        let reopened = saver(&dir);
        let loaded = reopened.load("s1").await.unwrap();
        assert_eq!(loaded.messages[0].content(), "persisted");
    }

    /// **Scenario**: delete_thread removes only that thread; missing threads load as NotFound.
    #[tokio::test]
    async fn delete_thread_removes_only_that_thread() {
        let dir = tempfile::tempdir().unwrap();
        let saver = saver(&dir);
        saver.save("a", &state("a")).await.unwrap();
        saver.save("b", &state("b")).await.unwrap();
        saver
            .delete_thread(&RunnableConfig::for_thread("a"))
            .await
            .unwrap();
        assert!(matches!(saver.load("a").await, Err(CheckpointError::NotFound(_))));
        assert!(saver.load("b").await.is_ok());
    }

    /// **Scenario**: Operations without thread_id fail with ThreadIdRequired.
    #[tokio::test]
    async fn missing_thread_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let saver = saver(&dir);
        let err = saver.get_tuple(&RunnableConfig::default()).await.unwrap_err();
        assert!(matches!(err, CheckpointError::ThreadIdRequired));
    }
}
