//! Checkpoint and metadata types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current version of the checkpoint format.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Why a checkpoint was written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointSource {
    /// End of a graph run.
    #[default]
    Loop,
    /// A node paused the run.
    Interrupt,
    /// Written directly through `Checkpointer::save`.
    Update,
}

impl CheckpointSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointSource::Loop => "loop",
            CheckpointSource::Interrupt => "interrupt",
            CheckpointSource::Update => "update",
        }
    }

    /// Parses the stored form; unknown values read as `Update`.
    pub fn parse(s: &str) -> Self {
        match s {
            "loop" => CheckpointSource::Loop,
            "interrupt" => CheckpointSource::Interrupt,
            _ => CheckpointSource::Update,
        }
    }
}

/// Metadata for a single checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub source: CheckpointSource,
    /// Node executions in the run that produced this checkpoint.
    pub step: i64,
    pub created_at: DateTime<Utc>,
}

/// One saved state with its id and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint<S> {
    pub v: u32,
    pub id: String,
    /// RFC 3339 timestamp.
    pub ts: String,
    pub state: S,
    pub metadata: CheckpointMetadata,
}

impl<S> Checkpoint<S> {
    /// New checkpoint with a fresh id and the current time.
    pub fn from_state(state: S, source: CheckpointSource, step: i64) -> Self {
        let now = Utc::now();
        Self {
            v: CHECKPOINT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            ts: now.to_rfc3339(),
            state,
            metadata: CheckpointMetadata {
                source,
                step,
                created_at: now,
            },
        }
    }
}

/// Entry returned by `Checkpointer::list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointListItem {
    pub checkpoint_id: String,
    pub metadata: CheckpointMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Checkpoints built from state have unique ids and carry source and step.
    #[test]
    fn checkpoint_from_state_unique_ids() {
        let a: Checkpoint<i32> = Checkpoint::from_state(1, CheckpointSource::Loop, 2);
        let b: Checkpoint<i32> = Checkpoint::from_state(1, CheckpointSource::Interrupt, 3);
        assert_ne!(a.id, b.id);
        assert_eq!(a.v, CHECKPOINT_VERSION);
        assert_eq!(a.metadata.step, 2);
        assert_eq!(b.metadata.source, CheckpointSource::Interrupt);
        assert!(DateTime::parse_from_rfc3339(&a.ts).is_ok());
    }

    /// **Scenario**: Source round-trips through its stored string form.
    #[test]
    fn checkpoint_source_str_roundtrip() {
        for s in [
            CheckpointSource::Loop,
            CheckpointSource::Interrupt,
            CheckpointSource::Update,
        ] {
            assert_eq!(CheckpointSource::parse(s.as_str()), s);
        }
        assert_eq!(CheckpointSource::parse("bogus"), CheckpointSource::Update);
    }
}
