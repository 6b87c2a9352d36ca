//! Graph node trait: one step in a StateGraph.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::AgentError;

use super::{Next, RunContext};

/// One step in a graph: state in, (state out, next step).
///
/// The runner uses `Next` to choose the next node unless the node has
/// conditional edges, in which case the router decides. `Next::Interrupt`
/// always wins: the returned state is checkpointed and the run stops.
#[async_trait]
pub trait Node<S>: Send + Sync
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Node id (e.g. `"think"`, `"act"`). Must be unique within a graph.
    fn id(&self) -> &str;

    async fn run(&self, state: S) -> Result<(S, Next), AgentError>;

    /// Variant with run context (thread id, config).
    ///
    /// Default implementation calls `run` and ignores the context.
    async fn run_with_context(&self, state: S, _ctx: &RunContext) -> Result<(S, Next), AgentError> {
        self.run(state).await
    }
}
