//! Graph compilation error.

use thiserror::Error;

/// Error when compiling a state graph.
///
/// Returned by `StateGraph::compile()`. Every id in edges (except START/END)
/// must exist and routing must be unambiguous.
#[derive(Debug, Error)]
pub enum CompilationError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("graph must have exactly one edge from START")]
    MissingStart,

    #[error("graph has no path to END")]
    MissingEnd,

    /// Branches from a plain edge, or a cycle with no conditional exit.
    #[error("invalid edges: {0}")]
    InvalidChain(String),

    #[error("node has both edge and conditional edges: {0}")]
    NodeHasBothEdgeAndConditional(String),

    #[error("conditional path_map invalid target: {0}")]
    InvalidConditionalPathMap(String),
}
