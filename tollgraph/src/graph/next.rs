//! Next-step result from a graph node: continue, jump, end, or pause.

use super::Interrupt;

/// Next step after running a node.
///
/// - **Continue**: follow the node's outgoing edge.
/// - **Node(id)**: jump to the given node.
/// - **End**: stop; return current state as final result.
/// - **Interrupt**: persist the returned state and stop with `AgentError::Interrupted`.
///
/// **Interaction**: Returned by `Node::run`; consumed by `CompiledStateGraph::invoke`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Next {
    Continue,
    Node(String),
    End,
    Interrupt(Interrupt),
}
