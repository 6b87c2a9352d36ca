//! State graph: nodes + edges (plain and conditional), compile and invoke.
//!
//! The orchestrator builds a two-node graph (`think`, `act`) on top of this;
//! the engine itself is generic over the state type.

mod compile_error;
mod compiled;
mod conditional;
mod interrupt;
mod logging;
mod next;
mod node;
mod retry;
mod run_context;
mod state_graph;

pub use compile_error::CompilationError;
pub use compiled::{CompiledStateGraph, DEFAULT_RECURSION_LIMIT};
pub use conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry};
pub use interrupt::{GraphInterrupt, Interrupt};
pub use logging::{
    log_graph_complete, log_graph_error, log_graph_interrupted, log_graph_start,
    log_node_complete, log_node_start,
};
pub use next::Next;
pub use node::Node;
pub use retry::RetryPolicy;
pub use run_context::RunContext;
pub use state_graph::{StateGraph, END, START};
