//! State graph: nodes + explicit edges (from → to) and optional conditional edges.
//!
//! Add nodes with `add_node`, define the flow with `add_edge(from, to)` using
//! `START` and `END` for entry/exit, and route by state with
//! `add_conditional_edges`. Then `compile` or `compile_with_checkpointer`.
//!
//! A node must have either one outgoing `add_edge` or `add_conditional_edges`,
//! not both. Cycles are allowed only through a conditional edge (the
//! `think → act → think` loop exits when the router returns END).

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use crate::graph::compile_error::CompilationError;
use crate::graph::compiled::{CompiledStateGraph, DEFAULT_RECURSION_LIMIT};
use crate::graph::conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry};
use crate::graph::node::Node;
use crate::graph::retry::RetryPolicy;
use crate::memory::Checkpointer;

/// Sentinel for graph entry: use as `from_id` in `add_edge(START, first_node_id)`.
pub const START: &str = "__start__";

/// Sentinel for graph exit: use as `to_id` in `add_edge(last_node_id, END)`.
pub const END: &str = "__end__";

/// State graph builder, generic over state type `S`.
///
/// **Interaction**: Accepts `Arc<dyn Node<S>>`; produces `CompiledStateGraph<S>`.
pub struct StateGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    edges: Vec<(String, String)>,
    conditional_edges: HashMap<String, ConditionalRouter<S>>,
    checkpoint_after: HashSet<String>,
    retry_policy: RetryPolicy,
    recursion_limit: usize,
}

impl<S> Default for StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
            conditional_edges: HashMap::new(),
            checkpoint_after: HashSet::new(),
            retry_policy: RetryPolicy::None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Retry policy applied to retryable node failures. Default is `RetryPolicy::None`.
    pub fn with_retry_policy(self, retry_policy: RetryPolicy) -> Self {
        Self {
            retry_policy,
            ..self
        }
    }

    /// Maximum node executions per invoke before `AgentError::RecursionLimit`.
    pub fn with_recursion_limit(self, recursion_limit: usize) -> Self {
        Self {
            recursion_limit,
            ..self
        }
    }

    /// Also checkpoints after `node_id` completes mid-run, not only at END or
    /// on interrupt. A later failure in the same run then leaves that state as
    /// the latest checkpoint.
    pub fn checkpoint_after(&mut self, node_id: impl Into<String>) -> &mut Self {
        self.checkpoint_after.insert(node_id.into());
        self
    }

    /// Adds a node; replaces an existing node with the same id.
    pub fn add_node(&mut self, id: impl Into<String>, node: Arc<dyn Node<S>>) -> &mut Self {
        self.nodes.insert(id.into(), node);
        self
    }

    /// Adds an edge from `from_id` to `to_id`. Use `START` / `END` for entry / exit.
    pub fn add_edge(&mut self, from_id: impl Into<String>, to_id: impl Into<String>) -> &mut Self {
        self.edges.push((from_id.into(), to_id.into()));
        self
    }

    /// Adds conditional edges from `source`: after it runs, `path(state)` picks the next node.
    ///
    /// With `path_map`, the returned key is translated through the map (falling
    /// back to the key itself). All targets must be node ids or `END`.
    ///
    /// ```rust,ignore
    /// graph.add_conditional_edges(
    ///     "think",
    ///     Arc::new(|s: &SessionState| tools_condition(s).as_str().to_string()),
    ///     Some([("tools".into(), "act".into()), (END.into(), END.into())].into_iter().collect()),
    /// );
    /// ```
    pub fn add_conditional_edges(
        &mut self,
        source: impl Into<String>,
        path: ConditionalRouterFn<S>,
        path_map: Option<HashMap<String, String>>,
    ) -> &mut Self {
        self.conditional_edges
            .insert(source.into(), ConditionalRouter::new(path, path_map));
        self
    }

    /// Builds the executable graph without persistence.
    pub fn compile(self) -> Result<CompiledStateGraph<S>, CompilationError> {
        self.compile_internal(None)
    }

    /// Builds the executable graph with a checkpointer.
    ///
    /// When `invoke(state, config)` carries `config.thread_id`, the state is
    /// saved when the run ends and when a node interrupts.
    pub fn compile_with_checkpointer(
        self,
        checkpointer: Arc<dyn Checkpointer<S>>,
    ) -> Result<CompiledStateGraph<S>, CompilationError> {
        self.compile_internal(Some(checkpointer))
    }

    fn compile_internal(
        self,
        checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    ) -> Result<CompiledStateGraph<S>, CompilationError> {
        for (from, to) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(CompilationError::NodeNotFound(from.clone()));
            }
            if to != END && !self.nodes.contains_key(to) {
                return Err(CompilationError::NodeNotFound(to.clone()));
            }
        }
        if let Some(id) = self
            .checkpoint_after
            .iter()
            .find(|id| !self.nodes.contains_key(id.as_str()))
        {
            return Err(CompilationError::NodeNotFound(id.clone()));
        }
        for (source, router) in &self.conditional_edges {
            if !self.nodes.contains_key(source) {
                return Err(CompilationError::NodeNotFound(source.clone()));
            }
            if let Some(ref path_map) = router.path_map {
                for target in path_map.values() {
                    if target != END && !self.nodes.contains_key(target) {
                        return Err(CompilationError::InvalidConditionalPathMap(target.clone()));
                    }
                }
            }
        }

        let mut start_edges = self
            .edges
            .iter()
            .filter(|(f, _)| f == START)
            .map(|(_, t)| t.clone());
        let first = match (start_edges.next(), start_edges.next()) {
            (None, _) => return Err(CompilationError::MissingStart),
            (Some(first), None) => first,
            (Some(_), Some(_)) => {
                return Err(CompilationError::InvalidChain(
                    "multiple edges from START (branch)".into(),
                ))
            }
        };

        let has_end = self.edges.iter().any(|(_, t)| t == END)
            || self.conditional_edges.values().any(|r| {
                r.path_map
                    .as_ref()
                    .map_or(true, |m| m.values().any(|v| v == END))
            });
        if !has_end {
            return Err(CompilationError::MissingEnd);
        }

        let plain: Vec<&(String, String)> =
            self.edges.iter().filter(|(f, _)| f.as_str() != START).collect();
        let edge_froms: HashSet<&String> = plain.iter().map(|(f, _)| f).collect();
        if edge_froms.len() != plain.len() {
            return Err(CompilationError::InvalidChain(
                "duplicate from (branch)".into(),
            ));
        }
        for source in self.conditional_edges.keys() {
            if edge_froms.contains(source) {
                return Err(CompilationError::NodeHasBothEdgeAndConditional(
                    source.clone(),
                ));
            }
        }

        let mut next_map: HashMap<String, NextEntry<S>> = plain
            .iter()
            .map(|(f, t)| (f.clone(), NextEntry::Unconditional(t.clone())))
            .collect();
        for (source, router) in &self.conditional_edges {
            next_map.insert(source.clone(), NextEntry::Conditional(router.clone()));
        }

        if self.conditional_edges.is_empty() {
            // Without a router nothing can break a cycle.
            let mut current = first.clone();
            let mut visited = HashSet::from([current.clone()]);
            while let Some(NextEntry::Unconditional(next)) = next_map.get(&current) {
                if next == END {
                    break;
                }
                if !visited.insert(next.clone()) {
                    return Err(CompilationError::InvalidChain("cycle detected".into()));
                }
                current = next.clone();
            }
        }

        Ok(CompiledStateGraph {
            nodes: self.nodes,
            first_node_id: first,
            next_map,
            checkpointer,
            checkpoint_after: self.checkpoint_after,
            retry_policy: self.retry_policy,
            recursion_limit: self.recursion_limit,
        })
    }
}
