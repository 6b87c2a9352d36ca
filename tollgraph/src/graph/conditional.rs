//! Conditional edges: route to the next node based on state.
//!
//! A source node has a routing function that takes the current state and
//! returns a key; the key is either used as the next node id or looked up in an
//! optional path map (e.g. `tools_condition` returns `"tools"` mapped to `"act"`).

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Router function: takes a reference to state and returns a routing key.
pub type ConditionalRouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Conditional edge definition: routing function plus optional path map.
///
/// When `path_map` is `Some(map)`, the next node id is `map[key]` if present,
/// otherwise the key itself.
#[derive(Clone)]
pub struct ConditionalRouter<S> {
    pub(super) path: ConditionalRouterFn<S>,
    pub(super) path_map: Option<HashMap<String, String>>,
}

impl<S> ConditionalRouter<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new(path: ConditionalRouterFn<S>, path_map: Option<HashMap<String, String>>) -> Self {
        Self { path, path_map }
    }

    /// Resolves the next node id (or END) from the current state.
    pub fn resolve_next(&self, state: &S) -> String {
        let key = (self.path)(state);
        self.path_map
            .as_ref()
            .and_then(|m| m.get(&key))
            .cloned()
            .unwrap_or(key)
    }
}

/// How to determine the next node after a given node runs.
#[derive(Clone)]
pub enum NextEntry<S> {
    /// Single fixed next node (or END). The node's own `Next` is still respected.
    Unconditional(String),
    /// Decided by the router from state; the node's `Continue`/`Node`/`End` is ignored.
    Conditional(ConditionalRouter<S>),
}
