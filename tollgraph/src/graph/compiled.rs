//! Compiled state graph: immutable, supports invoke.
//!
//! Built by `StateGraph::compile` or `compile_with_checkpointer`. When a
//! checkpointer is set and `config.thread_id` is provided, state is saved when
//! the run reaches END, when a node returns `Next::Interrupt`, and after each
//! node registered with `StateGraph::checkpoint_after`. A failing node saves
//! nothing, so the previous checkpoint stays the latest.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::AgentError;
use crate::memory::{Checkpoint, CheckpointSource, Checkpointer, RunnableConfig};

use super::logging::{
    log_graph_complete, log_graph_error, log_graph_interrupted, log_graph_start,
    log_node_complete, log_node_start,
};
use super::retry::RetryPolicy;
use super::state_graph::END;
use super::{GraphInterrupt, Next, NextEntry, Node, RunContext};

/// Node executions allowed per invoke unless overridden.
pub const DEFAULT_RECURSION_LIMIT: usize = 25;

/// Compiled graph: immutable structure, supports invoke only.
///
/// Runs from the first node (or `config.resume_from_node_id`); after each node
/// uses the conditional router when present, else the node's `Next`.
#[derive(Clone)]
pub struct CompiledStateGraph<S> {
    pub(super) nodes: HashMap<String, Arc<dyn Node<S>>>,
    pub(super) first_node_id: String,
    pub(super) next_map: HashMap<String, NextEntry<S>>,
    pub(super) checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    pub(super) checkpoint_after: HashSet<String>,
    pub(super) retry_policy: RetryPolicy,
    pub(super) recursion_limit: usize,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Checkpointer the graph was compiled with, if any.
    pub fn checkpointer(&self) -> Option<&Arc<dyn Checkpointer<S>>> {
        self.checkpointer.as_ref()
    }

    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    /// Runs a node, retrying per policy while the error is retryable.
    async fn execute_node_with_retry(
        &self,
        node: &Arc<dyn Node<S>>,
        state: &S,
        run_ctx: &RunContext,
    ) -> Result<(S, Next), AgentError> {
        let mut attempt = 0;
        loop {
            match node.run_with_context(state.clone(), run_ctx).await {
                Ok(output) => return Ok(output),
                Err(e) if e.is_retryable() && self.retry_policy.should_retry(attempt) => {
                    let delay = self.retry_policy.delay(attempt);
                    tracing::warn!(
                        node_id = node.id(),
                        attempt = attempt + 1,
                        ?delay,
                        error = %e,
                        "retrying node"
                    );
                    if delay > std::time::Duration::ZERO {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn save_checkpoint(
        &self,
        state: &S,
        config: &RunnableConfig,
        source: CheckpointSource,
        step: usize,
    ) -> Result<(), AgentError> {
        if let (Some(cp), Some(_)) = (&self.checkpointer, &config.thread_id) {
            let checkpoint = Checkpoint::from_state(state.clone(), source, step as i64);
            let id = cp.put(config, &checkpoint).await?;
            tracing::debug!(checkpoint_id = %id, ?source, step, "checkpoint saved");
        }
        Ok(())
    }

    /// Runs the graph with the given state.
    ///
    /// - `Next::Continue`: follow the node's edge (END if none).
    /// - `Next::Node(id)`: run the node with that id next.
    /// - `Next::End`: stop and return current state.
    /// - `Next::Interrupt`: checkpoint and return `AgentError::Interrupted`.
    ///
    /// Conditional edges override `Continue`, `Node` and `End`.
    pub async fn invoke(&self, state: S, config: Option<RunnableConfig>) -> Result<S, AgentError> {
        if !self.nodes.contains_key(&self.first_node_id) {
            return Err(AgentError::ExecutionFailed("empty graph".into()));
        }
        let config = config.unwrap_or_default();
        let run_ctx = RunContext::new(config.clone());
        let thread_id = config.thread_id.as_deref();
        let mut current_id = config
            .resume_from_node_id
            .as_ref()
            .filter(|id| self.nodes.contains_key(id.as_str()))
            .cloned()
            .unwrap_or_else(|| self.first_node_id.clone());
        let mut state = state;
        let mut steps = 0usize;

        log_graph_start(thread_id, &current_id);
        loop {
            if steps >= self.recursion_limit {
                let err = AgentError::RecursionLimit(self.recursion_limit);
                log_graph_error(&err);
                return Err(err);
            }
            let node = self.nodes.get(&current_id).cloned().ok_or_else(|| {
                AgentError::ExecutionFailed(format!("node not found: {}", current_id))
            })?;

            log_node_start(&current_id, steps);
            let (new_state, next) = match self
                .execute_node_with_retry(&node, &state, &run_ctx)
                .await
            {
                Ok(output) => output,
                Err(e) => {
                    log_graph_error(&e);
                    return Err(e);
                }
            };
            steps += 1;
            log_node_complete(&current_id, &next);
            state = new_state;

            let next_id = match (next, self.next_map.get(&current_id)) {
                (Next::Interrupt(interrupt), _) => {
                    self.save_checkpoint(&state, &config, CheckpointSource::Interrupt, steps)
                        .await?;
                    log_graph_interrupted(thread_id, &current_id);
                    return Err(AgentError::Interrupted(GraphInterrupt(interrupt)));
                }
                (_, Some(NextEntry::Conditional(router))) => {
                    let target = router.resolve_next(&state);
                    tracing::debug!(from = %current_id, to = %target, "conditional routing");
                    Some(target)
                }
                (Next::End, _) => None,
                (Next::Node(id), _) => Some(id),
                (Next::Continue, Some(NextEntry::Unconditional(id))) => Some(id.clone()),
                (Next::Continue, None) => None,
            };

            match next_id {
                Some(id) if id != END => {
                    if self.checkpoint_after.contains(&current_id) {
                        self.save_checkpoint(&state, &config, CheckpointSource::Loop, steps)
                            .await?;
                    }
                    current_id = id;
                }
                _ => {
                    self.save_checkpoint(&state, &config, CheckpointSource::Loop, steps)
                        .await?;
                    log_graph_complete(thread_id, steps);
                    return Ok(state);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::graph::{Interrupt, Next, Node, StateGraph, END, START};
    use crate::llm::GatewayError;
    use crate::memory::{MemorySaver, RunnableConfig};

    #[derive(Clone)]
    struct AddNode {
        id: &'static str,
        delta: i32,
    }

    #[async_trait]
    impl Node<i32> for AddNode {
        fn id(&self) -> &str {
            self.id
        }

        async fn run(&self, state: i32) -> Result<(i32, Next), AgentError> {
            Ok((state + self.delta, Next::Continue))
        }
    }

    /// Adds one, then interrupts when the state crosses a threshold.
    struct PauseAboveNode {
        threshold: i32,
    }

    #[async_trait]
    impl Node<i32> for PauseAboveNode {
        fn id(&self) -> &str {
            "pause"
        }

        async fn run(&self, state: i32) -> Result<(i32, Next), AgentError> {
            let state = state + 1;
            if state > self.threshold {
                Ok((
                    state,
                    Next::Interrupt(Interrupt::with_id(serde_json::json!({"prompt": "ok?"}), "t".into())),
                ))
            } else {
                Ok((state, Next::Continue))
            }
        }
    }

    /// Fails with the given error until `max_failures` calls have happened.
    struct FailingNode {
        fail_count: Arc<AtomicUsize>,
        max_failures: usize,
        transient: bool,
    }

    #[async_trait]
    impl Node<i32> for FailingNode {
        fn id(&self) -> &str {
            "failing"
        }

        async fn run(&self, state: i32) -> Result<(i32, Next), AgentError> {
            let current = self.fail_count.fetch_add(1, Ordering::SeqCst);
            if current < self.max_failures {
                if self.transient {
                    Err(GatewayError::Transient(format!("failure {}", current + 1)).into())
                } else {
                    Err(AgentError::ExecutionFailed("permanent".into()))
                }
            } else {
                Ok((state + 10, Next::Continue))
            }
        }
    }

    fn build_two_step_graph() -> StateGraph<i32> {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("first", Arc::new(AddNode { id: "first", delta: 1 }));
        graph.add_node("second", Arc::new(AddNode { id: "second", delta: 2 }));
        graph.add_edge(START, "first");
        graph.add_edge("first", "second");
        graph.add_edge("second", END);
        graph
    }

    fn config(thread: &str) -> RunnableConfig {
        RunnableConfig::for_thread(thread)
    }

    /// **Scenario**: Linear graph runs each node once in order.
    #[tokio::test]
    async fn invoke_linear_graph_runs_all_nodes() {
        let compiled = build_two_step_graph().compile().expect("graph compiles");
        assert_eq!(compiled.invoke(0, None).await.unwrap(), 3);
    }

    /// **Scenario**: invoke with checkpointer and thread_id saves the final state.
    #[tokio::test]
    async fn invoke_with_checkpointer_saves_final_state() {
        let cp = Arc::new(MemorySaver::<i32>::new());
        let compiled = build_two_step_graph()
            .compile_with_checkpointer(cp.clone())
            .expect("graph compiles");
        compiled.invoke(0, Some(config("tid-cp"))).await.unwrap();
        let (checkpoint, metadata) = cp.get_tuple(&config("tid-cp")).await.unwrap().unwrap();
        assert_eq!(checkpoint.state, 3);
        assert_eq!(metadata.source, CheckpointSource::Loop);
        assert_eq!(metadata.step, 2);
    }

    /// **Scenario**: Without thread_id nothing is persisted even with a checkpointer.
    #[tokio::test]
    async fn invoke_without_thread_id_does_not_persist() {
        let cp = Arc::new(MemorySaver::<i32>::new());
        let compiled = build_two_step_graph()
            .compile_with_checkpointer(cp.clone())
            .expect("graph compiles");
        compiled.invoke(0, None).await.unwrap();
        assert!(cp.is_empty());
    }

    /// **Scenario**: Conditional edges route by state.
    #[tokio::test]
    async fn invoke_conditional_edges_routes_by_state() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("decide", Arc::new(AddNode { id: "decide", delta: 0 }));
        graph.add_node("go_a", Arc::new(AddNode { id: "go_a", delta: 1 }));
        graph.add_node("go_b", Arc::new(AddNode { id: "go_b", delta: 10 }));
        graph.add_edge(START, "decide");
        graph.add_conditional_edges(
            "decide",
            Arc::new(|s: &i32| if *s > 0 { "a".into() } else { "b".into() }),
            Some(
                [("a".to_string(), "go_a".to_string()), ("b".to_string(), "go_b".to_string())]
                    .into_iter()
                    .collect(),
            ),
        );
        graph.add_edge("go_a", END);
        graph.add_edge("go_b", END);
        let compiled = graph.compile().expect("graph compiles");
        assert_eq!(compiled.invoke(1, None).await.unwrap(), 2);
        assert_eq!(compiled.invoke(0, None).await.unwrap(), 10);
    }

    /// **Scenario**: Next::Interrupt saves the node's returned state and surfaces the interrupt.
    #[tokio::test]
    async fn interrupt_persists_updated_state_and_returns_interrupted() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("pause", Arc::new(PauseAboveNode { threshold: 0 }));
        graph.add_edge(START, "pause");
        graph.add_edge("pause", END);
        let cp = Arc::new(MemorySaver::<i32>::new());
        let compiled = graph.compile_with_checkpointer(cp.clone()).unwrap();

        let err = compiled.invoke(0, Some(config("p"))).await.unwrap_err();
        match err {
            AgentError::Interrupted(GraphInterrupt(i)) => assert_eq!(i.id.as_deref(), Some("t")),
            other => panic!("expected Interrupted, got {:?}", other),
        }
        let (checkpoint, metadata) = cp.get_tuple(&config("p")).await.unwrap().unwrap();
        assert_eq!(checkpoint.state, 1);
        assert_eq!(metadata.source, CheckpointSource::Interrupt);
    }

    /// **Scenario**: A node marked checkpoint_after keeps its output saved when a later node fails.
    #[tokio::test]
    async fn checkpoint_after_survives_later_failure() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("first", Arc::new(AddNode { id: "first", delta: 1 }));
        graph.add_node(
            "failing",
            Arc::new(FailingNode {
                fail_count: Arc::new(AtomicUsize::new(0)),
                max_failures: 1,
                transient: true,
            }),
        );
        graph.add_edge(START, "first");
        graph.add_edge("first", "failing");
        graph.add_edge("failing", END);
        graph.checkpoint_after("first");
        let cp = Arc::new(MemorySaver::<i32>::new());
        let compiled = graph.compile_with_checkpointer(cp.clone()).unwrap();

        assert!(compiled.invoke(5, Some(config("d"))).await.is_err());
        let (checkpoint, metadata) = cp.get_tuple(&config("d")).await.unwrap().unwrap();
        assert_eq!(checkpoint.state, 6);
        assert_eq!(metadata.source, CheckpointSource::Loop);
        assert_eq!(metadata.step, 1);
    }

    /// **Scenario**: resume_from_node_id starts the run at that node.
    #[tokio::test]
    async fn invoke_resume_from_node_skips_earlier_nodes() {
        let compiled = build_two_step_graph().compile().unwrap();
        let cfg = RunnableConfig {
            resume_from_node_id: Some("second".into()),
            ..Default::default()
        };
        assert_eq!(compiled.invoke(0, Some(cfg)).await.unwrap(), 2);
    }

    /// **Scenario**: A loop that never exits hits the recursion limit and persists nothing.
    #[tokio::test]
    async fn loop_stops_at_recursion_limit() {
        let mut graph = StateGraph::<i32>::new().with_recursion_limit(5);
        graph.add_node("spin", Arc::new(AddNode { id: "spin", delta: 1 }));
        graph.add_edge(START, "spin");
        graph.add_conditional_edges(
            "spin",
            Arc::new(|s: &i32| if *s < 1000 { "spin".into() } else { END.into() }),
            None,
        );
        let cp = Arc::new(MemorySaver::<i32>::new());
        let compiled = graph.compile_with_checkpointer(cp.clone()).unwrap();
        let err = compiled.invoke(0, Some(config("r"))).await.unwrap_err();
        assert!(matches!(err, AgentError::RecursionLimit(5)));
        assert!(cp.get_tuple(&config("r")).await.unwrap().is_none());
    }

    /// **Scenario**: Transient failures are retried per policy and then succeed.
    #[tokio::test]
    async fn invoke_with_retry_succeeds_after_transient_failures() {
        let fail_count = Arc::new(AtomicUsize::new(0));
        let mut graph = StateGraph::<i32>::new()
            .with_retry_policy(RetryPolicy::fixed(3, std::time::Duration::from_millis(1)));
        graph.add_node(
            "failing",
            Arc::new(FailingNode {
                fail_count: fail_count.clone(),
                max_failures: 2,
                transient: true,
            }),
        );
        graph.add_edge(START, "failing");
        graph.add_edge("failing", END);
        let result = graph.compile().unwrap().invoke(0, None).await.unwrap();
        assert_eq!(fail_count.load(Ordering::SeqCst), 3);
        assert_eq!(result, 10);
    }

    /// **Scenario**: Non-retryable errors fail immediately even with a retry policy.
    #[tokio::test]
    async fn non_retryable_error_is_not_retried() {
        let fail_count = Arc::new(AtomicUsize::new(0));
        let mut graph = StateGraph::<i32>::new()
            .with_retry_policy(RetryPolicy::fixed(3, std::time::Duration::from_millis(1)));
        graph.add_node(
            "failing",
            Arc::new(FailingNode {
                fail_count: fail_count.clone(),
                max_failures: 2,
                transient: false,
            }),
        );
        graph.add_edge(START, "failing");
        graph.add_edge("failing", END);
        assert!(graph.compile().unwrap().invoke(0, None).await.is_err());
        assert_eq!(fail_count.load(Ordering::SeqCst), 1);
    }

    /// **Scenario**: Retries exhausted returns the last error.
    #[tokio::test]
    async fn invoke_with_retry_exhausted_fails() {
        let fail_count = Arc::new(AtomicUsize::new(0));
        let mut graph = StateGraph::<i32>::new()
            .with_retry_policy(RetryPolicy::fixed(2, std::time::Duration::from_millis(1)));
        graph.add_node(
            "failing",
            Arc::new(FailingNode {
                fail_count: fail_count.clone(),
                max_failures: 5,
                transient: true,
            }),
        );
        graph.add_edge(START, "failing");
        graph.add_edge("failing", END);
        let result = graph.compile().unwrap().invoke(0, None).await;
        assert_eq!(fail_count.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(AgentError::Gateway(_))));
    }
}
