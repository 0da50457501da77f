// SPDX-License-Identifier: MIT

//! Graph engine: a fixed transition table over reasoning, action and
//! formatting nodes, driven one node at a time until a terminal state.

use super::node::{Node, NodeKind};
use super::router::{Branch, Router};
use crate::adk::error::{AizError, GraphError};
use crate::adk::runtime;
use crate::adk::state::{ConversationState, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const DEFAULT_RECURSION_LIMIT: u32 = 25;

/// Where an edge leads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Node(NodeKind),
    End,
}

/// Outgoing edge of a node
#[derive(Debug, Clone)]
pub enum Edge {
    Fixed(Target),
    /// Resolved by asking the router for a branch
    Conditional(HashMap<Branch, Target>),
}

/// Execution state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    AwaitingModel,
    AwaitingTools,
    Formatting,
    Done,
    DoneWithFormatting,
}

impl EngineState {
    fn entering(node: NodeKind) -> Self {
        match node {
            NodeKind::Reasoning => EngineState::AwaitingModel,
            NodeKind::Action => EngineState::AwaitingTools,
            NodeKind::Formatting => EngineState::Formatting,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineState::Done | EngineState::DoneWithFormatting)
    }
}

/// Observability events emitted while a run progresses
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    NodeEntered {
        session: SessionId,
        node: NodeKind,
    },
    NodeExited {
        session: SessionId,
        node: NodeKind,
        next: Target,
    },
    RunTerminated {
        session: SessionId,
        /// Terminal state, or the state the run failed in
        outcome: EngineState,
        error: Option<String>,
    },
}

/// Final state of a completed run
#[derive(Debug, Clone)]
pub struct RunResult {
    pub state: ConversationState,
    pub outcome: EngineState,
}

impl RunResult {
    /// The final answer when one was formatted, else the last assistant text
    pub fn answer(&self) -> Option<&str> {
        self.state
            .final_answer
            .as_deref()
            .or_else(|| self.state.last_assistant_content())
    }
}

/// Collects nodes, edges and a router, then compiles them
pub struct GraphBuilder {
    name: String,
    nodes: HashMap<NodeKind, Arc<dyn Node>>,
    edges: HashMap<NodeKind, Edge>,
    router: Option<Arc<dyn Router>>,
    recursion_limit: u32,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: HashMap::new(),
            edges: HashMap::new(),
            router: None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Adds a node; replaces any node already in that slot
    pub fn add_node(&mut self, kind: NodeKind, node: Arc<dyn Node>) -> &mut Self {
        self.nodes.insert(kind, node);
        self
    }

    pub fn add_edge(&mut self, from: NodeKind, to: Target) -> &mut Self {
        self.edges.insert(from, Edge::Fixed(to));
        self
    }

    pub fn add_conditional_edges(
        &mut self,
        from: NodeKind,
        table: impl IntoIterator<Item = (Branch, Target)>,
    ) -> &mut Self {
        self.edges
            .insert(from, Edge::Conditional(table.into_iter().collect()));
        self
    }

    pub fn set_router(&mut self, router: Arc<dyn Router>) -> &mut Self {
        self.router = Some(router);
        self
    }

    pub fn set_recursion_limit(&mut self, limit: u32) -> &mut Self {
        self.recursion_limit = limit;
        self
    }

    /// Validate the description and freeze it.
    ///
    /// Requires reasoning and action nodes and a router; every node needs an
    /// outgoing edge, every edge target must be registered, and every branch
    /// the router can produce must be mapped in each conditional table.
    pub fn compile(self) -> Result<CompiledGraph, GraphError> {
        let fail = |message: String| GraphError::compile(self.name.clone(), message);

        for required in [NodeKind::Reasoning, NodeKind::Action] {
            if !self.nodes.contains_key(&required) {
                return Err(fail(format!("missing {} node", required)));
            }
        }
        let router = self
            .router
            .clone()
            .ok_or_else(|| fail("no router set".to_string()))?;
        if self.recursion_limit == 0 {
            return Err(fail("recursion limit must be positive".to_string()));
        }

        for kind in self.nodes.keys() {
            if !self.edges.contains_key(kind) {
                return Err(fail(format!("node '{}' has no outgoing edge", kind)));
            }
        }

        for (from, edge) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(fail(format!("edge from unregistered node '{}'", from)));
            }
            let targets: Vec<Target> = match edge {
                Edge::Fixed(target) => vec![*target],
                Edge::Conditional(table) => {
                    for branch in router.branches() {
                        if !table.contains_key(branch) {
                            return Err(fail(format!(
                                "branch '{}' is not mapped after node '{}'",
                                branch, from
                            )));
                        }
                    }
                    table.values().copied().collect()
                }
            };
            for target in targets {
                if let Target::Node(kind) = target {
                    if !self.nodes.contains_key(&kind) {
                        return Err(fail(format!(
                            "edge from '{}' targets unregistered node '{}'",
                            from, kind
                        )));
                    }
                }
            }
        }

        Ok(CompiledGraph {
            name: self.name,
            nodes: self.nodes,
            edges: self.edges,
            router,
            recursion_limit: self.recursion_limit,
        })
    }
}

/// Executable graph. Immutable; one instance serves many concurrent runs,
/// each with its own `ConversationState`.
pub struct CompiledGraph {
    name: String,
    nodes: HashMap<NodeKind, Arc<dyn Node>>,
    edges: HashMap<NodeKind, Edge>,
    router: Arc<dyn Router>,
    recursion_limit: u32,
}

impl CompiledGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn recursion_limit(&self) -> u32 {
        self.recursion_limit
    }

    /// Drive `state` from the reasoning node to a terminal state.
    ///
    /// Events go to `events` when given; a dropped receiver is ignored.
    pub async fn invoke(
        &self,
        state: ConversationState,
        session: &SessionId,
        events: Option<&mpsc::Sender<GraphEvent>>,
    ) -> Result<RunResult, AizError> {
        let mut state = state;
        let mut current = NodeKind::Reasoning;
        let mut executed = 0u32;

        log::info!("[{}] run {} started", self.name, session);

        loop {
            if executed >= self.recursion_limit {
                let err = GraphError::RecursionLimit(self.recursion_limit);
                self.terminate(session, EngineState::entering(current), Some(&err), events)
                    .await;
                return Err(err.into());
            }
            executed += 1;

            emit(
                events,
                GraphEvent::NodeEntered {
                    session: session.clone(),
                    node: current,
                },
            )
            .await;
            log::info!("[{}] entering node '{}'", self.name, current);

            let next = match self.step(current, &mut state).await {
                Ok(next) => next,
                Err(e) => {
                    log::error!("[{}] node '{}' failed: {}", self.name, current, e);
                    self.terminate(session, EngineState::entering(current), Some(&e), events)
                        .await;
                    return Err(e);
                }
            };

            emit(
                events,
                GraphEvent::NodeExited {
                    session: session.clone(),
                    node: current,
                    next,
                },
            )
            .await;

            match next {
                Target::Node(kind) => current = kind,
                Target::End => {
                    let outcome = if current == NodeKind::Formatting {
                        EngineState::DoneWithFormatting
                    } else {
                        EngineState::Done
                    };
                    log::info!(
                        "[{}] run {} finished after {} steps ({:?})",
                        self.name,
                        session,
                        executed,
                        outcome
                    );
                    self.terminate::<AizError>(session, outcome, None, events)
                        .await;
                    return Ok(RunResult { state, outcome });
                }
            }
        }
    }

    /// Blocking form of [`CompiledGraph::invoke`].
    ///
    /// Must not be called from inside an async runtime.
    pub fn invoke_blocking(
        &self,
        state: ConversationState,
        session: &SessionId,
        events: Option<&mpsc::Sender<GraphEvent>>,
    ) -> Result<RunResult, AizError> {
        runtime::block_on(self.invoke(state, session, events))
            .map_err(|e| GraphError::Runtime(e.to_string()))?
    }

    /// Run one node, merge its update and resolve the outgoing edge
    async fn step(
        &self,
        current: NodeKind,
        state: &mut ConversationState,
    ) -> Result<Target, AizError> {
        let node = self
            .nodes
            .get(&current)
            .ok_or_else(|| GraphError::Runtime(format!("node '{}' is not registered", current)))?;
        let update = node.run(state).await?;
        state.apply(update)?;

        match self.edges.get(&current) {
            Some(Edge::Fixed(target)) => Ok(*target),
            Some(Edge::Conditional(table)) => {
                let branch = self.router.route(state);
                log::info!("[{}] after '{}' routing to '{}'", self.name, current, branch);
                table.get(&branch).copied().ok_or_else(|| {
                    GraphError::UnmappedBranch {
                        node: current.to_string(),
                        branch: branch.to_string(),
                    }
                    .into()
                })
            }
            None => Err(GraphError::Runtime(format!("node '{}' has no outgoing edge", current)).into()),
        }
    }

    async fn terminate<E: std::fmt::Display>(
        &self,
        session: &SessionId,
        outcome: EngineState,
        error: Option<&E>,
        events: Option<&mpsc::Sender<GraphEvent>>,
    ) {
        emit(
            events,
            GraphEvent::RunTerminated {
                session: session.clone(),
                outcome,
                error: error.map(ToString::to_string),
            },
        )
        .await;
    }
}

async fn emit(events: Option<&mpsc::Sender<GraphEvent>>, event: GraphEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}
