// SPDX-License-Identifier: MIT

//! Graph Agent - runs a compiled graph over a freshly seeded conversation

use super::Agent;
use crate::adk::error::AizError;
use crate::adk::graph::{CompiledGraph, GraphEvent, RunResult};
use crate::adk::state::{ConversationState, SessionId};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A compiled graph plus the system instructions its runs are seeded with
pub struct GraphAgent {
    name: String,
    description: String,
    graph: Arc<CompiledGraph>,
    instructions: Option<String>,
}

impl GraphAgent {
    pub fn new(name: impl Into<String>, description: impl Into<String>, graph: CompiledGraph) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            graph: Arc::new(graph),
            instructions: None,
        }
    }

    /// Seed every run with a `System` message carrying `instructions`
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn graph(&self) -> &CompiledGraph {
        &self.graph
    }

    /// Fresh conversation for `query`
    pub fn seed(&self, query: &str) -> ConversationState {
        ConversationState::seed(self.instructions.as_deref(), query)
    }

    pub async fn invoke(
        &self,
        query: &str,
        session: &SessionId,
        events: Option<&mpsc::Sender<GraphEvent>>,
    ) -> Result<RunResult, AizError> {
        log::info!("Agent {} handling query in {}", self.name, session);
        self.graph.invoke(self.seed(query), session, events).await
    }

    /// Blocking form of [`GraphAgent::invoke`]
    pub fn invoke_blocking(
        &self,
        query: &str,
        session: &SessionId,
        events: Option<&mpsc::Sender<GraphEvent>>,
    ) -> Result<RunResult, AizError> {
        log::info!("Agent {} handling query in {}", self.name, session);
        self.graph.invoke_blocking(self.seed(query), session, events)
    }
}

#[async_trait]
impl Agent for GraphAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: String) -> Result<String, AizError> {
        let result = self.invoke(&input, &SessionId::random(), None).await?;
        Ok(result.answer().unwrap_or_default().to_string())
    }

    async fn run_stream(
        &self,
        input: String,
        tx: mpsc::Sender<GraphEvent>,
    ) -> Result<String, AizError> {
        let result = self.invoke(&input, &SessionId::random(), Some(&tx)).await?;
        Ok(result.answer().unwrap_or_default().to_string())
    }
}
