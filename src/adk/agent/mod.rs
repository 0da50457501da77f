// SPDX-License-Identifier: MIT

//! Agent module - defines agent types for AI workflows
//!
//! This module provides the core Agent trait and implementations:
//! - `GraphAgent` - a compiled graph plus the instructions it is seeded with
//! - `SubAgentTool` - exposes a `GraphAgent` as a single tool to another graph

mod graph;
mod sub_agent;

pub use graph::GraphAgent;
pub use sub_agent::SubAgentTool;

use crate::adk::error::AizError;
use crate::adk::graph::GraphEvent;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Core agent trait for all agent types
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the agent name
    fn name(&self) -> &str;

    /// Run the agent with the given input
    async fn run(&self, input: String) -> Result<String, AizError>;

    /// Run the agent, reporting graph events on `tx`
    async fn run_stream(
        &self,
        input: String,
        tx: mpsc::Sender<GraphEvent>,
    ) -> Result<String, AizError> {
        drop(tx);
        self.run(input).await
    }
}
