// SPDX-License-Identifier: MIT

//! Sub-agent adapter - a whole graph agent behind the `Tool` contract

use super::GraphAgent;
use crate::adk::error::ToolError;
use crate::adk::state::SessionId;
use crate::adk::tool::{input_schema, parse_args, Tool};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const SESSION_PREFIX: &str = "worker-session";

#[derive(Debug, Deserialize, JsonSchema)]
struct DelegateArgs {
    /// The objective to hand to the sub-agent
    query: String,
}

/// Runs an inner agent to completion and returns its final assistant text.
///
/// The inner conversation never leaves this adapter; only the returned
/// string crosses into the calling graph.
pub struct SubAgentTool {
    name: String,
    description: String,
    schema: Value,
    agent: Arc<GraphAgent>,
}

impl SubAgentTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        agent: Arc<GraphAgent>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema: input_schema::<DelegateArgs>(),
            agent,
        }
    }

    pub fn session_for(query: &str) -> SessionId {
        SessionId::derived(SESSION_PREFIX, query)
    }
}

#[async_trait]
impl Tool for SubAgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> &Value {
        &self.schema
    }

    async fn ainvoke(&self, args: Value) -> Result<String, ToolError> {
        let args: DelegateArgs = parse_args(&self.name, args)?;
        let session = Self::session_for(&args.query);
        log::info!("Delegating to {} in {}", self.name, session);

        let result = self
            .agent
            .invoke(&args.query, &session, None)
            .await
            .map_err(|e| ToolError::execution(format!("Error: {} failed: {}", self.name, e)))?;

        Ok(result
            .state
            .last_assistant_content()
            .unwrap_or_default()
            .to_string())
    }
}
