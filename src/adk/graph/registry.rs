// SPDX-License-Identifier: MIT

use crate::adk::error::{GraphError, ToolError};
use crate::adk::tool::Tool;
use jsonschema::Validator;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    validator: Validator,
}

/// Immutable name → tool mapping shared by every run of a graph.
///
/// Argument schemas are compiled once when the registry is built.
#[derive(Clone)]
pub struct ToolRegistry {
    entries: Arc<HashMap<String, RegisteredTool>>,
    /// Declaration order, used when binding tools to a model
    order: Arc<Vec<Arc<dyn Tool>>>,
}

impl ToolRegistry {
    /// Build a registry; tool names must be unique and schemas must compile
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self, GraphError> {
        let mut entries = HashMap::with_capacity(tools.len());
        for tool in &tools {
            let name = tool.name().to_string();
            let validator = jsonschema::validator_for(tool.schema()).map_err(|e| {
                GraphError::compile("tools", format!("invalid schema for tool '{}': {}", name, e))
            })?;
            let entry = RegisteredTool {
                tool: Arc::clone(tool),
                validator,
            };
            if entries.insert(name.clone(), entry).is_some() {
                return Err(GraphError::compile(
                    "tools",
                    format!("duplicate tool name '{}'", name),
                ));
            }
        }
        Ok(Self {
            entries: Arc::new(entries),
            order: Arc::new(tools),
        })
    }

    pub fn empty() -> Self {
        Self {
            entries: Arc::new(HashMap::new()),
            order: Arc::new(Vec::new()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.entries.get(name).map(|e| Arc::clone(&e.tool))
    }

    /// Tools in declaration order
    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.order
    }

    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Resolve `name` and check `args` against its schema
    pub fn resolve(&self, name: &str, args: &Value) -> Result<Arc<dyn Tool>, ToolError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        if !entry.validator.is_valid(args) {
            let messages: Vec<String> = entry
                .validator
                .iter_errors(args)
                .map(|err| err.to_string())
                .collect();
            return Err(ToolError::validation(name, messages.join("; ")));
        }
        Ok(Arc::clone(&entry.tool))
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
