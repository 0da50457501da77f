// SPDX-License-Identifier: MIT

//! Typed error handling for aiz
//!
//! Errors fall in two groups. Fatal errors (`ModelConfigurationError`,
//! `ModelInvocationError`, `GraphError`) escape the graph engine and end the
//! run. Tool errors (`ToolError`) never escape the action node: their
//! `Display` text becomes the content of a `ToolResult` message so the
//! reasoning loop can react to it.

use thiserror::Error;

/// Fixed result text for an execution the operator declined.
pub const CANCELLED_BY_USER: &str = "Execution cancelled by user.";

/// Top-level error type for a run
#[derive(Debug, Error)]
pub enum AizError {
    #[error(transparent)]
    Configuration(#[from] ModelConfigurationError),

    #[error(transparent)]
    Invocation(#[from] ModelInvocationError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Bad or unsupported provider configuration. Raised before any run starts.
#[derive(Debug, Error)]
#[error("Model configuration error: {0}")]
pub struct ModelConfigurationError(pub String);

impl ModelConfigurationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// A required field is absent from the provider mapping
    pub fn missing_field(provider: &str, field: &str) -> Self {
        Self(format!(
            "provider '{}' requires a '{}' field",
            provider, field
        ))
    }
}

/// Failure of the language model capability during a reasoning step
#[derive(Debug, Error)]
pub enum ModelInvocationError {
    /// Network-level failure talking to the provider
    #[error("Transport error from {provider}: {source}")]
    Transport {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status (auth, quota, bad request...)
    #[error("API error from {provider} (status {status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    /// The provider answered with something we could not turn into a message
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    /// Could not drive the call (e.g. blocking form used inside a runtime)
    #[error("Model runtime error: {0}")]
    Runtime(String),
}

impl ModelInvocationError {
    pub fn transport(provider: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            provider: provider.into(),
            source,
        }
    }

    pub fn api(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Recoverable tool failures. The `Display` text is what the model sees.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    /// Arguments did not match the tool's declared schema
    #[error("Error: invalid arguments for tool '{tool}': {message}")]
    Validation { tool: String, message: String },

    /// The requested tool is not in the active registry
    #[error("Error: tool '{0}' not found")]
    NotFound(String),

    /// The tool ran and failed; the message is already user-facing
    #[error("{0}")]
    Execution(String),

    /// The external action exceeded its time budget
    #[error("Error: The command '{command}' timed out.")]
    Timeout { command: String },

    /// The operator declined the proposed action
    #[error("Execution cancelled by user.")]
    Cancelled,
}

impl ToolError {
    pub fn validation(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    pub fn timeout(command: impl Into<String>) -> Self {
        Self::Timeout {
            command: command.into(),
        }
    }
}

/// Graph construction and execution errors
#[derive(Debug, Error)]
pub enum GraphError {
    /// The graph description is incomplete or inconsistent
    #[error("Graph '{graph}' failed to compile: {message}")]
    Compile { graph: String, message: String },

    /// The run executed more nodes than the configured limit
    #[error("Recursion limit of {0} node executions reached without a terminal state")]
    RecursionLimit(u32),

    /// A node tried to append a tool result with no matching request
    #[error("Tool result for '{0}' does not answer a request of the preceding assistant message")]
    OrphanToolResult(String),

    /// A second tool result for a request that already has one
    #[error("Tool request '{0}' already has a result")]
    DuplicateToolResult(String),

    /// The router produced a branch the transition table does not map
    #[error("Branch '{branch}' is not mapped after node '{node}'")]
    UnmappedBranch { node: String, branch: String },

    /// A node found a message it cannot work with
    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),

    /// Could not drive the run (e.g. blocking form used inside a runtime)
    #[error("Graph runtime error: {0}")]
    Runtime(String),
}

impl GraphError {
    pub fn compile(graph: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Compile {
            graph: graph.into(),
            message: message.into(),
        }
    }
}
