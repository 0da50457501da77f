// SPDX-License-Identifier: MIT

//! Model module - defines the language model capability and its bindings
//!
//! This module provides the core Model trait and shared types.
//! Model implementations are in their own submodules:
//! - [anthropic] - Anthropic's Messages API
//! - [bedrock] - AWS Bedrock Converse API
//!
//! [provider] resolves a provider configuration mapping to one of them.

pub mod anthropic;
pub mod bedrock;
pub mod provider;
mod sigv4;

use crate::adk::error::ModelInvocationError;
use crate::adk::message::Message;
use crate::adk::runtime;
use crate::adk::tool::Tool;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use provider::{ProviderConfig, ProviderFactory};

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

/// Core trait for language model bindings.
///
/// Implementations hold no per-run state, so one instance can serve any
/// number of concurrent runs.
#[async_trait]
pub trait Model: Send + Sync {
    /// Backend name, used in logs and errors
    fn provider(&self) -> &str;

    /// Produce the next assistant message for `history`, with `tools`
    /// declared to the model
    async fn generate_content(
        &self,
        history: &[Message],
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Message, ModelInvocationError>;

    /// Blocking form of [`Model::generate_content`].
    ///
    /// Must not be called from inside an async runtime.
    fn generate_content_blocking(
        &self,
        history: &[Message],
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Message, ModelInvocationError> {
        runtime::block_on(self.generate_content(history, tools))
            .map_err(|e| ModelInvocationError::Runtime(e.to_string()))?
    }
}

/// Text of the first system message, if any
pub(crate) fn extract_system_message(history: &[Message]) -> Option<&str> {
    history.iter().find_map(|m| match m {
        Message::System { content } => Some(content.as_str()),
        _ => None,
    })
}

/// Cut a string for log previews without splitting a character
pub(crate) fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
