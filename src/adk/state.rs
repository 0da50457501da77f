// SPDX-License-Identifier: MIT

//! Conversation state threaded through every step of a run

use super::error::GraphError;
use super::message::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Number of input characters kept when deriving a session id
const SESSION_PREFIX_CHARS: usize = 10;

/// Mutable record owned by exactly one run of the graph engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Append-only within a run
    pub messages: Vec<Message>,
    pub user_query: String,
    #[serde(default)]
    pub target_hint: Option<String>,
    #[serde(default)]
    pub final_answer: Option<String>,
}

impl ConversationState {
    /// Seed a run with optional system instructions and the user query
    pub fn seed(instructions: Option<&str>, user_query: impl Into<String>) -> Self {
        let user_query = user_query.into();
        let mut messages = Vec::with_capacity(2);
        if let Some(text) = instructions {
            messages.push(Message::system(text));
        }
        messages.push(Message::user(user_query.clone()));
        Self {
            messages,
            user_query,
            target_hint: None,
            final_answer: None,
        }
    }

    pub fn with_target_hint(mut self, hint: impl Into<String>) -> Self {
        self.target_hint = Some(hint.into());
        self
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Content of the most recent assistant message
    pub fn last_assistant_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_assistant())
            .map(Message::content)
    }

    /// Merge a node's partial update.
    ///
    /// Tool results must answer a request of the most recent assistant
    /// message, once each; anything else is rejected and the state is left
    /// unchanged.
    pub fn apply(&mut self, update: StateUpdate) -> Result<(), GraphError> {
        let turn_start = self
            .messages
            .iter()
            .rposition(Message::is_assistant)
            .unwrap_or(self.messages.len());
        let pending: Vec<&str> = self
            .messages
            .get(turn_start)
            .map(|m| m.tool_calls().iter().map(|c| c.id.as_str()).collect())
            .unwrap_or_default();
        let mut answered: HashSet<&str> = self.messages[turn_start..]
            .iter()
            .filter_map(|m| match m {
                Message::ToolResult { tool_call_id, .. } => Some(tool_call_id.as_str()),
                _ => None,
            })
            .collect();

        for message in &update.messages {
            if let Message::ToolResult { tool_call_id, .. } = message {
                if !pending.contains(&tool_call_id.as_str()) {
                    return Err(GraphError::OrphanToolResult(tool_call_id.clone()));
                }
                if !answered.insert(tool_call_id.as_str()) {
                    return Err(GraphError::DuplicateToolResult(tool_call_id.clone()));
                }
            }
        }

        self.messages.extend(update.messages);
        if let Some(answer) = update.final_answer {
            self.final_answer = Some(answer);
        }
        Ok(())
    }
}

/// Partial update returned by a node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
    pub final_answer: Option<String>,
}

impl StateUpdate {
    pub fn messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            final_answer: None,
        }
    }

    pub fn message(message: Message) -> Self {
        Self::messages(vec![message])
    }

    pub fn final_answer(answer: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            final_answer: Some(answer.into()),
        }
    }
}

/// Opaque identifier scoping one run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id for a top-level run
    pub fn random() -> Self {
        Self(format!("session-{}", uuid::Uuid::new_v4()))
    }

    /// Deterministic id from a prefix of the input.
    ///
    /// Inputs sharing their first characters map to the same id.
    pub fn derived(prefix: &str, input: &str) -> Self {
        let head: String = input.chars().take(SESSION_PREFIX_CHARS).collect();
        Self(format!("{}-{}", prefix, head))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
