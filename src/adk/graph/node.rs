// SPDX-License-Identifier: MIT

//! Graph nodes: reasoning (model call), action (tool dispatch) and formatting

use super::registry::ToolRegistry;
use crate::adk::error::{AizError, GraphError, ToolError};
use crate::adk::message::{Message, ToolCallRequest};
use crate::adk::model::{preview, Model};
use crate::adk::state::{ConversationState, StateUpdate};
use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Fallback answer when the formatting step finds no executor output
pub const NO_FINAL_OUTPUT: &str =
    "Workflow complete, but could not determine final command output.";

/// Identifies a node slot in a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Reasoning,
    Action,
    Formatting,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Reasoning => "reasoning",
            NodeKind::Action => "action",
            NodeKind::Formatting => "formatting",
        };
        f.write_str(name)
    }
}

/// One step of a graph. Nodes read the state and return a partial update;
/// the engine merges it.
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, AizError>;
}

/// Calls the model with the conversation so far and appends its reply
pub struct ReasoningNode {
    model: Arc<dyn Model>,
    tools: ToolRegistry,
    instructions: Option<String>,
}

impl ReasoningNode {
    pub fn new(model: Arc<dyn Model>, tools: ToolRegistry) -> Self {
        Self {
            model,
            tools,
            instructions: None,
        }
    }

    /// System text sent ahead of a conversation that has none of its own
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    fn history<'a>(&self, state: &'a ConversationState) -> std::borrow::Cow<'a, [Message]> {
        match (&self.instructions, state.messages.first()) {
            (Some(text), first) if !matches!(first, Some(Message::System { .. })) => {
                let mut history = Vec::with_capacity(state.messages.len() + 1);
                history.push(Message::system(text.clone()));
                history.extend(state.messages.iter().cloned());
                std::borrow::Cow::Owned(history)
            }
            _ => std::borrow::Cow::Borrowed(&state.messages),
        }
    }
}

#[async_trait]
impl Node for ReasoningNode {
    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, AizError> {
        let history = self.history(state);
        let tools = if self.tools.is_empty() {
            None
        } else {
            Some(self.tools.tools())
        };

        log::debug!(
            "Calling {} with {} messages and {} tools",
            self.model.provider(),
            history.len(),
            self.tools.len()
        );
        let reply = self.model.generate_content(&history, tools).await?;

        if !reply.is_assistant() {
            return Err(GraphError::UnexpectedMessage(format!(
                "model returned a '{}' message instead of an assistant message",
                reply.role()
            ))
            .into());
        }

        log::info!(
            "Model replied ({} tool calls): {}",
            reply.tool_calls().len(),
            preview(reply.content(), 120)
        );
        Ok(StateUpdate::message(reply))
    }
}

/// Executes every tool request of the latest assistant message
pub struct ActionNode {
    tools: ToolRegistry,
}

impl ActionNode {
    pub fn new(tools: ToolRegistry) -> Self {
        Self { tools }
    }

    async fn dispatch(&self, call: &ToolCallRequest) -> Message {
        let args = call.arguments_value();
        log::info!("Calling tool '{}' with {}", call.tool_name, args);

        let outcome = match self.tools.resolve(&call.tool_name, &args) {
            Ok(tool) => AssertUnwindSafe(tool.ainvoke(args))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(ToolError::execution(format!(
                        "Error: tool '{}' panicked",
                        call.tool_name
                    )))
                }),
            Err(e) => Err(e),
        };

        let content = match outcome {
            Ok(output) => output,
            Err(e) => {
                log::warn!("Tool '{}' failed: {}", call.tool_name, e);
                e.to_string()
            }
        };
        log::debug!("Tool '{}' result: {}", call.tool_name, preview(&content, 200));
        Message::tool_result(call.id.clone(), call.tool_name.clone(), content)
    }
}

#[async_trait]
impl Node for ActionNode {
    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, AizError> {
        let calls = match state.last_message() {
            Some(m) if !m.tool_calls().is_empty() => m.tool_calls(),
            _ => {
                return Err(GraphError::UnexpectedMessage(
                    "action step reached without pending tool requests".to_string(),
                )
                .into())
            }
        };

        // join_all yields outputs in input order
        let results = join_all(calls.iter().map(|call| self.dispatch(call))).await;
        Ok(StateUpdate::messages(results))
    }
}

/// Promotes the executor's output to the final answer
pub struct FormattingNode {
    executor: String,
}

impl FormattingNode {
    pub fn new(executor: impl Into<String>) -> Self {
        Self {
            executor: executor.into(),
        }
    }
}

#[async_trait]
impl Node for FormattingNode {
    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, AizError> {
        let answer = match state.last_message() {
            Some(Message::ToolResult { name, content, .. }) if *name == self.executor => {
                content.clone()
            }
            _ => NO_FINAL_OUTPUT.to_string(),
        };
        Ok(StateUpdate::final_answer(answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::ModelInvocationError;
    use crate::adk::tool::Tool;
    use once_cell::sync::Lazy;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    static OPEN_SCHEMA: Lazy<Value> = Lazy::new(|| json!({"type": "object"}));

    static TEXT_SCHEMA: Lazy<Value> = Lazy::new(|| {
        json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        })
    });

    /// Sleeps for `delay_ms` then echoes `text`
    struct SlowEcho {
        name: &'static str,
        delay_ms: u64,
    }

    #[async_trait]
    impl Tool for SlowEcho {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "Echo after a delay"
        }

        fn schema(&self) -> &Value {
            &TEXT_SCHEMA
        }

        async fn ainvoke(&self, args: Value) -> Result<String, ToolError> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            Ok(args["text"].as_str().unwrap_or_default().to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl Tool for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn schema(&self) -> &Value {
            &OPEN_SCHEMA
        }

        async fn ainvoke(&self, _args: Value) -> Result<String, ToolError> {
            Err(ToolError::execution("Error executing command:\nboom"))
        }
    }

    struct Panicking;

    #[async_trait]
    impl Tool for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn description(&self) -> &str {
            "Panics"
        }

        fn schema(&self) -> &Value {
            &OPEN_SCHEMA
        }

        async fn ainvoke(&self, _args: Value) -> Result<String, ToolError> {
            panic!("tool bug")
        }
    }

    /// Records the history it was given and replies with a fixed message
    struct RecordingModel {
        reply: Message,
        seen: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl Model for RecordingModel {
        fn provider(&self) -> &str {
            "recording"
        }

        async fn generate_content(
            &self,
            history: &[Message],
            _tools: Option<&[Arc<dyn Tool>]>,
        ) -> Result<Message, ModelInvocationError> {
            *self.seen.lock().unwrap() = history.to_vec();
            Ok(self.reply.clone())
        }
    }

    fn pending(calls: Vec<ToolCallRequest>) -> ConversationState {
        let mut state = ConversationState::seed(None, "q");
        state.messages.push(Message::assistant_with_calls("", calls));
        state
    }

    #[tokio::test]
    async fn test_action_preserves_request_order() {
        let registry = ToolRegistry::new(vec![
            Arc::new(SlowEcho { name: "slow", delay_ms: 50 }),
            Arc::new(SlowEcho { name: "fast", delay_ms: 0 }),
        ])
        .unwrap();
        let state = pending(vec![
            ToolCallRequest::new("1", "slow", json!({"text": "first"})),
            ToolCallRequest::new("2", "fast", json!({"text": "second"})),
        ]);

        let update = ActionNode::new(registry).run(&state).await.unwrap();
        let ids: Vec<&str> = update
            .messages
            .iter()
            .map(|m| match m {
                Message::ToolResult { tool_call_id, .. } => tool_call_id.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(update.messages[0].content(), "first");
        assert_eq!(update.messages[1].content(), "second");
    }

    #[tokio::test]
    async fn test_action_converts_failures_to_results() {
        let registry = ToolRegistry::new(vec![
            Arc::new(SlowEcho { name: "echo", delay_ms: 0 }),
            Arc::new(Failing),
            Arc::new(Panicking),
        ])
        .unwrap();
        let state = pending(vec![
            ToolCallRequest::new("1", "ghost", json!({})),
            ToolCallRequest::new("2", "echo", json!({"wrong": 1})),
            ToolCallRequest::new("3", "failing", json!({})),
            ToolCallRequest::new("4", "panicking", json!({})),
            ToolCallRequest::new("5", "echo", json!({"text": "still runs"})),
        ]);

        let update = ActionNode::new(registry).run(&state).await.unwrap();
        let contents: Vec<&str> = update.messages.iter().map(Message::content).collect();
        assert_eq!(contents[0], "Error: tool 'ghost' not found");
        assert!(contents[1].starts_with("Error: invalid arguments for tool 'echo'"));
        assert_eq!(contents[2], "Error executing command:\nboom");
        assert_eq!(contents[3], "Error: tool 'panicking' panicked");
        assert_eq!(contents[4], "still runs");
        assert_eq!(update.messages[0].tool_name(), Some("ghost"));
    }

    #[tokio::test]
    async fn test_action_without_pending_calls_is_an_error() {
        let state = ConversationState::seed(None, "q");
        let err = ActionNode::new(ToolRegistry::empty())
            .run(&state)
            .await
            .unwrap_err();
        assert!(matches!(err, AizError::Graph(GraphError::UnexpectedMessage(_))));
    }

    #[tokio::test]
    async fn test_reasoning_prepends_instructions() {
        let model = Arc::new(RecordingModel {
            reply: Message::assistant("ls"),
            seen: Mutex::new(Vec::new()),
        });
        let node = ReasoningNode::new(model.clone(), ToolRegistry::empty())
            .with_instructions("You supervise.");
        let state = ConversationState::seed(None, "list files");

        let update = node.run(&state).await.unwrap();
        assert_eq!(update.messages, vec![Message::assistant("ls")]);

        let seen = model.seen.lock().unwrap().clone();
        assert_eq!(seen[0], Message::system("You supervise."));
        assert_eq!(seen[1], Message::user("list files"));
        assert_eq!(state.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_reasoning_keeps_existing_system_message() {
        let model = Arc::new(RecordingModel {
            reply: Message::assistant("ls"),
            seen: Mutex::new(Vec::new()),
        });
        let node = ReasoningNode::new(model.clone(), ToolRegistry::empty())
            .with_instructions("ignored");
        let state = ConversationState::seed(Some("seeded"), "list files");

        node.run(&state).await.unwrap();
        let seen = model.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], Message::system("seeded"));
    }

    #[tokio::test]
    async fn test_reasoning_rejects_non_assistant_reply() {
        let model = Arc::new(RecordingModel {
            reply: Message::user("not a reply"),
            seen: Mutex::new(Vec::new()),
        });
        let err = ReasoningNode::new(model, ToolRegistry::empty())
            .run(&ConversationState::seed(None, "q"))
            .await
            .unwrap_err();
        assert!(matches!(err, AizError::Graph(GraphError::UnexpectedMessage(_))));
    }

    #[tokio::test]
    async fn test_formatting_uses_executor_result() {
        let mut state = pending(vec![ToolCallRequest::new("1", "command_executor", json!({}))]);
        state.messages.push(Message::tool_result(
            "1",
            "command_executor",
            "On branch main, nothing to commit",
        ));
        let update = FormattingNode::new("command_executor").run(&state).await.unwrap();
        assert_eq!(
            update.final_answer.as_deref(),
            Some("On branch main, nothing to commit")
        );
        assert!(update.messages.is_empty());
    }

    #[tokio::test]
    async fn test_formatting_fallback() {
        let state = ConversationState::seed(None, "q");
        let update = FormattingNode::new("command_executor").run(&state).await.unwrap();
        assert_eq!(update.final_answer.as_deref(), Some(NO_FINAL_OUTPUT));
    }
}
