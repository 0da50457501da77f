// SPDX-License-Identifier: MIT

//! Routers - pure functions of the conversation state that pick the next branch

use crate::adk::error::CANCELLED_BY_USER;
use crate::adk::message::Message;
use crate::adk::state::ConversationState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Enumerated outcome of a routing decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    /// Dispatch the pending tool requests
    Action,
    /// Turn the executor's result into the final answer
    FinalOutput,
    /// Hand control back to the model
    Reconsider,
    End,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Branch::Action => "action",
            Branch::FinalOutput => "final_output",
            Branch::Reconsider => "reconsider",
            Branch::End => "end",
        };
        f.write_str(name)
    }
}

pub trait Router: Send + Sync {
    /// Select the next branch. Must depend on `state` only.
    fn route(&self, state: &ConversationState) -> Branch;

    /// Every branch `route` can return
    fn branches(&self) -> &'static [Branch];
}

fn has_pending_calls(state: &ConversationState) -> bool {
    matches!(state.last_message(), Some(m) if !m.tool_calls().is_empty())
}

/// Single-tier router: tools while the model asks for them, then stop
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratorRouter;

impl Router for GeneratorRouter {
    fn route(&self, state: &ConversationState) -> Branch {
        if has_pending_calls(state) {
            Branch::Action
        } else {
            Branch::End
        }
    }

    fn branches(&self) -> &'static [Branch] {
        &[Branch::Action, Branch::End]
    }
}

/// What the supervisor does when the operator declines execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancellationPolicy {
    /// Report the cancellation as the final answer
    #[default]
    Format,
    /// Let the model see the cancellation and decide again
    Reconsider,
}

/// Supervisor router keyed on the designated executor tool
#[derive(Debug, Clone)]
pub struct SupervisorRouter {
    executor: String,
    on_cancel: CancellationPolicy,
}

impl SupervisorRouter {
    pub fn new(executor: impl Into<String>) -> Self {
        Self {
            executor: executor.into(),
            on_cancel: CancellationPolicy::default(),
        }
    }

    pub fn with_cancellation_policy(mut self, policy: CancellationPolicy) -> Self {
        self.on_cancel = policy;
        self
    }

    pub fn executor(&self) -> &str {
        &self.executor
    }
}

impl Router for SupervisorRouter {
    fn route(&self, state: &ConversationState) -> Branch {
        match state.last_message() {
            Some(m) if !m.tool_calls().is_empty() => Branch::Action,
            Some(Message::ToolResult { name, content, .. }) if *name == self.executor => {
                if content == CANCELLED_BY_USER && self.on_cancel == CancellationPolicy::Reconsider {
                    Branch::Reconsider
                } else {
                    Branch::FinalOutput
                }
            }
            _ => Branch::End,
        }
    }

    fn branches(&self) -> &'static [Branch] {
        &[
            Branch::Action,
            Branch::FinalOutput,
            Branch::Reconsider,
            Branch::End,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::message::ToolCallRequest;
    use crate::adk::state::StateUpdate;
    use serde_json::json;

    fn state_with(messages: Vec<Message>) -> ConversationState {
        let mut state = ConversationState::seed(None, "q");
        state.messages.extend(messages);
        state
    }

    fn calling(tool: &str) -> Message {
        Message::assistant_with_calls("", vec![ToolCallRequest::new("c1", tool, json!({}))])
    }

    #[test]
    fn test_generator_routes_pending_calls_to_action() {
        let state = state_with(vec![
            Message::assistant("earlier"),
            calling("command_help"),
        ]);
        assert_eq!(GeneratorRouter.route(&state), Branch::Action);
    }

    #[test]
    fn test_generator_ends_on_plain_answer() {
        let state = state_with(vec![Message::assistant("git status")]);
        assert_eq!(GeneratorRouter.route(&state), Branch::End);
        assert_eq!(GeneratorRouter.route(&ConversationState::default()), Branch::End);
    }

    #[test]
    fn test_supervisor_rule_order() {
        let router = SupervisorRouter::new("command_executor");

        let state = state_with(vec![calling("command_executor")]);
        assert_eq!(router.route(&state), Branch::Action);

        let mut state = state_with(vec![calling("command_executor")]);
        state
            .apply(StateUpdate::message(Message::tool_result(
                "c1",
                "command_executor",
                "On branch main",
            )))
            .unwrap();
        assert_eq!(router.route(&state), Branch::FinalOutput);

        let state = state_with(vec![
            calling("command_generator_specialist"),
            Message::tool_result("c1", "command_generator_specialist", "git status"),
        ]);
        assert_eq!(router.route(&state), Branch::End);

        let state = state_with(vec![Message::assistant("done")]);
        assert_eq!(router.route(&state), Branch::End);
    }

    #[test]
    fn test_supervisor_cancellation_policy() {
        let state = state_with(vec![
            calling("command_executor"),
            Message::tool_result("c1", "command_executor", CANCELLED_BY_USER),
        ]);

        let default = SupervisorRouter::new("command_executor");
        assert_eq!(default.route(&state), Branch::FinalOutput);

        let reconsider = SupervisorRouter::new("command_executor")
            .with_cancellation_policy(CancellationPolicy::Reconsider);
        assert_eq!(reconsider.route(&state), Branch::Reconsider);
    }

    #[test]
    fn test_route_is_idempotent() {
        let router = SupervisorRouter::new("command_executor");
        let state = state_with(vec![
            calling("command_executor"),
            Message::tool_result("c1", "command_executor", "ok"),
        ]);
        let first = router.route(&state);
        let second = router.route(&state);
        assert_eq!(first, second);
    }

    #[test]
    fn test_branches_cover_outputs() {
        assert!(GeneratorRouter.branches().contains(&Branch::Action));
        assert_eq!(SupervisorRouter::new("x").branches().len(), 4);
    }

    #[test]
    fn test_policy_deserializes_lowercase() {
        let policy: CancellationPolicy = serde_yaml::from_str("reconsider").unwrap();
        assert_eq!(policy, CancellationPolicy::Reconsider);
    }
}
