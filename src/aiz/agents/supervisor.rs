// SPDX-License-Identifier: MIT

use super::generator::build_generator_agent;
use crate::adk::agent::{GraphAgent, SubAgentTool};
use crate::adk::error::AizError;
use crate::adk::graph::{
    ActionNode, Branch, FormattingNode, GraphBuilder, NodeKind, ReasoningNode, SupervisorRouter,
    Target, ToolRegistry,
};
use crate::adk::model::Model;
use crate::adk::tool::Tool;
use crate::aiz::config::AgentSettings;
use crate::aiz::consent::ConsentProvider;
use crate::aiz::prompts::SUPERVISOR_INSTRUCTIONS;
use crate::aiz::tools::{CommandExecutorTool, COMMAND_EXECUTOR};
use std::sync::Arc;

pub const SUPERVISOR_AGENT: &str = "supervisor";
pub const GENERATOR_SPECIALIST: &str = "command_generator_specialist";

/// The generator agent behind the single-tool contract the supervisor sees
pub fn generator_specialist_tool(generator: Arc<GraphAgent>) -> SubAgentTool {
    SubAgentTool::new(
        GENERATOR_SPECIALIST,
        "Use this specialist agent to generate a precise shell command. \
         The input must be the user's full, original objective.",
        generator,
    )
}

/// Supervisor tier delegating to a generator on the same model and running
/// the result through the consent-gated executor
pub fn build_supervisor_agent(
    model: Arc<dyn Model>,
    consent: Arc<dyn ConsentProvider>,
    settings: &AgentSettings,
) -> Result<GraphAgent, AizError> {
    let generator = Arc::new(build_generator_agent(Arc::clone(&model), settings)?);
    let executor = CommandExecutorTool::new(consent).with_timeout(settings.executor_timeout());
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(generator_specialist_tool(generator)),
        Arc::new(executor),
    ];
    build_supervisor_agent_with_tools(model, tools, settings)
}

/// Supervisor graph over an arbitrary tool set. The router treats
/// `command_executor` as the executor tool.
pub fn build_supervisor_agent_with_tools(
    model: Arc<dyn Model>,
    tools: Vec<Arc<dyn Tool>>,
    settings: &AgentSettings,
) -> Result<GraphAgent, AizError> {
    let tools = ToolRegistry::new(tools)?;
    let router = SupervisorRouter::new(COMMAND_EXECUTOR).with_cancellation_policy(settings.on_cancel);

    let mut builder = GraphBuilder::new(SUPERVISOR_AGENT);
    builder
        .add_node(
            NodeKind::Reasoning,
            Arc::new(
                ReasoningNode::new(model, tools.clone()).with_instructions(SUPERVISOR_INSTRUCTIONS),
            ),
        )
        .add_node(NodeKind::Action, Arc::new(ActionNode::new(tools)))
        .add_node(
            NodeKind::Formatting,
            Arc::new(FormattingNode::new(COMMAND_EXECUTOR)),
        )
        .add_conditional_edges(
            NodeKind::Reasoning,
            [
                (Branch::Action, Target::Node(NodeKind::Action)),
                (Branch::FinalOutput, Target::Node(NodeKind::Formatting)),
                (Branch::Reconsider, Target::Node(NodeKind::Reasoning)),
                (Branch::End, Target::End),
            ],
        )
        // After tools ran, only an executor result leaves the loop
        .add_conditional_edges(
            NodeKind::Action,
            [
                (Branch::Action, Target::Node(NodeKind::Action)),
                (Branch::FinalOutput, Target::Node(NodeKind::Formatting)),
                (Branch::Reconsider, Target::Node(NodeKind::Reasoning)),
                (Branch::End, Target::Node(NodeKind::Reasoning)),
            ],
        )
        .add_edge(NodeKind::Formatting, Target::End)
        .set_router(Arc::new(router))
        .set_recursion_limit(settings.recursion_limit);

    log::info!("Built agent {}", SUPERVISOR_AGENT);
    Ok(GraphAgent::new(
        SUPERVISOR_AGENT,
        "Generates, confirms and executes a shell command",
        builder.compile()?,
    ))
}
