// SPDX-License-Identifier: MIT

use crate::adk::agent::GraphAgent;
use crate::adk::error::AizError;
use crate::adk::graph::{
    ActionNode, Branch, GeneratorRouter, GraphBuilder, NodeKind, ReasoningNode, Target,
    ToolRegistry,
};
use crate::adk::model::Model;
use crate::adk::tool::Tool;
use crate::aiz::config::AgentSettings;
use crate::aiz::prompts::GENERATOR_INSTRUCTIONS;
use crate::aiz::tools::CommandHelpTool;
use std::sync::Arc;

pub const GENERATOR_AGENT: &str = "command_generator";

/// Generator tier with the shell-backed `command_help` tool
pub fn build_generator_agent(
    model: Arc<dyn Model>,
    settings: &AgentSettings,
) -> Result<GraphAgent, AizError> {
    let help: Arc<dyn Tool> = Arc::new(CommandHelpTool::new().with_timeout(settings.help_timeout()));
    build_generator_agent_with_tools(model, vec![help], settings)
}

/// Generator tier: reason, consult tools while the model asks for them,
/// stop at the first plain answer
pub fn build_generator_agent_with_tools(
    model: Arc<dyn Model>,
    tools: Vec<Arc<dyn Tool>>,
    settings: &AgentSettings,
) -> Result<GraphAgent, AizError> {
    let tools = ToolRegistry::new(tools)?;

    let mut builder = GraphBuilder::new(GENERATOR_AGENT);
    builder
        .add_node(
            NodeKind::Reasoning,
            Arc::new(ReasoningNode::new(model, tools.clone())),
        )
        .add_node(NodeKind::Action, Arc::new(ActionNode::new(tools)))
        .add_conditional_edges(
            NodeKind::Reasoning,
            [
                (Branch::Action, Target::Node(NodeKind::Action)),
                (Branch::End, Target::End),
            ],
        )
        .add_edge(NodeKind::Action, Target::Node(NodeKind::Reasoning))
        .set_router(Arc::new(GeneratorRouter))
        .set_recursion_limit(settings.recursion_limit);

    let agent = GraphAgent::new(
        GENERATOR_AGENT,
        "Generates a single shell command for an objective",
        builder.compile()?,
    )
    .with_instructions(GENERATOR_INSTRUCTIONS);
    log::info!("Built agent {}", GENERATOR_AGENT);
    Ok(agent)
}
