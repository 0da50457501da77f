// SPDX-License-Identifier: MIT

//! Graph module - nodes, routers and the engine that drives them

pub mod engine;
pub mod node;
pub mod registry;
pub mod router;

pub use engine::{
    CompiledGraph, Edge, EngineState, GraphBuilder, GraphEvent, RunResult, Target,
    DEFAULT_RECURSION_LIMIT,
};
pub use node::{ActionNode, FormattingNode, Node, NodeKind, ReasoningNode, NO_FINAL_OUTPUT};
pub use registry::ToolRegistry;
pub use router::{Branch, CancellationPolicy, GeneratorRouter, Router, SupervisorRouter};
