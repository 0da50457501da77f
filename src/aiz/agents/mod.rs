// SPDX-License-Identifier: MIT

//! The two agent tiers: a command generator and the supervisor that
//! delegates to it

pub mod generator;
pub mod supervisor;

pub use generator::{build_generator_agent, build_generator_agent_with_tools, GENERATOR_AGENT};
pub use supervisor::{
    build_supervisor_agent, build_supervisor_agent_with_tools, generator_specialist_tool,
    GENERATOR_SPECIALIST, SUPERVISOR_AGENT,
};
