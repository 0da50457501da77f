// SPDX-License-Identifier: MIT

//! Agent development kit: messages, state, models, tools and the graph engine

pub mod agent;
pub mod error;
pub mod graph;
pub mod message;
pub mod model;
pub mod runtime;
pub mod state;
pub mod tool;
