// SPDX-License-Identifier: MIT

//! aiz - turns a natural-language objective into an executed shell command

pub mod agents;
pub mod config;
pub mod consent;
pub mod prompts;
pub mod tools;
