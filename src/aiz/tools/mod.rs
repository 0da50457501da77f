// SPDX-License-Identifier: MIT

//! Tools the assistant exposes to its models

pub mod command_executor;
pub mod command_help;
pub mod runner;

pub use command_executor::{CommandExecutorTool, COMMAND_EXECUTOR, DEFAULT_EXECUTOR_TIMEOUT};
pub use command_help::{CommandHelpTool, COMMAND_HELP, DEFAULT_HELP_TIMEOUT};
pub use runner::{CommandOutput, CommandRunner, RunError, ShellRunner};
