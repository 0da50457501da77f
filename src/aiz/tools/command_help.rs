// SPDX-License-Identifier: MIT

use super::runner::{CommandRunner, RunError, ShellRunner};
use crate::adk::error::ToolError;
use crate::adk::tool::{input_schema, parse_args, Tool};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const COMMAND_HELP: &str = "command_help";
pub const DEFAULT_HELP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize, JsonSchema)]
struct CommandInput {
    /// The command-line tool to get help for, e.g. `git` or `git rebase`
    command: String,
}

static SCHEMA: Lazy<Value> = Lazy::new(input_schema::<CommandInput>);

/// Fetches the `--help` output of a command-line tool
pub struct CommandHelpTool {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl CommandHelpTool {
    pub fn new() -> Self {
        Self::with_runner(Arc::new(ShellRunner))
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            timeout: DEFAULT_HELP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for CommandHelpTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CommandHelpTool {
    fn name(&self) -> &str {
        COMMAND_HELP
    }

    fn description(&self) -> &str {
        "Useful for getting the --help output of a command-line tool."
    }

    fn schema(&self) -> &Value {
        &SCHEMA
    }

    async fn ainvoke(&self, args: Value) -> Result<String, ToolError> {
        let input: CommandInput = parse_args(COMMAND_HELP, args)?;
        let command = input.command;
        let mut words = shlex::split(&command)
            .ok_or_else(|| ToolError::validation(COMMAND_HELP, "command has unbalanced quotes"))?
            .into_iter();
        let program = words
            .next()
            .ok_or_else(|| ToolError::validation(COMMAND_HELP, "command must not be empty"))?;
        let mut args: Vec<String> = words.collect();
        args.push("--help".to_string());

        log::info!("Looking up help for '{}'", command);
        match self.runner.run(&program, &args, self.timeout).await {
            Ok(out) if out.success => Ok(out.stdout),
            Ok(out) => {
                log::warn!("Help lookup for '{}' exited with an error", command);
                // Many tools print usage to stderr when they reject --help
                if out.stderr.is_empty() {
                    Ok(out.stdout)
                } else {
                    Ok(out.stderr)
                }
            }
            Err(RunError::NotFound) => Err(ToolError::execution(format!(
                "Error: The command '{}' was not found.",
                program
            ))),
            Err(RunError::TimedOut) => Err(ToolError::timeout(command)),
            Err(RunError::Io(e)) => Err(ToolError::execution(format!(
                "Error: could not run '{}': {}",
                program, e
            ))),
        }
    }
}
