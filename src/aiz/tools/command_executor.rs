// SPDX-License-Identifier: MIT

use super::runner::{CommandRunner, RunError, ShellRunner};
use crate::adk::error::ToolError;
use crate::adk::tool::{input_schema, parse_args, Tool};
use crate::aiz::consent::ConsentProvider;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const COMMAND_EXECUTOR: &str = "command_executor";
pub const DEFAULT_EXECUTOR_TIMEOUT: Duration = Duration::from_secs(60);

const NO_OUTPUT: &str = "Command executed successfully with no output.";

#[derive(Debug, Deserialize, JsonSchema)]
struct ExecutorInput {
    /// The shell command string to execute
    command: String,
}

static SCHEMA: Lazy<Value> = Lazy::new(input_schema::<ExecutorInput>);

/// Runs a shell command once the operator approves it
pub struct CommandExecutorTool {
    consent: Arc<dyn ConsentProvider>,
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    // One prompt on the terminal at a time
    prompt_turn: Mutex<()>,
}

impl CommandExecutorTool {
    pub fn new(consent: Arc<dyn ConsentProvider>) -> Self {
        Self {
            consent,
            runner: Arc::new(ShellRunner),
            timeout: DEFAULT_EXECUTOR_TIMEOUT,
            prompt_turn: Mutex::new(()),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn approved(&self, command: &str) -> bool {
        let _turn = self.prompt_turn.lock().await;
        let consent = Arc::clone(&self.consent);
        let proposed = format!("$ {}", command);
        // The prompt blocks on terminal input
        tokio::task::spawn_blocking(move || consent.ask(&proposed, false))
            .await
            .unwrap_or(false)
    }
}

#[async_trait]
impl Tool for CommandExecutorTool {
    fn name(&self) -> &str {
        COMMAND_EXECUTOR
    }

    fn description(&self) -> &str {
        "Executes a shell command after receiving user confirmation. Use this as the final step."
    }

    fn schema(&self) -> &Value {
        &SCHEMA
    }

    async fn ainvoke(&self, args: Value) -> Result<String, ToolError> {
        let input: ExecutorInput = parse_args(COMMAND_EXECUTOR, args)?;
        let command = input.command;

        if !self.approved(&command).await {
            log::info!("Operator declined: {}", command);
            return Err(ToolError::Cancelled);
        }

        log::info!("Executing: {}", command);
        let script = vec!["-c".to_string(), command.clone()];
        match self.runner.run("sh", &script, self.timeout).await {
            Ok(out) if out.success => {
                if out.stdout.is_empty() {
                    Ok(NO_OUTPUT.to_string())
                } else {
                    Ok(out.stdout)
                }
            }
            Ok(out) => Err(ToolError::execution(format!(
                "Error executing command:\n{}",
                out.stderr
            ))),
            Err(RunError::TimedOut) => Err(ToolError::timeout(command)),
            Err(RunError::NotFound) => Err(ToolError::execution(
                "Error executing command:\nsh: not found",
            )),
            Err(RunError::Io(e)) => Err(ToolError::execution(format!(
                "Error executing command:\n{}",
                e
            ))),
        }
    }
}
