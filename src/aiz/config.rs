// SPDX-License-Identifier: MIT

//! Application configuration: a YAML file with `${VAR}` expansion, or the
//! process environment

use crate::adk::error::AizError;
use crate::adk::graph::{CancellationPolicy, DEFAULT_RECURSION_LIMIT};
use crate::adk::model::ProviderConfig;
use crate::aiz::tools::{DEFAULT_EXECUTOR_TIMEOUT, DEFAULT_HELP_TIMEOUT};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::Path;
use std::time::Duration;

/// Environment variables read by [`AppConfig::from_env`], keyed by the
/// provider field they fill
const ENV_FIELDS: &[(&str, &[&str])] = &[
    ("provider", &["AIZ_PROVIDER"]),
    ("model_id", &["AIZ_MODEL_ID"]),
    ("api_key", &["ANTHROPIC_API_KEY"]),
    ("aws_access_key_id", &["AWS_ACCESS_KEY_ID"]),
    ("aws_secret_access_key", &["AWS_SECRET_ACCESS_KEY"]),
    ("aws_session_token", &["AWS_SESSION_TOKEN"]),
    ("region_name", &["AWS_REGION", "AWS_DEFAULT_REGION"]),
];

/// Knobs for the agent graphs and their tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub executor_timeout_secs: u64,
    pub help_timeout_secs: u64,
    pub recursion_limit: u32,
    pub on_cancel: CancellationPolicy,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            executor_timeout_secs: DEFAULT_EXECUTOR_TIMEOUT.as_secs(),
            help_timeout_secs: DEFAULT_HELP_TIMEOUT.as_secs(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            on_cancel: CancellationPolicy::default(),
        }
    }
}

impl AgentSettings {
    pub fn executor_timeout(&self) -> Duration {
        Duration::from_secs(self.executor_timeout_secs)
    }

    pub fn help_timeout(&self) -> Duration {
        Duration::from_secs(self.help_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub settings: AgentSettings,
}

impl AppConfig {
    /// Load a YAML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AizError> {
        let path = path.as_ref();
        log::info!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Parse YAML text, expanding `${VAR}` in string values.
    ///
    /// Entries that reference an unset variable are dropped.
    pub fn from_yaml_str(text: &str) -> Result<Self, AizError> {
        let raw: Value = serde_yaml::from_str(text)?;
        let expanded = expand_env(raw).unwrap_or(Value::Null);
        if expanded.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_value(expanded)?)
    }

    /// Provider mapping built from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut provider = ProviderConfig::new();
        for (field, vars) in ENV_FIELDS {
            let value = vars
                .iter()
                .filter_map(|var| lookup(*var))
                .find(|v| !v.is_empty());
            if let Some(value) = value {
                provider.set(*field, value);
            }
        }
        Self {
            provider,
            settings: AgentSettings::default(),
        }
    }

    /// Command-line overrides for the provider mapping
    pub fn with_overrides(mut self, provider: Option<&str>, model_id: Option<&str>) -> Self {
        if let Some(provider) = provider {
            self.provider.set("provider", provider);
        }
        if let Some(model_id) = model_id {
            self.provider.set("model_id", model_id);
        }
        self
    }
}

fn expand_env(value: Value) -> Option<Value> {
    match value {
        Value::String(s) => match shellexpand::env(&s) {
            Ok(expanded) => Some(Value::String(expanded.into_owned())),
            Err(e) => {
                log::debug!("Dropping configuration value: {}", e);
                None
            }
        },
        Value::Mapping(map) => Some(Value::Mapping(
            map.into_iter()
                .filter_map(|(k, v)| expand_env(v).map(|v| (k, v)))
                .collect(),
        )),
        Value::Sequence(items) => Some(Value::Sequence(
            items.into_iter().filter_map(expand_env).collect(),
        )),
        other => Some(other),
    }
}
