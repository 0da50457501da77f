// SPDX-License-Identifier: MIT

//! Provider registry - resolves a configuration mapping to a model binding

use super::anthropic::AnthropicModel;
use super::bedrock::BedrockModel;
use super::{GenerationConfig, Model};
use crate::adk::error::ModelConfigurationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Provider configuration: a `provider` key, a `model_id`, and
/// backend-specific credential and parameter fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderConfig(Map<String, Value>);

impl ProviderConfig {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Builder-style field setter
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Non-empty string field
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn require_str(&self, provider: &str, key: &str) -> Result<&str, ModelConfigurationError> {
        self.get_str(key)
            .ok_or_else(|| ModelConfigurationError::missing_field(provider, key))
    }

    /// Numeric field; numeric strings (e.g. from env expansion) are accepted
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_f32(&self, key: &str) -> Option<f32> {
        self.get_f64(key).map(|v| v as f32)
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Name of the backend
    pub fn provider(&self) -> Result<&str, ModelConfigurationError> {
        self.get_str("provider").ok_or_else(|| {
            ModelConfigurationError::new("configuration must include a 'provider' key")
        })
    }

    pub fn model_id(&self) -> Result<&str, ModelConfigurationError> {
        let provider = self.get_str("provider").unwrap_or("unknown");
        self.require_str(provider, "model_id")
    }

    /// Sampling parameters shared by all backends
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.get_f32("temperature"),
            max_output_tokens: self.get_u32("max_tokens"),
            top_p: self.get_f32("top_p"),
            top_k: self.get_u32("top_k"),
        }
    }
}

type ModelBuilder = fn(&ProviderConfig) -> Result<Arc<dyn Model>, ModelConfigurationError>;

/// Registry of model backends keyed by lowercase provider name
#[derive(Clone)]
pub struct ProviderFactory {
    builders: BTreeMap<String, ModelBuilder>,
}

impl ProviderFactory {
    /// Factory with the built-in backends registered
    pub fn new() -> Self {
        let mut factory = Self::empty();
        factory.register("anthropic", |config| {
            Ok(Arc::new(AnthropicModel::from_config(config)?))
        });
        factory.register("aws_bedrock", |config| {
            Ok(Arc::new(BedrockModel::from_config(config)?))
        });
        factory
    }

    pub fn empty() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, provider: &str, builder: ModelBuilder) {
        self.builders.insert(provider.to_lowercase(), builder);
    }

    /// Registered provider names, sorted
    pub fn supported(&self) -> Vec<&str> {
        self.builders.keys().map(String::as_str).collect()
    }

    /// Build a model from a configuration mapping.
    ///
    /// Fails for a missing or unknown `provider`, a missing `model_id`, or
    /// missing backend-specific fields.
    pub fn build(&self, config: &ProviderConfig) -> Result<Arc<dyn Model>, ModelConfigurationError> {
        let provider = config.provider()?;
        let builder = self.builders.get(&provider.to_lowercase()).ok_or_else(|| {
            ModelConfigurationError::new(format!(
                "unsupported model provider: '{}'. Supported providers are: {:?}",
                provider,
                self.supported()
            ))
        })?;
        config.model_id()?;

        log::info!(
            "Building model '{}' for provider '{}'",
            config.get_str("model_id").unwrap_or_default(),
            provider
        );
        builder(config)
    }
}

impl Default for ProviderFactory {
    fn default() -> Self {
        Self::new()
    }
}
