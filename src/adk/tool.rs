// SPDX-License-Identifier: MIT

use super::error::ToolError;
use super::runtime;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde_json::{json, Value};

/// Trait for tools that can be called by agents.
///
/// # Notes
/// - `name()`, `description()` and `schema()` return borrowed data; store
///   these values in struct fields or statics
/// - `invoke` and `ainvoke` must behave identically; `ainvoke` exists so a
///   model loop does not block its scheduler thread while the tool runs
/// - Recoverable input problems are reported as `ToolError`, never panics
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool name (must be unique within a graph's tool set)
    fn name(&self) -> &str;

    /// Returns a human-readable description of what the tool does
    fn description(&self) -> &str;

    /// Returns the JSON schema for the tool's input parameters
    fn schema(&self) -> &Value;

    /// Execute the tool without blocking the caller's scheduler
    async fn ainvoke(&self, args: Value) -> Result<String, ToolError>;

    /// Execute the tool, blocking the calling thread until it finishes.
    ///
    /// Must not be called from inside an async runtime.
    fn invoke(&self, args: Value) -> Result<String, ToolError> {
        runtime::block_on(self.ainvoke(args)).map_err(|e| ToolError::execution(e.to_string()))?
    }
}

/// JSON schema for a tool argument struct.
///
/// Root metadata (`$schema`, `title`) is stripped; providers expect a bare
/// object schema.
pub fn input_schema<T: JsonSchema>() -> Value {
    let root = schemars::schema_for!(T);
    let mut value = serde_json::to_value(root).unwrap_or_else(|_| json!({"type": "object"}));
    if let Value::Object(map) = &mut value {
        map.remove("$schema");
        map.remove("title");
    }
    value
}

/// Deserialize validated tool arguments into their typed form
pub fn parse_args<T: serde::de::DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::validation(tool, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    #[serde(deny_unknown_fields)]
    struct EchoArgs {
        /// Text to echo back
        text: String,
    }

    static ECHO_SCHEMA: Lazy<Value> = Lazy::new(input_schema::<EchoArgs>);

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its input"
        }

        fn schema(&self) -> &Value {
            &ECHO_SCHEMA
        }

        async fn ainvoke(&self, args: Value) -> Result<String, ToolError> {
            let args: EchoArgs = parse_args(self.name(), args)?;
            Ok(args.text)
        }
    }

    #[test]
    fn test_input_schema_shape() {
        let schema = &*ECHO_SCHEMA;
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["text"]["type"], "string");
        assert_eq!(schema["required"], json!(["text"]));
        assert_eq!(schema["additionalProperties"], json!(false));
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("title").is_none());
    }

    #[test]
    fn test_blocking_invoke_matches_async() {
        let tool = EchoTool;
        let blocking = tool.invoke(json!({"text": "hi"})).unwrap();
        let asynchronous = runtime::block_on(tool.ainvoke(json!({"text": "hi"})))
            .unwrap()
            .unwrap();
        assert_eq!(blocking, asynchronous);
    }

    #[tokio::test]
    async fn test_parse_args_reports_validation_error() {
        let err = EchoTool.ainvoke(json!({"wrong": 1})).await.unwrap_err();
        assert!(matches!(err, ToolError::Validation { ref tool, .. } if tool == "echo"));
    }

    #[tokio::test]
    async fn test_blocking_invoke_inside_runtime_is_an_error() {
        let err = EchoTool.invoke(json!({"text": "hi"})).unwrap_err();
        assert!(matches!(err, ToolError::Execution(_)));
    }
}
