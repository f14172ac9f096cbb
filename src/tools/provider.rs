//! The capability every backend exposes to the dispatcher.

use super::{ErrorCode, ToolResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Arguments the model supplied for a tool call.
pub type ToolArguments = Map<String, Value>;

/// A named, schema-described operation offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

impl ToolSpec {
    pub fn new(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// Descriptive metadata about a provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub description: String,
    pub base_url: Option<String>,
    pub resources: Vec<String>,
}

/// A backend that owns a fixed set of tools.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Provider metadata.
    fn info(&self) -> ProviderInfo;

    /// The tools this provider handles. Must be stable for the process lifetime.
    fn catalog(&self) -> Vec<ToolSpec>;

    /// Run one of this provider's tools. Failures are reported in the result, never raised.
    async fn handle(&self, name: &str, arguments: &ToolArguments) -> ToolResult;
}

/// Decode tool arguments into a typed struct, or an `INVALID_INPUT` result.
pub fn decode_arguments<T: DeserializeOwned>(
    tool: &str,
    arguments: &ToolArguments,
) -> std::result::Result<T, ToolResult> {
    serde_json::from_value(Value::Object(arguments.clone())).map_err(|e| {
        ToolResult::error(
            ErrorCode::InvalidInput,
            format!("Invalid arguments for {}: {}", tool, e),
        )
    })
}
