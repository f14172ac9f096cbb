//! Tool catalog and dispatch table.
//!
//! Built once from an explicit provider list. Every tool name maps to
//! exactly one provider; collisions and malformed schemas are rejected at
//! construction so a running orchestrator never has to re-check them.

use super::{ProviderInfo, ToolArguments, ToolProvider, ToolResult, ToolSpec};
use crate::error::{KartError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Immutable registry of providers, their tools, and who owns which name.
pub struct ToolRegistry {
    providers: Vec<Arc<dyn ToolProvider>>,
    catalog: Vec<ToolSpec>,
    owners: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Build the registry, concatenating catalogs in provider order.
    pub fn new(providers: Vec<Arc<dyn ToolProvider>>) -> Result<Self> {
        let mut catalog = Vec::new();
        let mut owners: HashMap<String, usize> = HashMap::new();

        for (index, provider) in providers.iter().enumerate() {
            for spec in provider.catalog() {
                validate_spec(&spec)?;

                if let Some(&existing) = owners.get(&spec.name) {
                    return Err(KartError::DuplicateTool {
                        tool: spec.name,
                        first: providers[existing].info().name,
                        second: provider.info().name,
                    });
                }

                owners.insert(spec.name.clone(), index);
                catalog.push(spec);
            }
        }

        debug!(
            "Registered {} tools from {} providers",
            catalog.len(),
            providers.len()
        );

        Ok(Self {
            providers,
            catalog,
            owners,
        })
    }

    /// All tools, in provider order.
    pub fn catalog(&self) -> &[ToolSpec] {
        &self.catalog
    }

    /// The registered providers, in order.
    pub fn providers(&self) -> &[Arc<dyn ToolProvider>] {
        &self.providers
    }

    /// Metadata of the provider that owns `name`.
    pub fn owner_of(&self, name: &str) -> Option<ProviderInfo> {
        self.owners.get(name).map(|&i| self.providers[i].info())
    }

    /// Route a call to the owning provider.
    ///
    /// Unknown names produce an error result rather than a fault, so a
    /// hallucinated tool cannot break the agent loop.
    pub async fn execute(&self, name: &str, arguments: &ToolArguments) -> ToolResult {
        match self.owners.get(name) {
            Some(&index) => self.providers[index].handle(name, arguments).await,
            None => ToolResult::unknown_tool(name),
        }
    }
}

fn validate_spec(spec: &ToolSpec) -> Result<()> {
    let invalid = |reason: &str| KartError::InvalidSchema {
        tool: spec.name.clone(),
        reason: reason.to_string(),
    };

    if spec.name.trim().is_empty() {
        return Err(invalid("tool name is empty"));
    }

    let schema = spec
        .parameters
        .as_object()
        .ok_or_else(|| invalid("parameters must be a JSON object"))?;

    if schema.get("type").and_then(Value::as_str) != Some("object") {
        return Err(invalid("parameters must declare \"type\": \"object\""));
    }

    let properties = match schema.get("properties") {
        None => None,
        Some(Value::Object(props)) => Some(props),
        Some(_) => return Err(invalid("\"properties\" must be an object")),
    };

    if let Some(required) = schema.get("required") {
        let required = required
            .as_array()
            .ok_or_else(|| invalid("\"required\" must be an array"))?;
        for field in required {
            let field = field
                .as_str()
                .ok_or_else(|| invalid("\"required\" entries must be strings"))?;
            if !properties.is_some_and(|p| p.contains_key(field)) {
                return Err(invalid(&format!(
                    "required field '{}' is not a declared property",
                    field
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolStatus;
    use async_trait::async_trait;
    use serde_json::json;

    struct StaticProvider {
        name: &'static str,
        tools: Vec<&'static str>,
    }

    #[async_trait]
    impl ToolProvider for StaticProvider {
        fn info(&self) -> ProviderInfo {
            ProviderInfo {
                name: self.name.to_string(),
                description: String::new(),
                base_url: None,
                resources: Vec::new(),
            }
        }

        fn catalog(&self) -> Vec<ToolSpec> {
            self.tools
                .iter()
                .map(|t| ToolSpec::new(t, "test", json!({"type": "object", "properties": {}})))
                .collect()
        }

        async fn handle(&self, name: &str, _arguments: &ToolArguments) -> ToolResult {
            ToolResult::success(json!({"provider": self.name, "tool": name}))
        }
    }

    fn provider(name: &'static str, tools: &[&'static str]) -> Arc<dyn ToolProvider> {
        Arc::new(StaticProvider {
            name,
            tools: tools.to_vec(),
        })
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(vec![
            provider("geo", &["forward_geocode", "reverse_geocode"]),
            provider("routing", &["route"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_catalog_preserves_provider_order() {
        let names: Vec<_> = registry().catalog().iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["forward_geocode", "reverse_geocode", "route"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = ToolRegistry::new(vec![
            provider("geo", &["route"]),
            provider("routing", &["route"]),
        ])
        .err()
        .unwrap();

        match err {
            KartError::DuplicateTool { tool, first, second } => {
                assert_eq!(tool, "route");
                assert_eq!(first, "geo");
                assert_eq!(second, "routing");
            }
            other => panic!("Expected DuplicateTool, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_schemas_rejected() {
        let bad = vec![
            json!("not an object"),
            json!({"type": "array"}),
            json!({"type": "object", "properties": []}),
            json!({"type": "object", "properties": {"a": {}}, "required": ["b"]}),
        ];

        for parameters in bad {
            let spec = ToolSpec::new("broken", "", parameters.clone());
            assert!(validate_spec(&spec).is_err(), "accepted {}", parameters);
        }
    }

    #[tokio::test]
    async fn test_execute_routes_to_owner() {
        let registry = registry();
        for name in ["forward_geocode", "reverse_geocode", "route"] {
            let result = registry.execute(name, &ToolArguments::new()).await;
            assert_eq!(result.status(), ToolStatus::Success);
            assert_eq!(result.data().unwrap()["tool"], name);
        }
        let result = registry.execute("route", &ToolArguments::new()).await;
        assert_eq!(result.data().unwrap()["provider"], "routing");
        assert_eq!(registry.owner_of("reverse_geocode").unwrap().name, "geo");
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let result = registry().execute("summon_dragon", &ToolArguments::new()).await;
        assert_eq!(result.status(), ToolStatus::Error);
        assert!(result.message().unwrap().contains("summon_dragon"));
        assert!(result.data().is_none());
    }
}
