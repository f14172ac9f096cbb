//! Prompt templates for Kart.
//!
//! The agent's system directive can be replaced by placing an `agent.toml`
//! file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub agent: AgentPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the map agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    pub system: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful map assistant that helps users with geographic queries.
You have access to three map services:

1. **Geocoding Service** - For converting addresses to coordinates and vice versa, plus POI search
2. **Routing Service** - For calculating routes between locations, distance matrices, and trace matching
3. **Tiles/Metadata Service** - For information about map tile providers

When a user asks a question:
1. Identify which service(s) are most relevant
2. Call the appropriate tool(s) with the correct parameters
3. Present the results in a clear, concise way with proper units (km, minutes, meters)
4. When reporting distances, refer to them as "between [location A] and [location B]" - do NOT say "from your location" since you don't know the user's location
5. Always include units in your responses (km for distance, minutes for time, meters for short distances)

Be conversational and helpful. If something fails, explain what went wrong clearly."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, overriding defaults with files from `custom_dir`.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let agent_path = custom_path.join("agent.toml");
            if agent_path.exists() {
                let content = std::fs::read_to_string(&agent_path)?;
                prompts.agent = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// The system directive with custom variables substituted.
    pub fn system_prompt(&self) -> String {
        Self::render(&self.agent.system, &self.variables)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.agent.system.contains("Routing Service"));
        assert_eq!(prompts.system_prompt(), prompts.agent.system);
    }

    #[test]
    fn test_render_template() {
        let template = "Prefer {{units}} and answer in {{language}}.";
        let mut vars = HashMap::new();
        vars.insert("units".to_string(), "kilometres".to_string());
        vars.insert("language".to_string(), "Norwegian".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Prefer kilometres and answer in Norwegian.");
    }

    #[test]
    fn test_load_custom_agent_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("agent.toml"),
            "system = \"You only answer about {{city}}.\"\n",
        )
        .unwrap();

        let mut vars = HashMap::new();
        vars.insert("city".to_string(), "Bergen".to_string());

        let prompts = Prompts::load(dir.path().to_str(), Some(&vars)).unwrap();
        assert_eq!(prompts.system_prompt(), "You only answer about Bergen.");
    }

    #[test]
    fn test_missing_custom_dir_keeps_defaults() {
        let prompts = Prompts::load(Some("/nonexistent/kart/prompts"), None).unwrap();
        assert!(!prompts.agent.system.is_empty());
    }
}
