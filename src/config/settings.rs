//! Configuration settings for Kart.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = "kart/0.1";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub agent: AgentSettings,
    pub geocoding: GeocodingSettings,
    pub routing: RoutingSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Chat completion model.
    pub model: String,
    /// Maximum tokens the model may produce per completion.
    pub max_output_tokens: u32,
    /// How long a single completion call may take before the query is abandoned.
    pub request_timeout_seconds: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_output_tokens: 1024,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl LlmSettings {
    /// Budget for one completion call.
    ///
    /// Zero falls back to the default; anything above an hour is capped.
    pub fn request_timeout(&self) -> Duration {
        match self.request_timeout_seconds {
            0 => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            secs => Duration::from_secs(secs.min(MAX_REQUEST_TIMEOUT_SECS)),
        }
    }
}

/// Orchestration loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Transcript length above which the conversation collapses to its origin.
    pub prune_threshold: usize,
    /// Optional ceiling on model round-trips per query. Unbounded when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            prune_threshold: 14,
            max_iterations: None,
        }
    }
}

/// Nominatim / Overpass settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingSettings {
    pub base_url: String,
    pub overpass_url: String,
    pub timeout_seconds: f64,
    pub overpass_timeout_seconds: f64,
    pub user_agent: String,
}

impl Default for GeocodingSettings {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            timeout_seconds: 10.0,
            overpass_timeout_seconds: 15.0,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// OSRM settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    pub base_url: String,
    pub timeout_seconds: f64,
    pub user_agent: String,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            base_url: "http://router.project-osrm.org".to_string(),
            timeout_seconds: 15.0,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment overrides are applied on top of the file contents.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would stop every query before it starts.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.agent.max_iterations == Some(0) {
            return Err(crate::error::KartError::Config(
                "agent.max_iterations must be at least 1; remove it for no limit".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> crate::error::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("NOMINATIM_BASE_URL") {
            self.geocoding.base_url = url;
        }
        if let Some(secs) = lookup("NOMINATIM_TIMEOUT_SECONDS") {
            self.geocoding.timeout_seconds = parse_seconds("NOMINATIM_TIMEOUT_SECONDS", &secs)?;
        }
        if let Some(url) = lookup("OSRM_BASE_URL") {
            self.routing.base_url = url;
        }
        if let Some(secs) = lookup("OSRM_TIMEOUT_SECONDS") {
            self.routing.timeout_seconds = parse_seconds("OSRM_TIMEOUT_SECONDS", &secs)?;
        }
        if let Some(model) = lookup("KART_MODEL") {
            self.llm.model = model;
        }
        Ok(())
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::KartError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kart")
            .join("config.toml")
    }
}

fn parse_seconds(key: &str, value: &str) -> crate::error::Result<f64> {
    match value.trim().parse::<f64>() {
        Ok(secs) if secs > 0.0 => Ok(secs),
        _ => Err(crate::error::KartError::Config(format!(
            "{} must be a positive number of seconds, got '{}'",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.llm.model, "gpt-4o-mini");
        assert_eq!(settings.llm.request_timeout(), Duration::from_secs(60));
        assert_eq!(settings.agent.prune_threshold, 14);
        assert!(settings.agent.max_iterations.is_none());
        assert_eq!(settings.geocoding.timeout_seconds, 10.0);
        assert_eq!(settings.routing.timeout_seconds, 15.0);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("NOMINATIM_BASE_URL", "http://localhost:8080"),
            ("OSRM_TIMEOUT_SECONDS", "3.5"),
            ("KART_MODEL", "gpt-4.1"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(settings.geocoding.base_url, "http://localhost:8080");
        assert_eq!(settings.routing.timeout_seconds, 3.5);
        assert_eq!(settings.llm.model, "gpt-4.1");
        assert_eq!(settings.routing.base_url, "http://router.project-osrm.org");
    }

    #[test]
    fn test_invalid_timeout_override() {
        let mut settings = Settings::default();
        let result = settings.apply_env_overrides(|k| {
            (k == "NOMINATIM_TIMEOUT_SECONDS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [agent]
            max_iterations = 8

            [routing]
            base_url = "http://osrm.internal:5000"
            "#,
        )
        .unwrap();

        assert_eq!(settings.agent.max_iterations, Some(8));
        assert_eq!(settings.agent.prune_threshold, 14);
        assert_eq!(settings.routing.base_url, "http://osrm.internal:5000");
        assert_eq!(settings.routing.timeout_seconds, 15.0);
    }

    #[test]
    fn test_request_timeout_is_clamped() {
        let mut llm = LlmSettings {
            request_timeout_seconds: 0,
            ..LlmSettings::default()
        };
        assert_eq!(llm.request_timeout(), Duration::from_secs(60));

        llm.request_timeout_seconds = 300;
        assert_eq!(llm.request_timeout(), Duration::from_secs(300));

        llm.request_timeout_seconds = u64::MAX;
        assert_eq!(llm.request_timeout(), Duration::from_secs(3600));
    }

    #[test]
    fn test_zero_iteration_ceiling_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[agent]\nmax_iterations = 0\n").unwrap();

        let err = Settings::load_from(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("max_iterations"), "{}", err);

        std::fs::write(&path, "[agent]\nmax_iterations = 1\n").unwrap();
        assert_eq!(Settings::load_from(Some(&path)).unwrap().agent.max_iterations, Some(1));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.llm.model = "gpt-4o".to_string();
        settings.save_to(&path).unwrap();

        let loaded: Settings = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.llm.model, "gpt-4o");
    }
}
