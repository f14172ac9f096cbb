//! Error types for Kart.

use thiserror::Error;

/// Library-level error type for Kart operations.
#[derive(Error, Debug)]
pub enum KartError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    /// The model did not answer before the HTTP client gave up.
    #[error("Model request timed out: {0}")]
    ModelTimeout(String),

    /// The transcript no longer fits the model's input window.
    #[error("Context capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Tool '{tool}' is registered by both '{first}' and '{second}'")]
    DuplicateTool {
        tool: String,
        first: String,
        second: String,
    },

    #[error("Invalid schema for tool '{tool}': {reason}")]
    InvalidSchema { tool: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Kart operations.
pub type Result<T> = std::result::Result<T, KartError>;
