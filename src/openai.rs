//! OpenAI client configuration with sensible defaults.

use crate::error::{KartError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Extra time the HTTP client allows beyond a completion's budget.
///
/// The orchestrator's own timeout should fire first; the client cap only
/// catches connections it has already given up on.
pub const TIMEOUT_MARGIN: Duration = Duration::from_secs(30);

/// Create an OpenAI client whose HTTP timeout leaves room for `budget`.
pub fn create_client_for_budget(budget: Duration) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(budget.saturating_add(TIMEOUT_MARGIN))
}

/// Create an OpenAI client with a custom HTTP timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    create_client_with_config(OpenAIConfig::default(), timeout)
}

/// Create a client for a specific API configuration (base URL, key).
pub fn create_client_with_config(
    config: OpenAIConfig,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| KartError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(config).with_http_client(http_client))
}
