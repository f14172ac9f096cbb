//! Pre-flight checks before talking to the model.
//!
//! Fails early with a readable message instead of letting the first
//! completion request come back with an authentication error.

use crate::error::{KartError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Chat and one-shot queries need an API key.
    Query,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Query => check_api_key(std::env::var("OPENAI_API_KEY").ok()),
    }
}

fn check_api_key(key: Option<String>) -> Result<()> {
    match key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        Some(_) => Err(KartError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        None => Err(KartError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key() {
        assert!(check_api_key(Some("sk-test".to_string())).is_ok());

        let empty = check_api_key(Some("  ".to_string())).unwrap_err().to_string();
        assert!(empty.contains("is empty"));

        let missing = check_api_key(None).unwrap_err().to_string();
        assert!(missing.contains("not set"));
    }
}
