//! The uniform result envelope every tool handler returns.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

/// Outcome of a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// Machine-readable failure category reported by backend handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The remote service did not answer within the handler's budget.
    Timeout,
    /// Transport failure or non-2xx response.
    HttpError,
    /// The routing engine found no route between the points.
    NoRoute,
    /// The routing engine answered with a non-`Ok` code.
    OsrmError,
    /// Arguments were missing, malformed or out of range.
    InvalidInput,
    /// The requested resource does not exist.
    NotFound,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::HttpError => "HTTP_ERROR",
            ErrorCode::NoRoute => "NO_ROUTE",
            ErrorCode::OsrmError => "OSRM_ERROR",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which remote endpoint served a call and how long it took.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolUsage {
    pub endpoint: String,
    pub duration_ms: f64,
    pub timestamp: DateTime<Utc>,
}

impl ToolUsage {
    /// Usage for a call to `endpoint` that began at `started`.
    pub fn since(endpoint: impl Into<String>, started: Instant) -> Self {
        Self {
            endpoint: endpoint.into(),
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
            timestamp: Utc::now(),
        }
    }
}

/// Result of a single tool invocation.
///
/// Only constructible through [`ToolResult::success`] and the error
/// constructors, so an error never carries data and a success never
/// carries an error code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<ToolUsage>,
}

impl ToolResult {
    /// A successful result carrying `data`.
    pub fn success(data: Value) -> Self {
        Self {
            status: ToolStatus::Success,
            data: Some(data),
            message: None,
            error_code: None,
            usage: None,
        }
    }

    /// A failed result with a backend error code.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            data: None,
            message: Some(message.into()),
            error_code: Some(code),
            usage: None,
        }
    }

    /// The dispatcher's fallback for names no provider owns.
    pub fn unknown_tool(name: &str) -> Self {
        Self {
            status: ToolStatus::Error,
            data: None,
            message: Some(format!("Unknown tool: {}", name)),
            error_code: None,
            usage: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_usage(mut self, usage: ToolUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn status(&self) -> ToolStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error_code
    }

    pub fn usage(&self) -> Option<&ToolUsage> {
        self.usage.as_ref()
    }

    /// Canonical text form handed back to the model as a tool turn.
    pub fn to_payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({
                "status": "error",
                "message": format!("Failed to serialize tool result: {}", e),
            })
            .to_string()
        })
    }
}
