//! Conversation state for one query.

use crate::error::{KartError, Result};
use crate::tools::ToolArguments;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Turns kept when the transcript is collapsed: the system directive and
/// the user query that started it.
const ORIGIN_TURNS: usize = 2;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub id: String,
    pub name: String,
    /// Arguments exactly as the model sent them (a JSON object as text).
    pub arguments: String,
}

impl ToolRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Decode the raw arguments. Blank input counts as an empty object.
    pub fn parsed_arguments(&self) -> Result<ToolArguments> {
        if self.arguments.trim().is_empty() {
            return Ok(ToolArguments::new());
        }

        match serde_json::from_str::<Value>(&self.arguments) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(KartError::InvalidInput(format!(
                "Arguments for {} must be a JSON object, got {}",
                self.name, other
            ))),
            Err(e) => Err(KartError::InvalidInput(format!(
                "Arguments for {} are not valid JSON: {}",
                self.name, e
            ))),
        }
    }
}

/// One entry of the transcript sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    System {
        text: String,
    },
    User {
        text: String,
    },
    Assistant {
        text: Option<String>,
        tool_requests: Vec<ToolRequest>,
    },
    Tool {
        request_id: String,
        payload: String,
    },
}

impl Turn {
    pub fn system(text: impl Into<String>) -> Self {
        Turn::System { text: text.into() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Turn::User { text: text.into() }
    }

    pub fn tool(request_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Turn::Tool {
            request_id: request_id.into(),
            payload: payload.into(),
        }
    }
}

/// Ordered transcript that always starts with `[System, User]`.
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::system(system_prompt), Turn::user(user_text)],
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn needs_pruning(&self, threshold: usize) -> bool {
        self.turns.len() > threshold
    }

    /// Collapse to the system directive and the original user turn.
    ///
    /// Partial tool-call/tool-result pairs are invalid model input, so
    /// everything after the origin goes. Pruning a collapsed transcript is a
    /// no-op.
    pub fn prune(&mut self) -> &[Turn] {
        self.turns.truncate(ORIGIN_TURNS);
        &self.turns
    }
}
