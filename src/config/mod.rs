//! Configuration module for Kart.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, Prompts};
pub use settings::{
    AgentSettings, GeneralSettings, GeocodingSettings, LlmSettings, PromptSettings,
    RoutingSettings, Settings,
};
