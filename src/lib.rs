//! Kart - ask maps questions in plain language
//!
//! A CLI and library that answers geographic questions by letting a
//! tool-calling language model drive three map services.
//!
//! The name "Kart" is the Norwegian word for "map."
//!
//! # Overview
//!
//! Kart allows you to:
//! - Turn addresses into coordinates and back, and find nearby places
//! - Plan routes, build travel-time tables and snap GPS traces to roads
//! - Look up tile-layer providers, their URL templates and attributions
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `tools` - Tool results, provider capability trait, catalog and dispatch
//! - `providers` - Geocoding (Nominatim), routing (OSRM) and tile metadata
//! - `agent` - Conversation state and the language-model seam
//! - `orchestrator` - The tool-calling loop
//! - `config` - Configuration management
//!
//! # Example
//!
//! ```rust,no_run
//! use kart::config::Settings;
//! use kart::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(&settings)?;
//!
//!     let response = orchestrator
//!         .process_query("How long does it take to drive from Oslo to Bergen?")
//!         .await?;
//!     println!("{}", response.answer);
//!     for call in &response.tool_calls {
//!         println!("  used {}", call);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod providers;
pub mod tools;

pub use error::{KartError, Result};
