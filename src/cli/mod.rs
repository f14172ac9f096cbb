//! CLI module for Kart.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Kart - ask maps questions in plain language
///
/// Geocoding, routing and tile-layer lookups driven by a tool-calling
/// language model. The name "Kart" is the Norwegian word for "map."
#[derive(Parser, Debug)]
#[command(name = "kart")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive map assistant session
    Chat {
        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Ask a single question and print the answer
    Query {
        /// The question to ask (e.g., "How far is Bergen from Oslo by car?")
        message: String,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List the map services and the tools they offer
    Tools,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
