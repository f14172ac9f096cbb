//! CLI command implementations.

mod chat;
mod config;
mod query;
mod tools;

pub use chat::run_chat;
pub use config::run_config;
pub use query::run_query;
pub use tools::run_tools;
