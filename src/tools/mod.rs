//! Tool abstractions shared by the backend providers and the agent loop.
//!
//! Providers describe their tools with [`ToolSpec`]s and answer calls with
//! a [`ToolResult`]; the [`ToolRegistry`] aggregates them into one catalog
//! and routes each call to its owner.

mod provider;
mod registry;
mod result;

pub use provider::{decode_arguments, ProviderInfo, ToolArguments, ToolProvider, ToolSpec};
pub use registry::ToolRegistry;
pub use result::{ErrorCode, ToolResult, ToolStatus, ToolUsage};
