//! Conversation state and the language-model seam used by the orchestrator.
//!
//! The transcript a query builds up lives in [`Conversation`]; the model is
//! reached through the [`CompletionService`] trait so the loop can run
//! against OpenAI or a scripted stand-in.

mod completion;
mod conversation;

pub use completion::{Completion, CompletionService, OpenAiCompletion};
pub use conversation::{Conversation, ToolRequest, Turn};
