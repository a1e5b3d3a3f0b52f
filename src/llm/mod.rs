//! LLM: completion API adapter for the copilot.
//!
//! DESIGN
//! ======
//! The relay talks to a single OpenAI-compatible provider. [`LlmChat`] is the
//! seam the copilot service depends on, so handlers and tests can swap the
//! concrete [`openai::OpenAiClient`] for a mock.

pub mod openai;
pub mod tools;
pub mod types;

pub use types::LlmChat;
