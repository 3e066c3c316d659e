//! LLM provider abstraction layer.
//!
//! A trait-based seam over chat completion backends, with an
//! OpenAI-compatible implementation.

mod openai;
mod provider;
mod types;

pub use openai::OpenAIProvider;
pub use provider::{CompletionOptions, LlmError, LlmProvider};
pub use types::{CompletionResponse, FinishReason, Message, MessageRole, ResponseFormat};
