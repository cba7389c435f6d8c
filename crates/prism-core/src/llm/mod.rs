//! LLM integration for product titles and descriptions.
//!
//! A provider abstraction with a Gemini backend, prompt templates, and a
//! writer that wraps each call in a timeout with retries on transient
//! failures.

pub(crate) mod gemini;
pub(crate) mod prompt;
pub(crate) mod provider;
pub(crate) mod retry;
pub(crate) mod writer;

pub use gemini::GeminiProvider;
pub use prompt::{description_prompt, product_name_prompt};
pub use provider::{resolve_env_var, LlmProvider, LlmRequest, LlmResponse};
pub use writer::{ListingWriter, WriterOptions};
