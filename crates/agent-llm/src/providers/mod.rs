//! Concrete LLM provider implementations

pub mod openai;
mod sse;

pub use openai::{OpenAIConfig, OpenAIProvider};
