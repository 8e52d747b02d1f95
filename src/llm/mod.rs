//! LLM client abstraction layer
//!
//! Code intelligence talks to models only through [`LLMClient`], so the genai
//! backend and the scripted mock are interchangeable.

mod client;
mod error;
mod genai_client;
mod mock;
mod types;

pub use client::LLMClient;
pub use error::BackendError;
pub use genai_client::GenAIClient;
pub use mock::{MockLLMClient, MockResponse};
pub use types::{ChatMessage, LLMRequest, LLMResponse, MessageRole};
