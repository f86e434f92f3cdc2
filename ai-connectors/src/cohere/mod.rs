//! Cohere connectors
//!
//! - [`CohereChatGenerator`]: multi-message chat over the Cohere `chat` endpoint
//! - [`CohereGenerator`]: single-prompt surface kept for existing callers

mod chat;
mod generator;

pub use chat::{CohereChatGenerator, CohereConfig, API_KEY_ENV_VARS, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use generator::CohereGenerator;
