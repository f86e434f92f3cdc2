//! Generative-AI provider connectors
//!
//! Adapters that put provider APIs behind a small set of traits:
//! - [`ChatGenerator`]: multi-message chat (Cohere)
//! - [`EmbedderBackend`]: text embeddings (NVIDIA NIM)
//! - [`GeneratorBackend`]: prompt completion (NVIDIA NIM)
//!
//! [`cohere::CohereGenerator`] keeps the retired single-prompt Cohere API
//! working on top of the chat endpoint.
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


pub mod error;
pub mod traits;
pub mod types;

pub mod cohere;
pub mod nvidia;

pub use error::{AIConnectorError, AIConnectorResult};
pub use traits::{BackendSettings, ChatGenerator, EmbedderBackend, GeneratorBackend};
pub use types::{
    resolve_model, ChatMessage, ChatRole, GeneratorOutput, Meta, Model, StreamingCallback,
    StreamingChunk,
};
