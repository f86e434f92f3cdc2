//! Trait definitions for AI connectors
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


use async_trait::async_trait;

use crate::error::AIConnectorResult;
use crate::types::{ChatMessage, Meta, Model};

/// Model name and extra request parameters a backend was built with.
///
/// `model_kwargs` is kept verbatim and merged into every request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendSettings {
    pub model: String,
    pub model_kwargs: Meta,
}

impl BackendSettings {
    pub fn new(model: impl Into<String>, model_kwargs: Option<Meta>) -> Self {
        Self {
            model: model.into(),
            model_kwargs: model_kwargs.unwrap_or_default(),
        }
    }
}

/// A generator that answers a conversation
#[async_trait]
pub trait ChatGenerator: Send + Sync {
    /// Get the name of the generator
    fn name(&self) -> &str;

    /// Send the conversation and return the replies, first reply first
    async fn run(&self, messages: &[ChatMessage]) -> AIConnectorResult<Vec<ChatMessage>>;
}

/// Backend that turns texts into vectors
#[async_trait]
pub trait EmbedderBackend: Send + Sync {
    fn model_name(&self) -> &str;

    fn model_kwargs(&self) -> &Meta;

    /// Embed `texts`, returning one vector per text in input order and the
    /// call metadata reported by the service
    async fn embed(&self, texts: &[String]) -> AIConnectorResult<(Vec<Vec<f32>>, Meta)>;

    /// Models available from the backend
    async fn models(&self) -> AIConnectorResult<Vec<Model>>;
}

/// Backend that completes a prompt
#[async_trait]
pub trait GeneratorBackend: Send + Sync {
    fn model_name(&self) -> &str;

    fn model_kwargs(&self) -> &Meta;

    /// Prompt the model, returning generated texts and a parallel list of
    /// per-text metadata
    async fn generate(&self, prompt: &str) -> AIConnectorResult<(Vec<String>, Vec<Meta>)>;

    /// Models available from the backend
    async fn models(&self) -> AIConnectorResult<Vec<Model>>;
}
