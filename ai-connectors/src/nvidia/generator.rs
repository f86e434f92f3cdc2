//! NVIDIA text generation component
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


use std::sync::Arc;

use genai_config::Secret;

use super::nim::{NimConfig, NimGeneratorBackend, API_KEY_ENV_VAR, DEFAULT_GENERATOR_API_URL};
use crate::error::AIConnectorResult;
use crate::traits::GeneratorBackend;
use crate::types::{resolve_model, GeneratorOutput, Meta, Model};

/// NVIDIA generator configuration
#[derive(Debug, Clone)]
pub struct NvidiaGeneratorConfig {
    pub model: String,
    pub api_url: String,
    pub api_key: Option<Secret>,
    /// Extra request parameters, e.g. `temperature`, `top_p`, `max_tokens`
    pub model_kwargs: Meta,
}

impl NvidiaGeneratorConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_url: DEFAULT_GENERATOR_API_URL.to_string(),
            api_key: Some(Secret::from_env_var([API_KEY_ENV_VAR])),
            model_kwargs: Meta::new(),
        }
    }
}

/// Prompt-based generator over a [`GeneratorBackend`]
pub struct NvidiaGenerator {
    backend: Arc<dyn GeneratorBackend>,
}

impl NvidiaGenerator {
    pub fn new(config: NvidiaGeneratorConfig) -> AIConnectorResult<Self> {
        let nim = NimConfig::new(config.model, config.api_url)
            .with_api_key(config.api_key)
            .with_model_kwargs(config.model_kwargs);
        Ok(Self::from_backend(Arc::new(NimGeneratorBackend::new(nim)?)))
    }

    pub fn from_backend(backend: Arc<dyn GeneratorBackend>) -> Self {
        Self { backend }
    }

    /// Check that the configured model is served by the backend
    pub async fn warm_up(&self) -> AIConnectorResult<Model> {
        let models = self.backend.models().await?;
        resolve_model(&models, self.backend.model_name())
    }

    pub async fn run(&self, prompt: &str) -> AIConnectorResult<GeneratorOutput> {
        let (replies, meta) = self.backend.generate(prompt).await?;
        Ok(GeneratorOutput { replies, meta })
    }
}
