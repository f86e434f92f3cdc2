//! NVIDIA embedding components
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


use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use genai_config::Secret;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::nim::{NimConfig, NimEmbedderBackend, API_KEY_ENV_VAR, DEFAULT_EMBEDDER_API_URL};
use crate::error::{AIConnectorError, AIConnectorResult};
use crate::traits::EmbedderBackend;
use crate::types::{resolve_model, Meta, Model};

pub const DEFAULT_EMBEDDING_MODEL: &str = "nvidia/nv-embedqa-e5-v5";
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// How the service shortens inputs longer than the model's context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EmbeddingTruncateMode {
    Start,
    End,
    None,
}

impl fmt::Display for EmbeddingTruncateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "START",
            Self::End => "END",
            Self::None => "NONE",
        };
        f.write_str(s)
    }
}

impl FromStr for EmbeddingTruncateMode {
    type Err = AIConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "START" => Ok(Self::Start),
            "END" => Ok(Self::End),
            "NONE" => Ok(Self::None),
            other => Err(AIConnectorError::ConfigurationError(format!(
                "unknown truncate mode '{}', expected START, END or NONE",
                other
            ))),
        }
    }
}

/// NVIDIA embedder configuration
#[derive(Debug, Clone)]
pub struct NvidiaEmbedderConfig {
    pub model: String,
    pub api_url: String,
    pub api_key: Option<Secret>,
    pub prefix: String,
    pub suffix: String,
    pub truncate: Option<EmbeddingTruncateMode>,
    pub batch_size: usize,
}

impl Default for NvidiaEmbedderConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_url: DEFAULT_EMBEDDER_API_URL.to_string(),
            api_key: Some(Secret::from_env_var([API_KEY_ENV_VAR])),
            prefix: String::new(),
            suffix: String::new(),
            truncate: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl NvidiaEmbedderConfig {
    fn nim_config(&self, input_type: &str) -> NimConfig {
        let mut kwargs = Meta::new();
        kwargs.insert("input_type".to_string(), json!(input_type));
        if let Some(truncate) = self.truncate {
            kwargs.insert("truncate".to_string(), json!(truncate));
        }
        NimConfig::new(self.model.clone(), self.api_url.clone())
            .with_api_key(self.api_key.clone())
            .with_model_kwargs(kwargs)
    }

    fn decorate(&self, text: &str) -> String {
        format!("{}{}{}", self.prefix, text, self.suffix)
    }
}

/// Embedding of a single text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextEmbedderOutput {
    pub embedding: Vec<f32>,
    pub meta: Meta,
}

/// Embeddings of many texts, in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentEmbedderOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub meta: Meta,
}

async fn warm_up_backend(backend: &dyn EmbedderBackend) -> AIConnectorResult<Model> {
    let models = backend.models().await?;
    resolve_model(&models, backend.model_name())
}

/// Embeds a query string
pub struct NvidiaTextEmbedder {
    backend: Arc<dyn EmbedderBackend>,
    config: NvidiaEmbedderConfig,
}

impl NvidiaTextEmbedder {
    pub fn new(config: NvidiaEmbedderConfig) -> AIConnectorResult<Self> {
        let backend = NimEmbedderBackend::new(config.nim_config("query"))?;
        Ok(Self::from_backend(Arc::new(backend), config))
    }

    pub fn from_backend(backend: Arc<dyn EmbedderBackend>, config: NvidiaEmbedderConfig) -> Self {
        Self { backend, config }
    }

    /// Check that the configured model is served by the backend
    pub async fn warm_up(&self) -> AIConnectorResult<Model> {
        warm_up_backend(self.backend.as_ref()).await
    }

    pub async fn run(&self, text: &str) -> AIConnectorResult<TextEmbedderOutput> {
        if text.is_empty() {
            return Err(AIConnectorError::InvalidRequest(
                "text to embed must not be empty".to_string(),
            ));
        }

        let (embeddings, meta) = self.backend.embed(&[self.config.decorate(text)]).await?;
        if embeddings.len() != 1 {
            return Err(AIConnectorError::InvalidResponse(format!(
                "expected 1 embedding, got {}",
                embeddings.len()
            )));
        }
        let embedding = embeddings.into_iter().next().ok_or_else(|| {
            AIConnectorError::InvalidResponse("no embedding returned".to_string())
        })?;

        Ok(TextEmbedderOutput { embedding, meta })
    }
}

/// Embeds documents in batches
pub struct NvidiaDocumentEmbedder {
    backend: Arc<dyn EmbedderBackend>,
    config: NvidiaEmbedderConfig,
}

impl NvidiaDocumentEmbedder {
    pub fn new(config: NvidiaEmbedderConfig) -> AIConnectorResult<Self> {
        let backend = NimEmbedderBackend::new(config.nim_config("passage"))?;
        Self::from_backend(Arc::new(backend), config)
    }

    pub fn from_backend(
        backend: Arc<dyn EmbedderBackend>,
        config: NvidiaEmbedderConfig,
    ) -> AIConnectorResult<Self> {
        if config.batch_size == 0 {
            return Err(AIConnectorError::ConfigurationError(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(Self { backend, config })
    }

    pub async fn warm_up(&self) -> AIConnectorResult<Model> {
        warm_up_backend(self.backend.as_ref()).await
    }

    pub async fn run(&self, texts: &[String]) -> AIConnectorResult<DocumentEmbedderOutput> {
        if texts.is_empty() {
            return Ok(DocumentEmbedderOutput::default());
        }

        let inputs: Vec<String> = texts.iter().map(|t| self.config.decorate(t)).collect();
        let mut embeddings = Vec::with_capacity(inputs.len());
        let mut prompt_tokens = 0u64;
        let mut total_tokens = 0u64;

        for (batch_no, batch) in inputs.chunks(self.config.batch_size).enumerate() {
            info!(batch = batch_no, size = batch.len(), "Embedding document batch");
            let (vectors, meta) = self.backend.embed(batch).await?;
            if vectors.len() != batch.len() {
                return Err(AIConnectorError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            embeddings.extend(vectors);

            if let Some(usage) = meta.get("usage") {
                prompt_tokens += usage.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0);
                total_tokens += usage.get("total_tokens").and_then(Value::as_u64).unwrap_or(0);
            }
        }

        let mut meta = Meta::new();
        meta.insert(
            "usage".to_string(),
            json!({ "prompt_tokens": prompt_tokens, "total_tokens": total_tokens }),
        );
        Ok(DocumentEmbedderOutput { embeddings, meta })
    }
}
