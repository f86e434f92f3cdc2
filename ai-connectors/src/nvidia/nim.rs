//! NVIDIA NIM backends
//!
//! NIM endpoints speak the OpenAI-compatible `embeddings`, `chat/completions`
//! and `models` routes. Self-hosted NIMs usually run without authentication,
//! so the API key is optional.
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
use genai_config::Secret;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{ensure_success, AIConnectorError, AIConnectorResult};
use crate::traits::{BackendSettings, EmbedderBackend, GeneratorBackend};
use crate::types::{Meta, Model};

pub const REQUEST_TIMEOUT_SECONDS: u64 = 60;
pub const API_KEY_ENV_VAR: &str = "NVIDIA_API_KEY";
pub const DEFAULT_EMBEDDER_API_URL: &str = "https://ai.api.nvidia.com/v1/retrieval/nvidia";
pub const DEFAULT_GENERATOR_API_URL: &str = "https://integrate.api.nvidia.com/v1";

/// NIM backend configuration
#[derive(Debug, Clone)]
pub struct NimConfig {
    pub model: String,
    pub api_url: String,
    /// `None` sends no `authorization` header
    pub api_key: Option<Secret>,
    pub model_kwargs: Meta,
    pub timeout_seconds: u64,
}

impl NimConfig {
    /// Configuration authenticating with `NVIDIA_API_KEY`
    pub fn new(model: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_url: api_url.into(),
            api_key: Some(Secret::from_env_var([API_KEY_ENV_VAR])),
            model_kwargs: Meta::new(),
            timeout_seconds: REQUEST_TIMEOUT_SECONDS,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<Secret>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_model_kwargs(mut self, model_kwargs: Meta) -> Self {
        self.model_kwargs = model_kwargs;
        self
    }
}

/// HTTP plumbing shared by both backends
struct NimClient {
    settings: BackendSettings,
    api_url: String,
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

impl NimClient {
    fn new(config: NimConfig) -> AIConnectorResult<Self> {
        let api_key = match &config.api_key {
            Some(secret) => secret.resolve_value()?,
            None => None,
        };
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            settings: BackendSettings::new(config.model, Some(config.model_kwargs)),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn request(&self, method: reqwest::Method, route: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.api_url, route);
        let mut request = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json")
            .header("accept", "application/json");

        if let Some(key) = &self.api_key {
            request = request.header("authorization", format!("Bearer {}", key.expose_secret()));
        }
        request
    }

    /// Request body with `model`, the call fields, then the configured kwargs
    fn body(&self, fields: Meta) -> Value {
        let mut body = Meta::new();
        body.insert("model".to_string(), json!(self.settings.model));
        body.extend(fields);
        for (key, value) in &self.settings.model_kwargs {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }

    async fn post<T: for<'de> Deserialize<'de>>(&self, route: &str, body: Value) -> AIConnectorResult<T> {
        let response = self
            .request(reqwest::Method::POST, route)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success("NVIDIA", response).await?;
        Ok(response.json().await?)
    }

    async fn models(&self) -> AIConnectorResult<Vec<Model>> {
        #[derive(Deserialize)]
        struct ModelList {
            data: Vec<Value>,
        }

        let response = self.request(reqwest::Method::GET, "models").send().await?;
        let response = ensure_success("NVIDIA", response).await?;
        let list: ModelList = response.json().await?;

        let models = list
            .data
            .iter()
            .map(|element| match element.get("id").and_then(Value::as_str) {
                Some(id) if !id.is_empty() => Model::new(id),
                _ => Err(AIConnectorError::InvalidResponse(format!(
                    "No id found in {}",
                    element
                ))),
            })
            .collect::<AIConnectorResult<Vec<_>>>()?;

        debug!(api_url = %self.api_url, count = models.len(), "Listed NIM models");
        Ok(models)
    }
}

/// Embedding backend for NVIDIA NIM
pub struct NimEmbedderBackend {
    inner: NimClient,
}

impl NimEmbedderBackend {
    pub fn new(config: NimConfig) -> AIConnectorResult<Self> {
        Ok(Self {
            inner: NimClient::new(config)?,
        })
    }
}

#[async_trait]
impl EmbedderBackend for NimEmbedderBackend {
    fn model_name(&self) -> &str {
        &self.inner.settings.model
    }

    fn model_kwargs(&self) -> &Meta {
        &self.inner.settings.model_kwargs
    }

    async fn embed(&self, texts: &[String]) -> AIConnectorResult<(Vec<Vec<f32>>, Meta)> {
        if texts.is_empty() {
            return Err(AIConnectorError::InvalidRequest(
                "at least one text is required for embedding".to_string(),
            ));
        }

        #[derive(Deserialize)]
        struct EmbeddingResponse {
            data: Vec<EmbeddingData>,
            #[serde(default)]
            usage: Value,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            index: usize,
            embedding: Vec<f32>,
        }

        info!(model = %self.inner.settings.model, count = texts.len(), "Embedding texts with NIM");

        let mut fields = Meta::new();
        fields.insert("input".to_string(), json!(texts));
        let mut response: EmbeddingResponse =
            self.inner.post("embeddings", self.inner.body(fields)).await?;

        // The service does not promise to return items in input order.
        response.data.sort_by_key(|e| e.index);

        if response.data.len() != texts.len() {
            return Err(AIConnectorError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }
        if let Some((position, item)) = response
            .data
            .iter()
            .enumerate()
            .find(|(position, item)| item.index != *position)
        {
            return Err(AIConnectorError::InvalidResponse(format!(
                "embedding index {} found at position {}, indices must cover 0..{} exactly once",
                item.index,
                position,
                texts.len()
            )));
        }

        let embeddings = response.data.into_iter().map(|e| e.embedding).collect();
        let mut meta = Meta::new();
        meta.insert("usage".to_string(), response.usage);
        Ok((embeddings, meta))
    }

    async fn models(&self) -> AIConnectorResult<Vec<Model>> {
        self.inner.models().await
    }
}

/// Generation backend for NVIDIA NIM
pub struct NimGeneratorBackend {
    inner: NimClient,
}

impl NimGeneratorBackend {
    pub fn new(config: NimConfig) -> AIConnectorResult<Self> {
        Ok(Self {
            inner: NimClient::new(config)?,
        })
    }
}

#[async_trait]
impl GeneratorBackend for NimGeneratorBackend {
    fn model_name(&self) -> &str {
        &self.inner.settings.model
    }

    fn model_kwargs(&self) -> &Meta {
        &self.inner.settings.model_kwargs
    }

    async fn generate(&self, prompt: &str) -> AIConnectorResult<(Vec<String>, Vec<Meta>)> {
        #[derive(Deserialize)]
        struct CompletionResponse {
            choices: Vec<Choice>,
            #[serde(default)]
            usage: Option<Usage>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
            #[serde(default)]
            finish_reason: Option<String>,
        }

        #[derive(Deserialize)]
        struct ChoiceMessage {
            role: String,
            #[serde(default)]
            content: Option<String>,
        }

        #[derive(Deserialize)]
        struct Usage {
            prompt_tokens: u64,
            total_tokens: u64,
            #[serde(default)]
            completion_tokens: Option<u64>,
        }

        info!(model = %self.inner.settings.model, "Generating text with NIM");

        let mut fields = Meta::new();
        fields.insert(
            "messages".to_string(),
            json!([{ "role": "user", "content": prompt }]),
        );
        let response: CompletionResponse = self
            .inner
            .post("chat/completions", self.inner.body(fields))
            .await?;

        let mut replies = Vec::with_capacity(response.choices.len());
        let mut meta = Vec::with_capacity(response.choices.len());
        for choice in response.choices {
            let mut choice_meta = Meta::new();
            choice_meta.insert("role".to_string(), json!(choice.message.role));
            choice_meta.insert("finish_reason".to_string(), json!(choice.finish_reason));
            if let Some(usage) = &response.usage {
                let mut usage_meta = Meta::new();
                usage_meta.insert("prompt_tokens".to_string(), json!(usage.prompt_tokens));
                usage_meta.insert("total_tokens".to_string(), json!(usage.total_tokens));
                if let Some(completion) = usage.completion_tokens {
                    usage_meta.insert("completion_tokens".to_string(), json!(completion));
                }
                choice_meta.insert("usage".to_string(), Value::Object(usage_meta));
            }

            replies.push(choice.message.content.unwrap_or_default());
            meta.push(choice_meta);
        }

        Ok((replies, meta))
    }

    async fn models(&self) -> AIConnectorResult<Vec<Model>> {
        self.inner.models().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anonymous(model: &str) -> NimConfig {
        NimConfig::new(model, "http://localhost:8000/v1/").with_api_key(None)
    }

    #[test]
    fn test_settings_are_kept_verbatim() {
        let mut kwargs = Meta::new();
        kwargs.insert("truncate".to_string(), json!("END"));
        let backend =
            NimEmbedderBackend::new(anonymous("nvidia/nv-embedqa-e5-v5").with_model_kwargs(kwargs.clone()))
                .unwrap();
        assert_eq!(backend.model_name(), "nvidia/nv-embedqa-e5-v5");
        assert_eq!(backend.model_kwargs(), &kwargs);
    }

    #[test]
    fn test_body_merges_kwargs_last() {
        let mut kwargs = Meta::new();
        kwargs.insert("input_type".to_string(), json!("query"));
        let client = NimClient::new(anonymous("m").with_model_kwargs(kwargs)).unwrap();

        let mut fields = Meta::new();
        fields.insert("input".to_string(), json!(["a"]));
        assert_eq!(
            client.body(fields),
            json!({ "model": "m", "input": ["a"], "input_type": "query" })
        );
        assert_eq!(client.api_url, "http://localhost:8000/v1");
    }

    #[test]
    fn test_missing_required_key_fails() {
        let config = NimConfig::new("m", "http://localhost")
            .with_api_key(Some(Secret::from_env_var(["NIM_TEST_UNSET_KEY"])));
        assert!(matches!(
            NimGeneratorBackend::new(config),
            Err(AIConnectorError::MissingCredential(_))
        ));
    }

    #[tokio::test]
    async fn test_embed_rejects_empty_input() {
        let backend = NimEmbedderBackend::new(anonymous("m")).unwrap();
        assert!(matches!(
            backend.embed(&[]).await,
            Err(AIConnectorError::InvalidRequest(_))
        ));
    }
}
