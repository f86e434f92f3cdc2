//! Cohere chat connector
//!
//! Talks to the Cohere v1 `chat` endpoint. When a streaming callback is
//! configured the reply is streamed as newline-delimited JSON events and each
//! text fragment is handed to the callback as it arrives.
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

use async_trait::async_trait;
use futures::StreamExt;
use genai_config::Secret;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{ensure_success, AIConnectorError, AIConnectorResult};
use crate::traits::ChatGenerator;
use crate::types::{ChatMessage, ChatRole, Meta, StreamingCallback, StreamingChunk};

pub const DEFAULT_MODEL: &str = "command-r";
pub const DEFAULT_BASE_URL: &str = "https://api.cohere.com";
/// Checked in order when no key is given explicitly
pub const API_KEY_ENV_VARS: [&str; 2] = ["COHERE_API_KEY", "CO_API_KEY"];

const CLIENT_NAME: &str = "genai-connectors";

/// Cohere connector configuration
#[derive(Clone)]
pub struct CohereConfig {
    pub api_key: Secret,
    pub model: String,
    pub api_base_url: Option<String>,
    pub streaming_callback: Option<StreamingCallback>,
    /// Extra request parameters, e.g. `temperature` or `max_tokens`
    pub generation_kwargs: Meta,
    pub timeout_seconds: u64,
}

impl CohereConfig {
    pub fn new(api_key: Secret) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            api_base_url: None,
            streaming_callback: None,
            generation_kwargs: Meta::new(),
            timeout_seconds: 60,
        }
    }

    pub fn from_env() -> Self {
        Self {
            api_base_url: std::env::var("CO_API_URL").ok(),
            timeout_seconds: std::env::var("COHERE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            ..Self::new(Secret::from_env_var(API_KEY_ENV_VARS))
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn with_streaming_callback(mut self, callback: StreamingCallback) -> Self {
        self.streaming_callback = Some(callback);
        self
    }

    pub fn with_generation_kwargs(mut self, kwargs: Meta) -> Self {
        self.generation_kwargs = kwargs;
        self
    }
}

impl fmt::Debug for CohereConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CohereConfig")
            .field("api_key", &self.api_key)
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("streaming", &self.streaming_callback.is_some())
            .field("generation_kwargs", &self.generation_kwargs)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    meta: Option<ResponseMeta>,
    #[serde(default)]
    documents: Option<Vec<Value>>,
    #[serde(default)]
    citations: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ResponseMeta {
    #[serde(default)]
    billed_units: Option<BilledUnits>,
}

#[derive(Debug, Deserialize)]
struct BilledUnits {
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event_type", rename_all = "kebab-case")]
enum StreamEvent {
    TextGeneration {
        text: String,
    },
    StreamEnd {
        #[serde(default)]
        finish_reason: Option<String>,
        #[serde(default)]
        response: Option<ChatResponse>,
    },
    #[serde(other)]
    Other,
}

#[derive(Default)]
struct StreamState {
    text: String,
    finish_reason: Option<String>,
    response: Option<ChatResponse>,
}

/// Cohere chat connector
pub struct CohereChatGenerator {
    model: String,
    base_url: String,
    api_key: SecretString,
    streaming_callback: Option<StreamingCallback>,
    generation_kwargs: Meta,
    client: reqwest::Client,
}

impl CohereChatGenerator {
    /// Resolve the API key and build the HTTP client
    pub fn new(config: CohereConfig) -> AIConnectorResult<Self> {
        let api_key = config.api_key.resolve_required()?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            model: config.model,
            base_url: config
                .api_base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            streaming_callback: config.streaming_callback,
            generation_kwargs: config.generation_kwargs,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn generation_kwargs(&self) -> &Meta {
        &self.generation_kwargs
    }

    /// Like [`ChatGenerator::run`], with per-call parameters that override
    /// the configured generation kwargs
    pub async fn run_with_kwargs(
        &self,
        messages: &[ChatMessage],
        generation_kwargs: Option<&Meta>,
    ) -> AIConnectorResult<Vec<ChatMessage>> {
        let stream = self.streaming_callback.is_some();
        let body = self.build_body(messages, generation_kwargs, stream)?;
        let url = format!("{}/v1/chat", self.base_url.trim_end_matches('/'));

        info!(model = %self.model, messages = messages.len(), stream, "Calling Cohere chat");

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .header("X-Client-Name", CLIENT_NAME)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success("Cohere", response).await?;

        let reply = match &self.streaming_callback {
            Some(callback) => self.read_stream(response, callback).await?,
            None => {
                let result: ChatResponse = response.json().await?;
                let meta = self.reply_meta(&result, result.finish_reason.clone());
                ChatMessage::from_assistant(result.text).with_meta(meta)
            }
        };

        Ok(vec![reply])
    }

    fn build_body(
        &self,
        messages: &[ChatMessage],
        generation_kwargs: Option<&Meta>,
        stream: bool,
    ) -> AIConnectorResult<Value> {
        let (last, history) = messages.split_last().ok_or_else(|| {
            AIConnectorError::InvalidRequest("at least one chat message is required".to_string())
        })?;

        let chat_history: Vec<Value> = history
            .iter()
            .map(|m| json!({ "role": history_role(m.role), "message": m.text }))
            .collect();

        let mut body = Meta::new();
        for (key, value) in self
            .generation_kwargs
            .iter()
            .chain(generation_kwargs.into_iter().flatten())
        {
            body.insert(key.clone(), value.clone());
        }
        body.insert("message".to_string(), json!(last.text));
        body.insert("model".to_string(), json!(self.model));
        body.insert("chat_history".to_string(), Value::Array(chat_history));
        body.insert("stream".to_string(), json!(stream));

        debug!(body_keys = ?body.keys().collect::<Vec<_>>(), "Built Cohere chat request");
        Ok(Value::Object(body))
    }

    async fn read_stream(
        &self,
        response: reqwest::Response,
        callback: &StreamingCallback,
    ) -> AIConnectorResult<ChatMessage> {
        let mut state = StreamState::default();
        let mut buffer: Vec<u8> = Vec::new();
        let mut bytes = response.bytes_stream();

        while let Some(chunk) = bytes.next().await {
            buffer.extend_from_slice(&chunk?);
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                handle_stream_line(&line, &mut state, callback)?;
            }
        }
        handle_stream_line(&buffer, &mut state, callback)?;

        let finish_reason = state.finish_reason.take().or_else(|| {
            state
                .response
                .as_ref()
                .and_then(|r| r.finish_reason.clone())
        });
        let meta = match &state.response {
            Some(final_response) => self.reply_meta(final_response, finish_reason),
            None => {
                let mut meta = self.base_meta();
                meta.insert("finish_reason".to_string(), json!(finish_reason));
                meta
            }
        };

        Ok(ChatMessage::from_assistant(state.text).with_meta(meta))
    }

    fn base_meta(&self) -> Meta {
        let mut meta = Meta::new();
        meta.insert("model".to_string(), json!(self.model));
        meta.insert("index".to_string(), json!(0));
        meta
    }

    fn reply_meta(&self, response: &ChatResponse, finish_reason: Option<String>) -> Meta {
        let mut meta = self.base_meta();
        meta.insert("finish_reason".to_string(), json!(finish_reason));

        if let Some(units) = response.meta.as_ref().and_then(|m| m.billed_units.as_ref()) {
            meta.insert(
                "usage".to_string(),
                json!({
                    "prompt_tokens": units.input_tokens,
                    "completion_tokens": units.output_tokens,
                }),
            );
        }
        if let Some(documents) = &response.documents {
            meta.insert("documents".to_string(), json!(documents));
        }
        if let Some(citations) = &response.citations {
            meta.insert("citations".to_string(), json!(citations));
        }
        meta
    }
}

fn history_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "USER",
        ChatRole::Assistant => "CHATBOT",
        ChatRole::System => "SYSTEM",
    }
}

fn handle_stream_line(
    line: &[u8],
    state: &mut StreamState,
    callback: &StreamingCallback,
) -> AIConnectorResult<()> {
    let line = std::str::from_utf8(line)
        .map_err(|e| AIConnectorError::InvalidResponse(format!("stream is not UTF-8: {}", e)))?
        .trim();
    if line.is_empty() {
        return Ok(());
    }

    match serde_json::from_str::<StreamEvent>(line)? {
        StreamEvent::TextGeneration { text } => {
            let mut meta = Meta::new();
            meta.insert("event_type".to_string(), json!("text-generation"));
            callback(&StreamingChunk {
                content: text.clone(),
                meta,
            });
            state.text.push_str(&text);
        }
        StreamEvent::StreamEnd {
            finish_reason,
            response,
        } => {
            state.finish_reason = finish_reason;
            state.response = response;
        }
        StreamEvent::Other => {}
    }
    Ok(())
}

#[async_trait]
impl ChatGenerator for CohereChatGenerator {
    fn name(&self) -> &str {
        "cohere"
    }

    async fn run(&self, messages: &[ChatMessage]) -> AIConnectorResult<Vec<ChatMessage>> {
        self.run_with_kwargs(messages, None).await
    }
}
