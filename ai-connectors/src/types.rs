//! Value types shared by the connectors
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

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AIConnectorError, AIConnectorResult};

/// Free-form metadata attached to replies, embeddings and requests
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// Role-tagged chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    #[serde(default)]
    pub meta: Meta,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            meta: Meta::new(),
        }
    }

    pub fn from_user(text: impl Into<String>) -> Self {
        Self::new(ChatRole::User, text)
    }

    pub fn from_assistant(text: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, text)
    }

    pub fn from_system(text: impl Into<String>) -> Self {
        Self::new(ChatRole::System, text)
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }
}

/// Piece of a streamed reply
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingChunk {
    pub content: String,
    pub meta: Meta,
}

/// Invoked once for every chunk received while streaming
pub type StreamingCallback = Arc<dyn Fn(&StreamingChunk) + Send + Sync>;

/// Output of the prompt-based generators: one metadata entry per reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorOutput {
    pub replies: Vec<String>,
    pub meta: Vec<Meta>,
}

#[derive(Deserialize)]
struct ModelRecord {
    id: String,
    #[serde(default)]
    aliases: Option<Vec<String>>,
    #[serde(default)]
    base_model: Option<String>,
}

impl TryFrom<ModelRecord> for Model {
    type Error = String;

    fn try_from(record: ModelRecord) -> Result<Self, Self::Error> {
        if record.id.is_empty() {
            return Err("model id must not be empty".to_string());
        }
        Ok(Self {
            id: record.id,
            aliases: record.aliases,
            base_model: record.base_model,
        })
    }
}

/// A model offered by a provider.
///
/// `id` is what gets passed as the `model` request parameter. Aliases are
/// deprecated names for the same model; selecting a model by alias through
/// [`resolve_model`] logs a deprecation warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ModelRecord")]
pub struct Model {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    aliases: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_model: Option<String>,
}

impl Model {
    pub fn new(id: impl Into<String>) -> AIConnectorResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(AIConnectorError::InvalidRequest(
                "model id must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id,
            aliases: None,
            base_model: None,
        })
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = Some(aliases);
        self
    }

    pub fn with_base_model(mut self, base_model: impl Into<String>) -> Self {
        self.base_model = Some(base_model.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn aliases(&self) -> Option<&[String]> {
        self.aliases.as_deref()
    }

    pub fn base_model(&self) -> Option<&str> {
        self.base_model.as_deref()
    }

    fn has_alias(&self, name: &str) -> bool {
        self.aliases
            .as_ref()
            .is_some_and(|aliases| aliases.iter().any(|a| a == name))
    }
}

/// Find the model selected by `name`.
///
/// An exact id match wins. Otherwise a model listing `name` among its aliases
/// is returned and a deprecation warning is logged.
pub fn resolve_model(models: &[Model], name: &str) -> AIConnectorResult<Model> {
    if let Some(model) = models.iter().find(|m| m.id == name) {
        return Ok(model.clone());
    }

    if let Some(model) = models.iter().find(|m| m.has_alias(name)) {
        warn!(
            alias = name,
            model = %model.id,
            "Model alias is deprecated, use the model id instead"
        );
        return Ok(model.clone());
    }

    Err(AIConnectorError::UnknownModel {
        requested: name.to_string(),
        available: models
            .iter()
            .map(|m| m.id.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    #[test]
    fn test_model_requires_id() {
        assert!(matches!(
            Model::new(""),
            Err(AIConnectorError::InvalidRequest(_))
        ));
        let model = Model::new("nvidia/nv-embedqa-e5-v5").unwrap();
        assert_eq!(model.id(), "nvidia/nv-embedqa-e5-v5");
        assert!(model.aliases().is_none());
        assert!(model.base_model().is_none());
    }

    #[test]
    fn test_model_deserialize_rejects_empty_id() {
        let result: Result<Model, _> = serde_json::from_value(json!({ "id": "" }));
        assert!(result.is_err());
        let result: Result<Model, _> = serde_json::from_value(json!({ "aliases": ["a"] }));
        assert!(result.is_err());
    }

    #[test]
    fn test_model_optional_fields_round_trip() {
        let model = Model::new("meta/llama3-8b-instruct")
            .unwrap()
            .with_aliases(vec!["ai-llama3-8b".to_string()])
            .with_base_model("meta/llama3");

        let value = serde_json::to_value(&model).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "meta/llama3-8b-instruct",
                "aliases": ["ai-llama3-8b"],
                "base_model": "meta/llama3"
            })
        );
        let back: Model = serde_json::from_value(value).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn test_model_absent_fields_are_omitted() {
        let model = Model::new("command-r").unwrap();
        assert_eq!(serde_json::to_value(&model).unwrap(), json!({ "id": "command-r" }));
    }

    #[test]
    #[traced_test]
    fn test_resolve_model_by_id_and_alias() {
        let models = vec![
            Model::new("nvidia/nv-embed-v1").unwrap(),
            Model::new("nvidia/nv-embedqa-e5-v5")
                .unwrap()
                .with_aliases(vec!["ai-embed-qa-4".to_string()]),
        ];

        assert_eq!(resolve_model(&models, "nvidia/nv-embed-v1").unwrap().id(), "nvidia/nv-embed-v1");
        assert!(!logs_contain("deprecated"));

        assert_eq!(
            resolve_model(&models, "ai-embed-qa-4").unwrap().id(),
            "nvidia/nv-embedqa-e5-v5"
        );
        assert!(logs_contain("Model alias is deprecated"));
        assert!(logs_contain("ai-embed-qa-4"));

        assert!(matches!(
            resolve_model(&models, "missing"),
            Err(AIConnectorError::UnknownModel { .. })
        ));
    }

    #[test]
    fn test_chat_message_constructors() {
        let message = ChatMessage::from_user("hello");
        assert_eq!(message.role, ChatRole::User);
        assert_eq!(message.text, "hello");
        assert!(message.meta.is_empty());
        assert_eq!(ChatMessage::from_assistant("x").role, ChatRole::Assistant);
        assert_eq!(ChatMessage::from_system("x").role, ChatRole::System);
    }

    #[test]
    fn test_generator_output_shape() {
        let mut meta = Meta::new();
        meta.insert("finish_reason".to_string(), json!("stop"));
        let output = GeneratorOutput {
            replies: vec!["Paris".to_string()],
            meta: vec![meta],
        };
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({ "replies": ["Paris"], "meta": [{ "finish_reason": "stop" }] })
        );
    }
}
