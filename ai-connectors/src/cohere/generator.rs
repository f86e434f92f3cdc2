//! Single-prompt Cohere generator
//!
//! Cohere retired its `generate` endpoint. [`CohereGenerator`] keeps the old
//! prompt-in, replies-out surface and forwards each prompt to a chat
//! generator as a one-message conversation.
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


use tracing::debug;

use super::chat::{CohereChatGenerator, CohereConfig};
use crate::error::{AIConnectorError, AIConnectorResult};
use crate::traits::ChatGenerator;
use crate::types::{ChatMessage, GeneratorOutput};

/// Prompt-based generator backed by a chat generator
pub struct CohereGenerator<C = CohereChatGenerator> {
    chat: C,
}

impl CohereGenerator<CohereChatGenerator> {
    /// Build the generator on top of a [`CohereChatGenerator`].
    ///
    /// Fails when no API key can be resolved.
    pub fn new(config: CohereConfig) -> AIConnectorResult<Self> {
        Ok(Self {
            chat: CohereChatGenerator::new(config)?,
        })
    }
}

impl<C: ChatGenerator> CohereGenerator<C> {
    pub fn from_chat_generator(chat: C) -> Self {
        Self { chat }
    }

    pub fn chat_generator(&self) -> &C {
        &self.chat
    }

    /// Send `prompt` as a single user message and return the first reply
    pub async fn run(&self, prompt: &str) -> AIConnectorResult<GeneratorOutput> {
        let messages = [ChatMessage::from_user(prompt)];
        let replies = self.chat.run(&messages).await?;

        let first = replies.into_iter().next().ok_or_else(|| {
            AIConnectorError::InvalidResponse(format!(
                "{} returned no replies",
                self.chat.name()
            ))
        })?;
        debug!(generator = self.chat.name(), reply_len = first.text.len(), "Prompt answered");

        Ok(GeneratorOutput {
            replies: vec![first.text],
            meta: vec![first.meta],
        })
    }
}
