//! Command-line surface and command execution
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


use std::io::Write;
use std::sync::Arc;

use ai_connectors::cohere::{CohereConfig, CohereGenerator};
use ai_connectors::nvidia::{
    EmbeddingTruncateMode, NimConfig, NimEmbedderBackend, NimGeneratorBackend,
    NvidiaDocumentEmbedder, NvidiaEmbedderConfig, NvidiaGenerator, NvidiaGeneratorConfig,
    DEFAULT_BATCH_SIZE, DEFAULT_EMBEDDING_MODEL,
};
use ai_connectors::nvidia::nim::{DEFAULT_EMBEDDER_API_URL, DEFAULT_GENERATOR_API_URL};
use ai_connectors::{EmbedderBackend, GeneratorBackend, StreamingChunk};
use clap::{Parser, Subcommand, ValueEnum};
use genai_config::AppConfig;
use serde_json::{json, Value};
use tracing::info;

const DEFAULT_NVIDIA_GENERATION_MODEL: &str = "meta/llama3-8b-instruct";

#[derive(Debug, Parser)]
#[command(name = "genai", version, about = "Run Cohere and NVIDIA connectors from the shell")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Cohere,
    Nvidia,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelKind {
    Embed,
    Generate,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a reply for a single prompt
    Generate {
        prompt: String,
        #[arg(long, value_enum, default_value_t = Provider::Cohere)]
        provider: Provider,
        #[arg(long)]
        model: Option<String>,
        /// Print tokens to stderr as they arrive (Cohere only)
        #[arg(long)]
        stream: bool,
    },
    /// Embed one or more texts with NVIDIA
    Embed {
        #[arg(required = true)]
        texts: Vec<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// START, END or NONE
        #[arg(long)]
        truncate: Option<EmbeddingTruncateMode>,
    },
    /// List models served by an NVIDIA endpoint
    Models {
        #[arg(long, value_enum, default_value_t = ModelKind::Generate)]
        kind: ModelKind,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Generate { .. } => "generate",
            Self::Embed { .. } => "embed",
            Self::Models { .. } => "models",
        }
    }
}

pub async fn execute(command: Command, config: &AppConfig) -> anyhow::Result<Value> {
    match command {
        Command::Generate {
            prompt,
            provider,
            model,
            stream,
        } => generate(&prompt, provider, model, stream, config).await,
        Command::Embed {
            texts,
            model,
            batch_size,
            truncate,
        } => embed(texts, model, batch_size, truncate, config).await,
        Command::Models { kind } => models(kind, config).await,
    }
}

async fn generate(
    prompt: &str,
    provider: Provider,
    model: Option<String>,
    stream: bool,
    config: &AppConfig,
) -> anyhow::Result<Value> {
    let output = match provider {
        Provider::Cohere => {
            let mut cohere = CohereConfig::from_env();
            if let Some(model) = model {
                cohere = cohere.with_model(model);
            }
            if let Some(url) = &config.cohere_base_url {
                cohere = cohere.with_base_url(url.clone());
            }
            if stream {
                cohere = cohere.with_streaming_callback(Arc::new(|chunk: &StreamingChunk| {
                    let mut stderr = std::io::stderr();
                    let _ = write!(stderr, "{}", chunk.content);
                    let _ = stderr.flush();
                }));
            }
            info!(model = %cohere.model, "Using Cohere generator");
            CohereGenerator::new(cohere)?.run(prompt).await?
        }
        Provider::Nvidia => {
            if stream {
                anyhow::bail!("--stream is only supported with --provider cohere");
            }
            let mut nvidia = NvidiaGeneratorConfig::new(
                model.unwrap_or_else(|| DEFAULT_NVIDIA_GENERATION_MODEL.to_string()),
            );
            if let Some(url) = &config.nvidia_generator_url {
                nvidia.api_url = url.clone();
            }
            info!(model = %nvidia.model, "Using NVIDIA generator");
            NvidiaGenerator::new(nvidia)?.run(prompt).await?
        }
    };

    Ok(serde_json::to_value(output)?)
}

async fn embed(
    texts: Vec<String>,
    model: Option<String>,
    batch_size: usize,
    truncate: Option<EmbeddingTruncateMode>,
    config: &AppConfig,
) -> anyhow::Result<Value> {
    let mut embedder_config = NvidiaEmbedderConfig {
        batch_size,
        truncate,
        ..NvidiaEmbedderConfig::default()
    };
    if let Some(model) = model {
        embedder_config.model = model;
    }
    if let Some(url) = &config.nvidia_embedder_url {
        embedder_config.api_url = url.clone();
    }

    let output = NvidiaDocumentEmbedder::new(embedder_config)?.run(&texts).await?;
    Ok(serde_json::to_value(output)?)
}

async fn models(kind: ModelKind, config: &AppConfig) -> anyhow::Result<Value> {
    let models = match kind {
        ModelKind::Embed => {
            let url = config
                .nvidia_embedder_url
                .clone()
                .unwrap_or_else(|| DEFAULT_EMBEDDER_API_URL.to_string());
            NimEmbedderBackend::new(NimConfig::new(DEFAULT_EMBEDDING_MODEL, url))?
                .models()
                .await?
        }
        ModelKind::Generate => {
            let url = config
                .nvidia_generator_url
                .clone()
                .unwrap_or_else(|| DEFAULT_GENERATOR_API_URL.to_string());
            NimGeneratorBackend::new(NimConfig::new(DEFAULT_NVIDIA_GENERATION_MODEL, url))?
                .models()
                .await?
        }
    };

    info!(count = models.len(), "Listed models");
    Ok(json!({ "models": models }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate_defaults() {
        let cli = Cli::try_parse_from(["genai", "generate", "What's the capital of France?"]).unwrap();
        match cli.command {
            Command::Generate {
                prompt,
                provider,
                model,
                stream,
            } => {
                assert_eq!(prompt, "What's the capital of France?");
                assert_eq!(provider, Provider::Cohere);
                assert!(model.is_none());
                assert!(!stream);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_embed_with_truncate() {
        let cli = Cli::try_parse_from([
            "genai", "embed", "a", "b", "--truncate", "end", "--batch-size", "8",
        ])
        .unwrap();
        match cli.command {
            Command::Embed {
                texts,
                batch_size,
                truncate,
                ..
            } => {
                assert_eq!(texts, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(batch_size, 8);
                assert_eq!(truncate, Some(EmbeddingTruncateMode::End));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_embed_requires_text() {
        assert!(Cli::try_parse_from(["genai", "embed"]).is_err());
    }

    #[test]
    fn test_parse_models_kind() {
        let cli = Cli::try_parse_from(["genai", "models", "--kind", "embed"]).unwrap();
        assert!(matches!(cli.command, Command::Models { kind: ModelKind::Embed }));
        assert_eq!(cli.command.name(), "models");
    }
}
