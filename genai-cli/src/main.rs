//! GenAI CLI
//!
//! Runs one connector operation and prints the result as JSON:
//! - `generate`: single-prompt generation (Cohere or NVIDIA)
//! - `embed`: document embeddings (NVIDIA)
//! - `models`: models served by an NVIDIA endpoint
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


mod commands;

use clap::Parser;
use commands::Cli;
use genai_config::{AppConfig, LogFormat};
use genai_logging::{init_console_logging, init_logging};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Initialize logging
    match config.log_format {
        LogFormat::Json => init_logging("genai", config.log_level()),
        LogFormat::Console => init_console_logging("genai", config.log_level()),
    }

    info!(command = cli.command.name(), "Starting genai");

    let output = match commands::execute(cli.command, &config).await {
        Ok(output) => output,
        Err(e) => {
            error!(error = %e, "Command failed");
            return Err(e);
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
