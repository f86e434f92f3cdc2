//! Error types for AI connectors
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


use genai_config::SecretError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AIConnectorError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Unknown model '{requested}', available: {available}")]
    UnknownModel { requested: String, available: String },

    #[error("Missing credential: {0}")]
    MissingCredential(#[from] SecretError),

    #[error("HTTP error: {0}")]
    HttpError(reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl AIConnectorError {
    /// Classify a non-success HTTP response
    pub fn from_status(provider: &str, status: StatusCode, body: &str) -> Self {
        let message = format!("{} API error ({}): {}", provider, status, body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::AuthenticationError(message),
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimitError(message),
            s if s.is_server_error() => Self::ServiceUnavailable(message),
            _ => Self::ApiError(message),
        }
    }
}

impl From<reqwest::Error> for AIConnectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::HttpError(err)
        }
    }
}

pub type AIConnectorResult<T> = Result<T, AIConnectorError>;

/// Fail with a classified error unless the response is a success
pub(crate) async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> AIConnectorResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    Err(AIConnectorError::from_status(provider, status, &error_text))
}
