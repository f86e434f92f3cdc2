//! Credentials that are given inline or looked up in the environment

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    #[error("None of the environment variables are set: {0}")]
    Missing(String),

    #[error("Secret token is empty")]
    Empty,
}

/// A credential that is never printed by `Debug`.
///
/// Environment-backed secrets list variable names in priority order. The
/// first variable that is set to a non-empty value wins.
pub enum Secret {
    Token(SecretString),
    EnvVar { names: Vec<String>, strict: bool },
}

impl Secret {
    /// Secret with an inline value
    pub fn from_token(token: impl Into<String>) -> Self {
        Self::Token(SecretString::from(token.into()))
    }

    /// Secret read from the first set variable in `names`; resolving fails if none is set
    pub fn from_env_var<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::EnvVar {
            names: names.into_iter().map(Into::into).collect(),
            strict: true,
        }
    }

    /// Like [`Secret::from_env_var`] but resolves to `None` when no variable is set
    pub fn from_optional_env_var<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::EnvVar {
            names: names.into_iter().map(Into::into).collect(),
            strict: false,
        }
    }

    /// Resolve the secret value
    pub fn resolve_value(&self) -> Result<Option<SecretString>, SecretError> {
        match self {
            Self::Token(token) => {
                if token.expose_secret().is_empty() {
                    Err(SecretError::Empty)
                } else {
                    Ok(Some(SecretString::from(token.expose_secret().to_owned())))
                }
            }
            Self::EnvVar { names, strict } => {
                let found = names.iter().find_map(|name| {
                    std::env::var(name).ok().filter(|value| !value.is_empty())
                });
                match found {
                    Some(value) => Ok(Some(SecretString::from(value))),
                    None if *strict => Err(SecretError::Missing(names.join(", "))),
                    None => {
                        tracing::debug!(variables = %names.join(", "), "Optional secret not set");
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Resolve a secret that must be present
    pub fn resolve_required(&self) -> Result<SecretString, SecretError> {
        match self.resolve_value()? {
            Some(value) => Ok(value),
            None => Err(SecretError::Missing(self.describe())),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Token(_) => "<token>".to_string(),
            Self::EnvVar { names, .. } => names.join(", "),
        }
    }
}

impl Clone for Secret {
    fn clone(&self) -> Self {
        match self {
            Self::Token(token) => Self::Token(SecretString::from(token.expose_secret().to_owned())),
            Self::EnvVar { names, strict } => Self::EnvVar {
                names: names.clone(),
                strict: *strict,
            },
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Secret::Token([REDACTED])"),
            Self::EnvVar { names, strict } => f
                .debug_struct("Secret::EnvVar")
                .field("names", names)
                .field("strict", strict)
                .finish(),
        }
    }
}
