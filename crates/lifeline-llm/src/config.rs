//! Backend configuration for the live generator.
//!
//! Credentials never live in the YAML file. They are read from environment
//! variables with a `LLM_DEFAULT_` prefix for the primary backend and an
//! optional `LLM_FALLBACK_` prefix for the backend tried when the primary
//! fails.

use std::str::FromStr;

use crate::error::LlmError;

/// Default response budget per completion.
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Configuration for a single LLM backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmBackendConfig {
    /// The backend type.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Maximum tokens in one completion.
    pub max_tokens: u32,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama, xAI).
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
}

impl FromStr for BackendType {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "deepseek" | "ollama" | "xai" | "grok" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(LlmError::Config(format!("unknown backend type: {other}"))),
        }
    }
}

/// Primary and optional fallback backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    /// Backend used for every request.
    pub primary: LlmBackendConfig,
    /// Backend tried once when the primary fails.
    pub fallback: Option<LlmBackendConfig>,
}

impl LlmConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `LLM_DEFAULT_BACKEND` -- primary backend type
    /// - `LLM_DEFAULT_API_URL` -- primary API base URL
    /// - `LLM_DEFAULT_API_KEY` -- primary API key
    /// - `LLM_DEFAULT_MODEL` -- primary model name
    ///
    /// Optional variables:
    /// - `LLM_DEFAULT_MAX_TOKENS` -- completion budget (default 1024)
    /// - `LLM_FALLBACK_*` -- the same set for the fallback backend; it is
    ///   only configured when `LLM_FALLBACK_BACKEND` is present
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LlmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let primary = load_backend_config(&lookup, "LLM_DEFAULT")?;
        let fallback = if lookup("LLM_FALLBACK_BACKEND").is_some() {
            Some(load_backend_config(&lookup, "LLM_FALLBACK")?)
        } else {
            None
        };
        Ok(Self { primary, fallback })
    }
}

fn required<F>(lookup: &F, name: &str) -> Result<String, LlmError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| LlmError::Config(format!("missing required env var {name}")))
}

/// Load an LLM backend config from a set of prefixed variables.
fn load_backend_config<F>(lookup: &F, prefix: &str) -> Result<LlmBackendConfig, LlmError>
where
    F: Fn(&str) -> Option<String>,
{
    let backend_type: BackendType = required(lookup, &format!("{prefix}_BACKEND"))?.parse()?;
    let api_url = required(lookup, &format!("{prefix}_API_URL"))?;
    let api_key = required(lookup, &format!("{prefix}_API_KEY"))?;
    let model = required(lookup, &format!("{prefix}_MODEL"))?;

    let max_tokens = match lookup(&format!("{prefix}_MAX_TOKENS")) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| LlmError::Config(format!("invalid {prefix}_MAX_TOKENS: {e}")))?,
        None => DEFAULT_MAX_TOKENS,
    };

    Ok(LlmBackendConfig {
        backend_type,
        api_url: api_url.trim_end_matches('/').to_owned(),
        api_key,
        model,
        max_tokens,
    })
}
