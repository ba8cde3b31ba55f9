//! Error types for the live generator.
//!
//! Every failure surfaces to the engine as a [`GenerationError`], which the
//! tick cycle treats as transient.

use lifeline_core::generator::GenerationError;

/// Errors that can occur while producing story text through an LLM.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Failed to load or render a prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// An LLM backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    Backend(String),

    /// The LLM response could not be turned into story content.
    #[error("response parse error: {0}")]
    Parse(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<LlmError> for GenerationError {
    fn from(error: LlmError) -> Self {
        match error {
            LlmError::Backend(message) => Self::Unavailable { message },
            other => Self::InvalidResponse {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failures_are_unavailable() {
        let err = GenerationError::from(LlmError::Backend("503".to_owned()));
        assert_eq!(
            err,
            GenerationError::Unavailable {
                message: "503".to_owned()
            }
        );
    }

    #[test]
    fn parse_failures_are_invalid_responses() {
        let err = GenerationError::from(LlmError::Parse("no posts".to_owned()));
        assert!(matches!(err, GenerationError::InvalidResponse { .. }));
    }
}
