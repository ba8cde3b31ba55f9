//! Live LLM story generator for the Lifeline story engine.
//!
//! Implements [`lifeline_core::generator::StoryGenerator`] on top of
//! OpenAI-compatible and Anthropic chat APIs. Prompts are `minijinja`
//! templates loaded from disk; responses are parsed leniently into posts,
//! digests, and technology epochs.
//!
//! Credentials come from the environment (see [`LlmConfig::from_env`]).

pub mod backend;
pub mod config;
pub mod error;
pub mod generator;
pub mod parse;
pub mod prompt;

pub use backend::LlmBackend;
pub use config::{BackendType, LlmBackendConfig, LlmConfig};
pub use error::LlmError;
pub use generator::LlmStoryGenerator;
pub use prompt::{PromptEngine, RenderedPrompt};
