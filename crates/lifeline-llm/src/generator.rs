//! [`StoryGenerator`] backed by a live LLM.

use std::path::Path;

use lifeline_core::generator::{
    DigestRequest, EpochDraft, EpochRequest, GenerationContext, GenerationError, StoryGenerator,
};
use tracing::{debug, warn};

use crate::backend::LlmBackend;
use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::parse;
use crate::prompt::{PromptEngine, RenderedPrompt};

/// Generates story text by rendering prompts and calling an LLM backend,
/// retrying once on the fallback backend when one is configured.
pub struct LlmStoryGenerator {
    prompts: PromptEngine,
    primary: LlmBackend,
    fallback: Option<LlmBackend>,
}

impl LlmStoryGenerator {
    /// Build a generator from backend configuration and a template
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Template`] if a template cannot be loaded.
    pub fn new(config: &LlmConfig, templates_dir: &Path) -> Result<Self, LlmError> {
        Ok(Self::from_parts(
            PromptEngine::new(templates_dir)?,
            LlmBackend::new(&config.primary),
            config.fallback.as_ref().map(LlmBackend::new),
        ))
    }

    /// Assemble a generator from already-built parts.
    pub const fn from_parts(
        prompts: PromptEngine,
        primary: LlmBackend,
        fallback: Option<LlmBackend>,
    ) -> Self {
        Self {
            prompts,
            primary,
            fallback,
        }
    }

    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, LlmError> {
        match self.primary.complete(prompt).await {
            Ok(text) => {
                debug!(backend = self.primary.name(), chars = text.len(), "completion received");
                Ok(text)
            }
            Err(error) => {
                let Some(fallback) = &self.fallback else {
                    return Err(error);
                };
                warn!(
                    primary = self.primary.name(),
                    fallback = fallback.name(),
                    %error,
                    "primary backend failed, trying fallback"
                );
                fallback.complete(prompt).await
            }
        }
    }
}

impl StoryGenerator for LlmStoryGenerator {
    fn name(&self) -> &str {
        self.primary.model()
    }

    async fn generate_posts(&self, ctx: &GenerationContext) -> Result<Vec<String>, GenerationError> {
        let prompt = self.prompts.render_posts(ctx)?;
        let raw = self.complete(&prompt).await?;
        Ok(parse::parse_posts(&raw, ctx.posts_requested)?)
    }

    async fn generate_digest(&self, request: &DigestRequest) -> Result<String, GenerationError> {
        let prompt = self.prompts.render_digest(request)?;
        let raw = self.complete(&prompt).await?;
        Ok(parse::parse_digest(&raw)?)
    }

    async fn generate_tech_epoch(&self, request: &EpochRequest) -> Result<EpochDraft, GenerationError> {
        let prompt = self.prompts.render_epoch(request)?;
        let raw = self.complete(&prompt).await?;
        Ok(parse::parse_epoch(&raw)?)
    }
}
