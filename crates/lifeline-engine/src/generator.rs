//! The generator selected by `generator.mode`.

use lifeline_core::generator::{
    DigestRequest, EpochDraft, EpochRequest, GenerationContext, GenerationError, StoryGenerator,
    TemplateGenerator,
};
use lifeline_llm::LlmStoryGenerator;

/// Enum dispatch over the available generators.
pub enum ConfiguredGenerator {
    /// Deterministic local templates.
    Template(TemplateGenerator),
    /// A live LLM backend.
    Llm(Box<LlmStoryGenerator>),
}

impl StoryGenerator for ConfiguredGenerator {
    fn name(&self) -> &str {
        match self {
            Self::Template(g) => g.name(),
            Self::Llm(g) => g.name(),
        }
    }

    async fn generate_posts(&self, ctx: &GenerationContext) -> Result<Vec<String>, GenerationError> {
        match self {
            Self::Template(g) => g.generate_posts(ctx).await,
            Self::Llm(g) => g.generate_posts(ctx).await,
        }
    }

    async fn generate_digest(&self, request: &DigestRequest) -> Result<String, GenerationError> {
        match self {
            Self::Template(g) => g.generate_digest(request).await,
            Self::Llm(g) => g.generate_digest(request).await,
        }
    }

    async fn generate_tech_epoch(&self, request: &EpochRequest) -> Result<EpochDraft, GenerationError> {
        match self {
            Self::Template(g) => g.generate_tech_epoch(request).await,
            Self::Llm(g) => g.generate_tech_epoch(request).await,
        }
    }
}
