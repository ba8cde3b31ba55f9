//! Prompt template loading and rendering via `minijinja`.
//!
//! Templates are read from an operator-editable directory (default
//! `templates/`) so the narrative voice can be tuned without recompiling.
//! Every template receives the request under `request` and the name of
//! the task (`posts`, `digest`, or `epoch`) under `task`.

use std::path::Path;

use lifeline_core::generator::{DigestRequest, EpochRequest, GenerationContext};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::error::LlmError;

/// Template files the engine expects in its directory.
pub const TEMPLATE_FILES: [&str; 4] = ["system.j2", "posts.j2", "digest.j2", "epoch.j2"];

/// Renders generator requests into LLM prompts.
pub struct PromptEngine {
    env: Environment<'static>,
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// System message establishing the narrator's voice.
    pub system: String,
    /// User message with the task and its context.
    pub user: String,
    /// Whether the response must be a JSON object.
    pub expects_json: bool,
}

impl PromptEngine {
    /// Load every template from `dir`.
    pub fn new(dir: &Path) -> Result<Self, LlmError> {
        let mut env = Environment::new();
        for file in TEMPLATE_FILES {
            let name = file.trim_end_matches(".j2");
            let path = dir.join(file);
            let source = std::fs::read_to_string(&path).map_err(|e| {
                LlmError::Template(format!("failed to read {}: {e}", path.display()))
            })?;
            env.add_template_owned(name.to_owned(), source)
                .map_err(|e| LlmError::Template(format!("failed to add {name} template: {e}")))?;
        }
        Ok(Self { env })
    }

    /// Prompt for the next batch of posts.
    pub fn render_posts(&self, ctx: &GenerationContext) -> Result<RenderedPrompt, LlmError> {
        self.render("posts", ctx, true)
    }

    /// Prompt for a digest of the latest posts.
    pub fn render_digest(&self, request: &DigestRequest) -> Result<RenderedPrompt, LlmError> {
        self.render("digest", request, false)
    }

    /// Prompt for a technology epoch.
    pub fn render_epoch(&self, request: &EpochRequest) -> Result<RenderedPrompt, LlmError> {
        self.render("epoch", request, true)
    }

    fn render<S: Serialize>(
        &self,
        task: &str,
        request: &S,
        expects_json: bool,
    ) -> Result<RenderedPrompt, LlmError> {
        let vars = context! { task => task, request => request };
        Ok(RenderedPrompt {
            system: self.render_one("system", &vars)?,
            user: self.render_one(task, &vars)?,
            expects_json,
        })
    }

    fn render_one(&self, name: &str, vars: &minijinja::Value) -> Result<String, LlmError> {
        self.env
            .get_template(name)
            .map_err(|e| LlmError::Template(format!("missing {name} template: {e}")))?
            .render(vars)
            .map_err(|e| LlmError::Template(format!("{name} render failed: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use lifeline_types::{DigestReason, LifePhase, YearProgress};

    use super::*;

    fn write_templates(dir: &Path) {
        let files = [
            (
                "system.j2",
                "{% if request.protagonist %}You are {{ request.protagonist }}.{% else %}You forecast technology.{% endif %}",
            ),
            (
                "posts.j2",
                "Age {{ request.age }} ({{ request.phase | replace('_', ' ') }}). Write {{ request.posts_requested }} posts under {{ request.max_post_chars }} characters.\n{% for c in request.ranked_comments %}- {{ c.content }}\n{% endfor %}",
            ),
            (
                "digest.j2",
                "Summarise {{ request.posts | length }} posts ({{ request.reason }}).",
            ),
            (
                "epoch.j2",
                "Epoch {{ request.epoch_index }}: {{ request.year_range_start }}-{{ request.year_range_end }}",
            ),
        ];
        for (name, body) in files {
            std::fs::write(dir.join(name), body).unwrap();
        }
    }

    fn context() -> GenerationContext {
        GenerationContext {
            protagonist: "Xavier".to_owned(),
            age: 22.5,
            phase: LifePhase::EarlyCareer,
            phase_profile: None,
            year_progress: YearProgress::default(),
            simulated_date: NaiveDate::from_ymd_opt(2025, 7, 2).unwrap(),
            total_posts: 24,
            posts_requested: 2,
            max_post_chars: 280,
            last_digest: None,
            ranked_comments: Vec::new(),
            active_epoch: None,
            upcoming_epoch: None,
            plot_points: Vec::new(),
            relationships: Vec::new(),
            recent_posts: Vec::new(),
        }
    }

    #[test]
    fn renders_posts_prompt() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());
        let engine = PromptEngine::new(dir.path()).unwrap();

        let prompt = engine.render_posts(&context()).unwrap();
        assert_eq!(prompt.system, "You are Xavier.");
        assert!(prompt.user.contains("Age 22.5 (early career)"));
        assert!(prompt.user.contains("Write 2 posts under 280 characters"));
        assert!(prompt.expects_json);
    }

    #[test]
    fn renders_digest_and_epoch_prompts() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());
        let engine = PromptEngine::new(dir.path()).unwrap();

        let digest = engine
            .render_digest(&DigestRequest {
                protagonist: "Xavier".to_owned(),
                age: 23.0,
                phase: LifePhase::EarlyCareer,
                simulated_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                reason: DigestReason::Interval,
                previous_digest: None,
                posts: vec!["a".to_owned(), "b".to_owned()],
                plot_points: Vec::new(),
            })
            .unwrap();
        assert_eq!(digest.user, "Summarise 2 posts (interval).");
        assert!(!digest.expects_json);

        let epoch = engine
            .render_epoch(&EpochRequest {
                epoch_index: 1,
                year_range_start: 2030,
                year_range_end: 2035,
                acceleration: 1.28,
                previous: None,
            })
            .unwrap();
        assert_eq!(epoch.system, "You forecast technology.");
        assert_eq!(epoch.user, "Epoch 1: 2030-2035");
    }

    #[test]
    fn missing_template_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("system.j2"), "test").unwrap();
        assert!(PromptEngine::new(dir.path()).is_err());
    }

    #[test]
    fn shipped_templates_render() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../templates");
        if !dir.join("posts.j2").exists() {
            return;
        }
        let engine = PromptEngine::new(&dir).unwrap();
        let prompt = engine.render_posts(&context()).unwrap();
        assert!(prompt.system.contains("Xavier"));
        assert!(prompt.user.contains("280"));
    }
}
