//! Text generator trait and the local template implementation.
//!
//! The engine hands a [`GenerationContext`], [`DigestRequest`], or
//! [`EpochRequest`] to a [`StoryGenerator`] and gets text back. Whether the
//! text comes from a live model or from local templates is a configuration
//! choice; the engine only depends on this trait.
//!
//! [`TemplateGenerator`] needs no network access. It is the default in
//! development and the fallback when a live generator fails.

use std::collections::BTreeSet;
use std::future::Future;

use chrono::{Datelike, NaiveDate};
use lifeline_types::{
    CommentAnalysis, DigestReason, LifePhase, PlotPoint, Relationship, TechEpoch, YearProgress,
};
use serde::Serialize;

/// Errors a generator can report. All of them are transient from the
/// engine's point of view.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The backend could not be reached or refused the request.
    #[error("generator unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// The call did not finish within the configured bound.
    #[error("generator timed out after {seconds}s")]
    Timeout {
        /// The bound that was exceeded.
        seconds: u64,
    },

    /// The backend answered with something unusable.
    #[error("invalid generator response: {message}")]
    InvalidResponse {
        /// Description of the problem.
        message: String,
    },
}

/// Everything the generator needs to write the next posts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationContext {
    /// Protagonist name.
    pub protagonist: String,
    /// Current simulated age.
    pub age: f64,
    /// Current life phase.
    pub phase: LifePhase,
    /// Narrative guidance for the phase.
    pub phase_profile: Option<String>,
    /// Position in the current simulated year.
    pub year_progress: YearProgress,
    /// Story-calendar date of the next post.
    pub simulated_date: NaiveDate,
    /// Posts told so far.
    pub total_posts: u64,
    /// Number of posts to write.
    pub posts_requested: u32,
    /// Character limit per post.
    pub max_post_chars: usize,
    /// Content of the most recent digest.
    pub last_digest: Option<String>,
    /// Highest-ranked reader comments, most relevant first.
    pub ranked_comments: Vec<CommentAnalysis>,
    /// Tech epoch covering the current year.
    pub active_epoch: Option<TechEpoch>,
    /// Next tech epoch, when already known.
    pub upcoming_epoch: Option<TechEpoch>,
    /// Life events so far.
    pub plot_points: Vec<PlotPoint>,
    /// Recurring characters.
    pub relationships: Vec<Relationship>,
    /// Texts of the latest posts, oldest first.
    pub recent_posts: Vec<String>,
}

/// Request for a digest over the posts since the previous digest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigestRequest {
    /// Protagonist name.
    pub protagonist: String,
    /// Current simulated age.
    pub age: f64,
    /// Current life phase.
    pub phase: LifePhase,
    /// Story-calendar date of the newest covered post.
    pub simulated_date: NaiveDate,
    /// Why the digest is being written.
    pub reason: DigestReason,
    /// Content of the previous digest.
    pub previous_digest: Option<String>,
    /// Texts of the covered posts, oldest first.
    pub posts: Vec<String>,
    /// Life events so far.
    pub plot_points: Vec<PlotPoint>,
}

/// Request for the next tech epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochRequest {
    /// Index of the epoch to describe.
    pub epoch_index: u32,
    /// First story-calendar year of the epoch.
    pub year_range_start: i32,
    /// First story-calendar year after the epoch.
    pub year_range_end: i32,
    /// Technology acceleration factor at the start of the epoch.
    pub acceleration: f64,
    /// The epoch before this one, if any.
    pub previous: Option<TechEpoch>,
}

/// The generated part of a tech epoch. Indices and year ranges are the
/// engine's, never the generator's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct EpochDraft {
    /// Technologies in everyday use.
    pub mainstream: BTreeSet<String>,
    /// Technologies on the horizon.
    pub emerging: BTreeSet<String>,
}

/// A source of story text.
pub trait StoryGenerator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Write `ctx.posts_requested` posts, in story order.
    fn generate_posts(
        &self,
        ctx: &GenerationContext,
    ) -> impl Future<Output = Result<Vec<String>, GenerationError>> + Send;

    /// Summarise the posts in `request`.
    fn generate_digest(
        &self,
        request: &DigestRequest,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;

    /// Describe the technology landscape of an epoch.
    fn generate_tech_epoch(
        &self,
        request: &EpochRequest,
    ) -> impl Future<Output = Result<EpochDraft, GenerationError>> + Send;
}

// =============================================================================
// Template generator
// =============================================================================

/// Post bodies by phase, picked round-robin by post count.
const POST_TEMPLATES: &[(LifePhase, &[&str])] = &[
    (
        LifePhase::EarlyCareer,
        &[
            "Shipped my first real feature today. Nobody noticed, which I am told is the goal.",
            "Late night debugging session, cheap noodles, and a city that never quite sleeps.",
            "Called home and tried to explain what I do all day. Mom still thinks I fix printers.",
            "Another coffee, another pull request. Slowly learning how big systems actually work.",
        ],
    ),
    (
        LifePhase::GrowthPhase,
        &[
            "Led my first design review. Turns out listening is most of the job.",
            "Weekend spent building something small with people I trust. Best kind of weekend.",
            "Thinking a lot about what technology does to the neighborhoods it touches.",
            "Quiet dinner at home, laptops closed. Rare and worth it.",
        ],
    ),
    (
        LifePhase::PeakPhase,
        &[
            "Bedtime stories tonight were about how the internet works. Tough crowd.",
            "Hard call at work today. Picked the team over the deadline.",
            "The tools keep getting faster. The questions keep getting harder.",
            "School pickup, board meeting, school pickup again. Balance is a verb.",
        ],
    ),
    (
        LifePhase::MaturePhase,
        &[
            "Coffee with a young engineer who reminded me why I started.",
            "The kids are teaching me their tools now. Fair trade.",
            "Wrote down what I wish someone had told me at twenty two.",
            "Long walk, long conversation about what we owe the next generation.",
        ],
    ),
    (
        LifePhase::WisdomPhase,
        &[
            "Grandkids asked what the world was like before. Hard to describe, easy to miss.",
            "Most of what mattered was never on a roadmap.",
            "Still reading every morning. The questions outlive the answers.",
            "Quiet afternoon in the garden, thinking about how far it all came.",
        ],
    ),
];

/// Technology landscape by epoch index.
const TECH_CATALOG: &[(&[&str], &[&str])] = &[
    (
        &["smartphones", "cloud computing", "large language models"],
        &["AI agents", "spatial computing"],
    ),
    (
        &["AI assistants", "electric vehicles", "remote work platforms"],
        &["humanoid robots", "gene therapy"],
    ),
    (
        &["autonomous vehicles", "personal AI tutors", "AR glasses"],
        &["fusion pilot plants", "brain-computer interfaces"],
    ),
    (
        &["home robots", "precision medicine", "smart grids"],
        &["quantum networking", "orbital manufacturing"],
    ),
    (
        &["neural interfaces", "lab-grown food", "fusion power"],
        &["longevity therapies", "lunar settlements"],
    ),
    (
        &["quantum computing", "climate restoration systems"],
        &["synthetic biology at scale", "interplanetary logistics"],
    ),
];

/// Deterministic local generator.
#[derive(Debug, Clone, Default)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    /// Create a template generator.
    pub const fn new() -> Self {
        Self
    }

    fn templates_for(phase: LifePhase) -> &'static [&'static str] {
        POST_TEMPLATES
            .iter()
            .find(|(p, _)| *p == phase)
            .map(|(_, t)| *t)
            .unwrap_or_default()
    }

    fn posts(ctx: &GenerationContext) -> Vec<String> {
        let templates = Self::templates_for(ctx.phase);
        let header = format!("[{} | Age {:.1}]", ctx.simulated_date.year(), ctx.age);
        let count = usize::try_from(ctx.posts_requested).unwrap_or(usize::MAX);
        let offset = usize::try_from(ctx.total_posts).unwrap_or(0);

        let mut posts = Vec::with_capacity(count);
        if let Some(top) = ctx.ranked_comments.first() {
            posts.push(format!(
                "{header} Someone suggested: \"{}\". {} is thinking it over.",
                top.content, ctx.protagonist
            ));
        }
        let mut i = 0_usize;
        while posts.len() < count {
            let pick = offset
                .checked_add(i)
                .and_then(|n| n.checked_rem(templates.len()))
                .and_then(|n| templates.get(n))
                .copied()
                .unwrap_or("Another ordinary day.");
            posts.push(format!("{header} {pick}"));
            i = i.saturating_add(1);
        }
        posts.truncate(count);
        posts
    }

    fn digest(request: &DigestRequest) -> String {
        let latest = request.posts.last().map_or("", String::as_str);
        format!(
            "{} at {:.1} ({}), {} posts since the last update. Latest: {latest}",
            request.protagonist,
            request.age,
            request.phase,
            request.posts.len(),
        )
    }

    fn epoch(request: &EpochRequest) -> EpochDraft {
        let index = usize::try_from(request.epoch_index).unwrap_or(usize::MAX);
        let (mainstream, emerging) = TECH_CATALOG
            .get(index)
            .or_else(|| TECH_CATALOG.last())
            .copied()
            .unwrap_or_default();

        let mut draft = EpochDraft {
            mainstream: mainstream.iter().map(|s| (*s).to_owned()).collect(),
            emerging: emerging.iter().map(|s| (*s).to_owned()).collect(),
        };
        // Whatever was emerging last epoch has gone mainstream.
        if let Some(previous) = &request.previous {
            draft.mainstream.extend(previous.emerging.iter().cloned());
        }
        draft.emerging.retain(|t| !draft.mainstream.contains(t));
        draft
    }
}

impl StoryGenerator for TemplateGenerator {
    fn name(&self) -> &str {
        "template"
    }

    async fn generate_posts(&self, ctx: &GenerationContext) -> Result<Vec<String>, GenerationError> {
        Ok(Self::posts(ctx))
    }

    async fn generate_digest(&self, request: &DigestRequest) -> Result<String, GenerationError> {
        Ok(Self::digest(request))
    }

    async fn generate_tech_epoch(&self, request: &EpochRequest) -> Result<EpochDraft, GenerationError> {
        Ok(Self::epoch(request))
    }
}
