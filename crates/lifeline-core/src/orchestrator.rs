//! The tick cycle that advances the story.
//!
//! Each call to [`NarrativeOrchestrator::tick`] runs these steps:
//!
//! 1. **Load** -- read the state document through the [`StateStore`].
//! 2. **Completion** -- once the end age is reached, mark the story
//!    completed and stop.
//! 3. **Cadence** -- ask the [`CadenceScheduler`] what is due.
//! 4. **Tech epoch** -- when due, request the next epoch, append it, and
//!    persist it on its own.
//! 5. **Comments** -- rank pending reader comments.
//! 6. **Posts** -- build a [`GenerationContext`] and request the next posts.
//! 7. **Append** -- add the posts to a draft state, refresh age and phase,
//!    and fire plot-point triggers.
//! 8. **Digest** -- when due, request a digest over the posts counted at
//!    step 3. Posts appended this tick open the next window.
//! 9. **Save** -- persist the draft.
//!
//! Steps 7 and 8 form one unit: a generator failure at step 6 or 8 leaves
//! the persisted document exactly as it was before the tick.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lifeline_store::{StateStore, StoreError};
use lifeline_types::{
    CommentAnalysis, Digest, DigestReason, LifePhase, Post, PostId, RawComment, SimulationState,
    StateError, TechEpoch,
};
use tracing::{debug, info, warn};

use crate::cadence::{CadenceDecision, CadenceScheduler};
use crate::comments::CommentRelevanceScorer;
use crate::config::{ConfigError, EngineConfig};
use crate::generator::{
    DigestRequest, EpochRequest, GenerationContext, GenerationError, StoryGenerator,
    TemplateGenerator,
};
use crate::pacing::PacingModel;
use crate::plot;

/// Latest post texts included in a generation context.
const CONTEXT_RECENT_POSTS: usize = 10;

/// Errors that abort a tick. Generator failures are not errors; they pause
/// the tick instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration was rejected at construction.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// Reading or writing the state document failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// A state invariant was violated while building the draft.
    #[error("invariant violation: {source}")]
    Invariant {
        /// The violated invariant.
        #[from]
        source: StateError,
    },
}

/// Lifecycle of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// Waiting for the next tick.
    Idle,
    /// A tick is running.
    Ticking,
    /// The story reached its end age. Terminal.
    Completed,
    /// The last tick paused or failed; the next tick retries.
    Failed,
}

/// What one tick achieved.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// New posts were persisted.
    Advanced(TickReport),
    /// A generator failed; nothing from the failed step was persisted.
    Paused {
        /// Why the tick stopped.
        reason: String,
    },
    /// The story is over. No generation was attempted.
    Completed,
}

/// Summary of an advanced tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Post counter after the tick.
    pub total_posts: u64,
    /// Age after the tick.
    pub age: f64,
    /// Life phase after the tick.
    pub phase: LifePhase,
    /// Posts appended this tick.
    pub posts_added: u64,
    /// Why a digest was written, if one was.
    pub digest: Option<DigestReason>,
    /// Index of the tech epoch appended this tick, if any.
    pub epoch: Option<u32>,
    /// Plot point kinds that fired.
    pub plot_points: Vec<String>,
    /// Ranked comments handed to the generator.
    pub comments_used: usize,
    /// Whether this tick reached the end age.
    pub story_completed: bool,
}

/// Composes pacing, cadence, scoring, generation, and persistence.
pub struct NarrativeOrchestrator<G> {
    config: EngineConfig,
    pacing: PacingModel,
    cadence: CadenceScheduler,
    scorer: CommentRelevanceScorer,
    store: StateStore,
    generator: G,
    fallback: TemplateGenerator,
    status: EngineStatus,
}

impl<G: StoryGenerator> NarrativeOrchestrator<G> {
    /// Build an orchestrator over `config.store.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the configuration is invalid.
    pub fn new(config: EngineConfig, generator: G) -> Result<Self, EngineError> {
        config.validate()?;
        let pacing = PacingModel::new(&config.pacing)?;
        let cadence = CadenceScheduler::new(config.cadence.clone(), pacing.clone())
            .with_posts_per_tick(config.story.posts_per_tick);
        let scorer = CommentRelevanceScorer::new(&config.comments);
        let start_age = pacing.start_age();
        let genesis = SimulationState::genesis(start_age, pacing.phase(start_age), Utc::now());
        let store = StateStore::new(config.store.clone(), genesis);

        Ok(Self {
            config,
            pacing,
            cadence,
            scorer,
            store,
            generator,
            fallback: TemplateGenerator::new(),
            status: EngineStatus::Idle,
        })
    }

    /// Current lifecycle status.
    pub const fn status(&self) -> EngineStatus {
        self.status
    }

    /// The underlying store.
    pub const fn store(&self) -> &StateStore {
        &self.store
    }

    /// The pacing model.
    pub const fn pacing(&self) -> &PacingModel {
        &self.pacing
    }

    /// The active generator.
    pub const fn generator(&self) -> &G {
        &self.generator
    }

    /// Run one tick.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on persistence failures and invariant
    /// violations. Generator failures yield [`TickOutcome::Paused`].
    pub async fn tick(&mut self, comments: &[RawComment]) -> Result<TickOutcome, EngineError> {
        if self.status == EngineStatus::Completed {
            return Ok(TickOutcome::Completed);
        }
        self.status = EngineStatus::Ticking;

        let result = self.run_tick(comments).await;
        self.status = match &result {
            Ok(TickOutcome::Completed) => EngineStatus::Completed,
            Ok(TickOutcome::Advanced(report)) if report.story_completed => EngineStatus::Completed,
            Ok(TickOutcome::Advanced(_)) => EngineStatus::Idle,
            Ok(TickOutcome::Paused { .. }) | Err(_) => EngineStatus::Failed,
        };
        result
    }

    async fn run_tick(&self, comments: &[RawComment]) -> Result<TickOutcome, EngineError> {
        let now = Utc::now();

        // --- Step 1: Load ---
        let mut state = self.store.load()?;

        // --- Step 2: Completion ---
        if state.is_completed() || self.pacing.is_complete(state.total_posts()) {
            if !state.is_completed() {
                state.mark_completed(now);
                self.store.save(&state)?;
                info!(total_posts = state.total_posts(), "story completed");
            }
            return Ok(TickOutcome::Completed);
        }

        // --- Step 3: Cadence ---
        let decision = self.cadence.decide(&state, state.recent_posts());
        debug!(
            total_posts = state.total_posts(),
            digest_due = decision.digest_due,
            tech_epoch_due = decision.tech_epoch_due,
            "cadence decided"
        );

        // --- Step 4: Tech epoch ---
        let epoch = match self.advance_epoch(&mut state, &decision).await? {
            Ok(epoch) => epoch,
            Err(error) => return Ok(paused("tech epoch", &error)),
        };

        // --- Step 5: Comments ---
        let ranked = if comments.is_empty() {
            Vec::new()
        } else {
            self.scorer.rank(comments)
        };

        // --- Step 6: Posts ---
        let ctx = self.build_context(&state, ranked);
        let texts = match self
            .with_fallback(
                "posts",
                async { non_empty(self.generator.generate_posts(&ctx).await?) },
                async { non_empty(self.fallback.generate_posts(&ctx).await?) },
            )
            .await
        {
            Ok(texts) => texts,
            Err(error) => return Ok(paused("posts", &error)),
        };

        // --- Step 7: Append ---
        let mut draft = state.clone();
        let requested = usize::try_from(ctx.posts_requested).unwrap_or(usize::MAX);
        let mut posts_added: u64 = 0;
        for text in texts.into_iter().take(requested) {
            let sequence = draft
                .total_posts()
                .checked_add(1)
                .ok_or(StateError::CounterOverflow)?;
            draft.append_post(
                Post {
                    id: PostId::new(),
                    sequence,
                    text: truncate_chars(text.trim(), self.config.story.max_post_chars),
                    age: self.pacing.age(sequence),
                    simulated_date: self.pacing.simulated_date(sequence),
                    created_at: now,
                },
                self.config.story.recent_post_window,
            )?;
            posts_added = posts_added.saturating_add(1);
        }

        let total = draft.total_posts();
        let age = self.pacing.age(total);
        let phase = self.pacing.phase(age);
        if phase != state.current_phase() {
            info!(from = %state.current_phase(), to = %phase, age, "life phase changed");
        }
        draft.refresh_derived(age, phase, self.pacing.year_progress(total), now)?;
        let fired = plot::fire_triggers(&self.config.plot.triggers, &mut draft, age, now);

        // --- Step 8: Digest ---
        // Covers the posts the decision counted, not the ones just appended.
        let digest = match decision.digest_reason {
            Some(reason) => match self
                .write_digest(&mut draft, state.total_posts(), reason, now)
                .await?
            {
                Ok(()) => Some(reason),
                Err(error) => return Ok(paused("digest", &error)),
            },
            None => None,
        };

        let story_completed = self.pacing.is_complete(total);
        if story_completed {
            draft.mark_completed(now);
        }

        // --- Step 9: Save ---
        self.store.save(&draft)?;

        info!(
            total_posts = total,
            age,
            phase = %phase,
            posts_added,
            digest = ?digest,
            epoch = ?epoch,
            "tick advanced"
        );
        if story_completed {
            info!(total_posts = total, age, "story completed");
        }

        Ok(TickOutcome::Advanced(TickReport {
            total_posts: total,
            age,
            phase,
            posts_added,
            digest,
            epoch,
            plot_points: fired,
            comments_used: ctx.ranked_comments.len(),
            story_completed,
        }))
    }

    /// Generate, append, and persist the due tech epoch.
    ///
    /// The outer result carries store and invariant errors; the inner one
    /// carries generator failures.
    async fn advance_epoch(
        &self,
        state: &mut SimulationState,
        decision: &CadenceDecision,
    ) -> Result<Result<Option<u32>, GenerationError>, EngineError> {
        let Some(index) = decision.next_epoch_index.filter(|_| decision.tech_epoch_due) else {
            return Ok(Ok(None));
        };
        let (year_range_start, year_range_end) = self.cadence.epoch_year_range(index);
        let request = EpochRequest {
            epoch_index: index,
            year_range_start,
            year_range_end,
            acceleration: self.cadence.acceleration(index),
            previous: state.last_epoch().cloned(),
        };

        let draft = match self
            .with_fallback(
                "tech epoch",
                self.generator.generate_tech_epoch(&request),
                self.fallback.generate_tech_epoch(&request),
            )
            .await
        {
            Ok(draft) => draft,
            Err(error) => return Ok(Err(error)),
        };

        let mut next = state.clone();
        next.append_epoch(TechEpoch {
            epoch_index: index,
            year_range_start,
            year_range_end,
            mainstream: draft.mainstream,
            emerging: draft.emerging,
        })?;
        self.store.save(&next)?;
        *state = next;

        info!(
            epoch_index = index,
            year_range_start, year_range_end, "tech epoch appended"
        );
        Ok(Ok(Some(index)))
    }

    /// Generate and append a digest over the undigested posts up to and
    /// including `through_post`.
    async fn write_digest(
        &self,
        draft: &mut SimulationState,
        through_post: u64,
        reason: DigestReason,
        now: DateTime<Utc>,
    ) -> Result<Result<(), GenerationError>, EngineError> {
        let posts_covered = through_post.saturating_sub(draft.stats().last_digest_post);
        let age = self.pacing.age(through_post);
        let request = DigestRequest {
            protagonist: self.config.story.protagonist.clone(),
            age,
            phase: self.pacing.phase(age),
            simulated_date: self.pacing.simulated_date(through_post),
            reason,
            previous_digest: draft.last_digest().map(|d| d.content.clone()),
            posts: draft
                .undigested_posts()
                .filter(|p| p.sequence <= through_post)
                .map(|p| p.text.clone())
                .collect(),
            plot_points: draft.plot_points().to_vec(),
        };

        let content = match self
            .with_fallback(
                "digest",
                async { non_blank(self.generator.generate_digest(&request).await?) },
                async { non_blank(self.fallback.generate_digest(&request).await?) },
            )
            .await
        {
            Ok(content) => content,
            Err(error) => return Ok(Err(error)),
        };

        draft.append_digest(Digest {
            content,
            age,
            created_at: now,
            posts_covered,
            through_post,
        })?;
        info!(through_post, posts_covered, reason = ?reason, "digest appended");
        Ok(Ok(()))
    }

    fn build_context(
        &self,
        state: &SimulationState,
        ranked_comments: Vec<CommentAnalysis>,
    ) -> GenerationContext {
        let total = state.total_posts();
        let age = self.pacing.age(total);
        let phase = self.pacing.phase(age);
        let current_index = self.cadence.epoch_index_for_age(age);
        let remaining = self.pacing.posts_until_end(total).max(1);
        let posts_requested = u64::from(self.config.story.posts_per_tick).min(remaining);

        let recent = state.recent_posts();
        let skip = recent.len().saturating_sub(CONTEXT_RECENT_POSTS);

        GenerationContext {
            protagonist: self.config.story.protagonist.clone(),
            age,
            phase,
            phase_profile: self.config.story.phase_profiles.get(&phase).cloned(),
            year_progress: self.pacing.year_progress(total),
            simulated_date: self.pacing.simulated_date(total.saturating_add(1)),
            total_posts: total,
            posts_requested: u32::try_from(posts_requested).unwrap_or(u32::MAX),
            max_post_chars: self.config.story.max_post_chars,
            last_digest: state.last_digest().map(|d| d.content.clone()),
            ranked_comments,
            active_epoch: state.epoch(current_index).cloned(),
            upcoming_epoch: current_index
                .checked_add(1)
                .and_then(|i| state.epoch(i))
                .cloned(),
            plot_points: state.plot_points().to_vec(),
            relationships: state.relationships().to_vec(),
            recent_posts: recent.iter().skip(skip).map(|p| p.text.clone()).collect(),
        }
    }

    /// Await `primary` under the generation timeout, then `fallback` when
    /// the primary fails and template fallback is enabled.
    async fn with_fallback<T, P, F>(
        &self,
        stage: &'static str,
        primary: P,
        fallback: F,
    ) -> Result<T, GenerationError>
    where
        P: Future<Output = Result<T, GenerationError>>,
        F: Future<Output = Result<T, GenerationError>>,
    {
        match self.bounded(primary).await {
            Ok(value) => Ok(value),
            Err(error) if self.config.generator.fallback_to_template => {
                warn!(
                    stage,
                    generator = self.generator.name(),
                    %error,
                    "generator failed, falling back to templates"
                );
                self.bounded(fallback).await
            }
            Err(error) => Err(error),
        }
    }

    async fn bounded<T, P>(&self, fut: P) -> Result<T, GenerationError>
    where
        P: Future<Output = Result<T, GenerationError>>,
    {
        let seconds = self.config.generator.timeout_secs;
        tokio::time::timeout(Duration::from_secs(seconds), fut)
            .await
            .unwrap_or(Err(GenerationError::Timeout { seconds }))
    }
}

fn paused(stage: &str, error: &GenerationError) -> TickOutcome {
    warn!(stage, %error, "tick paused");
    TickOutcome::Paused {
        reason: format!("{stage}: {error}"),
    }
}

fn non_empty(texts: Vec<String>) -> Result<Vec<String>, GenerationError> {
    let texts: Vec<String> = texts.into_iter().filter(|t| !t.trim().is_empty()).collect();
    if texts.is_empty() {
        return Err(GenerationError::InvalidResponse {
            message: "no posts returned".to_owned(),
        });
    }
    Ok(texts)
}

fn non_blank(text: String) -> Result<String, GenerationError> {
    if text.trim().is_empty() {
        return Err(GenerationError::InvalidResponse {
            message: "empty digest".to_owned(),
        });
    }
    Ok(text)
}

/// Cut `text` to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text.get(..end).unwrap_or(text).to_owned(),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("你好世界", 2), "你好");
        assert_eq!(truncate_chars("", 2), "");
    }

    #[test]
    fn blank_generator_output_is_invalid() {
        assert!(non_empty(vec!["  ".to_owned()]).is_err());
        assert_eq!(
            non_empty(vec![String::new(), "ok".to_owned()]),
            Ok(vec!["ok".to_owned()])
        );
        assert!(non_blank("\n".to_owned()).is_err());
    }
}
