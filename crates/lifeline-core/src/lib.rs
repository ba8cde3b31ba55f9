//! Pacing, cadence, comment scoring, and the tick cycle for the Lifeline
//! story engine.
//!
//! The post counter in the state document is the only story clock. From it
//! this crate derives the protagonist's age and life phase, decides when
//! digests and tech epochs are due, ranks reader comments, and drives the
//! text generator one tick at a time.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `lifeline-config.yaml` into
//!   strongly-typed structs.
//! - [`pacing`] -- [`PacingModel`]: age, phase, year progress, calendar.
//! - [`cadence`] -- [`CadenceScheduler`]: digest and tech-epoch triggers.
//! - [`comments`] -- [`CommentRelevanceScorer`]: reader comment ranking.
//! - [`plot`] -- Age-triggered one-time plot points.
//! - [`generator`] -- [`StoryGenerator`] trait and [`TemplateGenerator`].
//! - [`orchestrator`] -- [`NarrativeOrchestrator`], the tick cycle.
//!
//! [`PacingModel`]: pacing::PacingModel
//! [`CadenceScheduler`]: cadence::CadenceScheduler
//! [`CommentRelevanceScorer`]: comments::CommentRelevanceScorer
//! [`StoryGenerator`]: generator::StoryGenerator
//! [`TemplateGenerator`]: generator::TemplateGenerator
//! [`NarrativeOrchestrator`]: orchestrator::NarrativeOrchestrator

pub mod cadence;
pub mod comments;
pub mod config;
pub mod generator;
pub mod orchestrator;
pub mod pacing;
pub mod plot;
