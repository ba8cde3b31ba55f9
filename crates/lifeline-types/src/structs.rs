//! Core entity structs for the Lifeline story engine.
//!
//! Everything here except [`CommentAnalysis`] is persisted inside the
//! [`SimulationState`](crate::SimulationState) document. Persisted records
//! are immutable once appended.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{CommentTag, Impact, Mood};
use crate::ids::PostId;

/// A single generated post in the story stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Unique post identifier.
    pub id: PostId,
    /// 1-based position of this post in the full story (equals
    /// `total_posts` right after the post was appended).
    pub sequence: u64,
    /// Post body as published.
    pub text: String,
    /// Simulated age of the protagonist when the post was written.
    pub age: f64,
    /// Story-calendar date of the post.
    pub simulated_date: NaiveDate,
    /// Wall-clock creation time.
    pub created_at: DateTime<Utc>,
}

/// A higher-level summary of a trailing window of posts.
///
/// The content is opaque text supplied by the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    /// Digest body.
    pub content: String,
    /// Simulated age when the digest was produced.
    pub age: f64,
    /// Wall-clock creation time.
    pub created_at: DateTime<Utc>,
    /// Number of posts the digest summarises.
    pub posts_covered: u64,
    /// Story post count the digest summarises up to (inclusive).
    pub through_post: u64,
}

/// Technology snapshot for a fixed span of simulated years.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechEpoch {
    /// Sequential epoch index.
    pub epoch_index: u32,
    /// First story-calendar year covered (inclusive).
    pub year_range_start: i32,
    /// First story-calendar year of the next epoch (exclusive).
    pub year_range_end: i32,
    /// Technologies in everyday use during this epoch.
    pub mainstream: BTreeSet<String>,
    /// Technologies appearing on the horizon during this epoch.
    pub emerging: BTreeSet<String>,
}

impl TechEpoch {
    /// Whether the given story-calendar year falls inside this epoch.
    pub const fn covers_year(&self, year: i32) -> bool {
        year >= self.year_range_start && year < self.year_range_end
    }
}

/// A one-time life event. At most one plot point of each `kind` exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotPoint {
    /// Event kind, the deduplication key (e.g. `first_child`).
    pub kind: String,
    /// Short title for prompts.
    pub title: String,
    /// Longer description for prompts.
    pub description: String,
    /// Simulated age at which the event happened.
    pub age: f64,
    /// Wall-clock time the event was recorded.
    pub timestamp: DateTime<Utc>,
}

/// A recurring character in the protagonist's life.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Role the character plays (`partner`, `mentor`, ...). Unique key.
    pub role: String,
    /// Display name.
    pub name: String,
    /// Simulated age at which the relationship began.
    pub since_age: f64,
}

/// A reader comment as delivered by the comment ingestion collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawComment {
    /// Comment body, possibly including platform mentions.
    pub content: String,
    /// Author handle.
    pub author: String,
    /// When the comment was posted.
    pub created_at: DateTime<Utc>,
}

/// Scored view of a reader comment. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAnalysis {
    /// Comment body with self-mentions stripped.
    pub content: String,
    /// Author handle.
    pub author: String,
    /// How strongly the comment asks for a change.
    pub impact: Impact,
    /// Topic families the comment touches.
    pub types: BTreeSet<CommentTag>,
    /// Domain vocabulary terms found in the comment.
    pub keywords: BTreeSet<String>,
    /// Tone of the comment.
    pub mood: Mood,
    /// Total relevance score used for ranking.
    pub relevance_score: u32,
}

/// Position of the story within its current simulated year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearProgress {
    /// Whole simulated years elapsed since the story started.
    pub year: u64,
    /// Percentage of the current simulated year already told.
    pub progress_pct: f64,
}

impl Default for YearProgress {
    fn default() -> Self {
        Self {
            year: 0,
            progress_pct: 0.0,
        }
    }
}
