//! The persisted simulation state document.
//!
//! [`SimulationState`] is the single source of truth for a story. It is
//! serialized as one JSON document with four top-level groups --
//! `metadata`, `story`, `tech`, and `stats` -- and its fields are private:
//! every mutation goes through a method that checks the append-only and
//! ordering invariants, returning [`StateError`] on violation.
//!
//! Violations are programming or configuration errors in the calling
//! sequence. They are raised immediately and never masked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{LifePhase, StoryStatus};
use crate::structs::{Digest, PlotPoint, Post, Relationship, TechEpoch, YearProgress};

/// Invariant violations on [`SimulationState`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    /// A post was appended with a sequence other than `total_posts + 1`.
    #[error("post out of order: expected sequence {expected}, got {found}")]
    PostOutOfOrder {
        /// The sequence the next post must carry.
        expected: u64,
        /// The sequence that was supplied.
        found: u64,
    },

    /// The post counter would overflow.
    #[error("post counter overflow")]
    CounterOverflow,

    /// Derived age would move backwards.
    #[error("age regression: current {current}, proposed {proposed}")]
    AgeRegression {
        /// Age currently recorded.
        current: f64,
        /// Age that was proposed.
        proposed: f64,
    },

    /// A digest references posts that do not exist yet, or precedes the
    /// previous digest.
    #[error("digest out of order: through_post {through_post}, total_posts {total_posts}, previous digest through {previous}")]
    DigestOutOfOrder {
        /// The digest's `through_post`.
        through_post: u64,
        /// The state's current post count.
        total_posts: u64,
        /// `through_post` of the last recorded digest.
        previous: u64,
    },

    /// Epoch `N+1` was appended while epoch `N` is missing.
    #[error("non-sequential tech epoch: expected index {expected}, got {found}")]
    NonSequentialEpoch {
        /// The index the next epoch must carry.
        expected: u32,
        /// The index that was supplied.
        found: u32,
    },

    /// Epoch year ranges would leave a gap or overlap.
    #[error("non-contiguous tech epoch: expected start year {expected_start}, got {found_start}")]
    NonContiguousEpoch {
        /// End year of the previous epoch.
        expected_start: i32,
        /// Start year of the supplied epoch.
        found_start: i32,
    },

    /// An epoch's year range is empty or inverted.
    #[error("invalid epoch year range {start}..{end}")]
    InvalidEpochRange {
        /// Supplied start year.
        start: i32,
        /// Supplied end year.
        end: i32,
    },

    /// The story is completed; no further content may be appended.
    #[error("story already completed")]
    StoryCompleted,

    /// A loaded document is internally inconsistent.
    #[error("inconsistent state: {0}")]
    Inconsistent(String),
}

/// Display metadata, derived from the post counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMetadata {
    /// Cached simulated age; always equals the pacing age of `total_posts`.
    pub current_age: f64,
    /// Life phase derived from `current_age`.
    pub current_phase: LifePhase,
    /// Whether the story can still advance.
    #[serde(default)]
    pub status: StoryStatus,
    /// When the story was started.
    pub created_at: DateTime<Utc>,
    /// When the document was last mutated.
    pub last_update: DateTime<Utc>,
}

/// Story content: the recent post window and append-only records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryRecord {
    /// Bounded window of the most recent posts, oldest first.
    #[serde(default)]
    pub posts: Vec<Post>,
    /// All digests, oldest first.
    #[serde(default)]
    pub digests: Vec<Digest>,
    /// One-time life events, in the order they happened.
    #[serde(default)]
    pub key_plot_points: Vec<PlotPoint>,
    /// Recurring characters, in the order they appeared.
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// The technology timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechRecord {
    /// Contiguous, sequentially indexed epochs.
    #[serde(default)]
    pub epochs: Vec<TechEpoch>,
}

/// Counters. `total_posts` is the only authoritative story clock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateStats {
    /// Posts told since the story began. Never decreases.
    pub total_posts: u64,
    /// Number of digests recorded.
    pub digest_count: u64,
    /// `through_post` of the most recent digest (0 when none).
    pub last_digest_post: u64,
    /// Position within the current simulated year.
    pub year_progress: YearProgress,
}

/// The complete persisted state of one story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    metadata: StateMetadata,
    story: StoryRecord,
    tech: TechRecord,
    stats: StateStats,
}

impl SimulationState {
    /// Create the initial state of a new story.
    pub fn genesis(start_age: f64, phase: LifePhase, now: DateTime<Utc>) -> Self {
        Self {
            metadata: StateMetadata {
                current_age: start_age,
                current_phase: phase,
                status: StoryStatus::Active,
                created_at: now,
                last_update: now,
            },
            story: StoryRecord::default(),
            tech: TechRecord::default(),
            stats: StateStats::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    /// Metadata group.
    pub const fn metadata(&self) -> &StateMetadata {
        &self.metadata
    }

    /// Story group.
    pub const fn story(&self) -> &StoryRecord {
        &self.story
    }

    /// Tech group.
    pub const fn tech(&self) -> &TechRecord {
        &self.tech
    }

    /// Stats group.
    pub const fn stats(&self) -> &StateStats {
        &self.stats
    }

    /// Posts told since the story began.
    pub const fn total_posts(&self) -> u64 {
        self.stats.total_posts
    }

    /// Cached simulated age.
    pub const fn current_age(&self) -> f64 {
        self.metadata.current_age
    }

    /// Cached life phase.
    pub const fn current_phase(&self) -> LifePhase {
        self.metadata.current_phase
    }

    /// Story status.
    pub const fn status(&self) -> StoryStatus {
        self.metadata.status
    }

    /// Whether the story reached its terminal state.
    pub const fn is_completed(&self) -> bool {
        matches!(self.metadata.status, StoryStatus::Completed)
    }

    /// The bounded recent-post window, oldest first.
    pub fn recent_posts(&self) -> &[Post] {
        &self.story.posts
    }

    /// Recent posts not yet covered by a digest, oldest first.
    pub fn undigested_posts(&self) -> impl Iterator<Item = &Post> {
        let last = self.stats.last_digest_post;
        self.story.posts.iter().filter(move |p| p.sequence > last)
    }

    /// Number of posts told since the most recent digest.
    pub const fn posts_since_last_digest(&self) -> u64 {
        self.stats
            .total_posts
            .saturating_sub(self.stats.last_digest_post)
    }

    /// All digests.
    pub fn digests(&self) -> &[Digest] {
        &self.story.digests
    }

    /// The most recent digest, if any.
    pub fn last_digest(&self) -> Option<&Digest> {
        self.story.digests.last()
    }

    /// All tech epochs.
    pub fn epochs(&self) -> &[TechEpoch] {
        &self.tech.epochs
    }

    /// The most recent tech epoch, if any.
    pub fn last_epoch(&self) -> Option<&TechEpoch> {
        self.tech.epochs.last()
    }

    /// The epoch with the given index, if it exists.
    pub fn epoch(&self, index: u32) -> Option<&TechEpoch> {
        self.tech.epochs.iter().find(|e| e.epoch_index == index)
    }

    /// Recorded plot points.
    pub fn plot_points(&self) -> &[PlotPoint] {
        &self.story.key_plot_points
    }

    /// Whether a plot point of the given kind exists.
    pub fn has_plot_point(&self, kind: &str) -> bool {
        self.story.key_plot_points.iter().any(|p| p.kind == kind)
    }

    /// Recorded relationships.
    pub fn relationships(&self) -> &[Relationship] {
        &self.story.relationships
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Append a post and advance the post counter.
    ///
    /// The post must carry sequence `total_posts + 1`. The recent window is
    /// trimmed to `window` posts (at least one is always kept).
    pub fn append_post(&mut self, post: Post, window: usize) -> Result<(), StateError> {
        if self.is_completed() {
            return Err(StateError::StoryCompleted);
        }
        let expected = self
            .stats
            .total_posts
            .checked_add(1)
            .ok_or(StateError::CounterOverflow)?;
        if post.sequence != expected {
            return Err(StateError::PostOutOfOrder {
                expected,
                found: post.sequence,
            });
        }
        self.metadata.last_update = post.created_at;
        self.story.posts.push(post);
        self.stats.total_posts = expected;

        let keep = window.max(1);
        let excess = self.story.posts.len().saturating_sub(keep);
        if excess > 0 {
            self.story.posts.drain(..excess);
        }
        Ok(())
    }

    /// Refresh the cached age, phase, and year progress after posts were
    /// appended.
    pub fn refresh_derived(
        &mut self,
        age: f64,
        phase: LifePhase,
        year_progress: YearProgress,
        now: DateTime<Utc>,
    ) -> Result<(), StateError> {
        if age < self.metadata.current_age {
            return Err(StateError::AgeRegression {
                current: self.metadata.current_age,
                proposed: age,
            });
        }
        self.metadata.current_age = age;
        self.metadata.current_phase = phase;
        self.stats.year_progress = year_progress;
        self.metadata.last_update = now;
        Ok(())
    }

    /// Append a digest.
    pub fn append_digest(&mut self, digest: Digest) -> Result<(), StateError> {
        let previous = self.stats.last_digest_post;
        if digest.through_post > self.stats.total_posts || digest.through_post < previous {
            return Err(StateError::DigestOutOfOrder {
                through_post: digest.through_post,
                total_posts: self.stats.total_posts,
                previous,
            });
        }
        self.stats.last_digest_post = digest.through_post;
        self.stats.digest_count = self.stats.digest_count.saturating_add(1);
        self.metadata.last_update = digest.created_at;
        self.story.digests.push(digest);
        Ok(())
    }

    /// Append the next tech epoch.
    ///
    /// The first epoch may carry any index (the epoch containing the story
    /// start). Every later epoch must be exactly `last + 1` and begin where
    /// the previous one ends.
    pub fn append_epoch(&mut self, epoch: TechEpoch) -> Result<(), StateError> {
        if epoch.year_range_start >= epoch.year_range_end {
            return Err(StateError::InvalidEpochRange {
                start: epoch.year_range_start,
                end: epoch.year_range_end,
            });
        }
        if let Some(last) = self.tech.epochs.last() {
            let expected = last
                .epoch_index
                .checked_add(1)
                .ok_or(StateError::CounterOverflow)?;
            if epoch.epoch_index != expected {
                return Err(StateError::NonSequentialEpoch {
                    expected,
                    found: epoch.epoch_index,
                });
            }
            if epoch.year_range_start != last.year_range_end {
                return Err(StateError::NonContiguousEpoch {
                    expected_start: last.year_range_end,
                    found_start: epoch.year_range_start,
                });
            }
        }
        self.tech.epochs.push(epoch);
        Ok(())
    }

    /// Record a one-time plot point.
    ///
    /// Returns `false` (and changes nothing) if a plot point of the same
    /// kind already exists.
    pub fn insert_plot_point(&mut self, point: PlotPoint) -> bool {
        if self.has_plot_point(&point.kind) {
            return false;
        }
        self.metadata.last_update = point.timestamp;
        self.story.key_plot_points.push(point);
        true
    }

    /// Record a relationship unless one with the same role exists.
    pub fn insert_relationship(&mut self, relationship: Relationship) -> bool {
        if self
            .story
            .relationships
            .iter()
            .any(|r| r.role == relationship.role)
        {
            return false;
        }
        self.story.relationships.push(relationship);
        true
    }

    /// Enter the terminal state. Idempotent.
    pub const fn mark_completed(&mut self, now: DateTime<Utc>) {
        if !self.is_completed() {
            self.metadata.status = StoryStatus::Completed;
            self.metadata.last_update = now;
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Check the structural invariants of a loaded document.
    pub fn validate(&self) -> Result<(), StateError> {
        let total = self.stats.total_posts;

        let mut last_seq = 0_u64;
        for post in &self.story.posts {
            if post.sequence <= last_seq || post.sequence > total {
                return Err(StateError::Inconsistent(format!(
                    "post sequence {} out of order (total {total})",
                    post.sequence
                )));
            }
            last_seq = post.sequence;
        }

        let mut last_through = 0_u64;
        for digest in &self.story.digests {
            if digest.through_post < last_through || digest.through_post > total {
                return Err(StateError::DigestOutOfOrder {
                    through_post: digest.through_post,
                    total_posts: total,
                    previous: last_through,
                });
            }
            last_through = digest.through_post;
        }
        if last_through != self.stats.last_digest_post {
            return Err(StateError::Inconsistent(format!(
                "last_digest_post {} does not match newest digest {last_through}",
                self.stats.last_digest_post
            )));
        }
        if u64::try_from(self.story.digests.len()).ok() != Some(self.stats.digest_count) {
            return Err(StateError::Inconsistent(format!(
                "digest_count {} does not match {} digests",
                self.stats.digest_count,
                self.story.digests.len()
            )));
        }

        for pair in self.tech.epochs.windows(2) {
            if let [prev, next] = pair {
                if prev.epoch_index.checked_add(1) != Some(next.epoch_index) {
                    return Err(StateError::NonSequentialEpoch {
                        expected: prev.epoch_index.saturating_add(1),
                        found: next.epoch_index,
                    });
                }
                if prev.year_range_end != next.year_range_start {
                    return Err(StateError::NonContiguousEpoch {
                        expected_start: prev.year_range_end,
                        found_start: next.year_range_start,
                    });
                }
            }
        }

        let mut kinds = std::collections::BTreeSet::new();
        for point in &self.story.key_plot_points {
            if !kinds.insert(point.kind.as_str()) {
                return Err(StateError::Inconsistent(format!(
                    "duplicate plot point kind {}",
                    point.kind
                )));
            }
        }

        Ok(())
    }
}
