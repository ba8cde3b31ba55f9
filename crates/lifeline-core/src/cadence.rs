//! Digest and tech-epoch cadence.
//!
//! [`CadenceScheduler::decide`] looks at the state as it stands at the start
//! of a tick and reports which secondary artifacts are due. It is pure:
//! the same state always yields the same decision.
//!
//! Tech epochs are laid out on a fixed age grid. Epoch `k` covers the ages
//! `[origin + k * epoch_years, origin + (k + 1) * epoch_years)` and the
//! matching story-calendar years, so consecutive epochs are contiguous by
//! construction.

use lifeline_types::{DigestReason, Post, SimulationState};

use crate::config::CadenceConfig;
use crate::pacing::PacingModel;

/// What the scheduler decided for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CadenceDecision {
    /// Whether a digest should be produced this tick.
    pub digest_due: bool,
    /// Why the digest is due.
    pub digest_reason: Option<DigestReason>,
    /// Whether a tech epoch should be produced this tick.
    pub tech_epoch_due: bool,
    /// Index of the epoch to produce when one is due.
    pub next_epoch_index: Option<u32>,
}

/// Decides when digests and tech epochs are due.
#[derive(Debug, Clone)]
pub struct CadenceScheduler {
    config: CadenceConfig,
    keywords: Vec<String>,
    pacing: PacingModel,
    origin_age: f64,
    posts_per_tick: u32,
}

impl CadenceScheduler {
    /// Build a scheduler. The epoch grid starts at
    /// `config.epoch_origin_age`, or at the pacing start age when unset.
    pub fn new(config: CadenceConfig, pacing: PacingModel) -> Self {
        let keywords = config
            .significant_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        let origin_age = config.epoch_origin_age.unwrap_or_else(|| pacing.start_age());
        Self {
            config,
            keywords,
            pacing,
            origin_age,
            posts_per_tick: 1,
        }
    }

    /// Set how many posts one tick appends. The next epoch is then due
    /// early enough that a single tick never crosses into it unprepared.
    #[must_use]
    pub const fn with_posts_per_tick(mut self, posts_per_tick: u32) -> Self {
        self.posts_per_tick = posts_per_tick;
        self
    }

    /// The pacing model the scheduler reasons with.
    pub const fn pacing(&self) -> &PacingModel {
        &self.pacing
    }

    /// Decide which cadences fire for `state`.
    ///
    /// `recent_posts` is the recent window; only posts newer than the last
    /// digest count towards the significant-event trigger.
    pub fn decide(&self, state: &SimulationState, recent_posts: &[Post]) -> CadenceDecision {
        let digest_reason = self.digest_reason(state, recent_posts);
        let next_epoch_index = self.epoch_due(state);
        CadenceDecision {
            digest_due: digest_reason.is_some(),
            digest_reason,
            tech_epoch_due: next_epoch_index.is_some(),
            next_epoch_index,
        }
    }

    // =========================================================================
    // Digest cadence
    // =========================================================================

    fn digest_reason(&self, state: &SimulationState, recent_posts: &[Post]) -> Option<DigestReason> {
        let since = state.posts_since_last_digest();
        if since == 0 {
            return None;
        }

        let by_interval = since >= u64::from(self.config.digest_interval);
        let by_events = self.config.significant_event_threshold > 0
            && self.significant_count(state, recent_posts)
                >= usize::try_from(self.config.significant_event_threshold).unwrap_or(usize::MAX);

        match (by_interval, by_events) {
            (true, true) => Some(DigestReason::Both),
            (true, false) => Some(DigestReason::Interval),
            (false, true) => Some(DigestReason::SignificantEvents),
            (false, false) => {
                let bootstrap = self.config.bootstrap_digest_posts;
                (bootstrap > 0
                    && state.digests().is_empty()
                    && state.total_posts() >= bootstrap)
                    .then_some(DigestReason::Bootstrap)
            }
        }
    }

    /// Significant posts in the trailing window since the last digest.
    pub fn significant_count(&self, state: &SimulationState, recent_posts: &[Post]) -> usize {
        let last = state.stats().last_digest_post;
        recent_posts
            .iter()
            .filter(|p| p.sequence > last)
            .filter(|p| self.is_significant(&p.text))
            .count()
    }

    /// Whether post text contains any significant keyword.
    pub fn is_significant(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    // =========================================================================
    // Tech-epoch cadence
    // =========================================================================

    /// Index of the epoch due this tick, if any.
    fn epoch_due(&self, state: &SimulationState) -> Option<u32> {
        let total = state.total_posts();
        let current = self.epoch_index_for_age(self.pacing.age(total));

        let Some(last) = state.last_epoch() else {
            return Some(current);
        };
        let last = last.epoch_index;
        let next = last.checked_add(1)?;

        if last < current {
            return Some(next);
        }
        if last > current {
            return None;
        }

        let boundary_age = self.boundary_age(next);
        if boundary_age >= self.pacing.end_age() {
            return None;
        }
        let until = self.pacing.posts_at_age(boundary_age).saturating_sub(total);
        let lead = self.config.update_threshold.max(u64::from(self.posts_per_tick));
        (until <= lead).then_some(next)
    }

    /// Epoch index containing the given age.
    pub fn epoch_index_for_age(&self, age: f64) -> u32 {
        let span = f64::from(self.config.epoch_years.max(1));
        let index = ((age - self.origin_age) / span).floor().max(0.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = index.min(f64::from(u32::MAX)) as u32;
        index
    }

    /// Age at which epoch `index` begins.
    pub fn boundary_age(&self, index: u32) -> f64 {
        self.origin_age + f64::from(index) * f64::from(self.config.epoch_years)
    }

    /// Story-calendar years `[start, end)` covered by epoch `index`.
    pub fn epoch_year_range(&self, index: u32) -> (i32, i32) {
        let start = self.pacing.calendar_year(self.boundary_age(index));
        let end = self
            .pacing
            .calendar_year(self.boundary_age(index.saturating_add(1)));
        (start, end)
    }

    /// Technology acceleration factor at the start of epoch `index`.
    pub fn acceleration(&self, index: u32) -> f64 {
        let years = (self.boundary_age(index) - self.pacing.start_age()).max(0.0);
        (1.0 + self.config.tech_growth_rate).powf(years)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{DateTime, Utc};
    use lifeline_types::{Digest, LifePhase, PostId, TechEpoch};

    use super::*;
    use crate::config::PacingConfig;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn pacing() -> PacingModel {
        PacingModel::new(&PacingConfig::default()).unwrap()
    }

    fn scheduler(config: CadenceConfig) -> CadenceScheduler {
        CadenceScheduler::new(config, pacing())
    }

    fn state_with(texts: &[&str]) -> SimulationState {
        let mut state = SimulationState::genesis(22.0, LifePhase::EarlyCareer, now());
        for (i, text) in texts.iter().enumerate() {
            let sequence = u64::try_from(i).unwrap() + 1;
            state
                .append_post(
                    Post {
                        id: PostId::new(),
                        sequence,
                        text: (*text).to_owned(),
                        age: 22.0,
                        simulated_date: pacing().simulated_date(sequence),
                        created_at: now(),
                    },
                    100,
                )
                .unwrap();
        }
        state
    }

    fn quiet_state(count: usize) -> SimulationState {
        let texts = vec!["coffee and code again"; count];
        state_with(&texts)
    }

    fn with_epoch(mut state: SimulationState, s: &CadenceScheduler, index: u32) -> SimulationState {
        let (start, end) = s.epoch_year_range(index);
        state
            .append_epoch(TechEpoch {
                epoch_index: index,
                year_range_start: start,
                year_range_end: end,
                mainstream: BTreeSet::new(),
                emerging: BTreeSet::new(),
            })
            .unwrap();
        state
    }

    #[test]
    fn digest_due_exactly_at_interval() {
        let s = scheduler(CadenceConfig::default());
        for count in 0..12 {
            let state = quiet_state(count);
            let d = s.decide(&state, state.recent_posts());
            assert!(!d.digest_due, "digest due early at {count} posts");
        }
        let state = quiet_state(12);
        let d = s.decide(&state, state.recent_posts());
        assert!(d.digest_due);
        assert_eq!(d.digest_reason, Some(DigestReason::Interval));
    }

    #[test]
    fn digest_resets_after_append() {
        let s = scheduler(CadenceConfig::default());
        let mut state = quiet_state(12);
        state
            .append_digest(Digest {
                content: "a year of small things".to_owned(),
                age: 22.25,
                created_at: now(),
                posts_covered: 12,
                through_post: 12,
            })
            .unwrap();
        let d = s.decide(&state, state.recent_posts());
        assert!(!d.digest_due);
    }

    #[test]
    fn significant_events_override_interval() {
        let s = scheduler(CadenceConfig::default());
        let state = state_with(&[
            "Huge milestone today",
            "just a walk",
            "Product LAUNCH went live",
            "We closed a partnership",
        ]);
        let d = s.decide(&state, state.recent_posts());
        assert!(d.digest_due);
        assert_eq!(d.digest_reason, Some(DigestReason::SignificantEvents));
    }

    #[test]
    fn both_conditions_yield_single_reason() {
        let s = scheduler(CadenceConfig::default());
        let mut texts = vec!["breakthrough"; 3];
        texts.extend(vec!["quiet day"; 9]);
        let state = state_with(&texts);
        let d = s.decide(&state, state.recent_posts());
        assert_eq!(d.digest_reason, Some(DigestReason::Both));
    }

    #[test]
    fn digested_posts_do_not_count_as_significant() {
        let s = scheduler(CadenceConfig::default());
        let mut state = state_with(&["milestone", "milestone", "milestone", "quiet"]);
        state
            .append_digest(Digest {
                content: "three milestones".to_owned(),
                age: 22.06,
                created_at: now(),
                posts_covered: 3,
                through_post: 3,
            })
            .unwrap();
        assert_eq!(s.significant_count(&state, state.recent_posts()), 0);
        assert!(!s.decide(&state, state.recent_posts()).digest_due);
    }

    #[test]
    fn bootstrap_digest_when_enabled() {
        let s = scheduler(CadenceConfig {
            bootstrap_digest_posts: 4,
            ..CadenceConfig::default()
        });
        let d = s.decide(&quiet_state(3), &[]);
        assert!(!d.digest_due);
        let state = quiet_state(4);
        let d = s.decide(&state, state.recent_posts());
        assert_eq!(d.digest_reason, Some(DigestReason::Bootstrap));
    }

    #[test]
    fn first_epoch_is_bootstrapped() {
        let s = scheduler(CadenceConfig::default());
        let state = quiet_state(0);
        let d = s.decide(&state, state.recent_posts());
        assert!(d.tech_epoch_due);
        assert_eq!(d.next_epoch_index, Some(0));
    }

    #[test]
    fn epoch_lead_time_before_age_thirty_boundary() {
        // Boundaries at 20, 25, 30, ... with 48 posts per year.
        let s = scheduler(CadenceConfig {
            epoch_origin_age: Some(20.0),
            update_threshold: 48,
            ..CadenceConfig::default()
        });
        let p = pacing();
        let epoch_index = s.epoch_index_for_age(29.75);
        assert_eq!(epoch_index, 1);

        let far = with_epoch(
            SimulationState::genesis(22.0, LifePhase::EarlyCareer, now()),
            &s,
            1,
        );
        // 28.5 is 72 posts before the boundary.
        let far = advance(far, p.posts_at_age(28.5));
        assert!(!s.decide(&far, &[]).tech_epoch_due);

        // 29.0 is exactly 48 posts before the boundary.
        let edge = advance(
            with_epoch(SimulationState::genesis(22.0, LifePhase::EarlyCareer, now()), &s, 1),
            p.posts_at_age(29.0),
        );
        assert!(s.decide(&edge, &[]).tech_epoch_due);

        // 29.75 is 12 posts before the boundary.
        let near = advance(
            with_epoch(SimulationState::genesis(22.0, LifePhase::EarlyCareer, now()), &s, 1),
            p.posts_at_age(29.75),
        );
        let d = s.decide(&near, &[]);
        assert!(d.tech_epoch_due);
        assert_eq!(d.next_epoch_index, Some(2));
    }

    #[test]
    fn tick_size_widens_the_lead_time() {
        let p = pacing();
        let state = advance(
            with_epoch(
                SimulationState::genesis(22.0, LifePhase::EarlyCareer, now()),
                &scheduler(CadenceConfig::default()),
                0,
            ),
            p.posts_at_age(25.75),
        );
        // 60 posts before the boundary at 27.0, outside the 48-post lead.
        assert!(!scheduler(CadenceConfig::default()).decide(&state, &[]).tech_epoch_due);

        let s = scheduler(CadenceConfig::default()).with_posts_per_tick(60);
        let d = s.decide(&state, &[]);
        assert!(d.tech_epoch_due);
        assert_eq!(d.next_epoch_index, Some(1));

        // One post short of a full tick still waits.
        let earlier = advance(
            with_epoch(SimulationState::genesis(22.0, LifePhase::EarlyCareer, now()), &s, 0),
            p.posts_at_age(25.75) - 1,
        );
        assert!(!s.decide(&earlier, &[]).tech_epoch_due);
    }

    #[test]
    fn no_epoch_beyond_end_age() {
        let s = scheduler(CadenceConfig::default());
        let p = pacing();
        // Boundaries at 22, 27, ..., 67, 72. The epoch starting at 72 is never needed.
        let last_index = s.epoch_index_for_age(71.0);
        let mut state = SimulationState::genesis(22.0, LifePhase::EarlyCareer, now());
        for index in 0..=last_index {
            state = with_epoch(state, &s, index);
        }
        let state = advance(state, p.posts_at_age(71.5));
        assert!(!s.decide(&state, &[]).tech_epoch_due);
    }

    #[test]
    fn lagging_epochs_catch_up_one_at_a_time() {
        let s = scheduler(CadenceConfig::default());
        let state = with_epoch(
            SimulationState::genesis(22.0, LifePhase::EarlyCareer, now()),
            &s,
            0,
        );
        let state = advance(state, pacing().posts_at_age(38.0));
        let d = s.decide(&state, &[]);
        assert_eq!(d.next_epoch_index, Some(1));
    }

    #[test]
    fn epoch_ranges_are_contiguous() {
        let s = scheduler(CadenceConfig::default());
        let (_, end0) = s.epoch_year_range(0);
        let (start1, end1) = s.epoch_year_range(1);
        assert_eq!(end0, start1);
        assert_eq!(end1 - start1, 5);
        assert_eq!(s.epoch_year_range(0).0, 2025);
    }

    #[test]
    fn acceleration_grows_five_percent_a_year() {
        let s = scheduler(CadenceConfig::default());
        assert!((s.acceleration(0) - 1.0).abs() < 1e-9);
        assert!((s.acceleration(1) - 1.05_f64.powi(5)).abs() < 1e-9);
    }

    /// Advance the post counter without keeping the posts.
    fn advance(mut state: SimulationState, to: u64) -> SimulationState {
        while state.total_posts() < to {
            let sequence = state.total_posts() + 1;
            state
                .append_post(
                    Post {
                        id: PostId::new(),
                        sequence,
                        text: String::new(),
                        age: 22.0,
                        simulated_date: pacing().simulated_date(sequence),
                        created_at: now(),
                    },
                    1,
                )
                .unwrap();
        }
        state
    }
}
