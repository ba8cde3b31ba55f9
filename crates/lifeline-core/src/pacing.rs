//! Age, phase, and calendar derivation from the post counter.
//!
//! The post counter is the only story clock. Every temporal value the
//! engine shows or reasons about -- age, life phase, year progress, the
//! simulated calendar date -- is a pure function of `total_posts` and the
//! [`PacingConfig`]. Nothing here reads the wall clock.
//!
//! # Design Principles
//!
//! - Ages are rounded to two decimals so the cached value in the state
//!   document compares equal to a fresh derivation.
//! - Integer derivations use checked arithmetic (no silent overflow).

use chrono::{Datelike, Days, NaiveDate};
use lifeline_types::{LifePhase, YearProgress};

use crate::config::{ConfigError, PacingConfig, PhaseBrackets};

/// Days in one simulated calendar year.
const DAYS_PER_YEAR: u64 = 365;

/// Pure pacing calculations for one story.
#[derive(Debug, Clone, PartialEq)]
pub struct PacingModel {
    posts_per_year: u64,
    start_age: f64,
    end_age: f64,
    start_date: NaiveDate,
    brackets: PhaseBrackets,
}

impl PacingModel {
    /// Build a model from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `posts_per_year` is zero, the age
    /// range is empty, or the phase brackets are not strictly increasing.
    pub fn new(config: &PacingConfig) -> Result<Self, ConfigError> {
        if config.posts_per_year == 0 {
            return Err(ConfigError::Invalid {
                reason: "posts_per_year must be at least 1".to_owned(),
            });
        }
        if !config.start_age.is_finite()
            || !config.end_age.is_finite()
            || config.start_age >= config.end_age
        {
            return Err(ConfigError::Invalid {
                reason: "start_age must be below end_age".to_owned(),
            });
        }
        config.phase_brackets.validate()?;

        Ok(Self {
            posts_per_year: config.posts_per_year,
            start_age: config.start_age,
            end_age: config.end_age,
            start_date: config.start_date,
            brackets: config.phase_brackets,
        })
    }

    /// Posts per simulated year.
    pub const fn posts_per_year(&self) -> u64 {
        self.posts_per_year
    }

    /// Age at post zero.
    pub const fn start_age(&self) -> f64 {
        self.start_age
    }

    /// Age at which the story ends.
    pub const fn end_age(&self) -> f64 {
        self.end_age
    }

    /// Story-calendar date of post zero.
    pub const fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Simulated age after `total_posts` posts, capped at the end age.
    pub fn age(&self, total_posts: u64) -> f64 {
        round2((self.start_age + self.years_for(total_posts)).min(self.end_age))
    }

    /// Life phase for an age.
    pub fn phase(&self, age: f64) -> LifePhase {
        let b = &self.brackets;
        if age < b.growth_from {
            LifePhase::EarlyCareer
        } else if age < b.peak_from {
            LifePhase::GrowthPhase
        } else if age < b.mature_from {
            LifePhase::PeakPhase
        } else if age < b.wisdom_from {
            LifePhase::MaturePhase
        } else {
            LifePhase::WisdomPhase
        }
    }

    /// Whole simulated years elapsed and progress through the current one.
    pub fn year_progress(&self, total_posts: u64) -> YearProgress {
        let year = total_posts.checked_div(self.posts_per_year).unwrap_or(0);
        let into_year = total_posts.checked_rem(self.posts_per_year).unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let pct = into_year as f64 / self.posts_per_year as f64 * 100.0;
        YearProgress {
            year,
            progress_pct: round2(pct),
        }
    }

    /// Whether the story has reached its end age. Terminal once true.
    pub fn is_complete(&self, total_posts: u64) -> bool {
        self.age(total_posts) >= self.end_age
    }

    /// Posts left before the end age is reached.
    pub fn posts_until_end(&self, total_posts: u64) -> u64 {
        self.posts_at_age(self.end_age).saturating_sub(total_posts)
    }

    /// Smallest post count whose age is at least `age`.
    pub fn posts_at_age(&self, age: f64) -> u64 {
        let posts = ((age - self.start_age) * self.ppy_f64()).max(0.0);
        // Snap values within rounding noise of an integer before ceiling.
        let snapped = (posts * 1e6).round() / 1e6;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = snapped.ceil() as u64;
        count
    }

    /// Story-calendar date after `total_posts` posts.
    pub fn simulated_date(&self, total_posts: u64) -> NaiveDate {
        let days = total_posts
            .checked_mul(DAYS_PER_YEAR)
            .and_then(|d| d.checked_div(self.posts_per_year))
            .unwrap_or(u64::MAX);
        self.start_date
            .checked_add_days(Days::new(days))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Story-calendar year in which the protagonist has the given age.
    pub fn calendar_year(&self, age: f64) -> i32 {
        let offset = (age - self.start_age).floor();
        #[allow(clippy::cast_possible_truncation)]
        let offset = offset.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32;
        self.start_date.year().saturating_add(offset)
    }

    /// Simulated years elapsed after `total_posts` posts.
    pub fn years_for(&self, total_posts: u64) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let posts = total_posts as f64;
        posts / self.ppy_f64()
    }

    fn ppy_f64(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let ppy = self.posts_per_year as f64;
        ppy
    }
}

/// Round to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
