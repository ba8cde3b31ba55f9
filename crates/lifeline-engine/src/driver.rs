//! The scheduling loop around the tick cycle.
//!
//! Ticks run one after another with a randomized wait in
//! `[min_interval, max_interval]`. A paused tick is retried with
//! exponential backoff capped at `max_interval`. The loop ends when the
//! story completes, the tick limit is hit, or shutdown is requested.
//! Shutdown only interrupts the wait, never a running tick.

use std::future::Future;
use std::time::Duration;

use lifeline_core::config::DriverConfig;
use lifeline_core::generator::StoryGenerator;
use lifeline_core::orchestrator::{NarrativeOrchestrator, TickOutcome};
use lifeline_store::CommentInbox;
use rand::Rng;
use tracing::{info, warn};

use crate::error::DriverError;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The story reached its end age.
    Completed,
    /// `driver.max_ticks` ticks have run.
    TickLimit,
    /// Shutdown was requested between ticks.
    Shutdown,
}

/// Runs ticks on a schedule and feeds them pending reader comments.
pub struct Driver<G> {
    orchestrator: NarrativeOrchestrator<G>,
    inbox: CommentInbox,
    config: DriverConfig,
}

impl<G: StoryGenerator> Driver<G> {
    /// Create a driver.
    pub const fn new(
        orchestrator: NarrativeOrchestrator<G>,
        inbox: CommentInbox,
        config: DriverConfig,
    ) -> Self {
        Self {
            orchestrator,
            inbox,
            config,
        }
    }

    /// The wrapped orchestrator.
    pub const fn orchestrator(&self) -> &NarrativeOrchestrator<G> {
        &self.orchestrator
    }

    /// Run a single tick with whatever comments are pending. Comments are
    /// removed from the inbox only once a tick has used them.
    pub async fn run_once(&mut self) -> Result<TickOutcome, DriverError> {
        let comments = self.inbox.read().unwrap_or_else(|error| {
            warn!(%error, "comment inbox unreadable, ticking without comments");
            Vec::new()
        });

        let outcome = self.orchestrator.tick(&comments).await?;
        if matches!(outcome, TickOutcome::Advanced(_)) && !comments.is_empty() {
            self.inbox.drain(comments.len())?;
        }
        Ok(outcome)
    }

    /// Tick until a stop condition is met. `shutdown` resolving ends the
    /// loop at the next wait.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<StopReason, DriverError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticks: u64 = 0;
        let mut failures: u32 = 0;

        loop {
            let outcome = self.run_once().await?;
            ticks = ticks.saturating_add(1);

            let delay = match outcome {
                TickOutcome::Completed => {
                    info!(ticks, "story already complete, stopping");
                    return Ok(StopReason::Completed);
                }
                TickOutcome::Advanced(report) => {
                    failures = 0;
                    info!(
                        total_posts = report.total_posts,
                        age = report.age,
                        phase = %report.phase,
                        posts_added = report.posts_added,
                        digest = ?report.digest,
                        epoch = ?report.epoch,
                        comments_used = report.comments_used,
                        "tick advanced"
                    );
                    if report.story_completed {
                        info!(total_posts = report.total_posts, "story completed, stopping");
                        return Ok(StopReason::Completed);
                    }
                    tick_interval(&self.config, &mut rand::rng())
                }
                TickOutcome::Paused { reason } => {
                    failures = failures.saturating_add(1);
                    let delay = backoff(&self.config, failures);
                    warn!(
                        %reason,
                        failures,
                        retry_in_secs = delay.as_secs(),
                        "tick paused, backing off"
                    );
                    delay
                }
            };

            if self.config.max_ticks.is_some_and(|max| ticks >= max) {
                info!(ticks, "tick limit reached, stopping");
                return Ok(StopReason::TickLimit);
            }

            tokio::select! {
                () = &mut shutdown => {
                    info!(ticks, "shutdown requested");
                    return Ok(StopReason::Shutdown);
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// A uniformly random wait in `[min_interval, max_interval]`.
pub fn tick_interval(config: &DriverConfig, rng: &mut impl Rng) -> Duration {
    let secs = if config.min_interval_secs >= config.max_interval_secs {
        config.min_interval_secs
    } else {
        rng.random_range(config.min_interval_secs..=config.max_interval_secs)
    };
    Duration::from_secs(secs)
}

/// Retry delay after `failures` consecutive paused ticks:
/// `retry_base * 2^(failures - 1)`, capped at `max_interval`.
pub fn backoff(config: &DriverConfig, failures: u32) -> Duration {
    let factor = 2_u64
        .checked_pow(failures.saturating_sub(1))
        .unwrap_or(u64::MAX);
    let secs = config
        .retry_base_secs
        .saturating_mul(factor)
        .min(config.max_interval_secs);
    Duration::from_secs(secs)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;

    use chrono::Utc;
    use lifeline_core::config::EngineConfig;
    use lifeline_core::generator::TemplateGenerator;
    use lifeline_types::RawComment;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn driver(dir: &Path, tweak: impl FnOnce(&mut EngineConfig)) -> Driver<TemplateGenerator> {
        let mut config = EngineConfig::default();
        config.store.data_dir = dir.to_path_buf();
        config.driver.min_interval_secs = 60;
        config.driver.max_interval_secs = 120;
        tweak(&mut config);
        let inbox = CommentInbox::new(&config.store.data_dir, &config.store.inbox_file);
        let driver_config = config.driver.clone();
        let orchestrator = NarrativeOrchestrator::new(config, TemplateGenerator::new()).unwrap();
        Driver::new(orchestrator, inbox, driver_config)
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let config = DriverConfig {
            retry_base_secs: 60,
            max_interval_secs: 300,
            ..DriverConfig::default()
        };
        assert_eq!(backoff(&config, 1), Duration::from_secs(60));
        assert_eq!(backoff(&config, 2), Duration::from_secs(120));
        assert_eq!(backoff(&config, 3), Duration::from_secs(240));
        assert_eq!(backoff(&config, 4), Duration::from_secs(300));
        assert_eq!(backoff(&config, 80), Duration::from_secs(300));
    }

    #[test]
    fn interval_stays_in_bounds() {
        let config = DriverConfig {
            min_interval_secs: 10,
            max_interval_secs: 20,
            ..DriverConfig::default()
        };
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..200 {
            let secs = tick_interval(&config, &mut rng).as_secs();
            assert!((10..=20).contains(&secs));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_tick_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = driver(dir.path(), |c| c.driver.max_ticks = Some(3));

        let reason = d.run(std::future::pending()).await.unwrap();
        assert_eq!(reason, StopReason::TickLimit);
        assert_eq!(d.orchestrator().store().load().unwrap().total_posts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_completion() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = driver(dir.path(), |c| {
            c.pacing.posts_per_year = 4;
            c.pacing.end_age = 23.0;
        });

        let reason = d.run(std::future::pending()).await.unwrap();
        assert_eq!(reason, StopReason::Completed);
        let state = d.orchestrator().store().load().unwrap();
        assert_eq!(state.total_posts(), 4);
        assert!(state.is_completed());
    }

    #[tokio::test]
    async fn shutdown_interrupts_the_wait() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = driver(dir.path(), |_| {});

        let reason = d.run(std::future::ready(())).await.unwrap();
        assert_eq!(reason, StopReason::Shutdown);
        assert_eq!(d.orchestrator().store().load().unwrap().total_posts(), 1);
    }

    #[tokio::test]
    async fn used_comments_leave_the_inbox() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = driver(dir.path(), |_| {});
        let inbox = CommentInbox::new(dir.path(), "pending_comments.json");
        inbox
            .push(&[RawComment {
                content: "go see the ocean".to_owned(),
                author: "reader".to_owned(),
                created_at: Utc::now(),
            }])
            .unwrap();

        let outcome = d.run_once().await.unwrap();
        match outcome {
            TickOutcome::Advanced(report) => assert_eq!(report.comments_used, 1),
            other => panic!("expected an advanced tick, got {other:?}"),
        }
        assert!(inbox.read().unwrap().is_empty());
    }
}
