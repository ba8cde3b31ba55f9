//! Age-triggered one-time plot points.
//!
//! Each [`PlotTrigger`] fires once the protagonist reaches its age. Firing
//! is idempotent per kind, so re-running a trigger check after a crash or a
//! retried tick never duplicates a life event.

use chrono::{DateTime, Utc};
use lifeline_types::{PlotPoint, Relationship, SimulationState};
use tracing::info;

use crate::config::PlotTrigger;

/// Insert every plot point whose trigger age has been reached and that is
/// not recorded yet. Returns the kinds that fired.
pub fn fire_triggers(
    triggers: &[PlotTrigger],
    state: &mut SimulationState,
    age: f64,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut fired = Vec::new();
    for trigger in triggers.iter().filter(|t| age >= t.at_age) {
        let inserted = state.insert_plot_point(PlotPoint {
            kind: trigger.kind.clone(),
            title: trigger.title.clone(),
            description: trigger.description.clone(),
            age,
            timestamp: now,
        });
        if !inserted {
            continue;
        }
        if let Some(seed) = &trigger.relationship {
            state.insert_relationship(Relationship {
                role: seed.role.clone(),
                name: seed.name.clone(),
                since_age: age,
            });
        }
        info!(kind = %trigger.kind, age, "plot point reached");
        fired.push(trigger.kind.clone());
    }
    fired
}

#[cfg(test)]
mod tests {
    use lifeline_types::LifePhase;

    use super::*;
    use crate::config::{PlotConfig, RelationshipSeed};

    fn state() -> SimulationState {
        SimulationState::genesis(22.0, LifePhase::EarlyCareer, Utc::now())
    }

    #[test]
    fn nothing_fires_before_first_trigger() {
        let mut s = state();
        let fired = fire_triggers(&PlotConfig::default().triggers, &mut s, 24.9, Utc::now());
        assert!(fired.is_empty());
        assert!(s.plot_points().is_empty());
    }

    #[test]
    fn triggers_fire_once() {
        let triggers = vec![PlotTrigger {
            kind: "partner".to_owned(),
            title: "Meets a partner".to_owned(),
            description: String::new(),
            at_age: 28.0,
            relationship: Some(RelationshipSeed {
                role: "partner".to_owned(),
                name: "Maya".to_owned(),
            }),
        }];
        let mut s = state();
        assert_eq!(fire_triggers(&triggers, &mut s, 28.02, Utc::now()), vec!["partner"]);
        assert!(fire_triggers(&triggers, &mut s, 29.0, Utc::now()).is_empty());

        assert_eq!(s.plot_points().len(), 1);
        assert_eq!(s.relationships().len(), 1);
        assert_eq!(
            s.relationships().first().map(|r| r.name.as_str()),
            Some("Maya")
        );
    }

    #[test]
    fn late_start_fires_every_passed_trigger() {
        let mut s = state();
        let fired = fire_triggers(&PlotConfig::default().triggers, &mut s, 35.0, Utc::now());
        assert_eq!(fired, vec!["relocation", "partner", "marriage", "first_child"]);
    }
}
