//! Enumeration types for the Lifeline story engine.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Life phases
// ---------------------------------------------------------------------------

/// The protagonist's life phase, derived from simulated age.
///
/// Phases are ordered: a later variant always corresponds to an older age
/// bracket. The bracket boundaries are configuration, not part of the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifePhase {
    /// First working years.
    EarlyCareer,
    /// Building expertise and foundations.
    GrowthPhase,
    /// Leadership and peak output.
    PeakPhase,
    /// Shaping others, legacy building.
    MaturePhase,
    /// Advisory years and reflection.
    WisdomPhase,
}

impl LifePhase {
    /// All phases in chronological order.
    pub const ALL: [Self; 5] = [
        Self::EarlyCareer,
        Self::GrowthPhase,
        Self::PeakPhase,
        Self::MaturePhase,
        Self::WisdomPhase,
    ];

    /// The `snake_case` name used in the persisted document and prompts.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EarlyCareer => "early_career",
            Self::GrowthPhase => "growth_phase",
            Self::PeakPhase => "peak_phase",
            Self::MaturePhase => "mature_phase",
            Self::WisdomPhase => "wisdom_phase",
        }
    }
}

impl core::fmt::Display for LifePhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Story status
// ---------------------------------------------------------------------------

/// Whether the story can still advance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    /// The story is still being told.
    #[default]
    Active,
    /// The protagonist reached the configured end age. Terminal.
    Completed,
}

// ---------------------------------------------------------------------------
// Cadence
// ---------------------------------------------------------------------------

/// Why a digest was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestReason {
    /// The post interval since the last digest was reached.
    Interval,
    /// Enough significant posts accumulated in the trailing window.
    SignificantEvents,
    /// Both conditions held; a single digest covers the window.
    Both,
    /// No digest exists yet and the bootstrap post count was reached.
    Bootstrap,
}

// ---------------------------------------------------------------------------
// Comment classification
// ---------------------------------------------------------------------------

/// How strongly a reader comment asks for a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    /// Tentative suggestion ("maybe").
    Low,
    /// Plain suggestion, also the default.
    Medium,
    /// Imperative request ("must").
    High,
}

impl Impact {
    /// Base relevance weight of this impact level.
    pub const fn weight(self) -> u32 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

/// Topic family a comment touches. A comment may carry several tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentTag {
    /// Technology, research, engineering.
    Technical,
    /// Love, family, friendship.
    Relationship,
    /// Work, company, startup.
    Career,
    /// Moves, travel, weddings, big changes.
    LifeEvent,
    /// Matched none of the other families.
    General,
}

impl CommentTag {
    /// Whether this tag earns a type bonus during scoring.
    pub const fn is_scored(self) -> bool {
        !matches!(self, Self::General)
    }
}

/// Overall tone of a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    /// Agreement or a call to action.
    Positive,
    /// Negation or a request to stop.
    Negative,
    /// Neither.
    Neutral,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_chronologically_ordered() {
        let mut sorted = LifePhase::ALL;
        sorted.sort();
        assert_eq!(sorted, LifePhase::ALL);
    }

    #[test]
    fn phase_serializes_snake_case() {
        let json = serde_json::to_string(&LifePhase::GrowthPhase).unwrap_or_default();
        assert_eq!(json, "\"growth_phase\"");
        assert_eq!(LifePhase::GrowthPhase.to_string(), "growth_phase");
    }

    #[test]
    fn impact_weights() {
        assert_eq!(Impact::High.weight(), 3);
        assert_eq!(Impact::Medium.weight(), 2);
        assert_eq!(Impact::Low.weight(), 1);
    }

    #[test]
    fn general_tag_is_not_scored() {
        assert!(!CommentTag::General.is_scored());
        assert!(CommentTag::LifeEvent.is_scored());
    }
}
