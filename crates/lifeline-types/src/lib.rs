//! Shared type definitions for the Lifeline story engine.
//!
//! This crate is the single source of truth for the data model that flows
//! between the pacing engine, the state store, and the text generators.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for post identifiers
//! - [`enums`] -- Life phases, story status, and comment classification enums
//! - [`structs`] -- Posts, digests, tech epochs, plot points, comments
//! - [`state`] -- The persisted [`SimulationState`] document and its invariants

pub mod enums;
pub mod ids;
pub mod state;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{CommentTag, DigestReason, Impact, LifePhase, Mood, StoryStatus};
pub use ids::PostId;
pub use state::{
    SimulationState, StateError, StateMetadata, StateStats, StoryRecord, TechRecord,
};
pub use structs::{
    CommentAnalysis, Digest, PlotPoint, Post, RawComment, Relationship, TechEpoch, YearProgress,
};
