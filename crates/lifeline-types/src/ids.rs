//! Type-safe identifier wrapper around [`Uuid`].
//!
//! Posts carry UUID v7 identifiers so ids sort in creation order even when
//! the full post history lives outside the engine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a generated post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub Uuid);

impl PostId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for PostId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for PostId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
