//! Error types for the engine binary.
//!
//! [`DriverError`] wraps every failure mode of startup and the tick loop so
//! `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: lifeline_core::config::ConfigError,
    },

    /// The live generator could not be set up.
    #[error("generator setup error: {source}")]
    Llm {
        /// The underlying LLM error.
        #[from]
        source: lifeline_llm::LlmError,
    },

    /// A tick failed with a persistence or invariant error.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying engine error.
        #[from]
        source: lifeline_core::orchestrator::EngineError,
    },

    /// The comment inbox could not be updated.
    #[error("inbox error: {source}")]
    Inbox {
        /// The underlying store error.
        #[from]
        source: lifeline_store::StoreError,
    },
}
