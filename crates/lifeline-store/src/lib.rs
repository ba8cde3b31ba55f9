//! File-backed persistence for the Lifeline story engine.
//!
//! The whole story lives in one JSON document inside a data directory.
//! Every save keeps a timestamped copy of the previous document and replaces
//! the live file with a temp-file + fsync + rename sequence, so a crash
//! leaves either the old or the new document in place, never a mix.
//!
//! ```text
//! <data_dir>/
//!     life_state.json           (live document)
//!     pending_comments.json     (comment inbox)
//!     backups/
//!         life_state-20250101T120000123456Z.json
//!         ...
//! ```
//!
//! # Modules
//!
//! - [`store`] -- [`StateStore`] and its [`StoreConfig`]
//! - [`inbox`] -- [`CommentInbox`], the pending reader comments file
//! - [`error`] -- Shared error types

pub mod error;
pub mod inbox;
pub mod store;

pub use error::StoreError;
pub use inbox::CommentInbox;
pub use store::{StateStore, StoreConfig};
