//! Pending reader comments.
//!
//! The comment ingestion side appends to a JSON array of
//! [`RawComment`]s in the data directory. The engine reads it at the start
//! of a tick and drains what it consumed once the tick has been saved.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use lifeline_types::RawComment;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreError;

/// File-backed queue of comments waiting to be folded into the story.
pub struct CommentInbox {
    path: PathBuf,
}

impl CommentInbox {
    /// Inbox stored at `data_dir/file_name`.
    pub fn new(data_dir: &Path, file_name: &str) -> Self {
        Self {
            path: data_dir.join(file_name),
        }
    }

    /// Path of the inbox file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All pending comments, oldest first. A missing file is an empty inbox.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if the file is not a JSON array
    /// of comments, or [`StoreError::Io`] if it cannot be read.
    pub fn read(&self) -> Result<Vec<RawComment>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Append comments to the inbox.
    ///
    /// # Errors
    ///
    /// Propagates read and write failures.
    pub fn push(&self, comments: &[RawComment]) -> Result<(), StoreError> {
        let mut pending = self.read()?;
        pending.extend_from_slice(comments);
        self.write(&pending)
    }

    /// Remove the `consumed` oldest comments, keeping anything that arrived
    /// after they were read.
    ///
    /// # Errors
    ///
    /// Propagates read and write failures.
    pub fn drain(&self, consumed: usize) -> Result<(), StoreError> {
        if consumed == 0 {
            return Ok(());
        }
        let pending = self.read()?;
        let remaining: Vec<RawComment> = pending.into_iter().skip(consumed).collect();
        debug!(consumed, remaining = remaining.len(), "comment inbox drained");
        self.write(&remaining)
    }

    fn write(&self, comments: &[RawComment]) -> Result<(), StoreError> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        let json = serde_json::to_vec_pretty(comments)?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        tmp.write_all(&json)
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;
        Ok(())
    }
}
