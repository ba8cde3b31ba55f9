//! The live state document and its backups.
//!
//! [`StateStore`] owns one data directory. It assumes a single writer; two
//! engines pointed at the same directory will race on the rename.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use lifeline_types::SimulationState;
use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::StoreError;

/// Where and how the state document is stored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the state file, the inbox, and the backups.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// File name of the live state document.
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// File name of the pending comment inbox.
    #[serde(default = "default_inbox_file")]
    pub inbox_file: String,

    /// Sub-directory of `data_dir` receiving backups.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,

    /// Maximum number of backups kept; older ones are pruned first.
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            state_file: default_state_file(),
            inbox_file: default_inbox_file(),
            backup_dir: default_backup_dir(),
            backup_retention: default_backup_retention(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_state_file() -> String {
    "life_state.json".to_owned()
}

fn default_inbox_file() -> String {
    "pending_comments.json".to_owned()
}

fn default_backup_dir() -> String {
    "backups".to_owned()
}

const fn default_backup_retention() -> usize {
    10
}

/// Crash-safe persistence for a single [`SimulationState`].
pub struct StateStore {
    config: StoreConfig,
    genesis: SimulationState,
}

impl StateStore {
    /// Create a store over `config.data_dir`.
    ///
    /// `genesis` is the state used when no usable document exists.
    pub const fn new(config: StoreConfig, genesis: SimulationState) -> Self {
        Self { config, genesis }
    }

    /// The store configuration.
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Path of the live state document.
    pub fn state_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.state_file)
    }

    /// Directory receiving backups.
    pub fn backup_dir(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.backup_dir)
    }

    fn stem(&self) -> &str {
        Path::new(&self.config.state_file)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("state")
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Load the persisted state.
    ///
    /// A missing document yields the genesis state. A corrupt document is
    /// copied to `<backup_dir>/<stem>.corrupt-<stamp>.json`, then replaced
    /// by the newest backup that parses and validates, or by the genesis
    /// state when none does. Whatever is returned has been persisted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the data directory cannot be created or
    /// the recovered document cannot be written.
    pub fn load(&self) -> Result<SimulationState, StoreError> {
        fs::create_dir_all(&self.config.data_dir)
            .map_err(|e| StoreError::io(&self.config.data_dir, e))?;

        let path = self.state_path();
        if !path.exists() {
            info!(path = %path.display(), "no state document found, starting from genesis");
            self.write_atomic(&path, &self.genesis)?;
            return Ok(self.genesis.clone());
        }

        match read_document(&path) {
            Ok(state) => {
                debug!(total_posts = state.total_posts(), "state loaded");
                Ok(state)
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "state document unusable, attempting recovery");
                let kept = self.quarantine(&path)?;
                info!(copy = %kept.display(), "unusable state document kept");
                let recovered = self.recover()?;
                self.write_atomic(&path, &recovered)?;
                Ok(recovered)
            }
        }
    }

    /// Newest valid backup, or the genesis state.
    fn recover(&self) -> Result<SimulationState, StoreError> {
        for backup in self.backups()?.iter().rev() {
            match read_document(backup) {
                Ok(state) => {
                    info!(
                        backup = %backup.display(),
                        total_posts = state.total_posts(),
                        "recovered state from backup"
                    );
                    return Ok(state);
                }
                Err(error) => {
                    warn!(backup = %backup.display(), %error, "skipping unusable backup");
                }
            }
        }
        warn!("no usable backup, falling back to genesis state");
        Ok(self.genesis.clone())
    }

    // =========================================================================
    // Save
    // =========================================================================

    /// Persist `state`, keeping a backup of the previous document.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Invariant`] if `state` is internally inconsistent.
    /// - [`StoreError::Regression`] if the persisted document has more posts.
    /// - [`StoreError::Io`] if any filesystem step fails; the previous
    ///   document is left untouched.
    pub fn save(&self, state: &SimulationState) -> Result<(), StoreError> {
        state.validate()?;
        fs::create_dir_all(&self.config.data_dir)
            .map_err(|e| StoreError::io(&self.config.data_dir, e))?;

        let path = self.state_path();
        if path.exists() {
            if let Ok(persisted) = read_document(&path) {
                if persisted.total_posts() > state.total_posts() {
                    return Err(StoreError::Regression {
                        persisted: persisted.total_posts(),
                        proposed: state.total_posts(),
                    });
                }
            }
            self.backup_current(&path)?;
        }

        self.write_atomic(&path, state)?;
        self.prune_backups()?;
        debug!(total_posts = state.total_posts(), "state saved");
        Ok(())
    }

    /// Copy the live document into the backup directory.
    fn backup_current(&self, path: &Path) -> Result<PathBuf, StoreError> {
        self.copy_stamped(path, &format!("{}-", self.stem()))
    }

    /// Copy an unreadable document aside before it is overwritten.
    ///
    /// The `<stem>.corrupt-` prefix keeps these copies out of
    /// [`StateStore::backups`], so recovery never reads them and pruning
    /// never removes them.
    fn quarantine(&self, path: &Path) -> Result<PathBuf, StoreError> {
        self.copy_stamped(path, &format!("{}.corrupt-", self.stem()))
    }

    /// Copy `path` to `<backup_dir>/<prefix><UTC timestamp>.json`.
    fn copy_stamped(&self, path: &Path, prefix: &str) -> Result<PathBuf, StoreError> {
        let dir = self.backup_dir();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let stamp = Utc::now().format("%Y%m%dT%H%M%S%6fZ").to_string();
        let mut target = dir.join(format!("{prefix}{stamp}.json"));
        let mut suffix: u32 = 0;
        while target.exists() {
            suffix = suffix.saturating_add(1);
            target = dir.join(format!("{prefix}{stamp}_{suffix:02}.json"));
        }

        fs::copy(path, &target).map_err(|e| StoreError::io(&target, e))?;
        Ok(target)
    }

    /// Remove the oldest backups beyond the retention bound.
    fn prune_backups(&self) -> Result<(), StoreError> {
        let backups = self.backups()?;
        let excess = backups.len().saturating_sub(self.config.backup_retention);
        for old in backups.iter().take(excess) {
            fs::remove_file(old).map_err(|e| StoreError::io(old, e))?;
            debug!(backup = %old.display(), "pruned backup");
        }
        Ok(())
    }

    /// Serialize to a temp file beside `path`, fsync, then rename over it.
    fn write_atomic(&self, path: &Path, state: &SimulationState) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(state)?;
        let dir = &self.config.data_dir;
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        tmp.write_all(&json)
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(path)
            .map_err(|e| StoreError::io(path, e.error))?;
        Ok(())
    }

    // =========================================================================
    // Backups
    // =========================================================================

    /// All backups of the state document, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the backup directory exists but cannot
    /// be listed.
    pub fn backups(&self) -> Result<Vec<PathBuf>, StoreError> {
        let dir = self.backup_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let prefix = format!("{}-", self.stem());
        let entries = fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(&prefix)
                && Path::new(name)
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            {
                backups.push(entry.path());
            }
        }
        backups.sort();
        Ok(backups)
    }
}

/// Read, parse, and validate one state document.
fn read_document(path: &Path) -> Result<SimulationState, StoreError> {
    let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    let state: SimulationState = serde_json::from_slice(&bytes)?;
    state.validate()?;
    Ok(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, Utc};
    use lifeline_types::LifePhase;

    use super::*;

    fn genesis() -> SimulationState {
        let now: DateTime<Utc> = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        SimulationState::genesis(22.0, LifePhase::EarlyCareer, now)
    }

    #[test]
    fn default_config_layout() {
        let config = StoreConfig::default();
        assert_eq!(config.state_file, "life_state.json");
        assert_eq!(config.backup_retention, 10);
    }

    #[test]
    fn backup_names_use_state_stem() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(
            StoreConfig {
                data_dir: dir.path().to_path_buf(),
                state_file: "story.json".to_owned(),
                ..StoreConfig::default()
            },
            genesis(),
        );
        store.load().unwrap();
        store.save(&genesis()).unwrap();
        let backups = store.backups().unwrap();
        assert_eq!(backups.len(), 1);
        let name = backups
            .first()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap()
            .to_owned();
        assert!(name.starts_with("story-"), "unexpected backup name {name}");
    }
}
