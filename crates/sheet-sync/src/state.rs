//! Run state persisted between runs as a small JSON file.

use crate::error::SyncResult;
use chrono::Utc;
use shared_types::RunState;
use std::fs;
use std::path::{Path, PathBuf};

pub struct RunStateStore {
    path: PathBuf,
    max_processed_ids: usize,
}

impl RunStateStore {
    pub fn new(path: impl Into<PathBuf>, max_processed_ids: usize) -> Self {
        Self {
            path: path.into(),
            max_processed_ids,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted state. A missing or unreadable file yields a fresh
    /// empty state.
    pub fn load(&self) -> RunState {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No run state at {}, starting fresh", self.path.display());
                return RunState::default();
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read run state {}: {}. Starting fresh",
                    self.path.display(),
                    e
                );
                return RunState::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    "Run state {} is corrupt ({}), starting fresh",
                    self.path.display(),
                    e
                );
                RunState::default()
            }
        }
    }

    /// Trim to the retention cap, stamp `last_run` and write the state.
    ///
    /// The file is written next to the target and renamed over it, so readers
    /// see either the old state or the new one.
    pub fn save(&self, state: &mut RunState) -> SyncResult<()> {
        state.trim_to(self.max_processed_ids);
        state.last_run = Some(Utc::now());

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let json = serde_json::to_string_pretty(state).map_err(std::io::Error::other)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(
            "Saved run state with {} processed ids to {}",
            state.processed_ids.len(),
            self.path.display()
        );
        Ok(())
    }
}
