use crate::models::WatchState;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Persisted reconciliation state. One JSON document, pretty-printed so a
/// human can diff it between runs.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted state. A missing file is a first run and a
    /// malformed one is logged and replaced, so loading never aborts the run.
    pub fn load(&self) -> WatchState {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return WatchState::default();
            }
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "state file unreadable, starting empty");
                return WatchState::default();
            }
        };

        match serde_json::from_str::<WatchState>(&raw) {
            Ok(state) => state,
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "state file malformed, starting empty");
                WatchState::default()
            }
        }
    }

    /// Writes the state atomically: serialize to a sibling temp file, then
    /// rename over the target so a crash mid-write cannot truncate it.
    pub fn save(&self, state: &WatchState) -> Result<(), StateError> {
        let mut payload = serde_json::to_string_pretty(state)?;
        payload.push('\n');

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, payload)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrackingRecord;
    use chrono::DateTime;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_as_empty_state() {
        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(_) => return,
        };

        let store = StateFile::new(dir.path().join("mailwatch-state.json"));
        let state = store.load();
        assert!(state.incidents.is_empty());
        assert_eq!(state.last_run, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn malformed_file_loads_as_empty_state() {
        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(_) => return,
        };

        let path = dir.path().join("mailwatch-state.json");
        assert!(std::fs::write(&path, "{ not json").is_ok());

        let state = StateFile::new(path).load();
        assert!(state.incidents.is_empty());
    }

    #[test]
    fn saved_state_round_trips_and_is_pretty_printed() {
        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(_) => return,
        };

        let path = dir.path().join("mailwatch-state.json");
        let store = StateFile::new(&path);

        let mut state = WatchState::default();
        state.incidents.insert(
            "gmail-abc".to_owned(),
            TrackingRecord {
                issue_number: 12,
                is_resolved: false,
                created_at: DateTime::UNIX_EPOCH,
                last_update: DateTime::UNIX_EPOCH,
                resolved_at: None,
            },
        );

        assert!(store.save(&state).is_ok());

        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return,
        };
        assert!(raw.contains('\n'), "pretty output spans multiple lines");
        assert!(raw.contains("\"gmail-abc\""));
        assert!(raw.contains("\"lastRun\""));

        assert_eq!(store.load(), state);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(_) => return,
        };

        let path = dir.path().join("mailwatch-state.json");
        let store = StateFile::new(&path);
        assert!(store.save(&WatchState::default()).is_ok());

        let leftovers: Vec<_> = match std::fs::read_dir(dir.path()) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name())
                .collect(),
            Err(_) => return,
        };
        assert_eq!(leftovers, vec![std::ffi::OsString::from("mailwatch-state.json")]);
    }
}
