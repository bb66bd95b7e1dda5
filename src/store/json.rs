//! JSON file backend for the progress store
//!
//! One file per target under the store directory, named
//! `<target>_<kind>.json`. Every commit rewrites the file through a sibling
//! temp file, fsyncs it, and renames it into place, so the visible file is
//! always a complete, parseable state.

use crate::item::ItemEnvelope;
use crate::store::{ProgressState, ProgressStore, StoreError, StoreResult, StoredItem};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Progress store that persists to per-target JSON files
pub struct JsonProgressStore {
    dir: PathBuf,
}

impl JsonProgressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the progress file for a target
    pub fn path_for(&self, target: &str, kind: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.json", sanitize(target), kind))
    }

    /// Serializes the full state and atomically replaces the progress file
    fn persist(&self, state: &ProgressState) -> StoreResult<()> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(&state.target, &state.kind);
        let tmp_path = path.with_extension("json.tmp");

        let body = serde_json::to_string_pretty(state)?;
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(body.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        Ok(())
    }
}

impl ProgressStore for JsonProgressStore {
    fn load(&self, target: &str, kind: &str) -> StoreResult<ProgressState> {
        let path = self.path_for(target, kind);
        if !path.exists() {
            tracing::debug!(target_key = %target, "No progress file, starting empty");
            return Ok(ProgressState::new(target, kind));
        }

        let content = fs::read_to_string(&path)?;
        let mut state: ProgressState =
            serde_json::from_str(&content).map_err(|e| corrupt(&path, e.to_string()))?;
        state
            .rebuild_seen()
            .map_err(|id| corrupt(&path, format!("duplicate item identity {}", id)))?;

        // The file names the target it was written for; a mismatch means
        // the caller handed us someone else's file.
        if state.target != target {
            return Err(corrupt(
                &path,
                format!("file is for target '{}', expected '{}'", state.target, target),
            ));
        }

        tracing::info!(
            target_key = %target,
            items = state.len(),
            "Loaded progress file"
        );
        Ok(state)
    }

    fn commit(&mut self, state: &mut ProgressState, envelope: &ItemEnvelope) -> StoreResult<bool> {
        if state.contains(&envelope.identity) {
            tracing::debug!(identity = %envelope.identity, "Duplicate identity, commit is a no-op");
            return Ok(false);
        }

        state.items.push(StoredItem::from_envelope(envelope));
        state.seen.insert(envelope.identity.clone());
        self.persist(state)?;

        tracing::debug!(
            identity = %envelope.identity,
            total = state.len(),
            "Committed item"
        );
        Ok(true)
    }
}

fn corrupt(path: &Path, message: String) -> StoreError {
    StoreError::Corrupt {
        path: path.display().to_string(),
        message,
    }
}

/// Maps a target identifier to a filesystem-safe file name stem
fn sanitize(target: &str) -> String {
    target
        .trim()
        .trim_start_matches("https://t.me/")
        .trim_start_matches('@')
        .trim_start_matches('#')
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::RawItem;
    use serde_json::json;
    use tempfile::TempDir;

    fn envelope(id: &str) -> ItemEnvelope {
        let mut raw = RawItem::new();
        raw.insert("id".to_string(), json!(id));
        raw.insert("text".to_string(), json!(format!("post {}", id)));
        ItemEnvelope::from_raw(raw).unwrap()
    }

    #[test]
    fn test_load_missing_file_is_empty_state() {
        let dir = TempDir::new().unwrap();
        let store = JsonProgressStore::new(dir.path());
        let state = store.load("alice", "profile").unwrap();
        assert!(state.is_empty());
        assert_eq!(state.target, "alice");
        assert_eq!(state.kind, "profile");
    }

    #[test]
    fn test_commit_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonProgressStore::new(dir.path());
        let mut state = store.load("alice", "profile").unwrap();

        assert!(store.commit(&mut state, &envelope("1")).unwrap());
        assert!(store.commit(&mut state, &envelope("2")).unwrap());

        let reloaded = store.load("alice", "profile").unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.items[0].id.as_str(), "1");
        assert_eq!(reloaded.items[1].id.as_str(), "2");
        assert_eq!(reloaded.seen.len(), 2);
    }

    #[test]
    fn test_commit_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonProgressStore::new(dir.path());
        let mut state = store.load("alice", "profile").unwrap();

        assert!(store.commit(&mut state, &envelope("1")).unwrap());
        assert!(!store.commit(&mut state, &envelope("1")).unwrap());
        assert_eq!(state.len(), 1);

        let reloaded = store.load("alice", "profile").unwrap();
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_monotonic_append_across_loads() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonProgressStore::new(dir.path());

        let mut state = store.load("alice", "profile").unwrap();
        store.commit(&mut state, &envelope("1")).unwrap();
        let first = store.load("alice", "profile").unwrap();

        let mut state = store.load("alice", "profile").unwrap();
        store.commit(&mut state, &envelope("2")).unwrap();
        let second = store.load("alice", "profile").unwrap();

        // earlier snapshot is a prefix of the later one
        assert!(first.len() <= second.len());
        for (a, b) in first.items.iter().zip(second.items.iter()) {
            assert_eq!(a.id, b.id);
        }
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = JsonProgressStore::new(dir.path());
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(store.path_for("alice", "profile"), "{not json").unwrap();

        let result = store.load("alice", "profile");
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_duplicate_ids_in_file_are_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = JsonProgressStore::new(dir.path());
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(
            store.path_for("alice", "profile"),
            r#"{"target":"alice","type":"profile","items":[{"id":"1"},{"id":"1"}]}"#,
        )
        .unwrap();

        let result = store.load("alice", "profile");
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonProgressStore::new(dir.path());
        let mut state = store.load("alice", "profile").unwrap();
        store.commit(&mut state, &envelope("1")).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_sanitize_target_names() {
        assert_eq!(sanitize("alice"), "alice");
        assert_eq!(sanitize("@alice"), "alice");
        assert_eq!(sanitize("#breaking news"), "breaking_news");
        assert_eq!(sanitize("https://t.me/some_channel"), "some_channel");
    }
}
