//! # DitchPouch Store
//! Single-record progress persistence.
//!
//! - `json`  : `progress.json` in a directory, human-readable
//! - `sqlite`: one row keyed by identity, survives partial writes
//! - `memory`: process lifetime only (tests, dry runs)

pub mod json;
pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use ditchpouch_core::config::StoreConfig;
use ditchpouch_core::error::{DitchPouchError, Result};
use ditchpouch_core::traits::ProgressStore;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Open the backend named in the config.
pub fn open(config: &StoreConfig, identity: &str) -> Result<Arc<dyn ProgressStore>> {
    let path = config.expanded_path();
    let store: Arc<dyn ProgressStore> = match config.backend.as_str() {
        "json" => Arc::new(JsonFileStore::new(&path)?),
        "sqlite" => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Arc::new(SqliteStore::open(&path, identity)?)
        }
        "memory" => Arc::new(MemoryStore::new()),
        other => {
            return Err(DitchPouchError::Config(format!(
                "Unknown store backend '{other}' (expected json, sqlite or memory)"
            )));
        }
    };
    tracing::info!("💾 Progress store: {} ({})", store.name(), path.display());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ditchpouch_core::types::UserProgress;

    #[test]
    fn test_open_unknown_backend() {
        let config = StoreConfig {
            backend: "redis".into(),
            path: "/tmp/unused".into(),
        };
        assert!(matches!(open(&config, "me"), Err(DitchPouchError::Config(_))));
    }

    #[test]
    fn test_open_memory() {
        let config = StoreConfig {
            backend: "memory".into(),
            path: String::new(),
        };
        assert_eq!(open(&config, "me").unwrap().name(), "memory");
    }

    #[test]
    fn test_open_json_creates_dir() {
        let dir = std::env::temp_dir().join("ditchpouch-test-open-json").join("nested");
        std::fs::remove_dir_all(dir.parent().unwrap()).ok();
        let config = StoreConfig {
            backend: "json".into(),
            path: dir.to_string_lossy().into_owned(),
        };
        let store = open(&config, "me").unwrap();
        assert_eq!(store.name(), "json");
        assert!(dir.is_dir());

        let mut progress = UserProgress::default();
        progress.doses_today = 3;
        store.save(&progress).unwrap();
        assert!(dir.join("progress.json").exists());
        std::fs::remove_dir_all(dir.parent().unwrap()).ok();
    }

    #[test]
    fn test_open_sqlite_creates_parent_and_keys_by_identity() {
        let root = std::env::temp_dir().join("ditchpouch-test-open-sqlite");
        std::fs::remove_dir_all(&root).ok();
        let config = StoreConfig {
            backend: "sqlite".into(),
            path: root.join("data").join("progress.db").to_string_lossy().into_owned(),
        };

        let mine = open(&config, "447700900000").unwrap();
        assert_eq!(mine.name(), "sqlite");
        let mut progress = UserProgress::default();
        progress.current_strength_mg = Some(15);
        mine.save(&progress).unwrap();
        drop(mine);

        let again = open(&config, "447700900000").unwrap();
        assert_eq!(again.load(&UserProgress::default()).unwrap().current_strength_mg, Some(15));
        let other = open(&config, "447700900001").unwrap();
        assert_eq!(other.load(&UserProgress::default()).unwrap(), UserProgress::default());
        drop((again, other));
        std::fs::remove_dir_all(&root).ok();
    }
}
