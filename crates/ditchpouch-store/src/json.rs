//! File-based progress store: one pretty-printed JSON record.
//! Writes go to a temp file first and are renamed into place.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use ditchpouch_core::error::{DitchPouchError, Result};
use ditchpouch_core::traits::ProgressStore;
use ditchpouch_core::types::UserProgress;

const FILE_NAME: &str = "progress.json";
const BOUNDARY_FILE: &str = "boundary.json";

pub struct JsonFileStore {
    path: PathBuf,
    boundary: PathBuf,
}

impl JsonFileStore {
    /// Store `progress.json` inside `dir`, creating it if needed.
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| DitchPouchError::Store(format!("Create {}: {e}", dir.display())))?;
        Ok(Self {
            path: dir.join(FILE_NAME),
            boundary: dir.join(BOUNDARY_FILE),
        })
    }

    pub fn file(&self) -> &Path {
        &self.path
    }
}

fn write_replace(path: &Path, contents: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, contents)
        .map_err(|e| DitchPouchError::Store(format!("Write {}: {e}", tmp.display())))?;
    std::fs::rename(&tmp, path)
        .map_err(|e| DitchPouchError::Store(format!("Replace {}: {e}", path.display())))
}

impl ProgressStore for JsonFileStore {
    fn name(&self) -> &str {
        "json"
    }

    fn load(&self, defaults: &UserProgress) -> Result<UserProgress> {
        if !self.path.exists() {
            return Ok(defaults.clone());
        }
        let json = std::fs::read_to_string(&self.path)
            .map_err(|e| DitchPouchError::Store(format!("Read {}: {e}", self.path.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| DitchPouchError::Store(format!("Parse {}: {e}", self.path.display())))
    }

    fn save(&self, progress: &UserProgress) -> Result<()> {
        let json = serde_json::to_string_pretty(progress)?;
        write_replace(&self.path, &json)?;
        tracing::debug!("💾 Saved progress to {}", self.path.display());
        Ok(())
    }

    fn last_boundary(&self) -> Result<Option<NaiveDate>> {
        if !self.boundary.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&self.boundary)
            .map_err(|e| DitchPouchError::Store(format!("Read {}: {e}", self.boundary.display())))?;
        let value: serde_json::Value = serde_json::from_str(&json)?;
        value["lastBoundary"]
            .as_str()
            .map(|day| {
                day.parse::<NaiveDate>().map_err(|e| {
                    DitchPouchError::Store(format!("Parse {}: {e}", self.boundary.display()))
                })
            })
            .transpose()
    }

    fn record_boundary(&self, day: NaiveDate) -> Result<()> {
        let json = serde_json::to_string_pretty(&serde_json::json!({
            "lastBoundary": day.to_string(),
        }))?;
        write_replace(&self.boundary, &json)
    }
}
