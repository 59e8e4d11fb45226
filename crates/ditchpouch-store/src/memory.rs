//! In-process progress store.

use std::sync::Mutex;

use chrono::NaiveDate;
use ditchpouch_core::error::{DitchPouchError, Result};
use ditchpouch_core::traits::ProgressStore;
use ditchpouch_core::types::UserProgress;

#[derive(Default)]
pub struct MemoryStore {
    record: Mutex<Option<UserProgress>>,
    boundary: Mutex<Option<NaiveDate>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self, defaults: &UserProgress) -> Result<UserProgress> {
        let record = self
            .record
            .lock()
            .map_err(|e| DitchPouchError::Store(format!("Lock: {e}")))?;
        Ok(record.clone().unwrap_or_else(|| defaults.clone()))
    }

    fn save(&self, progress: &UserProgress) -> Result<()> {
        let mut record = self
            .record
            .lock()
            .map_err(|e| DitchPouchError::Store(format!("Lock: {e}")))?;
        *record = Some(progress.clone());
        Ok(())
    }

    fn last_boundary(&self) -> Result<Option<NaiveDate>> {
        let boundary = self
            .boundary
            .lock()
            .map_err(|e| DitchPouchError::Store(format!("Lock: {e}")))?;
        Ok(*boundary)
    }

    fn record_boundary(&self, day: NaiveDate) -> Result<()> {
        let mut boundary = self
            .boundary
            .lock()
            .map_err(|e| DitchPouchError::Store(format!("Lock: {e}")))?;
        *boundary = Some(day);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_semantics() {
        let store = MemoryStore::new();
        assert_eq!(store.load(&UserProgress::default()).unwrap(), UserProgress::default());

        let mut progress = UserProgress::default();
        progress.graduated = true;
        store.save(&progress).unwrap();
        assert!(store.load(&UserProgress::default()).unwrap().graduated);

        let day = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        store.record_boundary(day).unwrap();
        assert_eq!(store.last_boundary().unwrap(), Some(day));
    }
}
