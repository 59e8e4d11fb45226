//! SQLite-backed progress store.
//! One row per identity; the record itself is stored as JSON.

use chrono::NaiveDate;
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;

use ditchpouch_core::error::{DitchPouchError, Result};
use ditchpouch_core::traits::ProgressStore;
use ditchpouch_core::types::UserProgress;

pub struct SqliteStore {
    conn: Mutex<Connection>,
    identity: String,
}

impl SqliteStore {
    /// Open or create the database at `path` for the given identity.
    pub fn open(path: &Path, identity: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DitchPouchError::Store(format!("Progress DB open error: {e}")))?;

        // WAL keeps readers off the writer's back
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();

        let store = Self {
            conn: Mutex::new(conn),
            identity: identity.to_string(),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS progress (
                identity TEXT PRIMARY KEY,
                data TEXT NOT NULL,          -- JSON UserProgress
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS boundary (
                identity TEXT PRIMARY KEY,
                last_day TEXT NOT NULL,      -- YYYY-MM-DD, local
                updated_at TEXT NOT NULL
            );
            ",
        )
        .map_err(|e| DitchPouchError::Store(format!("Migration: {e}")))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DitchPouchError::Store(format!("Lock: {e}")))
    }
}

impl ProgressStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn load(&self, defaults: &UserProgress) -> Result<UserProgress> {
        let conn = self.lock()?;
        let data = match conn.query_row(
            "SELECT data FROM progress WHERE identity=?1",
            params![self.identity],
            |row| row.get::<_, String>(0),
        ) {
            Ok(data) => data,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(defaults.clone()),
            Err(e) => return Err(DitchPouchError::Store(format!("Load progress: {e}"))),
        };
        serde_json::from_str(&data)
            .map_err(|e| DitchPouchError::Store(format!("Parse progress: {e}")))
    }

    fn save(&self, progress: &UserProgress) -> Result<()> {
        let data = serde_json::to_string(progress)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO progress (identity, data, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(identity) DO UPDATE SET data=?2, updated_at=?3",
            params![self.identity, data, chrono::Utc::now().to_rfc3339()],
        )
        .map_err(|e| DitchPouchError::Store(format!("Save progress: {e}")))?;
        tracing::debug!("💾 Saved progress for {}", self.identity);
        Ok(())
    }

    fn last_boundary(&self) -> Result<Option<NaiveDate>> {
        let conn = self.lock()?;
        let day = match conn.query_row(
            "SELECT last_day FROM boundary WHERE identity=?1",
            params![self.identity],
            |row| row.get::<_, String>(0),
        ) {
            Ok(day) => day,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(DitchPouchError::Store(format!("Load boundary: {e}"))),
        };
        day.parse::<NaiveDate>()
            .map(Some)
            .map_err(|e| DitchPouchError::Store(format!("Parse boundary '{day}': {e}")))
    }

    fn record_boundary(&self, day: NaiveDate) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO boundary (identity, last_day, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(identity) DO UPDATE SET last_day=?2, updated_at=?3",
            params![self.identity, day.to_string(), chrono::Utc::now().to_rfc3339()],
        )
        .map_err(|e| DitchPouchError::Store(format!("Save boundary: {e}")))?;
        Ok(())
    }
}
