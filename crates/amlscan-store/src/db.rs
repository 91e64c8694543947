//! Store handle: path resolution, connection settings, initialization.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::schema::{SCHEMA_SQL, SCHEMA_VERSION};

/// Environment variable naming the data directory root.
pub const DATA_DIR_ENV: &str = "AISTATE_DATA_DIR";

/// Database file name inside the data directory.
const DB_FILE_NAME: &str = "amlscan.db";

/// Busy timeout, milliseconds.
const BUSY_TIMEOUT_MS: u64 = 5000;

/// Handle to the single-file store.
///
/// Each operation opens its own configured connection; SQLite's WAL mode
/// allows concurrent readers while one writer holds the lock.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Open (and initialize if needed) the store at an explicit path.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self { path };
        store.initialize()?;
        Ok(store)
    }

    /// Open the store at the default location: `$AISTATE_DATA_DIR/amlscan.db`,
    /// falling back to `./data/amlscan.db`.
    pub fn open_default() -> StoreResult<Self> {
        let dir = std::env::var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        Self::open(dir.join(DB_FILE_NAME))
    }

    /// Database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a configured connection: WAL journal, foreign keys on,
    /// 5-second busy timeout.
    pub fn conn(&self) -> StoreResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS as i64)?;
        Ok(conn)
    }

    fn initialize(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;

        let existing: Option<String> = conn
            .query_row(
                "SELECT value FROM system_config WHERE key = 'db_version'",
                [],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        match existing {
            None => {
                conn.execute(
                    "INSERT OR REPLACE INTO system_config (key, value) VALUES ('db_version', ?1)",
                    [SCHEMA_VERSION],
                )?;
                info!(path = %self.path.display(), version = SCHEMA_VERSION, "database initialized");
            }
            Some(version) if version == SCHEMA_VERSION => {}
            Some(version) => {
                return Err(StoreError::SchemaMismatch {
                    expected: SCHEMA_VERSION.to_string(),
                    found: version,
                });
            }
        }
        Ok(())
    }

    /// Read a system_config value.
    pub fn config_get(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM system_config WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        Ok(value)
    }

    /// Write a system_config value.
    pub fn config_set(&self, key: &str, value: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO system_config (key, value) VALUES (?1, ?2)",
            [key, value],
        )?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::temp_store;
    use super::*;

    #[test]
    fn test_open_initializes_schema() {
        let (store, _dir) = temp_store();
        assert_eq!(
            store.config_get("db_version").unwrap().as_deref(),
            Some(SCHEMA_VERSION)
        );
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let (store, _dir) = temp_store();
        let store2 = Store::open(store.path()).unwrap();
        assert_eq!(
            store2.config_get("db_version").unwrap().as_deref(),
            Some(SCHEMA_VERSION)
        );
    }

    #[test]
    fn test_schema_mismatch_detected() {
        let (store, _dir) = temp_store();
        store.config_set("db_version", "0.0.1").unwrap();
        let err = Store::open(store.path()).unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_config_roundtrip() {
        let (store, _dir) = temp_store();
        assert_eq!(store.config_get("missing").unwrap(), None);
        store.config_set("k", "v").unwrap();
        assert_eq!(store.config_get("k").unwrap().as_deref(), Some("v"));
    }
}
