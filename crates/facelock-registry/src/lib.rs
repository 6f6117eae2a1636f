//! facelock-registry — SQLite-backed enrollment registry.
//!
//! Holds the set of identity names the recognition collaborator is enrolled
//! for; the tracker consults it when a target is selected. Embeddings stay
//! with the recognizer — this store is names and metadata only.

use std::path::Path;

use rusqlite::Connection;
use thiserror::Error;

use facelock_core::registry::{IdentityRegistry, RegistryError};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("identity '{0}' is already enrolled")]
    Duplicate(String),
}

/// Metadata about one enrolled identity.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IdentityInfo {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

pub struct SqliteRegistry {
    conn: Connection,
}

impl SqliteRegistry {
    /// Open (or create) the registry database at the given path.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    /// In-memory registry (tests).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             CREATE TABLE IF NOT EXISTS identities (
                 id TEXT PRIMARY KEY,
                 name TEXT NOT NULL UNIQUE,
                 created_at TEXT NOT NULL
             );",
        )?;
        Ok(Self { conn })
    }

    /// Enroll a new identity name. Returns the generated UUID.
    pub fn enroll(&self, name: &str) -> Result<String, StoreError> {
        if self.contains(name)? {
            return Err(StoreError::Duplicate(name.to_string()));
        }
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO identities (id, name, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![id, name, created_at],
        )?;
        tracing::info!(name, id = %id, "identity enrolled");
        Ok(id)
    }

    /// Remove an enrolled identity by name. Returns whether a row existed.
    pub fn remove(&self, name: &str) -> Result<bool, StoreError> {
        let affected = self
            .conn
            .execute("DELETE FROM identities WHERE name = ?1", [name])?;
        if affected > 0 {
            tracing::info!(name, "identity removed");
        }
        Ok(affected > 0)
    }

    /// List all enrolled identities in enrollment order.
    pub fn identities(&self) -> Result<Vec<IdentityInfo>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM identities ORDER BY created_at")?;
        let rows = stmt.query_map([], |row| {
            Ok(IdentityInfo {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn contains(&self, name: &str) -> Result<bool, StoreError> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM identities WHERE name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl IdentityRegistry for SqliteRegistry {
    fn is_enrolled(&self, name: &str) -> Result<bool, RegistryError> {
        self.contains(name)
            .map_err(|e| RegistryError::Backend(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enroll_and_lookup() {
        let registry = SqliteRegistry::open_in_memory().unwrap();
        let id = registry.enroll("Gabi").unwrap();
        assert!(!id.is_empty());
        assert!(registry.is_enrolled("Gabi").unwrap());
        assert!(!registry.is_enrolled("gabi").unwrap());
        assert!(!registry.is_enrolled("Nadia").unwrap());
    }

    #[test]
    fn duplicate_enrollment_is_rejected() {
        let registry = SqliteRegistry::open_in_memory().unwrap();
        registry.enroll("Gabi").unwrap();
        let err = registry.enroll("Gabi").unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn remove_reports_whether_present() {
        let registry = SqliteRegistry::open_in_memory().unwrap();
        registry.enroll("Gabi").unwrap();
        assert!(registry.remove("Gabi").unwrap());
        assert!(!registry.remove("Gabi").unwrap());
        assert!(!registry.is_enrolled("Gabi").unwrap());
    }

    #[test]
    fn identities_lists_in_enrollment_order() {
        let registry = SqliteRegistry::open_in_memory().unwrap();
        registry.enroll("Gabi").unwrap();
        registry.enroll("Marta").unwrap();
        let list = registry.identities().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "Gabi");
        assert_eq!(list[1].name, "Marta");
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = std::env::temp_dir().join(format!(
            "facelock-registry-test-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let db_path = dir.join("nested/registry.db");
        let registry = SqliteRegistry::open(&db_path).unwrap();
        registry.enroll("Gabi").unwrap();
        assert!(db_path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
