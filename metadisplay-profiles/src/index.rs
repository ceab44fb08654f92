//! Derived content model index.
//!
//! A flat `(profile_name, content_model)` relation used for reverse lookup:
//! which profiles apply to objects of a given content model. It is never the
//! source of truth; [`AssociationIndex::rebuild`] regenerates it from the
//! profile collection on every save.
//!
//! # Schema
//!
//! - `profile_content_models`: one row per `(profile_name, content_model)`
//!   pair, primary key on the pair, secondary index on `content_model`

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection};
use tracing::debug;

use crate::error::IndexError;

/// One derived index row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexRow {
    pub profile_name: String,
    pub content_model: String,
}

impl IndexRow {
    pub fn new(profile_name: impl Into<String>, content_model: impl Into<String>) -> Self {
        Self {
            profile_name: profile_name.into(),
            content_model: content_model.into(),
        }
    }
}

/// Storage for the derived content model index.
pub trait AssociationIndex: Send + Sync {
    /// Replace every row with `rows` in one transaction.
    ///
    /// On failure the previous rows must remain untouched.
    fn rebuild(&self, rows: &[IndexRow]) -> Result<(), IndexError>;

    /// All rows, ordered by profile name then content model.
    fn rows(&self) -> Result<Vec<IndexRow>, IndexError>;

    /// Names of the profiles associated with `content_model`, sorted.
    fn profiles_for_content_model(&self, content_model: &str) -> Result<Vec<String>, IndexError>;
}

/// SQLite implementation of [`AssociationIndex`].
///
/// The connection is wrapped in a `Mutex` so the index is `Send + Sync` and
/// can be shared with the store's commit hooks.
pub struct SqliteAssociationIndex {
    conn: Mutex<Connection>,
}

impl SqliteAssociationIndex {
    /// Open (or create) the index database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::with_connection(conn)
    }

    /// An index that lives only as long as this value.
    pub fn open_in_memory() -> Result<Self, IndexError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, IndexError> {
        let index = Self {
            conn: Mutex::new(conn),
        };
        index.create_schema()?;
        Ok(index)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, IndexError> {
        self.conn.lock().map_err(|_| IndexError::Poisoned)
    }

    fn create_schema(&self) -> Result<(), IndexError> {
        self.conn()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS profile_content_models (
                profile_name TEXT NOT NULL,
                content_model TEXT NOT NULL,
                PRIMARY KEY (profile_name, content_model)
            );

            CREATE INDEX IF NOT EXISTS idx_profile_content_models_cmodel
                ON profile_content_models(content_model);
            "#,
        )?;
        Ok(())
    }

    /// Number of rows currently in the index.
    pub fn row_count(&self) -> Result<usize, IndexError> {
        let count: usize = self.conn()?.query_row(
            "SELECT COUNT(*) FROM profile_content_models",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl AssociationIndex for SqliteAssociationIndex {
    fn rebuild(&self, rows: &[IndexRow]) -> Result<(), IndexError> {
        let mut conn = self.conn()?;
        // Dropping an uncommitted transaction rolls it back
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM profile_content_models", [])?;
        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO profile_content_models (profile_name, content_model) VALUES (?, ?)",
            )?;
            for row in rows {
                insert.execute(params![row.profile_name, row.content_model])?;
            }
        }
        tx.commit()?;
        debug!(rows = rows.len(), "rebuilt content model index");
        Ok(())
    }

    fn rows(&self) -> Result<Vec<IndexRow>, IndexError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT profile_name, content_model FROM profile_content_models
             ORDER BY profile_name, content_model",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(IndexRow {
                    profile_name: row.get(0)?,
                    content_model: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn profiles_for_content_model(&self, content_model: &str) -> Result<Vec<String>, IndexError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT profile_name FROM profile_content_models
             WHERE content_model = ? ORDER BY profile_name",
        )?;
        let names = stmt
            .query_map([content_model], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }
}
