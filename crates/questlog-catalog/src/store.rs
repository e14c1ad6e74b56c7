//! Record storage using SQLite

use crate::{CatalogError, GameRecord, Result};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Version stamped into `PRAGMA user_version`; the only supported shape
pub const SCHEMA_VERSION: i64 = 1;

const SELECT_ALL: &str = "SELECT id, title, cover, play_date, release_date, platform, rating, review
     FROM games";

const INSERT: &str = "INSERT INTO games
     (id, title, cover, play_date, release_date, platform, rating, review)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

/// Durable collection of game records
///
/// Cloning is cheap and yields a handle to the same connection.
#[derive(Debug, Clone)]
pub struct RecordStore {
    conn: Arc<Mutex<Connection>>,
    location: Option<PathBuf>,
}

impl RecordStore {
    /// Open or create the store at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        tokio::task::spawn_blocking(move || Self::open_blocking(path))
            .await
            .map_err(|e| CatalogError::Connection(format!("open task failed: {e}")))?
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(connection_error)?;
        Self::from_connection(conn, None)
    }

    fn open_blocking(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                CatalogError::Connection(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open(&path).map_err(connection_error)?;
        tracing::debug!("Opened record store at {}", path.display());
        Self::from_connection(conn, Some(path))
    }

    fn from_connection(conn: Connection, location: Option<PathBuf>) -> Result<Self> {
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location,
        })
    }

    /// Database file backing this store, `None` when in memory
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Whether both handles share one connection
    pub fn same_handle(&self, other: &RecordStore) -> bool {
        Arc::ptr_eq(&self.conn, &other.conn)
    }

    /// Every stored record, in no particular order
    pub async fn read_all(&self) -> Result<Vec<GameRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(SELECT_ALL).map_err(read_error)?;
            let records = stmt
                .query_map([], row_to_record)
                .map_err(read_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(read_error)?;
            Ok(records)
        })
        .await
    }

    /// Replace the whole collection with `records`
    ///
    /// The clear and every insert share one transaction: either the new
    /// snapshot is committed in full or the previous one is left untouched.
    /// A duplicate id within `records` fails the write.
    pub async fn replace_all(&self, records: Vec<GameRecord>) -> Result<()> {
        let written = self
            .with_connection(move |conn| {
                let tx = conn.transaction().map_err(write_error)?;
                tx.execute("DELETE FROM games", []).map_err(write_error)?;

                {
                    let mut insert = tx.prepare(INSERT).map_err(write_error)?;
                    for record in &records {
                        insert
                            .execute(params![
                                record.id,
                                record.title,
                                record.cover,
                                record.play_date,
                                record.release_date,
                                record.platform,
                                record.rating,
                                record.review,
                            ])
                            .map_err(|e| {
                                CatalogError::Write(format!("failed to insert game {}: {e}", record.id))
                            })?;
                    }
                }

                tx.commit().map_err(write_error)?;
                Ok(records.len())
            })
            .await?;

        tracing::debug!("Replaced collection with {} records", written);
        Ok(())
    }

    /// Run blocking SQLite work off the async executor
    async fn with_connection<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| CatalogError::Connection("storage handle is poisoned".to_string()))?;
            op(&mut guard)
        })
        .await
        .map_err(|e| CatalogError::Connection(format!("storage task failed: {e}")))?
    }
}

/// Create the games table and stamp the schema version
fn init_schema(conn: &Connection) -> Result<()> {
    let version: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(connection_error)?;

    if version > SCHEMA_VERSION {
        tracing::warn!(
            "Database schema version {} is newer than supported version {}",
            version,
            SCHEMA_VERSION
        );
        return Err(CatalogError::Connection(format!(
            "unsupported schema version {version} (expected {SCHEMA_VERSION})"
        )));
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS games (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            cover TEXT NOT NULL,
            play_date TEXT,
            release_date TEXT NOT NULL,
            platform TEXT NOT NULL,
            rating INTEGER NOT NULL,
            review TEXT NOT NULL DEFAULT ''
        );
    "#,
    )
    .map_err(connection_error)?;

    if version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(connection_error)?;
    }

    Ok(())
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<GameRecord> {
    Ok(GameRecord {
        id: row.get("id")?,
        title: row.get("title")?,
        cover: row.get("cover")?,
        play_date: row.get("play_date")?,
        release_date: row.get("release_date")?,
        platform: row.get("platform")?,
        rating: row.get("rating")?,
        review: row.get("review")?,
    })
}

fn connection_error(err: rusqlite::Error) -> CatalogError {
    CatalogError::Connection(err.to_string())
}

fn read_error(err: rusqlite::Error) -> CatalogError {
    CatalogError::Read(err.to_string())
}

fn write_error(err: rusqlite::Error) -> CatalogError {
    CatalogError::Write(err.to_string())
}
