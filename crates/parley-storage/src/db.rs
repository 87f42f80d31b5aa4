//! The SQLite handle shared by the session and contract repositories.
//!
//! Both repositories serialize through one connection. Every open path goes
//! through [`Database::init`], so an in-memory store used by the tests has
//! the same foreign-key behavior and schema as the file on disk.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, info};

use parley_core::error::ParleyError;

use crate::migrations;

/// How long a write waits on a lock held by another process (an operator's
/// `sqlite3` shell, a backup) before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pragmas that only make sense for a file on disk.
const FILE_PRAGMAS: &str = "PRAGMA journal_mode = WAL;
                            PRAGMA synchronous = NORMAL;";

fn storage_err(what: &str) -> impl FnOnce(rusqlite::Error) -> ParleyError + '_ {
    move |e| ParleyError::Storage(format!("{}: {}", what, e))
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open `path`, creating it and its directory if needed, and bring the
    /// schema up to date.
    pub fn new(path: &Path) -> Result<Self, ParleyError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(storage_err("Failed to open database"))?;
        conn.execute_batch(FILE_PRAGMAS)
            .map_err(storage_err("Failed to set pragmas"))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(storage_err("Failed to set busy timeout"))?;

        let db = Self::init(conn)?;
        info!(path = %path.display(), "Database opened");
        Ok(db)
    }

    /// A private store that disappears with the handle.
    pub fn in_memory() -> Result<Self, ParleyError> {
        let conn =
            Connection::open_in_memory().map_err(storage_err("Failed to open in-memory db"))?;
        Self::init(conn)
    }

    /// Settings every connection needs, then migrations. Contracts keep a
    /// nullable reference to the session that created them, which depends on
    /// foreign keys being enforced.
    fn init(conn: Connection) -> Result<Self, ParleyError> {
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(storage_err("Failed to enable foreign keys"))?;
        migrations::run_migrations(&conn)?;
        debug!("Schema is current");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` while holding the connection lock. Keep `f` free of awaits;
    /// the lock is a blocking one.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ParleyError>
    where
        F: FnOnce(&Connection) -> Result<T, ParleyError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ParleyError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}
