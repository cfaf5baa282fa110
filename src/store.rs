use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use rusqlite::Connection;
use tracing::debug;

/// Balances and amounts are canonical decimal text, never REAL.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS people (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    ip_address TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    person_id INTEGER NOT NULL,
    name TEXT,
    balance TEXT NOT NULL DEFAULT '0',
    FOREIGN KEY(person_id) REFERENCES people(id)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id INTEGER NOT NULL,
    name TEXT,
    amount TEXT NOT NULL,
    transaction_type TEXT NOT NULL CHECK (transaction_type IN ('deposit', 'withdrawal')),
    created_at TEXT NOT NULL,
    FOREIGN KEY(account_id) REFERENCES accounts(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_account
    ON transactions(account_id, created_at, id);
";

pub const DEFAULT_DATABASE: &str = "ledger.db";
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// `None` opens a private in-memory database.
    pub path: Option<PathBuf>,
    /// How long a caller waits for another writer's lock before failing.
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: Some(PathBuf::from(DEFAULT_DATABASE)),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl StoreConfig {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            ..Default::default()
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    /// Opens the database, validates the connection and bootstraps the schema.
    pub fn open(&self) -> rusqlite::Result<Connection> {
        let conn = match &self.path {
            Some(path) => {
                let conn = Connection::open(path)?;
                conn.busy_timeout(self.busy_timeout)?;
                let mode: String = conn.pragma_update_and_check(
                    None,
                    "journal_mode",
                    "WAL",
                    |row| row.get(0),
                )?;
                debug!(path = %path.display(), journal_mode = %mode, "opened ledger database");
                conn
            }
            None => Connection::open_in_memory()?,
        };
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        ping(&conn)?;
        migrate(&conn)?;
        Ok(conn)
    }
}

pub fn ping(conn: &Connection) -> rusqlite::Result<()> {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
    Ok(())
}

/// Idempotent: every statement is `IF NOT EXISTS`.
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
