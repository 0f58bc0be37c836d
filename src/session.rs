// Session persistence for auth state. The engine never touches ambient
// storage directly; an explicit store is injected so tests can run against
// an in-memory implementation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

// Fixed keys the auth layer persists under. All are cleared together on
// logout.
pub const KEY_AUTH_TOKEN: &str = "auth_token";
pub const KEY_USER_ID: &str = "user_id";
pub const KEY_USER_EMAIL: &str = "user_email";
pub const KEY_USER_DISPLAY_NAME: &str = "user_display_name";
pub const KEY_LOGGED_IN_AT: &str = "logged_in_at";

/// Every key the auth layer owns, in clear order.
pub const SESSION_KEYS: [&str; 5] = [
    KEY_AUTH_TOKEN,
    KEY_USER_ID,
    KEY_USER_EMAIL,
    KEY_USER_DISPLAY_NAME,
    KEY_LOGGED_IN_AT,
];

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Key-value persistence for session state.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;
    fn clear(&self, key: &str) -> Result<(), SessionError>;
}

// ---------------------------------------------------------------------------
// SQLite-backed store
// ---------------------------------------------------------------------------

/// SQLite-backed session store. Pass `":memory:"` for an ephemeral store.
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    pub fn open(path: &str) -> Result<Self, SessionError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;

             CREATE TABLE IF NOT EXISTS session (
                 key   TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );",
        )?;
        Ok(SqliteSessionStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("session db lock poisoned")
    }
}

impl SessionStore for SqliteSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let conn = self.lock();
        let value = conn
            .query_row(
                "SELECT value FROM session WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO session (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), SessionError> {
        let conn = self.lock();
        conn.execute("DELETE FROM session WHERE key = ?1", params![key])?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// In-memory session store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.values.lock().expect("lock poisoned").get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.values
            .lock()
            .expect("lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), SessionError> {
        self.values.lock().expect("lock poisoned").remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
