// Credential persistence
// Whole-session get/set/clear over an in-memory slot or a SQLite key-value table

use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use super::types::Session;
use crate::error::{Result, SyncError};

/// Key under which the session record lives in `auth_kv`
const SESSION_KEY: &str = "session-sync:session";

/// Storage for the current session
///
/// Writes replace the whole record; implementations must not expose a
/// partially written session to concurrent readers.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Result<Option<Session>>;
    fn set(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Process-lifetime store
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Session>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        // A panic while holding the lock cannot leave a half-written Session
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<Session>> {
        Ok(self.lock().clone())
    }

    fn set(&self, session: &Session) -> Result<()> {
        *self.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.lock() = None;
        Ok(())
    }
}

/// SQLite-backed store, durable across restarts
pub struct SqliteCredentialStore {
    conn: Mutex<Connection>,
}

impl SqliteCredentialStore {
    /// Open (or create) the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SyncError::Storage(format!(
                        "Failed to create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        tracing::debug!("Opening credential store: {}", path.display());
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS auth_kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for SqliteCredentialStore {
    fn get(&self) -> Result<Option<Session>> {
        let conn = self.lock();
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM auth_kv WHERE key = ?",
                [SESSION_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            None => Ok(None),
            Some(json) => serde_json::from_str(&json).map(Some).map_err(|e| {
                SyncError::Storage(format!("Failed to parse stored session: {}", e))
            }),
        }
    }

    fn set(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string(session)
            .map_err(|e| SyncError::Storage(format!("Failed to serialize session: {}", e)))?;

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO auth_kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [SESSION_KEY, json.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM auth_kv WHERE key = ?", [SESSION_KEY])?;
        Ok(())
    }
}
