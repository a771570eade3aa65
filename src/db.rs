//! Local persistence store
//!
//! A small key/value table holding JSON values that survive restarts: the
//! signed-in identity and cached history.

mod schema;

pub use schema::*;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to encode value for {key}: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
    #[error("Store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Thread-safe store handle
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
    changes: broadcast::Sender<String>,
}

impl LocalStore {
    /// Open or create the store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory store (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        let (changes, _) = broadcast::channel(64);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            changes,
        })
    }

    /// Read a value, falling back to `default` on any failure
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.try_get(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                tracing::warn!(key, error = %e, "Error reading local store key");
                default
            }
        }
    }

    fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, String> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned.to_string())?;
        let raw: Option<String> = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| e.to_string())?;
        raw.map(|json| serde_json::from_str(&json).map_err(|e| e.to_string()))
            .transpose()
    }

    /// Write a value as JSON and notify subscribers
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        let json = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        {
            let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, json, Utc::now().to_rfc3339()],
            )?;
        }
        self.notify(key);
        Ok(())
    }

    /// Delete a key; missing keys are not an error
    pub fn remove(&self, key: &str) -> StoreResult<()> {
        let removed = {
            let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?
        };
        if removed > 0 {
            self.notify(key);
        }
        Ok(())
    }

    /// Keys changed through any clone of this handle
    ///
    /// Best effort: a lagging receiver silently misses notifications.
    #[allow(dead_code)]
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }

    fn notify(&self, key: &str) {
        // No receivers is the common case
        let _ = self.changes.send(key.to_string());
    }
}
