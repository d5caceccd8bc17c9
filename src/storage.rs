use std::{collections::HashMap, fs, path::Path};

use chrono::Utc;
use color_eyre::eyre::{Context, Result};
use rusqlite::{Connection, params};

use crate::log_util::log_debug;

/// Opaque key-value persistence consumed by the engine. Values are
/// JSON-serialized records. Reads fail open: a missing, unreadable or
/// corrupt value is simply absent, never fatal.
pub trait StorageGateway {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str);
}

/// In-process store, the default for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageGateway for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Durable store backed by a single key-value table in SQLite.
#[derive(Debug)]
pub struct SqliteStore {
    connection: Connection,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).wrap_err_with(|| {
                format!(
                    "failed to create directory for storage at {}",
                    parent.display()
                )
            })?;
        }
        let mut connection = Connection::open(db_path)
            .wrap_err_with(|| format!("failed to open storage at {}", db_path.display()))?;
        initialize_schema(&mut connection)?;
        Ok(Self { connection })
    }
}

impl StorageGateway for SqliteStore {
    fn get(&self, key: &str) -> Option<String> {
        self.connection
            .query_row("SELECT value FROM kv_entries WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .ok()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.connection
            .execute(
                "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, &now],
            )
            .wrap_err("failed to write entry into storage")?;
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        if let Err(err) = self
            .connection
            .execute("DELETE FROM kv_entries WHERE key = ?1", [key])
        {
            log_debug(&format!("storage: failed to remove key {key}: {err}"));
        }
    }
}

fn initialize_schema(connection: &mut Connection) -> Result<()> {
    connection
        .execute(
            "CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .wrap_err("failed to create kv_entries table")?;
    Ok(())
}

/// Read and deserialize a stored JSON record. Corrupt entries read as absent.
pub fn load_json<T: serde::de::DeserializeOwned>(
    gateway: &dyn StorageGateway,
    key: &str,
) -> Option<T> {
    let value = gateway.get(key)?;
    match serde_json::from_str(&value) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            log_debug(&format!("storage: unreadable value under {key}: {err}"));
            None
        }
    }
}

pub fn store_json<T: serde::Serialize>(
    gateway: &mut dyn StorageGateway,
    key: &str,
    value: &T,
) -> Result<()> {
    let serialized =
        serde_json::to_string(value).wrap_err("failed to serialize record for storage")?;
    gateway.set(key, &serialized)
}
