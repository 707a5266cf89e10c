//! Persistence of the memory-store collection.
//!
//! The engine only sees the [`MemoryStorage`] trait: load the whole keyed
//! collection, save the whole keyed collection. Two backends implement it.
//!
//! **`SQLite`** ([`SqliteStorage`]), one row per agent:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS memory_stores (
//!     agent_id   TEXT PRIMARY KEY,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! ```
//!
//! - WAL mode for concurrent reads
//! - JSON inside a BLOB keeps the schema stable as the store evolves
//! - Optional CRC-32 checksum detects save corruption
//!
//! **JSON file** ([`JsonFileStorage`]): one pretty-printed object keyed by
//! agent id, replaced atomically on every save.
//!
//! Both backends isolate corruption per agent: an entry that fails its
//! checksum or does not decode is reported in [`LoadReport::corrupt`] and
//! skipped, and every other agent loads normally.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, params};
use tracing::{debug, info, warn};

use crate::config::{PersistenceConfig, StorageBackend};
use crate::error::{GrudgeError, Result};
use crate::store::MemoryStore;
use crate::types::AgentId;

/// Every agent's store, keyed by agent id.
pub type StoreCollection = BTreeMap<AgentId, MemoryStore>;

/// Result of loading the persisted collection.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Stores that decoded cleanly.
    pub stores: StoreCollection,
    /// Agents whose persisted entry was corrupt and was skipped.
    pub corrupt: Vec<AgentId>,
}

/// Backend holding the persisted collection.
///
/// `save` replaces the whole persisted collection: agents absent from
/// `stores` are removed from storage.
pub trait MemoryStorage: Send + Sync + std::fmt::Debug {
    /// Load every persisted store.
    ///
    /// # Errors
    /// Returns an error only if the storage itself is unreadable. Corrupt
    /// individual entries are reported in the [`LoadReport`] instead.
    fn load(&self) -> Result<LoadReport>;

    /// Replace the persisted collection with `stores`.
    ///
    /// # Errors
    /// Returns an error if the collection could not be written. The
    /// previously persisted collection is left intact.
    fn save(&self, stores: &StoreCollection) -> Result<()>;
}

/// Open the backend selected by `config`.
///
/// # Errors
/// Returns [`GrudgeError::Database`] or [`GrudgeError::Io`] if the backend
/// cannot be opened.
pub fn open_storage(config: &PersistenceConfig) -> Result<Box<dyn MemoryStorage>> {
    match config.backend {
        StorageBackend::Sqlite => Ok(Box::new(SqliteStorage::open(&config.path, config)?)),
        StorageBackend::Json => Ok(Box::new(JsonFileStorage::new(&config.path))),
    }
}

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

/// CRC-32 of `data` as a lowercase hex string.
fn crc32_hex(data: &[u8]) -> String {
    let crc = crc32_compute(data);
    format!("{crc:08x}")
}

/// Basic CRC-32 (ISO 3309 / ITU-T V.42) computation.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

/// Check a decoded entry is filed under its own agent id.
fn owned_by(agent: &AgentId, store: MemoryStore) -> std::result::Result<MemoryStore, String> {
    if store.agent_id() == agent {
        Ok(store)
    } else {
        Err(format!("entry holds agent '{}'", store.agent_id()))
    }
}

// ---------------------------------------------------------------------------
// SqliteStorage
// ---------------------------------------------------------------------------

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS memory_stores (
    agent_id   TEXT PRIMARY KEY,
    data       BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    checksum   TEXT
);";

/// `SQLite`-backed storage, one row per agent.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    checksum_enabled: bool,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("db_path", &self.db_path)
            .field("checksum_enabled", &self.checksum_enabled)
            .finish_non_exhaustive()
    }
}

impl SqliteStorage {
    /// Open (or create) a database at `path`.
    ///
    /// The parent directory and schema are created if missing. WAL mode is
    /// enabled when `config.wal_mode` is `true`.
    ///
    /// # Errors
    /// Returns [`GrudgeError::Database`] on `SQLite` failures or
    /// [`GrudgeError::Io`] if the parent directory cannot be created.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "GRUDGE sqlite storage opened"
        );

        Ok(Self {
            conn: Mutex::new(conn),
            checksum_enabled: config.checksum_enabled,
            db_path,
        })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    /// Returns [`GrudgeError::Database`] on `SQLite` failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            checksum_enabled: config.checksum_enabled,
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Number of persisted agents.
    ///
    /// # Errors
    /// Returns [`GrudgeError::Database`] on `SQLite` failures.
    pub fn agent_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM memory_stores", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Run raw SQL against the database. Test helper for simulating
    /// external damage to a save.
    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<usize> {
        Ok(self.conn.lock().execute(sql, [])?)
    }
}

impl MemoryStorage for SqliteStorage {
    fn load(&self) -> Result<LoadReport> {
        let start = Instant::now();
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT agent_id, data, checksum FROM memory_stores")?;
        // Only the key is required to decode; a bad payload cell marks its
        // agent corrupt instead of failing the whole load.
        let rows = stmt.query_map([], |row| {
            let cells = match (row.get::<_, Vec<u8>>(1), row.get::<_, Option<String>>(2)) {
                (Ok(data), Ok(checksum)) => Ok((data, checksum)),
                (Err(e), _) | (_, Err(e)) => Err(e),
            };
            Ok((row.get::<_, String>(0)?, cells))
        })?;

        let mut report = LoadReport::default();
        for row in rows {
            let (id, cells) = row?;
            let agent = AgentId::new(id);
            let (data, stored_checksum) = match cells {
                Ok(cells) => cells,
                Err(e) => {
                    warn!(agent = %agent, error = %e, "Unreadable memory store row, skipping");
                    report.corrupt.push(agent);
                    continue;
                }
            };

            if self.checksum_enabled {
                if let Some(expected) = stored_checksum {
                    let actual = crc32_hex(&data);
                    if expected != actual {
                        warn!(
                            agent = %agent,
                            expected = %expected,
                            actual = %actual,
                            "Checksum mismatch, skipping corrupt memory store"
                        );
                        report.corrupt.push(agent);
                        continue;
                    }
                }
            }

            let decoded = serde_json::from_slice::<MemoryStore>(&data)
                .map_err(|e| e.to_string())
                .and_then(|store| owned_by(&agent, store));
            match decoded {
                Ok(store) => {
                    report.stores.insert(agent, store);
                }
                Err(reason) => {
                    warn!(agent = %agent, %reason, "Undecodable memory store, skipping");
                    report.corrupt.push(agent);
                }
            }
        }

        debug!(
            agents = report.stores.len(),
            corrupt = report.corrupt.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Loaded memory stores"
        );
        Ok(report)
    }

    fn save(&self, stores: &StoreCollection) -> Result<()> {
        let start = Instant::now();
        let now = Utc::now().to_rfc3339();

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut bytes = 0usize;

        {
            let mut upsert = tx.prepare_cached(
                "INSERT INTO memory_stores (agent_id, data, updated_at, checksum)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(agent_id) DO UPDATE SET
                    data = excluded.data,
                    updated_at = excluded.updated_at,
                    checksum = excluded.checksum",
            )?;
            for (agent, store) in stores {
                let json = serde_json::to_vec(store)?;
                let checksum = self.checksum_enabled.then(|| crc32_hex(&json));
                bytes += json.len();
                upsert.execute(params![agent.as_str(), json, now, checksum])?;
            }

            let persisted: Vec<String> = tx
                .prepare_cached("SELECT agent_id FROM memory_stores")?
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<_, _>>()?;
            let mut delete = tx.prepare_cached("DELETE FROM memory_stores WHERE agent_id = ?1")?;
            for id in persisted {
                if !stores.contains_key(&AgentId::new(id.as_str())) {
                    delete.execute(params![id])?;
                }
            }
        }

        // Dropping an uncommitted transaction rolls it back.
        tx.commit()?;

        debug!(
            agents = stores.len(),
            bytes,
            elapsed_us = start.elapsed().as_micros(),
            "Saved memory stores"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JsonFileStorage
// ---------------------------------------------------------------------------

/// Single-file JSON storage.
///
/// Saves write a sibling temp file, `fsync` it and rename it over the
/// target, so a crash mid-save leaves the previous file intact.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Storage at `path`. Nothing is touched until the first load or save.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the JSON file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl MemoryStorage for JsonFileStorage {
    fn load(&self) -> Result<LoadReport> {
        let start = Instant::now();
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No memory file yet");
                return Ok(LoadReport::default());
            }
            Err(e) => return Err(e.into()),
        };

        let entries = match serde_json::from_slice::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => {
                warn!(
                    path = %self.path.display(),
                    "Memory file is not a JSON object, starting with no prior state"
                );
                return Ok(LoadReport::default());
            }
        };

        let mut report = LoadReport::default();
        for (id, value) in entries {
            let agent = AgentId::new(id);
            let decoded = serde_json::from_value::<MemoryStore>(value)
                .map_err(|e| e.to_string())
                .and_then(|store| owned_by(&agent, store));
            match decoded {
                Ok(store) => {
                    report.stores.insert(agent, store);
                }
                Err(reason) => {
                    warn!(agent = %agent, %reason, "Undecodable memory store, skipping");
                    report.corrupt.push(agent);
                }
            }
        }

        debug!(
            agents = report.stores.len(),
            corrupt = report.corrupt.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Loaded memory stores"
        );
        Ok(report)
    }

    fn save(&self, stores: &StoreCollection) -> Result<()> {
        let start = Instant::now();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(stores)?;
        let tmp = self.temp_path();
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(GrudgeError::Io(e));
        }

        debug!(
            agents = stores.len(),
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved memory stores"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
