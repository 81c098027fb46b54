//! Cache storage trait and its SQLite, in-memory and no-op implementations.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A serialized cache entry.
#[derive(Debug, Clone)]
pub struct CachedBlob {
  /// JSON-encoded value
  pub data: Vec<u8>,
  /// When the value was stored
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
///
/// Values are stored as JSON bytes so the trait stays object safe; typed
/// encoding lives in [`super::CacheLayer`].
pub trait CacheStorage: Send + Sync {
  /// Store a query result under `key`, tagged with its invalidation scope.
  fn store_query(&self, key: &str, scope: &str, description: &str, data: &[u8]) -> Result<()>;

  /// Get a cached query result.
  fn get_query(&self, key: &str) -> Result<Option<CachedBlob>>;

  /// Store a single entity.
  fn store_entity(&self, entity_type: &str, entity_key: &str, data: &[u8]) -> Result<()>;

  /// Get a single entity by key.
  fn get_entity(&self, entity_type: &str, entity_key: &str) -> Result<Option<CachedBlob>>;

  /// Remove a single entity.
  fn remove_entity(&self, entity_type: &str, entity_key: &str) -> Result<()>;

  /// Drop every query result in `scope`. Returns the number of entries removed.
  fn invalidate_scope(&self, scope: &str) -> Result<usize>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn store_query(&self, _key: &str, _scope: &str, _description: &str, _data: &[u8]) -> Result<()> {
    Ok(())
  }

  fn get_query(&self, _key: &str) -> Result<Option<CachedBlob>> {
    Ok(None)
  }

  fn store_entity(&self, _entity_type: &str, _entity_key: &str, _data: &[u8]) -> Result<()> {
    Ok(())
  }

  fn get_entity(&self, _entity_type: &str, _entity_key: &str) -> Result<Option<CachedBlob>> {
    Ok(None)
  }

  fn remove_entity(&self, _entity_type: &str, _entity_key: &str) -> Result<()> {
    Ok(())
  }

  fn invalidate_scope(&self, _scope: &str) -> Result<usize> {
    Ok(0)
  }
}

#[derive(Default)]
struct MemoryInner {
  queries: HashMap<String, (String, CachedBlob)>,
  entities: HashMap<(String, String), CachedBlob>,
}

/// Process-local storage. Lives as long as the console session.
#[derive(Default)]
pub struct MemoryStorage {
  inner: Mutex<MemoryInner>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>> {
    self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

impl CacheStorage for MemoryStorage {
  fn store_query(&self, key: &str, scope: &str, _description: &str, data: &[u8]) -> Result<()> {
    let blob = CachedBlob {
      data: data.to_vec(),
      cached_at: Utc::now(),
    };
    self
      .lock()?
      .queries
      .insert(key.to_string(), (scope.to_string(), blob));
    Ok(())
  }

  fn get_query(&self, key: &str) -> Result<Option<CachedBlob>> {
    Ok(self.lock()?.queries.get(key).map(|(_, blob)| blob.clone()))
  }

  fn store_entity(&self, entity_type: &str, entity_key: &str, data: &[u8]) -> Result<()> {
    let blob = CachedBlob {
      data: data.to_vec(),
      cached_at: Utc::now(),
    };
    self
      .lock()?
      .entities
      .insert((entity_type.to_string(), entity_key.to_string()), blob);
    Ok(())
  }

  fn get_entity(&self, entity_type: &str, entity_key: &str) -> Result<Option<CachedBlob>> {
    Ok(
      self
        .lock()?
        .entities
        .get(&(entity_type.to_string(), entity_key.to_string()))
        .cloned(),
    )
  }

  fn remove_entity(&self, entity_type: &str, entity_key: &str) -> Result<()> {
    self
      .lock()?
      .entities
      .remove(&(entity_type.to_string(), entity_key.to_string()));
    Ok(())
  }

  fn invalidate_scope(&self, scope: &str) -> Result<usize> {
    let mut inner = self.lock()?;
    let before = inner.queries.len();
    inner.queries.retain(|_, (entry_scope, _)| entry_scope != scope);
    Ok(before - inner.queries.len())
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open the cache at `path`, or at the default location when `None`.
  pub fn open(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open a throwaway in-memory database.
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory cache: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("schooladm").join("cache.db"))
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    self
      .lock()?
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- Single entities, keyed by type and server id
CREATE TABLE IF NOT EXISTS entity_cache (
    entity_type TEXT NOT NULL,
    entity_key TEXT NOT NULL,
    data BLOB NOT NULL,
    cached_at TEXT NOT NULL,
    PRIMARY KEY (entity_type, entity_key)
);

-- Query results (pages), grouped by invalidation scope
CREATE TABLE IF NOT EXISTS query_cache (
    query_hash TEXT PRIMARY KEY,
    query_description TEXT NOT NULL,
    scope TEXT NOT NULL,
    data BLOB NOT NULL,
    cached_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_query_cache_scope ON query_cache(scope);
"#;

impl CacheStorage for SqliteStorage {
  fn store_query(&self, key: &str, scope: &str, description: &str, data: &[u8]) -> Result<()> {
    self
      .lock()?
      .execute(
        "INSERT OR REPLACE INTO query_cache (query_hash, query_description, scope, data, cached_at)
         VALUES (?, ?, ?, ?, ?)",
        params![key, description, scope, data, Utc::now().to_rfc3339()],
      )
      .map_err(|e| eyre!("Failed to store query result: {}", e))?;

    Ok(())
  }

  fn get_query(&self, key: &str) -> Result<Option<CachedBlob>> {
    let row: Option<(Vec<u8>, String)> = self
      .lock()?
      .query_row(
        "SELECT data, cached_at FROM query_cache WHERE query_hash = ?",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read query result: {}", e))?;

    row
      .map(|(data, cached_at)| {
        Ok(CachedBlob {
          data,
          cached_at: parse_datetime(&cached_at)?,
        })
      })
      .transpose()
  }

  fn store_entity(&self, entity_type: &str, entity_key: &str, data: &[u8]) -> Result<()> {
    self
      .lock()?
      .execute(
        "INSERT OR REPLACE INTO entity_cache (entity_type, entity_key, data, cached_at)
         VALUES (?, ?, ?, ?)",
        params![entity_type, entity_key, data, Utc::now().to_rfc3339()],
      )
      .map_err(|e| eyre!("Failed to store entity: {}", e))?;

    Ok(())
  }

  fn get_entity(&self, entity_type: &str, entity_key: &str) -> Result<Option<CachedBlob>> {
    let row: Option<(Vec<u8>, String)> = self
      .lock()?
      .query_row(
        "SELECT data, cached_at FROM entity_cache WHERE entity_type = ? AND entity_key = ?",
        params![entity_type, entity_key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read entity: {}", e))?;

    row
      .map(|(data, cached_at)| {
        Ok(CachedBlob {
          data,
          cached_at: parse_datetime(&cached_at)?,
        })
      })
      .transpose()
  }

  fn remove_entity(&self, entity_type: &str, entity_key: &str) -> Result<()> {
    self
      .lock()?
      .execute(
        "DELETE FROM entity_cache WHERE entity_type = ? AND entity_key = ?",
        params![entity_type, entity_key],
      )
      .map_err(|e| eyre!("Failed to remove entity: {}", e))?;

    Ok(())
  }

  fn invalidate_scope(&self, scope: &str) -> Result<usize> {
    self
      .lock()?
      .execute("DELETE FROM query_cache WHERE scope = ?", params![scope])
      .map_err(|e| eyre!("Failed to invalidate scope {}: {}", scope, e))
  }
}

/// Parse a stored RFC 3339 timestamp.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn backends() -> Vec<Box<dyn CacheStorage>> {
    vec![
      Box::new(MemoryStorage::new()),
      Box::new(SqliteStorage::open_in_memory().unwrap()),
    ]
  }

  #[test]
  fn test_query_roundtrip() {
    for storage in backends() {
      storage
        .store_query("k1", "students", "students page 1", b"[1,2]")
        .unwrap();
      let blob = storage.get_query("k1").unwrap().unwrap();
      assert_eq!(blob.data, b"[1,2]");
      assert!(storage.get_query("missing").unwrap().is_none());
    }
  }

  #[test]
  fn test_invalidate_scope_only_touches_that_scope() {
    for storage in backends() {
      storage.store_query("a", "students", "", b"1").unwrap();
      storage.store_query("b", "students", "", b"2").unwrap();
      storage.store_query("c", "teachers", "", b"3").unwrap();

      assert_eq!(storage.invalidate_scope("students").unwrap(), 2);
      assert!(storage.get_query("a").unwrap().is_none());
      assert!(storage.get_query("b").unwrap().is_none());
      assert!(storage.get_query("c").unwrap().is_some());
    }
  }

  #[test]
  fn test_entity_store_and_remove() {
    for storage in backends() {
      storage.store_entity("school", "s1", b"{}").unwrap();
      assert!(storage.get_entity("school", "s1").unwrap().is_some());
      assert!(storage.get_entity("student", "s1").unwrap().is_none());

      storage.remove_entity("school", "s1").unwrap();
      assert!(storage.get_entity("school", "s1").unwrap().is_none());
    }
  }

  #[test]
  fn test_sqlite_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    {
      let storage = SqliteStorage::open(Some(&path)).unwrap();
      storage.store_query("k", "subjects", "subjects", b"42").unwrap();
    }

    let storage = SqliteStorage::open(Some(&path)).unwrap();
    assert_eq!(storage.get_query("k").unwrap().unwrap().data, b"42");
  }

  #[test]
  fn test_noop_always_misses() {
    let storage = NoopStorage;
    storage.store_query("k", "s", "", b"1").unwrap();
    assert!(storage.get_query("k").unwrap().is_none());
    assert_eq!(storage.invalidate_scope("s").unwrap(), 0);
  }
}
