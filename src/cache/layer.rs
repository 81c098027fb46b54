//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::storage::CacheStorage;
use super::traits::{CacheResult, Cacheable, QueryKey};

/// Cache layer that manages caching logic and network fetching.
///
/// Storage problems never fail a fetch: they are logged and treated as a
/// cache miss.
///
/// Each scope carries a generation that [`CacheLayer::invalidate`] bumps. A
/// fetch that started under an older generation returns its data but does
/// not store it, so a page read before a mutation cannot outlive it.
pub struct CacheLayer {
  storage: Arc<dyn CacheStorage>,
  /// Shared between clones
  generations: Arc<Mutex<HashMap<String, u64>>>,
  /// How long a cached page is served without asking the server
  list_stale_time: Duration,
  /// How long a cached single entity is served without asking the server
  detail_stale_time: Duration,
}

impl CacheLayer {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
    Self {
      storage,
      generations: Arc::default(),
      list_stale_time: Duration::seconds(40),
      detail_stale_time: Duration::seconds(30),
    }
  }

  /// Set the stale time for cached query results.
  pub fn with_list_stale_time(mut self, stale_time: Duration) -> Self {
    self.list_stale_time = stale_time;
    self
  }

  /// Set the stale time for cached single entities.
  pub fn with_detail_stale_time(mut self, stale_time: Duration) -> Self {
    self.detail_stale_time = stale_time;
    self
  }

  fn generation(&self, scope: &str) -> u64 {
    match self.generations.lock() {
      Ok(generations) => generations.get(scope).copied().unwrap_or(0),
      Err(e) => e.into_inner().get(scope).copied().unwrap_or(0),
    }
  }

  fn bump_generation(&self, scope: &str) {
    let mut generations = match self.generations.lock() {
      Ok(generations) => generations,
      Err(e) => e.into_inner(),
    };
    *generations.entry(scope.to_string()).or_insert(0) += 1;
  }

  fn entity_scope<T: Cacheable>(entity_key: &str) -> String {
    format!("{}/{}", T::entity_type(), entity_key)
  }

  fn is_stale(cached_at: DateTime<Utc>, stale_time: Duration) -> bool {
    Utc::now() - cached_at >= stale_time
  }

  /// Fetch a query result with cache-first strategy.
  ///
  /// 1. Check cache - if fresh, return immediately
  /// 2. If stale/missing, fetch from network
  /// 3. On success, replace the cache entry
  ///
  /// Fetch errors are returned as-is and leave the cache untouched.
  pub async fn fetch_query<K, T, E, F, Fut>(&self, key: &K, fetcher: F) -> Result<CacheResult<T>, E>
  where
    K: QueryKey,
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let hash = key.cache_hash();

    if let Some(hit) = self.cached_query::<T>(&hash) {
      if !Self::is_stale(hit.1, self.list_stale_time) {
        debug!(query = %key.description(), "cache hit");
        return Ok(CacheResult::from_cache(hit.0, hit.1));
      }
    }

    let generation = self.generation(key.scope());
    let data = fetcher().await?;
    self.store_query_if_current(key, &hash, generation, &data);
    Ok(CacheResult::from_network(data))
  }

  /// Fetch a single entity with caching.
  pub async fn fetch_one<T, E, F, Fut>(&self, entity_key: &str, fetcher: F) -> Result<CacheResult<T>, E>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    if let Some((entity, cached_at)) = self.cached_entity::<T>(entity_key) {
      if !Self::is_stale(cached_at, self.detail_stale_time) {
        debug!(entity_type = T::entity_type(), key = entity_key, "cache hit");
        return Ok(CacheResult::from_cache(entity, cached_at));
      }
    }

    let scope = Self::entity_scope::<T>(entity_key);
    let generation = self.generation(&scope);
    let data = fetcher().await?;
    if self.generation(&scope) == generation {
      self.store_entity(&data);
    } else {
      debug!(entity_type = T::entity_type(), key = entity_key, "evicted during fetch, not caching");
    }
    Ok(CacheResult::from_network(data))
  }

  /// Fetch from the network unconditionally and overwrite the cache entry.
  pub async fn refresh_query<K, T, E, F, Fut>(&self, key: &K, fetcher: F) -> Result<T, E>
  where
    K: QueryKey,
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let generation = self.generation(key.scope());
    let data = fetcher().await?;
    self.store_query_if_current(key, &key.cache_hash(), generation, &data);
    Ok(data)
  }

  /// Store an entity directly (e.g., the record a mutation returned). Reads
  /// of the same entity already in flight will not overwrite it.
  pub fn put_entity<T: Cacheable>(&self, entity: &T) {
    self.bump_generation(&Self::entity_scope::<T>(&entity.cache_key()));
    self.store_entity(entity);
  }

  fn store_entity<T: Cacheable>(&self, entity: &T) {
    let data = match serde_json::to_vec(entity) {
      Ok(d) => d,
      Err(e) => {
        warn!("Failed to serialize {} for cache: {}", T::entity_type(), e);
        return;
      }
    };
    if let Err(e) = self
      .storage
      .store_entity(T::entity_type(), &entity.cache_key(), &data)
    {
      warn!("Failed to cache {} {}: {}", T::entity_type(), entity.cache_key(), e);
    }
  }

  /// Forget a single entity.
  pub fn remove_entity<T: Cacheable>(&self, entity_key: &str) {
    self.bump_generation(&Self::entity_scope::<T>(entity_key));
    if let Err(e) = self.storage.remove_entity(T::entity_type(), entity_key) {
      warn!("Failed to evict {} {}: {}", T::entity_type(), entity_key, e);
    }
  }

  /// Drop every cached query result in `scope`.
  pub fn invalidate(&self, scope: &str) {
    self.bump_generation(scope);
    match self.storage.invalidate_scope(scope) {
      Ok(n) => debug!(scope, removed = n, "invalidated"),
      Err(e) => warn!("Failed to invalidate {}: {}", scope, e),
    }
  }

  fn cached_query<T: DeserializeOwned>(&self, hash: &str) -> Option<(T, DateTime<Utc>)> {
    let blob = match self.storage.get_query(hash) {
      Ok(blob) => blob?,
      Err(e) => {
        warn!("Cache read failed: {}", e);
        return None;
      }
    };
    match serde_json::from_slice(&blob.data) {
      Ok(data) => Some((data, blob.cached_at)),
      Err(e) => {
        warn!("Discarding undecodable cache entry: {}", e);
        None
      }
    }
  }

  fn cached_entity<T: Cacheable>(&self, entity_key: &str) -> Option<(T, DateTime<Utc>)> {
    let blob = match self.storage.get_entity(T::entity_type(), entity_key) {
      Ok(blob) => blob?,
      Err(e) => {
        warn!("Cache read failed: {}", e);
        return None;
      }
    };
    serde_json::from_slice(&blob.data)
      .ok()
      .map(|entity| (entity, blob.cached_at))
  }

  fn store_query_if_current<K: QueryKey, T: Serialize>(
    &self,
    key: &K,
    hash: &str,
    generation: u64,
    data: &T,
  ) {
    if self.generation(key.scope()) != generation {
      debug!(query = %key.description(), "invalidated during fetch, not caching");
      return;
    }
    self.store_query(key, hash, data);
  }

  fn store_query<K: QueryKey, T: Serialize>(&self, key: &K, hash: &str, data: &T) {
    let bytes = match serde_json::to_vec(data) {
      Ok(b) => b,
      Err(e) => {
        warn!("Failed to serialize {} for cache: {}", key.description(), e);
        return;
      }
    };
    if let Err(e) = self
      .storage
      .store_query(hash, key.scope(), &key.description(), &bytes)
    {
      warn!("Failed to cache {}: {}", key.description(), e);
    }
  }
}

impl Clone for CacheLayer {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      generations: Arc::clone(&self.generations),
      list_stale_time: self.list_stale_time,
      detail_stale_time: self.detail_stale_time,
    }
  }
}
