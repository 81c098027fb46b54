//! Generic query cache.
//!
//! This module knows nothing about schools or students. It provides:
//! - Query results keyed by a hashed [`QueryKey`], grouped into invalidation scopes
//! - Single entities keyed by type and id
//! - A stale window after which cached data is re-fetched
//! - Storage backends: SQLite (persistent), in-memory, and no-op

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, CachedBlob, MemoryStorage, NoopStorage, SqliteStorage};
pub use traits::{CacheResult, CacheSource, Cacheable, QueryKey};
