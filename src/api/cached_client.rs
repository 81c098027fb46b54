//! Resource client with transparent caching and the invalidation contract.

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cache::CacheLayer;

use super::cache::PageKey;
use super::client::ResourceClient;
use super::error::ApiError;
use super::page::{Page, PageRequest};
use super::resource::{Record, Resource};

/// Page size used when loading reference dropdown options.
pub const REFERENCE_PAGE_SIZE: u32 = 1000;

/// Wraps [`ResourceClient`] with the same API, serving fresh cached results
/// and dropping the collection's cached pages after every successful write.
pub struct CachedResourceClient<R> {
  inner: ResourceClient<R>,
  cache: CacheLayer,
  default_page_size: u32,
}

impl<R> Clone for CachedResourceClient<R> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
      cache: self.cache.clone(),
      default_page_size: self.default_page_size,
    }
  }
}

impl<R: Resource> CachedResourceClient<R> {
  pub fn new(inner: ResourceClient<R>, cache: CacheLayer, default_page_size: u32) -> Self {
    Self {
      inner,
      cache,
      default_page_size,
    }
  }

  /// The uncached client underneath.
  pub fn inner(&self) -> &ResourceClient<R> {
    &self.inner
  }

  pub fn default_page_size(&self) -> u32 {
    self.default_page_size
  }

  /// A page of the collection, from cache while fresh.
  pub async fn list(
    &self,
    req: &PageRequest<R::Filter>,
    cancel: Option<&CancellationToken>,
  ) -> Result<Page<Record<R>>, ApiError> {
    let key = PageKey::new(R::KIND, req);
    let result = self
      .cache
      .fetch_query(&key, || self.inner.list(req, cancel))
      .await?;
    Ok(result.data)
  }

  /// A page straight from the server; the cache entry is replaced.
  pub async fn refresh(
    &self,
    req: &PageRequest<R::Filter>,
    cancel: Option<&CancellationToken>,
  ) -> Result<Page<Record<R>>, ApiError> {
    let key = PageKey::new(R::KIND, req);
    self
      .cache
      .refresh_query(&key, || self.inner.list(req, cancel))
      .await
  }

  /// Warm the cache for `req`. Failures are logged only.
  pub async fn prefetch(&self, req: &PageRequest<R::Filter>) {
    if let Err(e) = self.refresh(req, None).await {
      warn!(kind = %R::KIND, page = req.page, "prefetch failed: {}", e);
    }
  }

  /// A single record, from cache while fresh.
  pub async fn get_one(&self, id: &str) -> Result<Record<R>, ApiError> {
    let result = self
      .cache
      .fetch_one(id, || self.inner.get_one(id))
      .await?;
    Ok(result.data)
  }

  pub async fn try_add(&self, draft: &R) -> Result<Record<R>, ApiError> {
    let created = self.inner.try_add(draft).await?;
    self.after_write(&created).await;
    Ok(created)
  }

  /// Create a record; `None` once the failure has been notified.
  pub async fn add(&self, draft: &R) -> Option<Record<R>> {
    let created = self.inner.add(draft).await?;
    self.after_write(&created).await;
    Some(created)
  }

  pub async fn try_update(&self, record: &Record<R>) -> Result<Record<R>, ApiError> {
    let updated = self.inner.try_update(record).await?;
    self.after_write(&updated).await;
    Ok(updated)
  }

  /// Replace a record; `None` once the failure has been notified.
  pub async fn update(&self, record: &Record<R>) -> Option<Record<R>> {
    let updated = self.inner.update(record).await?;
    self.after_write(&updated).await;
    Some(updated)
  }

  pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
    self.inner.delete(id).await?;
    self.cache.remove_entity::<Record<R>>(id);
    self.cache.invalidate(R::KIND.scope());
    Ok(())
  }

  /// Every record of the collection as `(id, display name)`, for dropdowns.
  pub async fn reference_options(&self) -> Result<Vec<(String, String)>, ApiError> {
    let page = self
      .list(&PageRequest::new(1, REFERENCE_PAGE_SIZE), None)
      .await?;
    Ok(
      page
        .items
        .into_iter()
        .map(|record| {
          let label = record.display_name();
          (record.id, label)
        })
        .collect(),
    )
  }

  /// Store the written record, drop cached pages and reload page one.
  async fn after_write(&self, record: &Record<R>) {
    self.cache.put_entity(record);
    self.cache.invalidate(R::KIND.scope());
    self
      .prefetch(&PageRequest::new(1, self.default_page_size))
      .await;
  }
}
