use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::api_types::ApiListBody;
use super::error::ApiError;
use super::http::ApiClient;
use super::page::{Page, PageRequest};
use super::resource::{Record, Resource};
use crate::notify::Notifier;

/// CRUD client for one REST collection.
///
/// `add` and `update` report failures through the notifier and return
/// `None`; `delete` hands its error back to the caller.
pub struct ResourceClient<R> {
  api: ApiClient,
  notifier: Arc<dyn Notifier>,
  _marker: PhantomData<fn() -> R>,
}

impl<R> Clone for ResourceClient<R> {
  fn clone(&self) -> Self {
    Self {
      api: self.api.clone(),
      notifier: self.notifier.clone(),
      _marker: PhantomData,
    }
  }
}

impl<R: Resource> ResourceClient<R> {
  pub fn new(api: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
    Self {
      api,
      notifier,
      _marker: PhantomData,
    }
  }

  pub fn notifier(&self) -> &Arc<dyn Notifier> {
    &self.notifier
  }

  fn endpoint() -> &'static str {
    R::KIND.endpoint()
  }

  /// One page of the collection, in server order.
  #[instrument(skip_all, fields(kind = %R::KIND, page = req.page, size = req.page_size))]
  pub async fn list(
    &self,
    req: &PageRequest<R::Filter>,
    cancel: Option<&CancellationToken>,
  ) -> Result<Page<Record<R>>, ApiError> {
    let body: Option<ApiListBody> = self
      .api
      .get(&[Self::endpoint()], &req.query_pairs(), cancel)
      .await?;

    let page = match body {
      Some(body) => body.into_page(R::KIND.list_field())?,
      None => Page::empty(),
    };
    debug!(count = page.count, items = page.items.len(), "listed");
    Ok(page)
  }

  /// A single record; `NotFound` when the server has none.
  #[instrument(skip(self), fields(kind = %R::KIND))]
  pub async fn get_one(&self, id: &str) -> Result<Record<R>, ApiError> {
    self
      .api
      .get(&[Self::endpoint(), id], &[], None)
      .await?
      .ok_or_else(|| ApiError::NotFound(format!("{} {}", R::KIND.noun(), id)))
  }

  /// Create a record, propagating failures.
  #[instrument(skip_all, fields(kind = %R::KIND))]
  pub async fn try_add(&self, draft: &R) -> Result<Record<R>, ApiError> {
    let created: Record<R> = self
      .api
      .post(&[Self::endpoint()], &draft.to_draft())
      .await?
      .ok_or_else(|| ApiError::Decode("create returned no record".to_string()))?;
    info!(id = %created.id, "created");
    Ok(created)
  }

  /// Create a record. Failures go to the notifier and yield `None`.
  pub async fn add(&self, draft: &R) -> Option<Record<R>> {
    match self.try_add(draft).await {
      Ok(created) => {
        self.notifier.success(&format!(
          "Added {} {}",
          R::KIND.noun(),
          created.display_name()
        ));
        Some(created)
      }
      Err(e) => {
        self.notifier.error(&e.user_message());
        None
      }
    }
  }

  /// Replace a record, propagating failures. The body is the draft plus `id`.
  #[instrument(skip_all, fields(kind = %R::KIND, id = %record.id))]
  pub async fn try_update(&self, record: &Record<R>) -> Result<Record<R>, ApiError> {
    let body = Record::new(record.id.clone(), record.to_draft());
    let updated: Record<R> = self
      .api
      .put(&[Self::endpoint()], &body)
      .await?
      .ok_or_else(|| ApiError::Decode("update returned no record".to_string()))?;
    info!("updated");
    Ok(updated)
  }

  /// Replace a record. Failures go to the notifier and yield `None`.
  pub async fn update(&self, record: &Record<R>) -> Option<Record<R>> {
    match self.try_update(record).await {
      Ok(updated) => {
        self.notifier.success(&format!(
          "Updated {} {}",
          R::KIND.noun(),
          updated.display_name()
        ));
        Some(updated)
      }
      Err(e) => {
        self.notifier.error(&e.user_message());
        None
      }
    }
  }

  #[instrument(skip(self), fields(kind = %R::KIND))]
  pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
    self.api.delete(&[Self::endpoint(), id]).await?;
    info!("deleted");
    Ok(())
  }
}
