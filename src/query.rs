//! Async query abstraction for data fetching from the UI thread.
//!
//! Inspired by TanStack Query, this module provides a `Query<T>` type that
//! encapsulates async data fetching, loading states, and error handling,
//! and a `Mutation<T>` for one-shot writes.
//!
//! # Example
//!
//! ```ignore
//! let students = services.students.clone();
//! let mut query = Query::new(move |cancel| {
//!     let students = students.clone();
//!     async move {
//!         students
//!             .list(&PageRequest::new(1, 10), Some(&cancel))
//!             .await
//!             .map_err(|e| e.user_message())
//!     }
//! });
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//! ```

use futures::future::BoxFuture;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A factory that creates a future for one fetch, given its cancellation token
type FetcherFn<T> = Box<dyn Fn(CancellationToken) -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

fn boxed<T, F, Fut>(fetcher: F) -> FetcherFn<T>
where
  F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, String>> + Send + 'static,
{
  Box::new(move |cancel| Box::pin(fetcher(cancel)))
}

/// Async query for data fetching with state management.
///
/// Only the most recent fetch is adopted: starting a new one cancels the
/// previous request's token and drops its result channel. While a fetch is
/// running, the last successful data stays readable as a placeholder.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  cancel: Option<CancellationToken>,
  placeholder: Option<T>,
  fetched_at: Option<Instant>,
  stale_time: Duration,
  enabled: bool,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is called each time `fetch()` or `refetch()` starts a
  /// request, with a token that is cancelled if the request is superseded.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: boxed(fetcher),
      receiver: None,
      cancel: None,
      placeholder: None,
      fetched_at: None,
      stale_time: Duration::from_secs(60), // Default 1 minute
      enabled: true,
    }
  }

  /// Set the stale time for this query.
  ///
  /// After this duration, the data is considered stale and `is_stale()` returns true.
  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  /// A disabled query ignores `fetch()` and `refetch()`.
  pub fn with_enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    self
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Latest data: the successful result, or the placeholder while fetching.
  pub fn data(&self) -> Option<&T> {
    self.state.data().or(self.placeholder.as_ref())
  }

  /// Check if the query is currently loading.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Loading with earlier data still on screen.
  pub fn is_placeholder(&self) -> bool {
    self.is_loading() && self.placeholder.is_some()
  }

  /// Any request in flight, with or without placeholder data.
  pub fn is_fetching(&self) -> bool {
    self.receiver.is_some()
  }

  /// Check if the query succeeded.
  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  /// Check if the query failed.
  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  /// Get the error message if the query failed.
  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Check if the data is stale (older than stale_time).
  pub fn is_stale(&self) -> bool {
    match &self.state {
      QueryState::Success(_) => self
        .fetched_at
        .map(|t| t.elapsed() > self.stale_time)
        .unwrap_or(true),
      _ => false,
    }
  }

  /// Start fetching data if not already loading.
  ///
  /// This is a no-op if the query is already loading or disabled.
  pub fn fetch(&mut self) {
    if !self.enabled || self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch, cancelling any request in flight.
  pub fn refetch(&mut self) {
    if !self.enabled {
      return;
    }
    self.cancel_pending();
    self.start_fetch();
  }

  /// Replace the request (e.g. another page or filter) and refetch,
  /// keeping the current data as placeholder.
  pub fn set_fetcher<F, Fut>(&mut self, fetcher: F)
  where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    self.fetcher = boxed(fetcher);
    self.refetch();
  }

  /// Replace the data directly, e.g. with the record a mutation returned.
  pub fn set_data(&mut self, data: T) {
    self.cancel_pending();
    self.state = QueryState::Success(data);
    self.placeholder = None;
    self.fetched_at = Some(Instant::now());
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  /// Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    // Try to receive without blocking
    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.placeholder = None;
        self.fetched_at = Some(Instant::now());
        self.finish();
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.placeholder = None;
        self.finish();
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - treat as error
        self.state = QueryState::Error("Query was cancelled".to_string());
        self.placeholder = None;
        self.finish();
        true
      }
    }
  }

  fn finish(&mut self) {
    self.receiver = None;
    self.cancel = None;
  }

  fn cancel_pending(&mut self) {
    if let Some(token) = self.cancel.take() {
      token.cancel();
    }
    self.receiver = None;
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    let token = CancellationToken::new();
    self.receiver = Some(rx);
    self.cancel = Some(token.clone());

    // Keep showing the last good data while loading
    let previous = std::mem::replace(&mut self.state, QueryState::Loading);
    if let QueryState::Success(data) = previous {
      self.placeholder = Some(data);
    }

    let future = (self.fetcher)(token);
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

impl<T> Drop for Query<T> {
  fn drop(&mut self) {
    if let Some(token) = self.cancel.take() {
      token.cancel();
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("placeholder", &self.placeholder)
      .field("fetched_at", &self.fetched_at)
      .field("stale_time", &self.stale_time)
      .field("enabled", &self.enabled)
      .finish_non_exhaustive()
  }
}

/// State of a one-shot async write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationState<T> {
  Idle,
  Pending,
  Success(T),
  Error(String),
}

/// One-shot async operation polled from the UI tick, e.g. a form submit.
pub struct Mutation<T> {
  state: MutationState<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
}

impl<T> Default for Mutation<T> {
  fn default() -> Self {
    Self {
      state: MutationState::Idle,
      receiver: None,
    }
  }
}

impl<T: Send + 'static> Mutation<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> &MutationState<T> {
    &self.state
  }

  pub fn is_pending(&self) -> bool {
    matches!(self.state, MutationState::Pending)
  }

  /// Run `future`. Ignored while a previous run is pending.
  pub fn start<Fut>(&mut self, future: Fut)
  where
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    if self.is_pending() {
      return;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = MutationState::Pending;

    tokio::spawn(async move {
      let _ = tx.send(future.await);
    });
  }

  /// Returns the finished state once, then resets to idle.
  pub fn poll(&mut self) -> Option<MutationState<T>> {
    let receiver = self.receiver.as_mut()?;
    let result = match receiver.try_recv() {
      Ok(result) => result,
      Err(mpsc::error::TryRecvError::Empty) => return None,
      Err(mpsc::error::TryRecvError::Disconnected) => Err("Mutation was cancelled".to_string()),
    };

    self.receiver = None;
    self.state = MutationState::Idle;
    Some(match result {
      Ok(data) => MutationState::Success(data),
      Err(e) => MutationState::Error(e),
    })
  }

  pub fn reset(&mut self) {
    self.receiver = None;
    self.state = MutationState::Idle;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(|_| async { Ok::<_, String>(vec![1, 2, 3]) });

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    // Wait for the result
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_success());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<i32> = Query::new(|_| async { Err("Something went wrong".to_string()) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_error());
    assert_eq!(query.error(), Some("Something went wrong"));
  }

  #[tokio::test]
  async fn test_query_stale() {
    let mut query = Query::new(|_| async { Ok::<_, String>(42) }).with_stale_time(Duration::ZERO);

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    // With zero stale time, should immediately be stale
    assert!(query.is_stale());
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let mut query = Query::new(move |_| {
      counter.fetch_add(1, Ordering::SeqCst);
      async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok::<_, String>(42)
      }
    });

    query.fetch();
    query.fetch();
    assert!(query.is_loading());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_disabled_query_never_fetches() {
    let mut query = Query::new(|_| async { Ok::<_, String>(1) }).with_enabled(false);

    query.fetch();
    query.refetch();
    assert!(matches!(query.state(), QueryState::Idle));
    assert!(!query.is_fetching());
  }

  #[tokio::test]
  async fn test_refetch_cancels_pending() {
    let counter = Arc::new(AtomicU32::new(0));
    let cancelled = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();
    let cancelled_clone = cancelled.clone();

    let mut query = Query::new(move |token: CancellationToken| {
      let counter = counter_clone.clone();
      let cancelled = cancelled_clone.clone();
      let n = counter.fetch_add(1, Ordering::SeqCst);
      async move {
        tokio::select! {
          _ = token.cancelled() => {
            cancelled.fetch_add(1, Ordering::SeqCst);
            Err("cancelled".to_string())
          }
          _ = tokio::time::sleep(Duration::from_millis(50)) => Ok::<_, String>(n),
        }
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Refetch should cancel the first and start a new one
    query.refetch();
    tokio::time::sleep(Duration::from_millis(100)).await;

    query.poll();
    // Only the second fetch should have completed and been received
    assert_eq!(query.data(), Some(&1));
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_set_fetcher_keeps_placeholder() {
    let mut query = Query::new(|_| async { Ok::<_, String>("page 1") });
    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    query.set_fetcher(|_| async {
      tokio::time::sleep(Duration::from_millis(50)).await;
      Ok::<_, String>("page 2")
    });
    assert!(query.is_placeholder());
    assert!(query.is_fetching());
    assert_eq!(query.data(), Some(&"page 1"));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(query.poll());
    assert!(!query.is_placeholder());
    assert_eq!(query.data(), Some(&"page 2"));
  }

  #[tokio::test]
  async fn test_mutation_reports_once() {
    let mut mutation: Mutation<u32> = Mutation::new();
    assert!(mutation.poll().is_none());

    mutation.start(async { Ok(7) });
    assert!(mutation.is_pending());

    // A second start while pending is ignored
    mutation.start(async { Ok(8) });

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(mutation.poll(), Some(MutationState::Success(7)));
    assert!(mutation.poll().is_none());
    assert_eq!(mutation.state(), &MutationState::Idle);
  }
}
