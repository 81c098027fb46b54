//! Cache keys for collection pages.

use sha2::{Digest, Sha256};

use super::filter::ListFilter;
use super::kind::ResourceKind;
use super::page::PageRequest;
use crate::cache::QueryKey;

/// One page of one collection under one filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageKey {
  pub kind: ResourceKind,
  pub page: u32,
  pub page_size: u32,
  /// Filter pairs in declared order, unset keys as empty strings
  pub filters: Vec<(&'static str, String)>,
}

impl PageKey {
  pub fn new<F: ListFilter>(kind: ResourceKind, req: &PageRequest<F>) -> Self {
    Self {
      kind,
      page: req.page,
      page_size: req.page_size,
      filters: req.filter.query_pairs(),
    }
  }
}

impl QueryKey for PageKey {
  fn cache_hash(&self) -> String {
    let mut input = format!("{}:{}:{}", self.kind.scope(), self.page, self.page_size);
    for (key, value) in &self.filters {
      input.push_str(&format!(":{}={}", key, value));
    }

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    let filters: Vec<String> = self
      .filters
      .iter()
      .filter(|(_, v)| !v.is_empty())
      .map(|(k, v)| format!("{}={}", k, v))
      .collect();

    if filters.is_empty() {
      format!("{} page {} ({} per page)", self.kind.scope(), self.page, self.page_size)
    } else {
      format!(
        "{} page {} ({} per page) where {}",
        self.kind.scope(),
        self.page,
        self.page_size,
        filters.join(", ")
      )
    }
  }

  fn scope(&self) -> &str {
    self.kind.scope()
  }
}
