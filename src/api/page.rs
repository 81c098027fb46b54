use serde::{Deserialize, Serialize};

use super::filter::ListFilter;

/// One page of a collection, in server order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  /// Total number of records matching the filter, across all pages
  pub count: u64,
  pub items: Vec<T>,
}

impl<T> Page<T> {
  pub fn empty() -> Self {
    Self {
      count: 0,
      items: Vec::new(),
    }
  }

  /// Number of pages needed to show `count` records at `page_size` per page.
  pub fn total_pages(&self, page_size: u32) -> u32 {
    if page_size == 0 {
      return 0;
    }
    self.count.div_ceil(page_size as u64) as u32
  }
}

/// Page number (1-based), page size and filter for a list request.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest<F> {
  pub page: u32,
  pub page_size: u32,
  pub filter: F,
}

impl<F: ListFilter> PageRequest<F> {
  pub fn new(page: u32, page_size: u32) -> Self {
    Self {
      page: page.max(1),
      page_size,
      filter: F::default(),
    }
  }

  pub fn with_filter(mut self, filter: F) -> Self {
    self.filter = filter;
    self
  }

  /// First page, keeping size and filter.
  pub fn first(&self) -> Self {
    Self {
      page: 1,
      ..self.clone()
    }
  }

  /// Query string pairs in wire order: page, pageSize, then filter pairs.
  pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
      ("page", self.page.to_string()),
      ("pageSize", self.page_size.to_string()),
    ];
    pairs.extend(self.filter.query_pairs());
    pairs
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::filter::StudentFilter;

  #[test]
  fn test_total_pages() {
    let page: Page<()> = Page {
      count: 21,
      items: Vec::new(),
    };
    assert_eq!(page.total_pages(10), 3);
    assert_eq!(Page::<()>::empty().total_pages(10), 0);
    assert_eq!(page.total_pages(0), 0);
  }

  #[test]
  fn test_page_is_clamped_to_one() {
    let req: PageRequest<StudentFilter> = PageRequest::new(0, 10);
    assert_eq!(req.page, 1);
  }

  #[test]
  fn test_query_pairs_include_empty_filter() {
    let req: PageRequest<StudentFilter> = PageRequest::new(1, 10);
    assert_eq!(
      req.query_pairs(),
      vec![
        ("page", "1".to_string()),
        ("pageSize", "10".to_string()),
        ("fullName", String::new()),
      ]
    );
  }
}
