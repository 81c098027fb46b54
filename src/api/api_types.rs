//! Serde types matching the REST server's envelopes.
//!
//! Every successful body is wrapped in `{ "data": ... }`. Lists carry a
//! total `count` next to an array whose field name differs per collection,
//! so list bodies are decoded loosely and the array is picked out by name.

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{Map, Value};

use super::error::ApiError;
use super::page::Page;

/// `{ "data": T }`
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
  pub data: Option<T>,
}

/// `{ "count": n, "<listField>": [...] }`
#[derive(Debug, Deserialize)]
pub struct ApiListBody {
  #[serde(default)]
  pub count: u64,
  #[serde(flatten)]
  pub rest: Map<String, Value>,
}

impl ApiListBody {
  /// Extract the items stored under `list_field`.
  ///
  /// A missing field is read as an empty page; servers omit it when nothing matches.
  pub fn into_page<T: DeserializeOwned>(mut self, list_field: &str) -> Result<Page<T>, ApiError> {
    let items = match self.rest.remove(list_field) {
      Some(Value::Null) | None => Vec::new(),
      Some(value) => serde_json::from_value(value)
        .map_err(|e| ApiError::Decode(format!("{}: {}", list_field, e)))?,
    };

    Ok(Page {
      count: self.count,
      items,
    })
  }
}

/// `{ "message": "..." }`
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
  pub message: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_list_body_picks_named_field() {
    let body: ApiEnvelope<ApiListBody> = serde_json::from_str(
      r#"{"data":{"count":12,"studentList":[{"n":1},{"n":2}]}}"#,
    )
    .unwrap();

    let page: Page<Value> = body.data.unwrap().into_page("studentList").unwrap();
    assert_eq!(page.count, 12);
    assert_eq!(page.items.len(), 2);
  }

  #[test]
  fn test_list_body_missing_field_is_empty() {
    let body: ApiListBody = serde_json::from_str(r#"{"count":0}"#).unwrap();
    let page: Page<Value> = body.into_page("schoolList").unwrap();
    assert!(page.items.is_empty());
  }

  #[test]
  fn test_null_data() {
    let body: ApiEnvelope<Value> = serde_json::from_str(r#"{"data":null}"#).unwrap();
    assert!(body.data.is_none());
  }
}
