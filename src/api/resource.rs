//! The `Resource` abstraction shared by every collection.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::Deref;

use super::filter::ListFilter;
use super::kind::ResourceKind;
use crate::cache::Cacheable;
use crate::forms::FormField;

/// Table column: header and preferred width in cells.
#[derive(Debug, Clone, Copy)]
pub struct Column {
  pub title: &'static str,
  pub width: u16,
}

impl Column {
  pub const fn new(title: &'static str, width: u16) -> Self {
    Self { title, width }
  }
}

/// The fields of one entity type, without its identifier.
///
/// A bare `R` is the write shape sent to Add. A [`Record<R>`] is the same
/// fields plus the server-assigned id.
pub trait Resource: Clone + Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static {
  type Filter: ListFilter;

  const KIND: ResourceKind;

  /// Short label for dropdowns and prompts.
  fn display_name(&self) -> String;

  fn columns() -> &'static [Column];

  /// Cell text for each of [`Resource::columns`].
  fn row(&self) -> Vec<String>;

  fn form_fields() -> &'static [FormField];

  /// Write shape of these fields: expanded references collapsed to ids.
  fn to_draft(&self) -> Self {
    self.clone()
  }
}

/// A stored entity: server-assigned `id` plus the resource's fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<R> {
  pub id: String,
  #[serde(flatten)]
  pub fields: R,
}

impl<R> Record<R> {
  pub fn new(id: impl Into<String>, fields: R) -> Self {
    Self {
      id: id.into(),
      fields,
    }
  }
}

impl<R> Deref for Record<R> {
  type Target = R;

  fn deref(&self) -> &R {
    &self.fields
  }
}

impl<R: Resource> Cacheable for Record<R> {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn entity_type() -> &'static str {
    R::KIND.endpoint()
  }
}

/// A reference to another resource.
///
/// Write endpoints return the bare id; read endpoints may expand it into the
/// full nested record. Both decode into this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref<T> {
  Id(String),
  Expanded(Box<Record<T>>),
}

impl<T: Resource> Ref<T> {
  pub fn id(&self) -> &str {
    match self {
      Ref::Id(id) => id,
      Ref::Expanded(record) => &record.id,
    }
  }

  pub fn expanded(&self) -> Option<&Record<T>> {
    match self {
      Ref::Id(_) => None,
      Ref::Expanded(record) => Some(record),
    }
  }

  /// Display name when expanded, otherwise the raw id.
  pub fn label(&self) -> String {
    match self {
      Ref::Id(id) => id.clone(),
      Ref::Expanded(record) => record.display_name(),
    }
  }

  /// The id-only form of this reference.
  pub fn collapsed(&self) -> Self {
    Ref::Id(self.id().to_string())
  }
}

impl<T> From<String> for Ref<T> {
  fn from(id: String) -> Self {
    Ref::Id(id)
  }
}

impl<T> From<&str> for Ref<T> {
  fn from(id: &str) -> Self {
    Ref::Id(id.to_string())
  }
}
