//! Typed list filters, one per collection.
//!
//! Each filter is a struct whose fields are the collection's filterable
//! columns. Code builds them directly; free-form text (CLI flags, the
//! search box) goes through [`ListFilter::set`] and [`ListFilter::parse_search`],
//! which reject keys the collection does not declare.

use std::fmt::Debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
  #[error("unknown filter key '{key}' (expected one of: {expected})")]
  UnknownKey { key: String, expected: String },

  #[error("filter '{0}' must be written as key=value")]
  Malformed(String),
}

impl FilterError {
  fn unknown<F: ListFilter>(key: &str) -> Self {
    FilterError::UnknownKey {
      key: key.to_string(),
      expected: F::KEYS.join(", "),
    }
  }
}

pub trait ListFilter: Default + Clone + PartialEq + Debug + Send + Sync + 'static {
  /// Wire names of the filterable fields, in the order they are sent
  const KEYS: &'static [&'static str];

  /// Current value for `key`, `None` when unset or unknown.
  fn get(&self, key: &str) -> Option<&str>;

  /// Set `key` (matched case-insensitively). An empty value clears it.
  fn set(&mut self, key: &str, value: &str) -> Result<(), FilterError>;

  /// Every declared key with its value. Unset keys are sent as empty strings,
  /// which the server reads as "no filter".
  fn query_pairs(&self) -> Vec<(&'static str, String)> {
    Self::KEYS
      .iter()
      .map(|key| (*key, self.get(key).unwrap_or_default().to_string()))
      .collect()
  }

  fn is_empty(&self) -> bool {
    Self::KEYS.iter().all(|key| self.get(key).is_none())
  }

  /// Search-box form, e.g. `fullName:Ann teacherId:t1`. Parses back through
  /// [`ListFilter::parse_search`].
  fn describe(&self) -> String {
    Self::KEYS
      .iter()
      .filter_map(|key| self.get(key).map(|v| format!("{}:{}", key, v)))
      .collect::<Vec<_>>()
      .join(" ")
  }

  /// Parse a `key=value` flag.
  fn apply_pair(&mut self, pair: &str) -> Result<(), FilterError> {
    let (key, value) = pair
      .split_once('=')
      .ok_or_else(|| FilterError::Malformed(pair.to_string()))?;
    self.set(key.trim(), value.trim())
  }

  /// Parse search-box text.
  ///
  /// `key:value` tokens set named keys (words without a colon extend the
  /// previous value). Plain text applies to the first declared key.
  fn parse_search(text: &str) -> Result<Self, FilterError> {
    let mut filter = Self::default();
    let text = text.trim();
    if text.is_empty() {
      return Ok(filter);
    }

    let keyed = text
      .split_whitespace()
      .next()
      .is_some_and(|token| token.contains(':'));
    if !keyed {
      filter.set(Self::KEYS[0], text)?;
      return Ok(filter);
    }

    let mut current: Option<(String, String)> = None;
    for token in text.split_whitespace() {
      match token.split_once(':') {
        Some((key, value)) => {
          if let Some((k, v)) = current.take() {
            filter.set(&k, &v)?;
          }
          current = Some((key.to_string(), value.to_string()));
        }
        None => {
          if let Some((_, v)) = current.as_mut() {
            if !v.is_empty() {
              v.push(' ');
            }
            v.push_str(token);
          }
        }
      }
    }
    if let Some((k, v)) = current {
      filter.set(&k, &v)?;
    }

    Ok(filter)
  }
}

macro_rules! list_filter {
  ($(#[$meta:meta])* $name:ident { $($field:ident => $key:literal),+ $(,)? }) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct $name {
      $(pub $field: Option<String>,)+
    }

    impl ListFilter for $name {
      const KEYS: &'static [&'static str] = &[$($key),+];

      fn get(&self, key: &str) -> Option<&str> {
        match key {
          $($key => self.$field.as_deref(),)+
          _ => None,
        }
      }

      fn set(&mut self, key: &str, value: &str) -> Result<(), FilterError> {
        let value = (!value.is_empty()).then(|| value.to_string());
        $(
          if key.eq_ignore_ascii_case($key) {
            self.$field = value;
            return Ok(());
          }
        )+
        Err(FilterError::unknown::<Self>(key))
      }
    }
  };
}

list_filter! {
  /// Schools by name
  SchoolFilter { school_name => "schoolName" }
}

list_filter! {
  /// Students by first + last name
  StudentFilter { full_name => "fullName" }
}

list_filter! {
  /// Teachers by first + last name
  TeacherFilter { full_name => "fullName" }
}

list_filter! {
  /// Subjects by name
  SubjectFilter { subject_name => "subjectName" }
}

list_filter! {
  /// Subject classes by teacher and/or subject id
  SubjectClassFilter { teacher_id => "teacherId", subject_id => "subjectId" }
}

list_filter! {
  /// Registrations by student and/or subject class id
  RegisterClassFilter { student_id => "studentId", subject_class_id => "subjectClassId" }
}
