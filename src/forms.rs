//! Form field descriptions, validation and conversion between the text a
//! user types and the JSON a resource is made of.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

use crate::api::{EducationLevel, ResourceKind};
use crate::api::resource::Resource;

static NOT_BLANK_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^\S.*$").expect("Invalid not-blank regex"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}$").expect("Invalid email regex")
});

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^(\+84|0[3|5|7|8|9])+([0-9]{7,13})\b").expect("Invalid phone regex")
});

/// One allowed value of a [`FieldKind::Choice`] field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
  pub value: &'static str,
  pub label: &'static str,
}

impl Choice {
  pub const fn new(value: &'static str, label: &'static str) -> Self {
    Self { value, label }
  }
}

pub const GENDERS: &[Choice] = &[Choice::new("male", "Male"), Choice::new("female", "Female")];

pub const STATUSES: &[Choice] = &[
  Choice::new("active", "Active"),
  Choice::new("inactive", "Inactive"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Text,
  Email,
  Phone,
  Integer,
  /// Education level 1-4, sent as a number
  Level,
  /// `YYYY-MM-DD`
  Date,
  /// RFC 3339, or a bare date meaning midnight UTC
  Timestamp,
  Choice(&'static [Choice]),
  /// Id of a record in another collection, picked from a dropdown
  Reference(ResourceKind),
}

impl FieldKind {
  /// Values the user picks from instead of typing, as (value, label).
  pub fn fixed_options(self) -> Option<Vec<(String, String)>> {
    match self {
      FieldKind::Choice(choices) => Some(
        choices
          .iter()
          .map(|c| (c.value.to_string(), c.label.to_string()))
          .collect(),
      ),
      FieldKind::Level => Some(
        EducationLevel::ALL
          .iter()
          .map(|level| ((*level as u8).to_string(), level.label().to_string()))
          .collect(),
      ),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormField {
  /// JSON property name
  pub name: &'static str,
  pub label: &'static str,
  pub kind: FieldKind,
  pub required: bool,
}

impl FormField {
  pub const fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
    Self {
      name,
      label,
      kind,
      required: true,
    }
  }

  pub const fn optional(mut self) -> Self {
    self.required = false;
    self
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
  #[error("Please enter {0}")]
  Required(&'static str),

  #[error("{0} is not a valid email address")]
  InvalidEmail(&'static str),

  #[error("{0} is not a valid phone number")]
  InvalidPhone(&'static str),

  #[error("{0} must be a whole number")]
  NotANumber(&'static str),

  #[error("{0} must be a date like 2024-09-01")]
  InvalidDate(&'static str),

  #[error("{0} must be a date or an RFC 3339 timestamp")]
  InvalidTimestamp(&'static str),

  #[error("{label} must be one of: {expected}")]
  UnknownChoice { label: &'static str, expected: String },

  #[error("form does not describe a valid record: {0}")]
  Decode(String),
}

/// Raw text per field name, as typed.
pub type FormValues = BTreeMap<&'static str, String>;

/// Check one value against its field's rules.
pub fn validate_field(field: &FormField, value: &str) -> Result<(), FormError> {
  if value.trim().is_empty() {
    return if field.required {
      Err(FormError::Required(field.label))
    } else {
      Ok(())
    };
  }
  if field.required && !NOT_BLANK_RE.is_match(value) {
    return Err(FormError::Required(field.label));
  }

  let value = value.trim();
  match field.kind {
    FieldKind::Text | FieldKind::Reference(_) => Ok(()),
    FieldKind::Email => {
      if EMAIL_RE.is_match(value) {
        Ok(())
      } else {
        Err(FormError::InvalidEmail(field.label))
      }
    }
    FieldKind::Phone => {
      if PHONE_RE.is_match(value) {
        Ok(())
      } else {
        Err(FormError::InvalidPhone(field.label))
      }
    }
    FieldKind::Integer => parse_integer(field, value).map(|_| ()),
    FieldKind::Level => parse_level(field, value).map(|_| ()),
    FieldKind::Date => parse_date(field, value).map(|_| ()),
    FieldKind::Timestamp => parse_timestamp(field, value).map(|_| ()),
    FieldKind::Choice(choices) => parse_choice(field, choices, value).map(|_| ()),
  }
}

/// Validate every field, returning the failures keyed by field name.
pub fn validate(fields: &[FormField], values: &FormValues) -> BTreeMap<&'static str, FormError> {
  fields
    .iter()
    .filter_map(|field| {
      let value = values.get(field.name).map(String::as_str).unwrap_or_default();
      validate_field(field, value).err().map(|e| (field.name, e))
    })
    .collect()
}

/// JSON value for one field. Blank optional fields become empty strings.
pub fn to_json(field: &FormField, value: &str) -> Result<Value, FormError> {
  validate_field(field, value)?;
  let value = value.trim();
  if value.is_empty() {
    return Ok(Value::String(String::new()));
  }

  Ok(match field.kind {
    FieldKind::Integer => Value::Number(Number::from(parse_integer(field, value)?)),
    FieldKind::Level => Value::Number(Number::from(u8::from(parse_level(field, value)?))),
    FieldKind::Date => Value::String(parse_date(field, value)?.format("%Y-%m-%d").to_string()),
    FieldKind::Timestamp => Value::String(parse_timestamp(field, value)?.to_rfc3339()),
    FieldKind::Choice(choices) => Value::String(parse_choice(field, choices, value)?.to_string()),
    FieldKind::Text | FieldKind::Email | FieldKind::Phone | FieldKind::Reference(_) => {
      Value::String(value.to_string())
    }
  })
}

/// Text to show in the input for a JSON value.
pub fn from_json(field: &FormField, value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => match field.kind {
      FieldKind::Date => s.get(..10).unwrap_or(s).to_string(),
      _ => s.clone(),
    },
    Value::Number(n) => n.to_string(),
    Value::Bool(b) => b.to_string(),
    // Expanded references show as their id
    Value::Object(map) => map
      .get("id")
      .and_then(Value::as_str)
      .unwrap_or_default()
      .to_string(),
    Value::Array(_) => value.to_string(),
  }
}

/// Build the write shape of `R` from typed values.
pub fn draft_from_values<R: Resource>(values: &FormValues) -> Result<R, FormError> {
  let mut body = Map::new();
  for field in R::form_fields() {
    let value = values.get(field.name).map(String::as_str).unwrap_or_default();
    body.insert(field.name.to_string(), to_json(field, value)?);
  }
  serde_json::from_value(Value::Object(body)).map_err(|e| FormError::Decode(e.to_string()))
}

/// Prefill values for editing an existing resource.
pub fn values_from_resource<R: Resource>(resource: &R) -> FormValues {
  let json = serde_json::to_value(resource.to_draft()).unwrap_or(Value::Null);
  R::form_fields()
    .iter()
    .map(|field| {
      let text = json
        .get(field.name)
        .map(|v| from_json(field, v))
        .unwrap_or_default();
      (field.name, text)
    })
    .collect()
}

/// Empty values for a new resource.
pub fn blank_values<R: Resource>() -> FormValues {
  R::form_fields()
    .iter()
    .map(|field| (field.name, String::new()))
    .collect()
}

fn parse_integer(field: &FormField, value: &str) -> Result<i64, FormError> {
  value
    .parse::<i64>()
    .map_err(|_| FormError::NotANumber(field.label))
}

fn parse_level(field: &FormField, value: &str) -> Result<EducationLevel, FormError> {
  let by_number = value
    .parse::<u8>()
    .ok()
    .and_then(|n| EducationLevel::try_from(n).ok());
  let by_label = || {
    EducationLevel::ALL
      .into_iter()
      .find(|level| level.label().eq_ignore_ascii_case(value))
  };

  by_number.or_else(by_label).ok_or_else(|| FormError::UnknownChoice {
    label: field.label,
    expected: "1-4 (Primary, Secondary, High school, University)".to_string(),
  })
}

fn parse_date(field: &FormField, value: &str) -> Result<NaiveDate, FormError> {
  NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| FormError::InvalidDate(field.label))
}

fn parse_timestamp(field: &FormField, value: &str) -> Result<DateTime<Utc>, FormError> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
    return Ok(dt.with_timezone(&Utc));
  }
  NaiveDate::parse_from_str(value, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|dt| dt.and_utc())
    .ok_or(FormError::InvalidTimestamp(field.label))
}

fn parse_choice(
  field: &FormField,
  choices: &'static [Choice],
  value: &str,
) -> Result<&'static str, FormError> {
  choices
    .iter()
    .find(|c| c.value.eq_ignore_ascii_case(value) || c.label.eq_ignore_ascii_case(value))
    .map(|c| c.value)
    .ok_or_else(|| FormError::UnknownChoice {
      label: field.label,
      expected: choices
        .iter()
        .map(|c| c.value)
        .collect::<Vec<_>>()
        .join(", "),
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{Record, Ref, Student, SubjectClass};
  use serde_json::json;

  const NAME: FormField = FormField::new("firstName", "First name", FieldKind::Text);
  const EMAIL: FormField = FormField::new("email", "Email", FieldKind::Email);
  const PHONE: FormField = FormField::new("phone", "Phone", FieldKind::Phone);

  fn student_values() -> FormValues {
    let mut values = blank_values::<Student>();
    for (k, v) in [
      ("firstName", "Ann"),
      ("lastName", "Lee"),
      ("email", "ann@example.com"),
      ("phone", "0912345678"),
      ("address", "12 Elm St"),
      ("dateOfBirth", "2008-04-01"),
      ("gender", "female"),
      ("enrollmentStatus", "Active"),
      ("schoolId", "sc1"),
      ("level", "3"),
    ] {
      values.insert(k, v.to_string());
    }
    values
  }

  #[test]
  fn test_required_rejects_blank_and_leading_space() {
    assert_eq!(validate_field(&NAME, ""), Err(FormError::Required("First name")));
    assert_eq!(validate_field(&NAME, " Ann"), Err(FormError::Required("First name")));
    assert!(validate_field(&NAME, "Ann").is_ok());
    assert!(validate_field(&NAME.optional(), "").is_ok());
  }

  #[test]
  fn test_email_and_phone_rules() {
    assert!(validate_field(&EMAIL, "a.b@school.edu").is_ok());
    assert_eq!(
      validate_field(&EMAIL, "not-an-email"),
      Err(FormError::InvalidEmail("Email"))
    );
    assert!(validate_field(&PHONE, "0912345678").is_ok());
    assert!(validate_field(&PHONE, "+84912345678").is_ok());
    assert_eq!(
      validate_field(&PHONE, "12345"),
      Err(FormError::InvalidPhone("Phone"))
    );
  }

  #[test]
  fn test_draft_from_values_builds_typed_student() {
    let student: Student = draft_from_values(&student_values()).unwrap();
    assert_eq!(student.first_name, "Ann");
    assert_eq!(student.level, EducationLevel::HighSchool);
    assert_eq!(student.enrollment_status, "active");
    assert_eq!(student.date_of_birth, "2008-04-01");
  }

  #[test]
  fn test_validate_reports_each_failing_field() {
    let mut values = student_values();
    values.insert("email", "nope".to_string());
    values.insert("level", "9".to_string());
    let errors = validate(Student::form_fields(), &values);
    assert_eq!(errors.len(), 2);
    assert!(errors.contains_key("email"));
    assert!(errors.contains_key("level"));
  }

  #[test]
  fn test_values_from_resource_collapses_references() {
    let record: Record<SubjectClass> = serde_json::from_value(json!({
      "id": "c1",
      "teacherId": {"id": "t1", "firstName": "Lan", "lastName": "Tran", "gender": "female",
        "dateOfBirth": "1980-02-03", "address": "Hanoi", "email": "lan@example.com",
        "phone": "0912345678", "schoolId": "sc1", "yearStartTeaching": 2005,
        "teachingStatus": "active"},
      "subjectId": "s1",
      "maxQuantity": 40,
      "minQuantity": 10,
      "startAt": "2024-09-01T00:00:00Z",
      "endAt": "2025-01-15T00:00:00Z",
      "classRoom": "A101",
      "academicYear": 2024,
      "classStatus": "active"
    }))
    .unwrap();

    let values = values_from_resource(&record.fields);
    assert_eq!(values["teacherId"], "t1");
    assert_eq!(values["maxQuantity"], "40");

    let draft: SubjectClass = draft_from_values(&values).unwrap();
    assert_eq!(draft.teacher_id, Ref::Id("t1".to_string()));
    assert_eq!(draft.start_at, record.start_at);
  }

  #[test]
  fn test_timestamp_accepts_bare_date() {
    let field = FormField::new("startAt", "Starts", FieldKind::Timestamp);
    assert_eq!(
      to_json(&field, "2024-09-01").unwrap(),
      json!("2024-09-01T00:00:00+00:00")
    );
  }
}
