//! The six school entities.
//!
//! Each struct holds the fields of one collection, camelCased on the wire.
//! Ids live in [`Record`]; references to other collections use [`Ref`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::filter::{
  RegisterClassFilter, SchoolFilter, StudentFilter, SubjectClassFilter, SubjectFilter,
  TeacherFilter,
};
use super::kind::ResourceKind;
use super::resource::{Column, Ref, Resource};
use crate::forms::{FieldKind, FormField, GENDERS, STATUSES};
use crate::ui::renderfns::truncate;

/// Education level used by schools, students and subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EducationLevel {
  Primary = 1,
  Secondary = 2,
  HighSchool = 3,
  University = 4,
}

impl EducationLevel {
  pub const ALL: [EducationLevel; 4] = [
    EducationLevel::Primary,
    EducationLevel::Secondary,
    EducationLevel::HighSchool,
    EducationLevel::University,
  ];

  pub fn label(self) -> &'static str {
    match self {
      EducationLevel::Primary => "Primary",
      EducationLevel::Secondary => "Secondary",
      EducationLevel::HighSchool => "High school",
      EducationLevel::University => "University",
    }
  }
}

impl TryFrom<u8> for EducationLevel {
  type Error = String;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      1 => Ok(EducationLevel::Primary),
      2 => Ok(EducationLevel::Secondary),
      3 => Ok(EducationLevel::HighSchool),
      4 => Ok(EducationLevel::University),
      other => Err(format!("unknown education level {}", other)),
    }
  }
}

impl From<EducationLevel> for u8 {
  fn from(level: EducationLevel) -> u8 {
    level as u8
  }
}

impl fmt::Display for EducationLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// Short `YYYY-MM-DD` form of a date-ish string from the server.
fn short_date(value: &str) -> String {
  value.get(..10).unwrap_or(value).to_string()
}

// ============================================================================
// School
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct School {
  pub school_name: String,
  pub address: String,
  pub email: String,
  pub hotline: String,
  /// Year the school was founded
  pub date_established: i64,
  pub type_of_education: EducationLevel,
  #[serde(default)]
  pub description: String,
}

impl Resource for School {
  type Filter = SchoolFilter;

  const KIND: ResourceKind = ResourceKind::School;

  fn display_name(&self) -> String {
    self.school_name.clone()
  }

  fn columns() -> &'static [Column] {
    const COLUMNS: &[Column] = &[
      Column::new("Name", 24),
      Column::new("Address", 24),
      Column::new("Email", 24),
      Column::new("Hotline", 13),
      Column::new("Founded", 8),
      Column::new("Level", 12),
    ];
    COLUMNS
  }

  fn row(&self) -> Vec<String> {
    vec![
      self.school_name.clone(),
      self.address.clone(),
      self.email.clone(),
      self.hotline.clone(),
      self.date_established.to_string(),
      self.type_of_education.to_string(),
    ]
  }

  fn form_fields() -> &'static [FormField] {
    const FIELDS: &[FormField] = &[
      FormField::new("schoolName", "School name", FieldKind::Text),
      FormField::new("address", "Address", FieldKind::Text),
      FormField::new("email", "Email", FieldKind::Email),
      FormField::new("hotline", "Hotline", FieldKind::Phone),
      FormField::new("dateEstablished", "Year founded", FieldKind::Integer),
      FormField::new("typeOfEducation", "Level", FieldKind::Level),
      FormField::new("description", "Description", FieldKind::Text).optional(),
    ];
    FIELDS
  }
}

// ============================================================================
// Student
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
  pub first_name: String,
  pub last_name: String,
  pub gender: String,
  pub date_of_birth: String,
  pub address: String,
  pub email: String,
  pub phone: String,
  pub school_id: String,
  pub level: EducationLevel,
  pub enrollment_status: String,
}

impl Resource for Student {
  type Filter = StudentFilter;

  const KIND: ResourceKind = ResourceKind::Student;

  fn display_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
  }

  fn columns() -> &'static [Column] {
    const COLUMNS: &[Column] = &[
      Column::new("Name", 22),
      Column::new("Gender", 7),
      Column::new("Born", 10),
      Column::new("Address", 20),
      Column::new("Email", 24),
      Column::new("Phone", 13),
      Column::new("Level", 12),
      Column::new("Status", 9),
    ];
    COLUMNS
  }

  fn row(&self) -> Vec<String> {
    vec![
      self.display_name(),
      self.gender.clone(),
      short_date(&self.date_of_birth),
      self.address.clone(),
      self.email.clone(),
      self.phone.clone(),
      self.level.to_string(),
      self.enrollment_status.clone(),
    ]
  }

  fn form_fields() -> &'static [FormField] {
    const FIELDS: &[FormField] = &[
      FormField::new("firstName", "First name", FieldKind::Text),
      FormField::new("lastName", "Last name", FieldKind::Text),
      FormField::new("email", "Email", FieldKind::Email),
      FormField::new("phone", "Phone", FieldKind::Phone),
      FormField::new("address", "Address", FieldKind::Text),
      FormField::new("dateOfBirth", "Date of birth", FieldKind::Date),
      FormField::new("gender", "Gender", FieldKind::Choice(GENDERS)),
      FormField::new("enrollmentStatus", "Status", FieldKind::Choice(STATUSES)),
      FormField::new(
        "schoolId",
        "School",
        FieldKind::Reference(ResourceKind::School),
      ),
      FormField::new("level", "Level", FieldKind::Level),
    ];
    FIELDS
  }
}

// ============================================================================
// Teacher
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
  pub first_name: String,
  pub last_name: String,
  pub gender: String,
  pub date_of_birth: String,
  pub address: String,
  pub email: String,
  pub phone: String,
  pub school_id: String,
  pub year_start_teaching: i64,
  pub teaching_status: String,
}

impl Resource for Teacher {
  type Filter = TeacherFilter;

  const KIND: ResourceKind = ResourceKind::Teacher;

  fn display_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
  }

  fn columns() -> &'static [Column] {
    const COLUMNS: &[Column] = &[
      Column::new("Name", 22),
      Column::new("Gender", 7),
      Column::new("Born", 10),
      Column::new("Address", 20),
      Column::new("Email", 24),
      Column::new("Phone", 13),
      Column::new("Since", 6),
      Column::new("Status", 9),
    ];
    COLUMNS
  }

  fn row(&self) -> Vec<String> {
    vec![
      self.display_name(),
      self.gender.clone(),
      short_date(&self.date_of_birth),
      self.address.clone(),
      self.email.clone(),
      self.phone.clone(),
      self.year_start_teaching.to_string(),
      self.teaching_status.clone(),
    ]
  }

  fn form_fields() -> &'static [FormField] {
    const FIELDS: &[FormField] = &[
      FormField::new("firstName", "First name", FieldKind::Text),
      FormField::new("lastName", "Last name", FieldKind::Text),
      FormField::new("email", "Email", FieldKind::Email),
      FormField::new("phone", "Phone", FieldKind::Phone),
      FormField::new("address", "Address", FieldKind::Text),
      FormField::new("dateOfBirth", "Date of birth", FieldKind::Date),
      FormField::new("gender", "Gender", FieldKind::Choice(GENDERS)),
      FormField::new(
        "schoolId",
        "School",
        FieldKind::Reference(ResourceKind::School),
      ),
      FormField::new("yearStartTeaching", "Teaching since", FieldKind::Integer),
      FormField::new("teachingStatus", "Status", FieldKind::Choice(STATUSES)),
    ];
    FIELDS
  }
}

// ============================================================================
// Subject
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
  pub subject_name: String,
  pub level: EducationLevel,
  pub credit_hour: i64,
}

impl Resource for Subject {
  type Filter = SubjectFilter;

  const KIND: ResourceKind = ResourceKind::Subject;

  fn display_name(&self) -> String {
    self.subject_name.clone()
  }

  fn columns() -> &'static [Column] {
    const COLUMNS: &[Column] = &[
      Column::new("Name", 30),
      Column::new("Credit hours", 12),
      Column::new("Level", 12),
    ];
    COLUMNS
  }

  fn row(&self) -> Vec<String> {
    vec![
      self.subject_name.clone(),
      self.credit_hour.to_string(),
      self.level.to_string(),
    ]
  }

  fn form_fields() -> &'static [FormField] {
    const FIELDS: &[FormField] = &[
      FormField::new("subjectName", "Subject name", FieldKind::Text),
      FormField::new("creditHour", "Credit hours", FieldKind::Integer),
      FormField::new("level", "Level", FieldKind::Level),
    ];
    FIELDS
  }
}

// ============================================================================
// SubjectClass
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectClass {
  pub teacher_id: Ref<Teacher>,
  pub subject_id: Ref<Subject>,
  pub max_quantity: i64,
  pub min_quantity: i64,
  pub start_at: DateTime<Utc>,
  pub end_at: DateTime<Utc>,
  pub class_room: String,
  pub academic_year: i64,
  pub class_status: String,
}

impl Resource for SubjectClass {
  type Filter = SubjectClassFilter;

  const KIND: ResourceKind = ResourceKind::SubjectClass;

  fn display_name(&self) -> String {
    format!(
      "{} - {} ({})",
      self.subject_id.label(),
      self.teacher_id.label(),
      self.class_room
    )
  }

  fn columns() -> &'static [Column] {
    const COLUMNS: &[Column] = &[
      Column::new("Subject", 20),
      Column::new("Teacher", 20),
      Column::new("Level", 12),
      Column::new("Max", 4),
      Column::new("Min", 4),
      Column::new("Start", 10),
      Column::new("End", 10),
      Column::new("Room", 8),
      Column::new("Year", 5),
      Column::new("Status", 9),
    ];
    COLUMNS
  }

  fn row(&self) -> Vec<String> {
    let level = self
      .subject_id
      .expanded()
      .map(|subject| subject.level.to_string())
      .unwrap_or_default();

    vec![
      self.subject_id.label(),
      self.teacher_id.label(),
      level,
      self.max_quantity.to_string(),
      self.min_quantity.to_string(),
      self.start_at.format("%Y-%m-%d").to_string(),
      self.end_at.format("%Y-%m-%d").to_string(),
      self.class_room.clone(),
      self.academic_year.to_string(),
      self.class_status.clone(),
    ]
  }

  fn form_fields() -> &'static [FormField] {
    const FIELDS: &[FormField] = &[
      FormField::new(
        "subjectId",
        "Subject",
        FieldKind::Reference(ResourceKind::Subject),
      ),
      FormField::new(
        "teacherId",
        "Teacher",
        FieldKind::Reference(ResourceKind::Teacher),
      ),
      FormField::new("maxQuantity", "Max students", FieldKind::Integer),
      FormField::new("minQuantity", "Min students", FieldKind::Integer),
      FormField::new("startAt", "Starts", FieldKind::Timestamp),
      FormField::new("endAt", "Ends", FieldKind::Timestamp),
      FormField::new("classRoom", "Room", FieldKind::Text),
      FormField::new("academicYear", "Academic year", FieldKind::Integer),
      FormField::new("classStatus", "Status", FieldKind::Choice(STATUSES)),
    ];
    FIELDS
  }

  fn to_draft(&self) -> Self {
    Self {
      teacher_id: self.teacher_id.collapsed(),
      subject_id: self.subject_id.collapsed(),
      ..self.clone()
    }
  }
}

// ============================================================================
// RegisterClass
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterClass {
  pub student_id: Ref<Student>,
  pub subject_class_id: Ref<SubjectClass>,
  pub status: String,
}

impl Resource for RegisterClass {
  type Filter = RegisterClassFilter;

  const KIND: ResourceKind = ResourceKind::RegisterClass;

  fn display_name(&self) -> String {
    format!(
      "{} in {}",
      self.student_id.label(),
      self.subject_class_id.label()
    )
  }

  fn columns() -> &'static [Column] {
    const COLUMNS: &[Column] = &[
      Column::new("Student", 24),
      Column::new("Subject", 24),
      Column::new("Teacher", 24),
      Column::new("Status", 9),
    ];
    COLUMNS
  }

  fn row(&self) -> Vec<String> {
    let class = self.subject_class_id.expanded();
    let subject = class
      .map(|c| c.subject_id.label())
      .unwrap_or_else(|| truncate(self.subject_class_id.id(), 24));
    let teacher = class.map(|c| c.teacher_id.label()).unwrap_or_default();

    vec![
      self.student_id.label(),
      subject,
      teacher,
      self.status.clone(),
    ]
  }

  fn form_fields() -> &'static [FormField] {
    const FIELDS: &[FormField] = &[
      FormField::new(
        "studentId",
        "Student",
        FieldKind::Reference(ResourceKind::Student),
      ),
      FormField::new(
        "subjectClassId",
        "Subject class",
        FieldKind::Reference(ResourceKind::SubjectClass),
      ),
      FormField::new("status", "Status", FieldKind::Choice(STATUSES)),
    ];
    FIELDS
  }

  fn to_draft(&self) -> Self {
    Self {
      student_id: self.student_id.collapsed(),
      subject_class_id: self.subject_class_id.collapsed(),
      ..self.clone()
    }
  }
}
