use clap::ValueEnum;
use std::fmt;

/// The six collections the console manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ResourceKind {
  #[value(alias = "schools")]
  School,
  #[value(alias = "students")]
  Student,
  #[value(alias = "teachers")]
  Teacher,
  #[value(alias = "subjects")]
  Subject,
  #[value(name = "subject-class", alias = "subject-classes", alias = "subjectclass")]
  SubjectClass,
  #[value(name = "register-class", alias = "registrations", alias = "register_class")]
  RegisterClass,
}

impl ResourceKind {
  pub const ALL: [ResourceKind; 6] = [
    ResourceKind::School,
    ResourceKind::Student,
    ResourceKind::Teacher,
    ResourceKind::Subject,
    ResourceKind::SubjectClass,
    ResourceKind::RegisterClass,
  ];

  /// REST collection path segment
  pub fn endpoint(self) -> &'static str {
    match self {
      ResourceKind::School => "school",
      ResourceKind::Student => "student",
      ResourceKind::Teacher => "teacher",
      ResourceKind::Subject => "subject",
      ResourceKind::SubjectClass => "subjectclass",
      ResourceKind::RegisterClass => "register_class",
    }
  }

  /// Name of the array field in list responses
  pub fn list_field(self) -> &'static str {
    match self {
      ResourceKind::School => "schoolList",
      ResourceKind::Student => "studentList",
      ResourceKind::Teacher => "teacherList",
      ResourceKind::Subject => "subjectList",
      ResourceKind::SubjectClass => "listSubjectClass",
      ResourceKind::RegisterClass => "registerClassList",
    }
  }

  /// Cache scope shared by every list query of this collection
  pub fn scope(self) -> &'static str {
    match self {
      ResourceKind::School => "schools",
      ResourceKind::Student => "students",
      ResourceKind::Teacher => "teachers",
      ResourceKind::Subject => "subjects",
      ResourceKind::SubjectClass => "subject-classes",
      ResourceKind::RegisterClass => "register-classes",
    }
  }

  /// Plural heading for list views
  pub fn title(self) -> &'static str {
    match self {
      ResourceKind::School => "Schools",
      ResourceKind::Student => "Students",
      ResourceKind::Teacher => "Teachers",
      ResourceKind::Subject => "Subjects",
      ResourceKind::SubjectClass => "Subject Classes",
      ResourceKind::RegisterClass => "Class Registrations",
    }
  }

  /// Singular noun for prompts and toasts
  pub fn noun(self) -> &'static str {
    match self {
      ResourceKind::School => "school",
      ResourceKind::Student => "student",
      ResourceKind::Teacher => "teacher",
      ResourceKind::Subject => "subject",
      ResourceKind::SubjectClass => "subject class",
      ResourceKind::RegisterClass => "registration",
    }
  }
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.endpoint())
  }
}
