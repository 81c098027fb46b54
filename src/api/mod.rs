//! REST access to the school collections.

pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod client;
pub mod error;
pub mod filter;
pub mod http;
pub mod kind;
pub mod models;
pub mod page;
pub mod resource;

pub use cached_client::{CachedResourceClient, REFERENCE_PAGE_SIZE};
pub use client::ResourceClient;
pub use error::ApiError;
pub use filter::{
  FilterError, ListFilter, RegisterClassFilter, SchoolFilter, StudentFilter, SubjectClassFilter,
  SubjectFilter, TeacherFilter,
};
pub use http::ApiClient;
pub use kind::ResourceKind;
pub use models::{EducationLevel, RegisterClass, School, Student, Subject, SubjectClass, Teacher};
pub use page::{Page, PageRequest};
pub use resource::{Column, Record, Ref, Resource};
