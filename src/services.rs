//! The set of clients the console works with, built once at start-up and
//! handed to every view and command.

use color_eyre::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::{
  ApiClient, ApiError, CachedResourceClient, RegisterClass, Resource, ResourceClient,
  ResourceKind, School, Student, Subject, SubjectClass, Teacher,
};
use crate::cache::{CacheLayer, CacheStorage, MemoryStorage, NoopStorage, SqliteStorage};
use crate::config::Config;
use crate::notify::Notifier;

pub struct Services {
  pub schools: CachedResourceClient<School>,
  pub students: CachedResourceClient<Student>,
  pub teachers: CachedResourceClient<Teacher>,
  pub subjects: CachedResourceClient<Subject>,
  pub subject_classes: CachedResourceClient<SubjectClass>,
  pub register_classes: CachedResourceClient<RegisterClass>,
  api: ApiClient,
  notifier: Arc<dyn Notifier>,
}

impl Services {
  /// Build every client from configuration.
  pub fn new(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
    let api = ApiClient::new(&config.api.base_url, config.api.timeout())?;
    let cache = CacheLayer::new(open_storage(config))
      .with_list_stale_time(chrono::Duration::seconds(config.cache.list_stale_secs))
      .with_detail_stale_time(chrono::Duration::seconds(config.cache.detail_stale_secs));

    Ok(Self::from_parts(api, cache, notifier, config.page_size))
  }

  pub fn from_parts(
    api: ApiClient,
    cache: CacheLayer,
    notifier: Arc<dyn Notifier>,
    page_size: u32,
  ) -> Self {
    Self {
      schools: build(&api, &notifier, &cache, page_size),
      students: build(&api, &notifier, &cache, page_size),
      teachers: build(&api, &notifier, &cache, page_size),
      subjects: build(&api, &notifier, &cache, page_size),
      subject_classes: build(&api, &notifier, &cache, page_size),
      register_classes: build(&api, &notifier, &cache, page_size),
      api,
      notifier,
    }
  }

  /// The client for `R`.
  pub fn client<R: Managed>(&self) -> &CachedResourceClient<R> {
    R::client(self)
  }

  pub fn api(&self) -> &ApiClient {
    &self.api
  }

  pub fn notifier(&self) -> &Arc<dyn Notifier> {
    &self.notifier
  }

  /// `(id, display name)` of every record of `kind`, for reference pickers.
  pub async fn reference_options(&self, kind: ResourceKind) -> Result<Vec<(String, String)>, ApiError> {
    match kind {
      ResourceKind::School => self.schools.reference_options().await,
      ResourceKind::Student => self.students.reference_options().await,
      ResourceKind::Teacher => self.teachers.reference_options().await,
      ResourceKind::Subject => self.subjects.reference_options().await,
      ResourceKind::SubjectClass => self.subject_classes.reference_options().await,
      ResourceKind::RegisterClass => self.register_classes.reference_options().await,
    }
  }
}

/// Resources that have a client in [`Services`].
pub trait Managed: Resource {
  fn client(services: &Services) -> &CachedResourceClient<Self>;
}

macro_rules! managed {
  ($($ty:ty => $field:ident),+ $(,)?) => {
    $(
      impl Managed for $ty {
        fn client(services: &Services) -> &CachedResourceClient<Self> {
          &services.$field
        }
      }
    )+
  };
}

managed! {
  School => schools,
  Student => students,
  Teacher => teachers,
  Subject => subjects,
  SubjectClass => subject_classes,
  RegisterClass => register_classes,
}

fn build<R: Resource>(
  api: &ApiClient,
  notifier: &Arc<dyn Notifier>,
  cache: &CacheLayer,
  page_size: u32,
) -> CachedResourceClient<R> {
  let client = ResourceClient::new(api.clone(), notifier.clone());
  CachedResourceClient::new(client, cache.clone(), page_size)
}

fn open_storage(config: &Config) -> Arc<dyn CacheStorage> {
  if !config.cache.enabled {
    info!("cache disabled");
    return Arc::new(NoopStorage);
  }
  if config.cache.in_memory {
    return Arc::new(MemoryStorage::new());
  }

  match SqliteStorage::open(config.cache.path.as_deref()) {
    Ok(storage) => Arc::new(storage),
    Err(e) => {
      warn!("Falling back to in-memory cache: {}", e);
      Arc::new(MemoryStorage::new())
    }
  }
}
