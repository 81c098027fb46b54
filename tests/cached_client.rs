mod common;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use schooladm::api::{ApiError, PageRequest, Record, Student, StudentFilter, Subject};
use schooladm::cache::{CacheLayer, CacheStorage, MemoryStorage, SqliteStorage};
use schooladm::notify::{Notifier, RecordingNotifier};
use schooladm::services::Services;

fn services(server: &MockServer, storage: Arc<dyn CacheStorage>) -> Services {
  let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::new());
  Services::from_parts(common::api(server), CacheLayer::new(storage), notifier, 10)
}

fn memory_services(server: &MockServer) -> Services {
  services(server, Arc::new(MemoryStorage::new()))
}

async fn mount_student_page(server: &MockServer, page: &str, expected_calls: u64) {
  Mock::given(method("GET"))
    .and(path("/student"))
    .and(query_param("page", page))
    .respond_with(ResponseTemplate::new(200).set_body_json(common::list_body(
      "studentList",
      25,
      vec![common::student("st1", "Ann", "Lee")],
    )))
    .expect(expected_calls)
    .mount(server)
    .await;
}

fn new_student() -> Student {
  let record: Record<Student> =
    serde_json::from_value(common::student("", "Cam", "Nguyen")).unwrap();
  record.fields
}

#[tokio::test]
async fn test_fresh_list_is_served_from_cache() {
  let server = MockServer::start().await;
  mount_student_page(&server, "1", 1).await;

  let services = memory_services(&server);
  let req = PageRequest::new(1, 10);
  let first = services.students.list(&req, None).await.unwrap();
  let second = services.students.list(&req, None).await.unwrap();
  assert_eq!(first, second);
}

#[tokio::test]
async fn test_different_filters_are_cached_apart() {
  let server = MockServer::start().await;
  mount_student_page(&server, "1", 2).await;

  let services = memory_services(&server);
  let all = PageRequest::new(1, 10);
  let mut named: PageRequest<StudentFilter> = PageRequest::new(1, 10);
  named.filter.full_name = Some("Ann".to_string());

  services.students.list(&all, None).await.unwrap();
  services.students.list(&named, None).await.unwrap();
  services.students.list(&named, None).await.unwrap();
}

#[tokio::test]
async fn test_add_invalidates_cached_pages() {
  let server = MockServer::start().await;
  // Page 2 is fetched before and after the add; page 1 only by the prefetch
  mount_student_page(&server, "2", 2).await;
  mount_student_page(&server, "1", 1).await;
  Mock::given(method("POST"))
    .and(path("/student"))
    .respond_with(
      ResponseTemplate::new(200).set_body_json(common::data(common::student("st9", "Cam", "Nguyen"))),
    )
    .expect(1)
    .mount(&server)
    .await;

  let services = memory_services(&server);
  let page_two = PageRequest::new(2, 10);
  services.students.list(&page_two, None).await.unwrap();

  let created = services.students.add(&new_student()).await.unwrap();
  assert_eq!(created.id, "st9");

  services.students.list(&page_two, None).await.unwrap();
  // The prefetched first page is fresh
  services.students.list(&PageRequest::new(1, 10), None).await.unwrap();
}

#[tokio::test]
async fn test_failed_add_keeps_cache() {
  let server = MockServer::start().await;
  mount_student_page(&server, "1", 1).await;
  Mock::given(method("POST"))
    .and(path("/student"))
    .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "email is invalid"})))
    .mount(&server)
    .await;

  let services = memory_services(&server);
  let req = PageRequest::new(1, 10);
  services.students.list(&req, None).await.unwrap();
  assert!(services.students.add(&new_student()).await.is_none());
  services.students.list(&req, None).await.unwrap();
}

#[tokio::test]
async fn test_delete_invalidates_and_evicts() {
  let server = MockServer::start().await;
  mount_student_page(&server, "1", 2).await;
  Mock::given(method("GET"))
    .and(path("/student/st1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(common::data(common::student("st1", "Ann", "Lee"))))
    .up_to_n_times(1)
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/student/st1"))
    .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Student not found"})))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("DELETE"))
    .and(path("/student/st1"))
    .respond_with(ResponseTemplate::new(200))
    .expect(1)
    .mount(&server)
    .await;

  let services = memory_services(&server);
  let req = PageRequest::new(1, 10);
  services.students.list(&req, None).await.unwrap();
  services.students.get_one("st1").await.unwrap();

  services.students.delete("st1").await.unwrap();

  services.students.list(&req, None).await.unwrap();
  // Evicted, so the server is asked and now has nothing
  assert!(services.students.get_one("st1").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_list_in_flight_during_delete_is_not_cached() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/student"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(common::list_body(
          "studentList",
          1,
          vec![common::student("st1", "Ann", "Lee")],
        ))
        .set_delay(Duration::from_millis(300)),
    )
    .up_to_n_times(1)
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/student"))
    .respond_with(ResponseTemplate::new(200).set_body_json(common::list_body("studentList", 0, vec![])))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("DELETE"))
    .and(path("/student/st1"))
    .respond_with(ResponseTemplate::new(200))
    .expect(1)
    .mount(&server)
    .await;

  let services = memory_services(&server);
  let req = PageRequest::new(1, 10);
  let (before, deleted) = tokio::join!(services.students.list(&req, None), async {
    tokio::time::sleep(Duration::from_millis(50)).await;
    services.students.delete("st1").await
  });
  deleted.unwrap();
  assert_eq!(before.unwrap().items.len(), 1);

  let after = services.students.list(&req, None).await.unwrap();
  assert!(after.items.is_empty());
}

#[tokio::test]
async fn test_update_refreshes_cached_record() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/subject/sub1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(common::data(common::subject("sub1", "Chemistry"))))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("PUT"))
    .and(path("/subject"))
    .respond_with(ResponseTemplate::new(200).set_body_json(common::data(common::subject("sub1", "Organic Chemistry"))))
    .expect(1)
    .mount(&server)
    .await;
  // Prefetch of the first page after the write
  Mock::given(method("GET"))
    .and(path("/subject"))
    .respond_with(ResponseTemplate::new(200).set_body_json(common::list_body("subjectList", 0, vec![])))
    .mount(&server)
    .await;

  let services = memory_services(&server);
  let mut record: Record<Subject> = services.subjects.get_one("sub1").await.unwrap();
  record.fields.subject_name = "Organic Chemistry".to_string();
  services.subjects.update(&record).await.unwrap();

  let cached = services.subjects.get_one("sub1").await.unwrap();
  assert_eq!(cached.subject_name, "Organic Chemistry");
}

#[tokio::test]
async fn test_cancelled_list_stores_nothing() {
  let server = MockServer::start().await;
  mount_student_page(&server, "1", 1).await;

  let services = memory_services(&server);
  let req = PageRequest::new(1, 10);
  let token = CancellationToken::new();
  token.cancel();
  assert!(matches!(
    services.students.list(&req, Some(&token)).await,
    Err(ApiError::Cancelled)
  ));

  services.students.list(&req, None).await.unwrap();
  services.students.list(&req, None).await.unwrap();
}

#[tokio::test]
async fn test_refresh_bypasses_fresh_cache() {
  let server = MockServer::start().await;
  mount_student_page(&server, "1", 2).await;

  let services = memory_services(&server);
  let req = PageRequest::new(1, 10);
  services.students.list(&req, None).await.unwrap();
  services.students.refresh(&req, None).await.unwrap();
}

#[tokio::test]
async fn test_sqlite_cache_survives_restart() {
  let server = MockServer::start().await;
  mount_student_page(&server, "1", 1).await;

  let dir = tempfile::tempdir().unwrap();
  let db = dir.path().join("cache.db");
  let req = PageRequest::new(1, 10);

  {
    let storage = Arc::new(SqliteStorage::open(Some(&db)).unwrap());
    let first = services(&server, storage);
    first.students.list(&req, None).await.unwrap();
  }

  let storage = Arc::new(SqliteStorage::open(Some(&db)).unwrap());
  let second = services(&server, storage);
  let page = second.students.list(&req, None).await.unwrap();
  assert_eq!(page.count, 25);
  assert_eq!(page.items[0].first_name, "Ann");
}

#[tokio::test]
async fn test_reference_options_use_one_large_page() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/subject"))
    .and(query_param("page", "1"))
    .and(query_param("pageSize", "1000"))
    .and(query_param("subjectName", ""))
    .respond_with(ResponseTemplate::new(200).set_body_json(common::list_body(
      "subjectList",
      2,
      vec![common::subject("sub1", "Maths"), common::subject("sub2", "Physics")],
    )))
    .expect(1)
    .mount(&server)
    .await;

  let services = memory_services(&server);
  let options = services
    .reference_options(schooladm::api::ResourceKind::Subject)
    .await
    .unwrap();
  assert_eq!(
    options,
    vec![
      ("sub1".to_string(), "Maths".to_string()),
      ("sub2".to_string(), "Physics".to_string()),
    ]
  );
}
