mod common;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use schooladm::api::{
  ApiError, ListFilter, PageRequest, Record, School, Student, StudentFilter, Subject,
  SubjectClass, Teacher,
};
use schooladm::notify::NoticeLevel;

#[tokio::test]
async fn test_list_sends_paging_and_empty_filter() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/student"))
    .and(query_param("page", "1"))
    .and(query_param("pageSize", "10"))
    .and(query_param("fullName", ""))
    .respond_with(ResponseTemplate::new(200).set_body_json(common::list_body(
      "studentList",
      12,
      vec![
        common::student("st1", "Ann", "Lee"),
        common::student("st2", "Bao", "Tran"),
      ],
    )))
    .expect(1)
    .mount(&server)
    .await;

  let (client, _) = common::client::<Student>(&server);
  let page = client.list(&PageRequest::new(1, 10), None).await.unwrap();

  assert_eq!(page.count, 12);
  assert_eq!(page.items.len(), 2);
  assert_eq!(page.items[0].id, "st1");
  assert_eq!(page.items[1].first_name, "Bao");
  assert_eq!(page.total_pages(10), 2);
}

#[tokio::test]
async fn test_list_sends_filter_value() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/student"))
    .and(query_param("fullName", "Ann Lee"))
    .respond_with(ResponseTemplate::new(200).set_body_json(common::list_body(
      "studentList",
      1,
      vec![common::student("st1", "Ann", "Lee")],
    )))
    .expect(1)
    .mount(&server)
    .await;

  let (client, _) = common::client::<Student>(&server);
  let filter = StudentFilter::parse_search("Ann Lee").unwrap();
  let req = PageRequest::new(1, 10).with_filter(filter);
  let page = client.list(&req, None).await.unwrap();
  assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn test_list_without_array_is_empty_page() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/school"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"count": 0}})))
    .mount(&server)
    .await;

  let (client, _) = common::client::<School>(&server);
  let page = client.list(&PageRequest::new(1, 10), None).await.unwrap();
  assert_eq!(page.count, 0);
  assert!(page.items.is_empty());
}

#[tokio::test]
async fn test_get_one_missing_is_not_found() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/teacher/nope"))
    .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Teacher not found"})))
    .mount(&server)
    .await;

  let (client, notifier) = common::client::<Teacher>(&server);
  let err = client.get_one("nope").await.unwrap_err();
  assert!(err.is_not_found(), "unexpected {:?}", err);
  assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn test_add_rejected_returns_none_and_notifies() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/teacher"))
    .respond_with(
      ResponseTemplate::new(400).set_body_json(json!({"message": "firstName is required"})),
    )
    .expect(1)
    .mount(&server)
    .await;

  let (client, notifier) = common::client::<Teacher>(&server);
  let draft: Record<Teacher> = serde_json::from_value(common::teacher("", "", "Lovelace")).unwrap();

  assert!(client.add(&draft.fields).await.is_none());
  assert_eq!(notifier.errors(), vec!["firstName is required".to_string()]);
}

#[tokio::test]
async fn test_add_returns_created_record() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/subject"))
    .and(body_partial_json(json!({"subjectName": "Physics", "level": 3})))
    .respond_with(
      ResponseTemplate::new(200).set_body_json(common::data(common::subject("sub9", "Physics"))),
    )
    .expect(1)
    .mount(&server)
    .await;

  let (client, notifier) = common::client::<Subject>(&server);
  let draft: Record<Subject> = serde_json::from_value(common::subject("", "Physics")).unwrap();
  let created = client.add(&draft.fields).await.unwrap();

  assert_eq!(created.id, "sub9");
  assert_eq!(created.fields, draft.fields);
  let notices = notifier.notices();
  assert_eq!(notices.len(), 1);
  assert_eq!(notices[0].level, NoticeLevel::Success);
  assert_eq!(notices[0].message, "Added subject Physics");
}

#[tokio::test]
async fn test_update_puts_id_in_body() {
  let server = MockServer::start().await;
  Mock::given(method("PUT"))
    .and(path("/subject"))
    .and(body_partial_json(json!({"id": "sub1", "subjectName": "Chemistry"})))
    .respond_with(
      ResponseTemplate::new(200).set_body_json(common::data(common::subject("sub1", "Chemistry"))),
    )
    .expect(1)
    .mount(&server)
    .await;

  let (client, _) = common::client::<Subject>(&server);
  let record: Record<Subject> = serde_json::from_value(common::subject("sub1", "Chemistry")).unwrap();
  let updated = client.update(&record).await.unwrap();
  assert_eq!(updated.subject_name, "Chemistry");
}

#[tokio::test]
async fn test_update_failure_keeps_caller_data() {
  let server = MockServer::start().await;
  Mock::given(method("PUT"))
    .and(path("/subject"))
    .respond_with(ResponseTemplate::new(422).set_body_json(json!({"message": "creditHour must be positive"})))
    .mount(&server)
    .await;

  let (client, notifier) = common::client::<Subject>(&server);
  let record: Record<Subject> = serde_json::from_value(common::subject("sub1", "Chemistry")).unwrap();
  assert!(client.update(&record).await.is_none());
  assert!(matches!(
    client.try_update(&record).await,
    Err(ApiError::Validation(message)) if message == "creditHour must be positive"
  ));
  assert_eq!(notifier.errors().len(), 1);
}

#[tokio::test]
async fn test_references_decode_both_shapes_and_write_as_ids() {
  let server = MockServer::start().await;
  let class = json!({
    "id": "c1",
    "teacherId": common::teacher("t1", "Ada", "Lovelace"),
    "subjectId": "sub1",
    "maxQuantity": 30,
    "minQuantity": 5,
    "startAt": "2024-09-01T00:00:00Z",
    "endAt": "2025-01-15T00:00:00Z",
    "classRoom": "B12",
    "academicYear": 2024,
    "classStatus": "active"
  });
  Mock::given(method("GET"))
    .and(path("/subjectclass"))
    .respond_with(ResponseTemplate::new(200).set_body_json(common::list_body(
      "listSubjectClass",
      1,
      vec![class.clone()],
    )))
    .mount(&server)
    .await;
  Mock::given(method("PUT"))
    .and(path("/subjectclass"))
    .and(body_partial_json(json!({"id": "c1", "teacherId": "t1", "subjectId": "sub1"})))
    .respond_with(ResponseTemplate::new(200).set_body_json(common::data(class)))
    .expect(1)
    .mount(&server)
    .await;

  let (client, _) = common::client::<SubjectClass>(&server);
  let page = client.list(&PageRequest::new(1, 10), None).await.unwrap();
  let record = &page.items[0];

  assert_eq!(record.teacher_id.id(), "t1");
  assert_eq!(record.teacher_id.label(), "Ada Lovelace");
  assert!(record.subject_id.expanded().is_none());
  assert_eq!(record.subject_id.id(), "sub1");

  client.try_update(record).await.unwrap();
}

#[tokio::test]
async fn test_delete_failure_propagates() {
  let server = MockServer::start().await;
  Mock::given(method("DELETE"))
    .and(path("/school/sch1"))
    .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "School has students"})))
    .mount(&server)
    .await;

  let (client, notifier) = common::client::<School>(&server);
  match client.delete("sch1").await {
    Err(ApiError::Server { status, message }) => {
      assert_eq!(status, 500);
      assert_eq!(message, "School has students");
    }
    other => panic!("unexpected {:?}", other),
  }
  // Delete leaves reporting to the caller
  assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn test_delete_ignores_body() {
  let server = MockServer::start().await;
  Mock::given(method("DELETE"))
    .and(path("/student/st1"))
    .respond_with(ResponseTemplate::new(200).set_body_string("deleted"))
    .expect(1)
    .mount(&server)
    .await;

  let (client, _) = common::client::<Student>(&server);
  client.delete("st1").await.unwrap();
}

#[tokio::test]
async fn test_cancelled_list_is_cancelled() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/student"))
    .respond_with(ResponseTemplate::new(200).set_body_json(common::list_body("studentList", 0, vec![])))
    .mount(&server)
    .await;

  let (client, _) = common::client::<Student>(&server);
  let token = CancellationToken::new();
  token.cancel();
  let result = client.list(&PageRequest::new(1, 10), Some(&token)).await;
  assert!(matches!(result, Err(ApiError::Cancelled)));
}
