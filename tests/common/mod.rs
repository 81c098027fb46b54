#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use schooladm::api::{ApiClient, ResourceClient, Resource};
use schooladm::notify::{Notifier, RecordingNotifier};

pub fn api(server: &wiremock::MockServer) -> ApiClient {
  ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

pub fn client<R: Resource>(server: &wiremock::MockServer) -> (ResourceClient<R>, Arc<RecordingNotifier>) {
  let notifier = Arc::new(RecordingNotifier::new());
  let client = ResourceClient::new(api(server), notifier.clone() as Arc<dyn Notifier>);
  (client, notifier)
}

pub fn student(id: &str, first: &str, last: &str) -> Value {
  json!({
    "id": id,
    "firstName": first,
    "lastName": last,
    "gender": "female",
    "dateOfBirth": "2010-04-02",
    "address": "12 Elm Street",
    "email": "student@example.com",
    "phone": "0912345678",
    "schoolId": "sch1",
    "level": 2,
    "enrollmentStatus": "active"
  })
}

pub fn teacher(id: &str, first: &str, last: &str) -> Value {
  json!({
    "id": id,
    "firstName": first,
    "lastName": last,
    "gender": "female",
    "dateOfBirth": "1985-12-10",
    "address": "1 Analytical Way",
    "email": "teacher@example.com",
    "phone": "0987654321",
    "schoolId": "sch1",
    "yearStartTeaching": 2012,
    "teachingStatus": "active"
  })
}

pub fn subject(id: &str, name: &str) -> Value {
  json!({
    "id": id,
    "subjectName": name,
    "level": 3,
    "creditHour": 4
  })
}

/// `{ "data": { "count": n, "<field>": items } }`
pub fn list_body(field: &str, count: u64, items: Vec<Value>) -> Value {
  json!({ "data": { "count": count, field: items } })
}

pub fn data(value: Value) -> Value {
  json!({ "data": value })
}
