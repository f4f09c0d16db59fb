//! Integration tests for the celsched-server HTTP API
//!
//! Each test builds the full router over an in-memory database and drives it
//! with `oneshot`. Spreadsheets are generated in-test with rust_xlsxwriter.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use celsched_common::db::init_memory_database;
use celsched_common::models::Volunteer;
use celsched_common::Store;
use celsched_server::api::auth::{ACCESS_LEVEL_ADMIN, ACCESS_LEVEL_VOLUNTEER};
use celsched_server::api::{Claims, JwtKeys};
use celsched_server::import::{
    DepartmentPreview, ImportSession, InMemorySessionStore, SessionStore,
};
use celsched_server::{build_router, AppState};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use rust_xlsxwriter::Workbook;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

const BOUNDARY: &str = "celsched-test-boundary";

struct TestApp {
    router: Router,
    store: Store,
    sessions: Arc<InMemorySessionStore>,
    admin_token: String,
    jwt: JwtKeys,
}

impl TestApp {
    async fn new() -> Self {
        let pool = init_memory_database()
            .await
            .expect("Failed to create in-memory database");
        let store = Store::sqlite(pool);
        let sessions = Arc::new(InMemorySessionStore::new());
        let jwt = JwtKeys::from_secret("integration-secret");
        let admin_token = jwt
            .issue(&Claims::new("admin-1", "admin", ACCESS_LEVEL_ADMIN, 3600))
            .unwrap();

        let state = AppState::new(store.clone(), sessions.clone(), jwt.clone());
        Self {
            router: build_router(state),
            store,
            sessions,
            admin_token,
            jwt,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn admin_json(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.admin_token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn admin_get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.admin_token))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn upload(&self, file_name: &str, bytes: &[u8]) -> (StatusCode, Value) {
        self.send(multipart_request(&self.admin_token, "file", file_name, bytes))
            .await
    }

    async fn execute(&self, body: Value) -> (StatusCode, Value) {
        self.admin_json("POST", "/api/batch-import/execute", body)
            .await
    }

    async fn seed_volunteer(&self, name: &str) -> Volunteer {
        let volunteer = Volunteer::new(name);
        self.store
            .volunteers
            .create_volunteer(&volunteer)
            .await
            .unwrap();
        volunteer
    }
}

/// Workbook whose first sheet holds one department per column
fn workbook(columns: &[&[&str]]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, cells) in columns.iter().enumerate() {
        for (row, value) in cells.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(row as u32, col as u16, *value).unwrap();
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

fn multipart_request(token: &str, field: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/vnd.openxmlformats-officedocument.spreadsheetml.sheet\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/batch-import/preview")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

// ========================================
// Health and auth
// ========================================

#[tokio::test]
async fn test_ping_and_health() {
    let app = TestApp::new().await;

    let (status, json) = app.get("/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "message": "pong" }));

    let (status, json) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "celsched-server");
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .uri("/api/logs")
        .body(Body::empty())
        .unwrap();
    let (status, json) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Authorization header required");

    let request = Request::builder()
        .uri("/api/logs")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/logs")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let (status, json) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Invalid or expired token");
}

#[tokio::test]
async fn test_non_admin_is_forbidden() {
    let app = TestApp::new().await;
    let token = app
        .jwt
        .issue(&Claims::new("v-1", "vol", ACCESS_LEVEL_VOLUNTEER, 3600))
        .unwrap();

    let bytes = workbook(&[&["Ushers", "Ana"]]);
    let (status, json) = app
        .send(multipart_request(&token, "file", "roster.xlsx", &bytes))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "Admin access required");
    assert_eq!(app.sessions.len().await, 0);
}

// ========================================
// Preview
// ========================================

#[tokio::test]
async fn test_preview_without_file_field() {
    let app = TestApp::new().await;
    let bytes = workbook(&[&["Ushers", "Ana"]]);

    let (status, json) = app
        .send(multipart_request(&app.admin_token, "document", "roster.xlsx", &bytes))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No file uploaded");
}

#[tokio::test]
async fn test_preview_rejects_other_extensions() {
    let app = TestApp::new().await;

    let (status, json) = app.upload("roster.csv", b"Ushers\nAna\n").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["error"],
        "Invalid file format. Please upload an Excel file (.xlsx or .xls)"
    );
}

#[tokio::test]
async fn test_preview_rejects_corrupt_workbook() {
    let app = TestApp::new().await;

    let (status, json) = app.upload("roster.xlsx", b"definitely not a zip").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to parse Excel file"));
}

#[tokio::test]
async fn test_preview_validation_errors_return_ok_without_session() {
    let app = TestApp::new().await;
    let bytes = workbook(&[&["Ushers", "", "Ben"], &["Choir", "Cy", "Dee", "dee"]]);

    let (status, json) = app.upload("roster.xlsx", &bytes).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.get("sessionId").is_none());
    assert_eq!(json["totalDepartments"], 0);

    let errors = json["validationErrors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["errorType"], "EMPTY_HEAD");
    assert_eq!(errors[0]["message"], "Department head is empty for 'Ushers'");
    assert_eq!(errors[1]["errorType"], "DUPLICATE_IN_COLUMN");
    assert_eq!(errors[1]["rowIndex"], 3);
    assert_eq!(app.sessions.len().await, 0);
}

#[tokio::test]
async fn test_preview_head_only_department() {
    let app = TestApp::new().await;
    let bytes = workbook(&[&["Parking", "Gil"]]);

    let (status, json) = app.upload("roster.xlsx", &bytes).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalDepartments"], 1);
    assert_eq!(json["totalVolunteers"], 1);
    assert_eq!(json["departments"][0]["headName"], "Gil");
    assert_eq!(json["departments"][0]["members"], json!([]));
    assert!(json["conflicts"].as_array().unwrap().is_empty());
    assert!(json["sessionId"].is_string());
}

#[tokio::test]
async fn test_preview_reports_conflicts() {
    let app = TestApp::new().await;
    let existing = app.seed_volunteer("Ana Cruz").await;
    let bytes = workbook(&[
        &["Ushers", "ana cruz", "Ben Ong"],
        &["Choir", "Dana", "ben ong"],
    ]);

    let (status, json) = app.upload("roster.xlsx", &bytes).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalVolunteers"], 3);

    let conflicts = json["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 2);

    assert_eq!(conflicts[0]["volunteerName"], "ana cruz");
    assert_eq!(conflicts[0]["conflictType"], "EXISTING_IN_DB");
    assert_eq!(conflicts[0]["existingVolunteer"]["id"], existing.id);
    assert_eq!(conflicts[0]["existingVolunteer"]["currentDeptCount"], 0);
    assert_eq!(conflicts[0]["occurrences"][0]["isHead"], true);

    assert_eq!(conflicts[1]["volunteerName"], "Ben Ong");
    assert_eq!(conflicts[1]["conflictType"], "DUPLICATE_IN_IMPORT");
    assert_eq!(conflicts[1]["occurrences"].as_array().unwrap().len(), 2);
    assert!(conflicts[1].get("existingVolunteer").is_none());
}

// ========================================
// Execute
// ========================================

#[tokio::test]
async fn test_preview_then_execute_with_resolutions() {
    let app = TestApp::new().await;
    let ana = app.seed_volunteer("Ana Cruz").await;
    let bytes = workbook(&[
        &["Ushers", "Ana Cruz", "Ben Ong", "Cy Dee"],
        &["Choir", "Ben Ong", "Dana Fox"],
    ]);

    let (_, preview) = app.upload("roster.xlsx", &bytes).await;
    let session_id = preview["sessionId"].as_str().unwrap().to_string();

    let (status, json) = app
        .execute(json!({
            "sessionId": session_id,
            "resolutions": [
                { "volunteerName": "Ana Cruz", "decision": "REUSE_EXISTING", "volunteerId": ana.id },
                { "volunteerName": "Ben Ong", "decision": "CREATE_MULTIPLE" }
            ]
        }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["departmentsCreated"], 2);
    assert_eq!(json["volunteersCreated"], 4);
    assert_eq!(json["volunteersReused"], 1);

    let (_, volunteers) = app.get("/api/volunteers").await;
    let mut names: Vec<&str> = volunteers
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap())
        .collect();
    names.sort_unstable();
    assert_eq!(
        names,
        ["Ana Cruz", "Ben Ong (Choir)", "Ben Ong (Ushers)", "Cy Dee", "Dana Fox"]
    );

    let (_, departments) = app.get("/api/departments").await;
    let departments = departments.as_array().unwrap();
    assert_eq!(departments.len(), 2);
    let ushers = departments
        .iter()
        .find(|d| d["departmentName"] == "Ushers")
        .unwrap();
    let members = ushers["volunteerMembers"].as_array().unwrap();
    assert_eq!(members.len(), 3);
    assert_eq!(members[0]["volunteerID"], ana.id);
    assert_eq!(members[0]["membershipType"], "HEAD");
    assert_eq!(members[1]["membershipType"], "MEMBER");

    let (_, logs) = app
        .admin_get("/api/logs?category=batch_operations")
        .await;
    let types: Vec<&str> = logs["logs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, ["BATCH_IMPORT_COMPLETED", "BATCH_IMPORT_STARTED"]);
}

#[tokio::test]
async fn test_execute_twice_rejects_second_call() {
    let app = TestApp::new().await;
    let bytes = workbook(&[&["Parking", "Gil", "Hal"]]);

    let (_, preview) = app.upload("roster.xlsx", &bytes).await;
    let body = json!({ "sessionId": preview["sessionId"], "resolutions": [] });

    let (status, json) = app.execute(body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["volunteersCreated"], 2);

    let (status, json) = app.execute(body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid or expired session");

    let (_, departments) = app.get("/api/departments").await;
    assert_eq!(departments.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_execute_unknown_and_expired_sessions() {
    let app = TestApp::new().await;

    let (status, json) = app
        .execute(json!({ "sessionId": uuid::Uuid::new_v4(), "resolutions": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid or expired session");

    let mut session = ImportSession::new(vec![DepartmentPreview::new(
        "Parking",
        "Gil",
        vec!["Hal".into()],
        0,
    )]);
    session.expires_at = Utc::now() - Duration::minutes(1);
    let id = session.id;
    app.sessions.put(session).await;

    let (status, json) = app
        .execute(json!({ "sessionId": id, "resolutions": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid or expired session");

    // the stale preview was not imported
    let (_, volunteers) = app.get("/api/volunteers").await;
    assert!(volunteers.as_array().unwrap().is_empty());
    let (_, departments) = app.get("/api/departments").await;
    assert!(departments.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_execute_reuse_without_id_keeps_session() {
    let app = TestApp::new().await;
    app.seed_volunteer("Gil").await;
    let bytes = workbook(&[&["Parking", "Gil"]]);

    let (_, preview) = app.upload("roster.xlsx", &bytes).await;
    let session_id = preview["sessionId"].clone();

    let (status, _) = app
        .execute(json!({
            "sessionId": session_id,
            "resolutions": [{ "volunteerName": "Gil", "decision": "REUSE_EXISTING" }]
        }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // nothing was written and the preview can still be executed
    let (_, departments) = app.get("/api/departments").await;
    assert!(departments.as_array().unwrap().is_empty());

    let (status, json) = app
        .execute(json!({ "sessionId": session_id, "resolutions": [] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["volunteersCreated"], 1);
}

#[tokio::test]
async fn test_execute_malformed_body() {
    let app = TestApp::new().await;

    let (status, json) = app
        .execute(json!({ "sessionId": "not-a-uuid", "resolutions": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (status, _) = app.execute(json!({ "resolutions": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ========================================
// Volunteers, departments, logs
// ========================================

#[tokio::test]
async fn test_volunteer_lifecycle() {
    let app = TestApp::new().await;

    let (status, created) = app
        .admin_json("POST", "/api/volunteers", json!({ "name": "  Ivy Lim " }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Ivy Lim");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .admin_json("POST", "/api/volunteers", json!({ "name": "I" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .admin_json(
            "PUT",
            &format!("/api/volunteers/{}", id),
            json!({ "name": "Ivy Tan" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Ivy Tan");

    let (status, _) = app
        .admin_json("DELETE", &format!("/api/volunteers/{}", id), Value::Null)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app
        .admin_json("DELETE", &format!("/api/volunteers/{}", id), Value::Null)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Volunteer is already deleted");

    let (status, fetched) = app.get(&format!("/api/volunteers/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["isDisabled"], true);

    let (status, _) = app.get("/api/volunteers/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_department_checks_volunteers() {
    let app = TestApp::new().await;
    let head = app.seed_volunteer("Jo Park").await;
    let member = app.seed_volunteer("Kai Ng").await;

    let (status, _) = app
        .admin_json(
            "POST",
            "/api/departments",
            json!({ "departmentName": "Media", "initialHeadId": "nobody" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, department) = app
        .admin_json(
            "POST",
            "/api/departments",
            json!({
                "departmentName": "Media",
                "initialHeadId": head.id,
                "volunteerMembers": [member.id, member.id, head.id]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let members = department["volunteerMembers"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0]["membershipType"], "HEAD");

    let id = department["id"].as_str().unwrap();
    let (status, _) = app
        .admin_json("DELETE", &format!("/api/departments/{}", id), Value::Null)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, fetched) = app.get(&format!("/api/departments/{}", id)).await;
    assert_eq!(fetched["isDisabled"], true);
}

#[tokio::test]
async fn test_logs_filter_and_reject_unknown_values() {
    let app = TestApp::new().await;
    app.admin_json("POST", "/api/volunteers", json!({ "name": "Lee Wu" }))
        .await;

    let (status, json) = app.admin_get("/api/logs?logType=VOLUNTEER_CREATED").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
    assert_eq!(json["logs"][0]["metadata"]["volunteerName"], "Lee Wu");
    assert_eq!(json["logs"][0]["metadata"]["username"], "admin");

    let (_, json) = app.admin_get("/api/logs?category=batch_operations").await;
    assert_eq!(json["total"], 0);

    let (status, _) = app.admin_get("/api/logs?severity=LOUD").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_department_members_and_entity_logs() {
    let app = TestApp::new().await;
    let head = app.seed_volunteer("Mia Sol").await;
    let member = app.seed_volunteer("Noa Ruiz").await;

    let (_, department) = app
        .admin_json(
            "POST",
            "/api/departments",
            json!({ "departmentName": "Media", "initialHeadId": head.id }),
        )
        .await;
    let id = department["id"].as_str().unwrap().to_string();

    let (status, renamed) = app
        .admin_json(
            "PUT",
            &format!("/api/departments/{}", id),
            json!({ "departmentName": "Media Team" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["departmentName"], "Media Team");

    let members_uri = format!("/api/departments/{}/members", id);
    let (status, json) = app
        .admin_json("POST", &members_uri, json!({ "volunteerId": member.id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Member added successfully");

    let (status, _) = app
        .admin_json("POST", &members_uri, json!({ "volunteerId": member.id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // the only head cannot be demoted or removed
    let head_uri = format!("/api/departments/{}/members/{}", id, head.id);
    let (status, json) = app
        .admin_json("PUT", &head_uri, json!({ "membershipType": "MEMBER" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Department must keep at least one head");
    let (status, _) = app.admin_json("DELETE", &head_uri, Value::Null).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let member_uri = format!("/api/departments/{}/members/{}", id, member.id);
    let (status, _) = app
        .admin_json("PUT", &member_uri, json!({ "membershipType": "HEAD" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, json) = app.admin_json("DELETE", &head_uri, Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Member removed successfully");

    let (status, _) = app.admin_json("DELETE", &head_uri, Value::Null).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, fetched) = app.get(&format!("/api/departments/{}", id)).await;
    let members = fetched["volunteerMembers"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["volunteerID"], member.id);
    assert_eq!(members[0]["membershipType"], "HEAD");

    let (status, logs) = app
        .admin_get(&format!("/api/departments/{}/logs", id))
        .await;
    assert_eq!(status, StatusCode::OK);
    let types: Vec<&str> = logs["logs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["type"].as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        [
            "DEPARTMENT_MEMBER_REMOVED",
            "DEPARTMENT_MEMBER_UPDATED",
            "DEPARTMENT_MEMBER_ADDED",
            "DEPARTMENT_UPDATED",
            "DEPARTMENT_CREATED"
        ]
    );
    assert_eq!(logs["total"], 5);
    assert_eq!(logs["logs"][3]["metadata"]["oldDepartmentName"], "Media");
    assert_eq!(logs["logs"][3]["metadata"]["newDepartmentName"], "Media Team");

    let (_, logs) = app
        .admin_get(&format!("/api/volunteers/{}/logs?limit=1", member.id))
        .await;
    assert_eq!(logs["total"], 2);
    assert_eq!(logs["logs"].as_array().unwrap().len(), 1);
    assert_eq!(logs["logs"][0]["type"], "DEPARTMENT_MEMBER_UPDATED");
}
