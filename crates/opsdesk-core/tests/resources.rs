//! Request shapes of the resource calls against a mock backend.

use std::sync::Arc;

use opsdesk_core::api::{ApiClient, ApiError};
use opsdesk_core::auth::{MemoryTokenStore, Session, SessionEvent};
use opsdesk_core::models::{
    AgentKind, AgentOverride, EmployeeFilter, HistoryQuery, NewUser, ReportRequest, ReportType,
    Role, TaskFilter, TaskStatus, TaskUpdate,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> ApiClient {
    let session = Arc::new(Session::new(Arc::new(MemoryTokenStore::with_token("t1"))));
    ApiClient::new(server.uri(), session).unwrap()
}

fn employee_json() -> serde_json::Value {
    json!({
        "id": 4,
        "email": "grace@example.com",
        "username": "grace",
        "full_name": "Grace Hopper",
        "department": "Engineering",
        "role": "manager",
        "is_active": true,
        "created_at": "2024-01-02T08:00:00"
    })
}

#[tokio::test]
async fn login_posts_form_and_stores_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("username=ada"))
        .and(body_string_contains("password=s3cret"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "fresh", "token_type": "bearer"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = Arc::new(Session::in_memory());
    let mut rx = session.subscribe();
    let client = ApiClient::new(server.uri(), session.clone()).unwrap();

    let token = client.login(" ada ", "s3cret").await.unwrap();

    assert_eq!(token.access_token, "fresh");
    assert_eq!(session.token().unwrap().as_deref(), Some("fresh"));
    assert_eq!(rx.try_recv().unwrap(), SessionEvent::SignedIn);

    client.logout().unwrap();
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn register_sends_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .and(body_json(json!({
            "email": "ada@example.com",
            "username": "ada",
            "full_name": "Ada Lovelace",
            "password": "Engine42!"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 12, "email": "ada@example.com", "username": "ada",
            "full_name": "Ada Lovelace", "role": "employee", "is_active": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri(), Arc::new(Session::in_memory())).unwrap();
    let user = client
        .register(&NewUser {
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
            full_name: "Ada Lovelace".to_string(),
            password: "Engine42!".to_string(),
            department: None,
        })
        .await
        .unwrap();

    assert_eq!(user.id, 12);
    assert_eq!(user.role, Role::Employee);
}

#[tokio::test]
async fn employee_list_passes_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/employees"))
        .and(query_param("department", "Engineering"))
        .and(query_param("role", "manager"))
        .and(query_param("active_only", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([employee_json()])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let employees = client
        .list_employees(&EmployeeFilter {
            department: Some("Engineering".to_string()),
            role: Some(Role::Manager),
            active_only: Some(false),
        })
        .await
        .unwrap();

    assert_eq!(employees[0].full_name, "Grace Hopper");
    assert!(employees[0].role.is_manager());
}

#[tokio::test]
async fn attendance_with_date_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/employees/4/attendance"))
        .and(query_param("start_date", "2024-03-01"))
        .and(query_param("end_date", "2024-03-07"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "clock_in": "2024-03-01T09:00:00", "clock_out": "2024-03-01T17:00:00",
             "total_hours": 8.0, "status": "clocked_out", "location": null, "notes": null}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let records = client
        .employee_attendance(4, Some("2024-03-01"), Some("2024-03-07"))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].hours(), Some(8.0));

    let invalid = client
        .employee_attendance(4, Some("2024-03-07"), Some("2024-03-01"))
        .await
        .unwrap_err();
    assert!(matches!(invalid, ApiError::InvalidRequest(_)));
}

#[tokio::test]
async fn task_list_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .and(query_param("status", "in_progress"))
        .and(query_param("assignee_id", "4"))
        .and(query_param("limit", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let tasks = client
        .list_tasks(&TaskFilter {
            status: Some(TaskStatus::InProgress),
            assignee_id: Some(4),
            limit: Some(25),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn task_update_assign_and_comment() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/tasks/3"))
        .and(body_json(json!({"status": "completed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 3, "title": "Restock", "status": "completed", "priority": "low",
            "created_by_id": 1, "created_at": "2024-03-01T09:00:00",
            "updated_at": "2024-03-02T09:00:00", "completed_at": "2024-03-02T09:00:00"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tasks/3/assign"))
        .and(query_param("assignee_id", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Task assigned successfully", "task_id": 3
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tasks/3/comments"))
        .and(body_json(json!({"comment": "Done before lunch"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Comment added successfully", "comment_id": 8
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;

    let task = client
        .update_task(
            3,
            &TaskUpdate {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Completed);

    let assigned = client.assign_task(3, 4).await.unwrap();
    assert_eq!(assigned.task_id, Some(3));

    let commented = client.comment_on_task(3, "  Done before lunch ").await.unwrap();
    assert_eq!(commented.comment_id, Some(8));

    let empty = client.comment_on_task(3, "   ").await.unwrap_err();
    assert!(matches!(empty, ApiError::InvalidRequest(_)));
    let nothing = client.update_task(3, &TaskUpdate::default()).await.unwrap_err();
    assert!(matches!(nothing, ApiError::InvalidRequest(_)));
}

#[tokio::test]
async fn chat_wraps_query_in_agent_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/agents/execute"))
        .and(body_json(json!({
            "agent_type": "clock",
            "action": "process_natural_language",
            "parameters": {"query": "Clock me in"},
            "context": {}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true, "output": "Clocked in at 09:02", "error": null,
            "agent": "clock", "execution_time_ms": 420, "action_id": 31
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let response = client.chat(AgentKind::Clock, " Clock me in ").await.unwrap();

    assert_eq!(response.reply(), "Clocked in at 09:02");
    assert_eq!(response.action_id, Some(31));
}

#[tokio::test]
async fn agent_history_and_override() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/agents/actions/history"))
        .and(query_param("agent_type", "task"))
        .and(query_param("success_only", "true"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1, "limit": 10, "offset": 0,
            "actions": [{
                "id": 31, "agent_name": "task", "action_type": "execute", "success": true,
                "error_message": null, "execution_time_ms": 200,
                "timestamp": "2024-03-01T09:02:00", "user_id": 4, "overridden": false
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/agents/actions/31/override"))
        .and(body_json(json!({
            "reason": "Wrong assignee",
            "corrective_action": {"assignee_id": 5}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Action overridden successfully", "action_id": 31
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let history = client
        .agent_history(&HistoryQuery {
            limit: Some(10),
            agent_type: Some(AgentKind::Task),
            success_only: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(!history.has_more());

    let mut corrective_action = serde_json::Map::new();
    corrective_action.insert("assignee_id".to_string(), json!(5));
    let result = client
        .override_agent_action(
            31,
            &AgentOverride {
                reason: "Wrong assignee".to_string(),
                corrective_action,
            },
        )
        .await
        .unwrap();
    assert_eq!(result.action_id, Some(31));
}

#[tokio::test]
async fn report_generation_and_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/reports/generate"))
        .and(body_json(json!({
            "report_type": "attendance",
            "start_date": "2024-03-01",
            "end_date": "2024-03-31",
            "filters": {}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Report generated successfully",
            "report_id": 2,
            "content": "All present"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/reports/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Report not found"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let generated = client
        .generate_report(&ReportRequest::new(ReportType::Attendance, "2024-03-01", "2024-03-31"))
        .await
        .unwrap();
    assert_eq!(generated.report_id, Some(2));

    let missing = client.get_report(99).await.unwrap_err();
    assert!(matches!(missing, ApiError::NotFound(ref d) if d == "Report not found"));
}

#[tokio::test]
async fn malformed_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.get_task(1).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}
