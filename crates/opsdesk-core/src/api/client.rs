//! API client for communicating with the operations backend.
//!
//! `ApiClient` attaches the session's bearer token to every request and
//! recovers once from an expired token: on a 401 it calls the refresh
//! endpoint, stores the new token and re-issues the same request.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{InvalidationReason, Session};
use crate::config::Config;
use crate::models::{
    ActionMessage, AgentActionDetail, AgentCatalog, AgentHistory, AgentKind, AgentOverride,
    AgentRequest, AgentResponse, AttendanceRecord, Employee, EmployeeFilter, EmployeeUpdate,
    GeneratedReport, HistoryQuery, NewTask, NewUser, Report, ReportQuery, ReportRequest, Task,
    TaskFilter, TaskUpdate, TokenResponse, User,
};
use crate::utils::{parse_date, validate_date_range};

use super::endpoints;
use super::request::{ApiRequest, Attempt, Body};
use super::ApiError;

/// HTTP request timeout in seconds when none is configured
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// API client for the operations backend.
/// Clone is cheap - reqwest::Client and the session are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    /// Create a new API client for `base_url` using `session` for credentials
    pub fn new(base_url: impl Into<String>, session: Arc<Session>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, session, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        session: Arc<Session>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    /// Client for the configured backend address and timeout
    pub fn from_config(config: &Config, session: Arc<Session>) -> Result<Self, ApiError> {
        Self::with_timeout(config.api_base_url(), session, config.request_timeout())
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn current_token(&self) -> Result<Option<String>, ApiError> {
        self.session.token().map_err(ApiError::Storage)
    }

    // ===== Dispatch =====

    /// Send a request with the stored bearer token.
    ///
    /// A 401 on the first attempt triggers at most one refresh followed by
    /// one re-issue of the same request. Every other failure is returned
    /// unchanged.
    pub async fn send(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        let mut attempt = Attempt::first(request);
        loop {
            let unauthorized = match self.execute(&attempt).await {
                Err(err) if err.is_unauthorized() && !attempt.is_retry() => err,
                result => return result,
            };
            self.recover_session(request, unauthorized).await?;
            attempt = attempt.retry();
        }
    }

    /// Build and send one attempt, attaching the token stored right now
    async fn execute(&self, attempt: &Attempt<'_>) -> Result<Response, ApiError> {
        let request = attempt.request();

        let mut builder = self
            .client
            .request(request.method().clone(), self.url(request.path()))
            .header(header::ACCEPT, "application/json");

        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }

        builder = match request.body() {
            Body::Empty => builder.header(header::CONTENT_TYPE, "application/json"),
            Body::Json(value) => builder.json(value),
            Body::Form(fields) => builder.form(fields),
        };

        if let Some(token) = self.current_token()? {
            builder = builder.bearer_auth(token);
        }

        debug!(
            method = %request.method(),
            path = request.path(),
            retry = attempt.is_retry(),
            "Sending request"
        );

        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(%status, path = request.path(), error = %e, "Failed to read error body");
                String::new()
            }
        };
        debug!(%status, path = request.path(), "Request failed");
        Err(ApiError::from_status(status, &body))
    }

    /// Handle the first 401 of a request.
    /// Returns `Ok(())` once a fresh token is stored and the request may be re-issued.
    async fn recover_session(&self, request: &ApiRequest, unauthorized: ApiError) -> Result<(), ApiError> {
        if request.is_auth_endpoint() {
            self.invalidate(InvalidationReason::AuthEndpointRejected);
            return Err(unauthorized);
        }

        if self.current_token()?.is_none() {
            self.invalidate(InvalidationReason::NoCredential);
            return Err(unauthorized);
        }

        warn!(path = request.path(), "Access token rejected, refreshing");
        match self.refresh_token().await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                self.invalidate(InvalidationReason::RefreshFailed);
                Err(ApiError::RefreshFailed(Box::new(e)))
            }
        }
    }

    fn invalidate(&self, reason: InvalidationReason) {
        if let Err(e) = self.session.invalidate(reason) {
            warn!(error = %e, "Failed to clear stored token");
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e))
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.send(&request).await?;
        Self::decode(response, request.path()).await
    }

    // ===== Authentication =====

    /// Exchange username/password for a token and store it
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ApiError::InvalidRequest(
                "Username and password required".to_string(),
            ));
        }

        let request = ApiRequest::post(endpoints::AUTH_TOKEN)
            .form(&[("username", username.trim()), ("password", password)]);
        let token: TokenResponse = self.fetch(request).await?;

        self.session
            .sign_in(&token.access_token)
            .map_err(ApiError::Storage)?;
        Ok(token)
    }

    /// Exchange the current session for a new token and store it.
    /// Does not clear the session on failure; `send` does that.
    pub async fn refresh_token(&self) -> Result<TokenResponse, ApiError> {
        let request = ApiRequest::post(endpoints::AUTH_REFRESH);
        let response = self.execute(&Attempt::first(&request)).await?;
        let token: TokenResponse = Self::decode(response, request.path()).await?;

        if token.access_token.is_empty() {
            return Err(ApiError::InvalidResponse(
                "Refresh response did not contain a token".to_string(),
            ));
        }

        self.session
            .replace_token(&token.access_token)
            .map_err(ApiError::Storage)?;
        info!("Access token refreshed");
        Ok(token)
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.session.sign_out().map_err(ApiError::Storage)
    }

    pub async fn register(&self, user: &NewUser) -> Result<User, ApiError> {
        self.fetch(ApiRequest::post(endpoints::AUTH_REGISTER).json(user)?)
            .await
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.fetch(ApiRequest::get(endpoints::AUTH_ME)).await
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.fetch(ApiRequest::get(endpoints::HEALTH)).await
    }

    // ===== Employees =====

    pub async fn list_employees(&self, filter: &EmployeeFilter) -> Result<Vec<Employee>, ApiError> {
        let request = ApiRequest::get(endpoints::EMPLOYEES)
            .query_opt("department", filter.department.as_deref())
            .query_opt("role", filter.role.map(|r| r.as_str()))
            .query_opt("active_only", filter.active_only);
        self.fetch(request).await
    }

    pub async fn get_employee(&self, employee_id: i64) -> Result<Employee, ApiError> {
        self.fetch(ApiRequest::get(endpoints::employee(employee_id)))
            .await
    }

    pub async fn update_employee(
        &self,
        employee_id: i64,
        update: &EmployeeUpdate,
    ) -> Result<ActionMessage, ApiError> {
        if update.is_empty() {
            return Err(ApiError::InvalidRequest("Nothing to update".to_string()));
        }
        self.fetch(ApiRequest::put(endpoints::employee(employee_id)).json(update)?)
            .await
    }

    /// Attendance records, optionally bounded by `YYYY-MM-DD` dates
    pub async fn employee_attendance(
        &self,
        employee_id: i64,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<AttendanceRecord>, ApiError> {
        match (start_date, end_date) {
            (Some(start), Some(end)) => {
                validate_date_range(start, end)?;
            }
            (Some(date), None) | (None, Some(date)) => {
                parse_date(date)?;
            }
            (None, None) => {}
        }

        let request = ApiRequest::get(endpoints::employee_attendance(employee_id))
            .query_opt("start_date", start_date)
            .query_opt("end_date", end_date);
        self.fetch(request).await
    }

    // ===== Tasks =====

    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ApiError> {
        let request = ApiRequest::get(endpoints::TASKS)
            .query_opt("status", filter.status.map(|s| s.as_str()))
            .query_opt("priority", filter.priority.map(|p| p.as_str()))
            .query_opt("assignee_id", filter.assignee_id)
            .query_opt("created_by_id", filter.created_by_id)
            .query_opt("limit", filter.limit)
            .query_opt("offset", filter.offset);
        self.fetch(request).await
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        if task.title.trim().is_empty() {
            return Err(ApiError::InvalidRequest("Task title is required".to_string()));
        }
        self.fetch(ApiRequest::post(endpoints::TASKS).json(task)?)
            .await
    }

    pub async fn get_task(&self, task_id: i64) -> Result<Task, ApiError> {
        self.fetch(ApiRequest::get(endpoints::task(task_id))).await
    }

    pub async fn update_task(&self, task_id: i64, update: &TaskUpdate) -> Result<Task, ApiError> {
        if update.is_empty() {
            return Err(ApiError::InvalidRequest("Nothing to update".to_string()));
        }
        self.fetch(ApiRequest::put(endpoints::task(task_id)).json(update)?)
            .await
    }

    pub async fn assign_task(&self, task_id: i64, assignee_id: i64) -> Result<ActionMessage, ApiError> {
        let request = ApiRequest::post(endpoints::task_assign(task_id)).query("assignee_id", assignee_id);
        self.fetch(request).await
    }

    pub async fn comment_on_task(&self, task_id: i64, comment: &str) -> Result<ActionMessage, ApiError> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(ApiError::InvalidRequest("Comment cannot be empty".to_string()));
        }
        let body = serde_json::json!({ "comment": comment });
        self.fetch(ApiRequest::post(endpoints::task_comments(task_id)).json(&body)?)
            .await
    }

    // ===== Agents =====

    pub async fn execute_agent(&self, request: &AgentRequest) -> Result<AgentResponse, ApiError> {
        self.fetch(ApiRequest::post(endpoints::AGENTS_EXECUTE).json(request)?)
            .await
    }

    /// Send a free-text message to an agent
    pub async fn chat(&self, agent: AgentKind, query: &str) -> Result<AgentResponse, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::InvalidRequest("Message cannot be empty".to_string()));
        }
        self.execute_agent(&AgentRequest::chat(agent, query)).await
    }

    pub async fn agent_info(&self) -> Result<AgentCatalog, ApiError> {
        self.fetch(ApiRequest::get(endpoints::AGENTS_INFO)).await
    }

    pub async fn agent_history(&self, query: &HistoryQuery) -> Result<AgentHistory, ApiError> {
        let request = ApiRequest::get(endpoints::AGENTS_HISTORY)
            .query_opt("limit", query.limit)
            .query_opt("offset", query.offset)
            .query_opt("agent_type", query.agent_type.map(|a| a.as_str()))
            .query_opt("success_only", query.success_only.then_some(true));
        self.fetch(request).await
    }

    pub async fn agent_action(&self, action_id: i64) -> Result<AgentActionDetail, ApiError> {
        self.fetch(ApiRequest::get(endpoints::agent_action(action_id)))
            .await
    }

    pub async fn override_agent_action(
        &self,
        action_id: i64,
        override_data: &AgentOverride,
    ) -> Result<ActionMessage, ApiError> {
        if override_data.reason.trim().is_empty() {
            return Err(ApiError::InvalidRequest("Override reason is required".to_string()));
        }
        let request = ApiRequest::post(endpoints::agent_action_override(action_id)).json(override_data)?;
        self.fetch(request).await
    }

    // ===== Reports =====

    pub async fn generate_report(&self, report: &ReportRequest) -> Result<GeneratedReport, ApiError> {
        validate_date_range(&report.start_date, &report.end_date)?;
        self.fetch(ApiRequest::post(endpoints::REPORTS_GENERATE).json(report)?)
            .await
    }

    pub async fn list_reports(&self, query: &ReportQuery) -> Result<Vec<Report>, ApiError> {
        let request = ApiRequest::get(endpoints::REPORTS)
            .query_opt("report_type", query.report_type.map(|t| t.as_str()))
            .query_opt("limit", query.limit)
            .query_opt("offset", query.offset);
        self.fetch(request).await
    }

    pub async fn get_report(&self, report_id: i64) -> Result<Report, ApiError> {
        self.fetch(ApiRequest::get(endpoints::report(report_id))).await
    }
}

/// Response of the `/health` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub agents_active: bool,
    #[serde(default)]
    pub rag_active: bool,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:8000/", Arc::new(Session::in_memory())).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url(endpoints::TASKS), "http://localhost:8000/api/tasks");
    }

    #[test]
    fn test_health_status_parse() {
        let json = r#"{"status":"healthy","agents_active":true,"rag_active":false,"timestamp":"2024-03-01T09:00:00"}"#;
        let health: HealthStatus = serde_json::from_str(json).unwrap();
        assert!(health.is_healthy());
        assert!(!health.rag_active);
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let client = ApiClient::new("http://localhost:1", Arc::new(Session::in_memory())).unwrap();
        let result = client.login("  ", "secret").await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_generate_report_validates_dates_before_sending() {
        let client = ApiClient::new("http://localhost:1", Arc::new(Session::in_memory())).unwrap();
        let request = ReportRequest::new(crate::models::ReportType::Task, "2024-03-31", "2024-03-01");
        let result = client.generate_report(&request).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }
}
