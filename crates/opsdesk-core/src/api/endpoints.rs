//! Fixed endpoint paths of the operations backend.

pub const AUTH_TOKEN: &str = "/api/auth/token";
pub const AUTH_REGISTER: &str = "/api/auth/register";
pub const AUTH_REFRESH: &str = "/api/auth/refresh";
pub const AUTH_ME: &str = "/api/auth/me";

/// Endpoints that issue credentials. A 401 from these is final.
/// `/api/auth/me` is an ordinary bearer-protected read and is not listed.
pub const CREDENTIAL_ENDPOINTS: [&str; 3] = [AUTH_TOKEN, AUTH_REGISTER, AUTH_REFRESH];

pub const EMPLOYEES: &str = "/api/employees";
pub const TASKS: &str = "/api/tasks";
pub const REPORTS: &str = "/api/reports";
pub const REPORTS_GENERATE: &str = "/api/reports/generate";

pub const AGENTS_EXECUTE: &str = "/api/agents/execute";
pub const AGENTS_INFO: &str = "/api/agents/info";
pub const AGENTS_HISTORY: &str = "/api/agents/actions/history";
pub const AGENTS_ACTIONS: &str = "/api/agents/actions";

pub const HEALTH: &str = "/health";

pub fn employee(id: i64) -> String {
    format!("{}/{}", EMPLOYEES, id)
}

pub fn employee_attendance(id: i64) -> String {
    format!("{}/{}/attendance", EMPLOYEES, id)
}

pub fn task(id: i64) -> String {
    format!("{}/{}", TASKS, id)
}

pub fn task_assign(id: i64) -> String {
    format!("{}/{}/assign", TASKS, id)
}

pub fn task_comments(id: i64) -> String {
    format!("{}/{}/comments", TASKS, id)
}

pub fn agent_action(id: i64) -> String {
    format!("{}/{}", AGENTS_ACTIONS, id)
}

pub fn agent_action_override(id: i64) -> String {
    format!("{}/{}/override", AGENTS_ACTIONS, id)
}

pub fn report(id: i64) -> String {
    format!("{}/{}", REPORTS, id)
}
