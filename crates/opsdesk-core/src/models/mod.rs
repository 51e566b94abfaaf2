//! Data models for the operations backend.
//!
//! This module contains the request and response types used by the API
//! client, plus the client-side aggregation over fetched records:
//!
//! - `User`, `TokenResponse`, `NewUser`: authentication
//! - `Employee`, `AttendanceRecord`, `AttendanceSummary`: people and time tracking
//! - `Task`, `TaskSummary`: task management
//! - `AgentRequest`, `AgentResponse`, `AgentHistory`: AI agent calls
//! - `Report`, `ReportRequest`: generated reports

pub mod agent;
pub mod employee;
pub mod report;
pub mod task;
pub mod user;

pub use agent::{
    ActionUser, AgentActionDetail, AgentActionSummary, AgentCatalog, AgentHistory, AgentInfo,
    AgentKind, AgentOverride, AgentRequest, AgentResponse, HistoryQuery, NATURAL_LANGUAGE_ACTION,
};
pub use employee::{
    group_by_department, AttendanceRecord, AttendanceStatus, AttendanceSummary, Employee,
    EmployeeFilter, EmployeeUpdate,
};
pub use report::{GeneratedReport, Report, ReportQuery, ReportRequest, ReportType};
pub use task::{
    group_by_status, ActionMessage, NewTask, Task, TaskFilter, TaskPriority, TaskStatus,
    TaskSummary, TaskUpdate,
};
pub use user::{NewUser, Role, TokenResponse, User};
