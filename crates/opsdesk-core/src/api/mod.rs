//! REST API client module for the operations backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! backend to manage employees, tasks, agents, and reports.
//!
//! The API uses bearer token authentication. Tokens are obtained from
//! `/api/auth/token` and renewed through `/api/auth/refresh` when a
//! request is rejected with 401.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod request;

pub use client::{ApiClient, HealthStatus};
pub use error::ApiError;
pub use request::{ApiRequest, Body};
