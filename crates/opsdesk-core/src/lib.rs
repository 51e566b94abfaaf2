//! Opsdesk core library.
//!
//! Authenticated HTTP access to the operations backend: a bearer-token
//! session with transparent refresh, the typed resource calls built on
//! it, and the models and helpers the front-ends share.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, ApiRequest};
pub use auth::{Session, SessionEvent};
pub use config::Config;
