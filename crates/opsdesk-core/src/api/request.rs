use reqwest::Method;
use serde::Serialize;

use super::endpoints::CREDENTIAL_ENDPOINTS;
use super::ApiError;

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// A logical request to the backend, independent of credentials.
///
/// The bearer header is attached at dispatch time, so the same request can
/// be sent again after a token refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Body,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present
    pub fn query_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode body: {}", e)))?;
        self.body = Body::Json(value);
        Ok(self)
    }

    pub fn form<K: ToString, V: ToString>(mut self, fields: &[(K, V)]) -> Self {
        self.body = Body::Form(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// True when the request targets the token, registration or refresh
    /// endpoint. A 401 from these never triggers a refresh.
    pub fn is_auth_endpoint(&self) -> bool {
        CREDENTIAL_ENDPOINTS.contains(&self.path.as_str())
    }
}

/// One dispatch of a request, carrying the one-shot retry flag
#[derive(Debug, Clone, Copy)]
pub(crate) struct Attempt<'a> {
    request: &'a ApiRequest,
    retried: bool,
}

impl<'a> Attempt<'a> {
    pub(crate) fn first(request: &'a ApiRequest) -> Self {
        Self {
            request,
            retried: false,
        }
    }

    /// The single permitted re-issue after a refresh
    pub(crate) fn retry(self) -> Self {
        Self {
            request: self.request,
            retried: true,
        }
    }

    pub(crate) fn request(&self) -> &'a ApiRequest {
        self.request
    }

    pub(crate) fn is_retry(&self) -> bool {
        self.retried
    }
}
