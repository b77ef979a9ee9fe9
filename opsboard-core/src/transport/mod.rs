//! Transport seam between the domain API and the backend.
//!
//! A [`Transport`] takes an [`ApiRequest`] and returns the decoded JSON body
//! or an already-classified [`ErrorEnvelope`]. Nothing above this layer sees
//! raw HTTP errors.

mod http;

pub use http::HttpTransport;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::{Access, ErrorEnvelope};
use crate::query::QuerySpec;

/// Request verbs used by the backend's resource convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    /// Reads are GETs; everything else mutates.
    pub fn access(self) -> Access {
        match self {
            Method::Get => Access::Read,
            Method::Post | Method::Patch | Method::Delete => Access::Write,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API root, e.g. `lines/12/open/`.
    pub path: String,
    pub query: QuerySpec,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QuerySpec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Option<Value>) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Patch, path).with_body(Some(body))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_query(mut self, query: QuerySpec) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    pub fn access(&self) -> Access {
        self.method.access()
    }
}

/// Sends requests to the backend.
pub trait Transport: Send + Sync {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, ErrorEnvelope>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_access() {
        assert_eq!(Method::Get.access(), Access::Read);
        assert_eq!(Method::Post.access(), Access::Write);
        assert_eq!(Method::Patch.access(), Access::Write);
        assert_eq!(Method::Delete.access(), Access::Write);
    }

    #[test]
    fn test_request_builders() {
        let request = ApiRequest::patch("batches/7/", serde_json::json!({ "otk_status": "accepted" }));
        assert_eq!(request.method, Method::Patch);
        assert_eq!(request.path, "batches/7/");
        assert!(request.body.is_some());
        assert!(request.query.is_empty());
        assert_eq!(request.access(), Access::Write);
    }
}
