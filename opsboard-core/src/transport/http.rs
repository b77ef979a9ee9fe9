//! HTTP transport backed by `reqwest`.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use uuid::Uuid;

use super::{ApiRequest, Method, Transport};
use crate::error::{ErrorEnvelope, ErrorKind, Failure};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_ID_HEADER: &str = "X-Request-ID";

type SessionHook = Arc<dyn Fn(&ErrorEnvelope) + Send + Sync>;

/// JSON-over-HTTP transport for the dashboard API.
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
    on_unauthorized: Option<SessionHook>,
}

impl HttpTransport {
    /// Creates a transport rooted at `base_url` (e.g. `https://plant.example.com/api`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            client: build_client(DEFAULT_REQUEST_TIMEOUT),
            on_unauthorized: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Registers the session owner's handler for 401 responses.
    pub fn on_unauthorized(mut self, hook: impl Fn(&ErrorEnvelope) + Send + Sync + 'static) -> Self {
        self.on_unauthorized = Some(Arc::new(hook));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, request: &ApiRequest) -> String {
        format!(
            "{}/{}{}",
            self.base_url.trim_end_matches('/'),
            request.path.trim_start_matches('/'),
            request.query.to_query_string()
        )
    }

    async fn execute(&self, request: ApiRequest) -> Result<Value, ErrorEnvelope> {
        let access = request.access();
        let url = self.url(&request);
        let request_id = Uuid::new_v4().to_string();

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            request_id = %request_id,
            "sending request"
        );

        let mut builder = self
            .client
            .request(to_reqwest(request.method), &url)
            .header(REQUEST_ID_HEADER, &request_id);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ErrorEnvelope::unknown(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ErrorEnvelope::unknown(format!("failed reading response body: {}", e)))?;

        if status.is_success() {
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&bytes)
                .map_err(|e| ErrorEnvelope::unknown(format!("invalid response body: {}", e)));
        }

        let envelope = ErrorEnvelope::from_failure(
            Failure {
                status: Some(status.as_u16()),
                body: serde_json::from_slice::<Value>(&bytes).ok(),
                message: format!("server returned status {}", status),
            },
            access,
        );

        if envelope.kind == ErrorKind::Unauthorized {
            tracing::warn!(path = %request.path, request_id = %request_id, "session rejected by server");
            if let Some(hook) = &self.on_unauthorized {
                hook(&envelope);
            }
        }

        Err(envelope)
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, ErrorEnvelope>> {
        Box::pin(self.execute(request))
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}
