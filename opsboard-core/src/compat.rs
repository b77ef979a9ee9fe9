//! Endpoint compatibility chains.
//!
//! Several operations live on different routes depending on the backend
//! version. An [`EndpointChain`] lists the routes in preference order and tries
//! them one after another, moving on only when a route is missing (404) or does
//! not accept the verb (405). Any other failure means the route was right and
//! the operation itself was rejected, so it is returned immediately.

use serde_json::Value;

use crate::error::ErrorEnvelope;
use crate::transport::{ApiRequest, Transport};

type Translate<T> = Box<dyn FnOnce(Value) -> T + Send>;

/// One way of performing an operation: a request plus the translation of its
/// success payload into the caller's shape.
pub struct Attempt<T> {
    request: ApiRequest,
    translate: Translate<T>,
}

impl<T> Attempt<T> {
    pub fn new(request: ApiRequest, translate: impl FnOnce(Value) -> T + Send + 'static) -> Self {
        Self {
            request,
            translate: Box::new(translate),
        }
    }

    pub fn request(&self) -> &ApiRequest {
        &self.request
    }
}

impl Attempt<Value> {
    /// An attempt whose payload is returned as-is.
    pub fn raw(request: ApiRequest) -> Self {
        Self::new(request, |payload| payload)
    }
}

impl<T> std::fmt::Debug for Attempt<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attempt")
            .field("method", &self.request.method)
            .field("path", &self.request.path)
            .finish()
    }
}

/// Ordered, non-empty list of attempts for one logical operation.
#[derive(Debug)]
pub struct EndpointChain<T> {
    operation: &'static str,
    attempts: Vec<Attempt<T>>,
}

impl<T> EndpointChain<T> {
    /// Starts a chain with its preferred attempt.
    pub fn new(operation: &'static str, primary: Attempt<T>) -> Self {
        Self {
            operation,
            attempts: vec![primary],
        }
    }

    /// Appends a legacy route, tried only if every earlier one is missing.
    pub fn fallback(mut self, attempt: Attempt<T>) -> Self {
        self.attempts.push(attempt);
        self
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Runs the attempts in order and returns the first success.
    ///
    /// When every route is missing, the last attempt's error is returned.
    pub async fn run(self, transport: &dyn Transport) -> Result<T, ErrorEnvelope> {
        let operation = self.operation;
        let mut last_error = None;

        for (index, attempt) in self.attempts.into_iter().enumerate() {
            let Attempt { request, translate } = attempt;
            let path = request.path.clone();

            match transport.send(request).await {
                Ok(payload) => {
                    if index > 0 {
                        tracing::debug!(operation, path = %path, "served by fallback route");
                    }
                    return Ok(translate(payload));
                }
                Err(error) if error.is_route_missing() => {
                    tracing::debug!(
                        operation,
                        path = %path,
                        kind = %error.kind,
                        "route unavailable, trying next"
                    );
                    last_error = Some(error);
                }
                Err(error) => return Err(error),
            }
        }

        Err(last_error
            .unwrap_or_else(|| ErrorEnvelope::unknown(format!("{}: no routes configured", operation))))
    }
}
