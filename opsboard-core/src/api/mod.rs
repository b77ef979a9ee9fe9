//! Domain API over a [`Transport`].
//!
//! [`ApiClient`] is cheap to clone and hands out per-area APIs. Reads that
//! feed list views return [`ListResult`]s; everything else returns the decoded
//! JSON payload.

mod analytics;
mod materials;
mod otk;
mod production;
mod resources;
mod users;

pub use analytics::AnalyticsApi;
pub use materials::MaterialsApi;
pub use otk::{Inspection, OtkApi, OtkVerdict};
pub use production::ProductionApi;
pub use resources::{ParseResourceError, Resource, ResourceApi};
pub use users::UsersApi;

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::compat::{Attempt, EndpointChain};
use crate::error::{ErrorEnvelope, ErrorKind};
use crate::list::ListResult;
use crate::orchestrator::{CancelToken, ListSource};
use crate::query::QuerySpec;
use crate::transport::{ApiRequest, Transport};

/// How a read treats a 404 once every route has been tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundPolicy {
    /// Surface `NotFoundOnRead`.
    Error,
    /// Treat the collection as empty.
    Empty,
}

#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn from_arc(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn resource(&self, resource: Resource) -> ResourceApi {
        ResourceApi::new(self.clone(), resource)
    }

    pub fn production(&self) -> ProductionApi {
        ProductionApi::new(self.clone())
    }

    pub fn otk(&self) -> OtkApi {
        OtkApi::new(self.clone())
    }

    pub fn materials(&self) -> MaterialsApi {
        MaterialsApi::new(self.clone())
    }

    pub fn users(&self) -> UsersApi {
        UsersApi::new(self.clone())
    }

    pub fn analytics(&self) -> AnalyticsApi {
        AnalyticsApi::new(self.clone())
    }

    /// Adapts a list operation into a [`ListSource`] for a list view.
    ///
    /// The operation is abandoned as soon as the view supersedes it.
    ///
    /// ```ignore
    /// let source = client.source(|api, query| async move { api.production().batches(query).await });
    /// let view = ListView::spawn(source, QuerySpec::new());
    /// ```
    pub fn source<F, Fut>(&self, op: F) -> impl ListSource
    where
        F: Fn(ApiClient, QuerySpec) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ListResult, ErrorEnvelope>> + Send + 'static,
    {
        let client = self.clone();
        move |query: QuerySpec, cancel: CancelToken| {
            let work = op(client.clone(), query);
            async move { cancel.run(work).await }
        }
    }

    pub(crate) async fn send(&self, request: ApiRequest) -> Result<Value, ErrorEnvelope> {
        self.transport.send(request).await
    }

    pub(crate) async fn run<T>(&self, chain: EndpointChain<T>) -> Result<T, ErrorEnvelope> {
        chain.run(self.transport.as_ref()).await
    }

    /// Runs a list read and normalizes its payload, applying `policy` to a
    /// final 404.
    pub(crate) async fn read_list(
        &self,
        chain: EndpointChain<Value>,
        policy: NotFoundPolicy,
    ) -> Result<ListResult, ErrorEnvelope> {
        let operation = chain.operation();
        match self.run(chain).await {
            Ok(payload) => Ok(ListResult::from_payload(payload)),
            Err(error) if error.kind == ErrorKind::NotFoundOnRead && policy == NotFoundPolicy::Empty => {
                tracing::debug!(operation, "collection not available, treating as empty");
                Ok(ListResult::empty())
            }
            Err(error) => Err(error),
        }
    }

    /// Single-route list read.
    pub(crate) async fn list_at(
        &self,
        operation: &'static str,
        path: String,
        query: QuerySpec,
        policy: NotFoundPolicy,
    ) -> Result<ListResult, ErrorEnvelope> {
        let chain = EndpointChain::new(operation, Attempt::raw(ApiRequest::get(path).with_query(query)));
        self.read_list(chain, policy).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").finish_non_exhaustive()
    }
}
