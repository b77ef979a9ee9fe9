//! Production planning: orders in work, batches and order release.

use serde_json::{json, Value};

use super::{ApiClient, NotFoundPolicy};
use crate::compat::{Attempt, EndpointChain};
use crate::error::ErrorEnvelope;
use crate::list::ListResult;
use crate::orchestrator::ListSource;
use crate::query::{QuerySpec, PAGE_SIZE_KEY};
use crate::transport::ApiRequest;

/// Page size the legacy order list is asked for when the caller sets none.
const LEGACY_ORDERS_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct ProductionApi {
    client: ApiClient,
}

impl ProductionApi {
    pub(super) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Orders currently in production.
    pub async fn orders_in_progress(&self, query: QuerySpec) -> Result<ListResult, ErrorEnvelope> {
        let legacy = query.clone().with_default(PAGE_SIZE_KEY, LEGACY_ORDERS_PAGE_SIZE);
        let chain = EndpointChain::new(
            "production orders",
            Attempt::raw(ApiRequest::get("production/orders/").with_query(query)),
        )
        .fallback(Attempt::raw(ApiRequest::get("orders/").with_query(legacy)));

        self.client.read_list(chain, NotFoundPolicy::Error).await
    }

    pub async fn batches(&self, query: QuerySpec) -> Result<ListResult, ErrorEnvelope> {
        let chain = EndpointChain::new(
            "production batches",
            Attempt::raw(ApiRequest::get("production/batches/").with_query(query.clone())),
        )
        .fallback(Attempt::raw(ApiRequest::get("batches/").with_query(query)));

        self.client.read_list(chain, NotFoundPolicy::Error).await
    }

    /// Releases `quantity` units of an order into production.
    pub async fn release_order(&self, order_id: u64, quantity: u64) -> Result<Value, ErrorEnvelope> {
        let chain = EndpointChain::new(
            "release order",
            Attempt::raw(ApiRequest::post(
                "production/release/",
                Some(json!({ "orderId": order_id, "quantity": quantity })),
            )),
        )
        .fallback(Attempt::raw(ApiRequest::post(
            format!("orders/{}/release/", order_id),
            Some(json!({ "quantity": quantity })),
        )));

        self.client.run(chain).await
    }

    /// List source over [`orders_in_progress`](Self::orders_in_progress).
    pub fn orders_source(&self) -> impl ListSource {
        self.client
            .source(|api, query| async move { api.production().orders_in_progress(query).await })
    }

    /// List source over [`batches`](Self::batches).
    pub fn batches_source(&self) -> impl ListSource {
        self.client
            .source(|api, query| async move { api.production().batches(query).await })
    }
}
