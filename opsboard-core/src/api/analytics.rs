//! Sales, shipment and stock analytics.

use serde_json::Value;

use super::ApiClient;
use crate::error::ErrorEnvelope;
use crate::query::QuerySpec;
use crate::transport::ApiRequest;

#[derive(Debug, Clone)]
pub struct AnalyticsApi {
    client: ApiClient,
}

impl AnalyticsApi {
    pub(super) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    async fn report(&self, path: &str, query: QuerySpec) -> Result<Value, ErrorEnvelope> {
        self.client
            .send(ApiRequest::get(path).with_query(query))
            .await
    }

    /// Totals for sales, shipments and finished-goods stock.
    pub async fn summary(&self, query: QuerySpec) -> Result<Value, ErrorEnvelope> {
        self.report("analytics/summary/", query).await
    }

    pub async fn revenue_details(&self, query: QuerySpec) -> Result<Value, ErrorEnvelope> {
        self.report("analytics/revenue-details/", query).await
    }

    pub async fn expense_details(&self, query: QuerySpec) -> Result<Value, ErrorEnvelope> {
        self.report("analytics/expense-details/", query).await
    }
}
