//! Quality control (OTK): batches awaiting inspection, inspection history and
//! recording a verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ApiClient, NotFoundPolicy};
use crate::compat::{Attempt, EndpointChain};
use crate::error::ErrorEnvelope;
use crate::list::ListResult;
use crate::orchestrator::ListSource;
use crate::query::{QuerySpec, PAGE_SIZE_KEY};
use crate::transport::ApiRequest;

const OTK_PAGE_SIZE: u32 = 100;

/// Status values meaning inspection is finished, in both spellings the
/// backend has used.
const ACCEPTED: [&str; 2] = ["accepted", "принято"];
const DEFECT: [&str; 2] = ["defect", "брак"];

/// Final inspection outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtkVerdict {
    Accepted,
    Defect,
}

impl OtkVerdict {
    pub fn as_str(self) -> &'static str {
        match self {
            OtkVerdict::Accepted => "accepted",
            OtkVerdict::Defect => "defect",
        }
    }

    /// Reads a batch's `otk_status`, if it holds a final verdict.
    pub fn of(batch: &Value) -> Option<Self> {
        let status = match batch.get("otk_status") {
            None | Some(Value::Null) => return None,
            Some(Value::String(s)) => s.to_lowercase(),
            Some(other) => other.to_string(),
        };
        if ACCEPTED.contains(&status.as_str()) {
            Some(OtkVerdict::Accepted)
        } else if DEFECT.contains(&status.as_str()) {
            Some(OtkVerdict::Defect)
        } else {
            None
        }
    }
}

/// Result of inspecting one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    pub accepted: u64,
    #[serde(default)]
    pub defect: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defect_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspector: Option<String>,
}

impl Inspection {
    /// A batch is defective only when nothing was accepted.
    pub fn verdict(&self) -> OtkVerdict {
        if self.defect > 0 && self.accepted == 0 {
            OtkVerdict::Defect
        } else {
            OtkVerdict::Accepted
        }
    }

    /// Field-level update understood by backends without the accept route.
    fn batch_fields(&self, checked_at: DateTime<Utc>) -> Value {
        json!({
            "otk_accepted": self.accepted,
            "otk_defect": self.defect,
            "otk_defect_reason": non_empty(&self.defect_reason),
            "otk_comment": non_empty(&self.comment),
            "otk_status": self.verdict().as_str(),
            "otk_inspector": non_empty(&self.inspector),
            "otk_checked_at": checked_at.to_rfc3339(),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn is_inspected(batch: &Value) -> bool {
    OtkVerdict::of(batch).is_some()
        || is_set(batch.get("otk_checked_at"))
        || batch.get("otk_accepted").is_some_and(|v| !v.is_null())
}

#[derive(Debug, Clone)]
pub struct OtkApi {
    client: ApiClient,
}

impl OtkApi {
    pub(super) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    async fn batches(&self, operation: &'static str, query: QuerySpec) -> Result<ListResult, ErrorEnvelope> {
        let query = query.with_default(PAGE_SIZE_KEY, OTK_PAGE_SIZE);
        self.client
            .list_at(operation, "batches/".to_string(), query, NotFoundPolicy::Empty)
            .await
    }

    /// Batches without a final verdict. Filtering happens on the fetched
    /// page, so page metadata describes the unfiltered collection.
    pub async fn awaiting(&self, query: QuerySpec) -> Result<ListResult, ErrorEnvelope> {
        Ok(self
            .batches("otk awaiting", query)
            .await?
            .retain(|batch| OtkVerdict::of(batch).is_none()))
    }

    /// Batches that have been inspected.
    pub async fn history(&self, query: QuerySpec) -> Result<ListResult, ErrorEnvelope> {
        Ok(self.batches("otk history", query).await?.retain(is_inspected))
    }

    pub fn awaiting_source(&self) -> impl ListSource {
        self.client
            .source(|api, query| async move { api.otk().awaiting(query).await })
    }

    pub fn history_source(&self) -> impl ListSource {
        self.client
            .source(|api, query| async move { api.otk().history(query).await })
    }

    /// Records an inspection, stamped with the current time on legacy backends.
    pub async fn accept_batch(&self, batch_id: u64, inspection: &Inspection) -> Result<Value, ErrorEnvelope> {
        self.accept_batch_at(batch_id, inspection, Utc::now()).await
    }

    pub async fn accept_batch_at(
        &self,
        batch_id: u64,
        inspection: &Inspection,
        checked_at: DateTime<Utc>,
    ) -> Result<Value, ErrorEnvelope> {
        let payload = serde_json::to_value(inspection)
            .map_err(|e| ErrorEnvelope::unknown(format!("invalid inspection: {}", e)))?;

        let chain = EndpointChain::new(
            "accept batch",
            Attempt::raw(ApiRequest::post(format!("batches/{}/accept/", batch_id), Some(payload))),
        )
        .fallback(Attempt::raw(ApiRequest::patch(
            format!("batches/{}/", batch_id),
            inspection.batch_fields(checked_at),
        )));

        self.client.run(chain).await
    }
}
