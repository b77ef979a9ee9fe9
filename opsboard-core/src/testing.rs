//! Test doubles shared by the unit tests.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use serde_json::{json, Value};
use tokio::sync::{oneshot, watch};

use crate::error::ErrorEnvelope;
use crate::list::ListResult;
use crate::orchestrator::{CancelToken, ListSource};
use crate::query::QuerySpec;
use crate::transport::{ApiRequest, Transport};

type Handler = Box<dyn Fn(&ApiRequest) -> Result<Value, ErrorEnvelope> + Send + Sync>;

/// Transport answering every request with a scripted handler and recording
/// what was sent.
pub struct ScriptedTransport {
    handler: Handler,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<Value, ErrorEnvelope> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, ErrorEnvelope>> {
        let outcome = (self.handler)(&request);
        self.requests.lock().unwrap().push(request);
        Box::pin(async move { outcome })
    }
}

/// A list result whose items are the given strings.
pub fn list_of(items: &[&str]) -> ListResult {
    ListResult::from_payload(json!({ "items": items }))
}

type Outcome = Result<ListResult, ErrorEnvelope>;

struct Gate {
    query: QuerySpec,
    token: CancelToken,
    release: Option<oneshot::Sender<Outcome>>,
}

/// List source whose requests stay pending until the test completes them,
/// in whatever order it chooses.
#[derive(Clone)]
pub struct GatedSource {
    gates: Arc<Mutex<Vec<Gate>>>,
    dispatched: Arc<watch::Sender<usize>>,
    honor_cancel: bool,
}

impl GatedSource {
    pub fn new() -> Self {
        Self {
            gates: Arc::new(Mutex::new(Vec::new())),
            dispatched: Arc::new(watch::channel(0).0),
            honor_cancel: false,
        }
    }

    /// A source whose requests stop with `Cancelled` once superseded.
    pub fn honoring_cancel() -> Self {
        Self {
            honor_cancel: true,
            ..Self::new()
        }
    }

    pub fn dispatched(&self) -> usize {
        self.gates.lock().unwrap().len()
    }

    pub async fn wait_dispatched(&self, count: usize) {
        let mut rx = self.dispatched.subscribe();
        rx.wait_for(|n| *n >= count).await.unwrap();
    }

    pub fn query(&self, index: usize) -> QuerySpec {
        self.gates.lock().unwrap()[index].query.clone()
    }

    pub fn was_cancelled(&self, index: usize) -> bool {
        self.gates.lock().unwrap()[index].token.is_cancelled()
    }

    pub fn complete(&self, index: usize, outcome: Outcome) {
        let release = self.gates.lock().unwrap()[index]
            .release
            .take()
            .expect("request already completed");
        let _ = release.send(outcome);
    }
}

impl ListSource for GatedSource {
    fn fetch(&self, query: QuerySpec, cancel: CancelToken) -> BoxFuture<'static, Outcome> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push(Gate {
            query,
            token: cancel.clone(),
            release: Some(tx),
        });
        self.dispatched.send_modify(|n| *n += 1);

        let honor_cancel = self.honor_cancel;
        Box::pin(async move {
            let pending = async move {
                rx.await
                    .unwrap_or_else(|_| Err(ErrorEnvelope::unknown("gate dropped")))
            };
            if honor_cancel {
                cancel.run(pending).await
            } else {
                pending.await
            }
        })
    }
}
