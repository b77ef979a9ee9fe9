//! Per-view subscription state machine.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use super::cancel::{self, CancelHandle};
use super::ListSource;
use crate::error::ErrorEnvelope;
use crate::list::{ListResult, PageMeta};
use crate::query::{QueryPatch, QuerySpec, PAGE_KEY};

/// Where a subscription is in its request cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// Nothing dispatched yet.
    #[default]
    Idle,
    /// A request for the current query is outstanding.
    Loading,
    /// The latest request succeeded.
    Succeeded,
    /// The latest request failed.
    Failed,
}

/// What happened to one arriving result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Published as the new data.
    Success,
    /// Published as the new error; data left in place.
    Error,
    /// Discarded because a newer request had been dispatched.
    Superseded,
}

/// State published to the view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListState {
    /// Query the view currently asks for.
    pub query: QuerySpec,
    /// Last successfully fetched result.
    pub data: Option<ListResult>,
    pub loading: bool,
    pub error: Option<ErrorEnvelope>,
    pub phase: Phase,
}

impl ListState {
    /// Items of the last result, or an empty slice before the first success.
    pub fn items(&self) -> &[Value] {
        self.data.as_ref().map_or(&[], |d| d.items.as_slice())
    }

    pub fn meta(&self) -> Option<&PageMeta> {
        self.data.as_ref().and_then(|d| d.meta.as_ref())
    }

    pub fn links(&self) -> Option<&Value> {
        self.data.as_ref().and_then(|d| d.links.as_ref())
    }

    pub fn raw(&self) -> Option<&Value> {
        self.data.as_ref().map(|d| &d.raw)
    }
}

struct Arrival {
    epoch: u64,
    outcome: Result<ListResult, ErrorEnvelope>,
}

/// One list view's query, request epoch and published state.
pub struct Subscription<S: ListSource> {
    source: Arc<S>,
    epoch: u64,
    in_flight: Option<CancelHandle>,
    arrivals_tx: mpsc::UnboundedSender<Arrival>,
    arrivals: mpsc::UnboundedReceiver<Arrival>,
    state: ListState,
}

impl<S: ListSource> Subscription<S> {
    /// Creates an idle subscription. Nothing is fetched until the query
    /// changes or [`refetch`](Self::refetch) is called.
    pub fn new(source: S, query: QuerySpec) -> Self {
        let (arrivals_tx, arrivals) = mpsc::unbounded_channel();
        Self {
            source: Arc::new(source),
            epoch: 0,
            in_flight: None,
            arrivals_tx,
            arrivals,
            state: ListState {
                query: query.normalize(),
                ..ListState::default()
            },
        }
    }

    /// Creates a subscription and dispatches the first request.
    pub fn open(source: S, query: QuerySpec) -> Self {
        let mut subscription = Self::new(source, query);
        subscription.dispatch();
        subscription
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn query(&self) -> &QuerySpec {
        &self.state.query
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Merges `partial` into the query; dispatches if the query changed.
    pub fn patch(&mut self, partial: QueryPatch) {
        if self.state.query.patch(partial) {
            self.dispatch();
        }
    }

    /// Moves to another page; dispatches if the page changed.
    pub fn set_page(&mut self, page: u32) {
        if self.state.query.set_page(page) {
            self.dispatch();
        }
    }

    /// Replaces the whole query; dispatches if it differs.
    ///
    /// When filters change but the new query still carries the current page,
    /// the page resets to 1 as it does for [`patch`](Self::patch). A page that
    /// differs from the current one is kept.
    pub fn replace(&mut self, query: QuerySpec) {
        let mut query = query.normalize();
        let current = &self.state.query;
        if query.contains(PAGE_KEY)
            && query.page() == current.page()
            && query.without(PAGE_KEY) != current.without(PAGE_KEY)
        {
            query.set(PAGE_KEY, 1u32);
        }
        if query != self.state.query {
            self.state.query = query;
            self.dispatch();
        }
    }

    /// Dispatches a request for the current query even if nothing changed.
    pub fn refetch(&mut self) {
        self.dispatch();
    }

    fn dispatch(&mut self) {
        self.epoch += 1;
        let epoch = self.epoch;

        if let Some(previous) = self.in_flight.take() {
            previous.cancel();
        }
        let (handle, token) = cancel::pair();
        self.in_flight = Some(handle);

        let query = self.state.query.clone();
        tracing::debug!(epoch, query = %query, "dispatching list request");

        let work = self.source.fetch(query, token);
        let tx = self.arrivals_tx.clone();
        tokio::spawn(async move {
            let outcome = work.await;
            let _ = tx.send(Arrival { epoch, outcome });
        });

        self.state.loading = true;
        self.state.phase = Phase::Loading;
    }

    /// Waits for the next result to arrive and applies it.
    pub async fn settle_next(&mut self) -> Option<Settlement> {
        let arrival = self.arrivals.recv().await?;
        Some(self.apply(arrival))
    }

    fn apply(&mut self, arrival: Arrival) -> Settlement {
        if arrival.epoch != self.epoch {
            tracing::debug!(
                epoch = arrival.epoch,
                latest = self.epoch,
                "discarding superseded result"
            );
            return Settlement::Superseded;
        }

        match arrival.outcome {
            Err(error) if error.is_cancelled() => {
                tracing::debug!(epoch = arrival.epoch, "discarding cancelled result");
                Settlement::Superseded
            }
            Ok(result) => {
                self.in_flight = None;
                self.state.data = Some(result);
                self.state.error = None;
                self.state.loading = false;
                self.state.phase = Phase::Succeeded;
                Settlement::Success
            }
            Err(error) => {
                tracing::debug!(kind = %error.kind, message = %error.message, "list request failed");
                self.in_flight = None;
                self.state.error = Some(error);
                self.state.loading = false;
                self.state.phase = Phase::Failed;
                Settlement::Error
            }
        }
    }

    /// Cancels outstanding work and ends the subscription.
    pub fn teardown(mut self) {
        self.cancel_in_flight();
    }

    fn cancel_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.cancel();
        }
    }
}

impl<S: ListSource> Drop for Subscription<S> {
    fn drop(&mut self) {
        self.cancel_in_flight();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::orchestrator::CancelToken;
    use crate::query::{PAGE_SIZE_KEY, SEARCH_KEY};
    use crate::testing::{list_of, GatedSource};
    use serde_json::json;

    fn status(value: &str) -> QuerySpec {
        QuerySpec::new().with("status", value)
    }

    #[tokio::test]
    async fn test_latest_dispatch_wins_regardless_of_arrival_order() {
        let source = GatedSource::new();
        let mut sub = Subscription::new(source.clone(), QuerySpec::new());

        sub.patch(QueryPatch::new().set(SEARCH_KEY, "s1"));
        sub.patch(QueryPatch::new().set(SEARCH_KEY, "s2"));
        sub.patch(QueryPatch::new().set(SEARCH_KEY, "s3"));
        assert_eq!(source.dispatched(), 3);
        assert!(sub.state().loading);

        source.complete(2, Ok(list_of(&["s3"])));
        assert_eq!(sub.settle_next().await, Some(Settlement::Success));
        source.complete(0, Ok(list_of(&["s1"])));
        assert_eq!(sub.settle_next().await, Some(Settlement::Superseded));
        source.complete(1, Ok(list_of(&["s2"])));
        assert_eq!(sub.settle_next().await, Some(Settlement::Superseded));

        assert_eq!(sub.state().items(), &[json!("s3")]);
        assert!(!sub.state().loading);
        assert_eq!(sub.phase(), Phase::Succeeded);
    }

    #[tokio::test]
    async fn test_stale_error_does_not_overwrite() {
        let source = GatedSource::new();
        let mut sub = Subscription::new(source.clone(), status(""));

        sub.refetch();
        sub.replace(status("in_progress"));
        assert_eq!(source.query(0), QuerySpec::new());
        assert_eq!(source.query(1), status("in_progress"));

        source.complete(1, Ok(list_of(&["in_progress"])));
        assert_eq!(sub.settle_next().await, Some(Settlement::Success));
        source.complete(0, Err(ErrorEnvelope::unknown("late failure")));
        assert_eq!(sub.settle_next().await, Some(Settlement::Superseded));

        assert_eq!(sub.state().items(), &[json!("in_progress")]);
        assert!(sub.state().error.is_none());
    }

    #[tokio::test]
    async fn test_supersession_requests_cancellation() {
        let source = GatedSource::new();
        let mut sub = Subscription::open(source.clone(), QuerySpec::new());
        assert!(!source.was_cancelled(0));

        sub.set_page(2);
        assert!(source.was_cancelled(0));
        assert!(!source.was_cancelled(1));

        sub.teardown();
        assert!(source.was_cancelled(1));
    }

    #[tokio::test]
    async fn test_honored_cancellation_is_superseded() {
        let source = GatedSource::honoring_cancel();
        let mut sub = Subscription::open(source.clone(), QuerySpec::new());
        sub.set_page(2);

        // The first request stops on its own with a Cancelled outcome.
        assert_eq!(sub.settle_next().await, Some(Settlement::Superseded));
        assert!(sub.state().loading);

        source.complete(1, Ok(list_of(&["page 2"])));
        assert_eq!(sub.settle_next().await, Some(Settlement::Success));
        assert_eq!(sub.state().items(), &[json!("page 2")]);
    }

    #[tokio::test]
    async fn test_error_keeps_previous_data() {
        let source = GatedSource::new();
        let mut sub = Subscription::open(source.clone(), QuerySpec::new());
        source.complete(0, Ok(list_of(&["a", "b"])));
        sub.settle_next().await;

        sub.refetch();
        let mut conflict = ErrorEnvelope::new(ErrorKind::Conflict, "rejected");
        conflict.http_status = Some(409);
        source.complete(1, Err(conflict.clone()));
        assert_eq!(sub.settle_next().await, Some(Settlement::Error));

        assert_eq!(sub.state().items(), &[json!("a"), json!("b")]);
        assert_eq!(sub.state().error, Some(conflict));
        assert_eq!(sub.phase(), Phase::Failed);
        assert!(!sub.state().loading);

        // The error stays visible while reloading and clears on success.
        sub.refetch();
        assert!(sub.state().error.is_some());
        source.complete(2, Ok(list_of(&["c"])));
        sub.settle_next().await;
        assert!(sub.state().error.is_none());
        assert_eq!(sub.state().items(), &[json!("c")]);
    }

    #[tokio::test]
    async fn test_refetch_is_idempotent() {
        let payload = json!({ "items": [{ "id": 1 }, { "id": 2 }], "meta": { "page": 1, "total_pages": 1 } });
        let source = {
            let payload = payload.clone();
            move |_query: QuerySpec, _cancel: CancelToken| {
                let payload = payload.clone();
                async move { Ok::<_, ErrorEnvelope>(ListResult::from_payload(payload)) }
            }
        };
        let mut sub = Subscription::new(source, QuerySpec::new().with(PAGE_KEY, 1u32));

        sub.refetch();
        sub.settle_next().await;
        let first = sub.state().data.clone();
        sub.refetch();
        sub.settle_next().await;

        assert_eq!(sub.state().data, first);
        assert_eq!(first.unwrap().raw, payload);
    }

    #[tokio::test]
    async fn test_unchanged_query_does_not_dispatch() {
        let source = GatedSource::new();
        let mut sub = Subscription::new(
            source.clone(),
            QuerySpec::new().with(PAGE_KEY, 1u32).with("status", "open"),
        );

        sub.patch(QueryPatch::new().set("status", "open"));
        sub.set_page(1);
        sub.replace(QuerySpec::new().with("status", "open").with(PAGE_KEY, 1u32).with(SEARCH_KEY, ""));
        assert_eq!(source.dispatched(), 0);
        assert_eq!(sub.phase(), Phase::Idle);

        sub.refetch();
        assert_eq!(source.dispatched(), 1);
    }

    #[tokio::test]
    async fn test_page_resets_on_filter_change() {
        let source = GatedSource::new();
        let mut sub = Subscription::new(
            source.clone(),
            QuerySpec::new().with(PAGE_KEY, 5u32).with(PAGE_SIZE_KEY, 20u32),
        );

        sub.patch(QueryPatch::new().set(SEARCH_KEY, "x"));
        assert_eq!(sub.query().page(), Some(1));
        sub.set_page(3);
        assert_eq!(
            source.query(1),
            QuerySpec::new()
                .with(PAGE_KEY, 3u32)
                .with(PAGE_SIZE_KEY, 20u32)
                .with(SEARCH_KEY, "x")
        );
    }

    #[tokio::test]
    async fn test_meta_absent_on_single_page() {
        let items: Vec<_> = (0..12).map(|i| json!({ "id": i })).collect();
        let body = json!({ "items": items });
        let source = move |_query: QuerySpec, _cancel: CancelToken| {
            let body = body.clone();
            async move { Ok::<_, ErrorEnvelope>(ListResult::from_payload(body)) }
        };
        let mut sub = Subscription::open(
            source,
            QuerySpec::new()
                .with(PAGE_KEY, 1u32)
                .with(PAGE_SIZE_KEY, 20u32)
                .with(SEARCH_KEY, ""),
        );
        sub.settle_next().await;

        assert_eq!(sub.state().items().len(), 12);
        assert!(sub.state().meta().is_none());
    }

    #[tokio::test]
    async fn test_replace_resets_carried_page() {
        let source = GatedSource::new();
        let mut sub = Subscription::new(
            source.clone(),
            QuerySpec::new().with(PAGE_KEY, 5u32).with("status", ""),
        );

        sub.replace(QuerySpec::new().with(PAGE_KEY, 5u32).with("status", "open"));
        assert_eq!(
            source.query(0),
            QuerySpec::new().with(PAGE_KEY, 1u32).with("status", "open")
        );

        // An explicit move to another page is kept.
        sub.replace(QuerySpec::new().with(PAGE_KEY, 3u32).with("status", "closed"));
        assert_eq!(
            source.query(1),
            QuerySpec::new().with(PAGE_KEY, 3u32).with("status", "closed")
        );

        // Same filters on another page is a plain page move.
        sub.replace(QuerySpec::new().with(PAGE_KEY, 4u32).with("status", "closed"));
        assert_eq!(sub.query().page(), Some(4));
        assert_eq!(source.dispatched(), 3);
    }

    fn permutations(n: usize) -> Vec<Vec<usize>> {
        if n == 0 {
            return vec![Vec::new()];
        }
        let mut all = Vec::new();
        for rest in permutations(n - 1) {
            for slot in 0..=rest.len() {
                let mut order = rest.clone();
                order.insert(slot, n - 1);
                all.push(order);
            }
        }
        all
    }

    #[tokio::test]
    async fn test_latest_dispatch_wins_for_every_arrival_order() {
        const DISPATCHES: usize = 4;
        let orders = permutations(DISPATCHES);
        assert_eq!(orders.len(), 24);

        for order in &orders {
            for failures in 0u32..(1 << DISPATCHES) {
                let fails = |i: usize| failures & (1 << i) != 0;
                let source = GatedSource::new();
                let mut sub = Subscription::open(source.clone(), QuerySpec::new());
                source.complete(0, Ok(list_of(&["base"])));
                assert_eq!(sub.settle_next().await, Some(Settlement::Success));

                let searches: Vec<String> = (0..DISPATCHES).map(|i| format!("s{}", i)).collect();
                for search in &searches {
                    sub.patch(QueryPatch::new().set(SEARCH_KEY, search.as_str()));
                }
                assert_eq!(source.dispatched(), DISPATCHES + 1);

                for &i in order {
                    let outcome = if fails(i) {
                        Err(ErrorEnvelope::unknown(format!("failed {}", i)))
                    } else {
                        Ok(list_of(&[searches[i].as_str()]))
                    };
                    source.complete(i + 1, outcome);

                    let settlement = sub.settle_next().await;
                    let expected = match (i == DISPATCHES - 1, fails(i)) {
                        (false, _) => Settlement::Superseded,
                        (true, false) => Settlement::Success,
                        (true, true) => Settlement::Error,
                    };
                    assert_eq!(
                        settlement,
                        Some(expected),
                        "order {:?}, failures {:04b}",
                        order,
                        failures
                    );
                }

                let state = sub.state();
                let context = format!("order {:?}, failures {:04b}", order, failures);
                assert!(!state.loading, "{}", context);
                assert_eq!(state.query, QuerySpec::new().with(PAGE_KEY, 1u32).with(SEARCH_KEY, "s3"));
                if fails(DISPATCHES - 1) {
                    assert_eq!(state.phase, Phase::Failed, "{}", context);
                    assert_eq!(state.items(), &[json!("base")], "{}", context);
                    let message = state.error.as_ref().map(|e| e.message.as_str());
                    assert_eq!(message, Some("failed 3"), "{}", context);
                } else {
                    assert_eq!(state.phase, Phase::Succeeded, "{}", context);
                    assert_eq!(state.items(), &[json!("s3")], "{}", context);
                    assert!(state.error.is_none(), "{}", context);
                }
            }
        }
    }
}
