//! Fetch orchestration for list views.
//!
//! A [`Subscription`] owns one view's query, its request epoch and the last
//! published result. Every query change dispatches a new request tagged with a
//! fresh epoch; results that come back tagged with an older epoch are dropped,
//! so the view always shows the outcome of the latest dispatched query no
//! matter in which order responses arrive.
//!
//! [`ListView`] runs a subscription on its own task and exposes the
//! fire-and-forget interface used by consumers.

mod cancel;
mod subscription;
mod view;

pub use cancel::{pair as cancel_pair, CancelHandle, CancelToken};
pub use subscription::{ListState, Phase, Settlement, Subscription};
pub use view::ListView;

use std::future::Future;

use futures::future::BoxFuture;

use crate::error::ErrorEnvelope;
use crate::list::ListResult;
use crate::query::QuerySpec;

/// Produces list results for a query.
///
/// The returned future must not borrow the source: it is spawned and may
/// outlive the dispatch that created it.
pub trait ListSource: Send + Sync + 'static {
    fn fetch(
        &self,
        query: QuerySpec,
        cancel: CancelToken,
    ) -> BoxFuture<'static, Result<ListResult, ErrorEnvelope>>;
}

impl<F, Fut> ListSource for F
where
    F: Fn(QuerySpec, CancelToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ListResult, ErrorEnvelope>> + Send + 'static,
{
    fn fetch(
        &self,
        query: QuerySpec,
        cancel: CancelToken,
    ) -> BoxFuture<'static, Result<ListResult, ErrorEnvelope>> {
        Box::pin(self(query, cancel))
    }
}
