//! Opsboard Core Library
//!
//! Client-side data layer for the operations dashboard: list query state,
//! fetch orchestration with stale-result suppression, endpoint fallback and
//! error normalization.

pub mod api;
pub mod compat;
pub mod error;
pub mod list;
pub mod orchestrator;
pub mod query;
pub mod transport;

#[cfg(test)]
mod testing;

pub use api::{
    AnalyticsApi, ApiClient, Inspection, MaterialsApi, NotFoundPolicy, OtkApi, OtkVerdict,
    ProductionApi, Resource, ResourceApi, UsersApi,
};
pub use compat::{Attempt, EndpointChain};
pub use error::{Access, ErrorEnvelope, ErrorKind, MissingResource};
pub use list::{ListResult, PageMeta};
pub use orchestrator::{CancelToken, ListSource, ListState, ListView, Phase, Settlement, Subscription};
pub use query::{QueryPatch, QuerySpec, QueryValue, Scalar, ORDERING_KEY, PAGE_KEY, PAGE_SIZE_KEY, SEARCH_KEY};
pub use transport::{ApiRequest, HttpTransport, Method, Transport};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
