//! User access management.

use serde_json::{json, Value};

use super::{ApiClient, Resource};
use crate::error::ErrorEnvelope;

#[derive(Debug, Clone)]
pub struct UsersApi {
    client: ApiClient,
}

impl UsersApi {
    pub(super) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Replaces the set of access keys granted to a user.
    pub async fn update_access(&self, user_id: &str, access_keys: &[String]) -> Result<Value, ErrorEnvelope> {
        self.client
            .resource(Resource::Users)
            .patch_view(user_id, "access", json!({ "access_keys": access_keys }))
            .await
    }
}
