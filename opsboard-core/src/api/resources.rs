//! Plain CRUD resources following the backend's URL convention.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use super::{ApiClient, NotFoundPolicy};
use crate::error::ErrorEnvelope;
use crate::list::ListResult;
use crate::orchestrator::ListSource;
use crate::query::QuerySpec;
use crate::transport::ApiRequest;

/// Collections exposed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Lines,
    RawMaterials,
    Incoming,
    ChemistryElements,
    ChemistryTasks,
    Recipes,
    Orders,
    Batches,
    Shipments,
    Users,
    Roles,
    Clients,
    Sales,
    WarehouseBatches,
}

impl Resource {
    pub const ALL: [Resource; 14] = [
        Resource::Lines,
        Resource::RawMaterials,
        Resource::Incoming,
        Resource::ChemistryElements,
        Resource::ChemistryTasks,
        Resource::Recipes,
        Resource::Orders,
        Resource::Batches,
        Resource::Shipments,
        Resource::Users,
        Resource::Roles,
        Resource::Clients,
        Resource::Sales,
        Resource::WarehouseBatches,
    ];

    /// Collection path relative to the API root, without slashes.
    pub fn path(self) -> &'static str {
        match self {
            Resource::Lines => "lines",
            Resource::RawMaterials => "raw-materials",
            Resource::Incoming => "incoming",
            Resource::ChemistryElements => "chemistry/elements",
            Resource::ChemistryTasks => "chemistry/tasks",
            Resource::Recipes => "recipes",
            Resource::Orders => "orders",
            Resource::Batches => "batches",
            Resource::Shipments => "shipments",
            Resource::Users => "users",
            Resource::Roles => "roles",
            Resource::Clients => "clients",
            Resource::Sales => "sales",
            Resource::WarehouseBatches => "warehouse/batches",
        }
    }

    /// Name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Resource::ChemistryElements => "chemistry-elements",
            Resource::ChemistryTasks => "chemistry-tasks",
            Resource::WarehouseBatches => "warehouse-batches",
            other => other.path(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown resource '{0}'")]
pub struct ParseResourceError(String);

impl FromStr for Resource {
    type Err = ParseResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_matches('/').to_lowercase();
        Resource::ALL
            .into_iter()
            .find(|r| r.name() == wanted || r.path() == wanted)
            .ok_or_else(|| ParseResourceError(s.to_string()))
    }
}

/// CRUD, actions and sub-views on one collection.
#[derive(Debug, Clone)]
pub struct ResourceApi {
    client: ApiClient,
    resource: Resource,
}

impl ResourceApi {
    pub(super) fn new(client: ApiClient, resource: Resource) -> Self {
        Self { client, resource }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    fn collection_path(&self) -> String {
        format!("{}/", self.resource.path())
    }

    fn item_path(&self, id: &str) -> String {
        format!("{}/{}/", self.resource.path(), urlencoding::encode(id))
    }

    fn sub_path(&self, id: &str, name: &str) -> String {
        format!("{}{}/", self.item_path(id), name.trim_matches('/'))
    }

    pub async fn list(&self, query: QuerySpec) -> Result<ListResult, ErrorEnvelope> {
        self.client
            .list_at("list", self.collection_path(), query, NotFoundPolicy::Error)
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Value, ErrorEnvelope> {
        self.client.send(ApiRequest::get(self.item_path(id))).await
    }

    pub async fn create(&self, body: Value) -> Result<Value, ErrorEnvelope> {
        self.client
            .send(ApiRequest::post(self.collection_path(), Some(body)))
            .await
    }

    /// Partial update.
    pub async fn update(&self, id: &str, body: Value) -> Result<Value, ErrorEnvelope> {
        self.client
            .send(ApiRequest::patch(self.item_path(id), body))
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ErrorEnvelope> {
        self.client.send(ApiRequest::delete(self.item_path(id))).await?;
        Ok(())
    }

    /// `POST {resource}/{id}/{name}/`, e.g. `open`, `close`, `ship`.
    pub async fn action(&self, id: &str, name: &str, body: Option<Value>) -> Result<Value, ErrorEnvelope> {
        self.client
            .send(ApiRequest::post(self.sub_path(id, name), body))
            .await
    }

    /// `GET {resource}/{id}/{name}/`, e.g. `history`.
    pub async fn view(&self, id: &str, name: &str) -> Result<Value, ErrorEnvelope> {
        self.client.send(ApiRequest::get(self.sub_path(id, name))).await
    }

    /// `PATCH {resource}/{id}/{name}/`.
    pub async fn patch_view(&self, id: &str, name: &str, body: Value) -> Result<Value, ErrorEnvelope> {
        self.client
            .send(ApiRequest::patch(self.sub_path(id, name), body))
            .await
    }

    /// List source over this collection.
    pub fn source(&self) -> impl ListSource {
        let resource = self.resource;
        self.client
            .source(move |api, query| async move { api.resource(resource).list(query).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transport::Method;
    use crate::testing::ScriptedTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn echo_client() -> (ApiClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(|request| {
            Ok(json!({ "items": [{ "path": request.path }] }))
        }));
        (ApiClient::from_arc(transport.clone()), transport)
    }

    #[test]
    fn test_resource_names_round_trip() {
        for resource in Resource::ALL {
            assert_eq!(resource.name().parse::<Resource>().unwrap(), resource);
            assert_eq!(resource.path().parse::<Resource>().unwrap(), resource);
        }
        assert_eq!("Chemistry-Tasks".parse::<Resource>().unwrap(), Resource::ChemistryTasks);
        assert_eq!("/lines/".parse::<Resource>().unwrap(), Resource::Lines);
    }

    #[test]
    fn test_unknown_resource() {
        let err = "widgets".parse::<Resource>().unwrap_err();
        assert_eq!(err.to_string(), "unknown resource 'widgets'");
    }

    #[tokio::test]
    async fn test_crud_routes() {
        let (client, transport) = echo_client();
        let lines = client.resource(Resource::Lines);

        lines.list(QuerySpec::new().with("status", "active")).await.unwrap();
        lines.get("4").await.unwrap();
        lines.create(json!({ "name": "Линия 5" })).await.unwrap();
        lines.update("4", json!({ "name": "Линия 4" })).await.unwrap();
        lines.delete("4").await.unwrap();
        lines.action("4", "open", None).await.unwrap();
        lines.view("4", "history").await.unwrap();

        let sent: Vec<(Method, String)> = transport
            .requests()
            .into_iter()
            .map(|r| (r.method, r.path))
            .collect();
        assert_eq!(
            sent,
            vec![
                (Method::Get, "lines/".to_string()),
                (Method::Get, "lines/4/".to_string()),
                (Method::Post, "lines/".to_string()),
                (Method::Patch, "lines/4/".to_string()),
                (Method::Delete, "lines/4/".to_string()),
                (Method::Post, "lines/4/open/".to_string()),
                (Method::Get, "lines/4/history/".to_string()),
            ]
        );
        assert_eq!(transport.requests()[0].query, QuerySpec::new().with("status", "active"));
    }

    #[tokio::test]
    async fn test_nested_collection_paths() {
        let (client, transport) = echo_client();
        client
            .resource(Resource::ChemistryTasks)
            .action("12", "confirm", Some(json!({})))
            .await
            .unwrap();
        client
            .resource(Resource::WarehouseBatches)
            .list(QuerySpec::new())
            .await
            .unwrap();
        assert_eq!(
            transport.paths(),
            vec!["chemistry/tasks/12/confirm/", "warehouse/batches/"]
        );
    }

    #[tokio::test]
    async fn test_ids_are_encoded() {
        let (client, transport) = echo_client();
        client.resource(Resource::Clients).get("a/b c").await.unwrap();
        assert_eq!(transport.paths(), vec!["clients/a%2Fb%20c/"]);
    }

    #[tokio::test]
    async fn test_list_not_found_is_error() {
        let client = ApiClient::new(ScriptedTransport::new(|_| {
            Err(ErrorEnvelope::new(ErrorKind::NotFoundOnRead, "not found"))
        }));
        let err = client.resource(Resource::Sales).list(QuerySpec::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFoundOnRead);
    }
}
