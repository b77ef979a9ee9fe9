//! Stock balances for raw materials, chemistry and recipes.

use serde_json::Value;

use super::ApiClient;
use crate::compat::{Attempt, EndpointChain};
use crate::error::ErrorEnvelope;
use crate::transport::ApiRequest;

#[derive(Debug, Clone)]
pub struct MaterialsApi {
    client: ApiClient,
}

impl MaterialsApi {
    pub(super) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Raw-material balances.
    pub async fn balances(&self) -> Result<Value, ErrorEnvelope> {
        let chain = EndpointChain::new(
            "material balances",
            Attempt::raw(ApiRequest::get("materials/balances/")),
        )
        .fallback(Attempt::raw(ApiRequest::get("raw-materials/balances/")));

        self.client.run(chain).await
    }

    /// Balances of chemistry elements.
    pub async fn chemistry_balances(&self) -> Result<Value, ErrorEnvelope> {
        self.client.send(ApiRequest::get("chemistry/balances/")).await
    }

    /// Whether stock covers a recipe, with per-component shortfalls.
    pub async fn recipe_availability(&self, recipe_id: &str) -> Result<Value, ErrorEnvelope> {
        self.client
            .send(ApiRequest::get(format!(
                "recipes/{}/availability/",
                urlencoding::encode(recipe_id)
            )))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::ScriptedTransport;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_balances_fallback() {
        let transport = Arc::new(ScriptedTransport::new(|request| {
            if request.path == "materials/balances/" {
                Err(ErrorEnvelope::new(ErrorKind::NotFoundOnRead, "not found"))
            } else {
                Ok(json!([{ "raw_material": "Смола", "balance": 120, "unit": "кг" }]))
            }
        }));
        let materials = ApiClient::from_arc(transport.clone()).materials();

        let balances = materials.balances().await.unwrap();
        assert_eq!(balances[0]["balance"], json!(120));
        assert_eq!(transport.paths(), vec!["materials/balances/", "raw-materials/balances/"]);
    }

    #[tokio::test]
    async fn test_chemistry_and_availability_routes() {
        let transport = Arc::new(ScriptedTransport::new(|_| Ok(json!({ "available": true }))));
        let materials = ApiClient::from_arc(transport.clone()).materials();

        materials.chemistry_balances().await.unwrap();
        let availability = materials.recipe_availability("15").await.unwrap();
        assert_eq!(availability["available"], json!(true));
        assert_eq!(
            transport.paths(),
            vec!["chemistry/balances/", "recipes/15/availability/"]
        );
    }
}
