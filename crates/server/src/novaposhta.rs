//! Nova Poshta public JSON API client backing the lookup endpoints.

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use shared::domain::{City, CityRef, Warehouse, WarehouseRef, WarehouseType};
use thiserror::Error;
use tracing::{error, warn};

use crate::config::Settings;

/// `TypeOfWarehouseRef` the carrier uses for parcel lockers.
pub const POSTOMAT_TYPE_REF: &str = "9a68df70-0267-42a8-bb5c-37f427e36ee4";

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("carrier request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("carrier rejected request: {0:?}")]
    Carrier(Vec<String>),
}

/// Carrier-side city and branch directory. Failures degrade to empty lists.
#[async_trait]
pub trait CarrierDirectory: Send + Sync {
    async fn search_cities(&self, query: &str) -> Vec<City>;
    async fn get_warehouses(&self, city_ref: &CityRef, kind: Option<WarehouseType>)
        -> Vec<Warehouse>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest<'a> {
    api_key: &'a str,
    model_name: &'a str,
    called_method: &'a str,
    method_properties: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    success: bool,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawCity {
    #[serde(rename = "Ref")]
    city_ref: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawWarehouse {
    #[serde(rename = "Ref")]
    warehouse_ref: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    short_address: String,
    #[serde(default)]
    number: String,
    #[serde(default)]
    category_of_warehouse: String,
}

pub struct NovaPoshtaClient {
    http: Client,
    api_url: String,
    api_key: String,
    city_search_limit: u32,
    warehouse_limit: u32,
}

impl NovaPoshtaClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(settings.carrier_timeout())
            .build()?;
        Ok(Self {
            http,
            api_url: settings.novaposhta_api_url.clone(),
            api_key: settings.novaposhta_api_key.clone(),
            city_search_limit: settings.city_search_limit,
            warehouse_limit: settings.warehouse_limit,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        model_name: &str,
        called_method: &str,
        method_properties: Value,
    ) -> Result<Vec<T>, DirectoryError> {
        let response: ApiResponse<T> = self
            .http
            .post(&self.api_url)
            .json(&ApiRequest {
                api_key: &self.api_key,
                model_name,
                called_method,
                method_properties,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.success {
            Ok(response.data)
        } else {
            Err(DirectoryError::Carrier(response.errors))
        }
    }
}

#[async_trait]
impl CarrierDirectory for NovaPoshtaClient {
    async fn search_cities(&self, query: &str) -> Vec<City> {
        let properties = json!({
            "FindByString": query,
            "Limit": self.city_search_limit,
        });
        match self.call::<RawCity>("Address", "getCities", properties).await {
            Ok(cities) => cities
                .into_iter()
                .map(|raw| City {
                    city_ref: CityRef::new(raw.city_ref),
                    present: raw.description.clone(),
                    main_description: raw.description,
                })
                .collect(),
            Err(err) => {
                error!(query, "novaposhta: city search failed: {err}");
                Vec::new()
            }
        }
    }

    async fn get_warehouses(
        &self,
        city_ref: &CityRef,
        kind: Option<WarehouseType>,
    ) -> Vec<Warehouse> {
        let mut properties = json!({
            "CityRef": city_ref.as_str(),
            "Limit": self.warehouse_limit,
        });
        if kind == Some(WarehouseType::Postomat) {
            properties["TypeOfWarehouseRef"] = Value::from(POSTOMAT_TYPE_REF);
        }

        match self
            .call::<RawWarehouse>("Address", "getWarehouses", properties)
            .await
        {
            Ok(warehouses) => warehouses.into_iter().filter_map(into_warehouse).collect(),
            Err(err) => {
                error!(city_ref = %city_ref, "novaposhta: warehouse listing failed: {err}");
                Vec::new()
            }
        }
    }
}

fn into_warehouse(raw: RawWarehouse) -> Option<Warehouse> {
    let Ok(number) = raw.number.trim().parse() else {
        warn!(
            warehouse_ref = %raw.warehouse_ref,
            number = %raw.number,
            "novaposhta: skipping warehouse with non-numeric number"
        );
        return None;
    };
    Some(Warehouse {
        warehouse_ref: WarehouseRef::new(raw.warehouse_ref),
        number,
        description: raw.description,
        short_address: raw.short_address,
        category_of_warehouse: raw.category_of_warehouse,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, routing::post, Json, Router};
    use tokio::{net::TcpListener, sync::Mutex};

    use super::*;

    type Captured = Arc<Mutex<Vec<Value>>>;

    async fn spawn_carrier(reply: Value) -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/v2.0/json/",
                post(
                    |State((captured, reply)): State<(Captured, Value)>,
                     Json(body): Json<Value>| async move {
                        captured.lock().await.push(body);
                        Json(reply)
                    },
                ),
            )
            .with_state((captured.clone(), reply));
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{addr}/v2.0/json/"), captured)
    }

    fn client(api_url: String) -> NovaPoshtaClient {
        let settings = Settings {
            novaposhta_api_url: api_url,
            novaposhta_api_key: "test-key".to_string(),
            ..Settings::default()
        };
        NovaPoshtaClient::from_settings(&settings).expect("client")
    }

    #[tokio::test]
    async fn city_search_maps_description_into_both_names() {
        let (url, captured) = spawn_carrier(json!({
            "success": true,
            "data": [{ "Ref": "city-1", "Description": "Київ", "Area": "ignored" }],
            "errors": []
        }))
        .await;

        let cities = client(url).search_cities("Ки").await;
        assert_eq!(
            cities,
            vec![City {
                city_ref: CityRef::new("city-1"),
                present: "Київ".to_string(),
                main_description: "Київ".to_string(),
            }]
        );

        let body = captured.lock().await[0].clone();
        assert_eq!(body["apiKey"], "test-key");
        assert_eq!(body["modelName"], "Address");
        assert_eq!(body["calledMethod"], "getCities");
        assert_eq!(body["methodProperties"]["FindByString"], "Ки");
        assert_eq!(body["methodProperties"]["Limit"], 20);
    }

    #[tokio::test]
    async fn postomat_listing_sends_type_ref_and_parses_numbers() {
        let (url, captured) = spawn_carrier(json!({
            "success": true,
            "data": [
                {
                    "Ref": "pm-1",
                    "Description": "Поштомат №7",
                    "ShortAddress": "Київ, Саксаганського, 1",
                    "Number": "7",
                    "CategoryOfWarehouse": "Postomat"
                },
                { "Ref": "broken", "Description": "No number", "Number": "" }
            ]
        }))
        .await;

        let warehouses = client(url)
            .get_warehouses(&CityRef::new("city-1"), Some(WarehouseType::Postomat))
            .await;
        assert_eq!(warehouses.len(), 1);
        assert_eq!(warehouses[0].number, 7);
        assert_eq!(warehouses[0].kind(), WarehouseType::Postomat);

        let body = captured.lock().await[0].clone();
        assert_eq!(body["calledMethod"], "getWarehouses");
        assert_eq!(body["methodProperties"]["CityRef"], "city-1");
        assert_eq!(body["methodProperties"]["TypeOfWarehouseRef"], POSTOMAT_TYPE_REF);
        assert_eq!(body["methodProperties"]["Limit"], 500);
    }

    #[tokio::test]
    async fn branch_listing_omits_type_ref() {
        let (url, captured) = spawn_carrier(json!({ "success": true, "data": [] })).await;
        let warehouses = client(url)
            .get_warehouses(&CityRef::new("city-1"), Some(WarehouseType::Warehouse))
            .await;
        assert!(warehouses.is_empty());
        let body = captured.lock().await[0].clone();
        assert!(body["methodProperties"].get("TypeOfWarehouseRef").is_none());
    }

    #[tokio::test]
    async fn carrier_errors_degrade_to_empty_list() {
        let (url, _captured) = spawn_carrier(json!({
            "success": false,
            "data": [],
            "errors": ["API key expired"]
        }))
        .await;
        assert!(client(url).search_cities("Київ").await.is_empty());

        let unreachable = {
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            let addr = listener.local_addr().expect("addr");
            format!("http://{addr}/v2.0/json/")
        };
        assert!(client(unreachable)
            .get_warehouses(&CityRef::new("city-1"), None)
            .await
            .is_empty());
    }
}
