use super::*;
use async_trait::async_trait;
use axum::{body, body::Body, http::Request};
use shared::domain::{City, Warehouse, WarehouseRef};
use tokio::sync::Mutex;
use tower::ServiceExt;

#[derive(Default)]
struct StubDirectory {
    city_queries: Mutex<Vec<String>>,
    warehouse_requests: Mutex<Vec<(String, Option<WarehouseType>)>>,
}

#[async_trait]
impl CarrierDirectory for StubDirectory {
    async fn search_cities(&self, query: &str) -> Vec<City> {
        self.city_queries.lock().await.push(query.to_string());
        vec![City {
            city_ref: CityRef::new("city-1"),
            present: "Київ".to_string(),
            main_description: "Київ".to_string(),
        }]
    }

    async fn get_warehouses(
        &self,
        city_ref: &CityRef,
        kind: Option<WarehouseType>,
    ) -> Vec<Warehouse> {
        self.warehouse_requests
            .lock()
            .await
            .push((city_ref.to_string(), kind));
        vec![Warehouse {
            warehouse_ref: WarehouseRef::new("wh-1"),
            number: 1,
            description: "Відділення №1".to_string(),
            short_address: "Київ, Хрещатик, 22".to_string(),
            category_of_warehouse: "Branch".to_string(),
        }]
    }
}

fn test_app() -> (Router, Arc<StubDirectory>) {
    let directory = Arc::new(StubDirectory::default());
    let app = build_router(AppState {
        directory: directory.clone(),
    });
    (app, directory)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::get(uri).body(Body::empty()).expect("request");
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, serde_json::from_slice(&body).expect("json"))
}

#[tokio::test]
async fn healthz_reports_ok() {
    let (app, _directory) = test_app();
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn short_city_query_is_rejected_without_carrier_call() {
    let (app, directory) = test_app();
    let (status, body) = get_json(app, "/orders/np/search-cities/?query=%20%D0%9A%20").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["cities"], serde_json::json!([]));
    assert!(directory.city_queries.lock().await.is_empty());
}

#[tokio::test]
async fn city_search_returns_trimmed_query_results() {
    let (app, directory) = test_app();
    let (status, body) = get_json(app, "/orders/np/search-cities/?query=%20%D0%9A%D0%B8%20").await;
    assert_eq!(status, StatusCode::OK);

    let response: CitySearchResponse = serde_json::from_value(body).expect("response");
    assert!(response.success);
    assert_eq!(response.cities[0].present, "Київ");
    assert_eq!(*directory.city_queries.lock().await, vec!["Ки".to_string()]);
}

#[tokio::test]
async fn warehouses_require_city_ref() {
    let (app, directory) = test_app();
    let (status, body) = get_json(app, "/orders/np/get-warehouses/?city_ref=&type=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(directory.warehouse_requests.lock().await.is_empty());
}

#[tokio::test]
async fn warehouses_forward_city_and_type() {
    let (app, directory) = test_app();
    let (status, body) =
        get_json(app.clone(), "/orders/np/get-warehouses/?city_ref=city-1&type=postomat").await;
    assert_eq!(status, StatusCode::OK);
    let response: WarehouseListResponse = serde_json::from_value(body).expect("response");
    assert!(response.success);
    assert_eq!(response.warehouses[0].number, 1);
    assert_eq!(body_camel_case_keys(&response), vec!["categoryOfWarehouse", "shortAddress"]);

    let (status, _body) = get_json(app, "/orders/np/get-warehouses/?city_ref=city-1&type=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        *directory.warehouse_requests.lock().await,
        vec![
            ("city-1".to_string(), Some(WarehouseType::Postomat)),
            ("city-1".to_string(), None),
        ]
    );
}

fn body_camel_case_keys(response: &WarehouseListResponse) -> Vec<String> {
    let value = serde_json::to_value(&response.warehouses[0]).expect("json");
    let mut keys: Vec<String> = value
        .as_object()
        .expect("object")
        .keys()
        .filter(|key| key.chars().any(|c| c.is_ascii_uppercase()))
        .cloned()
        .collect();
    keys.sort();
    keys
}

#[tokio::test]
async fn unknown_warehouse_type_is_a_validation_error() {
    let (app, directory) = test_app();
    let (status, body) =
        get_json(app, "/orders/np/get-warehouses/?city_ref=city-1&type=depot").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");
    assert!(directory.warehouse_requests.lock().await.is_empty());
}
