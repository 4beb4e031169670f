use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use shared::{
    domain::{CityRef, WarehouseType},
    error::ApiError,
    protocol::{
        CitySearchQuery, CitySearchResponse, WarehouseListQuery, WarehouseListResponse,
        GET_WAREHOUSES_ROUTE, SEARCH_CITIES_ROUTE,
    },
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod novaposhta;

use config::load_settings;
use novaposhta::{CarrierDirectory, NovaPoshtaClient};

const MIN_CITY_QUERY_CHARS: usize = 2;

#[derive(Clone)]
struct AppState {
    directory: Arc<dyn CarrierDirectory>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings()?;
    if settings.novaposhta_api_key.is_empty() {
        warn!("APP__NOVAPOSHTA_API_KEY is not set; carrier lookups will be rejected");
    }
    let directory = NovaPoshtaClient::from_settings(&settings)?;
    let app = build_router(AppState {
        directory: Arc::new(directory),
    });

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "lookup server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(SEARCH_CITIES_ROUTE, get(search_cities))
        .route(GET_WAREHOUSES_ROUTE, get(get_warehouses))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn search_cities(
    State(state): State<AppState>,
    Query(q): Query<CitySearchQuery>,
) -> Json<CitySearchResponse> {
    let query = q.query.trim();
    if query.chars().count() < MIN_CITY_QUERY_CHARS {
        return Json(CitySearchResponse::rejected());
    }

    let cities = state.directory.search_cities(query).await;
    debug!(query, found = cities.len(), "np: city search");
    Json(CitySearchResponse {
        success: true,
        cities,
    })
}

async fn get_warehouses(
    State(state): State<AppState>,
    Query(q): Query<WarehouseListQuery>,
) -> Result<Json<WarehouseListResponse>, (StatusCode, Json<ApiError>)> {
    let city_ref = q.city_ref.trim();
    if city_ref.is_empty() {
        return Ok(Json(WarehouseListResponse::rejected()));
    }
    let kind = WarehouseType::parse_optional(&q.kind)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ApiError::validation(e.to_string()))))?;

    let warehouses = state
        .directory
        .get_warehouses(&CityRef::new(city_ref), kind)
        .await;
    debug!(city_ref, found = warehouses.len(), "np: warehouse listing");
    Ok(Json(WarehouseListResponse {
        success: true,
        warehouses,
    }))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
