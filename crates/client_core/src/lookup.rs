use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{City, CityRef, Warehouse, WarehouseType},
    protocol::{
        CitySearchResponse, WarehouseListResponse, GET_WAREHOUSES_ROUTE, SEARCH_CITIES_ROUTE,
    },
};
use tracing::debug;
use url::Url;

use crate::error::LookupError;

const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(15);

/// Remote carrier directory consumed by the delivery controller.
#[async_trait]
pub trait CarrierLookup: Send + Sync {
    async fn search_cities(&self, query: &str) -> Result<Vec<City>, LookupError>;

    /// `kind == None` lists branches and lockers together.
    async fn list_warehouses(
        &self,
        city_ref: &CityRef,
        kind: Option<WarehouseType>,
    ) -> Result<Vec<Warehouse>, LookupError>;
}

/// Single-attempt JSON lookups against the storefront's `/orders/np/*` endpoints.
pub struct HttpCarrierLookup {
    http: Client,
    base_url: Url,
}

impl HttpCarrierLookup {
    pub fn new(base_url: &str) -> Result<Self, LookupError> {
        Self::with_timeout(base_url, DEFAULT_LOOKUP_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, LookupError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LookupError::Transport)?;
        Ok(Self::with_client(http, Url::parse(base_url)?))
    }

    /// `base_url` may carry a path prefix such as `http://host/shop`; routes resolve under it.
    pub fn with_client(http: Client, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { http, base_url }
    }

    fn endpoint(&self, route: &str) -> Result<Url, LookupError> {
        Ok(self.base_url.join(route.trim_start_matches('/'))?)
    }
}

#[async_trait]
impl CarrierLookup for HttpCarrierLookup {
    async fn search_cities(&self, query: &str) -> Result<Vec<City>, LookupError> {
        let url = self.endpoint(SEARCH_CITIES_ROUTE)?;
        debug!(%url, query, "lookup: searching cities");
        let response: CitySearchResponse = self
            .http
            .get(url)
            .query(&[("query", query)])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(LookupError::from_reqwest)?
            .json()
            .await
            .map_err(LookupError::from_reqwest)?;

        if !response.success {
            return Err(LookupError::Rejected);
        }
        Ok(response.cities)
    }

    async fn list_warehouses(
        &self,
        city_ref: &CityRef,
        kind: Option<WarehouseType>,
    ) -> Result<Vec<Warehouse>, LookupError> {
        let url = self.endpoint(GET_WAREHOUSES_ROUTE)?;
        debug!(%url, city_ref = city_ref.as_str(), "lookup: listing warehouses");
        let response: WarehouseListResponse = self
            .http
            .get(url)
            .query(&[
                ("city_ref", city_ref.as_str()),
                ("type", WarehouseType::query_value(kind)),
            ])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(LookupError::from_reqwest)?
            .json()
            .await
            .map_err(LookupError::from_reqwest)?;

        if !response.success {
            return Err(LookupError::Rejected);
        }
        Ok(response.warehouses)
    }
}
