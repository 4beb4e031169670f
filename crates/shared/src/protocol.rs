use serde::{Deserialize, Serialize};

use crate::domain::{City, Warehouse};

pub const SEARCH_CITIES_ROUTE: &str = "/orders/np/search-cities/";
pub const GET_WAREHOUSES_ROUTE: &str = "/orders/np/get-warehouses/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitySearchQuery {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseListQuery {
    #[serde(default)]
    pub city_ref: String,
    /// `warehouse`, `postomat` or empty for either.
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitySearchResponse {
    pub success: bool,
    #[serde(default)]
    pub cities: Vec<City>,
}

impl CitySearchResponse {
    pub fn rejected() -> Self {
        Self {
            success: false,
            cities: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseListResponse {
    pub success: bool,
    #[serde(default)]
    pub warehouses: Vec<Warehouse>,
}

impl WarehouseListResponse {
    pub fn rejected() -> Self {
        Self {
            success: false,
            warehouses: Vec::new(),
        }
    }
}
