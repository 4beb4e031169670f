use std::{sync::Arc, time::Duration};

use shared::domain::{
    City, CityRef, DeliveryMethod, PaymentMethod, Warehouse, WarehouseRef, WarehouseType,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub mod debounce;
pub mod error;
pub mod filter;
pub mod lookup;
pub mod order_form;
pub mod policy;
pub mod view;

pub use error::{LookupError, OrderFieldError};
pub use lookup::{CarrierLookup, HttpCarrierLookup};
pub use order_form::OrderFields;
pub use policy::{BranchTypeMode, FieldLayout, PaymentOption};
pub use view::{DeliveryView, FormField, FormSnapshot, SnapshotView, WarehousePanel};

use debounce::Debouncer;
use filter::filter_warehouses;
use policy::{
    address_label_for_type, compute_visible_payment_methods, resolve_checked_payment,
    warehouse_type_title,
};

pub const CITY_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
pub const MIN_CITY_QUERY_CHARS: usize = 2;
pub const PICKUP_CITY: &str = "Монастирище";
pub const PICKUP_ADDRESS: &str = "Україна, Черкаська область, м.Монастирище, вул. Соборна 126Д";
const SELECT_CITY_FIRST_NOTICE: &str = "Choose a city first";

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub debounce: Duration,
    pub min_query_chars: usize,
    pub branch_type_mode: BranchTypeMode,
    /// Payment options rendered in the form, in display order.
    pub payment_methods: Vec<PaymentMethod>,
    pub pickup_city: String,
    pub pickup_address: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            debounce: CITY_SEARCH_DEBOUNCE,
            min_query_chars: MIN_CITY_QUERY_CHARS,
            branch_type_mode: BranchTypeMode::Inferred,
            payment_methods: PaymentMethod::ALL.to_vec(),
            pickup_city: PICKUP_CITY.to_string(),
            pickup_address: PICKUP_ADDRESS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct DeliveryFields {
    city: String,
    delivery_type: String,
    address: String,
    np_city_ref: String,
    np_warehouse_ref: String,
}

impl DeliveryFields {
    fn slot(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::DeliveryCity => &mut self.city,
            FormField::DeliveryType => &mut self.delivery_type,
            FormField::DeliveryAddress => &mut self.address,
            FormField::NpCityRef => &mut self.np_city_ref,
            FormField::NpWarehouseRef => &mut self.np_warehouse_ref,
        }
    }
}

struct ControllerState {
    delivery_method: DeliveryMethod,
    fields: DeliveryFields,
    selected_city: Option<CityRef>,
    warehouse_type: Option<WarehouseType>,
    cached_warehouses: Vec<Warehouse>,
    selected_warehouse: Option<WarehouseRef>,
    payment_method: Option<PaymentMethod>,
    city_search_token: u64,
    warehouse_token: u64,
    city_debounce: Debouncer,
}

impl ControllerState {
    fn set_field(&mut self, view: &dyn DeliveryView, field: FormField, value: &str) {
        *self.fields.slot(field) = value.to_string();
        view.set_value(field, value);
    }

    fn reset(
        &mut self,
        method: DeliveryMethod,
        config: &ControllerConfig,
        view: &dyn DeliveryView,
    ) {
        self.delivery_method = method;
        self.city_debounce.cancel();
        self.city_search_token += 1;
        self.warehouse_token += 1;
        self.selected_city = None;
        self.warehouse_type = None;
        self.cached_warehouses.clear();
        self.selected_warehouse = None;
        for field in FormField::ALL {
            self.set_field(view, field, "");
        }

        view.hide_city_suggestions();
        view.hide_warehouses();
        view.apply_layout(&FieldLayout::for_method(method, config.branch_type_mode));

        if method == DeliveryMethod::Pickup {
            self.set_field(view, FormField::DeliveryAddress, &config.pickup_address);
            self.set_field(view, FormField::DeliveryCity, &config.pickup_city);
        }

        self.refresh_payment_options(config, view);
    }

    fn refresh_payment_options(&mut self, config: &ControllerConfig, view: &dyn DeliveryView) {
        let options =
            compute_visible_payment_methods(self.delivery_method, &config.payment_methods);
        let checked = resolve_checked_payment(self.payment_method, &options);
        if checked != self.payment_method {
            debug!(
                previous = ?self.payment_method,
                current = ?checked,
                "delivery: payment selection moved to a visible option"
            );
        }
        if checked.is_none() {
            warn!(
                delivery = %self.delivery_method,
                "delivery: no configured payment method is offered"
            );
        }
        self.payment_method = checked;
        view.render_payment_options(&options, checked);
    }

    /// Forgets the chosen city and everything derived from it.
    fn drop_city_selection(&mut self, mode: BranchTypeMode, view: &dyn DeliveryView) {
        self.selected_city = None;
        self.warehouse_token += 1;
        self.cached_warehouses.clear();
        self.selected_warehouse = None;
        self.set_field(view, FormField::NpCityRef, "");
        self.set_field(view, FormField::DeliveryAddress, "");
        self.set_field(view, FormField::NpWarehouseRef, "");
        if mode == BranchTypeMode::Inferred {
            self.set_field(view, FormField::DeliveryType, "");
        }
        view.hide_warehouses();
    }
}

/// Owns delivery-method selection, the carrier city/branch lookups and payment gating
/// for one order form.
pub struct DeliveryController {
    config: ControllerConfig,
    view: Arc<dyn DeliveryView>,
    lookup: Arc<dyn CarrierLookup>,
    state: Mutex<ControllerState>,
}

impl DeliveryController {
    /// Builds the controller and renders the form for the pre-selected options.
    pub fn new(
        config: ControllerConfig,
        initial_method: DeliveryMethod,
        initial_payment: Option<PaymentMethod>,
        view: Arc<dyn DeliveryView>,
        lookup: Arc<dyn CarrierLookup>,
    ) -> Arc<Self> {
        let mut state = ControllerState {
            delivery_method: initial_method,
            fields: DeliveryFields::default(),
            selected_city: None,
            warehouse_type: None,
            cached_warehouses: Vec::new(),
            selected_warehouse: None,
            payment_method: initial_payment,
            city_search_token: 0,
            warehouse_token: 0,
            city_debounce: Debouncer::new(config.debounce),
        };
        state.reset(initial_method, &config, view.as_ref());
        Arc::new(Self {
            config,
            view,
            lookup,
            state: Mutex::new(state),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub async fn on_delivery_method_change(&self, method: DeliveryMethod) {
        let mut state = self.state.lock().await;
        info!(method = %method, "delivery: method changed");
        state.reset(method, &self.config, self.view.as_ref());
    }

    /// Records the typed city text and schedules a debounced carrier search.
    pub async fn on_city_input_changed(self: &Arc<Self>, text: &str) {
        let mut state = self.state.lock().await;
        if state.delivery_method == DeliveryMethod::Pickup {
            debug!("delivery: pickup city is fixed");
            return;
        }

        let edits_chosen_city = state.selected_city.is_some() && state.fields.city != text;
        self.write_field(&mut state, FormField::DeliveryCity, text);
        state.city_search_token += 1;
        if edits_chosen_city {
            info!("delivery: city text edited, dropping chosen city and branch");
            state.drop_city_selection(self.config.branch_type_mode, self.view.as_ref());
        }

        if state.delivery_method != DeliveryMethod::NovaPoshta {
            state.city_debounce.cancel();
            return;
        }

        let token = state.city_search_token;
        let query = text.trim().to_string();
        let controller = Arc::clone(self);
        state.city_debounce.schedule(async move {
            controller.run_city_search(query, token).await;
        });
    }

    /// Searches immediately, bypassing the debounce timer.
    pub async fn search_cities(&self, query: &str) {
        let token = {
            let mut state = self.state.lock().await;
            state.city_debounce.cancel();
            state.city_search_token += 1;
            state.city_search_token
        };
        self.run_city_search(query.trim().to_string(), token).await;
    }

    async fn run_city_search(&self, query: String, token: u64) {
        {
            let state = self.state.lock().await;
            if state.city_search_token != token {
                debug!(query = %query, "delivery: city search superseded before start");
                return;
            }
            if state.delivery_method != DeliveryMethod::NovaPoshta {
                return;
            }
            if query.chars().count() < self.config.min_query_chars {
                self.view.hide_city_suggestions();
                return;
            }
        }

        debug!(query = %query, token, "delivery: searching cities");
        let result = self.lookup.search_cities(&query).await;

        let state = self.state.lock().await;
        if state.city_search_token != token || state.delivery_method != DeliveryMethod::NovaPoshta
        {
            debug!(query = %query, token, "delivery: dropping stale city search response");
            return;
        }
        match result {
            Ok(cities) if !cities.is_empty() => self.view.show_city_suggestions(&cities),
            Ok(_) => self.view.hide_city_suggestions(),
            Err(err) => {
                error!(query = %query, "delivery: city search failed: {err}");
                self.view.hide_city_suggestions();
            }
        }
    }

    pub async fn on_city_selected(&self, city: City) {
        let should_load = {
            let mut state = self.state.lock().await;
            if state.delivery_method != DeliveryMethod::NovaPoshta {
                warn!(
                    method = %state.delivery_method,
                    "delivery: city selection ignored outside carrier lookup"
                );
                return;
            }
            info!(city_ref = %city.city_ref, city = %city.present, "delivery: city selected");

            state.city_debounce.cancel();
            state.city_search_token += 1;
            state.warehouse_token += 1;
            state.selected_city = Some(city.city_ref.clone());
            state.cached_warehouses.clear();
            state.selected_warehouse = None;
            self.write_field(&mut state, FormField::DeliveryCity, city.field_text());
            self.write_field(&mut state, FormField::NpCityRef, city.city_ref.as_str());
            self.write_field(&mut state, FormField::DeliveryAddress, "");
            self.write_field(&mut state, FormField::NpWarehouseRef, "");
            self.view.hide_city_suggestions();
            self.view.hide_warehouses();

            match self.config.branch_type_mode {
                BranchTypeMode::Inferred => true,
                BranchTypeMode::Explicit => state.warehouse_type.is_some(),
            }
        };

        if should_load {
            self.load_warehouses().await;
        } else {
            debug!("delivery: waiting for branch type before listing warehouses");
        }
    }

    /// Explicit branch-type selector changed; `None` means the selector was cleared.
    pub async fn on_warehouse_type_changed(&self, kind: Option<WarehouseType>) {
        let should_load = {
            let mut state = self.state.lock().await;
            if self.config.branch_type_mode != BranchTypeMode::Explicit {
                warn!("delivery: branch type selector is not used in inferred mode");
                return;
            }
            if state.delivery_method != DeliveryMethod::NovaPoshta {
                return;
            }

            state.warehouse_type = kind;
            state.warehouse_token += 1;
            state.cached_warehouses.clear();
            state.selected_warehouse = None;
            self.write_field(
                &mut state,
                FormField::DeliveryType,
                WarehouseType::query_value(kind),
            );
            self.write_field(&mut state, FormField::DeliveryAddress, "");
            self.write_field(&mut state, FormField::NpWarehouseRef, "");
            self.view.set_address_label(address_label_for_type(kind));

            match (&state.selected_city, kind) {
                (Some(_), Some(_)) => true,
                (None, Some(_)) => {
                    self.view.hide_warehouses();
                    self.view.show_notice(SELECT_CITY_FIRST_NOTICE);
                    false
                }
                (_, None) => {
                    self.view.hide_warehouses();
                    false
                }
            }
        };

        if should_load {
            self.load_warehouses().await;
        }
    }

    /// Fetches branches for the selected city; failures end up in the panel, never as errors.
    pub async fn load_warehouses(&self) {
        let (city_ref, kind, token) = {
            let mut state = self.state.lock().await;
            let Some(city_ref) = state.selected_city.clone() else {
                warn!("delivery: load_warehouses called without a selected city");
                return;
            };
            if self.config.branch_type_mode == BranchTypeMode::Explicit
                && state.warehouse_type.is_none()
            {
                warn!("delivery: load_warehouses called before a branch type was chosen");
                return;
            }
            state.warehouse_token += 1;
            self.view.show_warehouses(WarehousePanel::Loading);
            (city_ref, state.warehouse_type, state.warehouse_token)
        };

        debug!(
            city_ref = %city_ref,
            kind = WarehouseType::query_value(kind),
            "delivery: listing warehouses"
        );
        let result = self.lookup.list_warehouses(&city_ref, kind).await;

        let mut state = self.state.lock().await;
        if state.warehouse_token != token {
            debug!(city_ref = %city_ref, "delivery: dropping stale warehouse response");
            return;
        }
        match result {
            Ok(warehouses) if !warehouses.is_empty() => {
                info!(
                    city_ref = %city_ref,
                    count = warehouses.len(),
                    "delivery: warehouses loaded"
                );
                state.cached_warehouses = warehouses;
                self.view.show_warehouses(WarehousePanel::Items {
                    warehouses: &state.cached_warehouses,
                    selected: None,
                });
            }
            Ok(_) => {
                warn!(city_ref = %city_ref, "delivery: no warehouses found");
                self.view.show_warehouses(WarehousePanel::NotFound);
            }
            Err(err) => {
                error!(city_ref = %city_ref, "delivery: warehouse lookup failed: {err}");
                self.view.show_warehouses(WarehousePanel::Error);
            }
        }
    }

    pub async fn on_warehouse_selected(&self, warehouse: &Warehouse) {
        let mut state = self.state.lock().await;
        let known = state
            .cached_warehouses
            .iter()
            .any(|cached| cached.warehouse_ref == warehouse.warehouse_ref);
        if !known {
            warn!(
                warehouse_ref = %warehouse.warehouse_ref,
                "delivery: ignoring selection of a warehouse outside the current list"
            );
            return;
        }

        let kind = warehouse.kind();
        let label = format!(
            "{} №{}: {}",
            warehouse_type_title(kind),
            warehouse.number,
            warehouse.description
        );
        self.write_field(&mut state, FormField::DeliveryAddress, &label);
        self.write_field(
            &mut state,
            FormField::NpWarehouseRef,
            warehouse.warehouse_ref.as_str(),
        );
        if self.config.branch_type_mode == BranchTypeMode::Inferred {
            self.write_field(&mut state, FormField::DeliveryType, kind.as_form_value());
        }
        state.selected_warehouse = Some(warehouse.warehouse_ref.clone());
        info!(warehouse_ref = %warehouse.warehouse_ref, address = %label, "delivery: warehouse selected");

        self.view.show_warehouses(WarehousePanel::Items {
            warehouses: &state.cached_warehouses,
            selected: state.selected_warehouse.as_ref(),
        });
    }

    /// Free text typed into the address field.
    pub async fn on_address_input_typed(&self, text: &str) {
        let mut state = self.state.lock().await;
        if state.delivery_method == DeliveryMethod::Pickup {
            debug!("delivery: pickup address is fixed");
            return;
        }
        if self.is_branch_picker_read_only(&state) {
            debug!("delivery: address field is read-only for explicit branch selection");
            return;
        }

        self.write_field(&mut state, FormField::DeliveryAddress, text);
        if state.delivery_method != DeliveryMethod::NovaPoshta {
            return;
        }
        if state.selected_warehouse.take().is_some() {
            self.write_field(&mut state, FormField::NpWarehouseRef, "");
            if self.config.branch_type_mode == BranchTypeMode::Inferred {
                self.write_field(&mut state, FormField::DeliveryType, "");
            }
        }
        self.render_filtered(&state, text);
    }

    /// Re-opens the branch list when the address field gains focus.
    pub async fn on_address_focused(&self) {
        let state = self.state.lock().await;
        if state.delivery_method != DeliveryMethod::NovaPoshta
            || state.cached_warehouses.is_empty()
        {
            return;
        }
        if state.selected_warehouse.is_some() || self.is_branch_picker_read_only(&state) {
            self.view.show_warehouses(WarehousePanel::Items {
                warehouses: &state.cached_warehouses,
                selected: state.selected_warehouse.as_ref(),
            });
        } else {
            self.render_filtered(&state, &state.fields.address);
        }
    }

    /// Click outside the lookup widgets.
    pub async fn dismiss_popups(&self) {
        let _state = self.state.lock().await;
        self.view.hide_city_suggestions();
        self.view.hide_warehouses();
    }

    pub async fn on_payment_method_checked(&self, method: PaymentMethod) {
        let mut state = self.state.lock().await;
        let options =
            compute_visible_payment_methods(state.delivery_method, &self.config.payment_methods);
        let offered = options
            .iter()
            .any(|option| option.method == method && option.visible);
        if offered {
            state.payment_method = Some(method);
        } else {
            warn!(
                payment = %method,
                delivery = %state.delivery_method,
                "delivery: payment method not offered for delivery method"
            );
        }
        self.view
            .render_payment_options(&options, state.payment_method);
    }

    /// Field values the enclosing order form submits.
    pub async fn submission(&self) -> OrderFields {
        let state = self.state.lock().await;
        OrderFields {
            delivery_method: state.delivery_method,
            delivery_city: state.fields.city.clone(),
            delivery_type: state.fields.delivery_type.clone(),
            delivery_address: state.fields.address.clone(),
            np_city_ref: state.fields.np_city_ref.clone(),
            np_warehouse_ref: state.fields.np_warehouse_ref.clone(),
            payment_method: state.payment_method,
        }
    }

    pub async fn delivery_method(&self) -> DeliveryMethod {
        self.state.lock().await.delivery_method
    }

    pub async fn selected_city(&self) -> Option<CityRef> {
        self.state.lock().await.selected_city.clone()
    }

    pub async fn cached_warehouses(&self) -> Vec<Warehouse> {
        self.state.lock().await.cached_warehouses.clone()
    }

    fn render_filtered(&self, state: &ControllerState, text: &str) {
        if state.cached_warehouses.is_empty() {
            return;
        }
        let matches: Vec<Warehouse> = filter_warehouses(&state.cached_warehouses, text)
            .into_iter()
            .cloned()
            .collect();
        debug!(
            matched = matches.len(),
            total = state.cached_warehouses.len(),
            "delivery: filtered warehouses"
        );
        if matches.is_empty() {
            self.view.show_warehouses(WarehousePanel::NoMatches);
        } else {
            self.view.show_warehouses(WarehousePanel::Items {
                warehouses: &matches,
                selected: None,
            });
        }
    }

    fn is_branch_picker_read_only(&self, state: &ControllerState) -> bool {
        state.delivery_method == DeliveryMethod::NovaPoshta
            && self.config.branch_type_mode == BranchTypeMode::Explicit
    }

    fn write_field(&self, state: &mut ControllerState, field: FormField, value: &str) {
        state.set_field(self.view.as_ref(), field, value);
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
