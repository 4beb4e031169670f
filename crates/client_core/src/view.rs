//! Rendering capabilities the delivery controller drives, and an in-memory implementation.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use shared::domain::{City, PaymentMethod, Warehouse, WarehouseRef};

use crate::policy::{FieldLayout, PaymentOption};

/// Order-form inputs written by the controller, named after their form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    DeliveryCity,
    DeliveryType,
    DeliveryAddress,
    NpCityRef,
    NpWarehouseRef,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        FormField::DeliveryCity,
        FormField::DeliveryType,
        FormField::DeliveryAddress,
        FormField::NpCityRef,
        FormField::NpWarehouseRef,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FormField::DeliveryCity => "delivery_city",
            FormField::DeliveryType => "delivery_type",
            FormField::DeliveryAddress => "delivery_address",
            FormField::NpCityRef => "np_city_ref",
            FormField::NpWarehouseRef => "np_warehouse_ref",
        }
    }
}

/// Content of the branch/locker result area.
#[derive(Debug, Clone, Copy)]
pub enum WarehousePanel<'a> {
    Loading,
    NotFound,
    /// The cached list is non-empty but the typed filter matches nothing.
    NoMatches,
    Error,
    Items {
        warehouses: &'a [Warehouse],
        selected: Option<&'a WarehouseRef>,
    },
}

pub trait DeliveryView: Send + Sync {
    fn set_value(&self, field: FormField, value: &str);
    fn apply_layout(&self, layout: &FieldLayout);
    fn set_address_label(&self, label: &str);
    fn show_city_suggestions(&self, cities: &[City]);
    fn hide_city_suggestions(&self);
    fn show_warehouses(&self, panel: WarehousePanel<'_>);
    fn hide_warehouses(&self);
    fn render_payment_options(&self, options: &[PaymentOption], checked: Option<PaymentMethod>);
    /// Inline hint shown next to the address field, e.g. asking for a city first.
    fn show_notice(&self, text: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelState {
    Hidden,
    Loading,
    NotFound,
    NoMatches,
    Error,
    Items {
        warehouses: Vec<Warehouse>,
        selected: Option<WarehouseRef>,
    },
}

/// Everything a [`SnapshotView`] has been told to show.
#[derive(Debug, Clone)]
pub struct FormSnapshot {
    pub values: HashMap<FormField, String>,
    pub layout: Option<FieldLayout>,
    pub address_label: String,
    pub city_suggestions: Option<Vec<City>>,
    pub warehouses: PanelState,
    pub payment_options: Vec<PaymentOption>,
    pub checked_payment: Option<PaymentMethod>,
    pub notice: Option<String>,
    pub renders: usize,
}

impl Default for FormSnapshot {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            layout: None,
            address_label: String::new(),
            city_suggestions: None,
            warehouses: PanelState::Hidden,
            payment_options: Vec::new(),
            checked_payment: None,
            notice: None,
            renders: 0,
        }
    }
}

impl FormSnapshot {
    pub fn value(&self, field: FormField) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn visible_payment_methods(&self) -> Vec<PaymentMethod> {
        self.payment_options
            .iter()
            .filter(|option| option.visible)
            .map(|option| option.method)
            .collect()
    }

    pub fn payment_label(&self, method: PaymentMethod) -> Option<&str> {
        self.payment_options
            .iter()
            .find(|option| option.method == method)
            .map(|option| option.label.as_str())
    }

    pub fn listed_warehouses(&self) -> &[Warehouse] {
        match &self.warehouses {
            PanelState::Items { warehouses, .. } => warehouses,
            _ => &[],
        }
    }
}

/// Thread-safe in-memory view; clones share the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotView {
    inner: Arc<Mutex<FormSnapshot>>,
}

impl SnapshotView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> FormSnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, FormSnapshot> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self, apply: impl FnOnce(&mut FormSnapshot)) {
        let mut snapshot = self.lock();
        apply(&mut snapshot);
        snapshot.renders += 1;
    }
}

impl DeliveryView for SnapshotView {
    fn set_value(&self, field: FormField, value: &str) {
        self.update(|s| {
            s.values.insert(field, value.to_string());
        });
    }

    fn apply_layout(&self, layout: &FieldLayout) {
        self.update(|s| {
            s.address_label = layout.address_label.to_string();
            s.layout = Some(layout.clone());
            s.notice = None;
        });
    }

    fn set_address_label(&self, label: &str) {
        self.update(|s| s.address_label = label.to_string());
    }

    fn show_city_suggestions(&self, cities: &[City]) {
        self.update(|s| s.city_suggestions = Some(cities.to_vec()));
    }

    fn hide_city_suggestions(&self) {
        self.update(|s| s.city_suggestions = None);
    }

    fn show_warehouses(&self, panel: WarehousePanel<'_>) {
        let state = match panel {
            WarehousePanel::Loading => PanelState::Loading,
            WarehousePanel::NotFound => PanelState::NotFound,
            WarehousePanel::NoMatches => PanelState::NoMatches,
            WarehousePanel::Error => PanelState::Error,
            WarehousePanel::Items {
                warehouses,
                selected,
            } => PanelState::Items {
                warehouses: warehouses.to_vec(),
                selected: selected.cloned(),
            },
        };
        self.update(|s| {
            s.warehouses = state;
            s.notice = None;
        });
    }

    fn hide_warehouses(&self) {
        self.update(|s| s.warehouses = PanelState::Hidden);
    }

    fn render_payment_options(&self, options: &[PaymentOption], checked: Option<PaymentMethod>) {
        self.update(|s| {
            s.payment_options = options.to_vec();
            s.checked_payment = checked;
        });
    }

    fn show_notice(&self, text: &str) {
        self.update(|s| s.notice = Some(text.to_string()));
    }
}
