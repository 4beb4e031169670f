//! Field and payment rules derived from the selected delivery method.

use shared::domain::{DeliveryMethod, PaymentMethod, WarehouseType};

pub const LABEL_BRANCH_OR_LOCKER: &str = "Branch/Locker *";
pub const LABEL_BRANCH: &str = "Branch *";
pub const LABEL_LOCKER: &str = "Locker *";
pub const LABEL_ADDRESS: &str = "Address *";

pub const LABEL_PAY_ON_DELIVERY: &str = "Pay on delivery";
pub const LABEL_PAY_ON_PICKUP: &str = "Pay on pickup";

/// How the carrier branch is chosen for Nova Poshta deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchTypeMode {
    /// Branches and lockers are listed together and narrowed by typing into the address field.
    #[default]
    Inferred,
    /// A separate branch-type selector must be set before branches are listed.
    Explicit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub visible: bool,
    pub required: bool,
}

impl FieldRule {
    const HIDDEN: FieldRule = FieldRule {
        visible: false,
        required: false,
    };
    const REQUIRED: FieldRule = FieldRule {
        visible: true,
        required: true,
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub city: FieldRule,
    pub branch_type: FieldRule,
    pub address: FieldRule,
    pub address_read_only: bool,
    pub address_label: &'static str,
    pub city_placeholder: &'static str,
    pub address_placeholder: &'static str,
    pub pickup_info_visible: bool,
}

impl FieldLayout {
    pub fn for_method(method: DeliveryMethod, mode: BranchTypeMode) -> Self {
        match method {
            DeliveryMethod::NovaPoshta => FieldLayout {
                city: FieldRule::REQUIRED,
                branch_type: match mode {
                    BranchTypeMode::Explicit => FieldRule::REQUIRED,
                    BranchTypeMode::Inferred => FieldRule::HIDDEN,
                },
                address: FieldRule::REQUIRED,
                address_read_only: mode == BranchTypeMode::Explicit,
                address_label: LABEL_BRANCH_OR_LOCKER,
                city_placeholder: "Start typing a city name...",
                address_placeholder: match mode {
                    BranchTypeMode::Explicit => "Choose a branch from the list",
                    BranchTypeMode::Inferred => "Type a number or address to search",
                },
                pickup_info_visible: false,
            },
            DeliveryMethod::Ukrposhta => FieldLayout {
                city: FieldRule::REQUIRED,
                branch_type: FieldRule::HIDDEN,
                address: FieldRule::REQUIRED,
                address_read_only: false,
                address_label: LABEL_ADDRESS,
                city_placeholder: "Delivery city",
                address_placeholder: "Enter an address or branch postcode",
                pickup_info_visible: false,
            },
            DeliveryMethod::Courier => FieldLayout {
                city: FieldRule::REQUIRED,
                branch_type: FieldRule::HIDDEN,
                address: FieldRule::REQUIRED,
                address_read_only: false,
                address_label: LABEL_ADDRESS,
                city_placeholder: "Delivery city",
                address_placeholder: "Street, house, apartment",
                pickup_info_visible: false,
            },
            DeliveryMethod::Pickup => FieldLayout {
                city: FieldRule::HIDDEN,
                branch_type: FieldRule::HIDDEN,
                address: FieldRule::HIDDEN,
                address_read_only: true,
                address_label: LABEL_ADDRESS,
                city_placeholder: "",
                address_placeholder: "",
                pickup_info_visible: true,
            },
        }
    }
}

/// Address label after a branch type is chosen in the explicit selector.
pub fn address_label_for_type(kind: Option<WarehouseType>) -> &'static str {
    match kind {
        Some(WarehouseType::Warehouse) => LABEL_BRANCH,
        Some(WarehouseType::Postomat) => LABEL_LOCKER,
        None => LABEL_BRANCH_OR_LOCKER,
    }
}

pub fn warehouse_type_title(kind: WarehouseType) -> &'static str {
    match kind {
        WarehouseType::Warehouse => "Branch",
        WarehouseType::Postomat => "Locker",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOption {
    pub method: PaymentMethod,
    pub label: String,
    pub visible: bool,
}

pub fn default_payment_label(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Cash => "Cash on delivery",
        PaymentMethod::Card => "Card payment",
        PaymentMethod::BankTransfer => "Bank transfer",
        PaymentMethod::Liqpay => "Online payment (LiqPay)",
    }
}

/// Visibility and label of every configured payment option for `method`.
///
/// Carrier shipments only offer cash on delivery and online prepayment; pickup
/// and courier offer everything configured. Output order follows `configured`.
pub fn compute_visible_payment_methods(
    method: DeliveryMethod,
    configured: &[PaymentMethod],
) -> Vec<PaymentOption> {
    configured
        .iter()
        .map(|&payment| {
            let visible = if method.is_carrier() {
                matches!(payment, PaymentMethod::Cash | PaymentMethod::Liqpay)
            } else {
                true
            };
            let label = match (payment, method) {
                (PaymentMethod::Cash, DeliveryMethod::Pickup) => LABEL_PAY_ON_PICKUP,
                (PaymentMethod::Cash, _) => LABEL_PAY_ON_DELIVERY,
                (other, _) => default_payment_label(other),
            };
            PaymentOption {
                method: payment,
                label: label.to_string(),
                visible,
            }
        })
        .collect()
}

/// Keeps `current` when it is still visible, otherwise falls back to the first visible option.
pub fn resolve_checked_payment(
    current: Option<PaymentMethod>,
    options: &[PaymentOption],
) -> Option<PaymentMethod> {
    let still_visible = current.filter(|method| {
        options
            .iter()
            .any(|option| option.method == *method && option.visible)
    });
    still_visible.or_else(|| {
        options
            .iter()
            .find(|option| option.visible)
            .map(|option| option.method)
    })
}
