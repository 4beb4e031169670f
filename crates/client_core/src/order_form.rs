//! Delivery fields submitted with the order form, and the checks run before submit.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use shared::domain::{DeliveryMethod, PaymentMethod};

use crate::{
    error::OrderFieldError,
    policy::{compute_visible_payment_methods, BranchTypeMode, FieldLayout},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderFields {
    pub delivery_method: DeliveryMethod,
    pub delivery_city: String,
    pub delivery_type: String,
    pub delivery_address: String,
    pub np_city_ref: String,
    pub np_warehouse_ref: String,
    pub payment_method: Option<PaymentMethod>,
}

impl OrderFields {
    /// Form-encoded pairs in the order the storefront expects them.
    pub fn form_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("delivery_method", self.delivery_method.as_form_value().to_string()),
            ("delivery_city", self.delivery_city.clone()),
            ("delivery_type", self.delivery_type.clone()),
            ("delivery_address", self.delivery_address.clone()),
            ("np_city_ref", self.np_city_ref.clone()),
            ("np_warehouse_ref", self.np_warehouse_ref.clone()),
            (
                "payment_method",
                self.payment_method
                    .map(|method| method.as_form_value().to_string())
                    .unwrap_or_default(),
            ),
        ]
    }

    /// Mirrors the form's `required` attributes and the payment visibility rule.
    pub fn check(
        &self,
        mode: BranchTypeMode,
        configured_payments: &[PaymentMethod],
    ) -> Result<(), OrderFieldError> {
        let layout = FieldLayout::for_method(self.delivery_method, mode);
        if layout.city.required && self.delivery_city.trim().is_empty() {
            return Err(OrderFieldError::Missing("delivery_city"));
        }
        if layout.branch_type.required && self.delivery_type.trim().is_empty() {
            return Err(OrderFieldError::Missing("delivery_type"));
        }
        if layout.address.required && self.delivery_address.trim().is_empty() {
            return Err(OrderFieldError::Missing("delivery_address"));
        }

        let payment = self.payment_method.ok_or(OrderFieldError::NoPaymentMethod)?;
        let offered = compute_visible_payment_methods(self.delivery_method, configured_payments)
            .into_iter()
            .any(|option| option.method == payment && option.visible);
        if !offered {
            return Err(OrderFieldError::PaymentUnavailable {
                delivery: self.delivery_method,
                payment,
            });
        }
        Ok(())
    }
}

/// Rewrites local Ukrainian numbers into `+380XXXXXXXXX` form; anything else is returned trimmed.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.starts_with("38") && digits.len() == 12 {
        format!("+{digits}")
    } else if digits.len() == 10 {
        format!("+38{digits}")
    } else {
        raw.trim().to_string()
    }
}

pub fn validate_ukrainian_phone(phone: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\+380\d{9}$").expect("static phone pattern"))
        .is_match(phone)
}

/// Normalizes and validates in one step, as the order form does on submit.
pub fn prepare_phone(raw: &str) -> Result<String, OrderFieldError> {
    let phone = normalize_phone(raw);
    if validate_ukrainian_phone(&phone) {
        Ok(phone)
    } else {
        Err(OrderFieldError::InvalidPhone(raw.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_PAYMENTS: &[PaymentMethod] = &[
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::BankTransfer,
        PaymentMethod::Liqpay,
    ];

    fn nova_poshta_fields() -> OrderFields {
        OrderFields {
            delivery_method: DeliveryMethod::NovaPoshta,
            delivery_city: "Київ".to_string(),
            delivery_type: "warehouse".to_string(),
            delivery_address: "Branch №1: Khreshchatyk, 22".to_string(),
            np_city_ref: "city-1".to_string(),
            np_warehouse_ref: "wh-1".to_string(),
            payment_method: Some(PaymentMethod::Cash),
        }
    }

    #[test]
    fn normalizes_local_and_international_formats() {
        assert_eq!(normalize_phone("(067) 123-45-67"), "+380671234567");
        assert_eq!(normalize_phone("38 067 123 45 67"), "+380671234567");
        assert_eq!(normalize_phone("+380671234567"), "+380671234567");
        assert_eq!(normalize_phone(" 12345 "), "12345");
    }

    #[test]
    fn phone_validation_requires_full_ukrainian_number() {
        assert!(validate_ukrainian_phone("+380671234567"));
        assert!(!validate_ukrainian_phone("380671234567"));
        assert!(!validate_ukrainian_phone("+38067123456"));
        assert_eq!(
            prepare_phone("0671234567").expect("valid"),
            "+380671234567".to_string()
        );
        assert_eq!(
            prepare_phone("12345"),
            Err(OrderFieldError::InvalidPhone("12345".to_string()))
        );
    }

    #[test]
    fn check_enforces_required_delivery_fields() {
        let mut fields = nova_poshta_fields();
        assert_eq!(fields.check(BranchTypeMode::Inferred, ALL_PAYMENTS), Ok(()));

        fields.delivery_address.clear();
        assert_eq!(
            fields.check(BranchTypeMode::Inferred, ALL_PAYMENTS),
            Err(OrderFieldError::Missing("delivery_address"))
        );

        let mut fields = nova_poshta_fields();
        fields.delivery_type.clear();
        assert_eq!(fields.check(BranchTypeMode::Inferred, ALL_PAYMENTS), Ok(()));
        assert_eq!(
            fields.check(BranchTypeMode::Explicit, ALL_PAYMENTS),
            Err(OrderFieldError::Missing("delivery_type"))
        );
    }

    #[test]
    fn check_rejects_payment_hidden_for_method() {
        let mut fields = nova_poshta_fields();
        fields.payment_method = Some(PaymentMethod::BankTransfer);
        assert_eq!(
            fields.check(BranchTypeMode::Inferred, ALL_PAYMENTS),
            Err(OrderFieldError::PaymentUnavailable {
                delivery: DeliveryMethod::NovaPoshta,
                payment: PaymentMethod::BankTransfer,
            })
        );

        fields.payment_method = None;
        assert_eq!(
            fields.check(BranchTypeMode::Inferred, ALL_PAYMENTS),
            Err(OrderFieldError::NoPaymentMethod)
        );
    }

    #[test]
    fn pickup_needs_no_address_fields() {
        let fields = OrderFields {
            delivery_method: DeliveryMethod::Pickup,
            delivery_city: String::new(),
            delivery_type: String::new(),
            delivery_address: String::new(),
            np_city_ref: String::new(),
            np_warehouse_ref: String::new(),
            payment_method: Some(PaymentMethod::Card),
        };
        assert_eq!(fields.check(BranchTypeMode::Inferred, ALL_PAYMENTS), Ok(()));
    }
}
