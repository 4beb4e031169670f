use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

macro_rules! ref_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

ref_newtype!(CityRef);
ref_newtype!(WarehouseRef);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value '{value}'")]
pub struct ParseFormValueError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! form_value_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $value:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_form_value(self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseFormValueError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($value => Ok($name::$variant),)+
                    other => Err(ParseFormValueError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_form_value())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    NovaPoshta,
    Ukrposhta,
    Pickup,
    Courier,
}

form_value_enum!(DeliveryMethod, "delivery method", {
    NovaPoshta => "nova_poshta",
    Ukrposhta => "ukrposhta",
    Pickup => "pickup",
    Courier => "courier",
});

impl DeliveryMethod {
    /// Shipped by a carrier network rather than handed over locally.
    pub fn is_carrier(self) -> bool {
        matches!(self, DeliveryMethod::NovaPoshta | DeliveryMethod::Ukrposhta)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Liqpay,
}

form_value_enum!(PaymentMethod, "payment method", {
    Cash => "cash",
    Card => "card",
    BankTransfer => "bank_transfer",
    Liqpay => "liqpay",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseType {
    Warehouse,
    Postomat,
}

form_value_enum!(WarehouseType, "warehouse type", {
    Warehouse => "warehouse",
    Postomat => "postomat",
});

impl WarehouseType {
    /// Query value for an optional type; `None` means "either" and is sent as "".
    pub fn query_value(kind: Option<WarehouseType>) -> &'static str {
        kind.map(WarehouseType::as_form_value).unwrap_or("")
    }

    /// Parses a query value where the empty string means "either".
    pub fn parse_optional(value: &str) -> Result<Option<WarehouseType>, ParseFormValueError> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(None);
        }
        value.parse().map(Some)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    #[serde(rename = "ref")]
    pub city_ref: CityRef,
    pub present: String,
    #[serde(default)]
    pub main_description: String,
}

impl City {
    /// Short name written into the city field once the city is chosen.
    pub fn field_text(&self) -> &str {
        if self.main_description.trim().is_empty() {
            &self.present
        } else {
            &self.main_description
        }
    }
}

pub const POSTOMAT_CATEGORY: &str = "Postomat";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    #[serde(rename = "ref")]
    pub warehouse_ref: WarehouseRef,
    #[serde(deserialize_with = "number_from_int_or_string")]
    pub number: u32,
    pub description: String,
    #[serde(default)]
    pub short_address: String,
    #[serde(default)]
    pub category_of_warehouse: String,
}

impl Warehouse {
    pub fn kind(&self) -> WarehouseType {
        if self.category_of_warehouse == POSTOMAT_CATEGORY {
            WarehouseType::Postomat
        } else {
            WarehouseType::Warehouse
        }
    }
}

fn number_from_int_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(u32),
        Str(String),
    }

    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(number) => Ok(number),
        IntOrString::Str(raw) => raw.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_values_parse_and_render() {
        for method in DeliveryMethod::ALL {
            let parsed: DeliveryMethod = method.as_form_value().parse().expect("parse");
            assert_eq!(parsed, *method);
        }
        assert_eq!(
            "bank_transfer".parse::<PaymentMethod>().expect("parse"),
            PaymentMethod::BankTransfer
        );
        let err = "drone".parse::<DeliveryMethod>().expect_err("must fail");
        assert_eq!(err.value, "drone");
    }

    #[test]
    fn empty_warehouse_type_means_either() {
        assert_eq!(WarehouseType::parse_optional("").expect("parse"), None);
        assert_eq!(
            WarehouseType::parse_optional("postomat").expect("parse"),
            Some(WarehouseType::Postomat)
        );
        assert!(WarehouseType::parse_optional("depot").is_err());
        assert_eq!(WarehouseType::query_value(None), "");
    }

    #[test]
    fn warehouse_number_accepts_carrier_strings() {
        let raw = serde_json::json!({
            "ref": "wh-1",
            "number": "12",
            "description": "Branch 12: Main St, 1",
            "shortAddress": "Main St, 1",
            "categoryOfWarehouse": "Postomat"
        });
        let warehouse: Warehouse = serde_json::from_value(raw).expect("json");
        assert_eq!(warehouse.number, 12);
        assert_eq!(warehouse.kind(), WarehouseType::Postomat);

        let raw = serde_json::json!({
            "ref": "wh-2",
            "number": 3,
            "description": "Branch 3"
        });
        let warehouse: Warehouse = serde_json::from_value(raw).expect("json");
        assert_eq!(warehouse.number, 3);
        assert_eq!(warehouse.kind(), WarehouseType::Warehouse);
    }

    #[test]
    fn city_field_text_falls_back_to_present() {
        let city = City {
            city_ref: CityRef::new("1"),
            present: "Київ".to_string(),
            main_description: String::new(),
        };
        assert_eq!(city.field_text(), "Київ");
    }
}
