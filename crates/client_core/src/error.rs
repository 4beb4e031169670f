use shared::domain::{DeliveryMethod, PaymentMethod};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("invalid lookup url: {0}")]
    Url(#[from] url::ParseError),
    #[error("lookup transport failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("lookup endpoint returned status {0}")]
    Status(u16),
    #[error("failed to decode lookup response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("lookup rejected by server")]
    Rejected,
}

impl LookupError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            LookupError::Status(status.as_u16())
        } else if err.is_decode() {
            LookupError::Decode(err)
        } else {
            LookupError::Transport(err)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderFieldError {
    #[error("field '{0}' is required for the selected delivery method")]
    Missing(&'static str),
    #[error("payment method '{payment}' is not offered for delivery method '{delivery}'")]
    PaymentUnavailable {
        delivery: DeliveryMethod,
        payment: PaymentMethod,
    },
    #[error("no payment method selected")]
    NoPaymentMethod,
    #[error("invalid phone number '{0}', expected +380XXXXXXXXX")]
    InvalidPhone(String),
}
