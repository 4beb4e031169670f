//! Types shared by the checkout client and the carrier lookup proxy.

pub mod domain;
pub mod error;
pub mod protocol;
