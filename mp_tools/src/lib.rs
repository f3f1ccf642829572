//! Minimal REST client for the Mercado Pago payments API.
//!
//! The settlement workflow only ever *reads* from the gateway: an asynchronous notification carries
//! an opaque payment id, and the authoritative status plus the merchant's external reference must be
//! fetched from `/v1/payments/{id}`. Everything else (creating preferences, refunds, etc.) happens in
//! the storefront and is out of scope here.

mod api;
mod config;
mod error;

mod data_objects;

pub use api::MercadoPagoApi;
pub use config::MercadoPagoConfig;
pub use data_objects::PaymentResource;
pub use error::MercadoPagoApiError;
