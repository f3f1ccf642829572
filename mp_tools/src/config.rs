use caja_common::Secret;
use log::*;

const DEFAULT_API_URL: &str = "https://api.mercadopago.com";

#[derive(Debug, Clone)]
pub struct MercadoPagoConfig {
    /// Base URL of the payments API. Only overridden in tests.
    pub api_url: String,
    pub access_token: Secret<String>,
}

impl Default for MercadoPagoConfig {
    fn default() -> Self {
        Self { api_url: DEFAULT_API_URL.to_string(), access_token: Secret::default() }
    }
}

impl MercadoPagoConfig {
    pub fn new(api_url: impl Into<String>, access_token: Secret<String>) -> Self {
        Self { api_url: api_url.into(), access_token }
    }

    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("CAJA_MP_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let access_token = Secret::new(std::env::var("CAJA_MP_ACCESS_TOKEN").unwrap_or_else(|_| {
            warn!("CAJA_MP_ACCESS_TOKEN not set. Payment lookups against the gateway will be rejected.");
            String::default()
        }));
        Self { api_url, access_token }
    }
}
