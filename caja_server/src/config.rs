use std::env;

use caja_common::Secret;
use log::*;
use mp_tools::MercadoPagoConfig;

const DEFAULT_CAJA_HOST: &str = "127.0.0.1";
const DEFAULT_CAJA_PORT: u16 = 8480;
const DEFAULT_MAIL_API_URL: &str = "https://api.resend.com";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Payment gateway credentials for the secondary payment lookup.
    pub mercado_pago: MercadoPagoConfig,
    pub mail: MailConfig,
    pub links: ActionLinkConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CAJA_HOST.to_string(),
            port: DEFAULT_CAJA_PORT,
            database_url: String::default(),
            mercado_pago: MercadoPagoConfig::default(),
            mail: MailConfig::default(),
            links: ActionLinkConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("CAJA_HOST").ok().unwrap_or_else(|| DEFAULT_CAJA_HOST.into());
        let port = env::var("CAJA_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛 {s} is not a valid port for CAJA_PORT. {e} Using the default, {DEFAULT_CAJA_PORT}, \
                         instead."
                    );
                    DEFAULT_CAJA_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_CAJA_PORT);
        let database_url = env::var("CAJA_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛 CAJA_DATABASE_URL is not set. Please set it to the URL for the caja database.");
            String::default()
        });
        let mercado_pago = MercadoPagoConfig::new_from_env_or_default();
        let mail = MailConfig::from_env_or_default();
        let links = ActionLinkConfig::from_env_or_default(&host, port);
        Self { host, port, database_url, mercado_pago, mail, links }
    }
}

//-------------------------------------------------  MailConfig  ------------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct MailConfig {
    /// Base URL of the HTTP mail API.
    pub api_url: String,
    pub api_key: Secret<String>,
    /// The sender mailbox ("from" header).
    pub from: String,
    /// Where sale and transfer-confirmation notices go.
    pub seller_email: String,
}

impl MailConfig {
    pub fn from_env_or_default() -> Self {
        let api_url = env::var("CAJA_MAIL_API_URL").unwrap_or_else(|_| DEFAULT_MAIL_API_URL.to_string());
        let api_key = Secret::new(env::var("CAJA_MAIL_API_KEY").unwrap_or_else(|_| {
            error!("🪛 CAJA_MAIL_API_KEY is not set. Mail dispatch will fail (and be logged) until it is.");
            String::default()
        }));
        let from = env::var("CAJA_MAIL_FROM").unwrap_or_else(|_| {
            warn!("🪛 CAJA_MAIL_FROM is not set. Using a placeholder sender address.");
            "ventas@example.com".to_string()
        });
        let seller_email = env::var("CAJA_SELLER_EMAIL").unwrap_or_else(|_| {
            warn!("🪛 CAJA_SELLER_EMAIL is not set. Seller notifications will go to the sender address.");
            String::default()
        });
        let seller_email = if seller_email.is_empty() { from.clone() } else { seller_email };
        Self { api_url, api_key, from, seller_email }
    }
}

//-----------------------------------------------  ActionLinkConfig  --------------------------------------------------
/// Base URLs embedded in the transfer-confirmation mail. They normally point back at this server's
/// own `/transfer/confirm` and `/transfer/reject` routes, but deployments behind a proxy or a
/// pretty domain override them.
#[derive(Clone, Debug, Default)]
pub struct ActionLinkConfig {
    pub confirm_url: String,
    pub reject_url: String,
}

impl ActionLinkConfig {
    pub fn from_env_or_default(host: &str, port: u16) -> Self {
        let confirm_url = env::var("CAJA_CONFIRM_URL").unwrap_or_else(|_| {
            info!("🪛 CAJA_CONFIRM_URL is not set. Deriving it from the bind address.");
            format!("http://{host}:{port}/transfer/confirm")
        });
        let reject_url = env::var("CAJA_REJECT_URL").unwrap_or_else(|_| {
            info!("🪛 CAJA_REJECT_URL is not set. Deriving it from the bind address.");
            format!("http://{host}:{port}/transfer/reject")
        });
        Self { confirm_url, reject_url }
    }
}
