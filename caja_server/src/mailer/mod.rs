//! Best-effort HTML mail over an HTTP mail API.
//!
//! Mail is outside the consistency boundary: every caller lives in an event hook, logs failures and
//! moves on. Nothing here may ever fail a settlement request.

pub mod templates;

use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use thiserror::Error;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Could not initialize mail client: {0}")]
    Initialization(String),
    #[error("Could not submit mail: {0}")]
    Send(String),
    #[error("Mail API refused the message. Error {status}. {message}")]
    Api { status: u16, message: String },
}

/// A rendered message, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub subject: String,
    pub html: String,
}

#[derive(Clone)]
pub struct MailClient {
    config: MailConfig,
    client: Arc<Client>,
}

impl MailClient {
    pub fn new(config: MailConfig) -> Result<Self, MailError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.api_key.reveal());
        let val = HeaderValue::from_str(&bearer).map_err(|e| MailError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| MailError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn send(&self, to: &str, message: MailMessage) -> Result<(), MailError> {
        let body = serde_json::json!({
            "from": self.config.from,
            "to": [to],
            "subject": message.subject,
            "html": message.html,
        });
        let url = format!("{}/emails", self.config.api_url);
        trace!("📬 Submitting mail '{}' for {to}", message.subject);
        let response =
            self.client.post(url).json(&body).send().await.map_err(|e| MailError::Send(e.to_string()))?;
        if response.status().is_success() {
            info!("📬 Mail '{}' submitted for {to}", message.subject);
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| MailError::Send(e.to_string()))?;
            Err(MailError::Api { status, message })
        }
    }
}
