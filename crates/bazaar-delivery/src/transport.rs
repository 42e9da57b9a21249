//! Store-and-forward transport client.
//!
//! The pipeline depends on the [`Transport`] trait; [`HttpTransport`] talks to
//! the relay daemon over HTTP:
//!
//! ```text
//! POST {relay_url}/v1/send
//! { "to": "<address>", "retentionDays": 7, "payload": { ...envelope... } }
//!
//! 200 { "transportId": "<id>", "status": "sent" }
//! ```
//!
//! Anything other than a 2xx with a non-empty `transportId` and status `sent`
//! is a failed transmit.

use std::time::Duration;

use async_trait::async_trait;
use bazaar_common::{config::TransportConfig, models::MessageEnvelope};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::TransportError;

/// Retention class of a message; each class has its own size ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "class")]
pub enum MessageClass {
    #[default]
    Free,
    Paid { retention_days: u16 },
}

/// Per-class envelope ceilings, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    pub free_max_bytes: u64,
    pub paid_max_bytes: u64,
}

impl SizeLimits {
    pub fn from_config(config: &TransportConfig) -> Self {
        Self { free_max_bytes: config.free_max_bytes, paid_max_bytes: config.paid_max_bytes }
    }

    pub fn ceiling(&self, class: MessageClass) -> u64 {
        match class {
            MessageClass::Free => self.free_max_bytes,
            MessageClass::Paid { .. } => self.paid_max_bytes,
        }
    }
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            free_max_bytes: bazaar_common::config::DEFAULT_FREE_MAX_BYTES,
            paid_max_bytes: bazaar_common::config::DEFAULT_PAID_MAX_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    pub receiver: String,
    pub class: MessageClass,
}

/// Relay acknowledgement of a transmitted message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransmitReceipt {
    pub transport_id: String,
    pub status: String,
}

impl TransmitReceipt {
    fn check(self) -> Result<Self, TransportError> {
        if self.transport_id.trim().is_empty() {
            return Err(TransportError::MalformedResponse("empty transportId".into()));
        }
        if self.status != "sent" {
            return Err(TransportError::MalformedResponse(format!("status '{}'", self.status)));
        }
        Ok(self)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        envelope: &MessageEnvelope,
        options: &SendOptions,
    ) -> Result<TransmitReceipt, TransportError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    retention_days: Option<u16>,
    payload: &'a MessageEnvelope,
}

/// HTTP client for the relay daemon.
pub struct HttpTransport {
    base_url: String,
    http: Client,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.relay_url)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("Bazaar-Delivery/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { base_url: base_url.as_str().trim_end_matches('/').to_owned(), http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        envelope: &MessageEnvelope,
        options: &SendOptions,
    ) -> Result<TransmitReceipt, TransportError> {
        let url = format!("{}/v1/send", self.base_url);
        let retention_days = match options.class {
            MessageClass::Free => None,
            MessageClass::Paid { retention_days } => Some(retention_days),
        };
        let body = SendRequest { to: &options.receiver, retention_days, payload: envelope };
        debug!(%url, to = %options.receiver, "Relay send");

        let resp = self.http.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Refused { status: status.as_u16(), body });
        }
        let receipt: TransmitReceipt = resp
            .json()
            .await
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;
        receipt.check()
    }
}
