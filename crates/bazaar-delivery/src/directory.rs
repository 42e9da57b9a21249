//! Business-object directory client.
//!
//! Listings and orders live outside this engine. The directory answers two
//! questions about the object a channel is bound to: does it still exist
//! (channel cleanup), and which addresses are structurally entitled to its
//! channel (auto-follow on first receipt: the market operators of a listing,
//! the buyer and seller of an order).

use std::time::Duration;

use async_trait::async_trait;
use bazaar_common::{config::DirectoryConfig, models::ChannelType};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::DirectoryError;

#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Whether the business object behind `(channel_type, hash)` still exists.
    async fn exists(&self, channel_type: ChannelType, hash: &str) -> Result<bool, DirectoryError>;

    /// Addresses entitled to the object's channel. Unknown objects have none.
    async fn entitled_identities(
        &self,
        channel_type: ChannelType,
        hash: &str,
    ) -> Result<Vec<String>, DirectoryError>;
}

/// `GET {url}/v1/channels/{type}/{hash}` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelObject {
    #[serde(default)]
    entitled: Vec<String>,
}

pub struct HttpDirectory {
    base_url: String,
    http: Client,
}

impl HttpDirectory {
    pub fn new(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let base_url = Url::parse(&config.url)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("Bazaar-Delivery/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { base_url: base_url.as_str().trim_end_matches('/').to_owned(), http })
    }

    async fn fetch(&self, channel_type: ChannelType, hash: &str) -> Result<Option<ChannelObject>, DirectoryError> {
        let url = format!("{}/v1/channels/{}/{}", self.base_url, channel_type, urlencoded(hash));
        debug!(%url, "Directory lookup");
        let resp = self.http.get(&url).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(resp.json().await?)),
            s => Err(DirectoryError::UnexpectedStatus(s.as_u16())),
        }
    }
}

#[async_trait]
impl ChannelDirectory for HttpDirectory {
    async fn exists(&self, channel_type: ChannelType, hash: &str) -> Result<bool, DirectoryError> {
        Ok(self.fetch(channel_type, hash).await?.is_some())
    }

    async fn entitled_identities(
        &self,
        channel_type: ChannelType,
        hash: &str,
    ) -> Result<Vec<String>, DirectoryError> {
        Ok(self.fetch(channel_type, hash).await?.map(|o| o.entitled).unwrap_or_default())
    }
}

fn urlencoded(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
