use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use url::Url;

use crate::error::StoreError;

use super::StatsStore;

/// Client for the etcd v3 JSON gateway. Keys and values travel base64
/// encoded, as the gateway requires.
#[derive(Debug, Clone)]
pub struct EtcdStore {
    put_url: Url,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct PutRequest {
    key: String,
    value: String,
}

impl EtcdStore {
    /// # Errors
    ///
    /// Returns `StoreError` when the endpoint does not parse as a URL or the
    /// HTTP client cannot be built. Reachability is not checked here; the
    /// publisher retries on its fixed period.
    pub fn new(endpoint: &str) -> Result<Self, StoreError> {
        let mut put_url = Url::parse(endpoint).map_err(|err| StoreError::InvalidEndpoint {
            endpoint: endpoint.to_owned(),
            source: err,
        })?;
        // Appended as path segments so a gateway mounted under a prefix
        // (e.g. `http://host/etcd`) keeps its prefix.
        put_url
            .path_segments_mut()
            .map_err(|()| StoreError::OpaqueEndpoint {
                endpoint: endpoint.to_owned(),
            })?
            .pop_if_empty()
            .extend(["v3", "kv", "put"]);
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| StoreError::BuildClient { source: err })?;
        Ok(Self { put_url, client })
    }

    #[cfg(test)]
    pub(super) fn put_url(&self) -> &Url {
        &self.put_url
    }
}

/// Serializes one gateway put: a JSON object carrying the base64 key and
/// value, as the v3 gateway requires.
pub(super) fn encode_put(key: &str, value: &str) -> Result<Vec<u8>, StoreError> {
    let payload = PutRequest {
        key: B64.encode(key),
        value: B64.encode(value),
    };
    serde_json::to_vec(&payload).map_err(|err| StoreError::Encode {
        key: key.to_owned(),
        source: err,
    })
}

#[async_trait]
impl StatsStore for EtcdStore {
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let body = encode_put(key, value)?;
        let response = self
            .client
            .post(self.put_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| StoreError::Put {
                key: key.to_owned(),
                source: err,
            })?;
        if !response.status().is_success() {
            return Err(StoreError::PutStatus {
                key: key.to_owned(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}
