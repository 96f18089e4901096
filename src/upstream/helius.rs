//! Helius DAS `getAssetBatch` client.

use super::{UpstreamError, read_json};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Vec<Value>>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

/// JSON-RPC client for asset metadata.
#[derive(Debug, Clone)]
pub struct HeliusClient {
    http: Client,
    rpc_url: String,
    timeout: Duration,
}

impl HeliusClient {
    /// Creates a client posting to `rpc_url` (API key included in the URL).
    #[must_use]
    pub fn new(http: Client, rpc_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            rpc_url: rpc_url.into(),
            timeout,
        }
    }

    /// Fetches metadata for up to one chunk of asset IDs.
    ///
    /// Entries in the returned list follow the order of `ids`; unknown assets
    /// come back as `null`.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Status`] for non-2xx responses,
    /// [`UpstreamError::Rpc`] when the body carries a JSON-RPC error, and
    /// transport/decode variants otherwise.
    pub async fn get_asset_batch(
        &self,
        request_id: &str,
        ids: &[String],
    ) -> Result<Vec<Value>, UpstreamError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": request_id,
            "method": "getAssetBatch",
            "params": {
                "ids": ids,
                "displayOptions": {
                    "showFungible": true,
                    "showInscription": true,
                },
            },
        });

        debug!(request_id, ids = ids.len(), "sending getAssetBatch");
        let resp = self
            .http
            .post(&self.rpc_url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let rpc: RpcResponse = read_json(resp).await?;
        if let Some(err) = rpc.error {
            return Err(UpstreamError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        rpc.result
            .ok_or_else(|| UpstreamError::Decode("response has neither result nor error".into()))
    }
}
