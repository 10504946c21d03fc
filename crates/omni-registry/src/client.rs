//! HTTP client for the ledger node REST API.
//!
//! Covers the endpoints the marketplace layer needs: suggested parameters,
//! raw group submission, pending-transaction status, round status, box
//! enumeration and reads, and asset metadata.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use omni_core::{AppId, AssetId};
use omni_txn::{Digest32, SuggestedParams, TxId};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{RegistryError, RegistryResult};
use crate::source::{AssetInfo, AssetInfoSource, BoxFuture, LookupError, RegistrySource};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Authentication header expected by the node.
const API_TOKEN_HEADER: &str = "X-Algod-API-Token";

// =============================================================================
// Response models
// =============================================================================

#[derive(Debug, Deserialize)]
struct TransactionParamsResponse {
    #[serde(rename = "genesis-hash")]
    genesis_hash: String,
    #[serde(rename = "genesis-id")]
    genesis_id: String,
    #[serde(rename = "last-round")]
    last_round: u64,
    #[serde(rename = "min-fee")]
    min_fee: u64,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(rename = "txId")]
    tx_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Debug, Deserialize)]
struct BoxesResponse {
    #[serde(default)]
    boxes: Vec<BoxDescriptor>,
}

#[derive(Debug, Deserialize)]
struct BoxDescriptor {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BoxResponse {
    value: String,
}

#[derive(Debug, Deserialize)]
struct AssetResponse {
    params: AssetParamsResponse,
}

#[derive(Debug, Deserialize)]
struct AssetParamsResponse {
    #[serde(default)]
    name: String,
    #[serde(rename = "unit-name", default)]
    unit_name: String,
}

/// Node round status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NodeStatus {
    #[serde(rename = "last-round")]
    pub last_round: u64,
}

/// Pending-pool view of a submitted transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PendingTransaction {
    /// Round the transaction was included in, once committed.
    #[serde(rename = "confirmed-round", default)]
    pub confirmed_round: Option<u64>,
    /// Non-empty when the pool evicted the transaction.
    #[serde(rename = "pool-error", default)]
    pub pool_error: String,
}

impl PendingTransaction {
    pub fn is_confirmed(&self) -> bool {
        matches!(self.confirmed_round, Some(round) if round > 0)
    }
}

// =============================================================================
// Client
// =============================================================================

/// Client for the ledger node.
#[derive(Debug, Clone)]
pub struct AlgodClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl AlgodClient {
    /// Create a new node client.
    ///
    /// # Arguments
    /// * `base_url` - Node URL (e.g., "https://testnet-api.algonode.cloud")
    /// * `token` - API token, sent as `X-Algod-API-Token` when present
    /// * `timeout` - Per-request timeout
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> RegistryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(API_TOKEN_HEADER, token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> RegistryResult<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| RegistryError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        if status == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(message));
        }
        Err(RegistryError::Http {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> RegistryResult<T> {
        let response = self.send(self.client.get(self.url(path))).await?;
        response
            .json()
            .await
            .map_err(|e| RegistryError::Parse(format!("Failed to parse {path}: {e}")))
    }

    /// `GET /v2/transactions/params`
    pub async fn suggested_params(&self) -> RegistryResult<SuggestedParams> {
        let raw: TransactionParamsResponse = self.get_json("/v2/transactions/params").await?;
        let genesis_hash = Digest32::from_base64(&raw.genesis_hash)
            .map_err(|e| RegistryError::Parse(e.to_string()))?;
        debug!(last_round = raw.last_round, min_fee = raw.min_fee, "Fetched suggested params");
        Ok(SuggestedParams {
            min_fee: raw.min_fee,
            last_round: raw.last_round,
            genesis_id: raw.genesis_id,
            genesis_hash,
        })
    }

    /// `POST /v2/transactions` with the concatenated signed group.
    pub async fn send_raw_transactions(&self, signed_group: Vec<u8>) -> RegistryResult<TxId> {
        let request = self
            .client
            .post(self.url("/v2/transactions"))
            .header(reqwest::header::CONTENT_TYPE, "application/x-binary")
            .body(signed_group);
        let response = self.send(request).await?;
        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::Parse(format!("Failed to parse submit response: {e}")))?;
        let tx_id = TxId::parse(&body.tx_id).map_err(|e| RegistryError::Parse(e.to_string()))?;
        info!(tx_id = %tx_id, "Submitted transaction group");
        Ok(tx_id)
    }

    /// `GET /v2/transactions/pending/{txid}`
    pub async fn pending_transaction(&self, tx_id: &TxId) -> RegistryResult<PendingTransaction> {
        self.get_json(&format!("/v2/transactions/pending/{tx_id}?format=json"))
            .await
    }

    /// `GET /v2/status`
    pub async fn status(&self) -> RegistryResult<NodeStatus> {
        self.get_json("/v2/status").await
    }

    /// `GET /v2/status/wait-for-block-after/{round}`
    pub async fn wait_for_block_after(&self, round: u64) -> RegistryResult<NodeStatus> {
        self.get_json(&format!("/v2/status/wait-for-block-after/{round}"))
            .await
    }

    /// `GET /v2/applications/{id}/boxes` - raw box names.
    pub async fn application_box_names(&self, app_id: AppId) -> RegistryResult<Vec<Vec<u8>>> {
        let raw: BoxesResponse = self
            .get_json(&format!("/v2/applications/{app_id}/boxes"))
            .await?;
        raw.boxes
            .into_iter()
            .map(|b| {
                BASE64
                    .decode(&b.name)
                    .map_err(|e| RegistryError::Parse(format!("Invalid box name encoding: {e}")))
            })
            .collect()
    }

    /// `GET /v2/applications/{id}/box?name=b64:...` - raw box value.
    pub async fn application_box(&self, app_id: AppId, name: &[u8]) -> RegistryResult<Vec<u8>> {
        let request = self
            .client
            .get(self.url(&format!("/v2/applications/{app_id}/box")))
            .query(&[("name", format!("b64:{}", BASE64.encode(name)))]);
        let raw: BoxResponse = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| RegistryError::Parse(format!("Failed to parse box: {e}")))?;
        BASE64
            .decode(&raw.value)
            .map_err(|e| RegistryError::Parse(format!("Invalid box value encoding: {e}")))
    }

    /// `GET /v2/assets/{id}`
    pub async fn asset_info(&self, asset_id: AssetId) -> RegistryResult<AssetInfo> {
        let raw: AssetResponse = self.get_json(&format!("/v2/assets/{asset_id}")).await?;
        Ok(AssetInfo {
            name: raw.params.name,
            unit_name: raw.params.unit_name,
        })
    }
}

impl AssetInfoSource for AlgodClient {
    fn get_asset_info(&self, asset_id: AssetId) -> BoxFuture<'_, Result<AssetInfo, LookupError>> {
        Box::pin(async move {
            self.asset_info(asset_id).await.map_err(|e| match e {
                RegistryError::NotFound(_) => LookupError::NotFound(asset_id),
                other => LookupError::Unavailable(other.to_string()),
            })
        })
    }
}

/// Box storage of one marketplace application, read through the node.
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    client: Arc<AlgodClient>,
    app_id: AppId,
}

impl NodeRegistry {
    pub fn new(client: Arc<AlgodClient>, app_id: AppId) -> Self {
        Self { client, app_id }
    }
}

impl RegistrySource for NodeRegistry {
    fn list_keys(&self) -> BoxFuture<'_, RegistryResult<Vec<Vec<u8>>>> {
        Box::pin(async move { self.client.application_box_names(self.app_id).await })
    }

    fn fetch_value<'a>(&'a self, key: &'a [u8]) -> BoxFuture<'a, RegistryResult<Vec<u8>>> {
        Box::pin(async move { self.client.application_box(self.app_id, key).await })
    }
}
