//! LCD (REST) client for read-only smart queries and transaction lookups.

use crate::chain::client::TxError;
use crate::chain::receipt::TransactionReceipt;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Deserialize)]
struct SmartQueryResponse {
    data: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GetTxResponse {
    tx_response: Option<TransactionReceipt>,
}

pub struct LcdClient {
    base_url: String,
    client: reqwest::Client,
    request_count: AtomicU64,
}

impl LcdClient {
    pub fn new(base_url: &str) -> Result<Self, TxError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TxError::InvalidRequest(format!("http client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            request_count: AtomicU64::new(0),
        })
    }

    async fn get_json(&self, path: &str) -> Result<String, TxError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "lcd get");
        let res = self.client.get(&url).send().await.map_err(transport_or_query)?;
        let status = res.status();
        let body = res.text().await.map_err(transport_or_query)?;
        self.request_count.fetch_add(1, Ordering::Relaxed);
        if status.is_server_error() {
            return Err(TxError::Broadcast(format!("status {} body {}", status.as_u16(), body)));
        }
        if !status.is_success() {
            return Err(TxError::Query(format!("status {} body {}", status.as_u16(), body)));
        }
        Ok(body)
    }

    /// `GET /cosmwasm/wasm/v1/contract/{addr}/smart/{base64(msg)}` and return its `data`.
    pub async fn smart_query(
        &self,
        contract: &str,
        msg: &serde_json::Value,
    ) -> Result<serde_json::Value, TxError> {
        let path = smart_query_path(contract, msg)?;
        let body = self.get_json(&path).await?;
        let parsed: SmartQueryResponse = serde_json::from_str(&body)
            .map_err(|e| TxError::Query(format!("parse smart query: {}", e)))?;
        parsed
            .data
            .ok_or_else(|| TxError::Query("smart query response has no data".to_string()))
    }

    /// Look up a committed transaction by hash.
    pub async fn tx_by_hash(&self, txhash: &str) -> Result<TransactionReceipt, TxError> {
        let path = format!("/cosmos/tx/v1beta1/txs/{}", urlencoding::encode(txhash));
        let body = self.get_json(&path).await?;
        let parsed: GetTxResponse = serde_json::from_str(&body)
            .map_err(|e| TxError::Malformed(format!("parse tx: {}", e)))?;
        parsed
            .tx_response
            .ok_or_else(|| TxError::Malformed("tx lookup has no tx_response".to_string()))
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }
}

pub fn smart_query_path(contract: &str, msg: &serde_json::Value) -> Result<String, TxError> {
    if contract.trim().is_empty() {
        return Err(TxError::InvalidRequest("empty contract address".to_string()));
    }
    let raw = serde_json::to_vec(msg).map_err(|e| TxError::InvalidRequest(e.to_string()))?;
    let encoded = STANDARD.encode(raw);
    Ok(format!(
        "/cosmwasm/wasm/v1/contract/{}/smart/{}",
        urlencoding::encode(contract),
        urlencoding::encode(&encoded)
    ))
}

fn transport_or_query(e: reqwest::Error) -> TxError {
    if e.is_connect() || e.is_timeout() || e.is_request() {
        TxError::Broadcast(e.to_string())
    } else {
        TxError::Query(e.to_string())
    }
}
