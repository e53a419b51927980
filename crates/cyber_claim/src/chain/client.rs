//! Transaction client: the `Ledger` seam and its production implementation.

use crate::chain::cli::CliBroadcaster;
use crate::chain::lcd::LcdClient;
use crate::chain::msgs::{InstantiateRequest, MultiSendRequest, TransactionRequest};
use crate::chain::receipt::TransactionReceipt;
use crate::config::LedgerConfig;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum TxError {
    #[error("broadcast: {0}")]
    Broadcast(String),
    #[error("rejected by ledger: {raw_log}")]
    Rejected { code: Option<u32>, raw_log: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("deployment: {0}")]
    Deployment(String),
    #[error("query: {0}")]
    Query(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TxError {
    /// Transport failures and logical ledger rejections can succeed on a fresh attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, TxError::Broadcast(_) | TxError::Rejected { .. })
    }
}

/// Turn a receipt with a non-zero code into `TxError::Rejected`.
pub fn ensure_committed(receipt: TransactionReceipt) -> Result<TransactionReceipt, TxError> {
    if receipt.success() {
        Ok(receipt)
    } else {
        Err(TxError::Rejected {
            code: Some(receipt.code),
            raw_log: receipt.raw_log,
        })
    }
}

/// Submit, sign, and query against the ledger. Implementations never retry.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Instantiate a stored code id and return the new contract address.
    async fn instantiate(&self, request: &InstantiateRequest) -> Result<String, TxError>;

    /// Execute a contract message and wait for block inclusion. Rejections come back as a
    /// receipt with a non-zero code, not as an error.
    async fn execute(&self, request: &TransactionRequest)
        -> Result<TransactionReceipt, TxError>;

    /// Read-only smart query.
    async fn query(
        &self,
        contract: &str,
        msg: &serde_json::Value,
    ) -> Result<serde_json::Value, TxError>;

    async fn multi_send(&self, request: &MultiSendRequest)
        -> Result<TransactionReceipt, TxError>;
}

/// Signs and broadcasts through the chain CLI; queries through the LCD endpoint.
pub struct LedgerClient {
    cli: CliBroadcaster,
    lcd: LcdClient,
}

impl LedgerClient {
    pub fn new(config: LedgerConfig) -> Result<Self, TxError> {
        let lcd = LcdClient::new(&config.lcd_url)?;
        Ok(Self {
            cli: CliBroadcaster::new(config),
            lcd,
        })
    }

    pub fn lcd(&self) -> &LcdClient {
        &self.lcd
    }
}

#[async_trait]
impl Ledger for LedgerClient {
    async fn instantiate(&self, request: &InstantiateRequest) -> Result<String, TxError> {
        self.cli.ensure_key(&request.signer).await?;
        let args = self.cli.instantiate_args(request)?;
        let receipt = self
            .cli
            .broadcast(args)
            .await
            .map_err(|e| TxError::Deployment(e.to_string()))?;
        let address = contract_address_from(&receipt)?;
        info!(code_id = request.code_id, %address, label = %request.label, "contract instantiated");
        Ok(address)
    }

    async fn execute(
        &self,
        request: &TransactionRequest,
    ) -> Result<TransactionReceipt, TxError> {
        self.cli.ensure_key(&request.signer).await?;
        let args = self.cli.execute_args(request)?;
        let receipt = self.cli.broadcast(args).await?;
        debug!(txhash = %receipt.txhash, code = receipt.code, gas_used = receipt.gas_used, "execute");
        Ok(receipt)
    }

    async fn query(
        &self,
        contract: &str,
        msg: &serde_json::Value,
    ) -> Result<serde_json::Value, TxError> {
        self.lcd.smart_query(contract, msg).await
    }

    async fn multi_send(
        &self,
        request: &MultiSendRequest,
    ) -> Result<TransactionReceipt, TxError> {
        self.cli.ensure_key(&request.signer).await?;
        self.cli.multi_send(request).await
    }
}

/// Address of the contract created by an instantiate transaction: the first `instantiate` event.
pub fn contract_address_from(receipt: &TransactionReceipt) -> Result<String, TxError> {
    if !receipt.success() {
        return Err(TxError::Deployment(format!(
            "instantiate rejected (code {}): {}",
            receipt.code, receipt.raw_log
        )));
    }
    let event = receipt
        .first_event("instantiate")
        .ok_or_else(|| TxError::Deployment("receipt has no instantiate event".to_string()))?;
    event
        .attribute("_contract_address")
        .or_else(|| event.attributes.first().map(|a| a.value.as_str()))
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .ok_or_else(|| TxError::Deployment("instantiate event has no address".to_string()))
}
