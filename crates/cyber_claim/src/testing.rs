//! Test doubles shared by workflow and batch tests.

use crate::chain::{
    InstantiateRequest, Ledger, MultiSendRequest, TransactionReceipt, TransactionRequest, TxError,
};
use crate::config::WorkflowConfig;
use crate::workflow::{ChainClaim, ParticipantRecord, WorkflowContracts};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Scripted ledger: pops one response per `execute`, committing by default.
#[derive(Default)]
pub(crate) struct MockLedger {
    pub(crate) script: Mutex<VecDeque<Result<TransactionReceipt, TxError>>>,
    pub(crate) submitted: Mutex<Vec<TransactionRequest>>,
}

impl MockLedger {
    pub(crate) fn push(&self, response: Result<TransactionReceipt, TxError>) {
        self.script.lock().unwrap().push_back(response);
    }

    pub(crate) fn submitted(&self) -> Vec<TransactionRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

pub(crate) fn receipt(code: u32, raw_log: &str) -> TransactionReceipt {
    serde_json::from_value(serde_json::json!({
        "txhash": format!("HASH{}", code),
        "code": code,
        "raw_log": raw_log,
        "gas_used": "1000"
    }))
    .unwrap()
}

#[async_trait]
impl Ledger for MockLedger {
    async fn instantiate(&self, _request: &InstantiateRequest) -> Result<String, TxError> {
        Ok("bostrom1new".to_string())
    }

    async fn execute(
        &self,
        request: &TransactionRequest,
    ) -> Result<TransactionReceipt, TxError> {
        self.submitted.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(receipt(0, "")))
    }

    async fn query(
        &self,
        _contract: &str,
        _msg: &serde_json::Value,
    ) -> Result<serde_json::Value, TxError> {
        Ok(serde_json::Value::Null)
    }

    async fn multi_send(
        &self,
        _request: &MultiSendRequest,
    ) -> Result<TransactionReceipt, TxError> {
        Ok(receipt(0, ""))
    }
}

pub(crate) fn alice() -> ParticipantRecord {
    ParticipantRecord {
        nickname: "alice".into(),
        avatar: "QmAvatar".into(),
        primary_address: "bostrom1alice".into(),
        mnemonic: "word word".into(),
        passport_signature: None,
        ethereum: ChainClaim {
            address: "0xabc".into(),
            signature: "sig1".into(),
            proof: "['h1','h2']".into(),
            amount: "100".into(),
        },
        cosmos: ChainClaim {
            address: "cosmos1alice".into(),
            signature: "sig2".into(),
            proof: "['c1']".into(),
            amount: "200".into(),
        },
    }
}

pub(crate) fn contracts() -> WorkflowContracts {
    WorkflowContracts {
        gift: "bostrom1gift".into(),
        passport: "bostrom1passport".into(),
    }
}

pub(crate) fn fast_settings() -> WorkflowConfig {
    WorkflowConfig {
        step_delay_ms: 0,
        ..Default::default()
    }
}
