//! Signing and block-mode broadcasting through the chain CLI.
//!
//! Arguments are passed as a vector (no shell), mnemonics only ever travel over stdin.

use crate::chain::client::TxError;
use crate::chain::msgs::{
    InstantiateRequest, MultiSendRequest, Signer, TransactionRequest, Transfer,
};
use crate::chain::receipt::TransactionReceipt;
use crate::config::LedgerConfig;
use std::collections::HashSet;
use std::io::Write;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// stderr fragments that indicate the node was never reached or did not answer in time.
const TRANSPORT_MARKERS: &[&str] = &[
    "connection refused",
    "connection reset",
    "timed out",
    "timeout",
    "no such host",
    "dial tcp",
    "post failed",
    "eof",
    "service unavailable",
];

#[derive(Debug)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

pub struct CliBroadcaster {
    config: LedgerConfig,
    imported: Mutex<HashSet<String>>,
}

impl CliBroadcaster {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            imported: Mutex::new(HashSet::new()),
        }
    }

    fn signing_flags(&self, signer: &Signer, gas: u64, gas_price: &str) -> Vec<String> {
        vec![
            "--from".into(),
            signer.key_name.clone(),
            "--keyring-backend".into(),
            self.config.keyring_backend.clone(),
            "--chain-id".into(),
            self.config.chain_id.clone(),
            "--node".into(),
            self.config.node_url.clone(),
            "--gas".into(),
            gas.to_string(),
            "--gas-prices".into(),
            gas_price.to_string(),
            "--broadcast-mode".into(),
            "block".into(),
            "-o".into(),
            "json".into(),
            "-y".into(),
        ]
    }

    pub fn execute_args(&self, req: &TransactionRequest) -> Result<Vec<String>, TxError> {
        if req.contract.trim().is_empty() {
            return Err(TxError::InvalidRequest("empty contract address".to_string()));
        }
        let msg = req
            .msg
            .to_json()
            .map_err(|e| TxError::InvalidRequest(e.to_string()))?;
        let mut args: Vec<String> = vec![
            "tx".into(),
            "wasm".into(),
            "execute".into(),
            req.contract.clone(),
            msg,
        ];
        if let Some(funds) = &req.funds {
            args.push("--amount".into());
            args.push(funds.clone());
        }
        args.extend(self.signing_flags(&req.signer, req.gas, &req.gas_price));
        Ok(args)
    }

    pub fn instantiate_args(&self, req: &InstantiateRequest) -> Result<Vec<String>, TxError> {
        let init = serde_json::to_string(&req.init_msg)
            .map_err(|e| TxError::InvalidRequest(e.to_string()))?;
        let mut args: Vec<String> = vec![
            "tx".into(),
            "wasm".into(),
            "instantiate".into(),
            req.code_id.to_string(),
            init,
            "--label".into(),
            req.label.clone(),
        ];
        if let Some(funds) = &req.funds {
            args.push("--amount".into());
            args.push(funds.clone());
        }
        if let Some(admin) = &req.admin {
            args.push("--admin".into());
            args.push(admin.clone());
        }
        args.extend(self.signing_flags(&req.signer, req.gas, &req.gas_price));
        Ok(args)
    }

    /// Run the chain binary, bounded by the confirmation timeout.
    pub async fn run(&self, args: &[String], stdin: Option<&str>) -> Result<CommandOutput, TxError> {
        let command = args.iter().take(3).cloned().collect::<Vec<_>>().join(" ");
        debug!(binary = %self.config.binary, %command, "spawn");
        let mut child = Command::new(&self.config.binary)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => TxError::InvalidRequest(format!(
                    "chain binary `{}` not found",
                    self.config.binary
                )),
                _ => TxError::Broadcast(format!("spawn: {}", e)),
            })?;
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())
                .await
                .map_err(|e| TxError::Broadcast(format!("stdin: {}", e)))?;
            pipe.write_all(b"\n")
                .await
                .map_err(|e| TxError::Broadcast(format!("stdin: {}", e)))?;
        }
        let wait = Duration::from_secs(self.config.confirm_timeout_secs);
        let output = tokio::time::timeout(wait, child.wait_with_output())
            .await
            .map_err(|_| TxError::Broadcast(format!("no confirmation within {}s", wait.as_secs())))?
            .map_err(|e| TxError::Broadcast(format!("wait: {}", e)))?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    pub async fn broadcast(&self, args: Vec<String>) -> Result<TransactionReceipt, TxError> {
        let out = self.run(&args, None).await?;
        parse_broadcast_output(&out)
    }

    /// Import the signer's mnemonic into the keyring once per process.
    pub async fn ensure_key(&self, signer: &Signer) -> Result<(), TxError> {
        let Some(mnemonic) = signer.mnemonic.as_deref() else {
            return Ok(());
        };
        let mut imported = self.imported.lock().await;
        if imported.contains(&signer.key_name) {
            return Ok(());
        }
        let keyring = self.config.keyring_backend.clone();
        let show: Vec<String> = vec![
            "keys".into(),
            "show".into(),
            signer.key_name.clone(),
            "--keyring-backend".into(),
            keyring.clone(),
            "-o".into(),
            "json".into(),
        ];
        if !self.run(&show, None).await?.success {
            let add: Vec<String> = vec![
                "keys".into(),
                "add".into(),
                signer.key_name.clone(),
                "--recover".into(),
                "--keyring-backend".into(),
                keyring,
                "-o".into(),
                "json".into(),
            ];
            let out = self.run(&add, Some(mnemonic)).await?;
            if !out.success {
                return Err(TxError::InvalidRequest(format!(
                    "key import for {} failed: {}",
                    signer.key_name,
                    out.stderr.trim()
                )));
            }
            info!(key = %signer.key_name, "signer imported");
        }
        imported.insert(signer.key_name.clone());
        Ok(())
    }

    /// Generate an unsigned MsgMultiSend, sign it offline with the CLI, then broadcast it.
    pub async fn multi_send(&self, req: &MultiSendRequest) -> Result<TransactionReceipt, TxError> {
        let unsigned = unsigned_multi_send(req)?;
        let unsigned_file = write_temp_json(&unsigned)?;
        let signed_file = tempfile::Builder::new()
            .prefix("multisend-signed-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| TxError::InvalidRequest(format!("tempfile: {}", e)))?;

        let sign: Vec<String> = vec![
            "tx".into(),
            "sign".into(),
            unsigned_file.path().to_string_lossy().into_owned(),
            "--from".into(),
            req.signer.key_name.clone(),
            "--keyring-backend".into(),
            self.config.keyring_backend.clone(),
            "--chain-id".into(),
            self.config.chain_id.clone(),
            "--node".into(),
            self.config.node_url.clone(),
            "--output-document".into(),
            signed_file.path().to_string_lossy().into_owned(),
        ];
        let signed = self.run(&sign, None).await?;
        if !signed.success {
            return Err(classify_failure(&signed.stderr, &signed.stdout));
        }

        let broadcast: Vec<String> = vec![
            "tx".into(),
            "broadcast".into(),
            signed_file.path().to_string_lossy().into_owned(),
            "--node".into(),
            self.config.node_url.clone(),
            "--broadcast-mode".into(),
            "block".into(),
            "-o".into(),
            "json".into(),
        ];
        let receipt = self.broadcast(broadcast).await?;
        info!(
            txhash = %receipt.txhash,
            outputs = req.to_addresses.len(),
            "multi-send broadcast"
        );
        Ok(receipt)
    }
}

fn write_temp_json(value: &serde_json::Value) -> Result<tempfile::NamedTempFile, TxError> {
    let mut file = tempfile::Builder::new()
        .prefix("multisend-unsigned-")
        .suffix(".json")
        .tempfile()
        .map_err(|e| TxError::InvalidRequest(format!("tempfile: {}", e)))?;
    let body =
        serde_json::to_vec(value).map_err(|e| TxError::InvalidRequest(e.to_string()))?;
    file.write_all(&body)
        .map_err(|e| TxError::InvalidRequest(format!("tempfile: {}", e)))?;
    Ok(file)
}

/// Split `0.01boot` into (0.01, "boot").
pub fn parse_gas_price(gas_price: &str) -> Result<(f64, String), TxError> {
    let s = gas_price.trim();
    let split = s
        .find(|c: char| c.is_ascii_alphabetic())
        .ok_or_else(|| TxError::InvalidRequest(format!("gas price without denom: {}", s)))?;
    let (amount, denom) = s.split_at(split);
    let amount: f64 = amount
        .parse()
        .map_err(|_| TxError::InvalidRequest(format!("invalid gas price: {}", s)))?;
    Ok((amount, denom.to_string()))
}

/// Unsigned transaction body for a bank multi-send, fee = ceil(gas * price).
pub fn unsigned_multi_send(req: &MultiSendRequest) -> Result<serde_json::Value, TxError> {
    let outputs = req.outputs().ok_or_else(|| {
        TxError::InvalidRequest(format!(
            "{} recipients but {} amounts",
            req.to_addresses.len(),
            req.amounts.len()
        ))
    })?;
    if req.inputs.is_empty() || outputs.is_empty() {
        return Err(TxError::InvalidRequest("multi-send needs inputs and outputs".into()));
    }
    let (price, fee_denom) = parse_gas_price(&req.gas_price)?;
    let fee = (req.gas as f64 * price).ceil() as u128;
    let entry = |t: &Transfer| {
        serde_json::json!({
            "address": t.address,
            "coins": [{ "denom": req.denom, "amount": t.amount.to_string() }]
        })
    };
    let inputs: Vec<serde_json::Value> = req.inputs.iter().map(entry).collect();
    let outputs: Vec<serde_json::Value> = outputs.iter().map(entry).collect();
    Ok(serde_json::json!({
        "body": {
            "messages": [{
                "@type": "/cosmos.bank.v1beta1.MsgMultiSend",
                "inputs": inputs,
                "outputs": outputs
            }],
            "memo": "",
            "timeout_height": "0",
            "extension_options": [],
            "non_critical_extension_options": []
        },
        "auth_info": {
            "signer_infos": [],
            "fee": {
                "amount": [{ "denom": fee_denom, "amount": fee.to_string() }],
                "gas_limit": req.gas.to_string(),
                "payer": "",
                "granter": ""
            }
        },
        "signatures": []
    }))
}

/// A JSON receipt on stdout wins regardless of exit status; otherwise classify stderr.
pub fn parse_broadcast_output(out: &CommandOutput) -> Result<TransactionReceipt, TxError> {
    if let Some(start) = out.stdout.find('{') {
        match serde_json::from_str::<TransactionReceipt>(out.stdout[start..].trim()) {
            Ok(receipt) => return Ok(receipt),
            Err(e) if out.success => {
                return Err(TxError::Malformed(format!("receipt: {}", e)));
            }
            Err(e) => warn!(error = %e, "unparseable stdout from failed command"),
        }
    }
    Err(classify_failure(&out.stderr, &out.stdout))
}

pub fn classify_failure(stderr: &str, stdout: &str) -> TxError {
    let detail = if stderr.trim().is_empty() {
        stdout.trim()
    } else {
        stderr.trim()
    };
    if detail.is_empty() {
        return TxError::Malformed("empty output from chain CLI".to_string());
    }
    let lower = detail.to_lowercase();
    if TRANSPORT_MARKERS.iter().any(|m| lower.contains(m)) {
        TxError::Broadcast(detail.to_string())
    } else {
        TxError::Rejected {
            code: None,
            raw_log: detail.to_string(),
        }
    }
}
