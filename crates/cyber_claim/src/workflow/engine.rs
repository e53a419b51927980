//! Claim workflow engine: one record, one mode, steps in order, fail fast.

use crate::chain::{Ledger, TransactionReceipt, TransactionRequest, TxError};
use crate::config::{ClaimConfig, ConfigError, WorkflowConfig};
use crate::workflow::outcome::WorkflowOutcome;
use crate::workflow::record::ParticipantRecord;
use crate::workflow::steps::{ContractRole, Mode, Step, WorkflowState};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("missing field {field} for step {step}")]
    MissingField {
        step: &'static str,
        field: &'static str,
    },
    #[error("step {step}: {source}")]
    Tx {
        step: &'static str,
        #[source]
        source: TxError,
    },
    #[error("step {step} rejected (code {code}): {raw_log}")]
    Rejected {
        step: &'static str,
        code: u32,
        raw_log: String,
    },
}

impl WorkflowError {
    /// Transport failures and ledger rejections; everything else is terminal for the record.
    pub fn is_transient(&self) -> bool {
        match self {
            WorkflowError::MissingField { .. } => false,
            WorkflowError::Tx { source, .. } => source.is_transient(),
            WorkflowError::Rejected { .. } => true,
        }
    }
}

/// Deployed addresses the steps target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowContracts {
    pub gift: String,
    pub passport: String,
}

impl WorkflowContracts {
    fn address(&self, role: ContractRole) -> &str {
        match role {
            ContractRole::Gift => &self.gift,
            ContractRole::Passport => &self.passport,
        }
    }
}

pub struct ClaimWorkflow<'a, L: Ledger + ?Sized> {
    ledger: &'a L,
    contracts: WorkflowContracts,
    settings: WorkflowConfig,
    gas_price: String,
}

impl<'a, L: Ledger + ?Sized> ClaimWorkflow<'a, L> {
    pub fn new(
        ledger: &'a L,
        contracts: WorkflowContracts,
        settings: WorkflowConfig,
        gas_price: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            contracts,
            settings,
            gas_price: gas_price.into(),
        }
    }

    pub fn from_config(ledger: &'a L, config: &ClaimConfig) -> Result<Self, WorkflowError> {
        let contracts = config.require_contracts().map_err(|e| match e {
            ConfigError::Missing(field) => WorkflowError::MissingField {
                step: "start",
                field,
            },
            _ => WorkflowError::MissingField {
                step: "start",
                field: "contracts",
            },
        })?;
        Ok(Self::new(
            ledger,
            WorkflowContracts {
                gift: contracts.gift.clone(),
                passport: contracts.passport.clone(),
            },
            config.workflow.clone(),
            config.ledger.gas_price.clone(),
        ))
    }

    /// Build every request of the mode. Fails before anything is submitted if a field is missing.
    pub fn plan(
        &self,
        record: &ParticipantRecord,
        mode: Mode,
    ) -> Result<Vec<(Step, TransactionRequest)>, WorkflowError> {
        if record.primary_address.trim().is_empty() {
            return Err(WorkflowError::MissingField {
                step: "start",
                field: "bostrom_address",
            });
        }
        if record.mnemonic.trim().is_empty() {
            return Err(WorkflowError::MissingField {
                step: "start",
                field: "mnemonic",
            });
        }
        let signer = record.signer();
        mode.steps()
            .iter()
            .map(|step| {
                let contract = self.contracts.address(step.role());
                if contract.trim().is_empty() {
                    return Err(WorkflowError::MissingField {
                        step: step.name(),
                        field: match step.role() {
                            ContractRole::Gift => "contracts.gift",
                            ContractRole::Passport => "contracts.passport",
                        },
                    });
                }
                let msg = step.message(record)?;
                Ok((
                    *step,
                    TransactionRequest {
                        contract: contract.to_string(),
                        gas: msg.gas(&self.settings.gas),
                        msg,
                        signer: signer.clone(),
                        gas_price: self.gas_price.clone(),
                        funds: None,
                    },
                ))
            })
            .collect()
    }

    /// Run the mode from `Start`. Every attempted step lands in `outcome`; the first
    /// failing step is marked there and returned as the error.
    pub async fn run(
        &self,
        record: &ParticipantRecord,
        mode: Mode,
        outcome: &mut WorkflowOutcome,
    ) -> Result<WorkflowState, WorkflowError> {
        let plan = self.plan(record, mode)?;
        let delay = Duration::from_millis(self.settings.step_delay_ms);
        for (i, (step, request)) in plan.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            debug!(step = step.name(), contract = %request.contract, gas = request.gas, "submitting");
            match self.submit(*step, request).await {
                Ok(receipt) => {
                    info!(
                        address = %record.primary_address,
                        step = step.name(),
                        txhash = %receipt.txhash,
                        gas_used = receipt.gas_used,
                        "step committed"
                    );
                    outcome.record(*step, receipt);
                    debug!(state = ?step.reaches(), "advanced");
                }
                Err(e) => {
                    warn!(address = %record.primary_address, step = step.name(), error = %e, "step failed");
                    outcome.fail_from(*step, &e.to_string());
                    return Err(e);
                }
            }
        }
        Ok(WorkflowState::Done)
    }

    async fn submit(
        &self,
        step: Step,
        request: &TransactionRequest,
    ) -> Result<TransactionReceipt, WorkflowError> {
        let receipt = self
            .ledger
            .execute(request)
            .await
            .map_err(|source| WorkflowError::Tx {
                step: step.name(),
                source,
            })?;
        if receipt.success() {
            return Ok(receipt);
        }
        if self.is_benign(&receipt.raw_log) {
            info!(step = step.name(), raw_log = %receipt.raw_log, "already done on chain, continuing");
            return Ok(receipt);
        }
        Err(WorkflowError::Rejected {
            step: step.name(),
            code: receipt.code,
            raw_log: receipt.raw_log,
        })
    }

    fn is_benign(&self, raw_log: &str) -> bool {
        self.settings
            .benign_rejections
            .iter()
            .any(|marker| !marker.is_empty() && raw_log.contains(marker.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ContractMsg;
    use crate::testing::{alice, contracts, fast_settings, receipt, MockLedger};

    #[tokio::test]
    async fn full_run_commits_five_steps_in_order() {
        let ledger = MockLedger::default();
        let wf = ClaimWorkflow::new(&ledger, contracts(), fast_settings(), "0.01boot");
        let mut outcome = WorkflowOutcome::new(Mode::Participate);
        let state = wf.run(&alice(), Mode::Participate, &mut outcome).await.unwrap();
        assert_eq!(state, WorkflowState::Done);
        assert_eq!(
            outcome.step_names(),
            ["create", "proof_ethereum", "proof_cosmos", "claim_ethereum", "claim_cosmos"]
        );
        assert_eq!(outcome.receipts().count(), 5);

        let sent = ledger.submitted();
        assert_eq!(sent.len(), 5);
        assert_eq!(sent[0].contract, "bostrom1passport");
        assert_eq!(sent[0].gas, 600_000);
        assert_eq!(sent[3].contract, "bostrom1gift");
        assert_eq!(
            sent[3].msg,
            ContractMsg::Claim {
                nickname: "alice".into(),
                gift_claiming_address: "0xabc".into(),
                gift_amount: "100".into(),
                proof: vec!["h1".into(), "h2".into()],
            }
        );
        assert_eq!(sent[0].signer.key_name, "claim-bostrom1alice");
    }

    #[tokio::test]
    async fn missing_field_submits_nothing() {
        let ledger = MockLedger::default();
        let wf = ClaimWorkflow::new(&ledger, contracts(), fast_settings(), "0.01boot");
        let mut record = alice();
        record.cosmos.amount.clear();
        let mut outcome = WorkflowOutcome::new(Mode::Participate);
        let err = wf.run(&record, Mode::Participate, &mut outcome).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::MissingField {
                step: "claim_cosmos",
                field: "cosmos_amount"
            }
        ));
        assert!(!err.is_transient());
        assert!(ledger.submitted().is_empty());
        assert!(outcome.entries().is_empty());
    }

    #[tokio::test]
    async fn rejection_stops_the_record() {
        let ledger = MockLedger::default();
        ledger.push(Ok(receipt(0, "")));
        ledger.push(Ok(receipt(5, "signature verification failed")));
        let wf = ClaimWorkflow::new(&ledger, contracts(), fast_settings(), "0.01boot");
        let mut outcome = WorkflowOutcome::new(Mode::Participate);
        let err = wf.run(&alice(), Mode::Participate, &mut outcome).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Rejected {
                step: "proof_ethereum",
                code: 5,
                ..
            }
        ));
        assert!(err.is_transient());
        assert_eq!(ledger.submitted().len(), 2);
        assert_eq!(outcome.receipts().count(), 1);
    }

    #[tokio::test]
    async fn benign_rejection_continues() {
        let ledger = MockLedger::default();
        ledger.push(Ok(receipt(5, "execute wasm contract failed: Nickname already exists")));
        let wf = ClaimWorkflow::new(&ledger, contracts(), fast_settings(), "0.01boot");
        let mut outcome = WorkflowOutcome::new(Mode::Participate);
        wf.run(&alice(), Mode::Participate, &mut outcome).await.unwrap();
        assert_eq!(outcome.receipts().count(), 5);
    }

    #[tokio::test]
    async fn malformed_response_is_terminal() {
        let ledger = MockLedger::default();
        ledger.push(Err(TxError::Malformed("no json".into())));
        let wf = ClaimWorkflow::new(&ledger, contracts(), fast_settings(), "0.01boot");
        let mut outcome = WorkflowOutcome::new(Mode::ReleaseOnly);
        let err = wf.run(&alice(), Mode::ReleaseOnly, &mut outcome).await.unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(outcome.entries().len(), 2);
        assert_eq!(
            ledger.submitted()[0].msg,
            ContractMsg::Release {
                gift_address: "0xabc".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn step_delay_only_between_steps() {
        let ledger = MockLedger::default();
        let settings = WorkflowConfig {
            step_delay_ms: 1_000,
            ..Default::default()
        };
        let wf = ClaimWorkflow::new(&ledger, contracts(), settings, "0.01boot");
        let mut outcome = WorkflowOutcome::new(Mode::ReleaseOnly);
        let started = tokio::time::Instant::now();
        wf.run(&alice(), Mode::ReleaseOnly, &mut outcome).await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1_000));
        assert!(elapsed < Duration::from_millis(2_000));
    }
}
