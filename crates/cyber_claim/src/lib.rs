//! cyber_claim: airdrop claim orchestration for a CosmWasm passport/gift deployment.
//!
//! Creates identities, proves external addresses, claims and releases gifts, one
//! transaction per step. Retries whole records; turns receipts into an audit trail.

pub mod audit;
pub mod batch;
pub mod chain;
pub mod config;
pub mod report;
pub mod tools;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use audit::{content_id, ContractRegistry, EventInterpreter, LabelBook};
pub use batch::{Journal, RecordReport, RecordStatus, RetryPolicy, Supervisor};
pub use chain::{Ledger, LedgerClient, TransactionReceipt, TxError};
pub use config::ClaimConfig;
pub use workflow::{ClaimWorkflow, Mode, ParticipantRecord, WorkflowError, WorkflowOutcome};
