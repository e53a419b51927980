//! Claim workflow: participant records, steps, the engine, and its outcome.

mod engine;
mod outcome;
mod record;
mod steps;

pub use engine::{ClaimWorkflow, WorkflowContracts, WorkflowError};
pub use outcome::{StepResult, WorkflowOutcome};
pub use record::{
    decode_proof, load_records, read_records, select_record, ChainClaim, ExternalChain,
    ParticipantRecord, RecordError,
};
pub use steps::{ContractRole, Mode, Step, WorkflowState};
