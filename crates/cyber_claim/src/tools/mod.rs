//! Off-chain helpers invoked around the claim workflow.

mod merkle;

pub use merkle::{generate_proofs, ProofBatch, ProofEntry, ProofFile, ProofRun, ProofToolError};
