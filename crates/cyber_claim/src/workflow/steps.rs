//! Workflow steps, modes, and the message each step submits.

use crate::chain::ContractMsg;
use crate::workflow::engine::WorkflowError;
use crate::workflow::record::{decode_proof, ExternalChain, ParticipantRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    Create,
    Proof(ExternalChain),
    Claim(ExternalChain),
    Release(ExternalChain),
}

/// Which deployed contract a step targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContractRole {
    Passport,
    Gift,
}

/// Position in the claim state machine, as reached after a step commits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowState {
    Start,
    IdentityCreated,
    AddressProven(ExternalChain),
    Claimed(ExternalChain),
    Released(ExternalChain),
    Done,
}

const PARTICIPATE: [Step; 5] = [
    Step::Create,
    Step::Proof(ExternalChain::Ethereum),
    Step::Proof(ExternalChain::Cosmos),
    Step::Claim(ExternalChain::Ethereum),
    Step::Claim(ExternalChain::Cosmos),
];

const PARTICIPATE_AND_RELEASE: [Step; 7] = [
    Step::Create,
    Step::Proof(ExternalChain::Ethereum),
    Step::Proof(ExternalChain::Cosmos),
    Step::Claim(ExternalChain::Ethereum),
    Step::Claim(ExternalChain::Cosmos),
    Step::Release(ExternalChain::Ethereum),
    Step::Release(ExternalChain::Cosmos),
];

const RELEASE_ONLY: [Step; 2] = [
    Step::Release(ExternalChain::Ethereum),
    Step::Release(ExternalChain::Cosmos),
];

impl Step {
    /// Key of this step in outcome artifacts.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Create => "create",
            Step::Proof(ExternalChain::Ethereum) => "proof_ethereum",
            Step::Proof(ExternalChain::Cosmos) => "proof_cosmos",
            Step::Claim(ExternalChain::Ethereum) => "claim_ethereum",
            Step::Claim(ExternalChain::Cosmos) => "claim_cosmos",
            Step::Release(ExternalChain::Ethereum) => "release_ethereum",
            Step::Release(ExternalChain::Cosmos) => "release_cosmos",
        }
    }

    pub fn role(&self) -> ContractRole {
        match self {
            Step::Create | Step::Proof(_) => ContractRole::Passport,
            Step::Claim(_) | Step::Release(_) => ContractRole::Gift,
        }
    }

    pub fn reaches(&self) -> WorkflowState {
        match *self {
            Step::Create => WorkflowState::IdentityCreated,
            Step::Proof(chain) => WorkflowState::AddressProven(chain),
            Step::Claim(chain) => WorkflowState::Claimed(chain),
            Step::Release(chain) => WorkflowState::Released(chain),
        }
    }

    /// Build this step's contract message, checking every field it reads.
    pub fn message(&self, record: &ParticipantRecord) -> Result<ContractMsg, WorkflowError> {
        let step = self.name();
        match *self {
            Step::Create => Ok(ContractMsg::CreateIdentity {
                avatar: required(step, "avatar", &record.avatar)?,
                nickname: required(step, "nickname", &record.nickname)?,
                signature: record.passport_signature.clone(),
            }),
            Step::Proof(chain) => {
                let claim = record.chain(chain);
                Ok(ContractMsg::ProveAddress {
                    address: required(step, address_field(chain), &claim.address)?,
                    nickname: required(step, "nickname", &record.nickname)?,
                    signature: required(step, signature_field(chain), &claim.signature)?,
                })
            }
            Step::Claim(chain) => {
                let claim = record.chain(chain);
                let proof = decode_proof(&claim.proof);
                if proof.is_empty() {
                    return Err(WorkflowError::MissingField {
                        step,
                        field: proof_field(chain),
                    });
                }
                Ok(ContractMsg::Claim {
                    nickname: required(step, "nickname", &record.nickname)?,
                    gift_claiming_address: required(step, address_field(chain), &claim.address)?,
                    gift_amount: required(step, amount_field(chain), &claim.amount)?,
                    proof,
                })
            }
            Step::Release(chain) => Ok(ContractMsg::Release {
                gift_address: required(step, address_field(chain), &record.chain(chain).address)?,
            }),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn required(step: &'static str, field: &'static str, value: &str) -> Result<String, WorkflowError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(WorkflowError::MissingField { step, field });
    }
    Ok(value.to_string())
}

fn address_field(chain: ExternalChain) -> &'static str {
    match chain {
        ExternalChain::Ethereum => "ethereum_address",
        ExternalChain::Cosmos => "cosmos_address",
    }
}

fn signature_field(chain: ExternalChain) -> &'static str {
    match chain {
        ExternalChain::Ethereum => "ethereum_message_signature",
        ExternalChain::Cosmos => "cosmos_message_signature",
    }
}

fn proof_field(chain: ExternalChain) -> &'static str {
    match chain {
        ExternalChain::Ethereum => "ethereum_proof",
        ExternalChain::Cosmos => "cosmos_proof",
    }
}

fn amount_field(chain: ExternalChain) -> &'static str {
    match chain {
        ExternalChain::Ethereum => "ethereum_amount",
        ExternalChain::Cosmos => "cosmos_amount",
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    Participate,
    ParticipateAndRelease,
    ReleaseOnly,
}

impl Mode {
    pub fn steps(&self) -> &'static [Step] {
        match self {
            Mode::Participate => &PARTICIPATE,
            Mode::ParticipateAndRelease => &PARTICIPATE_AND_RELEASE,
            Mode::ReleaseOnly => &RELEASE_ONLY,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Participate => "participate",
            Mode::ParticipateAndRelease => "participate-and-release",
            Mode::ReleaseOnly => "release-only",
        }
    }

    /// File stem of the per-record outcome artifact.
    pub fn artifact_stem(&self) -> &'static str {
        match self {
            Mode::Participate => "contract_participation_execution_log",
            Mode::ParticipateAndRelease => "contract_participation_release_execution_log",
            Mode::ReleaseOnly => "contract_release_execution_log",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "participate" => Ok(Mode::Participate),
            "participate-and-release" => Ok(Mode::ParticipateAndRelease),
            "release-only" => Ok(Mode::ReleaseOnly),
            other => Err(format!("unknown mode: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::alice;

    #[test]
    fn claim_message_from_record() {
        let msg = Step::Claim(ExternalChain::Ethereum).message(&alice()).unwrap();
        assert_eq!(
            msg.to_json().unwrap(),
            r#"{"claim":{"nickname":"alice","gift_claiming_address":"0xabc","gift_amount":"100","proof":["h1","h2"]}}"#
        );
    }

    #[test]
    fn mode_step_sequences() {
        let names: Vec<&str> = Mode::Participate.steps().iter().map(Step::name).collect();
        assert_eq!(
            names,
            ["create", "proof_ethereum", "proof_cosmos", "claim_ethereum", "claim_cosmos"]
        );
        assert_eq!(Mode::ParticipateAndRelease.steps().len(), 7);
        assert_eq!(
            Mode::ReleaseOnly.steps(),
            &[
                Step::Release(ExternalChain::Ethereum),
                Step::Release(ExternalChain::Cosmos)
            ]
        );
        assert_eq!(
            Mode::ParticipateAndRelease.steps().last().map(Step::reaches),
            Some(WorkflowState::Released(ExternalChain::Cosmos))
        );
    }

    #[test]
    fn missing_field_names_step_and_field() {
        let mut record = alice();
        record.cosmos.signature = "  ".into();
        match Step::Proof(ExternalChain::Cosmos).message(&record) {
            Err(WorkflowError::MissingField { step, field }) => {
                assert_eq!(step, "proof_cosmos");
                assert_eq!(field, "cosmos_message_signature");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_proof_list_is_missing_field() {
        for stored in ["[]", "['']", " [ ] "] {
            let mut record = alice();
            record.ethereum.proof = stored.into();
            match Step::Claim(ExternalChain::Ethereum).message(&record) {
                Err(e @ WorkflowError::MissingField { .. }) => {
                    assert_eq!(e.to_string(), "missing field ethereum_proof for step claim_ethereum");
                    assert!(!e.is_transient());
                }
                other => panic!("{}: unexpected {:?}", stored, other),
            }
        }
    }

    #[test]
    fn identity_gas_is_higher_and_roles_match() {
        let gas = crate::config::GasSchedule::default();
        let record = alice();
        let create = Step::Create.message(&record).unwrap();
        let claim = Step::Claim(ExternalChain::Cosmos).message(&record).unwrap();
        assert!(create.gas(&gas) > claim.gas(&gas));
        assert_eq!(Step::Create.role(), ContractRole::Passport);
        assert_eq!(Step::Release(ExternalChain::Cosmos).role(), ContractRole::Gift);
    }

    #[test]
    fn mode_parses_and_names_artifacts() {
        let mode: Mode = "release-only".parse().unwrap();
        assert_eq!(mode.artifact_stem(), "contract_release_execution_log");
        let stems: std::collections::HashSet<&str> = [
            Mode::Participate,
            Mode::ParticipateAndRelease,
            Mode::ReleaseOnly,
        ]
        .iter()
        .map(Mode::artifact_stem)
        .collect();
        assert_eq!(stems.len(), 3);
        assert!("bogus".parse::<Mode>().is_err());
    }
}
