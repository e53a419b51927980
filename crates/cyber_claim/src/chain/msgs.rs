//! Wire messages for the passport and gift contracts, and the requests that carry them.

use crate::config::GasSchedule;
use serde::{Deserialize, Serialize};

/// Execute messages understood by the passport (identity) and gift contracts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContractMsg {
    CreateIdentity {
        avatar: String,
        nickname: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    ProveAddress {
        address: String,
        nickname: String,
        signature: String,
    },
    Claim {
        nickname: String,
        gift_claiming_address: String,
        gift_amount: String,
        /// Hex-encoded Merkle path, leaf side first.
        proof: Vec<String>,
    },
    Release {
        gift_address: String,
    },
    TransferNft {
        recipient: String,
        token_id: String,
    },
    Burn {
        token_id: String,
    },
}

impl ContractMsg {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Gas limit for this message's class.
    pub fn gas(&self, schedule: &GasSchedule) -> u64 {
        match self {
            ContractMsg::CreateIdentity { .. } => schedule.identity,
            ContractMsg::TransferNft { .. } | ContractMsg::Burn { .. } => schedule.nft,
            ContractMsg::ProveAddress { .. } => schedule.proof,
            ContractMsg::Claim { .. } => schedule.claim,
            ContractMsg::Release { .. } => schedule.release,
        }
    }
}

/// Key used to sign. A mnemonic, when present, is imported into the keyring under `key_name` first.
#[derive(Clone, PartialEq, Eq)]
pub struct Signer {
    pub key_name: String,
    pub mnemonic: Option<String>,
}

impl Signer {
    pub fn keyring(key_name: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
            mnemonic: None,
        }
    }

    pub fn from_mnemonic(key_name: impl Into<String>, mnemonic: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
            mnemonic: Some(mnemonic.into()),
        }
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("key_name", &self.key_name)
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A single contract execution. Built once, never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    pub contract: String,
    pub msg: ContractMsg,
    pub signer: Signer,
    pub gas: u64,
    pub gas_price: String,
    /// Native funds attached to the call, e.g. `1000000boot`.
    pub funds: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstantiateRequest {
    pub code_id: u64,
    pub init_msg: serde_json::Value,
    pub label: String,
    pub funds: Option<String>,
    pub admin: Option<String>,
    pub signer: Signer,
    pub gas: u64,
    pub gas_price: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transfer {
    pub address: String,
    pub amount: u128,
}

/// Native bank multi-send. Outputs pair `to_addresses[i]` with `amounts[i]`;
/// the ledger, not the client, checks that inputs and outputs balance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiSendRequest {
    pub inputs: Vec<Transfer>,
    pub to_addresses: Vec<String>,
    pub amounts: Vec<u128>,
    pub denom: String,
    pub signer: Signer,
    pub gas: u64,
    pub gas_price: String,
}

impl MultiSendRequest {
    pub fn outputs(&self) -> Option<Vec<Transfer>> {
        if self.to_addresses.len() != self.amounts.len() {
            return None;
        }
        Some(
            self.to_addresses
                .iter()
                .zip(&self.amounts)
                .map(|(address, amount)| Transfer {
                    address: address.clone(),
                    amount: *amount,
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn claim_wire_shape() {
        let msg = ContractMsg::Claim {
            nickname: "alice".into(),
            gift_claiming_address: "0xabc".into(),
            gift_amount: "100".into(),
            proof: vec!["h1".into(), "h2".into()],
        };
        assert_eq!(
            msg.to_json().unwrap(),
            r#"{"claim":{"nickname":"alice","gift_claiming_address":"0xabc","gift_amount":"100","proof":["h1","h2"]}}"#
        );
    }

    #[test]
    fn identity_signature_omitted_when_absent() {
        let msg = ContractMsg::CreateIdentity {
            avatar: "QmAvatar".into(),
            nickname: "alice".into(),
            signature: None,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"create_identity": {"avatar": "QmAvatar", "nickname": "alice"}})
        );
    }

    #[test]
    fn nft_messages() {
        let transfer = ContractMsg::TransferNft {
            recipient: "bostrom1xyz".into(),
            token_id: "7".into(),
        };
        let burn = ContractMsg::Burn {
            token_id: "7".into(),
        };
        assert_eq!(
            serde_json::to_value(&transfer).unwrap(),
            json!({"transfer_nft": {"recipient": "bostrom1xyz", "token_id": "7"}})
        );
        assert_eq!(
            serde_json::to_value(&burn).unwrap(),
            json!({"burn": {"token_id": "7"}})
        );
    }

    #[test]
    fn nft_and_identity_messages_get_the_larger_gas() {
        let gas = GasSchedule::default();
        let burn = ContractMsg::Burn {
            token_id: "7".into(),
        };
        let release = ContractMsg::Release {
            gift_address: "0xabc".into(),
        };
        assert_eq!(burn.gas(&gas), gas.nft);
        assert!(burn.gas(&gas) > release.gas(&gas));
        let parsed: ContractMsg =
            serde_json::from_str(r#"{"transfer_nft":{"recipient":"bostrom1xyz","token_id":"1"}}"#)
                .unwrap();
        assert_eq!(parsed.gas(&gas), gas.nft);
    }

    #[test]
    fn multi_send_outputs_pair_positionally() {
        let req = MultiSendRequest {
            inputs: vec![Transfer {
                address: "bostrom1from".into(),
                amount: 30,
            }],
            to_addresses: vec!["a".into(), "b".into()],
            amounts: vec![10, 20],
            denom: "boot".into(),
            signer: Signer::keyring("w"),
            gas: 1,
            gas_price: "0.01boot".into(),
        };
        let outs = req.outputs().unwrap();
        assert_eq!(outs[1].address, "b");
        assert_eq!(outs[1].amount, 20);
    }

    #[test]
    fn signer_debug_redacts_mnemonic() {
        let s = Signer::from_mnemonic("k", "word word word");
        assert!(!format!("{:?}", s).contains("word"));
    }
}
