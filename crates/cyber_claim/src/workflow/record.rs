//! Participant records: one CSV row per airdrop participant.

use crate::audit::LabelBook;
use crate::chain::Signer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("no record at row {row} ({total} rows)")]
    OutOfRange { row: usize, total: usize },
    #[error("shard size must be positive")]
    ZeroShard,
}

/// External chains a participant proves an address on and claims from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalChain {
    Ethereum,
    Cosmos,
}

impl ExternalChain {
    pub const ALL: [ExternalChain; 2] = [ExternalChain::Ethereum, ExternalChain::Cosmos];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalChain::Ethereum => "ethereum",
            ExternalChain::Cosmos => "cosmos",
        }
    }
}

impl fmt::Display for ExternalChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-chain claim inputs. `proof` is kept in its stored textual form until a step needs it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainClaim {
    pub address: String,
    pub signature: String,
    pub proof: String,
    pub amount: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub nickname: String,
    pub avatar: String,
    /// Native (bostrom) address of the signer; keys the done/unsuccessful status line.
    pub primary_address: String,
    pub mnemonic: String,
    /// Signature over the passport constitution, when the passport contract demands one.
    #[serde(default)]
    pub passport_signature: Option<String>,
    pub ethereum: ChainClaim,
    pub cosmos: ChainClaim,
}

impl fmt::Debug for ParticipantRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParticipantRecord")
            .field("nickname", &self.nickname)
            .field("primary_address", &self.primary_address)
            .field("ethereum", &self.ethereum.address)
            .field("cosmos", &self.cosmos.address)
            .finish_non_exhaustive()
    }
}

impl ParticipantRecord {
    pub fn chain(&self, chain: ExternalChain) -> &ChainClaim {
        match chain {
            ExternalChain::Ethereum => &self.ethereum,
            ExternalChain::Cosmos => &self.cosmos,
        }
    }

    /// Keyring name for this record's signer.
    pub fn key_name(&self) -> String {
        format!("claim-{}", self.primary_address)
    }

    pub fn signer(&self) -> Signer {
        Signer::from_mnemonic(self.key_name(), self.mnemonic.clone())
    }

    /// Labels for every value the passport contract turns into a particle.
    pub fn label_book(&self) -> LabelBook {
        let mut book = LabelBook::new();
        book.insert_text(&self.nickname, format!("nickname {}", self.nickname));
        book.insert_cid(&self.avatar, "avatar");
        book.insert_text(&self.primary_address, self.primary_address.clone());
        for chain in ExternalChain::ALL {
            let address = &self.chain(chain).address;
            book.insert_text(address, format!("{} {}", chain, address));
        }
        book
    }
}

/// Flat CSV row layout of a participant record.
#[derive(Debug, Deserialize)]
struct RecordRow {
    nickname: String,
    avatar: String,
    bostrom_address: String,
    mnemonic: String,
    #[serde(default)]
    passport_signature: Option<String>,
    ethereum_address: String,
    ethereum_message_signature: String,
    ethereum_proof: String,
    ethereum_amount: String,
    cosmos_address: String,
    cosmos_message_signature: String,
    cosmos_proof: String,
    cosmos_amount: String,
}

impl From<RecordRow> for ParticipantRecord {
    fn from(row: RecordRow) -> Self {
        Self {
            nickname: row.nickname,
            avatar: row.avatar,
            primary_address: row.bostrom_address,
            mnemonic: row.mnemonic,
            passport_signature: row.passport_signature.filter(|s| !s.trim().is_empty()),
            ethereum: ChainClaim {
                address: row.ethereum_address,
                signature: row.ethereum_message_signature,
                proof: row.ethereum_proof,
                amount: row.ethereum_amount,
            },
            cosmos: ChainClaim {
                address: row.cosmos_address,
                signature: row.cosmos_message_signature,
                proof: row.cosmos_proof,
                amount: row.cosmos_amount,
            },
        }
    }
}

pub fn read_records<R: std::io::Read>(reader: R) -> Result<Vec<ParticipantRecord>, RecordError> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut out = Vec::new();
    for row in csv.deserialize::<RecordRow>() {
        out.push(row?.into());
    }
    Ok(out)
}

pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<ParticipantRecord>, RecordError> {
    let file = std::fs::File::open(path.as_ref()).map_err(csv::Error::from)?;
    read_records(file)
}

/// Row selected by a record index: files hold `shard_size` rows, index `i` maps to row `i % shard_size`.
pub fn select_record(
    records: &[ParticipantRecord],
    index: usize,
    shard_size: usize,
) -> Result<&ParticipantRecord, RecordError> {
    if shard_size == 0 {
        return Err(RecordError::ZeroShard);
    }
    let row = index % shard_size;
    records.get(row).ok_or(RecordError::OutOfRange {
        row,
        total: records.len(),
    })
}

/// Decode a stored Merkle path such as `['h1', 'h2']` into `["h1", "h2"]`.
pub fn decode_proof(stored: &str) -> Vec<String> {
    stored
        .replace(['\'', '"', '[', ']'], "")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
