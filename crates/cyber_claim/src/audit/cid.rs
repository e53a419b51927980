//! Content ids for label matching in audit output.
//!
//! `base58(0x12 0x20 || sha256(text))`. This hashes the raw text, not a UnixFS-wrapped
//! block, so it does not match the CID an IPFS node would assign to the same content.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Multihash function code for SHA-256 and its digest length.
const MULTIHASH_PREFIX: [u8; 2] = [0x12, 0x20];

/// Domain particle linked by the passport contract on nickname release.
pub const CYBERHOLE: &str = "cyberhole";

pub fn content_id(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut bytes = Vec::with_capacity(MULTIHASH_PREFIX.len() + digest.len());
    bytes.extend_from_slice(&MULTIHASH_PREFIX);
    bytes.extend_from_slice(&digest);
    bs58::encode(bytes).into_string()
}

/// Content id → human label, built from values known for one participant.
#[derive(Clone, Debug, Default)]
pub struct LabelBook {
    labels: HashMap<String, String>,
}

impl LabelBook {
    pub fn new() -> Self {
        let mut book = Self::default();
        book.insert_text(CYBERHOLE, CYBERHOLE);
        book
    }

    /// Label the content id of `text`.
    pub fn insert_text(&mut self, text: &str, label: impl Into<String>) {
        if !text.is_empty() {
            self.labels.insert(content_id(text), label.into());
        }
    }

    /// Label a value that already is a content id (e.g. an avatar reference).
    pub fn insert_cid(&mut self, cid: &str, label: impl Into<String>) {
        if !cid.is_empty() {
            self.labels.insert(cid.to_string(), label.into());
        }
    }

    pub fn label(&self, cid: &str) -> Option<&str> {
        self.labels.get(cid).map(String::as_str)
    }

    /// Label if known, otherwise the content id itself.
    pub fn resolve<'a>(&'a self, cid: &'a str) -> &'a str {
        self.label(cid).unwrap_or(cid)
    }
}
