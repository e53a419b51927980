//! Broadcast receipts as returned by the chain CLI (`-o json`, block broadcast mode).

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventAttribute {
    pub key: String,
    #[serde(default, deserialize_with = "null_default")]
    pub value: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_default")]
    pub attributes: Vec<EventAttribute>,
}

impl LogEvent {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

/// Events emitted by one message of a transaction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageLog {
    #[serde(default)]
    pub msg_index: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub events: Vec<LogEvent>,
}

/// One broadcast attempt's result. `code == 0` means the ledger committed the transaction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionReceipt {
    #[serde(default, deserialize_with = "u64_from_any")]
    pub height: u64,
    pub txhash: String,
    #[serde(default, deserialize_with = "null_default")]
    pub codespace: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub raw_log: String,
    #[serde(default, deserialize_with = "null_default")]
    pub logs: Vec<MessageLog>,
    #[serde(default, deserialize_with = "u64_from_any")]
    pub gas_wanted: u64,
    #[serde(default, deserialize_with = "u64_from_any")]
    pub gas_used: u64,
    /// Flat event list reported by newer SDKs alongside (or instead of) `logs`.
    #[serde(default, deserialize_with = "null_default")]
    pub events: Vec<LogEvent>,
}

impl TransactionReceipt {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Structured events in emission order; per-message logs first, flat list as fallback.
    pub fn structured_events(&self) -> Vec<&LogEvent> {
        let from_logs: Vec<&LogEvent> = self.logs.iter().flat_map(|l| l.events.iter()).collect();
        if !from_logs.is_empty() || !self.success() {
            return from_logs;
        }
        self.events.iter().collect()
    }

    pub fn first_event(&self, kind: &str) -> Option<&LogEvent> {
        self.structured_events().into_iter().find(|e| e.kind == kind)
    }
}

fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrString {
    Num(u64),
    Str(String),
}

/// The SDK encodes 64-bit integers as JSON strings; accept both forms.
fn u64_from_any<'de, D>(d: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumOrString>::deserialize(d)? {
        None => Ok(0),
        Some(NumOrString::Num(n)) => Ok(n),
        Some(NumOrString::Str(s)) if s.trim().is_empty() => Ok(0),
        Some(NumOrString::Str(s)) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
