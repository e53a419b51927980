//! Transaction client: contract messages, CLI signing/broadcast, LCD queries, receipts.

pub(crate) mod cli;
mod client;
mod lcd;
mod msgs;
mod receipt;

pub use cli::{parse_broadcast_output, unsigned_multi_send, CliBroadcaster, CommandOutput};
pub use client::{contract_address_from, ensure_committed, Ledger, LedgerClient, TxError};
pub use lcd::{smart_query_path, LcdClient};
pub use msgs::{
    ContractMsg, InstantiateRequest, MultiSendRequest, Signer, TransactionRequest, Transfer,
};
pub use receipt::{EventAttribute, LogEvent, MessageLog, TransactionReceipt};
