//! Audit trail: receipt interpretation, contract roles, content-id labels.

mod cid;
mod interpreter;
mod registry;

pub use cid::{content_id, LabelBook, CYBERHOLE};
pub use interpreter::{group_thousands, rule_for, Effect, EffectKind, EventInterpreter, FormatRule, RULES};
pub use registry::{ContractRegistry, GIFT_ROLE, PASSPORT_ROLE};
