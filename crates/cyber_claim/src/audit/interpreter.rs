//! Receipt event log → ordered, human-readable effects.
//!
//! Each event type maps to one formatting rule through `RULES`; unknown types fall back to
//! `FormatRule::Raw`. Adding a type means adding a row.

use crate::audit::cid::LabelBook;
use crate::audit::registry::ContractRegistry;
use crate::chain::{LogEvent, TransactionReceipt};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatRule {
    /// Sender/action summary when the event has exactly three attributes.
    MessageSummary,
    /// One line per attribute, contract addresses replaced by role names.
    AttributeList,
    /// `particleFrom` → `particleTo` edges plus `neuron` annotations.
    Cyberlink,
    /// Coin movements, one line per attribute.
    Transfer,
    /// Contract-emitted attributes with `amount` grouped by thousands.
    ContractAttributes,
    Raw,
}

pub const RULES: &[(&str, FormatRule)] = &[
    ("message", FormatRule::MessageSummary),
    ("execute", FormatRule::AttributeList),
    ("reply", FormatRule::AttributeList),
    ("cyberlink", FormatRule::Cyberlink),
    ("coin_received", FormatRule::Transfer),
    ("coin_spent", FormatRule::Transfer),
    ("transfer", FormatRule::Transfer),
    ("wasm", FormatRule::ContractAttributes),
];

pub fn rule_for(event_type: &str) -> FormatRule {
    RULES
        .iter()
        .find(|(kind, _)| *kind == event_type)
        .map(|(_, rule)| *rule)
        .unwrap_or(FormatRule::Raw)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Message,
    Invocation,
    Link,
    Annotation,
    Transfer,
    Contract,
    Raw,
    Diagnostic,
    Summary,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    pub kind: EffectKind,
    /// Source event type; empty for diagnostic and summary lines.
    pub event: String,
    pub text: String,
}

impl Effect {
    fn new(kind: EffectKind, event: &str, text: String) -> Self {
        Self {
            kind,
            event: event.to_string(),
            text,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.event.is_empty() {
            write!(f, "{}", self.text)
        } else {
            write!(f, "{}: {}", self.event, self.text)
        }
    }
}

pub struct EventInterpreter<'a> {
    registry: &'a ContractRegistry,
    labels: &'a LabelBook,
}

impl<'a> EventInterpreter<'a> {
    pub fn new(registry: &'a ContractRegistry, labels: &'a LabelBook) -> Self {
        Self { registry, labels }
    }

    /// Effects for every structured event, then gas-used and tx-hash summary lines.
    pub fn interpret(&self, receipt: &TransactionReceipt) -> Vec<Effect> {
        let events = receipt.structured_events();
        let mut effects = Vec::new();
        if events.is_empty() {
            effects.push(Effect::new(
                EffectKind::Diagnostic,
                "",
                format!("raw log: {}", receipt.raw_log.trim()),
            ));
        }
        for event in events {
            self.interpret_event(event, &mut effects);
        }
        effects.push(Effect::new(
            EffectKind::Summary,
            "",
            format!("gas used: {}", receipt.gas_used),
        ));
        effects.push(Effect::new(
            EffectKind::Summary,
            "",
            format!("tx hash: {}", receipt.txhash),
        ));
        effects
    }

    pub fn render(&self, receipt: &TransactionReceipt) -> Vec<String> {
        self.interpret(receipt)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn interpret_event(&self, event: &LogEvent, out: &mut Vec<Effect>) {
        let kind = event.kind.as_str();
        match rule_for(kind) {
            FormatRule::MessageSummary => out.push(self.message_summary(event)),
            FormatRule::AttributeList => {
                self.attribute_lines(event, EffectKind::Invocation, out)
            }
            FormatRule::Cyberlink => self.cyberlinks(event, out),
            FormatRule::Transfer => self.attribute_lines(event, EffectKind::Transfer, out),
            FormatRule::ContractAttributes => {
                for attr in &event.attributes {
                    let value = if attr.key == "amount" {
                        group_thousands(&attr.value)
                    } else {
                        attr.value.clone()
                    };
                    out.push(Effect::new(
                        EffectKind::Contract,
                        kind,
                        format!("{} = {}", attr.key, value),
                    ));
                }
            }
            FormatRule::Raw => out.push(raw_effect(event)),
        }
    }

    fn message_summary(&self, event: &LogEvent) -> Effect {
        let summary = if event.attributes.len() == 3 {
            event
                .attribute("sender")
                .zip(event.attribute("action"))
                .map(|(sender, action)| {
                    let module = event.attribute("module").unwrap_or("-");
                    format!(
                        "{} executed {} ({})",
                        self.registry.resolve(sender),
                        action,
                        module
                    )
                })
        } else {
            None
        };
        match summary {
            Some(text) => Effect::new(EffectKind::Message, &event.kind, text),
            None => raw_effect(event),
        }
    }

    fn attribute_lines(&self, event: &LogEvent, kind: EffectKind, out: &mut Vec<Effect>) {
        for attr in &event.attributes {
            out.push(Effect::new(
                kind,
                &event.kind,
                format!("{} = {}", attr.key, self.registry.resolve(&attr.value)),
            ));
        }
    }

    /// Pairs each `particleFrom` with the next `particleTo` before another `particleFrom`.
    fn cyberlinks(&self, event: &LogEvent, out: &mut Vec<Effect>) {
        let attrs = &event.attributes;
        let mut consumed = vec![false; attrs.len()];
        for (i, attr) in attrs.iter().enumerate() {
            if consumed[i] {
                continue;
            }
            match attr.key.as_str() {
                "particleFrom" => {
                    let to = attrs[i + 1..]
                        .iter()
                        .position(|a| a.key == "particleTo" || a.key == "particleFrom")
                        .map(|offset| i + 1 + offset)
                        .filter(|&j| attrs[j].key == "particleTo");
                    let to_label = match to {
                        Some(j) => {
                            consumed[j] = true;
                            self.labels.resolve(&attrs[j].value)
                        }
                        None => "?",
                    };
                    out.push(Effect::new(
                        EffectKind::Link,
                        &event.kind,
                        format!("{} -> {}", self.labels.resolve(&attr.value), to_label),
                    ));
                }
                "particleTo" => out.push(Effect::new(
                    EffectKind::Link,
                    &event.kind,
                    format!("? -> {}", self.labels.resolve(&attr.value)),
                )),
                "neuron" => out.push(Effect::new(
                    EffectKind::Annotation,
                    &event.kind,
                    format!("neuron {}", self.registry.resolve(&attr.value)),
                )),
                _ => out.push(Effect::new(
                    EffectKind::Annotation,
                    &event.kind,
                    format!("{} = {}", attr.key, attr.value),
                )),
            }
        }
    }
}

fn raw_effect(event: &LogEvent) -> Effect {
    let text = serde_json::to_string(&event.attributes).unwrap_or_default();
    Effect::new(EffectKind::Raw, &event.kind, text)
}

/// `1234567` → `1,234,567`; anything that is not an unsigned integer is returned unchanged.
pub fn group_thousands(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return raw.to_string();
    }
    let digits = trimmed.trim_start_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::cid::{content_id, CYBERHOLE};
    use crate::audit::registry::{GIFT_ROLE, PASSPORT_ROLE};
    use crate::chain::EventAttribute;

    fn event(kind: &str, attrs: &[(&str, &str)]) -> LogEvent {
        LogEvent {
            kind: kind.to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| EventAttribute {
                    key: k.to_string(),
                    value: v.to_string(),
                })
                .collect(),
        }
    }

    fn receipt(events: Vec<LogEvent>) -> TransactionReceipt {
        let logs = serde_json::json!([{ "msg_index": 0, "events": events }]);
        serde_json::from_value(serde_json::json!({
            "txhash": "HASH1", "code": 0, "gas_used": "123456", "logs": logs
        }))
        .unwrap()
    }

    fn registry() -> ContractRegistry {
        ContractRegistry::new([
            ("bostrom1gift", GIFT_ROLE),
            ("bostrom1passport", PASSPORT_ROLE),
        ])
    }

    #[test]
    fn every_known_type_has_a_rule_and_unknown_falls_back() {
        for (kind, rule) in RULES {
            assert_eq!(rule_for(kind), *rule);
        }
        assert_eq!(rule_for("message"), FormatRule::MessageSummary);
        assert_eq!(rule_for("execute"), FormatRule::AttributeList);
        assert_eq!(rule_for("reply"), FormatRule::AttributeList);
        assert_eq!(rule_for("cyberlink"), FormatRule::Cyberlink);
        assert_eq!(rule_for("coin_received"), FormatRule::Transfer);
        assert_eq!(rule_for("coin_spent"), FormatRule::Transfer);
        assert_eq!(rule_for("transfer"), FormatRule::Transfer);
        assert_eq!(rule_for("wasm"), FormatRule::ContractAttributes);
        assert_eq!(rule_for("instantiate"), FormatRule::Raw);
        assert_eq!(rule_for(""), FormatRule::Raw);
    }

    #[test]
    fn message_summary_needs_three_attributes() {
        let reg = registry();
        let labels = LabelBook::new();
        let interp = EventInterpreter::new(&reg, &labels);
        let lines = interp.render(&receipt(vec![
            event(
                "message",
                &[
                    ("action", "/cosmwasm.wasm.v1.MsgExecuteContract"),
                    ("module", "wasm"),
                    ("sender", "bostrom1alice"),
                ],
            ),
            event("message", &[("module", "wasm")]),
        ]));
        assert_eq!(
            lines[0],
            "message: bostrom1alice executed /cosmwasm.wasm.v1.MsgExecuteContract (wasm)"
        );
        assert_eq!(lines[1], r#"message: [{"key":"module","value":"wasm"}]"#);
    }

    #[test]
    fn execute_and_transfer_resolve_contracts() {
        let reg = registry();
        let labels = LabelBook::new();
        let interp = EventInterpreter::new(&reg, &labels);
        let lines = interp.render(&receipt(vec![
            event("execute", &[("_contract_address", "bostrom1passport")]),
            event(
                "transfer",
                &[
                    ("recipient", "bostrom1alice"),
                    ("sender", "bostrom1gift"),
                    ("amount", "5000boot"),
                ],
            ),
        ]));
        assert_eq!(lines[0], "execute: _contract_address = Passport Contract");
        assert_eq!(lines[1], "transfer: recipient = bostrom1alice");
        assert_eq!(lines[2], "transfer: sender = Gift Contract");
        assert_eq!(lines[3], "transfer: amount = 5000boot");
    }

    #[test]
    fn wasm_amount_grouped() {
        let reg = registry();
        let labels = LabelBook::new();
        let interp = EventInterpreter::new(&reg, &labels);
        let lines = interp.render(&receipt(vec![event(
            "wasm",
            &[
                ("action", "claim"),
                ("amount", "12500000"),
                ("_contract_address", "bostrom1gift"),
            ],
        )]));
        assert_eq!(lines[0], "wasm: action = claim");
        assert_eq!(lines[1], "wasm: amount = 12,500,000");
        assert_eq!(lines[2], "wasm: _contract_address = bostrom1gift");
    }

    #[test]
    fn cyberlinks_pair_by_key_and_use_labels() {
        let reg = registry();
        let mut labels = LabelBook::new();
        labels.insert_text("alice", "alice");
        labels.insert_text("0xabc", "ethereum 0xabc");
        let nick = content_id("alice");
        let eth = content_id("0xabc");
        let hole = content_id(CYBERHOLE);
        let interp = EventInterpreter::new(&reg, &labels);
        let lines = interp.render(&receipt(vec![event(
            "cyberlink",
            &[
                ("neuron", "bostrom1passport"),
                ("particleFrom", nick.as_str()),
                ("particleTo", eth.as_str()),
                ("particleFrom", nick.as_str()),
                ("particleFrom", nick.as_str()),
                ("particleTo", hole.as_str()),
            ],
        )]));
        assert_eq!(lines[0], "cyberlink: neuron Passport Contract");
        assert_eq!(lines[1], "cyberlink: alice -> ethereum 0xabc");
        assert_eq!(lines[2], "cyberlink: alice -> ?");
        assert_eq!(lines[3], "cyberlink: alice -> cyberhole");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn unknown_event_rendered_raw() {
        let reg = registry();
        let labels = LabelBook::new();
        let interp = EventInterpreter::new(&reg, &labels);
        let effects = interp.interpret(&receipt(vec![event("mint", &[("token_id", "7")])]));
        assert_eq!(effects[0].kind, EffectKind::Raw);
        assert_eq!(effects[0].to_string(), r#"mint: [{"key":"token_id","value":"7"}]"#);
    }

    #[test]
    fn failed_receipt_surfaces_raw_log_and_summary() {
        let reg = registry();
        let labels = LabelBook::new();
        let interp = EventInterpreter::new(&reg, &labels);
        let r: TransactionReceipt = serde_json::from_str(
            r#"{"txhash":"BAD","code":5,"gas_used":"4100","raw_log":"Your gift is already claimed"}"#,
        )
        .unwrap();
        assert_eq!(
            interp.render(&r),
            vec![
                "raw log: Your gift is already claimed".to_string(),
                "gas used: 4100".to_string(),
                "tx hash: BAD".to_string(),
            ]
        );
    }

    #[test]
    fn summary_always_last() {
        let reg = registry();
        let labels = LabelBook::new();
        let interp = EventInterpreter::new(&reg, &labels);
        let effects = interp.interpret(&receipt(vec![event("wasm", &[("action", "x")])]));
        let n = effects.len();
        assert_eq!(effects[n - 2].text, "gas used: 123456");
        assert_eq!(effects[n - 1].text, "tx hash: HASH1");
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands("0"), "0");
        assert_eq!(group_thousands("999"), "999");
        assert_eq!(group_thousands("1000"), "1,000");
        assert_eq!(group_thousands("1234567"), "1,234,567");
        assert_eq!(group_thousands("100boot"), "100boot");
    }
}
