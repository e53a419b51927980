//! Ordered step → receipt record of one workflow attempt.

use crate::chain::TransactionReceipt;
use crate::workflow::steps::{Mode, Step};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepResult {
    Committed(TransactionReceipt),
    /// Step was submitted or planned but produced no usable receipt.
    NotExecuted(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowOutcome {
    mode: Mode,
    entries: Vec<(Step, StepResult)>,
}

impl WorkflowOutcome {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            entries: Vec::with_capacity(mode.steps().len()),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn record(&mut self, step: Step, receipt: TransactionReceipt) {
        self.entries.push((step, StepResult::Committed(receipt)));
    }

    /// Mark `failed` with its error and every later step of the mode as not executed.
    pub fn fail_from(&mut self, failed: Step, error: &str) {
        self.entries
            .push((failed, StepResult::NotExecuted(error.to_string())));
        let rest = self
            .mode
            .steps()
            .iter()
            .skip_while(|s| **s != failed)
            .skip(1);
        for step in rest {
            self.entries.push((
                *step,
                StepResult::NotExecuted(format!("not executed: {} failed", failed)),
            ));
        }
    }

    pub fn entries(&self) -> &[(Step, StepResult)] {
        &self.entries
    }

    pub fn receipts(&self) -> impl Iterator<Item = (Step, &TransactionReceipt)> {
        self.entries.iter().filter_map(|(step, result)| match result {
            StepResult::Committed(r) => Some((*step, r)),
            StepResult::NotExecuted(_) => None,
        })
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(s, _)| s.name()).collect()
    }

    /// Every step of the mode committed, in order.
    pub fn is_complete(&self) -> bool {
        let committed: Vec<Step> = self.receipts().map(|(s, _)| s).collect();
        committed == self.mode.steps()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Serialized as a JSON object in step order; failed steps as `{"error": "..."}`.
impl Serialize for WorkflowOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (step, result) in &self.entries {
            match result {
                StepResult::Committed(receipt) => map.serialize_entry(step.name(), receipt)?,
                StepResult::NotExecuted(error) => {
                    map.serialize_entry(step.name(), &serde_json::json!({ "error": error }))?
                }
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::record::ExternalChain;

    fn receipt(hash: &str) -> TransactionReceipt {
        serde_json::from_value(serde_json::json!({"txhash": hash, "code": 0})).unwrap()
    }

    #[test]
    fn serializes_in_step_order() {
        let mut outcome = WorkflowOutcome::new(Mode::ReleaseOnly);
        outcome.record(Step::Release(ExternalChain::Ethereum), receipt("A"));
        outcome.record(Step::Release(ExternalChain::Cosmos), receipt("B"));
        let json = outcome.to_json_pretty().unwrap();
        let eth = json.find("release_ethereum").unwrap();
        let cosmos = json.find("release_cosmos").unwrap();
        assert!(eth < cosmos);
        assert!(outcome.is_complete());
    }

    #[test]
    fn failure_marks_remaining_steps() {
        let mut outcome = WorkflowOutcome::new(Mode::Participate);
        outcome.record(Step::Create, receipt("A"));
        outcome.fail_from(Step::Proof(ExternalChain::Ethereum), "broadcast: eof");
        assert_eq!(outcome.entries().len(), 5);
        assert_eq!(outcome.receipts().count(), 1);
        assert!(!outcome.is_complete());
        let value: serde_json::Value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["proof_ethereum"]["error"], "broadcast: eof");
        assert_eq!(
            value["claim_cosmos"]["error"],
            "not executed: proof_ethereum failed"
        );
        assert_eq!(value["create"]["txhash"], "A");
    }
}
