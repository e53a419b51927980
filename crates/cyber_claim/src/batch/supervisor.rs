//! Retry supervisor: runs a record's workflow until it commits or the policy gives up,
//! then writes exactly one artifact and one journal row for it.

use crate::audit::{ContractRegistry, EventInterpreter};
use crate::batch::artifact::{
    artifact_path, audit_path, render_artifact, render_audit, write_atomic, ArtifactError,
};
use crate::batch::journal::{Journal, JournalEntry, JournalError, RecordStatus};
use crate::batch::retry::RetryPolicy;
use crate::chain::Ledger;
use crate::workflow::{select_record, ClaimWorkflow, Mode, ParticipantRecord, WorkflowOutcome};
use std::ops::Range;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("artifact: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("journal: {0}")]
    Journal(#[from] JournalError),
}

/// Final result of one record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordReport {
    pub index: u64,
    pub primary_address: String,
    pub status: RecordStatus,
    pub attempts: u32,
    pub artifact: PathBuf,
    pub last_error: Option<String>,
}

impl RecordReport {
    /// `<primary address>: done` or `<primary address>: unsuccessful`.
    pub fn status_line(&self) -> String {
        format!("{}: {}", self.primary_address, self.status.as_str())
    }
}

#[derive(Clone, Debug, Default)]
pub struct SweepSummary {
    pub reports: Vec<RecordReport>,
    /// Indices skipped because the journal already marks them done.
    pub skipped: Vec<u64>,
    /// Indices whose artifact or journal row could not be written.
    pub failed_to_persist: Vec<u64>,
}

impl SweepSummary {
    pub fn done(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.status == RecordStatus::Done)
            .count()
    }

    pub fn unsuccessful(&self) -> usize {
        self.reports.len() - self.done()
    }
}

struct Finished<'r> {
    index: u64,
    primary_address: &'r str,
    mode: Mode,
    attempts: u32,
    audit: &'r str,
}

pub struct Supervisor<'a, L: Ledger + ?Sized> {
    workflow: ClaimWorkflow<'a, L>,
    registry: ContractRegistry,
    policy: RetryPolicy,
    artifact_dir: PathBuf,
    journal: Option<&'a Journal>,
}

impl<'a, L: Ledger + ?Sized> Supervisor<'a, L> {
    pub fn new(
        workflow: ClaimWorkflow<'a, L>,
        registry: ContractRegistry,
        policy: RetryPolicy,
        artifact_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            workflow,
            registry,
            policy,
            artifact_dir: artifact_dir.into(),
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: &'a Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Run one record with retries. Workflow failures end up in the artifact, not in the error.
    pub async fn run_record(
        &self,
        index: u64,
        record: &ParticipantRecord,
        mode: Mode,
    ) -> Result<RecordReport, BatchError> {
        let mut attempt = 0u32;
        let (outcome, last_error) = loop {
            attempt += 1;
            let mut outcome = WorkflowOutcome::new(mode);
            match self.workflow.run(record, mode, &mut outcome).await {
                Ok(_) => break (outcome, None),
                Err(e) => match self.policy.next_delay(attempt, &e) {
                    Some(delay) => {
                        warn!(
                            index,
                            address = %record.primary_address,
                            attempt,
                            backoff_ms = delay.as_millis() as u64,
                            error = %e,
                            "attempt failed, retrying from start"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => break (outcome, Some(e.to_string())),
                },
            }
        };

        let labels = record.label_book();
        let interpreter = EventInterpreter::new(&self.registry, &labels);
        let audit = render_audit(&outcome, &interpreter);
        let body = render_artifact(&outcome, last_error.as_deref())?;
        self.finish(
            Finished {
                index,
                primary_address: &record.primary_address,
                mode,
                attempts: attempt,
                audit: &audit,
            },
            &body,
            last_error,
        )
    }

    fn finish(
        &self,
        record: Finished<'_>,
        body: &str,
        last_error: Option<String>,
    ) -> Result<RecordReport, BatchError> {
        let Finished {
            index,
            primary_address,
            mode,
            attempts,
            audit,
        } = record;
        let artifact = artifact_path(&self.artifact_dir, mode, index);
        let digest = write_atomic(&artifact, body)?;
        if !audit.is_empty() {
            write_atomic(&audit_path(&self.artifact_dir, mode, index), audit)?;
        }
        let status = if last_error.is_none() {
            RecordStatus::Done
        } else {
            RecordStatus::Unsuccessful
        };
        if let Some(journal) = self.journal {
            journal.record(&JournalEntry {
                index,
                mode,
                primary_address: primary_address.to_string(),
                status,
                attempts,
                artifact_path: artifact.display().to_string(),
                artifact_sha256: digest,
                finished_utc: time::OffsetDateTime::now_utc().unix_timestamp(),
                last_error: last_error.clone(),
            })?;
        }
        info!(index, address = %primary_address, status = status.as_str(), attempts, "record finished");
        Ok(RecordReport {
            index,
            primary_address: primary_address.to_string(),
            status,
            attempts,
            artifact,
            last_error,
        })
    }

    /// Select the record for `index` and run it. An index with no record still gets an
    /// error artifact and an unsuccessful journal row, under the placeholder address `#<index>`.
    pub async fn run_index(
        &self,
        records: &[ParticipantRecord],
        index: u64,
        shard_size: usize,
        mode: Mode,
    ) -> Result<RecordReport, BatchError> {
        let record = match select_record(records, index as usize, shard_size) {
            Ok(record) => record,
            Err(e) => {
                let message = e.to_string();
                warn!(index, error = %message, "no record for index");
                let placeholder = format!("#{}", index);
                let body = render_artifact(&WorkflowOutcome::new(mode), Some(&message))?;
                let record = Finished {
                    index,
                    primary_address: &placeholder,
                    mode,
                    attempts: 0,
                    audit: "",
                };
                return self.finish(record, &body, Some(message));
            }
        };
        self.run_record(index, record, mode).await
    }

    /// Run every index of `range` in order. One record's failure never stops the sweep.
    pub async fn sweep(
        &self,
        records: &[ParticipantRecord],
        range: Range<u64>,
        shard_size: usize,
        mode: Mode,
        skip_done: bool,
    ) -> SweepSummary {
        let mut summary = SweepSummary::default();
        for index in range {
            if skip_done {
                if let Some(journal) = self.journal {
                    match journal.is_done(index, mode) {
                        Ok(true) => {
                            summary.skipped.push(index);
                            continue;
                        }
                        Ok(false) => {}
                        Err(e) => warn!(index, error = %e, "journal lookup failed"),
                    }
                }
            }
            match self.run_index(records, index, shard_size, mode).await {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    error!(index, error = %e, "could not persist record outcome");
                    summary.failed_to_persist.push(index);
                }
            }
        }
        summary
    }
}
