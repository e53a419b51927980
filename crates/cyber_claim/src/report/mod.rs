//! Sweep report data (HTML is generated in the cyber_claim_report crate).

use crate::batch::{sha256_hex, JournalEntry, RecordStatus};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// One journal row plus the audit trail found next to its artifact.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportRow {
    pub entry: JournalEntry,
    pub audit_lines: Vec<String>,
}

/// Data passed to the HTML report generator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepReport {
    pub created_utc_rfc3339: String,
    pub rows: Vec<ReportRow>,
    /// SHA-256 over the serialized journal rows, so two reports can be compared.
    pub journal_sha256: String,
}

impl SweepReport {
    pub fn build(
        entries: Vec<JournalEntry>,
        now: OffsetDateTime,
    ) -> Result<Self, serde_json::Error> {
        let journal_sha256 = sha256_hex(serde_json::to_string(&entries)?.as_bytes());
        let rows = entries
            .into_iter()
            .map(|entry| {
                let audit_lines = read_audit_lines(Path::new(&entry.artifact_path));
                ReportRow { entry, audit_lines }
            })
            .collect();
        Ok(Self {
            created_utc_rfc3339: now.format(&Rfc3339).unwrap_or_default(),
            rows,
            journal_sha256,
        })
    }

    pub fn done_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.entry.status == RecordStatus::Done)
            .count()
    }

    pub fn unsuccessful_count(&self) -> usize {
        self.rows.len() - self.done_count()
    }
}

/// `…_<i>.txt` → `…_<i>.audit.txt`
pub fn audit_sidecar(artifact: &Path) -> PathBuf {
    let stem = artifact
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    artifact.with_file_name(format!("{}.audit.txt", stem))
}

/// Missing or unreadable sidecars yield no lines.
fn read_audit_lines(artifact: &Path) -> Vec<String> {
    std::fs::read_to_string(audit_sidecar(artifact))
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
