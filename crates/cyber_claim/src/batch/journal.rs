//! SQLite journal of per-record results across runs.

use crate::workflow::Mode;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Done,
    Unsuccessful,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Done => "done",
            RecordStatus::Unsuccessful => "unsuccessful",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "done" => Some(RecordStatus::Done),
            "unsuccessful" => Some(RecordStatus::Unsuccessful),
            _ => None,
        }
    }
}

/// One finished record. Later runs of the same index and mode replace the row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub index: u64,
    pub mode: Mode,
    pub primary_address: String,
    pub status: RecordStatus,
    pub attempts: u32,
    pub artifact_path: String,
    pub artifact_sha256: String,
    /// Unix seconds.
    pub finished_utc: i64,
    pub last_error: Option<String>,
}

pub struct Journal {
    conn: Mutex<Connection>,
}

impl Journal {
    /// Open or create the journal at `path`. Creates parent dirs if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS outcomes (
                record_index INTEGER NOT NULL,
                mode TEXT NOT NULL,
                primary_address TEXT NOT NULL,
                status TEXT NOT NULL,
                attempts INTEGER NOT NULL,
                artifact_path TEXT NOT NULL,
                artifact_sha256 TEXT NOT NULL,
                finished_utc INTEGER NOT NULL,
                last_error TEXT,
                PRIMARY KEY (record_index, mode)
            );
            CREATE INDEX IF NOT EXISTS idx_outcomes_status ON outcomes(status);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, JournalError> {
        self.conn
            .lock()
            .map_err(|e| JournalError::Io(std::io::Error::other(e.to_string())))
    }

    pub fn record(&self, entry: &JournalEntry) -> Result<(), JournalError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO outcomes (record_index, mode, primary_address, status, attempts, artifact_path, artifact_sha256, finished_utc, last_error) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                entry.index as i64,
                entry.mode.as_str(),
                entry.primary_address,
                entry.status.as_str(),
                entry.attempts,
                entry.artifact_path,
                entry.artifact_sha256,
                entry.finished_utc,
                entry.last_error,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, index: u64, mode: Mode) -> Result<Option<JournalEntry>, JournalError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM outcomes WHERE record_index = ?1 AND mode = ?2",
            COLUMNS
        ))?;
        let row = stmt
            .query_row(rusqlite::params![index as i64, mode.as_str()], raw_row)
            .optional()?;
        row.map(RawRow::into_entry).transpose()
    }

    pub fn is_done(&self, index: u64, mode: Mode) -> Result<bool, JournalError> {
        Ok(self
            .get(index, mode)?
            .is_some_and(|e| e.status == RecordStatus::Done))
    }

    /// Entries with `start <= index < end`, ordered by index then mode.
    pub fn range(&self, start: u64, end: u64) -> Result<Vec<JournalEntry>, JournalError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM outcomes WHERE record_index >= ?1 AND record_index < ?2 ORDER BY record_index, mode",
            COLUMNS
        ))?;
        let rows = stmt.query_map(
            rusqlite::params![start as i64, end.min(i64::MAX as u64) as i64],
            raw_row,
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_entry()?);
        }
        Ok(out)
    }

    pub fn all(&self) -> Result<Vec<JournalEntry>, JournalError> {
        self.range(0, u64::MAX)
    }
}

const COLUMNS: &str = "record_index, mode, primary_address, status, attempts, artifact_path, artifact_sha256, finished_utc, last_error";

struct RawRow {
    index: i64,
    mode: String,
    primary_address: String,
    status: String,
    attempts: u32,
    artifact_path: String,
    artifact_sha256: String,
    finished_utc: i64,
    last_error: Option<String>,
}

fn raw_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        index: r.get(0)?,
        mode: r.get(1)?,
        primary_address: r.get(2)?,
        status: r.get(3)?,
        attempts: r.get(4)?,
        artifact_path: r.get(5)?,
        artifact_sha256: r.get(6)?,
        finished_utc: r.get(7)?,
        last_error: r.get(8)?,
    })
}

impl RawRow {
    fn into_entry(self) -> Result<JournalEntry, JournalError> {
        let mode = self.mode.parse::<Mode>().map_err(JournalError::Corrupt)?;
        let status = RecordStatus::parse(&self.status)
            .ok_or_else(|| JournalError::Corrupt(format!("status {}", self.status)))?;
        let index = u64::try_from(self.index)
            .map_err(|_| JournalError::Corrupt(format!("index {}", self.index)))?;
        Ok(JournalEntry {
            index,
            mode,
            primary_address: self.primary_address,
            status,
            attempts: self.attempts,
            artifact_path: self.artifact_path,
            artifact_sha256: self.artifact_sha256,
            finished_utc: self.finished_utc,
            last_error: self.last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn entry(index: u64, status: RecordStatus) -> JournalEntry {
        JournalEntry {
            index,
            mode: Mode::Participate,
            primary_address: format!("bostrom1addr{}", index),
            status,
            attempts: 1,
            artifact_path: format!("temp/contract_participation_execution_log_{}.txt", index),
            artifact_sha256: "00".repeat(32),
            finished_utc: 1_700_000_000,
            last_error: None,
        }
    }

    #[test]
    fn record_and_read_back() {
        let tmp = NamedTempFile::new().unwrap();
        let journal = Journal::open(tmp.path()).unwrap();
        journal.record(&entry(3, RecordStatus::Done)).unwrap();
        let got = journal.get(3, Mode::Participate).unwrap().unwrap();
        assert_eq!(got, entry(3, RecordStatus::Done));
        assert!(journal.get(3, Mode::ReleaseOnly).unwrap().is_none());
        assert!(journal.is_done(3, Mode::Participate).unwrap());
    }

    #[test]
    fn later_run_replaces_row() {
        let tmp = NamedTempFile::new().unwrap();
        let journal = Journal::open(tmp.path()).unwrap();
        let mut failed = entry(7, RecordStatus::Unsuccessful);
        failed.last_error = Some("step create: broadcast: eof".into());
        journal.record(&failed).unwrap();
        assert!(!journal.is_done(7, Mode::Participate).unwrap());
        journal.record(&entry(7, RecordStatus::Done)).unwrap();
        assert!(journal.is_done(7, Mode::Participate).unwrap());
        assert_eq!(journal.all().unwrap().len(), 1);
    }

    #[test]
    fn range_is_half_open_and_ordered() {
        let tmp = NamedTempFile::new().unwrap();
        let journal = Journal::open(tmp.path()).unwrap();
        for i in [5, 1, 3, 9] {
            journal.record(&entry(i, RecordStatus::Done)).unwrap();
        }
        let got: Vec<u64> = journal.range(1, 9).unwrap().iter().map(|e| e.index).collect();
        assert_eq!(got, vec![1, 3, 5]);
    }
}
