//! Per-record outcome artifacts and their audit-trail sidecars.

use crate::audit::EventInterpreter;
use crate::chain::TransactionReceipt;
use crate::workflow::{Mode, WorkflowOutcome};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `<dir>/<mode stem>_<index>.txt`
pub fn artifact_path(dir: &Path, mode: Mode, index: u64) -> PathBuf {
    dir.join(format!("{}_{}.txt", mode.artifact_stem(), index))
}

/// `<dir>/<mode stem>_<index>.audit.txt`
pub fn audit_path(dir: &Path, mode: Mode, index: u64) -> PathBuf {
    dir.join(format!("{}_{}.audit.txt", mode.artifact_stem(), index))
}

/// Artifact body: the step map on success, `Error: ...` followed by the partial step map otherwise.
pub fn render_artifact(
    outcome: &WorkflowOutcome,
    error: Option<&str>,
) -> Result<String, ArtifactError> {
    let mut body = String::new();
    if let Some(error) = error {
        body.push_str("Error: ");
        body.push_str(error);
        body.push('\n');
        if outcome.entries().is_empty() {
            return Ok(body);
        }
        body.push('\n');
    }
    body.push_str(&outcome.to_json_pretty()?);
    body.push('\n');
    Ok(body)
}

/// Human-readable trail of every committed step.
pub fn render_audit(outcome: &WorkflowOutcome, interpreter: &EventInterpreter<'_>) -> String {
    let mut out = String::new();
    for (step, receipt) in outcome.receipts() {
        out.push_str(&format!("== {} ==\n", step));
        for line in interpreter.render(receipt) {
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// An artifact read back from disk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedArtifact {
    pub error: Option<String>,
    /// Steps in workflow order; failed steps carry their error text.
    pub steps: Vec<(&'static str, Result<TransactionReceipt, String>)>,
}

pub fn parse_artifact(text: &str) -> Result<ParsedArtifact, ArtifactError> {
    let mut parsed = ParsedArtifact::default();
    let mut json = text.trim();
    if let Some(rest) = json.strip_prefix("Error: ") {
        let (error, tail) = rest.split_once('\n').unwrap_or((rest, ""));
        parsed.error = Some(error.trim().to_string());
        json = tail.trim();
    }
    if json.is_empty() {
        return Ok(parsed);
    }
    let mut map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
    for step in Mode::ParticipateAndRelease.steps() {
        let Some(value) = map.remove(step.name()) else {
            continue;
        };
        let marker = value.get("error").and_then(|e| e.as_str()).map(str::to_string);
        let result = match marker {
            Some(error) => Err(error),
            None => serde_json::from_value(value).map_err(|e| format!("unreadable receipt: {}", e)),
        };
        parsed.steps.push((step.name(), result));
    }
    Ok(parsed)
}

pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Write `content` to `path` via a temp file in the same directory; returns its SHA-256.
pub fn write_atomic(path: &Path, content: &str) -> Result<String, ArtifactError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| ArtifactError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(sha256_hex(content.as_bytes()))
}
