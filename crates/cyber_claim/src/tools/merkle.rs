//! External Merkle proof batch generator.

use crate::config::ProofToolConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ProofToolError {
    #[error("spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("proof tool produced no output: {stderr}")]
    EmptyOutput { stderr: String },
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Rows `start_index..end_index` of the airdrop file. `start_index` counts from 1;
/// `end_index` is exclusive and `None` runs to the end of the file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofBatch {
    pub input: PathBuf,
    pub output: PathBuf,
    pub start_index: u64,
    pub end_index: Option<u64>,
}

impl ProofBatch {
    /// Command-line form of `end_index`: `-1` runs to the end, anything else below zero is an error.
    pub fn end_from_arg(raw: i64) -> Result<Option<u64>, ProofToolError> {
        match raw {
            -1 => Ok(None),
            n => u64::try_from(n).map(Some).map_err(|_| {
                ProofToolError::InvalidRange(format!("end_index {} (use -1 for the end)", n))
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ProofToolError> {
        if self.start_index == 0 {
            return Err(ProofToolError::InvalidRange(
                "start_index counts from 1".to_string(),
            ));
        }
        if let Some(end) = self.end_index {
            if end <= self.start_index {
                return Err(ProofToolError::InvalidRange(format!(
                    "end_index {} must exceed start_index {}",
                    end, self.start_index
                )));
            }
        }
        Ok(())
    }

    pub fn args(&self, tool: &ProofToolConfig) -> Vec<String> {
        let mut args = tool.args.clone();
        args.extend([
            "--input".to_string(),
            self.input.display().to_string(),
            "--output".to_string(),
            self.output.display().to_string(),
            "--start_index".to_string(),
            self.start_index.to_string(),
            "--end_index".to_string(),
            self.end_index
                .map(|e| e.to_string())
                .unwrap_or_else(|| "-1".to_string()),
        ]);
        args
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofRun {
    pub stdout: String,
    pub merkle_root: Option<String>,
}

/// Run the generator. Succeeds iff it printed anything on stdout.
pub async fn generate_proofs(
    tool: &ProofToolConfig,
    batch: &ProofBatch,
) -> Result<ProofRun, ProofToolError> {
    batch.validate()?;
    let args = batch.args(tool);
    debug!(program = %tool.program, ?args, "running proof tool");
    let output = Command::new(&tool.program)
        .args(&args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| ProofToolError::Spawn {
            program: tool.program.clone(),
            source,
        })?;
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        return Err(ProofToolError::EmptyOutput {
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    let merkle_root = merkle_root_from(&stdout);
    info!(output = %batch.output.display(), root = ?merkle_root, "proofs generated");
    Ok(ProofRun {
        stdout,
        merkle_root,
    })
}

fn merkle_root_from(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|l| l.trim().strip_prefix("Merkle root:"))
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofEntry {
    pub address: String,
    pub amount: String,
    pub proof: Vec<String>,
}

/// Generator output file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofFile {
    pub merkle_root: String,
    pub proofs: Vec<ProofEntry>,
}

impl ProofFile {
    pub fn load(path: &Path) -> Result<Self, ProofToolError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn proof_for(&self, address: &str) -> Option<&ProofEntry> {
        self.proofs.iter().find(|p| p.address == address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(end: Option<u64>) -> ProofBatch {
        ProofBatch {
            input: PathBuf::from("airdrop.json"),
            output: PathBuf::from("proofs.json"),
            start_index: 1,
            end_index: end,
        }
    }

    #[test]
    fn args_default_to_open_end() {
        let args = batch(None).args(&ProofToolConfig::default());
        assert_eq!(
            args,
            [
                "generate_proofs.js",
                "--input",
                "airdrop.json",
                "--output",
                "proofs.json",
                "--start_index",
                "1",
                "--end_index",
                "-1"
            ]
        );
    }

    #[test]
    fn range_checks() {
        let mut b = batch(Some(100));
        assert!(b.validate().is_ok());
        b.start_index = 0;
        assert!(matches!(b.validate(), Err(ProofToolError::InvalidRange(_))));
        assert!(matches!(
            batch(Some(1)).validate(),
            Err(ProofToolError::InvalidRange(_))
        ));
    }

    #[test]
    fn end_index_argument() {
        assert_eq!(ProofBatch::end_from_arg(-1).unwrap(), None);
        assert_eq!(ProofBatch::end_from_arg(0).unwrap(), Some(0));
        assert_eq!(ProofBatch::end_from_arg(250).unwrap(), Some(250));
        assert!(matches!(
            ProofBatch::end_from_arg(-5),
            Err(ProofToolError::InvalidRange(_))
        ));
    }

    #[test]
    fn root_line_parsed() {
        let out = "Merkle root: 8f3a\nNumber of addresses in the Merkle tree: 99";
        assert_eq!(merkle_root_from(out), Some("8f3a".to_string()));
        assert_eq!(merkle_root_from("nothing"), None);
    }

    #[tokio::test]
    async fn empty_stdout_is_failure() {
        let tool = ProofToolConfig {
            program: "true".into(),
            args: vec![],
        };
        assert!(matches!(
            generate_proofs(&tool, &batch(None)).await,
            Err(ProofToolError::EmptyOutput { .. })
        ));
    }

    #[tokio::test]
    async fn any_stdout_is_success() {
        let tool = ProofToolConfig {
            program: "echo".into(),
            args: vec!["Merkle root: abc".into()],
        };
        let run = generate_proofs(&tool, &batch(Some(10))).await.unwrap();
        assert!(run.stdout.ends_with("--end_index 10"));
        assert!(run.merkle_root.unwrap().starts_with("abc"));
    }

    #[test]
    fn proof_file_lookup() {
        let file: ProofFile = serde_json::from_str(
            r#"{"merkle_root":"r","proofs":[{"address":"0xabc","amount":"100","proof":["h1","h2"]}]}"#,
        )
        .unwrap();
        assert_eq!(file.proof_for("0xabc").unwrap().proof, vec!["h1", "h2"]);
        assert!(file.proof_for("0xdef").is_none());
    }
}
