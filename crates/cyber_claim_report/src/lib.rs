//! Static HTML audit report of a claim sweep.

use cyber_claim::report::{ReportRow, SweepReport};
use std::io::Write;
use std::path::Path;

/// Render a static HTML report to `out_path`. Embeds the full report JSON.
pub fn render_report(data: &SweepReport, out_path: impl AsRef<Path>) -> Result<(), ReportError> {
    let html = build_html(data)?;
    if let Some(parent) = out_path.as_ref().parent() {
        std::fs::create_dir_all(parent).map_err(ReportError::Io)?;
    }
    let mut f = std::fs::File::create(out_path.as_ref()).map_err(ReportError::Io)?;
    f.write_all(html.as_bytes()).map_err(ReportError::Io)?;
    Ok(())
}

/// Build HTML string from report data.
pub fn build_html(data: &SweepReport) -> Result<String, ReportError> {
    let json_embed = escape_html(&serde_json::to_string(&data).map_err(ReportError::Json)?);
    let rows: String = data.rows.iter().map(record_row).collect();
    let trails: String = data
        .rows
        .iter()
        .filter(|r| !r.audit_lines.is_empty())
        .map(audit_card)
        .collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8"/>
<meta name="viewport" content="width=device-width,initial-scale=1"/>
<title>Claim sweep audit</title>
<style>
:root {{ font-family: system-ui, sans-serif; background: #0f1419; color: #e6edf3; }}
body {{ max-width: 960px; margin: 0 auto; padding: 1.5rem; }}
h1 {{ font-size: 1.4rem; margin-bottom: 0.5rem; }}
h2 {{ font-size: 1.1rem; margin-top: 1.5rem; color: #8b949e; }}
.mono {{ font-family: ui-monospace, monospace; font-size: 0.9em; word-break: break-all; }}
.card {{ background: #161b22; border: 1px solid #30363d; border-radius: 6px; padding: 1rem; margin: 0.5rem 0; }}
table {{ width: 100%; border-collapse: collapse; }}
td, th {{ text-align: left; padding: 0.2rem 0.5rem; border-bottom: 1px solid #30363d; }}
.done {{ color: #3fb950; }}
.unsuccessful {{ color: #f85149; }}
.footer {{ margin-top: 2rem; font-size: 0.85rem; color: #8b949e; }}
pre {{ white-space: pre-wrap; }}
</style>
</head>
<body>
<h1>Claim Sweep Audit</h1>
<p>Generated: {created}</p>

<h2>Summary</h2>
<div class="card">
  <p>{total} records: <span class="done">{done} done</span>, <span class="unsuccessful">{unsuccessful} unsuccessful</span>.</p>
  <div class="mono">Journal SHA-256: {digest}</div>
</div>

<h2>Records</h2>
<div class="card">
<table>
<tr><th>Index</th><th>Mode</th><th>Address</th><th>Status</th><th>Attempts</th><th>Artifact</th><th>Last error</th></tr>
{rows}</table>
</div>

<h2>Audit trails</h2>
{trails}
<h2>Journal (embedded)</h2>
<div class="card">
  <script type="application/json" id="sweep-journal">{json_embed}</script>
</div>
</body>
</html>"#,
        created = escape_html(&data.created_utc_rfc3339),
        total = data.rows.len(),
        done = data.done_count(),
        unsuccessful = data.unsuccessful_count(),
        digest = escape_html(&data.journal_sha256),
        rows = rows,
        trails = trails,
        json_embed = json_embed,
    );
    Ok(html)
}

fn record_row(row: &ReportRow) -> String {
    let e = &row.entry;
    format!(
        "<tr><td>{}</td><td>{}</td><td class=\"mono\">{}</td><td class=\"{status}\">{status}</td><td>{}</td><td class=\"mono\">{}</td><td>{}</td></tr>\n",
        e.index,
        e.mode.as_str(),
        escape_html(&e.primary_address),
        e.attempts,
        escape_html(&e.artifact_path),
        escape_html(e.last_error.as_deref().unwrap_or("")),
        status = e.status.as_str(),
    )
}

fn audit_card(row: &ReportRow) -> String {
    format!(
        "<div class=\"card\"><p class=\"mono\">#{} {}</p><pre class=\"mono\">{}</pre></div>\n",
        row.entry.index,
        escape_html(&row.entry.primary_address),
        escape_html(&row.audit_lines.join("\n")),
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug)]
pub enum ReportError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Io(e) => write!(f, "io: {}", e),
            ReportError::Json(e) => write!(f, "json: {}", e),
        }
    }
}

impl std::error::Error for ReportError {}

#[cfg(test)]
mod tests {
    use super::*;
    use cyber_claim::batch::{JournalEntry, RecordStatus};
    use cyber_claim::Mode;

    fn row(index: u64, status: RecordStatus, error: Option<&str>, audit: &[&str]) -> ReportRow {
        ReportRow {
            entry: JournalEntry {
                index,
                mode: Mode::Participate,
                primary_address: format!("bostrom1addr{}", index),
                status,
                attempts: 2,
                artifact_path: format!("temp/contract_participation_execution_log_{}.txt", index),
                artifact_sha256: "ab".repeat(32),
                finished_utc: 0,
                last_error: error.map(str::to_string),
            },
            audit_lines: audit.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn html_lists_records_and_escapes() {
        let data = SweepReport {
            created_utc_rfc3339: "2024-01-01T00:00:00Z".into(),
            rows: vec![
                row(0, RecordStatus::Done, None, &["== create ==", "alice -> <cyberhole>"]),
                row(1, RecordStatus::Unsuccessful, Some("step create: <eof>"), &[]),
            ],
            journal_sha256: "c".repeat(64),
        };
        let html = build_html(&data).unwrap();
        assert!(html.contains("Claim Sweep Audit"));
        assert!(html.contains("2 records"));
        assert!(html.contains("bostrom1addr1"));
        assert!(html.contains("step create: &lt;eof&gt;"));
        assert!(html.contains("alice -&gt; &lt;cyberhole&gt;"));
        assert!(!html.contains("<eof>"));
        assert!(html.contains("sweep-journal"));
    }

    #[test]
    fn render_writes_file() {
        let dir = std::env::temp_dir().join("cyber_claim_report_test");
        let path = dir.join("sweep.html");
        let data = SweepReport {
            created_utc_rfc3339: String::new(),
            rows: vec![],
            journal_sha256: String::new(),
        };
        render_report(&data, &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("0 records"));
    }
}
