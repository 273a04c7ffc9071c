use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use crate::models::TranscriptEntry;
use crate::utils::safe_open_file;

const MAX_CONSECUTIVE_ERRORS: usize = 100;

/// Parse a Claude Code session transcript (`*.jsonl`).
///
/// Only `user` and `assistant` entries are kept; snapshots, summaries and system lines are
/// skipped silently. Malformed lines are logged and skipped. Fails if more than half the lines
/// fail or after 100 consecutive failures.
pub fn parse_transcript_file(path: &Path) -> Result<Vec<TranscriptEntry>> {
    let file = safe_open_file(path)?;

    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    let mut skipped_count = 0;
    let mut total_lines = 0;
    let mut consecutive_errors = 0;

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read line from transcript file")?;
        if line.trim().is_empty() {
            continue;
        }
        total_lines += 1;

        let parsed = serde_json::from_str::<serde_json::Value>(&line)
            .map_err(|e| format!("invalid JSON: {}", e))
            .and_then(|value| {
                let is_conversation = value
                    .get("type")
                    .and_then(|t| t.as_str())
                    .is_some_and(|t| t == "user" || t == "assistant");
                if !is_conversation {
                    return Ok(None);
                }
                serde_json::from_value::<TranscriptEntry>(value)
                    .map(Some)
                    .map_err(|e| format!("invalid entry: {}", e))
            });

        match parsed {
            Ok(Some(entry)) => {
                entries.push(entry);
                consecutive_errors = 0;
            }
            Ok(None) => {}
            Err(reason) => {
                warn!(path = %path.display(), line = line_num + 1, %reason, "Skipping transcript line");
                skipped_count += 1;
                consecutive_errors += 1;

                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    bail!(
                        "Too many consecutive parse errors ({}) in {} - file may be corrupted",
                        consecutive_errors,
                        path.display()
                    );
                }
            }
        }
    }

    if total_lines > 0 {
        let failure_rate = (skipped_count as f64) / (total_lines as f64);
        if failure_rate > 0.5 {
            bail!(
                "Too many parse failures in {}: {} of {} lines failed ({:.1}%)",
                path.display(),
                skipped_count,
                total_lines,
                failure_rate * 100.0
            );
        }
    }

    debug!(path = %path.display(), entries = entries.len(), skipped = skipped_count, "Parsed transcript");
    Ok(entries)
}
