//! Claude Code session transcripts (`~/.claude/projects/**/<session>.jsonl`).
//!
//! Each transcript line carries a `uuid` and a `parentUuid`, so a session is already a tree:
//! retried or edited prompts show up as siblings. Entries are grouped by `sessionId`, one
//! conversation per session. Sidechain entries (sub-agent runs) are left out, and entries
//! without any text (tool results, tool calls) are collapsed so their children hang off the
//! nearest ancestor with text.
//!
//! Re-importing a session refreshes its messages but keeps tags and status flags set by the
//! user.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::ImportReport;
use crate::models::{Message, Role, TranscriptEntry};
use crate::parsers::parse_transcript_file;
use crate::store::RecordStore;
use crate::tree::ConversationTree;
use crate::utils::{preview_line, validate_path_not_symlink};

/// Value stored in `metadata.source` for imported sessions
pub const SOURCE_NAME: &str = "claude-code";

const TRANSCRIPT_EXTENSION: &str = "jsonl";
const TITLE_WIDTH: usize = 80;
const UNTITLED: &str = "Untitled session";

/// Maximum number of transcript files per import (prevents resource exhaustion)
const MAX_TRANSCRIPTS: usize = 10_000;

/// Find every `*.jsonl` file under `dir`, skipping symlinks. Sorted for stable output.
pub fn discover_transcripts(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Import directory not found: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        if entry.path_is_symlink() {
            debug!(path = %entry.path().display(), "Skipping symlink");
            continue;
        }
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some(TRANSCRIPT_EXTENSION)
        {
            continue;
        }
        if let Err(e) = validate_path_not_symlink(path) {
            warn!(path = %path.display(), error = %e, "Skipping transcript");
            continue;
        }
        if files.len() >= MAX_TRANSCRIPTS {
            bail!(
                "Resource limit exceeded: found more than {} transcript files under {}",
                MAX_TRANSCRIPTS,
                dir.display()
            );
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

/// Import every session found under `dir` into `store`.
///
/// Individual bad files are skipped with a warning; the run fails if more than half of them
/// could not be parsed.
pub fn import_claude_sessions(dir: &Path, store: &mut dyn RecordStore) -> Result<ImportReport> {
    let files = discover_transcripts(dir)?;
    let results: Vec<(PathBuf, Result<Vec<TranscriptEntry>>)> = files
        .into_par_iter()
        .map(|path| {
            let parsed = parse_transcript_file(&path);
            (path, parsed)
        })
        .collect();

    let mut report = ImportReport::default();
    let mut sessions: BTreeMap<String, Vec<TranscriptEntry>> = BTreeMap::new();
    for (path, result) in results {
        match result {
            Ok(entries) => {
                report.files_parsed += 1;
                for entry in entries {
                    sessions.entry(entry.session_id.clone()).or_default().push(entry);
                }
            }
            Err(e) => {
                report.files_failed += 1;
                warn!(path = %path.display(), error = %format!("{:#}", e), "Failed to parse transcript");
            }
        }
    }

    let total = report.files_parsed + report.files_failed;
    if total > 0 {
        let failure_rate = report.files_failed as f64 / total as f64;
        if failure_rate > 0.5 {
            bail!(
                "Import failed: {}/{} transcript files failed to parse ({}% failure rate)",
                report.files_failed,
                total,
                (failure_rate * 100.0) as u32
            );
        }
    }

    for (session_id, entries) in sessions {
        let Some(mut tree) = build_conversation(&session_id, entries) else {
            debug!(session = %session_id, "Session has no messages, skipping");
            continue;
        };

        if let Ok(existing) = store.get_conversation(&session_id) {
            tree.tags = existing.tags;
            tree.metadata.starred_at = existing.metadata.starred_at;
            tree.metadata.pinned_at = existing.metadata.pinned_at;
            tree.metadata.archived_at = existing.metadata.archived_at;
        }

        report.messages += tree.message_count();
        report.conversations += 1;
        store
            .save_conversation(tree)
            .with_context(|| format!("Failed to save session {}", session_id))?;
    }

    info!(
        dir = %dir.display(),
        conversations = report.conversations,
        files = report.files_parsed,
        failed = report.files_failed,
        "Imported Claude Code sessions"
    );
    Ok(report)
}

/// Turn the entries of one session into a conversation tree. `None` if nothing has text.
pub fn build_conversation(
    session_id: &str,
    mut entries: Vec<TranscriptEntry>,
) -> Option<ConversationTree> {
    entries.retain(|e| e.is_sidechain != Some(true));
    entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.uuid.cmp(&b.uuid)));

    // Entries without text are dropped; remember where their children should attach instead
    let mut collapsed: HashMap<String, Option<String>> = HashMap::new();
    let mut kept = Vec::with_capacity(entries.len());
    for entry in entries {
        let text = entry.message.text();
        if text.trim().is_empty() {
            collapsed.insert(entry.uuid.clone(), entry.parent_uuid.clone());
        } else {
            kept.push((entry, text));
        }
    }

    let created_at = kept.first().map(|(entry, _)| entry.timestamp)?;
    let title = kept
        .iter()
        .find(|(entry, _)| entry.entry_type == "user")
        .map(|(_, text)| preview_line(text, TITLE_WIDTH))
        .unwrap_or_else(|| UNTITLED.to_string());
    let model = kept
        .iter()
        .filter(|(entry, _)| entry.entry_type == "assistant")
        .find_map(|(entry, _)| entry.message.model.clone());

    let messages: Vec<Message> = kept
        .into_iter()
        .map(|(entry, text)| {
            let role = entry.message.role.parse::<Role>().unwrap_or(match entry.entry_type.as_str() {
                "assistant" => Role::Assistant,
                _ => Role::User,
            });
            let mut message = Message::new(role, text, entry.timestamp).with_id(entry.uuid);
            message.parent_id = attach_point(entry.parent_uuid, &collapsed);
            message.model = entry.message.model;
            message
        })
        .collect();

    let mut tree = ConversationTree::from_messages(session_id, title, created_at, messages);
    tree.metadata.source = Some(SOURCE_NAME.to_string());
    tree.metadata.model = model;
    Some(tree)
}

/// Follow the parent chain through collapsed entries to the nearest kept ancestor
fn attach_point(
    mut parent: Option<String>,
    collapsed: &HashMap<String, Option<String>>,
) -> Option<String> {
    // Each collapsed entry is visited at most once, so a bad chain cannot loop forever
    for _ in 0..=collapsed.len() {
        match parent {
            Some(ref id) if collapsed.contains_key(id) => {
                parent = collapsed.get(id).cloned().flatten();
            }
            _ => return parent,
        }
    }
    None
}
