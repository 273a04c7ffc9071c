//! Directory-backed record store.
//!
//! # Error Handling Strategy
//!
//! - **Loading**: files are read in parallel. A corrupt or oversized file is skipped with a
//!   warning; loading fails only if more than half of the files fail, which points at a
//!   systematic problem rather than a stray bad file
//! - **Writing**: every mutation rewrites the affected conversation through a temp file and a
//!   rename, so a crash never leaves a half-written record behind. A failed write rolls the
//!   in-memory record back, so memory never holds state the directory does not

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use tracing::{info, warn};

use super::{ConversationFilter, MemoryStore, RecordStore};
use crate::error::StoreError;
use crate::models::{ConversationSummary, StatusFlag};
use crate::tree::ConversationTree;
use crate::utils::paths::safe_open_file;

const RECORD_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "json.tmp";

/// [`RecordStore`] persisting each conversation as `<dir>/<id>.json`
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    records: MemoryStore,
}

impl FileStore {
    /// Open (creating if needed) a store directory and load every record in it
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create store directory: {}", dir.display()))?;

        let paths = record_paths(&dir)?;
        let results: Vec<(PathBuf, Result<ConversationTree>)> = paths
            .into_par_iter()
            .map(|path| {
                let loaded = load_record(&path);
                (path, loaded)
            })
            .collect();

        let total = results.len();
        let mut failed = 0usize;
        let mut conversations = Vec::with_capacity(total);
        for (path, result) in results {
            match result {
                Ok(tree) => conversations.push(tree),
                Err(e) => {
                    failed += 1;
                    warn!(path = %path.display(), error = %format!("{:#}", e), "Skipping unreadable conversation file");
                }
            }
        }

        if total > 0 {
            let failure_rate = failed as f64 / total as f64;
            if failure_rate > 0.5 {
                bail!(
                    "Failed to load store {}: {}/{} files could not be read ({}% failure rate)",
                    dir.display(),
                    failed,
                    total,
                    (failure_rate * 100.0) as u32
                );
            }
        }

        info!(dir = %dir.display(), loaded = conversations.len(), failed, "Opened conversation store");
        Ok(Self { dir, records: MemoryStore::from_conversations(conversations) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn record_path(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            bail!("Invalid conversation id for file storage: {:?}", id);
        }
        Ok(self.dir.join(format!("{}.{}", id, RECORD_EXTENSION)))
    }

    /// Write `id` to disk, restoring the in-memory record to `before` if the write fails.
    ///
    /// `before` is `None` for records that did not exist until this mutation.
    fn persist(&mut self, id: &str, before: Option<ConversationTree>) -> Result<(), StoreError> {
        let tree = self.records.conversation(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let Err(e) = self.write_record(tree) else {
            return Ok(());
        };

        warn!(conversation = id, error = %format!("{:#}", e), "Write failed, rolling back");
        match before {
            Some(tree) => self.records.save_conversation(tree)?,
            None => self.records.delete_conversation(id)?,
        }
        Err(e.into())
    }

    fn snapshot(&self, id: &str) -> Result<ConversationTree, StoreError> {
        self.records.get_conversation(id)
    }

    fn write_record(&self, tree: &ConversationTree) -> Result<()> {
        let path = self.record_path(&tree.id)?;
        let temp = self.dir.join(format!("{}.{}", tree.id, TEMP_EXTENSION));
        let json = serde_json::to_string_pretty(tree).context("Failed to serialize conversation")?;
        fs::write(&temp, json)
            .with_context(|| format!("Failed to write temp file: {}", temp.display()))?;
        fs::rename(&temp, &path)
            .with_context(|| format!("Failed to rename temp file into {}", path.display()))?;
        Ok(())
    }
}

fn record_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    for entry in entries {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();
        let file_type = entry.file_type().context("Failed to read file type")?;
        if file_type.is_file() && path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn load_record(path: &Path) -> Result<ConversationTree> {
    let mut file = safe_open_file(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let tree: ConversationTree = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse conversation: {}", path.display()))?;

    let expected = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    if tree.id != expected {
        bail!("Conversation id {} does not match file name {}", tree.id, path.display());
    }
    Ok(tree)
}

impl RecordStore for FileStore {
    fn list_conversations(
        &self,
        filter: &ConversationFilter,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        self.records.list_conversations(filter)
    }

    fn get_conversation(&self, id: &str) -> Result<ConversationTree, StoreError> {
        self.records.get_conversation(id)
    }

    fn add_tag(&mut self, id: &str, tag: &str) -> Result<(), StoreError> {
        let before = self.snapshot(id)?;
        self.records.add_tag(id, tag)?;
        self.persist(id, Some(before))
    }

    fn remove_tag(&mut self, id: &str, tag: &str) -> Result<(), StoreError> {
        let before = self.snapshot(id)?;
        self.records.remove_tag(id, tag)?;
        self.persist(id, Some(before))
    }

    fn set_status(&mut self, id: &str, flag: StatusFlag, value: bool) -> Result<(), StoreError> {
        let before = self.snapshot(id)?;
        self.records.set_status(id, flag, value)?;
        self.persist(id, Some(before))
    }

    fn delete_conversation(&mut self, id: &str) -> Result<(), StoreError> {
        let path = self.record_path(id)?;
        if !self.records.contains(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete {}", path.display()))?;
        }
        self.records.delete_conversation(id)
    }

    fn duplicate_conversation(&mut self, id: &str) -> Result<String, StoreError> {
        let new_id = self.records.duplicate_conversation(id)?;
        self.persist(&new_id, None)?;
        Ok(new_id)
    }

    fn save_conversation(&mut self, tree: ConversationTree) -> Result<(), StoreError> {
        self.write_record(&tree)?;
        self.records.save_conversation(tree)
    }

    fn create_conversation(&mut self, title: &str) -> Result<String, StoreError> {
        let id = self.records.create_conversation(title)?;
        self.persist(&id, None)?;
        Ok(id)
    }

    fn get_summary(&self, id: &str) -> Result<ConversationSummary, StoreError> {
        self.records.get_summary(id)
    }

    fn contains(&self, id: &str) -> bool {
        self.records.contains(id)
    }
}
