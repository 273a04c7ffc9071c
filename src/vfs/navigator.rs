//! Directory listings for every virtual view.
//!
//! The navigator is the only component that turns a [`VfsPath`] into store queries. Every
//! listing goes through the [`ListingCache`]; see the cache module for the freshness contract.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use super::cache::{Clock, ListingCache, SystemClock};
use super::path::{self, PathKind, VfsPath, normalize};
use super::recent::RecentPeriod;
use crate::error::{PathError, StoreError, TreeError, VfsError};
use crate::models::{ConversationSummary, DirectoryEntry, StatusFlag};
use crate::store::{ConversationFilter, RecordStore};
use crate::tree::ConversationTree;
use crate::utils::paths::encode_segment;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(2);
pub const DEFAULT_PREVIEW_WIDTH: usize = 60;

/// Lists and validates virtual paths against a [`RecordStore`]
pub struct Navigator {
    store: Box<dyn RecordStore>,
    cache: ListingCache,
    preview_width: usize,
}

impl Navigator {
    pub fn new(store: Box<dyn RecordStore>) -> Self {
        Self::with_clock(store, DEFAULT_CACHE_TTL, Box::new(SystemClock))
    }

    pub fn with_clock(store: Box<dyn RecordStore>, ttl: Duration, clock: Box<dyn Clock>) -> Self {
        Self { store, cache: ListingCache::new(ttl, clock), preview_width: DEFAULT_PREVIEW_WIDTH }
    }

    pub fn with_preview_width(mut self, width: usize) -> Self {
        self.preview_width = width.max(1);
        self
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Mutable store access. Listings are not invalidated; they expire with the TTL.
    pub fn store_mut(&mut self) -> &mut dyn RecordStore {
        self.store.as_mut()
    }

    pub fn cache(&self) -> &ListingCache {
        &self.cache
    }

    pub fn preview_width(&self) -> usize {
        self.preview_width
    }

    pub fn begin_stage(&mut self) {
        self.cache.begin_stage();
    }

    pub fn commit_stage(&mut self) {
        self.cache.commit_stage();
    }

    pub fn discard_stage(&mut self) {
        self.cache.discard_stage();
    }

    pub fn invalidate_all(&mut self) {
        self.cache.invalidate_all();
    }

    /// Entries of a directory, served from the cache while fresh
    pub fn list_directory(&mut self, dir: &VfsPath) -> Result<Vec<DirectoryEntry>, VfsError> {
        if !dir.is_directory() {
            return Err(VfsError::NotADirectory(dir.to_string()));
        }

        let key = dir.cache_key();
        if let Some(entries) = self.cache.get(&key) {
            return Ok(entries);
        }

        debug!(path = %key, "listing cache miss");
        let entries = self.compute_listing(dir)?;
        self.cache.insert(key, entries.clone());
        Ok(entries)
    }

    /// Normalize `raw` against `cwd` and check that it exists.
    ///
    /// The returned path has `is_directory` cleared for leaf messages.
    pub fn resolve(&self, raw: &str, cwd: &VfsPath) -> Result<VfsPath, VfsError> {
        let path = normalize(raw, cwd)?;
        self.validate(path)
    }

    /// Check a normalized path against the store
    pub fn validate(&self, path: VfsPath) -> Result<VfsPath, VfsError> {
        let view = path.view();
        let view_exists = match view.kind() {
            PathKind::TagDirectory(tag) => self.has_any(ConversationFilter::all().with_tag(tag))?,
            PathKind::Source(Some(name)) => {
                self.has_any(ConversationFilter::all().with_source(name))?
            }
            PathKind::Model(Some(name)) => {
                self.has_any(ConversationFilter::all().with_model(name))?
            }
            _ => true,
        };
        if !view_exists {
            return Err(VfsError::NotFound(view.to_string()));
        }

        let Some(conversation_id) = path.conversation_id() else {
            return Ok(path);
        };

        if path.message_path().is_empty() {
            if !self.store.contains(conversation_id) {
                return Err(VfsError::NotFound(path.to_string()));
            }
            return Ok(path);
        }

        let tree = self.load(conversation_id, &path)?;
        let message =
            tree.path_from_root(path.message_path()).map_err(|err| invalid_node(&path, err))?;

        if tree.has_children(&message.id) { Ok(path) } else { Ok(path.into_leaf()) }
    }

    /// Load the conversation a path points into
    pub fn conversation(&self, path: &VfsPath) -> Result<ConversationTree, VfsError> {
        let id = path.conversation_id().ok_or_else(|| VfsError::NotFound(path.to_string()))?;
        self.load(id, path)
    }

    fn load(&self, id: &str, path: &VfsPath) -> Result<ConversationTree, VfsError> {
        self.store.get_conversation(id).map_err(|err| match err {
            StoreError::NotFound(_) => VfsError::NotFound(path.to_string()),
            other => VfsError::Store(other),
        })
    }

    fn compute_listing(&self, dir: &VfsPath) -> Result<Vec<DirectoryEntry>, VfsError> {
        if dir.is_in_conversation() {
            return self.list_messages(dir);
        }

        match dir.kind() {
            PathKind::Root => Ok(path::TOP_LEVEL
                .iter()
                .map(|name| {
                    DirectoryEntry::directory(*name, Some(describe_top_level(name).to_string()))
                })
                .collect()),
            PathKind::ConversationCollection => {
                self.list_conversations(&ConversationFilter::default())
            }
            PathKind::TagCollection => {
                let summaries = self.store.list_conversations(&ConversationFilter::default())?;
                Ok(group_entries(summaries.iter().flat_map(|s| s.tags.iter().cloned())))
            }
            PathKind::TagDirectory(tag) => {
                if !self.has_any(ConversationFilter::all().with_tag(tag))? {
                    return Err(VfsError::NotFound(dir.to_string()));
                }
                self.list_conversations(&ConversationFilter::default().with_tag(tag))
            }
            PathKind::Starred => self.list_flagged(StatusFlag::Starred),
            PathKind::Pinned => self.list_flagged(StatusFlag::Pinned),
            PathKind::Archived => self.list_flagged(StatusFlag::Archived),
            PathKind::Recent(None) => {
                let counts = self.recent_buckets()?;
                Ok(RecentPeriod::ALL
                    .iter()
                    .map(|period| {
                        let count = counts.get(period).map(Vec::len).unwrap_or(0);
                        DirectoryEntry::directory(period.as_str(), Some(conversation_count(count)))
                    })
                    .collect())
            }
            PathKind::Recent(Some(period)) => {
                let mut buckets = self.recent_buckets()?;
                Ok(buckets
                    .remove(period)
                    .unwrap_or_default()
                    .iter()
                    .map(DirectoryEntry::conversation)
                    .collect())
            }
            PathKind::Source(None) => {
                let summaries = self.store.list_conversations(&ConversationFilter::default())?;
                Ok(group_entries(summaries.iter().filter_map(|s| s.source.clone())))
            }
            PathKind::Source(Some(name)) => {
                if !self.has_any(ConversationFilter::all().with_source(name))? {
                    return Err(VfsError::NotFound(dir.to_string()));
                }
                self.list_conversations(&ConversationFilter::default().with_source(name))
            }
            PathKind::Model(None) => {
                let summaries = self.store.list_conversations(&ConversationFilter::default())?;
                Ok(group_entries(summaries.iter().filter_map(|s| s.model.clone())))
            }
            PathKind::Model(Some(name)) => {
                if !self.has_any(ConversationFilter::all().with_model(name))? {
                    return Err(VfsError::NotFound(dir.to_string()));
                }
                self.list_conversations(&ConversationFilter::default().with_model(name))
            }
            PathKind::ConversationRoot | PathKind::MessageNode => self.list_messages(dir),
        }
    }

    fn has_any(&self, filter: ConversationFilter) -> Result<bool, VfsError> {
        Ok(!self.store.list_conversations(&filter)?.is_empty())
    }

    fn list_conversations(
        &self,
        filter: &ConversationFilter,
    ) -> Result<Vec<DirectoryEntry>, VfsError> {
        Ok(self.store.list_conversations(filter)?.iter().map(DirectoryEntry::conversation).collect())
    }

    fn list_flagged(&self, flag: StatusFlag) -> Result<Vec<DirectoryEntry>, VfsError> {
        self.list_conversations(&ConversationFilter::default().with_flag(flag))
    }

    /// Non-archived conversations grouped by the calendar bucket of their creation time
    fn recent_buckets(
        &self,
    ) -> Result<BTreeMap<RecentPeriod, Vec<ConversationSummary>>, VfsError> {
        let now = self.cache.clock().utc();
        let mut buckets: BTreeMap<RecentPeriod, Vec<ConversationSummary>> = BTreeMap::new();
        for summary in self.store.list_conversations(&ConversationFilter::default())? {
            let period = RecentPeriod::classify(summary.created_at, now);
            buckets.entry(period).or_default().push(summary);
        }
        for summaries in buckets.values_mut() {
            summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        }
        Ok(buckets)
    }

    fn list_messages(&self, dir: &VfsPath) -> Result<Vec<DirectoryEntry>, VfsError> {
        let tree = self.conversation(dir)?;
        let parent = if dir.message_path().is_empty() {
            None
        } else {
            let node =
                tree.path_from_root(dir.message_path()).map_err(|err| invalid_node(dir, err))?;
            if !tree.has_children(&node.id) {
                return Err(VfsError::NotADirectory(dir.to_string()));
            }
            Some(node.id.clone())
        };

        Ok(tree
            .children_of(parent.as_deref())
            .into_iter()
            .enumerate()
            .map(|(i, message)| {
                DirectoryEntry::message(
                    i + 1,
                    &tree.id,
                    message,
                    tree.has_children(&message.id),
                    self.preview_width,
                )
            })
            .collect())
    }
}

fn invalid_node(path: &VfsPath, err: TreeError) -> VfsError {
    let segment = path.segments().last().cloned().unwrap_or_default();
    VfsError::Resolution(PathError::InvalidMessageNode { segment, reason: err.to_string() })
}

fn describe_top_level(name: &str) -> &'static str {
    match name {
        path::CHATS => "all conversations",
        path::TAGS => "conversations by tag",
        path::STARRED => "starred conversations",
        path::PINNED => "pinned conversations",
        path::ARCHIVED => "archived conversations",
        path::RECENT => "conversations by creation date",
        path::SOURCE => "conversations by import source",
        path::MODEL => "conversations by model",
        _ => "",
    }
}

fn conversation_count(count: usize) -> String {
    if count == 1 { "1 conversation".to_string() } else { format!("{} conversations", count) }
}

/// One directory per distinct name, sorted, with a count description
fn group_entries(names: impl Iterator<Item = String>) -> Vec<DirectoryEntry> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for name in names {
        *counts.entry(name).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(name, count)| {
            DirectoryEntry::directory(encode_segment(&name), Some(conversation_count(count)))
        })
        .collect()
}
