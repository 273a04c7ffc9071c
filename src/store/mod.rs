//! Record store collaborators.
//!
//! The navigator, the prefix resolver and the command handlers only see [`RecordStore`]. Two
//! implementations ship with the crate:
//!
//! - [`MemoryStore`]: everything in a map, used by tests and as the cache behind `FileStore`
//! - [`FileStore`]: one JSON document per conversation in a directory

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::cmp::Ordering;

use crate::error::StoreError;
use crate::models::{ConversationSummary, StatusFlag};
use crate::tree::ConversationTree;

/// Selection applied by [`RecordStore::list_conversations`].
///
/// All set fields must match. Archived conversations are hidden unless `include_archived` is
/// set or the filter asks for the archived flag itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationFilter {
    pub tag: Option<String>,
    pub source: Option<String>,
    pub model: Option<String>,
    pub flag: Option<StatusFlag>,
    pub include_archived: bool,
}

impl ConversationFilter {
    /// Every conversation, archived ones included
    pub fn all() -> Self {
        Self { include_archived: true, ..Self::default() }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_flag(mut self, flag: StatusFlag) -> Self {
        self.flag = Some(flag);
        self
    }

    pub fn matches(&self, summary: &ConversationSummary) -> bool {
        let wants_archived = self.include_archived || self.flag == Some(StatusFlag::Archived);
        if !wants_archived && summary.has_flag(StatusFlag::Archived) {
            return false;
        }
        if let Some(flag) = self.flag
            && !summary.has_flag(flag)
        {
            return false;
        }
        if let Some(tag) = &self.tag
            && !summary.tags.contains(tag)
        {
            return false;
        }
        if let Some(source) = &self.source
            && summary.source.as_deref() != Some(source.as_str())
        {
            return false;
        }
        if let Some(model) = &self.model
            && summary.model.as_deref() != Some(model.as_str())
        {
            return false;
        }
        true
    }
}

/// Listing order: pinned first, then most recently updated, then id
pub fn listing_order(a: &ConversationSummary, b: &ConversationSummary) -> Ordering {
    b.has_flag(StatusFlag::Pinned)
        .cmp(&a.has_flag(StatusFlag::Pinned))
        .then_with(|| b.updated_at.cmp(&a.updated_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Query and mutation API over conversation records.
///
/// Implementations own the records. Everything handed out is a copy; callers never hold
/// references into the store.
pub trait RecordStore {
    /// Matching conversations in [`listing_order`]
    fn list_conversations(
        &self,
        filter: &ConversationFilter,
    ) -> Result<Vec<ConversationSummary>, StoreError>;

    fn get_conversation(&self, id: &str) -> Result<ConversationTree, StoreError>;

    fn add_tag(&mut self, id: &str, tag: &str) -> Result<(), StoreError>;

    fn remove_tag(&mut self, id: &str, tag: &str) -> Result<(), StoreError>;

    fn set_status(&mut self, id: &str, flag: StatusFlag, value: bool) -> Result<(), StoreError>;

    fn delete_conversation(&mut self, id: &str) -> Result<(), StoreError>;

    /// Copy a conversation under a fresh id; returns the new id
    fn duplicate_conversation(&mut self, id: &str) -> Result<String, StoreError>;

    /// Insert or replace a whole conversation
    fn save_conversation(&mut self, tree: ConversationTree) -> Result<(), StoreError>;

    /// Start an empty conversation; returns its id
    fn create_conversation(&mut self, title: &str) -> Result<String, StoreError>;

    fn get_summary(&self, id: &str) -> Result<ConversationSummary, StoreError> {
        self.get_conversation(id).map(|tree| tree.summary())
    }

    fn contains(&self, id: &str) -> bool {
        self.get_summary(id).is_ok()
    }
}
