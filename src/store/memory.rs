use std::collections::HashMap;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::{ConversationFilter, RecordStore, listing_order};
use crate::error::StoreError;
use crate::models::{ConversationMetadata, ConversationSummary, StatusFlag};
use crate::tree::ConversationTree;

const COPY_SUFFIX: &str = " (copy)";

/// In-memory [`RecordStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    conversations: HashMap<String, ConversationTree>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_conversations(conversations: impl IntoIterator<Item = ConversationTree>) -> Self {
        let conversations = conversations.into_iter().map(|tree| (tree.id.clone(), tree)).collect();
        Self { conversations }
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Borrow a stored conversation without copying it
    pub fn conversation(&self, id: &str) -> Option<&ConversationTree> {
        self.conversations.get(id)
    }

    pub fn conversations(&self) -> impl Iterator<Item = &ConversationTree> {
        self.conversations.values()
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut ConversationTree, StoreError> {
        self.conversations.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Id of a copy that does not collide with anything stored
    fn fresh_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if !self.conversations.contains_key(&id) {
                return id;
            }
        }
    }
}

impl RecordStore for MemoryStore {
    fn list_conversations(
        &self,
        filter: &ConversationFilter,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        let mut summaries: Vec<ConversationSummary> = self
            .conversations
            .values()
            .map(ConversationTree::summary)
            .filter(|summary| filter.matches(summary))
            .collect();
        summaries.sort_by(listing_order);
        Ok(summaries)
    }

    fn get_conversation(&self, id: &str) -> Result<ConversationTree, StoreError> {
        self.conversations.get(id).cloned().ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn add_tag(&mut self, id: &str, tag: &str) -> Result<(), StoreError> {
        let tree = self.get_mut(id)?;
        tree.tags.insert(tag.to_string());
        Ok(())
    }

    fn remove_tag(&mut self, id: &str, tag: &str) -> Result<(), StoreError> {
        let tree = self.get_mut(id)?;
        tree.tags.remove(tag);
        Ok(())
    }

    fn set_status(&mut self, id: &str, flag: StatusFlag, value: bool) -> Result<(), StoreError> {
        let tree = self.get_mut(id)?;
        tree.metadata.set_flag(flag, value, Utc::now());
        Ok(())
    }

    fn delete_conversation(&mut self, id: &str) -> Result<(), StoreError> {
        self.conversations.remove(id).map(|_| ()).ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn duplicate_conversation(&mut self, id: &str) -> Result<String, StoreError> {
        let source = self.get_conversation(id)?;
        let new_id = self.fresh_id();
        let now = Utc::now();

        let mut copy = source;
        copy.id = new_id.clone();
        copy.title = format!("{}{}", copy.title, COPY_SUFFIX);
        copy.metadata = ConversationMetadata {
            source: copy.metadata.source.take(),
            model: copy.metadata.model.take(),
            ..ConversationMetadata::new(now)
        };

        debug!(from = id, to = %new_id, "duplicated conversation");
        self.conversations.insert(new_id.clone(), copy);
        Ok(new_id)
    }

    fn save_conversation(&mut self, tree: ConversationTree) -> Result<(), StoreError> {
        self.conversations.insert(tree.id.clone(), tree);
        Ok(())
    }

    fn create_conversation(&mut self, title: &str) -> Result<String, StoreError> {
        let id = self.fresh_id();
        self.conversations.insert(id.clone(), ConversationTree::new(id.clone(), title, Utc::now()));
        Ok(id)
    }

    fn get_summary(&self, id: &str) -> Result<ConversationSummary, StoreError> {
        self.conversations
            .get(id)
            .map(ConversationTree::summary)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn contains(&self, id: &str) -> bool {
        self.conversations.contains_key(id)
    }
}
