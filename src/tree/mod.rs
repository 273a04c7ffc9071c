//! Branching conversation trees.
//!
//! A conversation is a forest of out-trees stored as an arena: `message_map` owns every
//! [`Message`] and the parent/child relation is kept as id lists. Every message has at most one
//! parent and any number of children; a node with more than one child is a branch point (a
//! regenerated answer, an edited prompt, an explicit fork).
//!
//! Siblings are kept sorted by `(timestamp, id)`. Positional names (`m1`, `m2`, ...) and the
//! longest-path tie-break therefore depend only on the messages, never on the order in which
//! they were inserted.
//!
//! Messages are append-only: there is no operation that removes or replaces a node.

mod paths;

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use paths::AllPaths;

use crate::error::TreeError;
use crate::models::{ConversationMetadata, ConversationSummary, Message, Role};

/// An in-memory conversation with its message tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ConversationRecord", from = "ConversationRecord")]
pub struct ConversationTree {
    pub id: String,
    pub title: String,
    pub tags: BTreeSet<String>,
    pub metadata: ConversationMetadata,
    root_message_ids: Vec<String>,
    message_map: HashMap<String, Message>,
    children: HashMap<String, Vec<String>>,
}

/// Flat serialized form: messages in pre-order, links rebuilt on load
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConversationRecord {
    id: String,
    title: String,
    #[serde(default)]
    tags: BTreeSet<String>,
    metadata: ConversationMetadata,
    #[serde(default)]
    messages: Vec<Message>,
}

impl From<ConversationTree> for ConversationRecord {
    fn from(tree: ConversationTree) -> Self {
        let messages = tree.preorder().into_iter().cloned().collect();
        Self {
            id: tree.id,
            title: tree.title,
            tags: tree.tags,
            metadata: tree.metadata,
            messages,
        }
    }
}

impl From<ConversationRecord> for ConversationTree {
    fn from(record: ConversationRecord) -> Self {
        let mut tree = ConversationTree::from_messages(
            record.id,
            record.title,
            record.metadata.created_at,
            record.messages,
        );
        tree.tags = record.tags;
        tree.metadata = record.metadata;
        tree
    }
}

impl ConversationTree {
    pub fn new(id: impl Into<String>, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            tags: BTreeSet::new(),
            metadata: ConversationMetadata::new(created_at),
            root_message_ids: Vec::new(),
            message_map: HashMap::new(),
            children: HashMap::new(),
        }
    }

    /// Build a tree from records in any order.
    ///
    /// Messages whose parent is missing become roots, duplicate ids keep the first occurrence,
    /// and a parent cycle is broken by promoting its smallest id to a root. Each repair is
    /// logged as a warning.
    pub fn from_messages(
        id: impl Into<String>,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
        messages: Vec<Message>,
    ) -> Self {
        let mut tree = Self::new(id, title, created_at);

        let mut pending: HashMap<String, Message> = HashMap::with_capacity(messages.len());
        let mut order: Vec<String> = Vec::with_capacity(messages.len());
        for message in messages {
            if pending.contains_key(&message.id) {
                warn!(conversation = %tree.id, message = %message.id, "Skipping duplicate message id");
                continue;
            }
            order.push(message.id.clone());
            pending.insert(message.id.clone(), message);
        }

        let known: HashSet<String> = pending.keys().cloned().collect();
        let mut by_parent: HashMap<String, Vec<String>> = HashMap::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        for id in &order {
            let Some(message) = pending.get_mut(id) else { continue };
            match message.parent_id.clone() {
                Some(parent) if parent != *id && known.contains(&parent) => {
                    by_parent.entry(parent).or_default().push(id.clone());
                }
                Some(parent) => {
                    warn!(conversation = %tree.id, message = %id, parent = %parent, "Parent not found, treating message as a root");
                    message.parent_id = None;
                    queue.push_back(id.clone());
                }
                None => queue.push_back(id.clone()),
            }
        }

        loop {
            while let Some(id) = queue.pop_front() {
                let Some(message) = pending.remove(&id) else { continue };
                if let Err(e) = tree.add_message(message) {
                    warn!(conversation = %tree.id, message = %id, error = %e, "Dropping message");
                    continue;
                }
                if let Some(children) = by_parent.get(&id) {
                    queue.extend(children.iter().cloned());
                }
            }

            // Whatever is left only reaches itself through its parents
            let Some(cycle_member) = pending.keys().min().cloned() else { break };
            warn!(conversation = %tree.id, message = %cycle_member, "Breaking parent cycle");
            if let Some(message) = pending.get_mut(&cycle_member) {
                message.parent_id = None;
            }
            queue.push_back(cycle_member);
        }

        tree
    }

    /// Append a message. Adding under a node that already has children creates a fork.
    pub fn add_message(&mut self, message: Message) -> Result<(), TreeError> {
        if self.message_map.contains_key(&message.id) {
            return Err(TreeError::DuplicateMessage(message.id));
        }

        let key = (message.timestamp, message.id.clone());
        let siblings = match &message.parent_id {
            Some(parent) => {
                if !self.message_map.contains_key(parent) {
                    return Err(TreeError::UnknownParent(parent.clone()));
                }
                self.children.entry(parent.clone()).or_default()
            }
            None => &mut self.root_message_ids,
        };

        let map = &self.message_map;
        let position = siblings.partition_point(|sibling| {
            map.get(sibling).map(|m| (m.timestamp, m.id.clone()) < key).unwrap_or(true)
        });
        siblings.insert(position, message.id.clone());

        if message.timestamp > self.metadata.updated_at {
            self.metadata.updated_at = message.timestamp;
        }
        self.message_map.insert(message.id.clone(), message);
        Ok(())
    }

    /// Convenience wrapper creating a message with a fresh id; returns that id
    pub fn append(
        &mut self,
        parent_id: Option<&str>,
        role: Role,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<String, TreeError> {
        let mut message = Message::new(role, content, timestamp);
        message.parent_id = parent_id.map(str::to_string);
        let id = message.id.clone();
        self.add_message(message)?;
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.message_map.get(id)
    }

    pub fn root_message_ids(&self) -> &[String] {
        &self.root_message_ids
    }

    pub(crate) fn child_ids(&self, id: Option<&str>) -> &[String] {
        match id {
            None => &self.root_message_ids,
            Some(id) => self.children.get(id).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    /// Ordered children of a message; `None` returns the roots
    pub fn children_of(&self, id: Option<&str>) -> Vec<&Message> {
        self.child_ids(id).iter().filter_map(|child| self.message_map.get(child)).collect()
    }

    pub fn has_children(&self, id: &str) -> bool {
        !self.child_ids(Some(id)).is_empty()
    }

    /// Walk 1-indexed child positions starting from the roots
    pub fn path_from_root(&self, path: &[usize]) -> Result<&Message, TreeError> {
        if path.is_empty() {
            return Err(TreeError::NodeOutOfRange {
                depth: 0,
                index: 0,
                available: self.root_message_ids.len(),
            });
        }

        let mut current: Option<&Message> = None;
        for (depth, &index) in path.iter().enumerate() {
            let siblings = self.child_ids(current.map(|m| m.id.as_str()));
            let message = index
                .checked_sub(1)
                .and_then(|i| siblings.get(i))
                .and_then(|id| self.message_map.get(id))
                .ok_or(TreeError::NodeOutOfRange { depth, index, available: siblings.len() })?;
            current = Some(message);
        }

        current.ok_or(TreeError::NodeOutOfRange { depth: 0, index: 0, available: 0 })
    }

    /// Positional path (`[1, 2]` for `m1/m2`) of a message
    pub fn message_path_of(&self, id: &str) -> Result<Vec<usize>, TreeError> {
        let mut positions = Vec::new();
        let mut cursor = self.message_map.get(id).ok_or_else(|| TreeError::UnknownMessage(id.to_string()))?;

        loop {
            let parent = cursor.parent_id.as_deref();
            let siblings = self.child_ids(parent);
            let index = siblings
                .iter()
                .position(|sibling| *sibling == cursor.id)
                .ok_or_else(|| TreeError::UnknownMessage(cursor.id.clone()))?;
            positions.push(index + 1);

            match parent.and_then(|p| self.message_map.get(p)) {
                Some(parent_message) => cursor = parent_message,
                None => break,
            }
        }

        positions.reverse();
        Ok(positions)
    }

    /// Messages from the root down to `id`, inclusive
    pub fn ancestry(&self, id: &str) -> Result<Vec<&Message>, TreeError> {
        let mut chain = Vec::new();
        let mut cursor = self.message_map.get(id).ok_or_else(|| TreeError::UnknownMessage(id.to_string()))?;
        loop {
            chain.push(cursor);
            match cursor.parent_id.as_deref().and_then(|p| self.message_map.get(p)) {
                Some(parent) => cursor = parent,
                None => break,
            }
        }
        chain.reverse();
        Ok(chain)
    }

    /// Every root-to-leaf path, lazily, in deterministic pre-order
    pub fn all_paths(&self) -> AllPaths<'_> {
        AllPaths::new(self)
    }

    /// The longest root-to-leaf path; the first one found in pre-order wins ties
    pub fn longest_path(&self) -> Vec<&Message> {
        let mut best: Vec<&Message> = Vec::new();
        for path in self.all_paths() {
            if path.len() > best.len() {
                best = path;
            }
        }
        best
    }

    /// Continue the longest path from `start` downward (used to pick a default leaf)
    pub fn deepest_leaf_under(&self, start: &str) -> Option<&Message> {
        let start = self.message_map.get(start)?;
        let mut best = (start, 0usize);
        let mut stack = vec![(start, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            if depth > best.1 {
                best = (node, depth);
            }
            for child in self.children_of(Some(&node.id)).into_iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        Some(best.0)
    }

    /// All messages in pre-order
    pub fn preorder(&self) -> Vec<&Message> {
        let mut out = Vec::with_capacity(self.message_map.len());
        let mut stack: Vec<&str> = self.root_message_ids.iter().rev().map(String::as_str).collect();
        while let Some(id) = stack.pop() {
            if let Some(message) = self.message_map.get(id) {
                out.push(message);
                stack.extend(self.child_ids(Some(id)).iter().rev().map(String::as_str));
            }
        }
        out
    }

    /// Messages with more than one child, in pre-order
    pub fn branch_points(&self) -> Vec<&Message> {
        self.preorder().into_iter().filter(|m| self.child_ids(Some(&m.id)).len() > 1).collect()
    }

    /// Messages without children, in pre-order
    pub fn leaves(&self) -> Vec<&Message> {
        self.preorder().into_iter().filter(|m| !self.has_children(&m.id)).collect()
    }

    pub fn message_count(&self) -> usize {
        self.message_map.len()
    }

    /// Number of root-to-leaf paths (one per leaf)
    pub fn path_count(&self) -> usize {
        self.leaves().len()
    }

    /// Length of the longest path
    pub fn depth(&self) -> usize {
        self.longest_path().len()
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.metadata.updated_at {
            self.metadata.updated_at = at;
        }
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            tags: self.tags.clone(),
            source: self.metadata.source.clone(),
            model: self.metadata.model.clone(),
            created_at: self.metadata.created_at,
            updated_at: self.metadata.updated_at,
            starred_at: self.metadata.starred_at,
            pinned_at: self.metadata.pinned_at,
            archived_at: self.metadata.archived_at,
            message_count: self.message_map.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn msg(id: &str, parent: Option<&str>, minute: i64) -> Message {
        let mut message =
            Message::new(Role::User, format!("content {}", id), base_time() + Duration::minutes(minute))
                .with_id(id);
        message.parent_id = parent.map(str::to_string);
        message
    }

    /// a
    /// ├── b ── d
    /// └── c ── e ── f
    fn branching_tree() -> ConversationTree {
        let mut tree = ConversationTree::new("conv-1", "Branching", base_time());
        for m in [
            msg("a", None, 0),
            msg("b", Some("a"), 1),
            msg("c", Some("a"), 2),
            msg("d", Some("b"), 3),
            msg("e", Some("c"), 4),
            msg("f", Some("e"), 5),
        ] {
            tree.add_message(m).unwrap();
        }
        tree
    }

    fn ids(messages: &[&Message]) -> Vec<String> {
        messages.iter().map(|m| m.id.clone()).collect()
    }

    #[test]
    fn test_children_of_roots_and_nodes() {
        let tree = branching_tree();
        assert_eq!(ids(&tree.children_of(None)), vec!["a"]);
        assert_eq!(ids(&tree.children_of(Some("a"))), vec!["b", "c"]);
        assert!(tree.children_of(Some("f")).is_empty());
        assert!(tree.children_of(Some("missing")).is_empty());
    }

    #[test]
    fn test_path_from_root() {
        let tree = branching_tree();
        assert_eq!(tree.path_from_root(&[1]).unwrap().id, "a");
        assert_eq!(tree.path_from_root(&[1, 2]).unwrap().id, "c");
        assert_eq!(tree.path_from_root(&[1, 2, 1, 1]).unwrap().id, "f");
    }

    #[test]
    fn test_path_from_root_out_of_range() {
        let tree = branching_tree();
        assert_eq!(
            tree.path_from_root(&[1, 3]).unwrap_err(),
            TreeError::NodeOutOfRange { depth: 1, index: 3, available: 2 }
        );
        assert!(tree.path_from_root(&[0]).is_err());
        assert!(tree.path_from_root(&[]).is_err());
        assert!(tree.path_from_root(&[1, 1, 1, 1]).is_err());
    }

    #[test]
    fn test_message_path_of_inverts_path_from_root() {
        let tree = branching_tree();
        for message in tree.preorder() {
            let path = tree.message_path_of(&message.id).unwrap();
            assert_eq!(tree.path_from_root(&path).unwrap().id, message.id);
        }
        assert_eq!(tree.message_path_of("e").unwrap(), vec![1, 2, 1]);
    }

    #[test]
    fn test_all_paths_one_per_leaf() {
        let tree = branching_tree();
        let paths: Vec<Vec<String>> = tree.all_paths().map(|p| ids(&p)).collect();
        assert_eq!(paths, vec![vec!["a", "b", "d"], vec!["a", "c", "e", "f"]]);
        assert_eq!(paths.len(), tree.leaves().len());
        for path in tree.all_paths() {
            assert!(path[0].parent_id.is_none());
            assert!(!tree.has_children(&path.last().unwrap().id));
        }
    }

    #[test]
    fn test_longest_path() {
        let tree = branching_tree();
        assert_eq!(ids(&tree.longest_path()), vec!["a", "c", "e", "f"]);
        assert_eq!(tree.depth(), 4);
    }

    #[test]
    fn test_longest_path_tie_break_ignores_insertion_order() {
        let messages = vec![msg("r", None, 0), msg("x", Some("r"), 1), msg("y", Some("r"), 2)];

        let mut forward = ConversationTree::new("t1", "Tie", base_time());
        for m in messages.iter().cloned() {
            forward.add_message(m).unwrap();
        }

        let mut backward = ConversationTree::new("t2", "Tie", base_time());
        backward.add_message(messages[0].clone()).unwrap();
        backward.add_message(messages[2].clone()).unwrap();
        backward.add_message(messages[1].clone()).unwrap();

        assert_eq!(ids(&forward.longest_path()), vec!["r", "x"]);
        assert_eq!(ids(&forward.longest_path()), ids(&backward.longest_path()));
        assert_eq!(ids(&backward.longest_path()), ids(&backward.longest_path()));
    }

    #[test]
    fn test_fork_adds_sibling() {
        let mut tree = branching_tree();
        let new_id = tree
            .append(Some("b"), Role::Assistant, "regenerated", base_time() + Duration::minutes(10))
            .unwrap();

        assert_eq!(ids(&tree.children_of(Some("b"))), vec!["d".to_string(), new_id]);
        assert_eq!(tree.path_count(), 3);
        assert_eq!(ids(&tree.branch_points()), vec!["a", "b"]);
    }

    #[test]
    fn test_add_message_errors() {
        let mut tree = branching_tree();
        assert_eq!(
            tree.add_message(msg("z", Some("nope"), 9)).unwrap_err(),
            TreeError::UnknownParent("nope".to_string())
        );
        assert_eq!(
            tree.add_message(msg("a", None, 9)).unwrap_err(),
            TreeError::DuplicateMessage("a".to_string())
        );
        assert_eq!(tree.message_count(), 6);
    }

    #[test]
    fn test_from_messages_any_order_and_repairs() {
        let messages = vec![
            msg("f", Some("e"), 5),
            msg("d", Some("b"), 3),
            msg("b", Some("a"), 1),
            msg("a", None, 0),
            msg("orphan", Some("gone"), 6),
            msg("c", Some("a"), 2),
            msg("e", Some("c"), 4),
            msg("loop1", Some("loop2"), 7),
            msg("loop2", Some("loop1"), 8),
        ];
        let tree = ConversationTree::from_messages("conv", "Rebuilt", base_time(), messages);

        assert_eq!(tree.message_count(), 9);
        assert_eq!(ids(&tree.children_of(None)), vec!["a", "orphan", "loop1"]);
        assert_eq!(ids(&tree.children_of(Some("loop1"))), vec!["loop2"]);
        assert_eq!(ids(&tree.longest_path()), vec!["a", "c", "e", "f"]);
    }

    #[test]
    fn test_serde_roundtrip_preserves_structure() {
        let mut tree = branching_tree();
        tree.tags.insert("rust".to_string());
        let json = serde_json::to_string(&tree).unwrap();
        let restored: ConversationTree = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, tree);
    }

    #[test]
    fn test_ancestry_and_deepest_leaf() {
        let tree = branching_tree();
        assert_eq!(ids(&tree.ancestry("e").unwrap()), vec!["a", "c", "e"]);
        assert_eq!(tree.deepest_leaf_under("a").unwrap().id, "f");
        assert_eq!(tree.deepest_leaf_under("b").unwrap().id, "d");
        assert_eq!(tree.deepest_leaf_under("f").unwrap().id, "f");
    }

    #[test]
    fn test_updated_at_tracks_latest_message() {
        let tree = branching_tree();
        assert_eq!(tree.metadata.updated_at, base_time() + Duration::minutes(5));
        assert_eq!(tree.summary().message_count, 6);
    }
}
