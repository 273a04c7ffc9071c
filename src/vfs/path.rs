//! Virtual paths and their normalization.
//!
//! The namespace is fixed:
//!
//! ```text
//! /
//! ├── chats/<id>/m1/m2/...
//! ├── tags/<tag>/<id>/...
//! ├── starred/<id>/...      pinned/<id>/...      archived/<id>/...
//! ├── recent/<today|this-week|this-month|older>/<id>/...
//! ├── source/<name>/<id>/...
//! └── model/<name>/<id>/...
//! ```
//!
//! A conversation id segment always normalizes to a directory. Segments after it are message
//! nodes named `m<n>`, 1-indexed among their siblings.

use std::fmt;

use crate::error::PathError;
use crate::utils::paths::{decode_segment, encode_segment};

use super::recent::RecentPeriod;

pub const CHATS: &str = "chats";
pub const TAGS: &str = "tags";
pub const STARRED: &str = "starred";
pub const PINNED: &str = "pinned";
pub const ARCHIVED: &str = "archived";
pub const RECENT: &str = "recent";
pub const SOURCE: &str = "source";
pub const MODEL: &str = "model";

/// Top-level directories in listing order
pub const TOP_LEVEL: [&str; 8] = [CHATS, TAGS, STARRED, PINNED, ARCHIVED, RECENT, SOURCE, MODEL];

/// What a normalized path points at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKind {
    Root,
    ConversationCollection,
    ConversationRoot,
    MessageNode,
    TagCollection,
    TagDirectory(String),
    Starred,
    Pinned,
    Archived,
    /// `None` is `/recent` itself
    Recent(Option<RecentPeriod>),
    /// `None` is `/source` itself
    Source(Option<String>),
    /// `None` is `/model` itself
    Model(Option<String>),
}

/// A normalized location in the virtual filesystem.
///
/// Only [`normalize`] (and the navigator, which marks leaf messages) produce values of this
/// type, so every `VfsPath` has exactly one canonical spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VfsPath {
    kind: PathKind,
    segments: Vec<String>,
    conversation_id: Option<String>,
    message_path: Vec<usize>,
    is_directory: bool,
}

impl VfsPath {
    pub fn root() -> Self {
        Self {
            kind: PathKind::Root,
            segments: Vec::new(),
            conversation_id: None,
            message_path: Vec::new(),
            is_directory: true,
        }
    }

    pub fn kind(&self) -> &PathKind {
        &self.kind
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// 1-indexed child positions below the conversation root; empty for the root itself
    pub fn message_path(&self) -> &[usize] {
        &self.message_path
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn is_root(&self) -> bool {
        self.kind == PathKind::Root
    }

    /// True for a conversation root or any message node inside it
    pub fn is_in_conversation(&self) -> bool {
        self.conversation_id.is_some()
    }

    /// True for view directories whose entries are conversations
    pub fn lists_conversations(&self) -> bool {
        matches!(
            self.kind,
            PathKind::ConversationCollection
                | PathKind::TagDirectory(_)
                | PathKind::Starred
                | PathKind::Pinned
                | PathKind::Archived
                | PathKind::Recent(Some(_))
                | PathKind::Source(Some(_))
                | PathKind::Model(Some(_))
        )
    }

    /// Canonical string used as the listing cache key
    pub fn cache_key(&self) -> String {
        self.to_string()
    }

    /// The containing directory; the root is its own parent
    pub fn parent(&self) -> VfsPath {
        match self.segments.split_last() {
            Some((_, rest)) => classify(rest.to_vec()).unwrap_or_else(|_| VfsPath::root()),
            None => VfsPath::root(),
        }
    }

    /// The conversation root this path is inside, if any
    pub fn conversation_view(&self) -> Option<VfsPath> {
        if self.conversation_id.is_none() {
            return None;
        }
        let keep = self.segments.len() - self.message_path.len();
        classify(self.segments[..keep].to_vec()).ok()
    }

    /// Directory holding the conversation (e.g. `/tags/rust` for `/tags/rust/<id>/m1`)
    pub fn view(&self) -> VfsPath {
        match self.conversation_view() {
            Some(conversation) => conversation.parent(),
            None => self.clone(),
        }
    }

    /// Resolve a single listing name (or any relative path) against this directory
    pub fn join_name(&self, name: &str) -> Result<VfsPath, PathError> {
        normalize(name, self)
    }

    /// The same location with `is_directory` cleared; used for leaf messages only
    pub(crate) fn into_leaf(mut self) -> VfsPath {
        if self.kind == PathKind::MessageNode {
            self.is_directory = false;
        }
        self
    }
}

impl Default for VfsPath {
    fn default() -> Self {
        VfsPath::root()
    }
}

impl fmt::Display for VfsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

/// Normalize `raw` against `current_dir`.
///
/// - A leading `/` makes the path absolute; `~` (alone or as the first segment) means `/`
/// - `.` segments are dropped and `..` pops one segment; `..` at the root is a no-op
/// - A trailing `/` never changes the result
///
/// Only syntax is checked here. Whether the conversation exists, or whether `m7` is in range,
/// is decided by the navigator against the store.
///
/// # Examples
///
/// ```
/// use chatfs::vfs::path::{normalize, PathKind, VfsPath};
///
/// let root = VfsPath::root();
/// let conv = normalize("/chats/abc123/", &root).unwrap();
/// assert_eq!(conv.kind(), &PathKind::ConversationRoot);
/// assert!(conv.is_directory());
/// assert_eq!(conv.to_string(), "/chats/abc123");
///
/// let up = normalize("../../tags", &conv).unwrap();
/// assert_eq!(up.to_string(), "/tags");
/// ```
pub fn normalize(raw: &str, current_dir: &VfsPath) -> Result<VfsPath, PathError> {
    let raw = raw.trim();
    let (absolute, rest) = if raw == "~" {
        (true, "")
    } else if let Some(rest) = raw.strip_prefix("~/") {
        (true, rest)
    } else if raw.starts_with('/') {
        (true, raw)
    } else {
        (false, raw)
    };

    let mut segments: Vec<String> =
        if absolute { Vec::new() } else { current_dir.segments.clone() };

    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_string()),
        }
    }

    classify(segments)
}

fn classify(mut segments: Vec<String>) -> Result<VfsPath, PathError> {
    let Some(top) = segments.first().cloned() else {
        return Ok(VfsPath::root());
    };

    // Number of leading segments that name a view (before any conversation id)
    let (kind, view_len) = match top.as_str() {
        CHATS => (PathKind::ConversationCollection, 1),
        STARRED => (PathKind::Starred, 1),
        PINNED => (PathKind::Pinned, 1),
        ARCHIVED => (PathKind::Archived, 1),
        TAGS => match segments.get(1) {
            None => (PathKind::TagCollection, 1),
            Some(tag) => {
                let name = decode_segment(tag);
                segments[1] = encode_segment(&name);
                (PathKind::TagDirectory(name), 2)
            }
        },
        RECENT => match segments.get(1) {
            None => (PathKind::Recent(None), 1),
            Some(period) => (PathKind::Recent(Some(period.parse()?)), 2),
        },
        SOURCE | MODEL => {
            let is_source = top == SOURCE;
            let name = segments.get(1).map(|s| decode_segment(s));
            if let Some(name) = &name {
                segments[1] = encode_segment(name);
            }
            let len = if name.is_some() { 2 } else { 1 };
            let kind = if is_source { PathKind::Source(name) } else { PathKind::Model(name) };
            (kind, len)
        }
        other => return Err(PathError::UnknownRoot(other.to_string())),
    };

    if segments.len() <= view_len {
        return Ok(VfsPath {
            kind,
            segments,
            conversation_id: None,
            message_path: Vec::new(),
            is_directory: true,
        });
    }

    let conversation_id = segments[view_len].clone();
    let message_path = segments[view_len + 1..]
        .iter()
        .map(|segment| parse_message_node(segment))
        .collect::<Result<Vec<_>, _>>()?;

    let kind = if message_path.is_empty() { PathKind::ConversationRoot } else { PathKind::MessageNode };

    Ok(VfsPath { kind, segments, conversation_id: Some(conversation_id), message_path, is_directory: true })
}

/// Parse `m<positive integer>` into its 1-based index
pub fn parse_message_node(segment: &str) -> Result<usize, PathError> {
    let invalid = |reason: &str| PathError::InvalidMessageNode {
        segment: segment.to_string(),
        reason: reason.to_string(),
    };

    let digits = segment.strip_prefix('m').ok_or_else(|| invalid("expected m<number>"))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("index is not a number"));
    }
    match digits.parse::<usize>() {
        Ok(0) => Err(invalid("indices start at m1")),
        Ok(index) => Ok(index),
        Err(_) => Err(invalid("index is too large")),
    }
}
