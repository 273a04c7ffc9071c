use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::{Message, Role};
use super::summary::{ConversationSummary, StatusFlag};
use crate::utils::terminal::strip_ansi_codes;

/// Status flags and tags copied onto a listing entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFlags {
    pub starred: bool,
    pub pinned: bool,
    pub archived: bool,
    pub tags: Vec<String>,
}

impl TagFlags {
    /// Compact marker column for long listings, e.g. `*P-`
    pub fn markers(&self) -> String {
        [(self.starred, '*'), (self.pinned, 'P'), (self.archived, 'A')]
            .iter()
            .map(|&(set, marker)| if set { marker } else { '-' })
            .collect()
    }
}

/// One row of a directory listing.
///
/// Entries never own the record they describe; `conversation_id` and `message_id` are lookup
/// keys back into the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_directory: bool,
    pub conversation_id: Option<String>,
    pub message_id: Option<String>,
    pub role: Option<Role>,
    pub content_preview: Option<String>,
    pub has_children: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub tag_flags: TagFlags,
}

impl DirectoryEntry {
    /// Plain synthetic directory (top-level views, tags, buckets)
    pub fn directory(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: true,
            conversation_id: None,
            message_id: None,
            role: None,
            content_preview: description,
            has_children: true,
            created_at: None,
            updated_at: None,
            tag_flags: TagFlags::default(),
        }
    }

    /// Reference to a conversation, named by its id
    pub fn conversation(summary: &ConversationSummary) -> Self {
        Self {
            name: summary.id.clone(),
            is_directory: true,
            conversation_id: Some(summary.id.clone()),
            message_id: None,
            role: None,
            content_preview: Some(title_line(&summary.title)),
            has_children: summary.message_count > 0,
            created_at: Some(summary.created_at),
            updated_at: Some(summary.updated_at),
            tag_flags: TagFlags {
                starred: summary.has_flag(StatusFlag::Starred),
                pinned: summary.has_flag(StatusFlag::Pinned),
                archived: summary.has_flag(StatusFlag::Archived),
                tags: summary.tags.iter().cloned().collect(),
            },
        }
    }

    /// Positional message node (`m1`, `m2`, ...). Leaves are files, branches are directories.
    pub fn message(
        index: usize,
        conversation_id: &str,
        message: &Message,
        has_children: bool,
        preview_width: usize,
    ) -> Self {
        Self {
            name: format!("m{}", index),
            is_directory: has_children,
            conversation_id: Some(conversation_id.to_string()),
            message_id: Some(message.id.clone()),
            role: Some(message.role),
            content_preview: Some(message.preview(preview_width)),
            has_children,
            created_at: Some(message.timestamp),
            updated_at: Some(message.timestamp),
            tag_flags: TagFlags::default(),
        }
    }

    /// Name as shown by `ls`, with a trailing `/` on directories
    pub fn display_name(&self) -> String {
        if self.is_directory { format!("{}/", self.name) } else { self.name.clone() }
    }

    /// True for entries that reference a whole conversation (not a message inside one)
    pub fn is_conversation(&self) -> bool {
        self.conversation_id.is_some() && self.message_id.is_none()
    }
}

/// Titles are stored as given; listings show them sanitized on one line
fn title_line(title: &str) -> String {
    strip_ansi_codes(title).split_whitespace().collect::<Vec<_>>().join(" ")
}
