use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status flags a conversation can carry, each with the time it was set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFlag {
    Starred,
    Pinned,
    Archived,
}

impl StatusFlag {
    pub const ALL: [StatusFlag; 3] = [StatusFlag::Starred, StatusFlag::Pinned, StatusFlag::Archived];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFlag::Starred => "starred",
            StatusFlag::Pinned => "pinned",
            StatusFlag::Archived => "archived",
        }
    }
}

impl fmt::Display for StatusFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "starred" | "star" => Ok(StatusFlag::Starred),
            "pinned" | "pin" => Ok(StatusFlag::Pinned),
            "archived" | "archive" => Ok(StatusFlag::Archived),
            _ => Err(format!("unknown status: '{}' (expected starred, pinned, archived)", s)),
        }
    }
}

/// Per-conversation metadata that is not part of the message tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMetadata {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub starred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pinned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
}

impl ConversationMetadata {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            source: None,
            model: None,
            created_at,
            updated_at: created_at,
            starred_at: None,
            pinned_at: None,
            archived_at: None,
        }
    }

    pub fn flag(&self, flag: StatusFlag) -> Option<DateTime<Utc>> {
        match flag {
            StatusFlag::Starred => self.starred_at,
            StatusFlag::Pinned => self.pinned_at,
            StatusFlag::Archived => self.archived_at,
        }
    }

    /// Set or clear a flag. Setting an already-set flag keeps its original timestamp.
    pub fn set_flag(&mut self, flag: StatusFlag, value: bool, at: DateTime<Utc>) {
        let slot = match flag {
            StatusFlag::Starred => &mut self.starred_at,
            StatusFlag::Pinned => &mut self.pinned_at,
            StatusFlag::Archived => &mut self.archived_at,
        };
        match (value, slot.is_some()) {
            (true, false) => *slot = Some(at),
            (false, true) => *slot = None,
            _ => {}
        }
    }
}

/// Lightweight projection of a conversation used by directory listings and queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub tags: BTreeSet<String>,
    pub source: Option<String>,
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub starred_at: Option<DateTime<Utc>>,
    pub pinned_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub message_count: usize,
}

impl ConversationSummary {
    pub fn has_flag(&self, flag: StatusFlag) -> bool {
        match flag {
            StatusFlag::Starred => self.starred_at.is_some(),
            StatusFlag::Pinned => self.pinned_at.is_some(),
            StatusFlag::Archived => self.archived_at.is_some(),
        }
    }
}
