//! Wire format of Claude Code session transcripts (one JSON object per line).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const CONTENT_TYPE_TEXT: &str = "text";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Message content is either a bare string or a list of typed blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranscriptContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: String,
    pub content: TranscriptContent,
    #[serde(default)]
    pub model: Option<String>,
}

impl TranscriptMessage {
    /// Concatenate the text blocks, one per line. Non-text blocks (tool calls, images) are skipped.
    pub fn text(&self) -> String {
        match &self.content {
            TranscriptContent::Text(text) => text.clone(),
            TranscriptContent::Blocks(blocks) => {
                let parts: Vec<&str> = blocks
                    .iter()
                    .filter(|b| b.content_type == CONTENT_TYPE_TEXT)
                    .filter_map(|b| b.text.as_deref())
                    .collect();

                let capacity = parts.iter().map(|s| s.len()).sum::<usize>()
                    + parts.len().saturating_sub(1);
                let mut result = String::with_capacity(capacity);
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        result.push('\n');
                    }
                    result.push_str(part);
                }
                result
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    #[serde(rename = "type")]
    pub entry_type: String,
    pub message: TranscriptMessage,
    #[serde(deserialize_with = "crate::parsers::deserializers::deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(
        rename = "sessionId",
        deserialize_with = "crate::parsers::deserializers::deserialize_session_id"
    )]
    pub session_id: String,
    pub uuid: String,
    #[serde(rename = "parentUuid", default)]
    pub parent_uuid: Option<String>,
    #[serde(rename = "isSidechain", default)]
    pub is_sidechain: Option<bool>,
}
