//! Data models shared across the crate.
//!
//! - [`Message`] / [`Role`] - a node of a conversation tree
//! - [`ConversationMetadata`] / [`ConversationSummary`] / [`StatusFlag`] - per-conversation
//!   metadata and the projection used by listings
//! - [`DirectoryEntry`] - one row of a virtual directory listing
//! - [`TranscriptEntry`] - wire format of imported Claude Code transcripts
//!
//! The conversation tree itself lives in [`crate::tree`].

pub mod entry;
pub mod message;
pub mod summary;
pub mod transcript;

pub use entry::{DirectoryEntry, TagFlags};
pub use message::{Message, Role};
pub use summary::{ConversationMetadata, ConversationSummary, StatusFlag};
pub use transcript::{ContentBlock, TranscriptContent, TranscriptEntry, TranscriptMessage};
