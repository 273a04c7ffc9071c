//! Import adapters turning external chat logs into conversation records.
//!
//! Only Claude Code session transcripts are supported today ([`claude`]). Adapters write through
//! [`crate::store::RecordStore`], so the same code imports into a [`crate::store::FileStore`] or
//! a [`crate::store::MemoryStore`].

pub mod claude;

pub use claude::{discover_transcripts, import_claude_sessions};

/// Outcome of one import run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Transcript files parsed successfully
    pub files_parsed: usize,
    /// Transcript files skipped after a parse failure
    pub files_failed: usize,
    /// Conversations written to the store (new or refreshed)
    pub conversations: usize,
    /// Messages across the written conversations
    pub messages: usize,
}
