//! JSONL parsers for Claude Code session transcripts
//!
//! # Error Handling Strategy
//!
//! Parsing degrades gracefully:
//!
//! - **Individual line failures**: Malformed lines are logged through `tracing` and skipped, so a
//!   single bad line does not lose the whole session.
//!
//! - **Catastrophic failure detection**: If >50% of lines fail to parse, or if 100 consecutive
//!   errors occur, the parser returns an error and the file is reported as failed.
//!
//! - **Error propagation**: `anyhow::Result` with context; the importer decides whether a failed
//!   file aborts the run.

pub mod conversation;
pub mod deserializers;

pub use conversation::parse_transcript_file;
