//! Typed errors for the navigation, tree and shell layers.
//!
//! Core operations return these instead of `anyhow::Error` so callers can tell a bad path from an
//! ambiguous prefix from a failing handler. The IO edges (file store, importer, CLI) keep using
//! `anyhow` and are folded into [`StoreError::Backend`] or [`CommandError::Other`] when they cross
//! into the core.

use std::fmt;

use thiserror::Error;

/// A raw path could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("unknown top-level directory: '{0}' (expected chats, tags, starred, pinned, archived, recent, source, model)")]
    UnknownRoot(String),
    #[error("unknown recent period: '{0}' (expected today, this-week, this-month, older)")]
    UnknownPeriod(String),
    #[error("invalid message node '{segment}': {reason}")]
    InvalidMessageNode { segment: String, reason: String },
}

/// Structural failures inside a conversation tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node m{index} out of range at depth {depth} ({available} available)")]
    NodeOutOfRange { depth: usize, index: usize, available: usize },
    #[error("parent message not found: {0}")]
    UnknownParent(String),
    #[error("duplicate message id: {0}")]
    DuplicateMessage(String),
    #[error("message not found: {0}")]
    UnknownMessage(String),
}

/// Failures reported by a [`crate::store::RecordStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conversation not found: {0}")]
    NotFound(String),
    #[error("conversation already exists: {0}")]
    AlreadyExists(String),
    #[error("storage backend error: {0:#}")]
    Backend(#[from] anyhow::Error),
}

/// Candidates for an ambiguous prefix, trimmed for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousMatch {
    pub prefix: String,
    /// Up to five matching ids, in listing order
    pub examples: Vec<String>,
    /// Matches not included in `examples`
    pub remaining: usize,
}

impl AmbiguousMatch {
    pub fn total(&self) -> usize {
        self.examples.len() + self.remaining
    }
}

impl fmt::Display for AmbiguousMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ambiguous prefix '{}' matches {} conversations: {}",
            self.prefix,
            self.total(),
            self.examples.join(", ")
        )?;
        if self.remaining > 0 {
            write!(f, " (and {} more)", self.remaining)?;
        }
        write!(f, "; type more characters to disambiguate")
    }
}

/// Failures of the virtual filesystem: resolution, listing and prefix lookup.
#[derive(Debug, Error)]
pub enum VfsError {
    #[error(transparent)]
    Resolution(#[from] PathError),
    #[error("{0}: no such file or directory")]
    NotFound(String),
    #[error("{0}: not a directory")]
    NotADirectory(String),
    #[error("prefix '{prefix}' is too short (need at least {min} characters)")]
    PrefixTooShort { prefix: String, min: usize },
    #[error("{0}")]
    Ambiguous(AmbiguousMatch),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Shell line could not be split into commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),
    #[error("empty command at pipeline stage {0}")]
    EmptyStage(usize),
}

/// Rejected mode transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModeError {
    #[error("already in chat mode")]
    AlreadyInChat,
    #[error("not in chat mode")]
    NotInChat,
}

/// A command handler's own failure. Rendered on stderr with a non-zero exit code.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Vfs(#[from] VfsError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Mode(#[from] ModeError),
    #[error("{0:#}")]
    Other(#[from] anyhow::Error),
}

impl CommandError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Usage mistakes exit 2 like most POSIX tools, everything else exits 1
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            _ => 1,
        }
    }
}

impl From<PathError> for CommandError {
    fn from(err: PathError) -> Self {
        Self::Vfs(VfsError::Resolution(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_display_lists_examples_and_remaining() {
        let err = VfsError::Ambiguous(AmbiguousMatch {
            prefix: "abc".to_string(),
            examples: vec!["abc1".to_string(), "abc2".to_string()],
            remaining: 3,
        });
        let message = err.to_string();
        assert!(message.contains("matches 5 conversations"));
        assert!(message.contains("abc1, abc2"));
        assert!(message.contains("(and 3 more)"));
    }

    #[test]
    fn test_ambiguous_display_without_remaining() {
        let matched = AmbiguousMatch {
            prefix: "abc".to_string(),
            examples: vec!["abc1".to_string(), "abc2".to_string()],
            remaining: 0,
        };
        assert!(!matched.to_string().contains("more"));
    }

    #[test]
    fn test_command_error_exit_codes() {
        assert_eq!(CommandError::usage("bad").exit_code(), 2);
        assert_eq!(CommandError::failed("nope").exit_code(), 1);
        let path_err: CommandError = PathError::UnknownRoot("x".to_string()).into();
        assert_eq!(path_err.exit_code(), 1);
        assert!(path_err.to_string().contains("unknown top-level directory"));
    }
}
