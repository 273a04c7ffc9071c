//! chatfs - browse AI conversation history as a virtual filesystem
//!
//! Conversations are branching message trees. This library exposes them through a read-mostly
//! virtual filesystem (`/chats`, `/tags/<tag>`, `/starred`, `/recent/today`, ...) and a small
//! shell with pipelines and a chat mode on top of it:
//!
//! - [`vfs`]: path normalization, per-view directory listings, TTL listing cache, id prefixes
//! - [`tree`]: the conversation tree (forks, root-to-leaf paths, longest path)
//! - [`shell`]: parser, command dispatch, built-in commands, Shell/Chat modes
//! - [`store`]: the record store trait with in-memory and file-backed implementations
//! - [`import`]: Claude Code session transcripts into conversation records
//!
//! # Example
//!
//! ```no_run
//! use chatfs::config::Config;
//! use chatfs::shell::{ShellContext, ShellSession};
//! use chatfs::store::FileStore;
//! use chatfs::vfs::Navigator;
//!
//! let config = Config::load()?;
//! let store = FileStore::open(config.store_dir())?;
//! let ctx = ShellContext::new(Navigator::new(Box::new(store)), config);
//! let mut session = ShellSession::new(ctx);
//!
//! let response = session.submit_line("ls -l /starred | head -n 5");
//! print!("{}", response.stdout);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod analytics;
pub mod chat;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod filters;
pub mod import;
pub mod models;
pub mod parsers;
pub mod shell;
pub mod store;
pub mod tree;
pub mod utils;
pub mod vfs;

// Re-export commonly used types
pub use error::{CommandError, PathError, StoreError, TreeError, VfsError};
pub use shell::{LineResponse, ShellSession};
pub use store::{FileStore, MemoryStore, RecordStore};
pub use tree::ConversationTree;
pub use vfs::{Navigator, VfsPath, normalize};
