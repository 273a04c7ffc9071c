//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use chatfs::clipboard::MemoryClipboard;
use chatfs::config::Config;
use chatfs::models::{Message, Role, StatusFlag};
use chatfs::shell::{ShellContext, ShellSession};
use chatfs::store::{FileStore, MemoryStore, RecordStore};
use chatfs::tree::ConversationTree;
use chatfs::vfs::Navigator;

/// Fixed starting point for fixture timestamps
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

/// Builder for one conversation. Each added message is one minute after the previous one.
pub struct ConversationBuilder {
    tree: ConversationTree,
    next_at: DateTime<Utc>,
    last: Option<String>,
}

impl ConversationBuilder {
    pub fn new(id: &str, title: &str) -> Self {
        Self::created(id, title, base_time())
    }

    pub fn created(id: &str, title: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            tree: ConversationTree::new(id, title, created_at),
            next_at: created_at,
            last: None,
        }
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tree.tags.insert(tag.to_string());
        self
    }

    pub fn flag(mut self, flag: StatusFlag) -> Self {
        let at = self.tree.metadata.created_at;
        self.tree.metadata.set_flag(flag, true, at);
        self
    }

    pub fn source(mut self, source: &str) -> Self {
        self.tree.metadata.source = Some(source.to_string());
        self
    }

    pub fn model(mut self, model: &str) -> Self {
        self.tree.metadata.model = Some(model.to_string());
        self
    }

    /// Add a message with an explicit id under `parent` (`None` = new root)
    pub fn message(mut self, id: &str, parent: Option<&str>, role: Role, content: &str) -> Self {
        let mut message = Message::new(role, content, self.next_at).with_id(id);
        message.parent_id = parent.map(str::to_string);
        self.tree.add_message(message).expect("valid fixture message");
        self.next_at += Duration::minutes(1);
        self.last = Some(id.to_string());
        self
    }

    /// Add messages one below the other, starting under the last added message
    pub fn thread(mut self, messages: &[(&str, Role, &str)]) -> Self {
        for (id, role, content) in messages {
            let parent = self.last.clone();
            self = self.message(id, parent.as_deref(), *role, content);
        }
        self
    }

    /// Push the last-activity time without adding messages (a bulk metadata update)
    pub fn touched(mut self, at: DateTime<Utc>) -> Self {
        self.tree.touch(at);
        self
    }

    pub fn build(self) -> ConversationTree {
        self.tree
    }
}

/// Builder for a store full of conversations
#[derive(Default)]
pub struct StoreBuilder {
    conversations: Vec<ConversationTree>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, conversation: ConversationBuilder) -> Self {
        self.conversations.push(conversation.build());
        self
    }

    pub fn memory(self) -> MemoryStore {
        MemoryStore::from_conversations(self.conversations)
    }

    pub fn navigator(self) -> Navigator {
        Navigator::new(Box::new(self.memory()))
    }

    /// Session over an in-memory store, with a clipboard that never touches the system
    pub fn session(self) -> ShellSession {
        let ctx = ShellContext::new(self.navigator(), Config::default())
            .with_clipboard(Box::new(MemoryClipboard::new()));
        ShellSession::new(ctx)
    }

    /// Write every conversation into a file store at `dir`
    pub fn file_store(self, dir: &Path) -> FileStore {
        let mut store = FileStore::open(dir).expect("open file store");
        for conversation in self.conversations {
            store.save_conversation(conversation).expect("save fixture conversation");
        }
        store
    }
}

/// Two conversations sharing an id prefix, one of them forked:
///
/// ```text
/// abc123: u1 -> a1 -> {u2 -> a2, u3 -> a3}
/// abc999: u1 -> a1
/// ```
pub fn sample_store() -> StoreBuilder {
    StoreBuilder::new()
        .with(
            ConversationBuilder::new("abc123", "Rust lifetimes")
                .tag("rust")
                .flag(StatusFlag::Starred)
                .source("claude-code")
                .model("claude-sonnet-4")
                .thread(&[
                    ("u1", Role::User, "What is a lifetime?"),
                    ("a1", Role::Assistant, "A region of code where a borrow is valid."),
                    ("u2", Role::User, "Show an example"),
                    ("a2", Role::Assistant, "fn longest<'a>(x: &'a str, y: &'a str) -> &'a str"),
                ])
                .message("u3", Some("a1"), Role::User, "Explain it shorter")
                .message("a3", Some("u3"), Role::Assistant, "Borrows must not outlive data."),
        )
        .with(
            ConversationBuilder::created("abc999", "Python packaging", base_time() - Duration::days(40))
                .tag("python")
                .thread(&[
                    ("p1", Role::User, "How do I publish a wheel?"),
                    ("p2", Role::Assistant, "Use build and twine."),
                ]),
        )
}

/// One Claude Code transcript line
pub fn transcript_line(
    session: &str,
    entry_type: &str,
    uuid: &str,
    parent: Option<&str>,
    timestamp_ms: i64,
    text: &str,
) -> String {
    let parent = parent.map(|p| format!(r#""{}""#, p)).unwrap_or_else(|| "null".to_string());
    let model = if entry_type == "assistant" { r#","model":"claude-sonnet-4""# } else { "" };
    format!(
        r#"{{"type":"{entry_type}","message":{{"role":"{entry_type}","content":[{{"type":"text","text":"{text}"}}]{model}}},"timestamp":{timestamp_ms},"sessionId":"{session}","uuid":"{uuid}","parentUuid":{parent}}}"#
    )
}

/// Write a transcript file (creating parent directories)
pub fn write_transcript(dir: &Path, relative: &str, lines: &[String]) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().expect("transcript has a parent")).expect("create dirs");
    fs::write(path, lines.join("\n")).expect("write transcript");
}
