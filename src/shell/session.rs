//! One interactive session: the only entry point a host needs.
//!
//! The host feeds whole lines to [`ShellSession::submit_line`] and renders the returned
//! [`LineResponse`]. The session never reads input itself.

use tracing::debug;

use super::commands::default_registry;
use super::context::ShellContext;
use super::dispatcher::{self, CancellationToken, CommandRegistry, CommandResult, EXIT_UNKNOWN_COMMAND};
use super::mode::Mode;
use super::parser::{self, ParsedInput};
use crate::vfs::VfsPath;

/// Exit code for lines that fail to parse
pub const EXIT_PARSE_ERROR: i32 = 2;

/// What the host shows after a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub new_path: VfsPath,
    pub new_mode: Mode,
}

pub struct ShellSession {
    registry: CommandRegistry,
    ctx: ShellContext,
}

impl ShellSession {
    /// Session with every built-in command
    pub fn new(ctx: ShellContext) -> Self {
        Self::with_registry(ctx, default_registry())
    }

    pub fn with_registry(mut ctx: ShellContext, registry: CommandRegistry) -> Self {
        ctx.catalog = registry.catalog();
        Self { registry, ctx }
    }

    pub fn context(&self) -> &ShellContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut ShellContext {
        &mut self.ctx
    }

    /// Handle a signal handler can use to abort the running line
    pub fn cancellation_token(&self) -> CancellationToken {
        self.ctx.cancel.clone()
    }

    /// `chatfs:/chats/abc123$ ` in shell mode, `chatfs[chat]:/chats/abc123> ` in chat mode
    pub fn prompt(&self) -> String {
        match self.ctx.modes.mode() {
            Mode::Shell => format!("chatfs:{}$ ", self.ctx.cwd),
            Mode::Chat => format!("chatfs[chat]:{}> ", self.ctx.cwd),
        }
    }

    /// Run one input line to completion
    pub fn submit_line(&mut self, raw: &str) -> LineResponse {
        self.ctx.cancel.reset();
        // A deletion requested on the previous line may be confirmed on this one only
        self.ctx.awaiting_confirmation = self.ctx.pending_action.take();
        self.ctx.modes.record(raw);

        let mode = self.ctx.modes.mode();
        let result = match parser::parse(raw, &self.registry, &self.ctx.variables(), mode) {
            Err(e) => CommandResult::failure(EXIT_PARSE_ERROR, format!("parse error: {}", e)),
            Ok(ParsedInput::Pipeline(stages)) => {
                dispatcher::execute(&stages, &self.registry, &mut self.ctx)
            }
            Ok(ParsedInput::Chat(text)) => match mode {
                Mode::Chat => self.ctx.send_chat(&text).unwrap_or_else(CommandResult::from),
                Mode::Shell => CommandResult::failure(
                    EXIT_UNKNOWN_COMMAND,
                    format!(
                        "{}: unknown command (type `help` for commands, or `chat` to talk)",
                        first_word(&text)
                    ),
                ),
            },
        };

        self.ctx.awaiting_confirmation = None;
        let result = if self.ctx.cancel.is_cancelled() {
            self.ctx.abort_chat().unwrap_or(result)
        } else {
            result
        };

        debug!(exit_code = result.exit_code, mode = %self.ctx.modes.mode(), "line finished");
        self.respond(result)
    }

    /// Host-side interrupt between lines (Ctrl-C at the prompt): leaves chat mode and drops
    /// any pending confirmation
    pub fn interrupt(&mut self) -> LineResponse {
        self.ctx.pending_action = None;
        self.ctx.awaiting_confirmation = None;
        let result = self.ctx.abort_chat().unwrap_or_else(CommandResult::cancelled);
        self.respond(result)
    }

    fn respond(&self, result: CommandResult) -> LineResponse {
        LineResponse {
            stdout: result.stdout,
            stderr: result.stderr,
            exit_code: result.exit_code,
            new_path: self.ctx.cwd.clone(),
            new_mode: self.ctx.modes.mode(),
        }
    }
}

fn first_word(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::chat::ScriptedBackend;
    use crate::config::Config;
    use crate::models::Role;
    use crate::shell::dispatcher::EXIT_CANCELLED;
    use crate::store::MemoryStore;
    use crate::tree::ConversationTree;
    use crate::vfs::Navigator;

    fn session() -> ShellSession {
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut tree = ConversationTree::new("abc123", "Lifetimes", created);
        let first = tree.append(None, Role::User, "hello rust", created).unwrap();
        tree.append(Some(&first), Role::Assistant, "hi", created).unwrap();
        let navigator = Navigator::new(Box::new(MemoryStore::from_conversations([tree])));
        ShellSession::new(ShellContext::new(navigator, Config::default()))
    }

    #[test]
    fn test_prompt_shows_path_and_mode() {
        let mut session = session();
        assert_eq!(session.prompt(), "chatfs:/$ ");
        session.submit_line("cd /chats");
        session.submit_line("chat");
        assert_eq!(session.prompt(), "chatfs[chat]:/chats> ");
    }

    #[test]
    fn test_line_reports_new_path() {
        let mut session = session();
        let response = session.submit_line("cd /chats/abc");
        assert_eq!(response.exit_code, 0);
        assert_eq!(response.new_path.to_string(), "/chats/abc123");
        assert_eq!(response.new_mode, Mode::Shell);
    }

    #[test]
    fn test_parse_error_exit_code() {
        let mut session = session();
        let response = session.submit_line("echo 'oops");
        assert_eq!(response.exit_code, EXIT_PARSE_ERROR);
        assert!(response.stderr.starts_with("parse error: unterminated"));
    }

    #[test]
    fn test_free_text_in_shell_mode() {
        let mut session = session();
        let response = session.submit_line("what is a lifetime?");
        assert_eq!(response.exit_code, EXIT_UNKNOWN_COMMAND);
        assert!(response.stderr.contains("`chat`"));
    }

    #[test]
    fn test_rm_needs_confirm_on_next_line() {
        let mut session = session();
        session.submit_line("rm /chats/abc123");
        session.submit_line("pwd");
        let response = session.submit_line("confirm");
        assert_eq!(response.exit_code, 1);
        assert!(session.context().navigator.store().contains("abc123"));

        session.submit_line("rm /chats/abc123");
        let response = session.submit_line("confirm");
        assert_eq!(response.exit_code, 0);
        assert!(!session.context().navigator.store().contains("abc123"));
    }

    #[test]
    fn test_chat_round_trip() {
        let mut session = session();
        let ctx = session.context_mut();
        ctx.chat_backend = Box::new(ScriptedBackend::new(["Borrowed data needs a scope."]));

        session.submit_line("cd /chats/abc123");
        assert_eq!(session.submit_line("chat").new_mode, Mode::Chat);
        let response = session.submit_line("ls is not a command here");
        assert_eq!(response.stdout, "Borrowed data needs a scope.\n");

        let response = session.submit_line("/exit");
        assert_eq!(response.new_mode, Mode::Shell);
        assert_eq!(response.new_path.to_string(), "/chats/abc123");
        let tree = session.context().navigator.store().get_conversation("abc123").unwrap();
        assert_eq!(tree.message_count(), 4);
        assert_eq!(tree.depth(), 4);
    }

    #[test]
    fn test_interrupt_leaves_chat() {
        let mut session = session();
        session.submit_line("cd /starred");
        session.submit_line("chat /chats/abc123");
        let response = session.interrupt();
        assert_eq!(response.exit_code, EXIT_CANCELLED);
        assert_eq!(response.new_mode, Mode::Shell);
        assert_eq!(response.new_path.to_string(), "/starred");

        let response = session.interrupt();
        assert_eq!(response.exit_code, EXIT_CANCELLED);
        assert_eq!(response.stderr, "cancelled");
    }

    #[test]
    fn test_cancelled_token_resets_per_line() {
        let mut session = session();
        session.cancellation_token().cancel();
        assert_eq!(session.submit_line("pwd").stdout, "/\n");
    }
}
