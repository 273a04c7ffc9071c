use tracing::debug;

use super::dispatcher::{CancellationToken, CommandResult, HelpEntry};
use super::mode::{Mode, ModeMachine};
use super::variables::{self, Variables};
use crate::analytics::{AnalyticsSource, NoAnalytics};
use crate::chat::{ChatBackend, OfflineBackend};
use crate::clipboard::{ClipboardProvider, SystemClipboard};
use crate::config::Config;
use crate::error::{CommandError, VfsError};
use crate::models::{Message, Role};
use crate::tree::ConversationTree;
use crate::utils::preview_line;
use crate::vfs::{Navigator, VfsPath, resolve_prefix};

const CHAT_TITLE_WIDTH: usize = 60;

/// Action waiting for `confirm` on the next line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Delete { conversation_id: String, title: String },
}

/// Everything a command handler may touch during one session
pub struct ShellContext {
    pub navigator: Navigator,
    pub cwd: VfsPath,
    pub modes: ModeMachine,
    pub config: Config,
    pub cancel: CancellationToken,
    /// Set by `rm`; becomes confirmable on the next line only
    pub pending_action: Option<PendingAction>,
    /// What `confirm` may execute on the current line
    pub awaiting_confirmation: Option<PendingAction>,
    pub chat_backend: Box<dyn ChatBackend>,
    pub analytics: Box<dyn AnalyticsSource>,
    pub clipboard: Box<dyn ClipboardProvider>,
    /// Registered commands, for `help`
    pub catalog: Vec<HelpEntry>,
}

impl ShellContext {
    pub fn new(navigator: Navigator, config: Config) -> Self {
        Self {
            navigator,
            cwd: VfsPath::root(),
            modes: ModeMachine::new(),
            config,
            cancel: CancellationToken::new(),
            pending_action: None,
            awaiting_confirmation: None,
            chat_backend: Box::new(OfflineBackend),
            analytics: Box::new(NoAnalytics),
            clipboard: Box::new(SystemClipboard::new()),
            catalog: Vec::new(),
        }
    }

    pub fn with_chat_backend(mut self, backend: Box<dyn ChatBackend>) -> Self {
        self.chat_backend = backend;
        self
    }

    pub fn with_analytics(mut self, analytics: Box<dyn AnalyticsSource>) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn with_clipboard(mut self, clipboard: Box<dyn ClipboardProvider>) -> Self {
        self.clipboard = clipboard;
        self
    }

    /// Resolve a command argument to an existing path.
    ///
    /// A bare name that is not a listing entry of the working directory is retried as a
    /// conversation id prefix, so `cd 3f9a` works where `3f9a` is unambiguous. Only
    /// directories listing conversations take prefixes; elsewhere a miss stays `NotFound`.
    pub fn resolve_target(&mut self, arg: &str) -> Result<VfsPath, VfsError> {
        match self.navigator.resolve(arg, &self.cwd) {
            Err(VfsError::NotFound(_))
                if is_bare_name(arg) && self.cwd.lists_conversations() =>
            {
                let cwd = self.cwd.clone();
                let id = resolve_prefix(&mut self.navigator, arg, &cwd)?;
                debug!(prefix = arg, id = %id, "resolved id prefix");
                let path = cwd.join_name(&id)?;
                self.navigator.validate(path)
            }
            other => other,
        }
    }

    /// [`Self::resolve_target`] for an optional argument, defaulting to the working directory
    pub fn resolve_or_cwd(&mut self, arg: Option<&str>) -> Result<VfsPath, VfsError> {
        match arg {
            Some(arg) => self.resolve_target(arg),
            None => Ok(self.cwd.clone()),
        }
    }

    /// Resolve a target that must be a conversation (or a message inside one); returns the
    /// path and the conversation id
    pub fn resolve_conversation(
        &mut self,
        arg: Option<&str>,
    ) -> Result<(VfsPath, String), CommandError> {
        let path = self.resolve_or_cwd(arg)?;
        match path.conversation_id() {
            Some(id) => {
                let id = id.to_string();
                Ok((path, id))
            }
            None => Err(CommandError::usage(format!("{}: not a conversation", path))),
        }
    }

    /// Conversation the session is working in: the chat target in chat mode, else the one the
    /// working directory is inside
    pub fn current_conversation_id(&self) -> Option<String> {
        if let Some(chat) = self.modes.chat()
            && let Some(id) = &chat.conversation_id
        {
            return Some(id.clone());
        }
        self.cwd.conversation_id().map(str::to_string)
    }

    /// Snapshot of the shell variables
    pub fn variables(&self) -> Variables {
        let cwd = self.cwd.to_string();
        let mut vars = Variables::new()
            .with(variables::PWD, cwd.clone())
            .with(variables::CWD, cwd)
            .with(variables::MODEL, self.config.model.clone())
            .with(variables::PROVIDER, self.config.provider.clone())
            .with(variables::MODE, self.modes.mode().as_str());

        if let Some(id) = self.current_conversation_id() {
            if let Ok(tree) = self.navigator.store().get_conversation(&id) {
                vars.set(variables::MSG_COUNT, tree.message_count().to_string());
                if let Some(model) = &tree.metadata.model {
                    vars.set(variables::MODEL, model.clone());
                }
                if let Some(node) = self.current_message_id(&tree)
                    && let Ok(positions) = tree.message_path_of(&node)
                {
                    vars.set(variables::MSG_PATH, format_message_path(&positions));
                }
            }
            vars.set(variables::CONV, id);
        }
        vars
    }

    /// Message the session points at: the chat leaf, or the node the working directory names
    fn current_message_id(&self, tree: &ConversationTree) -> Option<String> {
        if let Some(chat) = self.modes.chat() {
            return chat.leaf_id.clone();
        }
        if self.cwd.message_path().is_empty() {
            return None;
        }
        tree.path_from_root(self.cwd.message_path()).ok().map(|m| m.id.clone())
    }

    /// Send one chat line: record the prompt, ask the backend, record the reply.
    ///
    /// The prompt is saved before the backend is called, so it survives a backend failure or a
    /// cancellation.
    pub fn send_chat(&mut self, text: &str) -> Result<CommandResult, CommandError> {
        let Some(chat) = self.modes.chat().cloned() else {
            return Err(CommandError::failed("not in chat mode"));
        };

        let conversation_id = match chat.conversation_id {
            Some(id) => id,
            None => {
                let title = preview_line(text, CHAT_TITLE_WIDTH);
                let id = self.navigator.store_mut().create_conversation(&title)?;
                if let Some(chat) = self.modes.chat_mut() {
                    chat.conversation_id = Some(id.clone());
                }
                id
            }
        };

        let mut tree = self.navigator.store().get_conversation(&conversation_id)?;
        let now = self.navigator.cache().clock().utc();
        let prompt_id = tree.append(chat.leaf_id.as_deref(), Role::User, text, now)?;
        self.navigator.store_mut().save_conversation(tree.clone())?;
        self.set_chat_leaf(&prompt_id);

        let reply = self.chat_backend.reply(&tree, &prompt_id, text);
        if self.cancel.is_cancelled() {
            return Ok(CommandResult::cancelled());
        }
        let reply = match reply {
            Ok(Some(reply)) => reply,
            Ok(None) => {
                return Ok(CommandResult::ok()
                    .with_stderr("(no chat backend configured; message saved without a reply)"));
            }
            Err(e) => {
                return Err(CommandError::failed(format!("chat backend failed: {:#}", e)));
            }
        };

        let now = self.navigator.cache().clock().utc();
        let answer = Message::new(Role::Assistant, reply.clone(), now)
            .with_parent(prompt_id)
            .with_model(self.config.model.clone());
        let answer_id = answer.id.clone();
        tree.add_message(answer)?;
        self.navigator.store_mut().save_conversation(tree)?;
        self.set_chat_leaf(&answer_id);

        Ok(CommandResult::success(ensure_newline(reply)))
    }

    fn set_chat_leaf(&mut self, id: &str) {
        if let Some(chat) = self.modes.chat_mut() {
            chat.leaf_id = Some(id.to_string());
        }
    }

    /// Leave chat mode after an interrupt; no-op in shell mode
    pub fn abort_chat(&mut self) -> Option<CommandResult> {
        if self.modes.mode() != Mode::Chat {
            return None;
        }
        let path = self.modes.exit_chat().ok()?;
        self.cwd = path;
        Some(CommandResult {
            stderr: "chat cancelled; back in shell mode".to_string(),
            ..CommandResult::cancelled()
        })
    }
}

/// `m1/m2/m1` form of a message position
pub fn format_message_path(positions: &[usize]) -> String {
    positions.iter().map(|i| format!("m{}", i)).collect::<Vec<_>>().join("/")
}

pub(crate) fn ensure_newline(mut text: String) -> String {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

fn is_bare_name(arg: &str) -> bool {
    !arg.is_empty() && !arg.contains('/') && arg != "." && arg != ".." && arg != "~"
}
