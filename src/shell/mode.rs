use std::fmt;

use crate::error::ModeError;
use crate::vfs::VfsPath;

/// Input mode of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Lines are commands
    #[default]
    Shell,
    /// Lines are chat messages unless they start with the command marker
    Chat,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Shell => "shell",
            Mode::Chat => "chat",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What chat mode is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatContext {
    /// Working directory when chat mode was entered; restored on exit
    pub return_path: VfsPath,
    /// Conversation receiving messages; `None` until the first message creates one
    pub conversation_id: Option<String>,
    /// Message the next prompt is appended under; `None` appends a new root
    pub leaf_id: Option<String>,
}

/// Shell/Chat state machine with one input history per mode
#[derive(Debug, Clone, Default)]
pub struct ModeMachine {
    mode: Mode,
    shell_history: Vec<String>,
    chat_history: Vec<String>,
    chat: Option<ChatContext>,
}

impl ModeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn chat(&self) -> Option<&ChatContext> {
        self.chat.as_ref()
    }

    pub fn chat_mut(&mut self) -> Option<&mut ChatContext> {
        self.chat.as_mut()
    }

    /// `Shell -> Chat`
    pub fn enter_chat(&mut self, context: ChatContext) -> Result<(), ModeError> {
        if self.mode == Mode::Chat {
            return Err(ModeError::AlreadyInChat);
        }
        self.mode = Mode::Chat;
        self.chat = Some(context);
        Ok(())
    }

    /// `Chat -> Shell`; returns the path to restore
    pub fn exit_chat(&mut self) -> Result<VfsPath, ModeError> {
        if self.mode != Mode::Chat {
            return Err(ModeError::NotInChat);
        }
        self.mode = Mode::Shell;
        let context = self.chat.take().ok_or(ModeError::NotInChat)?;
        Ok(context.return_path)
    }

    /// Append a line to the current mode's history. Blank lines are not recorded.
    pub fn record(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        let history = match self.mode {
            Mode::Shell => &mut self.shell_history,
            Mode::Chat => &mut self.chat_history,
        };
        history.push(line.to_string());
    }

    pub fn history(&self, mode: Mode) -> &[String] {
        match mode {
            Mode::Shell => &self.shell_history,
            Mode::Chat => &self.chat_history,
        }
    }
}
