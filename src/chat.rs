//! Completion backends used by chat mode.

use anyhow::Result;

use crate::tree::ConversationTree;

/// Produces the assistant's answer to a prompt.
///
/// `leaf_id` is the user message just appended for `prompt`; the conversation up to it is the
/// context. `Ok(None)` means no reply is available and nothing is appended.
pub trait ChatBackend {
    fn reply(
        &mut self,
        conversation: &ConversationTree,
        leaf_id: &str,
        prompt: &str,
    ) -> Result<Option<String>>;
}

/// Records prompts without answering them
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBackend;

impl ChatBackend for OfflineBackend {
    fn reply(
        &mut self,
        _conversation: &ConversationTree,
        _leaf_id: &str,
        _prompt: &str,
    ) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Replies with canned text; tests use it to exercise the assistant side of chat mode
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    replies: Vec<String>,
    prompts: Vec<String>,
}

impl ScriptedBackend {
    pub fn new(replies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut replies: Vec<String> = replies.into_iter().map(Into::into).collect();
        replies.reverse();
        Self { replies, prompts: Vec::new() }
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl ChatBackend for ScriptedBackend {
    fn reply(
        &mut self,
        _conversation: &ConversationTree,
        _leaf_id: &str,
        prompt: &str,
    ) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.replies.pop())
    }
}
