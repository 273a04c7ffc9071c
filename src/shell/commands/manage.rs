//! Commands that change conversation records.
//!
//! Messages are append-only, so every target here is a whole conversation; a path inside a
//! conversation names the conversation it is in.

use tracing::info;

use super::Args;
use crate::error::CommandError;
use crate::models::StatusFlag;
use crate::shell::context::{PendingAction, ShellContext};
use crate::shell::dispatcher::{CommandHandler, CommandResult};
use crate::vfs::VfsPath;
use crate::vfs::path::{CHATS, normalize};

/// `star`/`unstar`, `pin`/`unpin`, `archive`/`unarchive`
pub struct SetFlag {
    flag: StatusFlag,
    value: bool,
}

impl SetFlag {
    pub fn new(flag: StatusFlag, value: bool) -> Self {
        Self { flag, value }
    }
}

impl CommandHandler for SetFlag {
    fn name(&self) -> &'static str {
        match (self.flag, self.value) {
            (StatusFlag::Starred, true) => "star",
            (StatusFlag::Starred, false) => "unstar",
            (StatusFlag::Pinned, true) => "pin",
            (StatusFlag::Pinned, false) => "unpin",
            (StatusFlag::Archived, true) => "archive",
            (StatusFlag::Archived, false) => "unarchive",
        }
    }

    fn summary(&self) -> &'static str {
        match (self.flag, self.value) {
            (StatusFlag::Starred, true) => "Star a conversation",
            (StatusFlag::Starred, false) => "Remove the star from a conversation",
            (StatusFlag::Pinned, true) => "Pin a conversation to the top of listings",
            (StatusFlag::Pinned, false) => "Unpin a conversation",
            (StatusFlag::Archived, true) => "Archive a conversation (hidden outside /archived)",
            (StatusFlag::Archived, false) => "Bring an archived conversation back",
        }
    }

    fn usage(&self) -> &'static str {
        match (self.flag, self.value) {
            (StatusFlag::Starred, true) => "star [path]",
            (StatusFlag::Starred, false) => "unstar [path]",
            (StatusFlag::Pinned, true) => "pin [path]",
            (StatusFlag::Pinned, false) => "unpin [path]",
            (StatusFlag::Archived, true) => "archive [path]",
            (StatusFlag::Archived, false) => "unarchive [path]",
        }
    }

    fn execute(
        &self,
        args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let command = self.name();
        let args = Args::parse(command, args, "")?;
        let (_, id) = ctx.resolve_conversation(args.optional(command)?)?;

        ctx.navigator.store_mut().set_status(&id, self.flag, self.value)?;
        let verb = if self.value { "set" } else { "cleared" };
        Ok(CommandResult::success(format!("{}: {} {}\n", id, verb, self.flag)))
    }
}

fn tag_arguments<'a>(
    command: &str,
    args: &'a [String],
) -> Result<(&'a str, Option<&'a str>), CommandError> {
    let args = Args::parse(command, args, "")?;
    let (tag, target) = match args.positional.as_slice() {
        [tag] => (*tag, None),
        [tag, target] => (*tag, Some(*target)),
        [] => return Err(CommandError::usage(format!("{}: missing tag", command))),
        _ => return Err(CommandError::usage(format!("{}: too many arguments", command))),
    };
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(CommandError::usage(format!("{}: tag must not be empty", command)));
    }
    Ok((tag, target))
}

pub struct Tag;

impl CommandHandler for Tag {
    fn name(&self) -> &'static str {
        "tag"
    }

    fn summary(&self) -> &'static str {
        "Add a tag to a conversation"
    }

    fn usage(&self) -> &'static str {
        "tag <tag> [path]"
    }

    fn execute(
        &self,
        args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let (tag, target) = tag_arguments("tag", args)?;
        let (_, id) = ctx.resolve_conversation(target)?;
        ctx.navigator.store_mut().add_tag(&id, tag)?;
        Ok(CommandResult::success(format!("{}: tagged {}\n", id, tag)))
    }
}

pub struct Untag;

impl CommandHandler for Untag {
    fn name(&self) -> &'static str {
        "untag"
    }

    fn summary(&self) -> &'static str {
        "Remove a tag from a conversation"
    }

    fn usage(&self) -> &'static str {
        "untag <tag> [path]"
    }

    fn execute(
        &self,
        args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let (tag, target) = tag_arguments("untag", args)?;
        let (_, id) = ctx.resolve_conversation(target)?;
        ctx.navigator.store_mut().remove_tag(&id, tag)?;
        Ok(CommandResult::success(format!("{}: untagged {}\n", id, tag)))
    }
}

/// First half of a deletion: remember the target and ask for `confirm`
pub struct Rm;

impl CommandHandler for Rm {
    fn name(&self) -> &'static str {
        "rm"
    }

    fn summary(&self) -> &'static str {
        "Delete a conversation (asks for `confirm` on the next line)"
    }

    fn usage(&self) -> &'static str {
        "rm <path>"
    }

    fn execute(
        &self,
        args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let args = Args::parse("rm", args, "")?;
        let (path, id) = ctx.resolve_conversation(Some(args.single("rm", "target")?))?;
        if !path.message_path().is_empty() {
            return Err(CommandError::usage(format!(
                "rm: {}: messages cannot be deleted, only whole conversations",
                path
            )));
        }

        let title = ctx.navigator.store().get_summary(&id)?.title;
        let prompt = format!(
            "delete conversation {} ({})? type `confirm` on the next line to proceed\n",
            id, title
        );
        ctx.pending_action = Some(PendingAction::Delete { conversation_id: id, title });
        Ok(CommandResult::success(prompt))
    }
}

/// Second half of a deletion
pub struct Confirm;

impl CommandHandler for Confirm {
    fn name(&self) -> &'static str {
        "confirm"
    }

    fn summary(&self) -> &'static str {
        "Carry out the deletion requested by `rm` on the previous line"
    }

    fn usage(&self) -> &'static str {
        "confirm"
    }

    fn execute(
        &self,
        args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        if !args.is_empty() {
            return Err(CommandError::usage("confirm: takes no arguments"));
        }
        let Some(action) = ctx.awaiting_confirmation.take() else {
            return Err(CommandError::failed("confirm: nothing to confirm"));
        };

        match action {
            PendingAction::Delete { conversation_id, title } => {
                ctx.navigator.store_mut().delete_conversation(&conversation_id)?;
                info!(conversation = %conversation_id, "deleted conversation");

                if ctx.cwd.conversation_id() == Some(conversation_id.as_str()) {
                    ctx.cwd = surviving_view(ctx, &ctx.cwd)?;
                }
                if let Some(chat) = ctx.modes.chat_mut()
                    && chat.conversation_id.as_deref() == Some(conversation_id.as_str())
                {
                    chat.conversation_id = None;
                    chat.leaf_id = None;
                }
                if let Some(chat) = ctx.modes.chat()
                    && chat.return_path.conversation_id() == Some(conversation_id.as_str())
                {
                    let return_path = surviving_view(ctx, &chat.return_path)?;
                    if let Some(chat) = ctx.modes.chat_mut() {
                        chat.return_path = return_path;
                    }
                }

                Ok(CommandResult::success(format!(
                    "deleted {} ({})\n",
                    conversation_id, title
                )))
            }
        }
    }
}

/// Directory a path inside a deleted conversation falls back to: the view it was listed in
/// while that view still has members, else `/chats`
fn surviving_view(ctx: &ShellContext, path: &VfsPath) -> Result<VfsPath, CommandError> {
    match ctx.navigator.validate(path.view()) {
        Ok(view) => Ok(view),
        Err(_) => Ok(normalize(CHATS, &VfsPath::root())?),
    }
}

pub struct Cp;

impl CommandHandler for Cp {
    fn name(&self) -> &'static str {
        "cp"
    }

    fn summary(&self) -> &'static str {
        "Duplicate a conversation under a new id"
    }

    fn usage(&self) -> &'static str {
        "cp <path>"
    }

    fn execute(
        &self,
        args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let args = Args::parse("cp", args, "")?;
        let (_, id) = ctx.resolve_conversation(Some(args.single("cp", "source")?))?;
        let copy = ctx.navigator.store_mut().duplicate_conversation(&id)?;
        info!(from = %id, to = %copy, "duplicated conversation");
        Ok(CommandResult::success(format!("/{}/{}\n", CHATS, copy)))
    }
}
