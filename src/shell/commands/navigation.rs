use super::{Args, format_timestamp, lines_output};
use crate::error::{CommandError, VfsError};
use crate::models::{DirectoryEntry, Message};
use crate::shell::context::{ShellContext, format_message_path};
use crate::shell::dispatcher::{CommandHandler, CommandResult};
use crate::tree::ConversationTree;
use crate::utils::{preview_line, strip_ansi_codes};
use crate::vfs::VfsPath;

pub struct Ls;

impl CommandHandler for Ls {
    fn name(&self) -> &'static str {
        "ls"
    }

    fn summary(&self) -> &'static str {
        "List a directory (-l: flags, created and modified times, descriptions)"
    }

    fn usage(&self) -> &'static str {
        "ls [-l] [path]"
    }

    fn execute(
        &self,
        args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let args = Args::parse("ls", args, "l")?;
        let target = ctx.resolve_or_cwd(args.optional("ls")?)?;

        if !target.is_directory() {
            let name = target.segments().last().cloned().unwrap_or_default();
            return Ok(CommandResult::success(format!("{}\n", name)));
        }

        let entries = ctx.navigator.list_directory(&target)?;
        if args.has('l') {
            Ok(CommandResult::success(long_listing(&entries)))
        } else {
            Ok(CommandResult::success(lines_output(entries.iter().map(|e| e.display_name()))))
        }
    }
}

fn long_listing(entries: &[DirectoryEntry]) -> String {
    let name_width = entries.iter().map(|e| e.display_name().chars().count()).max().unwrap_or(4);
    let mut lines = vec![format!(
        "{:<5} {:<16} {:<16} {:<name_width$}  {}",
        "Flags", "Created", "Modified", "Name", "Description"
    )];
    for entry in entries {
        let description = match (entry.role, &entry.content_preview) {
            (Some(role), Some(preview)) => format!("[{}] {}", role, preview),
            (_, Some(preview)) => preview.clone(),
            _ => String::new(),
        };
        lines.push(format!(
            "{:<5} {:<16} {:<16} {:<name_width$}  {}",
            entry.tag_flags.markers(),
            format_timestamp(entry.created_at),
            format_timestamp(entry.updated_at),
            entry.display_name(),
            description
        ));
    }
    lines_output(lines)
}

pub struct Cd;

impl CommandHandler for Cd {
    fn name(&self) -> &'static str {
        "cd"
    }

    fn summary(&self) -> &'static str {
        "Change the working directory (no argument: /)"
    }

    fn usage(&self) -> &'static str {
        "cd [path]"
    }

    fn execute(
        &self,
        args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let args = Args::parse("cd", args, "")?;
        let target = match args.optional("cd")? {
            Some(arg) => ctx.resolve_target(arg)?,
            None => VfsPath::root(),
        };
        if !target.is_directory() {
            return Err(VfsError::NotADirectory(target.to_string()).into());
        }
        ctx.cwd = target;
        Ok(CommandResult::ok())
    }
}

pub struct Pwd;

impl CommandHandler for Pwd {
    fn name(&self) -> &'static str {
        "pwd"
    }

    fn summary(&self) -> &'static str {
        "Print the working directory"
    }

    fn usage(&self) -> &'static str {
        "pwd"
    }

    fn execute(
        &self,
        _args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        Ok(CommandResult::success(format!("{}\n", ctx.cwd)))
    }
}

pub struct Cat;

impl CommandHandler for Cat {
    fn name(&self) -> &'static str {
        "cat"
    }

    fn summary(&self) -> &'static str {
        "Print a message, or the longest thread of a conversation"
    }

    fn usage(&self) -> &'static str {
        "cat [path]"
    }

    fn execute(
        &self,
        args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let args = Args::parse("cat", args, "")?;
        let (path, _) = ctx.resolve_conversation(args.optional("cat")?)?;
        let tree = ctx.navigator.conversation(&path)?;

        let messages: Vec<&Message> = if path.message_path().is_empty() {
            tree.longest_path()
        } else {
            vec![tree.path_from_root(path.message_path())?]
        };

        let blocks: Vec<String> = messages.into_iter().map(render_message).collect();
        Ok(CommandResult::success(blocks.join("\n")))
    }
}

fn render_message(message: &Message) -> String {
    let mut block = format!(
        "[{}] {}\n",
        message.role,
        message.timestamp.format("%Y-%m-%d %H:%M:%S")
    );
    block.push_str(&strip_ansi_codes(&message.content));
    if !block.ends_with('\n') {
        block.push('\n');
    }
    block
}

pub struct Tree;

impl CommandHandler for Tree {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn summary(&self) -> &'static str {
        "Draw the message tree of a conversation or below a message"
    }

    fn usage(&self) -> &'static str {
        "tree [path]"
    }

    fn execute(
        &self,
        args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let args = Args::parse("tree", args, "")?;
        let (path, _) = ctx.resolve_conversation(args.optional("tree")?)?;
        let tree = ctx.navigator.conversation(&path)?;
        let width = ctx.navigator.preview_width();

        let (header, start) = if path.message_path().is_empty() {
            (format!("{} ({})", tree.title, tree.id), None)
        } else {
            let node = tree.path_from_root(path.message_path())?;
            (node_label(&path.to_string(), node, width), Some(node.id.as_str()))
        };
        Ok(CommandResult::success(draw_tree(&tree, start, header, width)))
    }
}

fn node_label(name: &str, message: &Message, width: usize) -> String {
    format!("{} [{}] {}", name, message.role, message.preview(width))
}

// (message id, 1-based position among siblings, line prefix, last sibling)
type Pending<'t> = (&'t str, usize, String, bool);

fn push_children<'t>(stack: &mut Vec<Pending<'t>>, ids: &'t [String], prefix: &str) {
    for (i, id) in ids.iter().enumerate().rev() {
        stack.push((id.as_str(), i + 1, prefix.to_string(), i + 1 == ids.len()));
    }
}

/// Box-drawing rendering of the subtree below `start` (`None` = the whole forest)
fn draw_tree(tree: &ConversationTree, start: Option<&str>, header: String, width: usize) -> String {
    let mut lines = vec![header];
    let mut stack: Vec<Pending<'_>> = Vec::new();
    push_children(&mut stack, tree.child_ids(start), "");

    while let Some((id, position, prefix, last)) = stack.pop() {
        let Some(message) = tree.get(id) else { continue };
        let branch = if last { "└── " } else { "├── " };
        let label = node_label(&format!("m{}", position), message, width);
        lines.push(format!("{}{}{}", prefix, branch, label));

        let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
        push_children(&mut stack, tree.child_ids(Some(id)), &child_prefix);
    }

    lines_output(lines)
}

pub struct Paths;

impl CommandHandler for Paths {
    fn name(&self) -> &'static str {
        "paths"
    }

    fn summary(&self) -> &'static str {
        "List every root-to-leaf path of a conversation (through a message, if given one)"
    }

    fn usage(&self) -> &'static str {
        "paths [path]"
    }

    fn execute(
        &self,
        args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let args = Args::parse("paths", args, "")?;
        let (path, _) = ctx.resolve_conversation(args.optional("paths")?)?;
        let tree = ctx.navigator.conversation(&path)?;
        let width = ctx.navigator.preview_width();
        let through = if path.message_path().is_empty() {
            None
        } else {
            Some(tree.path_from_root(path.message_path())?.id.clone())
        };
        let base = path.conversation_view().unwrap_or_else(|| path.clone());

        let mut lines = Vec::new();
        for messages in tree.all_paths() {
            if let Some(node) = &through
                && !messages.iter().any(|m| &m.id == node)
            {
                continue;
            }
            let Some(leaf) = messages.last() else { continue };
            let positions = tree.message_path_of(&leaf.id)?;
            lines.push(format!(
                "{}/{}  ({} messages) {}",
                base,
                format_message_path(&positions),
                messages.len(),
                preview_line(&leaf.content, width)
            ));
        }
        Ok(CommandResult::success(lines_output(lines)))
    }
}
