use serde_json::Value;

use super::{Args, lines_output};
use crate::clipboard::copy_with_provider;
use crate::error::{CommandError, ModeError};
use crate::shell::context::{ShellContext, ensure_newline};
use crate::shell::dispatcher::{CommandHandler, CommandResult, HelpEntry};
use crate::shell::mode::{ChatContext, Mode};

/// Enter chat mode, attached to a conversation (or to a new one)
pub struct Chat;

impl CommandHandler for Chat {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn summary(&self) -> &'static str {
        "Enter chat mode: continue a conversation or message, or start a new conversation"
    }

    fn usage(&self) -> &'static str {
        "chat [path]"
    }

    fn execute(
        &self,
        args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        if ctx.modes.mode() == Mode::Chat {
            return Err(ModeError::AlreadyInChat.into());
        }
        let args = Args::parse("chat", args, "")?;
        let target = ctx.resolve_or_cwd(args.optional("chat")?)?;

        let (conversation_id, leaf_id) = match target.conversation_id() {
            None => (None, None),
            Some(id) => {
                let tree = ctx.navigator.conversation(&target)?;
                let leaf = if target.message_path().is_empty() {
                    tree.longest_path().last().map(|m| m.id.clone())
                } else {
                    Some(tree.path_from_root(target.message_path())?.id.clone())
                };
                (Some(id.to_string()), leaf)
            }
        };

        let banner = match &conversation_id {
            Some(id) => format!("chatting in {} (type /exit to leave)\n", id),
            None => "chatting in a new conversation (type /exit to leave)\n".to_string(),
        };
        ctx.modes.enter_chat(ChatContext {
            return_path: ctx.cwd.clone(),
            conversation_id,
            leaf_id,
        })?;
        Ok(CommandResult::success(banner))
    }
}

/// Leave chat mode and go back to where it was entered
pub struct Exit;

impl CommandHandler for Exit {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["quit"]
    }

    fn summary(&self) -> &'static str {
        "Leave chat mode"
    }

    fn usage(&self) -> &'static str {
        "exit"
    }

    fn execute(
        &self,
        _args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        ctx.cwd = ctx.modes.exit_chat()?;
        Ok(CommandResult::ok())
    }
}

pub struct Help;

impl CommandHandler for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn summary(&self) -> &'static str {
        "List commands, or describe one"
    }

    fn usage(&self) -> &'static str {
        "help [command]"
    }

    fn execute(
        &self,
        args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let args = Args::parse("help", args, "")?;
        match args.optional("help")? {
            None => Ok(CommandResult::success(overview(&ctx.catalog))),
            Some(name) => {
                let entry = ctx
                    .catalog
                    .iter()
                    .find(|e| {
                        e.name.eq_ignore_ascii_case(name)
                            || e.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
                    })
                    .ok_or_else(|| CommandError::failed(format!("help: no such command: {}", name)))?;
                Ok(CommandResult::success(describe(entry)))
            }
        }
    }
}

fn overview(catalog: &[HelpEntry]) -> String {
    let width = catalog.iter().map(|e| e.usage.len()).max().unwrap_or(0);
    let mut lines: Vec<String> =
        catalog.iter().map(|e| format!("  {:<width$}  {}", e.usage, e.summary)).collect();
    lines.push(String::new());
    lines.push("Pipe commands with `|`. In chat mode, prefix commands with `/`.".to_string());
    lines_output(lines)
}

fn describe(entry: &HelpEntry) -> String {
    let mut text = format!("usage: {}\n{}\n", entry.usage, entry.summary);
    if !entry.aliases.is_empty() {
        text.push_str(&format!("aliases: {}\n", entry.aliases.join(", ")));
    }
    text
}

/// Input history of the current mode
pub struct History;

impl CommandHandler for History {
    fn name(&self) -> &'static str {
        "history"
    }

    fn summary(&self) -> &'static str {
        "Show the input history of the current mode"
    }

    fn usage(&self) -> &'static str {
        "history"
    }

    fn execute(
        &self,
        _args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let history = ctx.modes.history(ctx.modes.mode());
        Ok(CommandResult::success(lines_output(
            history.iter().enumerate().map(|(i, line)| format!("{:>5}  {}", i + 1, line)),
        )))
    }
}

pub struct Env;

impl CommandHandler for Env {
    fn name(&self) -> &'static str {
        "env"
    }

    fn summary(&self) -> &'static str {
        "Show the shell variables"
    }

    fn usage(&self) -> &'static str {
        "env"
    }

    fn execute(
        &self,
        _args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let vars = ctx.variables();
        Ok(CommandResult::success(lines_output(
            vars.iter().map(|(name, value)| format!("{}={}", name, value)),
        )))
    }
}

/// Read-only view of the analytics records
pub struct Analytics;

impl CommandHandler for Analytics {
    fn name(&self) -> &'static str {
        "analytics"
    }

    fn summary(&self) -> &'static str {
        "Show the current embedding session and graph records"
    }

    fn usage(&self) -> &'static str {
        "analytics [session|graph]"
    }

    fn execute(
        &self,
        args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let args = Args::parse("analytics", args, "")?;
        let (session, graph) = match args.optional("analytics")? {
            None => (true, true),
            Some("session") => (true, false),
            Some("graph") => (false, true),
            Some(other) => {
                return Err(CommandError::usage(format!(
                    "analytics: unknown record '{}' (expected session or graph)",
                    other
                )));
            }
        };

        let mut sections = Vec::new();
        if session {
            sections.push(match ctx.analytics.current_embedding_session() {
                Some(record) => section("embedding session", &serde_json::to_value(record)),
                None => "embedding session: none recorded\n".to_string(),
            });
        }
        if graph {
            sections.push(match ctx.analytics.current_graph() {
                Some(record) => section("graph", &serde_json::to_value(record)),
                None => "graph: none recorded\n".to_string(),
            });
        }
        Ok(CommandResult::success(sections.join("\n")))
    }
}

fn section(title: &str, value: &serde_json::Result<Value>) -> String {
    let body = value
        .as_ref()
        .ok()
        .and_then(|v| serde_json::to_string_pretty(v).ok())
        .unwrap_or_else(|| "(unprintable record)".to_string());
    format!("{}:\n{}\n", title, body)
}

/// Copy piped input (or the arguments) to the clipboard
pub struct Copy;

impl CommandHandler for Copy {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn summary(&self) -> &'static str {
        "Copy piped input, or the arguments, to the clipboard"
    }

    fn usage(&self) -> &'static str {
        "copy [text...]"
    }

    fn execute(
        &self,
        args: &[String],
        stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let text = match stdin {
            Some(input) => input.to_string(),
            None if !args.is_empty() => ensure_newline(args.join(" ")),
            None => {
                return Err(CommandError::usage("copy: nothing to copy (pipe text or pass it)"));
            }
        };
        copy_with_provider(&text, ctx.clipboard.as_mut())?;
        Ok(CommandResult::success(format!(
            "copied {} characters to the clipboard\n",
            text.chars().count()
        )))
    }
}
