//! Built-in commands.
//!
//! - [`navigation`]: `ls`, `cd`, `pwd`, `cat`, `tree`, `paths`
//! - [`text`]: `echo`, `head`, `tail`, `grep`, `wc`
//! - [`find`]: conversation queries
//! - [`manage`]: status flags, tags, `rm`/`confirm`, `cp`
//! - [`session`]: `chat`, `exit`, `help`, `history`, `env`, `analytics`, `copy`

pub mod find;
pub mod manage;
pub mod navigation;
pub mod session;
pub mod text;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::dispatcher::CommandRegistry;
use crate::error::CommandError;
use crate::models::StatusFlag;

/// Registry with every built-in command
pub fn default_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();

    registry.register(Box::new(navigation::Ls));
    registry.register(Box::new(navigation::Cd));
    registry.register(Box::new(navigation::Pwd));
    registry.register(Box::new(navigation::Cat));
    registry.register(Box::new(navigation::Tree));
    registry.register(Box::new(navigation::Paths));

    registry.register(Box::new(text::Echo));
    registry.register(Box::new(text::Head));
    registry.register(Box::new(text::Tail));
    registry.register(Box::new(text::Grep));
    registry.register(Box::new(text::Wc));

    registry.register(Box::new(find::Find));

    for flag in StatusFlag::ALL {
        registry.register(Box::new(manage::SetFlag::new(flag, true)));
        registry.register(Box::new(manage::SetFlag::new(flag, false)));
    }
    registry.register(Box::new(manage::Tag));
    registry.register(Box::new(manage::Untag));
    registry.register(Box::new(manage::Rm));
    registry.register(Box::new(manage::Confirm));
    registry.register(Box::new(manage::Cp));

    registry.register(Box::new(session::Chat));
    registry.register(Box::new(session::Exit));
    registry.register(Box::new(session::Help));
    registry.register(Box::new(session::History));
    registry.register(Box::new(session::Env));
    registry.register(Box::new(session::Analytics));
    registry.register(Box::new(session::Copy));

    registry
}

/// Short flags and positional arguments of one invocation
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Args<'a> {
    pub flags: BTreeSet<char>,
    pub positional: Vec<&'a str>,
}

impl<'a> Args<'a> {
    /// Split `-x`/`-xy` flags from positionals. Only flags in `allowed` are accepted; `--` ends
    /// flag parsing and a lone `-` is positional.
    pub fn parse(command: &str, args: &'a [String], allowed: &str) -> Result<Self, CommandError> {
        let mut parsed = Args::default();
        let mut flags_done = false;

        for arg in args {
            let arg = arg.as_str();
            if flags_done || arg == "-" || !arg.starts_with('-') {
                parsed.positional.push(arg);
                continue;
            }
            if arg == "--" {
                flags_done = true;
                continue;
            }
            for flag in arg.chars().skip(1) {
                if !allowed.contains(flag) {
                    return Err(CommandError::usage(format!("{}: unknown option -{}", command, flag)));
                }
                parsed.flags.insert(flag);
            }
        }

        Ok(parsed)
    }

    pub fn has(&self, flag: char) -> bool {
        self.flags.contains(&flag)
    }

    /// At most one positional argument
    pub fn optional(&self, command: &str) -> Result<Option<&'a str>, CommandError> {
        match self.positional.as_slice() {
            [] => Ok(None),
            [one] => Ok(Some(*one)),
            _ => Err(CommandError::usage(format!("{}: too many arguments", command))),
        }
    }

    /// Exactly one positional argument
    pub fn single(&self, command: &str, what: &str) -> Result<&'a str, CommandError> {
        self.optional(command)?
            .ok_or_else(|| CommandError::usage(format!("{}: missing {}", command, what)))
    }
}

/// Piped input, or a usage error for commands that only filter
pub(crate) fn require_stdin<'a>(
    command: &str,
    stdin: Option<&'a str>,
) -> Result<&'a str, CommandError> {
    stdin.ok_or_else(|| {
        CommandError::usage(format!("{0}: no input (use it after a pipe, e.g. `cat | {0}`)", command))
    })
}

pub(crate) fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M").to_string()).unwrap_or_else(|| "-".to_string())
}

/// Join lines with a trailing newline; empty input stays empty
pub(crate) fn lines_output<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut output = String::new();
    for line in lines {
        output.push_str(line.as_ref());
        output.push('\n');
    }
    output
}
