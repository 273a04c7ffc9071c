//! Filters over piped text. Everything here reads the previous stage's stdout.

use super::{Args, lines_output, require_stdin};
use crate::error::CommandError;
use crate::shell::context::ShellContext;
use crate::shell::dispatcher::{CommandHandler, CommandResult, EXIT_FAILURE};

const DEFAULT_LINES: usize = 10;

pub struct Echo;

impl CommandHandler for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn summary(&self) -> &'static str {
        "Print the arguments"
    }

    fn usage(&self) -> &'static str {
        "echo [text...]"
    }

    fn execute(
        &self,
        args: &[String],
        _stdin: Option<&str>,
        _ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        Ok(CommandResult::success(format!("{}\n", args.join(" "))))
    }
}

/// `-n N`, `-nN` or nothing
fn line_count(command: &str, args: &[String]) -> Result<usize, CommandError> {
    let value = match args {
        [] => return Ok(DEFAULT_LINES),
        [flag, value] if flag == "-n" => value.as_str(),
        [flag] if flag.starts_with("-n") && flag.len() > 2 => &flag[2..],
        _ => return Err(CommandError::usage(format!("usage: {} [-n N]", command))),
    };
    value
        .parse::<usize>()
        .map_err(|_| CommandError::usage(format!("{}: invalid line count '{}'", command, value)))
}

pub struct Head;

impl CommandHandler for Head {
    fn name(&self) -> &'static str {
        "head"
    }

    fn summary(&self) -> &'static str {
        "First lines of the input (default 10)"
    }

    fn usage(&self) -> &'static str {
        "head [-n N]"
    }

    fn execute(
        &self,
        args: &[String],
        stdin: Option<&str>,
        _ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let count = line_count("head", args)?;
        let input = require_stdin("head", stdin)?;
        Ok(CommandResult::success(lines_output(input.lines().take(count))))
    }
}

pub struct Tail;

impl CommandHandler for Tail {
    fn name(&self) -> &'static str {
        "tail"
    }

    fn summary(&self) -> &'static str {
        "Last lines of the input (default 10)"
    }

    fn usage(&self) -> &'static str {
        "tail [-n N]"
    }

    fn execute(
        &self,
        args: &[String],
        stdin: Option<&str>,
        _ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let count = line_count("tail", args)?;
        let input = require_stdin("tail", stdin)?;
        let lines: Vec<&str> = input.lines().collect();
        let skip = lines.len().saturating_sub(count);
        Ok(CommandResult::success(lines_output(&lines[skip..])))
    }
}

pub struct Grep;

impl CommandHandler for Grep {
    fn name(&self) -> &'static str {
        "grep"
    }

    fn summary(&self) -> &'static str {
        "Input lines containing a pattern (-i: ignore case, -v: invert); exits 1 on no match"
    }

    fn usage(&self) -> &'static str {
        "grep [-i] [-v] pattern"
    }

    fn execute(
        &self,
        args: &[String],
        stdin: Option<&str>,
        _ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let args = Args::parse("grep", args, "iv")?;
        let pattern = args.single("grep", "pattern")?;
        let input = require_stdin("grep", stdin)?;

        let ignore_case = args.has('i');
        let needle = if ignore_case { pattern.to_lowercase() } else { pattern.to_string() };
        let matched: Vec<&str> = input
            .lines()
            .filter(|line| {
                let found = if ignore_case {
                    line.to_lowercase().contains(&needle)
                } else {
                    line.contains(&needle)
                };
                found != args.has('v')
            })
            .collect();

        if matched.is_empty() {
            return Ok(CommandResult::failure(EXIT_FAILURE, ""));
        }
        Ok(CommandResult::success(lines_output(matched)))
    }
}

pub struct Wc;

impl CommandHandler for Wc {
    fn name(&self) -> &'static str {
        "wc"
    }

    fn summary(&self) -> &'static str {
        "Count lines, words and characters of the input (-l: lines only)"
    }

    fn usage(&self) -> &'static str {
        "wc [-l]"
    }

    fn execute(
        &self,
        args: &[String],
        stdin: Option<&str>,
        _ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let args = Args::parse("wc", args, "l")?;
        if !args.positional.is_empty() {
            return Err(CommandError::usage("wc: reads piped input only"));
        }
        let input = require_stdin("wc", stdin)?;

        let lines = input.lines().count();
        if args.has('l') {
            return Ok(CommandResult::success(format!("{}\n", lines)));
        }
        let words = input.split_whitespace().count();
        let chars = input.chars().count();
        Ok(CommandResult::success(format!("{} {} {}\n", lines, words, chars)))
    }
}
