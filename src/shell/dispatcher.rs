//! Command registry and pipeline execution.
//!
//! Stages run one after another; the stdout of stage *i* is the stdin of stage *i + 1*. The
//! first stage that exits non-zero ends the pipeline and its result is the pipeline's result.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use super::context::ShellContext;
use super::parser::CommandInvocation;
use crate::error::CommandError;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_UNKNOWN_COMMAND: i32 = 127;
pub const EXIT_CANCELLED: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandStatus {
    #[default]
    Success,
    Failure,
    Cancelled,
}

/// Outcome of a command or a whole pipeline
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub status: CommandStatus,
    /// Zero-based index of the stage that stopped a pipeline
    pub failed_stage: Option<usize>,
}

impl CommandResult {
    /// Successful, no output
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn success(stdout: impl Into<String>) -> Self {
        Self { stdout: stdout.into(), ..Self::default() }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stderr: stderr.into(),
            status: CommandStatus::Failure,
            ..Self::default()
        }
    }

    pub fn cancelled() -> Self {
        Self {
            exit_code: EXIT_CANCELLED,
            stderr: "cancelled".to_string(),
            status: CommandStatus::Cancelled,
            ..Self::default()
        }
    }

    /// Append a line to stderr (warnings on an otherwise successful command)
    pub fn with_stderr(mut self, line: impl AsRef<str>) -> Self {
        push_line(&mut self.stderr, line.as_ref());
        self
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == EXIT_SUCCESS
    }
}

impl From<CommandError> for CommandResult {
    fn from(err: CommandError) -> Self {
        CommandResult::failure(err.exit_code(), err.to_string())
    }
}

/// A command the shell can run.
///
/// Handlers are registered once at startup. They get the arguments after variable expansion and
/// quote removal, the previous stage's stdout (`None` for the first stage), and the session.
pub trait CommandHandler {
    fn name(&self) -> &'static str;

    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// One-line description for `help`
    fn summary(&self) -> &'static str;

    /// Synopsis, e.g. `ls [-l] [path]`
    fn usage(&self) -> &'static str;

    fn execute(
        &self,
        args: &[String],
        stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError>;
}

/// Static description of a registered command, as shown by `help`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpEntry {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub summary: &'static str,
    pub usage: &'static str,
}

/// Name (and alias) to handler map, case-insensitive
#[derive(Default)]
pub struct CommandRegistry {
    handlers: Vec<Box<dyn CommandHandler>>,
    index: HashMap<String, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its name and aliases. A later registration replaces an earlier
    /// one for the same name.
    pub fn register(&mut self, handler: Box<dyn CommandHandler>) {
        let slot = self.handlers.len();
        self.index.insert(handler.name().to_lowercase(), slot);
        for alias in handler.aliases() {
            self.index.insert(alias.to_lowercase(), slot);
        }
        self.handlers.push(handler);
    }

    pub fn get(&self, name: &str) -> Option<&dyn CommandHandler> {
        self.index
            .get(&name.to_lowercase())
            .and_then(|&slot| self.handlers.get(slot))
            .map(|handler| handler.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_lowercase())
    }

    /// Every reachable command, sorted by name
    pub fn catalog(&self) -> Vec<HelpEntry> {
        let mut entries: Vec<HelpEntry> = self
            .handlers
            .iter()
            .enumerate()
            .filter(|(slot, handler)| self.index.get(&handler.name().to_lowercase()) == Some(slot))
            .map(|(_, handler)| HelpEntry {
                name: handler.name(),
                aliases: handler.aliases(),
                summary: handler.summary(),
                usage: handler.usage(),
            })
            .collect();
        entries.sort_by_key(|entry| entry.name);
        entries
    }
}

/// Shared abort flag. Cloning shares the flag, so a signal handler can hold one copy.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Run a pipeline.
///
/// Each stage's listing-cache writes are staged and only committed when the stage finishes
/// without being cancelled. An empty pipeline succeeds without doing anything.
pub fn execute(
    pipeline: &[CommandInvocation],
    registry: &CommandRegistry,
    ctx: &mut ShellContext,
) -> CommandResult {
    let mut stdin: Option<String> = None;
    let mut last = CommandResult::ok();
    let stages = pipeline.len();

    for (stage, invocation) in pipeline.iter().enumerate() {
        if ctx.cancel.is_cancelled() {
            return CommandResult::cancelled();
        }

        let Some(handler) = registry.get(&invocation.name) else {
            let result = CommandResult::failure(
                EXIT_UNKNOWN_COMMAND,
                format!("{}: unknown command", invocation.name),
            );
            return stopped_at(result, stage, stages, &invocation.name);
        };

        debug!(command = handler.name(), stage, args = ?invocation.args, "dispatching");
        ctx.navigator.begin_stage();
        let result = handler
            .execute(&invocation.args, stdin.as_deref(), ctx)
            .unwrap_or_else(CommandResult::from);

        if ctx.cancel.is_cancelled() {
            ctx.navigator.discard_stage();
            return CommandResult::cancelled();
        }
        ctx.navigator.commit_stage();

        if !result.is_success() {
            let result = CommandResult { status: CommandStatus::Failure, ..result };
            return stopped_at(result, stage, stages, &invocation.name);
        }

        stdin = Some(result.stdout.clone());
        last = result;
    }

    last
}

fn stopped_at(mut result: CommandResult, stage: usize, stages: usize, name: &str) -> CommandResult {
    result.failed_stage = Some(stage);
    if stages > 1 {
        push_line(
            &mut result.stderr,
            &format!("pipeline stopped at stage {} of {} ({})", stage + 1, stages, name),
        );
    }
    result
}

fn push_line(buffer: &mut String, line: &str) {
    if !buffer.is_empty() && !buffer.ends_with('\n') {
        buffer.push('\n');
    }
    buffer.push_str(line);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        aliases: &'static [&'static str],
        exit_code: i32,
    }

    impl CommandHandler for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn aliases(&self) -> &'static [&'static str] {
            self.aliases
        }

        fn summary(&self) -> &'static str {
            "test"
        }

        fn usage(&self) -> &'static str {
            self.name
        }

        fn execute(
            &self,
            _args: &[String],
            _stdin: Option<&str>,
            _ctx: &mut ShellContext,
        ) -> Result<CommandResult, CommandError> {
            Ok(CommandResult { exit_code: self.exit_code, ..CommandResult::ok() })
        }
    }

    #[test]
    fn test_registry_lookup_is_case_insensitive_and_aliased() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(Fixed { name: "quit", aliases: &["bye"], exit_code: 0 }));

        assert!(registry.contains("QUIT"));
        assert_eq!(registry.get("bye").map(|h| h.name()), Some("quit"));
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_catalog_skips_replaced_handlers() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(Fixed { name: "ls", aliases: &[], exit_code: 1 }));
        registry.register(Box::new(Fixed { name: "ls", aliases: &[], exit_code: 0 }));
        registry.register(Box::new(Fixed { name: "cd", aliases: &[], exit_code: 0 }));

        let names: Vec<&str> = registry.catalog().iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["cd", "ls"]);
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let handle = token.clone();
        handle.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn test_command_error_becomes_result() {
        let result: CommandResult = CommandError::usage("head: -n needs a number").into();
        assert_eq!(result.exit_code, 2);
        assert_eq!(result.status, CommandStatus::Failure);
        assert_eq!(result.stderr, "head: -n needs a number");
    }

    #[test]
    fn test_stage_note_only_for_pipelines() {
        let single = stopped_at(CommandResult::failure(1, "boom"), 0, 1, "grep");
        assert_eq!(single.stderr, "boom");
        assert_eq!(single.failed_stage, Some(0));

        let piped = stopped_at(CommandResult::failure(1, "boom"), 1, 3, "grep");
        assert_eq!(piped.stderr, "boom\npipeline stopped at stage 2 of 3 (grep)");
    }
}
