use std::collections::BTreeSet;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use super::signals;
use crate::analytics::JsonAnalytics;
use crate::config::Config;
use crate::import::import_claude_sessions;
use crate::models::StatusFlag;
use crate::shell::{LineResponse, Mode, ShellContext, ShellSession};
use crate::store::{ConversationFilter, FileStore, RecordStore};
use crate::utils::{format_path_with_tilde, get_claude_projects_dir};
use crate::vfs::{Navigator, SystemClock, VfsPath};

#[derive(Parser)]
#[command(name = "chatfs")]
#[command(version = "0.1.0")]
#[command(about = "Browse AI conversation history as a virtual filesystem", long_about = None)]
pub struct Cli {
    /// Data directory (overrides the config file and CHATFS_DATA_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive shell reading lines from stdin
    Shell,
    /// Run one shell line and exit with its status
    Exec {
        /// The line, e.g. "ls -l /starred"
        line: String,
    },
    /// List a virtual directory
    Ls {
        /// Virtual path (default: /)
        path: Option<String>,
    },
    /// Show statistics about the store
    Stats,
    /// Import Claude Code session transcripts
    ImportClaude {
        /// Transcript directory (default: ~/.claude/projects)
        dir: Option<PathBuf>,
    },
}

pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Some(Commands::Shell) => run_shell(config),
        Some(Commands::Exec { line }) => run_exec(config, &line),
        Some(Commands::Ls { path }) => {
            list(config, path.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Stats) => {
            show_stats(&config)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::ImportClaude { dir }) => {
            import(&config, dir)?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("Use --help for usage information");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn open_store(config: &Config) -> Result<FileStore> {
    FileStore::open(config.store_dir())
}

fn open_session(config: Config) -> Result<ShellSession> {
    let store = open_store(&config)?;
    let navigator =
        Navigator::with_clock(Box::new(store), config.cache_ttl(), Box::new(SystemClock))
            .with_preview_width(config.preview_width);
    let analytics = JsonAnalytics::new(config.data_dir.clone());
    let ctx = ShellContext::new(navigator, config).with_analytics(Box::new(analytics));
    Ok(ShellSession::new(ctx))
}

fn emit(response: &LineResponse) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(response.stdout.as_bytes()).context("Failed to write output")?;
    stdout.flush().context("Failed to flush output")?;

    if !response.stderr.is_empty() {
        let mut stderr = io::stderr().lock();
        writeln!(stderr, "{}", response.stderr.trim_end_matches('\n'))
            .context("Failed to write error output")?;
    }
    Ok(())
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn run_exec(config: Config, line: &str) -> Result<ExitCode> {
    let mut session = open_session(config)?;
    let response = session.submit_line(line);
    emit(&response)?;
    Ok(exit_code(response.exit_code))
}

/// Line-oriented REPL. Ends on EOF, or on `exit`/`quit` typed in shell mode.
fn run_shell(config: Config) -> Result<ExitCode> {
    let mut session = open_session(config)?;
    let interactive = io::stdin().is_terminal();
    let mut last = 0;
    signals::forward_interrupts(session.cancellation_token())?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        if interactive {
            print!("{}", session.prompt());
            io::stdout().flush().context("Failed to flush prompt")?;
        }
        let Some(line) = lines.next() else { break };
        let line = line.context("Failed to read input")?;

        if let Some(response) = take_prompt_interrupt(&mut session) {
            emit(&response)?;
            last = response.exit_code;
        }
        if session.context().modes.mode() == Mode::Shell && is_quit(&line) {
            break;
        }
        let response = session.submit_line(&line);
        emit(&response)?;
        last = response.exit_code;
    }

    Ok(exit_code(last))
}

/// A Ctrl-C that arrived while waiting at the prompt, handled as an interrupt between lines
fn take_prompt_interrupt(session: &mut ShellSession) -> Option<LineResponse> {
    let token = session.cancellation_token();
    if !token.is_cancelled() {
        return None;
    }
    token.reset();
    Some(session.interrupt())
}

fn is_quit(line: &str) -> bool {
    let word = line.trim().trim_start_matches('/');
    word.eq_ignore_ascii_case("exit") || word.eq_ignore_ascii_case("quit")
}

fn list(config: Config, path: Option<&str>) -> Result<()> {
    let store = open_store(&config)?;
    let mut navigator = Navigator::new(Box::new(store)).with_preview_width(config.preview_width);
    let target = navigator.resolve(path.unwrap_or("/"), &VfsPath::root())?;
    let entries = navigator.list_directory(&target)?;

    let width = entries.iter().map(|e| e.display_name().len()).max().unwrap_or(0);
    for entry in entries {
        match &entry.content_preview {
            Some(preview) => println!("{:<width$}  {}", entry.display_name(), preview),
            None => println!("{}", entry.display_name()),
        }
    }
    Ok(())
}

fn show_stats(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let summaries = store.list_conversations(&ConversationFilter::all())?;

    let messages: usize = summaries.iter().map(|s| s.message_count).sum();
    let flagged = |flag: StatusFlag| summaries.iter().filter(|s| s.has_flag(flag)).count();
    let tags: BTreeSet<&str> =
        summaries.iter().flat_map(|s| s.tags.iter().map(String::as_str)).collect();
    let sources: BTreeSet<&str> = summaries.iter().filter_map(|s| s.source.as_deref()).collect();

    println!("Conversation Store Statistics");
    println!("=============================");
    println!("Conversations: {}", summaries.len());
    println!("  Starred: {}", flagged(StatusFlag::Starred));
    println!("  Pinned: {}", flagged(StatusFlag::Pinned));
    println!("  Archived: {}", flagged(StatusFlag::Archived));
    println!("Messages: {}", messages);
    println!("Tags: {}", tags.len());
    if !sources.is_empty() {
        println!("Sources: {}", sources.into_iter().collect::<Vec<_>>().join(", "));
    }
    println!();
    println!("Data directory: {}", format_path_with_tilde(&config.data_dir));

    if let Some(oldest) = summaries.iter().map(|s| s.created_at).min() {
        println!("Oldest conversation: {}", oldest.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(newest) = summaries.iter().map(|s| s.updated_at).max() {
        println!("Last activity: {}", newest.format("%Y-%m-%d %H:%M:%S"));
    }

    Ok(())
}

fn import(config: &Config, dir: Option<PathBuf>) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => get_claude_projects_dir()?,
    };
    let mut store = open_store(config)?;
    let report = import_claude_sessions(&dir, &mut store)?;

    println!("Imported from {}", format_path_with_tilde(&dir));
    println!("  Files parsed: {}", report.files_parsed);
    if report.files_failed > 0 {
        println!("  Files skipped: {}", report.files_failed);
    }
    println!("  Conversations: {}", report.conversations);
    println!("  Messages: {}", report.messages);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::dispatcher::EXIT_CANCELLED;
    use crate::store::MemoryStore;

    fn session() -> ShellSession {
        let navigator = Navigator::new(Box::new(MemoryStore::new()));
        ShellSession::new(ShellContext::new(navigator, Config::default()))
    }

    #[test]
    fn test_prompt_interrupt_leaves_chat() {
        let mut session = session();
        session.submit_line("cd /starred");
        session.submit_line("chat");
        assert_eq!(session.context().modes.mode(), Mode::Chat);

        assert!(take_prompt_interrupt(&mut session).is_none());

        session.cancellation_token().cancel();
        let response = take_prompt_interrupt(&mut session).unwrap();
        assert_eq!(response.exit_code, EXIT_CANCELLED);
        assert_eq!(response.new_mode, Mode::Shell);
        assert_eq!(response.new_path.to_string(), "/starred");

        assert!(take_prompt_interrupt(&mut session).is_none(), "the interrupt is consumed");
        assert_eq!(session.submit_line("pwd").stdout, "/starred\n");
    }

    #[test]
    fn test_is_quit() {
        assert!(is_quit("exit"));
        assert!(is_quit("  QUIT "));
        assert!(is_quit("/exit"));
        assert!(!is_quit("exit now"));
        assert!(!is_quit("ls"));
    }
}
