use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Default location of Claude Code session transcripts (`~/.claude/projects`)
pub fn get_claude_projects_dir() -> Result<PathBuf> {
    let home = env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".claude").join("projects"))
}
