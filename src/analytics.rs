//! Read-only view of the embedding and graph analytics records.
//!
//! Another tool writes `embedding_session.json` and `graph.json` into the data directory; the
//! shell only shows them. The payloads (`filters`, `config`, `metrics`) are kept as opaque JSON.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::utils::safe_open_file;

pub const EMBEDDING_SESSION_FILE: &str = "embedding_session.json";
pub const GRAPH_FILE: &str = "graph.json";

/// The embedding run the similarity data came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSession {
    #[serde(default)]
    pub filters: Value,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub config: Value,
}

/// The most recently built conversation graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphInfo {
    pub file_reference: String,
    #[serde(default)]
    pub metrics: Value,
}

pub trait AnalyticsSource {
    fn current_embedding_session(&self) -> Option<EmbeddingSession>;

    fn current_graph(&self) -> Option<GraphInfo>;
}

/// No analytics available
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnalytics;

impl AnalyticsSource for NoAnalytics {
    fn current_embedding_session(&self) -> Option<EmbeddingSession> {
        None
    }

    fn current_graph(&self) -> Option<GraphInfo> {
        None
    }
}

/// Reads the records from a data directory on every call, so a rewrite by the producer is
/// picked up without restarting the shell
#[derive(Debug, Clone)]
pub struct JsonAnalytics {
    dir: PathBuf,
}

impl JsonAnalytics {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Option<T> {
        let path = self.dir.join(name);
        if !path.exists() {
            return None;
        }
        match read_json(&path) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{:#}", e), "Ignoring unreadable analytics record");
                None
            }
        }
    }
}

impl AnalyticsSource for JsonAnalytics {
    fn current_embedding_session(&self) -> Option<EmbeddingSession> {
        self.read(EMBEDDING_SESSION_FILE)
    }

    fn current_graph(&self) -> Option<GraphInfo> {
        self.read(GRAPH_FILE)
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let mut content = String::new();
    safe_open_file(path)?
        .read_to_string(&mut content)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write a record the way the producer does; used by tests and by `chatfs` tooling
pub fn write_record<T: Serialize>(dir: &Path, name: &str, record: &T) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let json = serde_json::to_string_pretty(record).context("Failed to serialize record")?;
    fs::write(dir.join(name), json).with_context(|| format!("Failed to write {}", name))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_missing_records_are_none() {
        let dir = TempDir::new().unwrap();
        let analytics = JsonAnalytics::new(dir.path());
        assert!(analytics.current_embedding_session().is_none());
        assert!(analytics.current_graph().is_none());
    }

    #[test]
    fn test_reads_opaque_payloads() {
        let dir = TempDir::new().unwrap();
        let session = EmbeddingSession {
            filters: json!({"tag": "rust"}),
            provider: Some("local".to_string()),
            config: json!({"dims": 384}),
        };
        write_record(dir.path(), EMBEDDING_SESSION_FILE, &session).unwrap();
        let graph = GraphInfo {
            file_reference: "graphs/latest.gexf".to_string(),
            metrics: json!({"nodes": 12, "edges": 30}),
        };
        write_record(dir.path(), GRAPH_FILE, &graph).unwrap();

        let analytics = JsonAnalytics::new(dir.path());
        assert_eq!(analytics.current_embedding_session(), Some(session));
        assert_eq!(analytics.current_graph().unwrap().metrics["edges"], 30);
    }

    #[test]
    fn test_latest_write_wins() {
        let dir = TempDir::new().unwrap();
        let analytics = JsonAnalytics::new(dir.path());
        for name in ["first.gexf", "second.gexf"] {
            let graph = GraphInfo { file_reference: name.to_string(), metrics: Value::Null };
            write_record(dir.path(), GRAPH_FILE, &graph).unwrap();
        }
        assert_eq!(analytics.current_graph().unwrap().file_reference, "second.gexf");
    }

    #[test]
    fn test_corrupt_record_is_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(GRAPH_FILE), "{not json").unwrap();
        assert!(JsonAnalytics::new(dir.path()).current_graph().is_none());
    }
}
