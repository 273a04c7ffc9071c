//! Integration tests for filter functionality

mod common;

use chatfs::filters::apply::apply_filters;
use chatfs::filters::parser::parse_filter;
use chatfs::models::{ConversationSummary, StatusFlag};
use chatfs::store::{ConversationFilter, RecordStore};
use chrono::Duration;
use common::{ConversationBuilder, StoreBuilder, base_time};

fn store() -> StoreBuilder {
    StoreBuilder::new()
        .with(
            ConversationBuilder::created("rust01", "Borrow checker questions", base_time())
                .tag("rust")
                .tag("Work Notes")
                .source("claude-code")
                .model("claude-sonnet-4"),
        )
        .with(
            ConversationBuilder::created("rust02", "Async runtimes", base_time() - Duration::days(30))
                .tag("rust")
                .flag(StatusFlag::Pinned)
                .source("manual")
                .model("gpt-4o"),
        )
        .with(
            ConversationBuilder::created("py0001", "Packaging a wheel", base_time() - Duration::days(60))
                .tag("python")
                .flag(StatusFlag::Starred)
                .source("claude-code")
                .model("claude-opus-4"),
        )
}

fn summaries() -> Vec<ConversationSummary> {
    store().memory().list_conversations(&ConversationFilter::all()).unwrap()
}

fn query(q: &str) -> Vec<String> {
    let filter = parse_filter(q).expect("Parse filter");
    let mut ids: Vec<String> = apply_filters(summaries(), &filter).into_iter().map(|s| s.id).collect();
    ids.sort();
    ids
}

#[test]
fn test_filter_integration_tag() {
    assert_eq!(query("tag:rust"), vec!["rust01", "rust02"]);
    assert_eq!(query("tag:RUST"), vec!["rust01", "rust02"], "tags match case-insensitively");
}

#[test]
fn test_filter_integration_quoted_tag() {
    assert_eq!(query(r#"tag:"work notes""#), vec!["rust01"]);
}

#[test]
fn test_filter_integration_source_and_model() {
    assert_eq!(query("source:claude"), vec!["py0001", "rust01"]);
    assert_eq!(query("source:claude model:opus"), vec!["py0001"]);
}

#[test]
fn test_filter_integration_status() {
    assert_eq!(query("is:starred"), vec!["py0001"]);
    assert_eq!(query("is:starred OR is:pinned"), vec!["py0001", "rust02"]);
}

#[test]
fn test_filter_integration_dates() {
    let since = (base_time() - Duration::days(45)).format("%Y-%m-%d").to_string();
    assert_eq!(query(&format!("since:{}", since)), vec!["rust01", "rust02"]);
    assert_eq!(query(&format!("before:{}", since)), vec!["py0001"]);
}

#[test]
fn test_filter_integration_fuzzy_text_ranks_titles() {
    let filter = parse_filter("tag:rust borow chk").unwrap();
    let results = apply_filters(summaries(), &filter);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "rust01");
}

#[test]
fn test_filter_integration_invalid_queries() {
    assert!(parse_filter("color:blue").is_err());
    assert!(parse_filter("since:yesterday").is_err());
    assert!(parse_filter("is:deleted").is_err());
}

#[test]
fn test_filter_integration_find_command() {
    let mut session = store().session();
    let response = session.submit_line("find tag:rust source:manual");
    assert_eq!(response.exit_code, 0);
    assert_eq!(response.stdout, "/chats/rust02  Async runtimes\n");

    let response = session.submit_line("find 'tag:work notes'");
    assert_eq!(response.stdout, "/chats/rust01  Borrow checker questions\n");
}
