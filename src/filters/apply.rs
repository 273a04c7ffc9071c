use chrono::{NaiveDate, NaiveTime};
use nucleo::pattern::{CaseMatching, Normalization, Pattern};
use nucleo::{Config, Matcher};

use super::ast::{FieldFilter, FilterExpr, FilterField, FilterOperator};
use crate::models::{ConversationSummary, StatusFlag};

/// Apply field filters, then rank by the fuzzy text query if there is one.
///
/// Filter logic:
/// - Same-field OR: `tag:a tag:b` → (a OR b)
/// - Cross-field AND: `tag:a is:starred` → (a AND starred)
/// - Explicit operators override defaults, evaluated left to right
///
/// Without a text query the input order is kept. With one, only titles the query matches are
/// returned, best match first.
pub fn apply_filters(
    summaries: Vec<ConversationSummary>,
    filter: &FilterExpr,
) -> Vec<ConversationSummary> {
    let filtered: Vec<ConversationSummary> = if filter.filters.is_empty() {
        summaries
    } else {
        summaries.into_iter().filter(|summary| evaluate_filter(summary, filter)).collect()
    };

    if filter.text.trim().is_empty() {
        return filtered;
    }
    rank_by_title(filtered, &filter.text)
}

/// Title view handed to the matcher; `index` points back into the input
struct Candidate<'a> {
    index: usize,
    title: &'a str,
}

impl AsRef<str> for Candidate<'_> {
    fn as_ref(&self) -> &str {
        self.title
    }
}

/// Keep the summaries whose title fuzzy-matches `query`, best score first
pub fn rank_by_title(summaries: Vec<ConversationSummary>, query: &str) -> Vec<ConversationSummary> {
    let mut matcher = Matcher::new(Config::DEFAULT);
    let pattern = Pattern::parse(query, CaseMatching::Smart, Normalization::Smart);

    let candidates = summaries
        .iter()
        .enumerate()
        .map(|(index, summary)| Candidate { index, title: &summary.title });
    let ranked: Vec<usize> = pattern
        .match_list(candidates, &mut matcher)
        .into_iter()
        .map(|(candidate, _score)| candidate.index)
        .collect();

    let mut slots: Vec<Option<ConversationSummary>> = summaries.into_iter().map(Some).collect();
    ranked.into_iter().filter_map(|i| slots.get_mut(i).and_then(Option::take)).collect()
}

/// Evaluate filter expression against a single summary
fn evaluate_filter(summary: &ConversationSummary, filter: &FilterExpr) -> bool {
    let Some(first) = filter.filters.first() else {
        return true;
    };

    let mut result = evaluate_field_filter(summary, first);
    for (i, operator) in filter.operators.iter().enumerate() {
        let Some(next) = filter.filters.get(i + 1) else { break };
        let next_result = evaluate_field_filter(summary, next);
        result = match operator {
            FilterOperator::And => result && next_result,
            FilterOperator::Or => result || next_result,
        };
    }

    result
}

fn evaluate_field_filter(summary: &ConversationSummary, filter: &FieldFilter) -> bool {
    match filter.field {
        FilterField::Tag => summary.tags.iter().any(|t| t.eq_ignore_ascii_case(&filter.value)),
        FilterField::Source => contains_ignore_case(summary.source.as_deref(), &filter.value),
        FilterField::Model => contains_ignore_case(summary.model.as_deref(), &filter.value),
        FilterField::Title => contains_ignore_case(Some(&summary.title), &filter.value),
        FilterField::Since => match_date(summary, &filter.value, |created, date| created >= date),
        FilterField::Before => match_date(summary, &filter.value, |created, date| created < date),
        FilterField::Is => {
            filter.value.parse::<StatusFlag>().is_ok_and(|flag| summary.has_flag(flag))
        }
    }
}

fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

/// Compare creation time against midnight UTC of a YYYY-MM-DD date
fn match_date(
    summary: &ConversationSummary,
    value: &str,
    compare: impl Fn(chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>) -> bool,
) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| compare(summary.created_at, date.and_time(NaiveTime::MIN).and_utc()))
        .unwrap_or(false)
}
