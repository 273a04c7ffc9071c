//! Query parser for `find`.
//!
//! Parses filter expressions into an AST ([`FilterExpr`]) for evaluation against conversation
//! summaries.
//!
//! # Syntax
//!
//! ```text
//! query := term*
//! term := field_filter | operator | word
//! field_filter := field_name:value | field_name:"quoted value"
//! operator := AND | OR (case-insensitive)
//! field_name := tag | source | model | since | before | is | title (case-insensitive)
//! ```
//!
//! # Supported Fields
//!
//! - `tag:name` - conversation carries the tag
//! - `source:name` / `model:name` - import source or model (partial match)
//! - `since:YYYY-MM-DD` / `before:YYYY-MM-DD` - creation date window
//! - `is:starred|pinned|archived` - status flag
//! - `title:text` - title contains text
//!
//! Plain words are collected into a fuzzy title query.
//!
//! # Examples
//!
//! ```rust
//! # use chatfs::filters::parser::parse_filter;
//! let expr = parse_filter("tag:rust is:starred").unwrap();
//! assert_eq!(expr.filters.len(), 2);
//!
//! let expr = parse_filter("tag:rust OR tag:go lifetimes").unwrap();
//! assert_eq!(expr.text, "lifetimes");
//!
//! let expr = parse_filter("title:\"borrow checker\"").unwrap();
//! assert_eq!(expr.filters[0].value, "borrow checker");
//! ```

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;

use super::ast::{FieldFilter, FilterExpr, FilterField, FilterOperator};
use crate::models::StatusFlag;

/// Token types produced by the tokenizer
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// field:value or field:"quoted value"
    FieldValue { field: String, value: String },
    /// AND keyword
    And,
    /// OR keyword
    Or,
    /// Anything else, part of the fuzzy text query
    Word(String),
}

/// Tokenize a raw query string
fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let word = read_word(&mut chars);
        if let Some((field, value)) = word.split_once(':')
            && value.starts_with('"')
        {
            let value = read_quoted_value(&mut chars, value)?;
            tokens.push(classify(&format!("{}:{}", field, value), true)?);
        } else {
            tokens.push(classify(&word, false)?);
        }
    }

    Ok(tokens)
}

/// Turn one already-split word into a token.
///
/// `quoted` values are taken verbatim even if they are empty after the colon.
fn classify(word: &str, quoted: bool) -> Result<Token> {
    match word.to_uppercase().as_str() {
        "AND" => return Ok(Token::And),
        "OR" => return Ok(Token::Or),
        _ => {}
    }

    match word.split_once(':') {
        Some((field, value)) if !field.is_empty() && parse_field(field).is_ok() => {
            if value.is_empty() && !quoted {
                return Err(anyhow!("Invalid field:value format: {}", word));
            }
            Ok(Token::FieldValue { field: field.to_string(), value: value.to_string() })
        }
        Some((field, _)) if !field.is_empty() && looks_like_field(field) => {
            Err(anyhow!("Unknown field: '{}' (valid fields: {})", field, VALID_FIELDS))
        }
        _ => Ok(Token::Word(word.to_string())),
    }
}

const VALID_FIELDS: &str = "tag, source, model, since, before, is, title";

// `foo:bar` with an alphabetic prefix is meant as a field; `12:30` or `http://` are plain words
fn looks_like_field(field: &str) -> bool {
    field.chars().all(|c| c.is_ascii_alphabetic()) && !field.is_empty() && field.len() <= 10
}

/// Read a word (until whitespace or end)
fn read_word(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut word = String::new();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            break;
        }
        word.push(ch);
        chars.next();
    }

    word
}

/// Read a quoted value, handling the case where the word already contains the opening quote
fn read_quoted_value(
    chars: &mut std::iter::Peekable<std::str::Chars>,
    initial: &str,
) -> Result<String> {
    let mut value = initial[1..].to_string();

    if let Some(quote_pos) = value.find('"') {
        return Ok(value[..quote_pos].to_string());
    }

    for ch in chars.by_ref() {
        if ch == '"' {
            return Ok(value);
        }
        value.push(ch);
    }

    Err(anyhow!("Unterminated quoted string"))
}

/// Parse field name into FilterField enum
fn parse_field(field: &str) -> Result<FilterField> {
    match field.to_lowercase().as_str() {
        "tag" => Ok(FilterField::Tag),
        "source" => Ok(FilterField::Source),
        "model" => Ok(FilterField::Model),
        "since" => Ok(FilterField::Since),
        "before" => Ok(FilterField::Before),
        "is" => Ok(FilterField::Is),
        "title" => Ok(FilterField::Title),
        _ => Err(anyhow!("Unknown field: '{}' (valid fields: {})", field, VALID_FIELDS)),
    }
}

/// Parse a raw query string into a FilterExpr
pub fn parse_filter(input: &str) -> Result<FilterExpr> {
    if input.trim().is_empty() {
        return Ok(FilterExpr::new());
    }
    let tokens = tokenize(input).context("Failed to tokenize filter")?;
    build_expr(tokens)
}

/// Parse words that the shell has already split and unquoted
pub fn parse_filter_words<S: AsRef<str>>(words: &[S]) -> Result<FilterExpr> {
    let tokens = words
        .iter()
        .map(|word| classify(word.as_ref(), true))
        .collect::<Result<Vec<_>>>()?;
    build_expr(tokens)
}

fn build_expr(tokens: Vec<Token>) -> Result<FilterExpr> {
    let mut expr = FilterExpr::new();
    let mut expecting_filter = true;
    let mut pending_operator = false;
    let mut last_field: Option<FilterField> = None;

    for token in tokens {
        match token {
            Token::FieldValue { field, value } => {
                let filter_field = parse_field(&field)?;
                validate_value(filter_field, &value)?;

                // No explicit operator since the previous filter: same field ORs, else AND
                if !expecting_filter && !expr.filters.is_empty() {
                    let implicit_op = match last_field {
                        Some(prev) if prev == filter_field => FilterOperator::Or,
                        _ => FilterOperator::And,
                    };
                    expr.add_operator(implicit_op);
                }

                expr.add_filter(FieldFilter::new(filter_field, value));
                last_field = Some(filter_field);
                expecting_filter = false;
                pending_operator = false;
            }
            Token::And | Token::Or => {
                if expecting_filter {
                    return Err(anyhow!("Unexpected operator (expected field:value)"));
                }
                expr.add_operator(if token == Token::And {
                    FilterOperator::And
                } else {
                    FilterOperator::Or
                });
                expecting_filter = true;
                pending_operator = true;
            }
            Token::Word(word) => {
                if pending_operator {
                    return Err(anyhow!("Operator must be followed by field:value, found '{}'", word));
                }
                expr.push_text(&word);
            }
        }
    }

    if pending_operator {
        return Err(anyhow!("Filter ended with operator (expected field:value)"));
    }

    if expr.operators.len() != expr.filters.len().saturating_sub(1) {
        return Err(anyhow!(
            "Internal parser error: operator count mismatch (filters: {}, operators: {})",
            expr.filters.len(),
            expr.operators.len()
        ));
    }

    Ok(expr)
}

/// Validate filter value based on field type
fn validate_value(field: FilterField, value: &str) -> Result<()> {
    match field {
        FilterField::Since | FilterField::Before => {
            if !is_valid_date_format(value) {
                return Err(anyhow!("Invalid date format: '{}' (expected YYYY-MM-DD)", value));
            }
            Ok(())
        }
        FilterField::Is => value
            .parse::<StatusFlag>()
            .map(|_| ())
            .map_err(|e| anyhow!("Invalid is: value: {}", e)),
        FilterField::Tag | FilterField::Source | FilterField::Model | FilterField::Title => {
            if value.is_empty() {
                return Err(anyhow!("{} value cannot be empty", field.as_str()));
            }
            Ok(())
        }
    }
}

/// Check if string is valid YYYY-MM-DD format
fn is_valid_date_format(s: &str) -> bool {
    if s.len() != 10 {
        return false;
    }
    // chrono rejects dates like 2024-02-31
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_single_field() {
        let tokens = tokenize("tag:rust").unwrap();
        assert_eq!(
            tokens,
            vec![Token::FieldValue { field: "tag".to_string(), value: "rust".to_string() }]
        );
    }

    #[test]
    fn test_tokenize_with_operators_and_words() {
        let tokens = tokenize("tag:rust AND is:starred lifetimes").unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[1], Token::And);
        assert_eq!(tokens[3], Token::Word("lifetimes".to_string()));
    }

    #[test]
    fn test_tokenize_quoted_value() {
        let tokens = tokenize("title:\"borrow checker\"").unwrap();
        assert_eq!(
            tokens[0],
            Token::FieldValue { field: "title".to_string(), value: "borrow checker".to_string() }
        );
    }

    #[test]
    fn test_tokenize_unterminated_quote() {
        let result = tokenize("title:\"foo bar");
        assert!(result.unwrap_err().to_string().contains("Unterminated"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = parse_filter("colour:red");
        assert!(format!("{:#}", result.unwrap_err()).contains("Unknown field"));
    }

    #[test]
    fn test_non_field_colons_are_words() {
        let expr = parse_filter("meeting 12:30").unwrap();
        assert!(expr.filters.is_empty());
        assert_eq!(expr.text, "meeting 12:30");
    }

    #[test]
    fn test_implicit_operators() {
        let expr = parse_filter("tag:a tag:b is:starred").unwrap();
        assert_eq!(expr.operators, vec![FilterOperator::Or, FilterOperator::And]);
    }

    #[test]
    fn test_explicit_operator_overrides() {
        let expr = parse_filter("tag:a AND tag:b").unwrap();
        assert_eq!(expr.operators, vec![FilterOperator::And]);
    }

    #[test]
    fn test_operator_errors() {
        assert!(parse_filter("AND tag:a").is_err());
        assert!(parse_filter("tag:a OR").is_err());
        assert!(parse_filter("tag:a OR words").is_err());
    }

    #[test]
    fn test_value_validation() {
        assert!(parse_filter("since:2024-01-01").is_ok());
        assert!(parse_filter("since:2024-02-31").is_err());
        assert!(parse_filter("before:yesterday").is_err());
        assert!(parse_filter("is:pinned").is_ok());
        assert!(parse_filter("is:hidden").is_err());
        assert!(parse_filter("tag:").is_err());
    }

    #[test]
    fn test_parse_filter_words_keeps_spaces() {
        let words = vec!["tag:work notes".to_string(), "deploy".to_string()];
        let expr = parse_filter_words(&words).unwrap();
        assert_eq!(expr.filters[0].value, "work notes");
        assert_eq!(expr.text, "deploy");
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_filter("   ").unwrap().is_empty());
        assert!(parse_filter_words::<String>(&[]).unwrap().is_empty());
    }
}
