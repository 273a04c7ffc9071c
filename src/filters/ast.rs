/// Conversation fields a `find` query can filter on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    /// Conversation carries the tag (exact, case-insensitive)
    Tag,
    /// Import source, e.g. `claude-code` (case-insensitive substring)
    Source,
    /// Model name (case-insensitive substring)
    Model,
    /// Created on or after a date (YYYY-MM-DD)
    Since,
    /// Created before a date (YYYY-MM-DD)
    Before,
    /// Status flag: starred, pinned or archived
    Is,
    /// Title contains the text (case-insensitive substring)
    Title,
}

impl FilterField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterField::Tag => "tag",
            FilterField::Source => "source",
            FilterField::Model => "model",
            FilterField::Since => "since",
            FilterField::Before => "before",
            FilterField::Is => "is",
            FilterField::Title => "title",
        }
    }
}

/// Logical operators for combining filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOperator {
    /// Both conditions must match (default between different fields)
    And,
    /// Either condition matches (default within same field)
    Or,
}

/// Single field:value filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: FilterField,
    pub value: String,
}

impl FieldFilter {
    pub fn new(field: FilterField, value: impl Into<String>) -> Self {
        Self { field, value: value.into() }
    }
}

/// Parsed `find` query.
///
/// No parentheses:
/// - Same-field filters are OR'd together: `tag:a tag:b` → (a OR b)
/// - Cross-field filters are AND'd together: `tag:a is:starred` → (a AND starred)
/// - Explicit operators override defaults; evaluation is left to right
///
/// Words that are not `field:value` pairs make up `text`, a fuzzy title query used to rank
/// whatever the field filters let through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterExpr {
    pub filters: Vec<FieldFilter>,
    pub operators: Vec<FilterOperator>,
    pub text: String,
}

impl FilterExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter(&mut self, filter: FieldFilter) {
        self.filters.push(filter);
    }

    pub fn add_operator(&mut self, operator: FilterOperator) {
        self.operators.push(operator);
    }

    pub fn push_text(&mut self, word: &str) {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(word);
    }

    /// True when neither field filters nor a text query are present
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_expr_empty() {
        let expr = FilterExpr::new();
        assert!(expr.is_empty());
        assert_eq!(expr.operators.len(), 0);
    }

    #[test]
    fn test_filter_expr_with_operators() {
        let mut expr = FilterExpr::new();
        expr.add_filter(FieldFilter::new(FilterField::Tag, "rust"));
        expr.add_operator(FilterOperator::And);
        expr.add_filter(FieldFilter::new(FilterField::Is, "starred"));
        assert_eq!(expr.filters.len(), 2);
        assert_eq!(expr.operators[0], FilterOperator::And);
    }

    #[test]
    fn test_text_only_is_not_empty() {
        let mut expr = FilterExpr::new();
        expr.push_text("borrow");
        expr.push_text("checker");
        assert_eq!(expr.text, "borrow checker");
        assert!(!expr.is_empty());
    }
}
