//! Operator table, boolean keywords and identifier validation.

use crate::ast::Operator;

/// A bare boolean connective between filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolKeyword {
    And,
    Or,
    Not,
}

/// Classify a token as a boolean connective (case-insensitive).
pub fn boolean_keyword(token: &str) -> Option<BoolKeyword> {
    if token.eq_ignore_ascii_case("AND") {
        Some(BoolKeyword::And)
    } else if token.eq_ignore_ascii_case("OR") {
        Some(BoolKeyword::Or)
    } else if token.eq_ignore_ascii_case("NOT") {
        Some(BoolKeyword::Not)
    } else {
        None
    }
}

/// Map an operator symbol from the query text to an [`Operator`].
pub fn parse_operator(symbol: &str) -> Option<Operator> {
    let op = match symbol.to_lowercase().as_str() {
        ":" | "=" | "==" => Operator::Equals,
        "contains" => Operator::Contains,
        "!=" | "<>" => Operator::NotEquals,
        ">" => Operator::Greater,
        "<" => Operator::Less,
        ">=" => Operator::GreaterEqual,
        "<=" => Operator::LessEqual,
        "in" => Operator::In,
        "not" | "not in" => Operator::NotIn,
        "range" => Operator::Range,
        "~" | "like" => Operator::Wildcard,
        _ => return None,
    };
    Some(op)
}

/// Check that a field path segment is safe to splice into a JSON path.
///
/// Only ASCII letters, digits and underscores are accepted.
pub fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
