//! Error types for tokenizing, parsing and SQL building.

use crate::span::{offset_to_line_col, Span};
use thiserror::Error;

/// Error raised while tokenizing or parsing a search query.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct ParseError {
    /// The error message.
    pub message: String,
    /// Source span where the error occurred.
    pub span: Span,
    /// Error kind for programmatic handling.
    pub kind: ParseErrorKind,
    /// Optional hint for fixing the error.
    pub hint: Option<String>,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Kinds of parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A quote was opened and never closed.
    UnclosedQuotes,
    /// Both `'` and `"` appear in the same query.
    MixedQuotes,
    /// A field filter is missing its operator or value.
    IncompleteFilter,
    /// Parentheses do not balance.
    UnmatchedParentheses,
    /// A range literal does not match `[<from> TO <to>]`.
    InvalidRange,
    /// A metadata path is deeper than [`MAX_METADATA_DEPTH`](crate::parser::MAX_METADATA_DEPTH).
    NestingDepthExceeded,
    /// The operator symbol is not in the operator table.
    UnknownOperator,
    /// Parenthesized groups nest deeper than [`MAX_GROUP_DEPTH`](crate::parser::MAX_GROUP_DEPTH).
    GroupDepthExceeded,
    /// `OR NOT` is followed by a filter that has no single value to negate.
    InvalidNegation,
}

impl ParseErrorKind {
    /// Whether the error was raised by the tokenizer rather than the parser.
    pub fn is_lexical(self) -> bool {
        matches!(self, ParseErrorKind::UnclosedQuotes | ParseErrorKind::MixedQuotes)
    }
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(message: impl Into<String>, span: Span, kind: ParseErrorKind) -> Self {
        Self {
            message: message.into(),
            span,
            kind,
            hint: None,
        }
    }

    /// Add a hint to the error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Create an unclosed quotes error.
    pub fn unclosed_quotes(span: Span) -> Self {
        Self::new("unclosed quotes in query", span, ParseErrorKind::UnclosedQuotes)
    }

    pub fn mixed_quotes(span: Span) -> Self {
        Self::new("mixed quote types in query", span, ParseErrorKind::MixedQuotes)
            .with_hint("use either double or single quotes throughout the query")
    }

    pub fn incomplete_filter(span: Span) -> Self {
        Self::new(
            "incomplete filter expression",
            span,
            ParseErrorKind::IncompleteFilter,
        )
        .with_hint("filters take the form @metadata.<field> <operator> <value>")
    }

    pub fn unmatched_parentheses(span: Span) -> Self {
        Self::new(
            "unmatched parentheses",
            span,
            ParseErrorKind::UnmatchedParentheses,
        )
    }

    pub fn invalid_range(span: Span) -> Self {
        Self::new("invalid range format", span, ParseErrorKind::InvalidRange)
            .with_hint("ranges take the form [<from> TO <to>]")
    }

    pub fn nesting_depth_exceeded(limit: usize, span: Span) -> Self {
        Self::new(
            format!("metadata nesting depth exceeds limit of {}", limit),
            span,
            ParseErrorKind::NestingDepthExceeded,
        )
    }

    pub fn group_depth_exceeded(limit: usize, span: Span) -> Self {
        Self::new(
            format!("group nesting depth exceeds limit of {}", limit),
            span,
            ParseErrorKind::GroupDepthExceeded,
        )
    }

    pub fn invalid_negation(span: Span) -> Self {
        Self::new(
            "OR NOT must be followed by a value filter",
            span,
            ParseErrorKind::InvalidNegation,
        )
        .with_hint("use AND NOT to exclude ranges and groups")
    }

    pub fn unknown_operator(op: &str, span: Span) -> Self {
        Self::new(
            format!("unknown operator: {:?}", op),
            span,
            ParseErrorKind::UnknownOperator,
        )
    }

    /// Render the error with the offending line and a caret under the span.
    pub fn format_with_source(&self, source: &str) -> String {
        let (line, col) = offset_to_line_col(source, self.span.start);
        let mut out = format!("error: {}\n  --> line {}:{}\n", self.message, line, col);

        if let Some(text) = source.lines().nth(line - 1) {
            let remaining = text.chars().count().saturating_sub(col - 1);
            let width = self.span.len().min(remaining).max(1);
            out.push_str(&format!(
                "   |\n{:3}| {}\n   | {}^{}\n",
                line,
                text,
                " ".repeat(col - 1),
                "~".repeat(width - 1)
            ));
        }

        if let Some(hint) = &self.hint {
            out.push_str(&format!("   = hint: {}\n", hint));
        }
        out
    }
}

/// Error raised while building SQL from a query AST.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct BuildError {
    /// The error message.
    pub message: String,
    /// Error kind for programmatic handling.
    pub kind: BuildErrorKind,
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Kinds of build errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildErrorKind {
    /// A field path segment is not a plain identifier.
    InvalidFieldName,
    /// A textual field type is not recognised.
    UnsupportedFieldType,
    /// The operator has no SQL translation.
    UnsupportedOperator,
    /// The operator is not allowed for the field type.
    OperatorNotAllowed,
    /// A range filter has no bounds.
    MissingRange,
    /// The filter value cannot be used with the operator.
    InvalidValue,
}

impl BuildError {
    /// Create a new build error.
    pub fn new(message: impl Into<String>, kind: BuildErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    pub fn invalid_field_name(field: &str) -> Self {
        Self::new(
            format!("invalid field name: {}", field),
            BuildErrorKind::InvalidFieldName,
        )
    }

    pub fn unsupported_field_type(field_type: &str) -> Self {
        Self::new(
            format!("unsupported field type: {}", field_type),
            BuildErrorKind::UnsupportedFieldType,
        )
    }

    pub fn unsupported_operator(op: impl std::fmt::Display) -> Self {
        Self::new(
            format!("unsupported operator: {}", op),
            BuildErrorKind::UnsupportedOperator,
        )
    }

    pub fn not_allowed(message: impl Into<String>) -> Self {
        Self::new(message, BuildErrorKind::OperatorNotAllowed)
    }

    pub fn missing_range() -> Self {
        Self::new("range values missing", BuildErrorKind::MissingRange)
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::new(message, BuildErrorKind::InvalidValue)
    }
}

/// A combined error type for the public API.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Parse error.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    /// Build error.
    #[error("build error: {0}")]
    Build(#[from] BuildError),
}

impl QueryError {
    /// Format the error with source context.
    pub fn format_with_source(&self, source: &str) -> String {
        match self {
            QueryError::Parse(e) => e.format_with_source(source),
            QueryError::Build(e) => format!("error[{:?}]: {}\n", e.kind, e.message),
        }
    }
}
