//! Recursive descent parser for the search language.
//!
//! Grammar, informally:
//!
//! ```text
//! query   := group [ (AND [NOT] | OR [NOT]) query ]
//!          | { filter | AND | OR | NOT | word }
//! group   := "(" query ")"
//! filter  := field op value
//! field   := "@metadata." seg { "." seg } | "@type" | "@provider" | "@name" | "@kind"
//! value   := quoted | "[" num "TO" num "]" | word
//! ```
//!
//! Boolean keywords are one-shot: `NOT` routes the next filter to MustNot,
//! `OR` routes it to Should, and everything else lands in Must.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{tokenize_spanned, SpannedToken, Token};
use crate::operator::{boolean_keyword, parse_operator, BoolKeyword};
use crate::span::Span;
use regex::Regex;
use std::sync::OnceLock;

/// Maximum number of segments in a `@metadata.` path.
pub const MAX_METADATA_DEPTH: usize = 5;

/// Maximum number of groups a query may nest or chain.
pub const MAX_GROUP_DEPTH: usize = 32;

const METADATA_PREFIX: &str = "@metadata.";

static RANGE_REGEX: OnceLock<Regex> = OnceLock::new();

fn range_regex() -> &'static Regex {
    RANGE_REGEX.get_or_init(|| Regex::new(r"\[(.*?)\s+TO\s+(.*?)\]").unwrap())
}

/// The field a filter expression starts with.
#[derive(Debug, Clone, PartialEq)]
enum FieldRef<'a> {
    /// `@metadata.<path>`, path still dot-joined.
    Metadata(&'a str),
    /// `@type`, `@provider`, `@name` or `@kind`.
    Column(FieldType),
}

fn field_reference(text: &str) -> Option<FieldRef<'_>> {
    if let Some(path) = text.strip_prefix(METADATA_PREFIX) {
        return Some(FieldRef::Metadata(path));
    }
    match text {
        "@type" => Some(FieldRef::Column(FieldType::AssetType)),
        "@provider" => Some(FieldRef::Column(FieldType::Provider)),
        "@name" => Some(FieldRef::Column(FieldType::Name)),
        "@kind" => Some(FieldRef::Column(FieldType::Kind)),
        _ => None,
    }
}

/// Parser for the search language.
pub struct Parser<'source> {
    source: &'source str,
}

impl<'source> Parser<'source> {
    /// Create a new parser for the given source.
    pub fn new(source: &'source str) -> Self {
        Self { source }
    }

    /// Parse the whole source into a query.
    pub fn parse_query(&self) -> Result<Query, ParseError> {
        let tokens = tokenize_spanned(self.source)?;
        let query = self.parse_tokens(&tokens, 0)?;

        if let Some(bq) = &query.boolean {
            tracing::debug!(
                must = bq.must.len(),
                should = bq.should.len(),
                must_not = bq.must_not.len(),
                free_text = %query.free_text,
                "parsed search query"
            );
        }
        Ok(query)
    }

    fn parse_tokens(&self, tokens: &[SpannedToken], depth: usize) -> Result<Query, ParseError> {
        match tokens.first() {
            None => Ok(Query::default()),
            Some(first) if first.token == Token::LParen => self.parse_group(tokens, depth),
            Some(_) => self.parse_sequence(tokens),
        }
    }

    /// Parse a query that opens with a parenthesized group.
    ///
    /// Both the group body and the query after its connective count one
    /// level against [`MAX_GROUP_DEPTH`].
    fn parse_group(&self, tokens: &[SpannedToken], depth: usize) -> Result<Query, ParseError> {
        if depth >= MAX_GROUP_DEPTH {
            return Err(ParseError::group_depth_exceeded(MAX_GROUP_DEPTH, tokens[0].span));
        }

        let mut open = 0usize;
        let mut close = None;
        for (i, tok) in tokens.iter().enumerate() {
            match tok.token {
                Token::LParen => open += 1,
                Token::RParen => {
                    open -= 1;
                    if open == 0 {
                        close = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }

        let close = close.ok_or_else(|| ParseError::unmatched_parentheses(tokens[0].span))?;
        let inner = self.parse_tokens(&tokens[1..close], depth + 1)?;
        let rest = &tokens[close + 1..];

        let keyword = match rest.first().and_then(|t| boolean_keyword(t.text())) {
            Some(k @ (BoolKeyword::And | BoolKeyword::Or)) => k,
            _ => return Ok(inner),
        };

        let negated = rest
            .get(1)
            .is_some_and(|t| boolean_keyword(t.text()) == Some(BoolKeyword::Not));
        let remainder_tokens = &rest[if negated { 2 } else { 1 }..];
        let remainder = self.parse_tokens(remainder_tokens, depth + 1)?;
        let tail = remainder.boolean.unwrap_or_default();

        let mut bq = BooleanQuery {
            must: vec![Filter::nested(inner.boolean.unwrap_or_default())],
            ..Default::default()
        };

        match (keyword, negated) {
            (BoolKeyword::And, false) => bq.must.extend(tail.must),
            (BoolKeyword::And, true) => bq.must_not.extend(tail.must),
            (_, false) => bq.should.extend(tail.must),
            (_, true) => {
                let mut must = tail.must.into_iter();
                let span = span_of(remainder_tokens, rest[1].span);
                let mut negated_filter = must
                    .next()
                    .ok_or_else(|| ParseError::incomplete_filter(span))?;
                if negated_filter.range.is_some() || negated_filter.nested_query().is_some() {
                    return Err(ParseError::invalid_negation(span));
                }
                negated_filter.operator = Operator::NotEquals;
                bq.should.push(negated_filter);
                bq.should.extend(must);
            }
        }
        bq.should.extend(tail.should);
        bq.must_not.extend(tail.must_not);

        Ok(Query {
            free_text: join_free_text(&inner.free_text, &remainder.free_text),
            boolean: Some(bq),
        })
    }

    /// Parse a flat run of filters, boolean keywords and free text.
    fn parse_sequence(&self, tokens: &[SpannedToken]) -> Result<Query, ParseError> {
        let orig_query = self.slice(tokens);
        let mut bq = BooleanQuery::default();
        let mut free_text = String::new();
        let mut pending: Vec<&str> = Vec::new();
        let mut not_next = false;
        let mut or_next = false;

        let mut i = 0;
        while i < tokens.len() {
            let text = tokens[i].text();

            if let Some(field) = field_reference(text) {
                flush_free_text(&mut pending, &mut free_text);

                let (filter, consumed) = self.parse_filter(&tokens[i..], field)?;
                let filter = filter.with_orig_query(orig_query);

                if not_next {
                    bq.must_not.push(filter);
                    not_next = false;
                } else if or_next {
                    bq.should.push(filter);
                    or_next = false;
                } else {
                    bq.must.push(filter);
                }

                i += consumed;
                continue;
            }

            if let Some(keyword) = boolean_keyword(text) {
                flush_free_text(&mut pending, &mut free_text);
                match keyword {
                    BoolKeyword::Or => or_next = true,
                    BoolKeyword::Not => not_next = true,
                    BoolKeyword::And => {}
                }
                i += 1;
                continue;
            }

            pending.push(text);
            i += 1;
        }
        flush_free_text(&mut pending, &mut free_text);

        Ok(Query {
            free_text,
            boolean: Some(bq),
        })
    }

    /// Parse `field op value` at the start of `tokens`.
    ///
    /// Returns the filter and the number of tokens consumed.
    fn parse_filter(
        &self,
        tokens: &[SpannedToken],
        field: FieldRef<'_>,
    ) -> Result<(Filter, usize), ParseError> {
        if tokens.len() < 3 {
            return Err(ParseError::incomplete_filter(span_of(tokens, tokens[0].span)));
        }

        let (field_type, path): (FieldType, Vec<String>) = match field {
            FieldRef::Metadata(path) => {
                let segments: Vec<String> = path.split('.').map(str::to_string).collect();
                if segments.len() > MAX_METADATA_DEPTH {
                    return Err(ParseError::nesting_depth_exceeded(
                        MAX_METADATA_DEPTH,
                        tokens[0].span,
                    ));
                }
                (FieldType::Metadata, segments)
            }
            FieldRef::Column(field_type) => (field_type, vec![field_type.as_str().to_string()]),
        };

        let op_token = &tokens[1];
        let mut operator = parse_operator(op_token.text())
            .ok_or_else(|| ParseError::unknown_operator(op_token.text(), op_token.span))?;

        if operator == Operator::Range {
            let (range, consumed) = parse_range(&tokens[2..])?;
            return Ok((Filter::range(path, field_type, range), 2 + consumed));
        }

        let value = match &tokens[2].token {
            // The lexer only emits a quoted token once its closing quote is seen.
            Token::Quoted(quoted) => quoted[1..quoted.len() - 1].to_string(),
            other => other.as_str().to_string(),
        };

        if value.contains('*') {
            operator = Operator::Wildcard;
        }

        Ok((Filter::new(path, field_type, operator, value), 3))
    }

    fn slice(&self, tokens: &[SpannedToken]) -> &'source str {
        span_of(tokens, Span::default()).slice(self.source)
    }
}

/// Parse `[<from> TO <to>]`, collecting tokens up to one that ends in `]`.
///
/// Bounds that are not numbers become `0`.
fn parse_range(tokens: &[SpannedToken]) -> Result<(RangeValue, usize), ParseError> {
    let mut parts = Vec::new();
    for tok in tokens {
        parts.push(tok.text());
        if tok.text().ends_with(']') {
            break;
        }
    }
    let consumed = parts.len();
    let literal = parts.join(" ");

    let span = span_of(&tokens[..consumed], Span::default());
    let captures = range_regex()
        .captures(&literal)
        .ok_or_else(|| ParseError::invalid_range(span))?;

    let from = captures[1].trim().parse::<f64>().unwrap_or(0.0);
    let to = captures[2].trim().parse::<f64>().unwrap_or(0.0);

    Ok((RangeValue::new(from, to), consumed))
}

fn span_of(tokens: &[SpannedToken], fallback: Span) -> Span {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => first.span.merge(last.span),
        _ => fallback,
    }
}

fn flush_free_text(pending: &mut Vec<&str>, free_text: &mut String) {
    if !pending.is_empty() {
        *free_text = pending.join(" ");
        pending.clear();
    }
}

fn join_free_text(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{} {}", a, b),
    }
}

/// Parse a source string into a query.
pub fn parse(source: &str) -> Result<Query, ParseError> {
    Parser::new(source).parse_query()
}
