//! Catalog Search Query Language
//!
//! This crate parses the search box language of the metadata catalog and
//! compiles it into parameterized PostgreSQL conditions.
//!
//! # Query Language Syntax
//!
//! ## Field filters
//!
//! ```text
//! @metadata.team: "orders"
//! @metadata.cloud.account_id = 1234
//! @metadata.partitions > 5
//! @metadata.partitions range [1 TO 10]
//! @metadata.name contains CreateOrder
//! @metadata.name: "ord*_serv*"
//! @type: table
//! @provider != kafka
//! @name: orders
//! @kind: glossary
//! ```
//!
//! Operators: `:` `=` `==` `contains` `!=` `<>` `>` `<` `>=` `<=` `in`
//! `not` `not in` `range` `~` `like`. A `*` anywhere in a value switches the
//! filter to wildcard matching.
//!
//! ## Boolean connectives
//!
//! ```text
//! @metadata.partitions > 5 AND @metadata.team: orders
//! @metadata.partitions < 3 OR @metadata.team: orders
//! NOT @metadata.environment: "*test*"
//! (@type: table OR @type: view) AND NOT @provider: kafka
//! ```
//!
//! ## Free text
//!
//! Words outside a filter become the free-text part of the query, matched
//! with full-text search and name similarity.
//!
//! ```text
//! order service @metadata.team: logistics
//! ```
//!
//! # Usage
//!
//! ```rust
//! use catalog_query::{parse, parse_and_build, Builder};
//!
//! let base = "WITH search_results AS (SELECT *, 1 AS search_rank FROM assets";
//!
//! // Parse and build in one step
//! let (sql, params) = parse_and_build("@type: table orders", &Builder::new(), base).unwrap();
//! assert_eq!(params.len(), 3);
//!
//! // Or parse and build separately
//! let query = parse("@metadata.team: orders").unwrap();
//! let (conditions, params) = Builder::search_index()
//!     .build_conditions(query.boolean.as_ref().unwrap())
//!     .unwrap();
//! assert_eq!(conditions, vec!["metadata @> $1::jsonb"]);
//! ```

pub mod ast;
pub mod builder;
pub mod error;
pub mod lexer;
pub mod operator;
pub mod parser;
pub mod span;

// Re-export main types
pub use ast::{BooleanQuery, FieldType, Filter, Operator, Query, RangeValue, Value};
pub use builder::{Builder, Param, TableConfig};
pub use error::{BuildError, BuildErrorKind, ParseError, ParseErrorKind, QueryError};
pub use parser::{MAX_GROUP_DEPTH, MAX_METADATA_DEPTH};
pub use span::Span;

/// Parse a search query into its AST.
///
/// # Example
///
/// ```rust
/// use catalog_query::parse;
///
/// let query = parse("@metadata.team: orders pipeline").unwrap();
/// assert_eq!(query.free_text(), Some("pipeline"));
/// ```
pub fn parse(source: &str) -> Result<Query, ParseError> {
    parser::parse(source)
}

/// Split a search query into tokens (for debugging/testing).
pub fn tokenize(source: &str) -> Result<Vec<String>, ParseError> {
    lexer::tokenize(source)
}

/// Parse a search query and build the ranked search statement in one step.
pub fn parse_and_build(
    source: &str,
    builder: &Builder,
    base_query: &str,
) -> Result<(String, Vec<Param>), QueryError> {
    let query = parse(source)?;
    let built = builder.build_sql(&query, base_query)?;
    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "WITH search_results AS (SELECT * FROM assets";

    #[test]
    fn test_parse_and_build() {
        let (sql, params) =
            parse_and_build("@metadata.partitions > 5 orders", &Builder::new(), BASE).unwrap();
        assert!(sql.contains("WHERE (metadata->>'partitions')::numeric > $2::numeric AND (search_text"));
        assert_eq!(
            params,
            vec![Param::from(""), Param::from("5"), Param::from("orders")]
        );
    }

    #[test]
    fn test_parse_error_is_wrapped() {
        let source = "@metadata.team maybe orders";
        let err = parse_and_build(source, &Builder::new(), BASE).unwrap_err();
        assert!(matches!(err, QueryError::Parse(_)));

        let formatted = err.format_with_source(source);
        assert!(formatted.contains("line 1:16"));
        assert!(formatted.contains("unknown operator"));
    }

    #[test]
    fn test_build_error_is_wrapped() {
        let err = parse_and_build("@provider > 3", &Builder::new(), BASE).unwrap_err();
        match err {
            QueryError::Build(e) => assert_eq!(e.kind, BuildErrorKind::OperatorNotAllowed),
            other => panic!("expected build error, got {:?}", other),
        }
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("(@type: table)").unwrap(),
            vec!["(", "@type", ":", "table", ")"]
        );
    }

    #[test]
    fn test_deterministic() {
        let source = r#"(@type: table OR @provider: snowflake) AND NOT @metadata.env: "*test*" orders"#;
        let first = parse_and_build(source, &Builder::new(), BASE).unwrap();
        let second = parse_and_build(source, &Builder::new(), BASE).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_builder_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Builder>();
        assert_send_sync::<Query>();
    }
}
