//! Command execution against the query library.

use crate::formatter::Formatter;
use catalog_query::{parse, parse_and_build, tokenize, Builder, TableConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Execution errors.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Parse or build error, rendered against the query text.
    #[error("{0}")]
    Query(String),

    /// The table config file could not be read.
    #[error("failed to read table config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The table config file is not a valid column mapping.
    #[error("invalid table config {path}: {source}")]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// What to do with a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Tokenize,
    Parse,
    Sql,
}

/// Load a JSON column mapping.
pub fn load_table_config(path: &Path) -> Result<TableConfig, ExecuteError> {
    let content = std::fs::read_to_string(path).map_err(|source| ExecuteError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ExecuteError::InvalidConfig {
        path: path.to_path_buf(),
        source,
    })
}

/// Default ranked search prefix for a table, using `$1` for the ranking text.
pub fn default_base_query(table: &str, config: &TableConfig) -> String {
    format!(
        "WITH search_results AS (SELECT *, ts_rank_cd(search_text, websearch_to_tsquery('english', $1), 32) AS search_rank, similarity({name}, $1) AS name_similarity FROM {table}",
        name = config.name_column,
        table = table
    )
}

/// Run an action on a query and return formatted output.
pub fn execute(
    action: Action,
    input: &str,
    builder: &Builder,
    base_query: &str,
    formatter: &dyn Formatter,
) -> Result<String, ExecuteError> {
    tracing::debug!(?action, "executing query");

    match action {
        Action::Tokenize => {
            let tokens = tokenize(input).map_err(|e| ExecuteError::Query(e.format_with_source(input)))?;
            Ok(formatter.format_tokens(&tokens))
        }
        Action::Parse => {
            let query = parse(input).map_err(|e| ExecuteError::Query(e.format_with_source(input)))?;
            Ok(formatter.format_query(&query))
        }
        Action::Sql => {
            let (sql, params) = parse_and_build(input, builder, base_query)
                .map_err(|e| ExecuteError::Query(e.format_with_source(input)))?;
            Ok(formatter.format_sql(&sql, &params))
        }
    }
}
