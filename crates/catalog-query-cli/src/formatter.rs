//! Output formatters for tokens, query trees and built statements.

use catalog_query::{BooleanQuery, FieldType, Filter, Param, Query};
use clap::ValueEnum;
use comfy_table::{Cell, Table};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text and tables
    Text,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format the tokens of a query.
    fn format_tokens(&self, tokens: &[String]) -> String;

    /// Format a parsed query.
    fn format_query(&self, query: &Query) -> String;

    /// Format a built statement and its parameters.
    fn format_sql(&self, sql: &str, params: &[Param]) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Text formatter using comfy-table.
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_tokens(&self, tokens: &[String]) -> String {
        let mut table = Table::new();
        table.set_header(vec![Cell::new("#"), Cell::new("token")]);
        for (i, token) in tokens.iter().enumerate() {
            table.add_row(vec![Cell::new(i), Cell::new(token)]);
        }
        format!("{}\n{} token(s)", table, tokens.len())
    }

    fn format_query(&self, query: &Query) -> String {
        let mut lines = Vec::new();
        if let Some(text) = query.free_text() {
            lines.push(format!("free text: {:?}", text));
        }
        match &query.boolean {
            Some(bq) if !bq.is_empty() => write_boolean(bq, 0, &mut lines),
            _ => lines.push("no filters".to_string()),
        }
        lines.join("\n")
    }

    fn format_sql(&self, sql: &str, params: &[Param]) -> String {
        let mut table = Table::new();
        table.set_header(vec![Cell::new("param"), Cell::new("type"), Cell::new("value")]);
        for (i, param) in params.iter().enumerate() {
            table.add_row(vec![
                Cell::new(format!("${}", i + 1)),
                Cell::new(param_type(param)),
                Cell::new(param.to_string()),
            ]);
        }
        format!("{}\n\n{}", sql, table)
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_tokens(&self, tokens: &[String]) -> String {
        serde_json::to_string_pretty(tokens).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_query(&self, query: &Query) -> String {
        serde_json::to_string_pretty(query).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_sql(&self, sql: &str, params: &[Param]) -> String {
        serde_json::to_string_pretty(&serde_json::json!({
            "sql": sql,
            "params": params,
        }))
        .unwrap_or_else(|_| "{}".to_string())
    }
}

fn write_boolean(bq: &BooleanQuery, depth: usize, lines: &mut Vec<String>) {
    let groups = [("must", &bq.must), ("should", &bq.should), ("must not", &bq.must_not)];
    for (label, filters) in groups {
        if filters.is_empty() {
            continue;
        }
        lines.push(format!("{}{}:", indent(depth), label));
        for filter in filters {
            match filter.nested_query() {
                Some(nested) => {
                    lines.push(format!("{}(group)", indent(depth + 1)));
                    write_boolean(nested, depth + 2, lines);
                }
                None => lines.push(format!("{}{}", indent(depth + 1), describe_filter(filter))),
            }
        }
    }
}

fn describe_filter(filter: &Filter) -> String {
    let field = match filter.field_type {
        FieldType::Metadata => format!("@metadata.{}", filter.field.join(".")),
        other => format!("@{}", other),
    };
    let value = match (&filter.range, &filter.value) {
        (Some(range), _) => format!("[{} TO {}]", range.from, range.to),
        (None, Some(value)) => format!("{:?}", value.to_string()),
        (None, None) => "-".to_string(),
    };
    format!("{} {} {}", field, filter.operator, value)
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn param_type(param: &Param) -> &'static str {
    match param {
        Param::Text(_) => "text",
        Param::Number(_) => "number",
        Param::Bool(_) => "bool",
    }
}
