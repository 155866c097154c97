//! Query model produced by the parser and consumed by the builder.
//!
//! The types are plain values. API handlers that receive structured filter
//! objects can deserialize them straight into a [`BooleanQuery`] and hand
//! it to the builder without going through the text grammar.

use crate::error::BuildError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A parsed search request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Query {
    /// Words that are not part of any field filter.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub free_text: String,
    /// The boolean filter tree. `None` only for an empty query.
    #[serde(default, rename = "bool", skip_serializing_if = "Option::is_none")]
    pub boolean: Option<BooleanQuery>,
}

impl Query {
    /// The free-text part of the query, if any.
    pub fn free_text(&self) -> Option<&str> {
        if self.free_text.is_empty() {
            None
        } else {
            Some(&self.free_text)
        }
    }

    /// Whether the query carries any field filter.
    pub fn has_structured_filters(&self) -> bool {
        self.boolean.as_ref().is_some_and(|b| !b.is_empty())
    }

    /// Whether the query is a single exact match on the asset type or
    /// provider, which the caller can serve from a narrower composite index
    /// instead of the general search path.
    pub fn can_use_composite_index(&self) -> bool {
        let Some(bq) = &self.boolean else {
            return false;
        };

        if bq.must.len() != 1 || !bq.should.is_empty() || !bq.must_not.is_empty() {
            return false;
        }

        let filter = &bq.must[0];
        if filter.operator != Operator::Equals {
            return false;
        }

        match &filter.value {
            Some(Value::Nested(_)) => return false,
            Some(Value::String(s)) if s.contains('*') => return false,
            _ => {}
        }

        matches!(filter.field_type, FieldType::AssetType | FieldType::Provider)
    }

    /// Lower-cased values of the top-level `@kind` equality filters.
    ///
    /// Kind filters compile to `TRUE`; callers use these values to pick the
    /// table or view to search instead.
    pub fn kind_filters(&self) -> Vec<String> {
        let Some(bq) = &self.boolean else {
            return Vec::new();
        };

        bq.must
            .iter()
            .filter(|f| f.field_type == FieldType::Kind && f.operator == Operator::Equals)
            .filter_map(|f| match &f.value {
                Some(Value::String(s)) => Some(s.to_lowercase()),
                _ => None,
            })
            .collect()
    }
}

/// A Must/Should/MustNot grouping of filters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BooleanQuery {
    /// AND-ed filters.
    pub must: Vec<Filter>,
    /// OR-ed filters.
    pub should: Vec<Filter>,
    /// Negated filters, OR-ed onto the rest.
    pub must_not: Vec<Filter>,
}

impl BooleanQuery {
    /// Check if the query has no filters at all.
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.must_not.is_empty()
    }

    /// Total number of filters at this level (nested groups count as one).
    pub fn len(&self) -> usize {
        self.must.len() + self.should.len() + self.must_not.len()
    }
}

/// A single field/operator/value predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Field path, e.g. `["cloud", "account_id"]` for `@metadata.cloud.account_id`.
    #[serde(default)]
    pub field: Vec<String>,
    /// Which column the field lives in.
    #[serde(default)]
    pub field_type: FieldType,
    /// Comparison operator.
    pub operator: Operator,
    /// Comparison value. Absent for range filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Bounds for [`Operator::Range`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeValue>,
    /// The query text the filter was parsed from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub orig_query: String,
}

impl Filter {
    /// Create a filter on the given path.
    pub fn new(
        field: Vec<String>,
        field_type: FieldType,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            field,
            field_type,
            operator,
            value: Some(value.into()),
            range: None,
            orig_query: String::new(),
        }
    }

    /// Create a filter on a metadata path.
    pub fn metadata(path: &[&str], operator: Operator, value: impl Into<Value>) -> Self {
        Self::new(
            path.iter().map(|s| s.to_string()).collect(),
            FieldType::Metadata,
            operator,
            value,
        )
    }

    /// Create a filter on one of the dedicated columns (`@type`, `@provider`,
    /// `@name`, `@kind`). The field path is the field type's name.
    pub fn column(field_type: FieldType, operator: Operator, value: impl Into<Value>) -> Self {
        Self::new(
            vec![field_type.as_str().to_string()],
            field_type,
            operator,
            value,
        )
    }

    /// Create a range filter.
    pub fn range(field: Vec<String>, field_type: FieldType, range: RangeValue) -> Self {
        Self {
            field,
            field_type,
            operator: Operator::Range,
            value: None,
            range: Some(range),
            orig_query: String::new(),
        }
    }

    /// Wrap a boolean query as a pseudo-filter for parenthesized groups.
    pub fn nested(query: BooleanQuery) -> Self {
        Self {
            field: Vec::new(),
            field_type: FieldType::default(),
            operator: Operator::Equals,
            value: Some(Value::Nested(Box::new(query))),
            range: None,
            orig_query: String::new(),
        }
    }

    /// The nested boolean query, if this filter is a group.
    pub fn nested_query(&self) -> Option<&BooleanQuery> {
        match &self.value {
            Some(Value::Nested(bq)) => Some(bq),
            _ => None,
        }
    }

    /// Set the originating query text.
    pub fn with_orig_query(mut self, query: impl Into<String>) -> Self {
        self.orig_query = query.into();
        self
    }
}

/// A filter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    String(String),
    /// A parenthesized group, only valid with [`Operator::Equals`].
    Nested(Box<BooleanQuery>),
}

impl Value {
    /// Get a description of the value type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Nested(_) => "nested query",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
            Value::Nested(bq) => write!(f, "<nested query with {} filters>", bq.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<BooleanQuery> for Value {
    fn from(bq: BooleanQuery) -> Self {
        Value::Nested(Box::new(bq))
    }
}

/// Numeric bounds of a range filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeValue {
    pub from: f64,
    pub to: f64,
    #[serde(default = "default_inclusive")]
    pub inclusive: bool,
}

fn default_inclusive() -> bool {
    true
}

impl RangeValue {
    /// Create an inclusive range.
    pub fn new(from: f64, to: f64) -> Self {
        Self {
            from,
            to,
            inclusive: true,
        }
    }
}

/// The column family a filter targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldType {
    /// The asset type column (`@type`).
    #[serde(rename = "type")]
    AssetType,
    /// The provider array column (`@provider`).
    #[serde(rename = "provider")]
    Provider,
    /// The name column (`@name`).
    #[serde(rename = "name")]
    Name,
    /// A path inside the metadata JSON document (`@metadata.*`).
    #[default]
    #[serde(rename = "metadata")]
    Metadata,
    /// The result kind (`@kind`), resolved by table selection upstream.
    #[serde(rename = "kind")]
    Kind,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::AssetType => "type",
            FieldType::Provider => "provider",
            FieldType::Name => "name",
            FieldType::Metadata => "metadata",
            FieldType::Kind => "kind",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "type" => Ok(FieldType::AssetType),
            "provider" => Ok(FieldType::Provider),
            "name" => Ok(FieldType::Name),
            "metadata" => Ok(FieldType::Metadata),
            "kind" => Ok(FieldType::Kind),
            other => Err(BuildError::unsupported_field_type(other)),
        }
    }
}

/// Filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Equals,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "!=")]
    NotEquals,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
    #[serde(rename = "range")]
    Range,
    #[serde(rename = "wildcard")]
    Wildcard,
    #[serde(rename = "freetext")]
    FreeText,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "=",
            Operator::Contains => "contains",
            Operator::NotEquals => "!=",
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::GreaterEqual => ">=",
            Operator::LessEqual => "<=",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::Range => "range",
            Operator::Wildcard => "wildcard",
            Operator::FreeText => "freetext",
        }
    }

    /// Whether the operator compares the column as a number.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Operator::Greater
                | Operator::Less
                | Operator::GreaterEqual
                | Operator::LessEqual
                | Operator::Range
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
