//! SQL condition builder.
//!
//! Compiles a [`Query`] into PostgreSQL `WHERE` fragments with positional
//! `$n` placeholders and an ordered parameter list. Column names come from a
//! [`TableConfig`]; user input only ever reaches the statement through
//! parameters.

use crate::ast::*;
use crate::error::BuildError;
use crate::operator::is_valid_identifier;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};
use std::fmt;

/// Column names of the table being searched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Asset type column (`@type`).
    pub type_column: String,
    /// Text array of providers (`@provider`).
    pub provider_column: String,
    /// Asset name column (`@name`, similarity ranking).
    pub name_column: String,
    /// JSONB metadata document (`@metadata.*`).
    pub metadata_column: String,
}

impl TableConfig {
    /// Column layout of the `assets` table.
    pub fn assets() -> Self {
        Self {
            type_column: "type".to_string(),
            provider_column: "providers".to_string(),
            name_column: "name".to_string(),
            metadata_column: "metadata".to_string(),
        }
    }

    /// Column layout of the `search_index` table.
    pub fn search_index() -> Self {
        Self {
            type_column: "asset_type".to_string(),
            ..Self::assets()
        }
    }

    pub fn with_type_column(mut self, column: impl Into<String>) -> Self {
        self.type_column = column.into();
        self
    }

    pub fn with_provider_column(mut self, column: impl Into<String>) -> Self {
        self.provider_column = column.into();
        self
    }

    pub fn with_name_column(mut self, column: impl Into<String>) -> Self {
        self.name_column = column.into();
        self
    }

    pub fn with_metadata_column(mut self, column: impl Into<String>) -> Self {
        self.metadata_column = column.into();
        self
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::assets()
    }
}

/// A positional SQL parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Param {
    /// Get the parameter as a string slice, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Param::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Text(s) => write!(f, "{:?}", s),
            Param::Number(n) => write!(f, "{}", n),
            Param::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::Text(s.to_string())
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Param::Text(s)
    }
}

impl From<f64> for Param {
    fn from(n: f64) -> Self {
        Param::Number(n)
    }
}

impl From<bool> for Param {
    fn from(b: bool) -> Self {
        Param::Bool(b)
    }
}

/// Conditions and parameters produced for one boolean level.
type Built = (Vec<String>, Vec<Param>);

/// Builds SQL conditions for one table layout.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    config: TableConfig,
}

impl Builder {
    /// Create a builder for the `assets` table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for the `search_index` table.
    pub fn search_index() -> Self {
        Self::with_config(TableConfig::search_index())
    }

    /// Create a builder with a custom column layout.
    pub fn with_config(config: TableConfig) -> Self {
        Self { config }
    }

    /// Get the column layout.
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Build a full ranked search statement around `base_query`.
    ///
    /// `base_query` is the caller's `WITH search_results AS (SELECT ... FROM <table>`
    /// prefix; it uses `$1` for ranking, so `params[0]` is an empty string and
    /// filter placeholders start at `$2`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use catalog_query::{parse, Builder, Param};
    ///
    /// let query = parse("@type: table").unwrap();
    /// let base = "WITH search_results AS (SELECT *, 1 AS search_rank FROM assets";
    /// let (sql, params) = Builder::new().build_sql(&query, base).unwrap();
    ///
    /// assert!(sql.ends_with("WHERE lower(type) = lower($2)) SELECT * FROM search_results ORDER BY search_rank DESC"));
    /// assert_eq!(params, vec![Param::from(""), Param::from("table")]);
    /// ```
    pub fn build_sql(&self, query: &Query, base_query: &str) -> Result<(String, Vec<Param>), BuildError> {
        let mut conditions = Vec::new();
        let mut params = vec![Param::Text(String::new())];
        let mut idx = 1;

        if let Some(bq) = &query.boolean {
            let (conds, bool_params) = self.build_boolean_conditions(bq, &mut idx)?;
            if !conds.is_empty() {
                conditions.push(conds.join(" AND "));
            }
            params.extend(bool_params);
        }

        if !query.free_text.is_empty() {
            idx += 1;
            conditions.push(self.free_text_condition(idx));
            params.push(Param::Text(query.free_text.clone()));
        }

        let base = base_query.trim().trim_end_matches(')');
        let sql = if conditions.is_empty() {
            format!("{}) SELECT * FROM search_results ORDER BY search_rank DESC", base)
        } else {
            format!(
                "{} WHERE {}) SELECT * FROM search_results ORDER BY search_rank DESC",
                base,
                conditions.join(" AND ")
            )
        };

        tracing::debug!(
            conditions = conditions.len(),
            params = params.len(),
            "built search statement"
        );
        Ok((sql, params))
    }

    /// Build the conditions of a boolean query with placeholders from `$1`.
    pub fn build_conditions(&self, bq: &BooleanQuery) -> Result<(Vec<String>, Vec<Param>), BuildError> {
        let mut idx = 0;
        self.build_boolean_conditions(bq, &mut idx)
    }

    /// Build the structured conditions of a query for splicing into another
    /// statement whose last used placeholder is `$start`.
    ///
    /// Free text is not compiled; callers fetch it with [`Query::free_text`]
    /// and rank it themselves. Returns the conditions, their parameters and
    /// the last placeholder index used.
    pub fn build_search_conditions(
        &self,
        query: &Query,
        start: usize,
    ) -> Result<(Vec<String>, Vec<Param>, usize), BuildError> {
        let mut idx = start;
        let (conditions, params) = match &query.boolean {
            Some(bq) => self.build_boolean_conditions(bq, &mut idx)?,
            None => (Vec::new(), Vec::new()),
        };
        Ok((conditions, params, idx))
    }

    /// Compose one boolean level.
    ///
    /// Must conditions stay separate unless Should or MustNot filters are
    /// present, in which case they collapse into one parenthesized AND group
    /// and every Should/MustNot condition is OR-ed onto that first entry, left
    /// to right.
    fn build_boolean_conditions(&self, bq: &BooleanQuery, idx: &mut usize) -> Result<Built, BuildError> {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        for filter in &bq.must {
            let (cond, filter_params) = self.build_filter_condition(filter, idx)?;
            conditions.push(cond);
            params.extend(filter_params);
        }

        if !conditions.is_empty() && (!bq.should.is_empty() || !bq.must_not.is_empty()) {
            conditions = vec![format!("({})", conditions.join(" AND "))];
        }

        for filter in &bq.should {
            let (cond, filter_params) = self.build_filter_condition(filter, idx)?;
            match conditions.first_mut() {
                Some(first) => *first = format!("{} OR {}", first, cond),
                None => conditions.push(cond),
            }
            params.extend(filter_params);
        }

        for filter in &bq.must_not {
            let (cond, filter_params) = self.build_filter_condition(filter, idx)?;
            match conditions.first_mut() {
                Some(first) => *first = format!("{} OR NOT ({})", first, cond),
                None => conditions.push(format!("NOT ({})", cond)),
            }
            params.extend(filter_params);
        }

        Ok((conditions, params))
    }

    fn build_filter_condition(&self, filter: &Filter, idx: &mut usize) -> Result<(String, Vec<Param>), BuildError> {
        if let Some(field) = filter.field.iter().find(|f| !is_valid_identifier(f)) {
            return Err(BuildError::invalid_field_name(field));
        }

        if filter.field_type == FieldType::Kind {
            return Ok(("TRUE".to_string(), Vec::new()));
        }

        if let Some(nested) = filter.nested_query() {
            if filter.operator != Operator::Equals {
                return Err(BuildError::invalid_value(format!(
                    "nested query requires the = operator, got {}",
                    filter.operator
                )));
            }
            let (conds, params) = self.build_boolean_conditions(nested, idx)?;
            if conds.is_empty() {
                return Ok(("TRUE".to_string(), params));
            }
            return Ok((format!("({})", conds.join(" AND ")), params));
        }

        *idx += 1;
        let n = *idx;

        if filter.field.first().is_some_and(|f| f == "freetext") {
            let value = required_value(filter)?;
            return Ok((self.free_text_condition(n), vec![Param::from(value)]));
        }

        let column = self.column_ref(filter)?;
        let provider = filter.field_type == FieldType::Provider;

        let (condition, params) = match filter.operator {
            Operator::Wildcard => {
                if provider {
                    return Err(BuildError::not_allowed(
                        "wildcard operator not supported for provider fields",
                    ));
                }
                let pattern = required_value(filter)?.to_string().replace('*', "%");
                (format!("{} ILIKE ${}", column, n), vec![Param::Text(pattern)])
            }

            Operator::Equals => {
                let value = required_value(filter)?;
                match filter.field_type {
                    FieldType::Provider => (
                        format!("{} && ARRAY[${}]::text[]", column, n),
                        vec![Param::from(value)],
                    ),
                    // metadata @> '{"a": {"b": value}}'
                    FieldType::Metadata => (
                        format!("{} @> ${}::jsonb", self.config.metadata_column, n),
                        vec![Param::Text(build_nested_json(&filter.field, value))],
                    ),
                    _ => (
                        format!("lower({}) = lower(${})", column, n),
                        vec![Param::from(value)],
                    ),
                }
            }

            Operator::Contains => {
                let pattern = format!("%{}%", required_value(filter)?);
                let condition = if provider {
                    format!(
                        "EXISTS (SELECT 1 FROM unnest({}) AS elem WHERE lower(elem) LIKE lower(${}))",
                        column, n
                    )
                } else {
                    format!("{} ILIKE ${}", column, n)
                };
                (condition, vec![Param::Text(pattern)])
            }

            Operator::NotEquals => {
                let value = required_value(filter)?;
                let condition = match filter.field_type {
                    FieldType::Provider => format!("NOT ({} && ARRAY[${}]::text[])", column, n),
                    FieldType::AssetType => {
                        format!("({} IS NULL OR lower({}) != lower(${}))", column, column, n)
                    }
                    FieldType::Name => format!("lower({}) != lower(${})", column, n),
                    _ => format!("{} != ${}", column, n),
                };
                (condition, vec![Param::from(value)])
            }

            Operator::Greater | Operator::Less | Operator::GreaterEqual | Operator::LessEqual => {
                if provider {
                    return Err(BuildError::not_allowed(
                        "comparison operators not supported for provider fields",
                    ));
                }
                let value = required_value(filter)?.to_string();
                (
                    format!("({})::numeric {} ${}::numeric", column, filter.operator, n),
                    vec![Param::Text(value)],
                )
            }

            Operator::Range => {
                if provider {
                    return Err(BuildError::not_allowed(
                        "range operator not supported for provider fields",
                    ));
                }
                let range = filter.range.ok_or_else(BuildError::missing_range)?;
                // Range takes two slots.
                *idx += 1;
                (
                    format!(
                        "({col})::numeric >= ${}::numeric AND ({col})::numeric <= ${}::numeric",
                        n,
                        n + 1,
                        col = column
                    ),
                    vec![Param::Number(range.from), Param::Number(range.to)],
                )
            }

            Operator::In | Operator::NotIn | Operator::FreeText => {
                return Err(BuildError::unsupported_operator(filter.operator));
            }
        };

        Ok((condition, params))
    }

    fn column_ref(&self, filter: &Filter) -> Result<String, BuildError> {
        let column = match filter.field_type {
            FieldType::AssetType => self.config.type_column.clone(),
            FieldType::Provider => self.config.provider_column.clone(),
            FieldType::Name => self.config.name_column.clone(),
            FieldType::Metadata => {
                let Some((leaf, parents)) = filter.field.split_last() else {
                    return Err(BuildError::invalid_field_name(""));
                };
                let mut path = self.config.metadata_column.clone();
                for segment in parents {
                    path.push_str(&format!("->'{}'", segment));
                }
                path.push_str(&format!("->>'{}'", leaf));
                path
            }
            FieldType::Kind => return Err(BuildError::unsupported_field_type(FieldType::Kind.as_str())),
        };
        Ok(column)
    }

    fn free_text_condition(&self, n: usize) -> String {
        format!(
            "(search_text @@ websearch_to_tsquery('english', ${n}) OR similarity({}, ${n}) > 0.3)",
            self.config.name_column,
            n = n
        )
    }
}

fn required_value(filter: &Filter) -> Result<&Value, BuildError> {
    match &filter.value {
        Some(Value::Nested(_)) => Err(BuildError::invalid_value(format!(
            "nested query cannot be used with the {} operator",
            filter.operator
        ))),
        Some(value) => Ok(value),
        None => Err(BuildError::invalid_value(format!(
            "missing value for {} filter on {}",
            filter.operator,
            filter.field.join(".")
        ))),
    }
}

impl From<&Value> for Param {
    fn from(value: &Value) -> Self {
        match value {
            Value::Bool(b) => Param::Bool(*b),
            Value::Number(n) => Param::Number(*n),
            Value::String(s) => Param::Text(s.clone()),
            Value::Nested(_) => Param::Text(value.to_string()),
        }
    }
}

/// Build `{"a": {"b": <value>}}` for the path `["a", "b"]`.
fn build_nested_json(path: &[String], value: &Value) -> String {
    let mut leaf = match value {
        Value::String(s) => parse_json_value(s),
        Value::Number(n) => json_number(*n).map_or(JsonValue::Null, JsonValue::Number),
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Nested(_) => JsonValue::Null,
    };

    for key in path.iter().rev() {
        let mut object = Map::new();
        object.insert(key.clone(), leaf);
        leaf = JsonValue::Object(object);
    }

    match leaf {
        JsonValue::Object(_) => leaf.to_string(),
        _ => "{}".to_string(),
    }
}

/// Integral values are written without a fraction so `1234` stays `1234`.
fn json_number(n: f64) -> Option<Number> {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Some(Number::from(n as i64))
    } else {
        Number::from_f64(n)
    }
}

/// Interpret a string as a JSON number or boolean where it looks like one.
fn parse_json_value(s: &str) -> JsonValue {
    if let Some(number) = s.parse::<f64>().ok().and_then(json_number) {
        return JsonValue::Number(number);
    }
    match s {
        "true" => JsonValue::Bool(true),
        "false" => JsonValue::Bool(false),
        _ => JsonValue::String(s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildErrorKind;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Param {
        Param::from(s)
    }

    fn must(filters: Vec<Filter>) -> BooleanQuery {
        BooleanQuery {
            must: filters,
            ..Default::default()
        }
    }

    fn build_one(filter: Filter) -> Result<(Vec<String>, Vec<Param>), BuildError> {
        Builder::new().build_conditions(&must(vec![filter]))
    }

    #[test]
    fn test_metadata_equals_uses_containment() {
        let (conds, params) =
            build_one(Filter::metadata(&["cloud", "account_id"], Operator::Equals, "1234")).unwrap();
        assert_eq!(conds, vec!["metadata @> $1::jsonb"]);
        assert_eq!(params, vec![text(r#"{"cloud":{"account_id":1234}}"#)]);

        let (_, params) = build_one(Filter::metadata(&["active"], Operator::Equals, "true")).unwrap();
        assert_eq!(params, vec![text(r#"{"active":true}"#)]);

        let (_, params) = build_one(Filter::metadata(&["team"], Operator::Equals, "orders")).unwrap();
        assert_eq!(params, vec![text(r#"{"team":"orders"}"#)]);
    }

    #[test]
    fn test_composition_shape() {
        let bq = BooleanQuery {
            must: vec![Filter::metadata(&["field1"], Operator::Equals, "value1")],
            should: vec![Filter::metadata(&["field2"], Operator::Equals, "value2")],
            must_not: vec![Filter::metadata(&["field3"], Operator::Equals, "value3")],
        };

        let (conds, params) = Builder::new().build_conditions(&bq).unwrap();
        assert_eq!(
            conds,
            vec![
                "(metadata @> $1::jsonb) OR metadata @> $2::jsonb OR NOT (metadata @> $3::jsonb)"
            ]
        );
        assert_eq!(
            params,
            vec![
                text(r#"{"field1":"value1"}"#),
                text(r#"{"field2":"value2"}"#),
                text(r#"{"field3":"value3"}"#),
            ]
        );
    }

    #[test]
    fn test_must_conditions_stay_separate() {
        let bq = must(vec![
            Filter::metadata(&["partitions"], Operator::Greater, "5"),
            Filter::column(FieldType::Name, Operator::NotEquals, "orders"),
        ]);
        let (conds, params) = Builder::new().build_conditions(&bq).unwrap();
        assert_eq!(
            conds,
            vec![
                "(metadata->>'partitions')::numeric > $1::numeric",
                "lower(name) != lower($2)",
            ]
        );
        assert_eq!(params, vec![text("5"), text("orders")]);
    }

    #[test]
    fn test_should_and_must_not_without_must() {
        let bq = BooleanQuery {
            should: vec![Filter::column(FieldType::AssetType, Operator::Equals, "table")],
            must_not: vec![Filter::column(FieldType::AssetType, Operator::Equals, "view")],
            ..Default::default()
        };
        let (conds, _) = Builder::new().build_conditions(&bq).unwrap();
        assert_eq!(conds, vec!["lower(type) = lower($1) OR NOT (lower(type) = lower($2))"]);

        let bq = BooleanQuery {
            must_not: vec![Filter::column(FieldType::Name, Operator::Equals, "tmp")],
            ..Default::default()
        };
        let (conds, _) = Builder::new().build_conditions(&bq).unwrap();
        assert_eq!(conds, vec!["NOT (lower(name) = lower($1))"]);
    }

    #[test]
    fn test_parameter_accounting() {
        let bq = must(vec![
            Filter::metadata(&["a"], Operator::Equals, "1"),
            Filter::column(FieldType::Kind, Operator::Equals, "glossary"),
            Filter::range(vec!["rows".into()], FieldType::Metadata, RangeValue::new(1.0, 10.0)),
            Filter::column(FieldType::Provider, Operator::Equals, "snowflake"),
        ]);
        let query = Query {
            free_text: String::new(),
            boolean: Some(bq),
        };

        let (conds, params, next) = Builder::new().build_search_conditions(&query, 4).unwrap();
        assert_eq!(
            conds,
            vec![
                "metadata @> $5::jsonb",
                "TRUE",
                "(metadata->>'rows')::numeric >= $6::numeric AND (metadata->>'rows')::numeric <= $7::numeric",
                "providers && ARRAY[$8]::text[]",
            ]
        );
        assert_eq!(params.len(), 4);
        assert_eq!(params[1], Param::Number(1.0));
        assert_eq!(params[2], Param::Number(10.0));
        assert_eq!(next, 8);
    }

    #[test]
    fn test_wildcard_replaces_stars() {
        let (conds, params) =
            build_one(Filter::metadata(&["name"], Operator::Wildcard, "val*ue*")).unwrap();
        assert_eq!(conds, vec!["metadata->>'name' ILIKE $1"]);
        assert_eq!(params, vec![text("val%ue%")]);
    }

    #[test]
    fn test_asset_type_columns() {
        let (conds, params) =
            build_one(Filter::column(FieldType::AssetType, Operator::Equals, "dataset")).unwrap();
        assert_eq!(conds, vec!["lower(type) = lower($1)"]);
        assert_eq!(params, vec![text("dataset")]);

        let filter = Filter::column(FieldType::AssetType, Operator::NotEquals, "dataset");
        let (conds, _) = Builder::search_index()
            .build_conditions(&must(vec![filter]))
            .unwrap();
        assert_eq!(conds, vec!["(asset_type IS NULL OR lower(asset_type) != lower($1))"]);
    }

    #[test]
    fn test_kind_is_true_for_any_operator() {
        for op in [Operator::Equals, Operator::NotEquals, Operator::In, Operator::Range] {
            let (conds, params) = build_one(Filter::column(FieldType::Kind, op, "glossary")).unwrap();
            assert_eq!(conds, vec!["TRUE"]);
            assert!(params.is_empty());
        }
    }

    #[test]
    fn test_provider_operators() {
        let (conds, params) =
            build_one(Filter::column(FieldType::Provider, Operator::NotEquals, "kafka")).unwrap();
        assert_eq!(conds, vec!["NOT (providers && ARRAY[$1]::text[])"]);
        assert_eq!(params, vec![text("kafka")]);

        let (conds, params) =
            build_one(Filter::column(FieldType::Provider, Operator::Contains, "snow")).unwrap();
        assert_eq!(
            conds,
            vec!["EXISTS (SELECT 1 FROM unnest(providers) AS elem WHERE lower(elem) LIKE lower($1))"]
        );
        assert_eq!(params, vec![text("%snow%")]);
    }

    #[test]
    fn test_provider_rejections() {
        let cases = [
            (Operator::Wildcard, "wildcard operator not supported for provider fields"),
            (Operator::Greater, "comparison operators not supported for provider fields"),
            (Operator::LessEqual, "comparison operators not supported for provider fields"),
        ];
        for (op, message) in cases {
            let err = build_one(Filter::column(FieldType::Provider, op, "x")).unwrap_err();
            assert_eq!(err.kind, BuildErrorKind::OperatorNotAllowed);
            assert_eq!(err.message, message);
        }

        let filter = Filter::range(
            vec!["provider".into()],
            FieldType::Provider,
            RangeValue::new(1.0, 2.0),
        );
        let err = build_one(filter).unwrap_err();
        assert_eq!(err.message, "range operator not supported for provider fields");
    }

    #[test]
    fn test_contains_and_comparisons() {
        let (conds, params) =
            build_one(Filter::column(FieldType::Name, Operator::Contains, "order")).unwrap();
        assert_eq!(conds, vec!["name ILIKE $1"]);
        assert_eq!(params, vec![text("%order%")]);

        let (conds, params) =
            build_one(Filter::metadata(&["size"], Operator::LessEqual, 10.0)).unwrap();
        assert_eq!(conds, vec!["(metadata->>'size')::numeric <= $1::numeric"]);
        assert_eq!(params, vec![text("10")]);

        let (conds, params) =
            build_one(Filter::metadata(&["owner"], Operator::NotEquals, "ops")).unwrap();
        assert_eq!(conds, vec!["metadata->>'owner' != $1"]);
        assert_eq!(params, vec![text("ops")]);
    }

    #[test]
    fn test_unsupported_operators() {
        for op in [Operator::In, Operator::NotIn, Operator::FreeText] {
            let err = build_one(Filter::metadata(&["team"], op, "x")).unwrap_err();
            assert_eq!(err.kind, BuildErrorKind::UnsupportedOperator);
            assert_eq!(err.message, format!("unsupported operator: {}", op));
        }
    }

    #[test]
    fn test_missing_range() {
        let filter = Filter {
            range: None,
            value: None,
            ..Filter::range(vec!["rows".into()], FieldType::Metadata, RangeValue::new(0.0, 1.0))
        };
        let err = build_one(filter).unwrap_err();
        assert_eq!(err.kind, BuildErrorKind::MissingRange);
    }

    #[test]
    fn test_invalid_field_name() {
        let err = build_one(Filter::metadata(&["owner'--"], Operator::Equals, "x")).unwrap_err();
        assert_eq!(err.kind, BuildErrorKind::InvalidFieldName);
        assert_eq!(err.message, "invalid field name: owner'--");

        // checked before the kind short-circuit
        let mut filter = Filter::column(FieldType::Kind, Operator::Equals, "x");
        filter.field = vec!["a b".to_string()];
        assert!(build_one(filter).is_err());

        let err = build_one(Filter::metadata(&[], Operator::Equals, "x")).unwrap_err();
        assert_eq!(err.kind, BuildErrorKind::InvalidFieldName);
    }

    #[test]
    fn test_invalid_values() {
        let mut filter = Filter::metadata(&["team"], Operator::Equals, "x");
        filter.value = None;
        let err = build_one(filter).unwrap_err();
        assert_eq!(err.kind, BuildErrorKind::InvalidValue);

        let mut filter = Filter::nested(BooleanQuery::default());
        filter.operator = Operator::Contains;
        let err = build_one(filter).unwrap_err();
        assert_eq!(err.kind, BuildErrorKind::InvalidValue);
    }

    #[test]
    fn test_nested_groups() {
        let inner = BooleanQuery {
            must: vec![Filter::column(FieldType::AssetType, Operator::Equals, "table")],
            should: vec![Filter::column(FieldType::AssetType, Operator::Equals, "view")],
            ..Default::default()
        };
        let bq = BooleanQuery {
            must: vec![Filter::nested(inner)],
            should: vec![Filter::column(FieldType::Name, Operator::Equals, "orders")],
            ..Default::default()
        };

        let (conds, params) = Builder::new().build_conditions(&bq).unwrap();
        assert_eq!(
            conds,
            vec!["(((lower(type) = lower($1)) OR lower(type) = lower($2))) OR lower(name) = lower($3)"]
        );
        assert_eq!(params, vec![text("table"), text("view"), text("orders")]);
    }

    #[test]
    fn test_empty_nested_group_is_true() {
        let (conds, params) = build_one(Filter::nested(BooleanQuery::default())).unwrap();
        assert_eq!(conds, vec!["TRUE"]);
        assert!(params.is_empty());
    }

    #[test]
    fn test_freetext_path() {
        let filter = Filter::metadata(&["freetext"], Operator::Equals, "orders api");
        let (conds, params) = build_one(filter).unwrap();
        assert_eq!(
            conds,
            vec!["(search_text @@ websearch_to_tsquery('english', $1) OR similarity(name, $1) > 0.3)"]
        );
        assert_eq!(params, vec![text("orders api")]);
    }

    #[test]
    fn test_build_sql() {
        let base = "WITH search_results AS (\n  SELECT *, 1 AS search_rank\n  FROM assets)  ";
        let query = Query {
            free_text: "orders".to_string(),
            boolean: Some(must(vec![Filter::column(
                FieldType::AssetType,
                Operator::Equals,
                "table",
            )])),
        };

        let (sql, params) = Builder::new().build_sql(&query, base).unwrap();
        assert_eq!(
            sql,
            "WITH search_results AS (\n  SELECT *, 1 AS search_rank\n  FROM assets WHERE lower(type) = lower($2) AND (search_text @@ websearch_to_tsquery('english', $3) OR similarity(name, $3) > 0.3)) SELECT * FROM search_results ORDER BY search_rank DESC"
        );
        assert_eq!(params, vec![text(""), text("table"), text("orders")]);
    }

    #[test]
    fn test_build_sql_without_conditions() {
        let (sql, params) = Builder::new()
            .build_sql(&Query::default(), "WITH search_results AS (SELECT * FROM assets")
            .unwrap();
        assert_eq!(
            sql,
            "WITH search_results AS (SELECT * FROM assets) SELECT * FROM search_results ORDER BY search_rank DESC"
        );
        assert_eq!(params, vec![text("")]);
    }

    #[test]
    fn test_custom_table_config() {
        let config = TableConfig::assets()
            .with_name_column("title")
            .with_metadata_column("attrs");
        let builder = Builder::with_config(config);

        let query = Query {
            free_text: "orders".to_string(),
            boolean: Some(must(vec![Filter::metadata(&["a", "b"], Operator::Contains, "x")])),
        };
        let (conds, params, next) = builder.build_search_conditions(&query, 0).unwrap();
        assert_eq!(conds, vec!["attrs->'a'->>'b' ILIKE $1"]);
        assert_eq!(params, vec![text("%x%")]);
        assert_eq!(next, 1);

        let (sql, _) = builder.build_sql(&query, "S").unwrap();
        assert!(sql.contains("similarity(title, $3)"));
    }

    #[test]
    fn test_table_config_json() {
        let config: TableConfig = serde_json::from_str(
            r#"{"type_column":"kind","provider_column":"sources","name_column":"title","metadata_column":"doc"}"#,
        )
        .unwrap();
        assert_eq!(
            config,
            TableConfig::assets()
                .with_type_column("kind")
                .with_provider_column("sources")
                .with_name_column("title")
                .with_metadata_column("doc")
        );
        assert_eq!(TableConfig::default(), TableConfig::assets());
        assert_eq!(TableConfig::search_index().type_column, "asset_type");
    }

    #[test]
    fn test_param_serialization() {
        let params = vec![text("a"), Param::Number(1.5), Param::Bool(true)];
        assert_eq!(serde_json::to_string(&params).unwrap(), r#"["a",1.5,true]"#);
        assert_eq!(text("a").to_string(), "\"a\"");
        assert_eq!(text("a").as_str(), Some("a"));
        assert_eq!(Param::Number(2.0).as_str(), None);
    }
}
