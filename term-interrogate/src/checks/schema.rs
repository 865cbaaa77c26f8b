//! Schema-level checks: column existence, schema comparison and column count.

use super::{current_table, table_schema};
use crate::core::{Constraint, Tally};
use crate::error::{Result, TermError};
use arrow::datatypes::Schema;
use async_trait::async_trait;
use datafusion::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument};

/// The accepted type of a declared column: one type name, or a set of
/// equivalent names any of which is acceptable.
///
/// Deserializes from a string or a list of strings:
///
/// ```rust
/// use term_interrogate::checks::DtypeSpec;
///
/// let one: DtypeSpec = serde_json::from_str(r#""Int64""#).unwrap();
/// let any: DtypeSpec = serde_json::from_str(r#"["Int32", "Int64"]"#).unwrap();
/// assert_eq!(one, DtypeSpec::from("Int64"));
/// assert_eq!(any.to_string(), "Int32 | Int64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DtypeSpec {
    One(String),
    AnyOf(Vec<String>),
}

impl DtypeSpec {
    /// The accepted type names.
    pub fn names(&self) -> &[String] {
        match self {
            DtypeSpec::One(name) => std::slice::from_ref(name),
            DtypeSpec::AnyOf(names) => names,
        }
    }

    fn accepts(&self, actual: &str, options: &SchemaMatchOptions) -> bool {
        let normalize = |dtype: &str| {
            if options.case_sensitive_dtypes {
                dtype.to_string()
            } else {
                dtype.to_lowercase()
            }
        };
        let have = normalize(actual);
        self.names().iter().any(|name| {
            let want = normalize(name);
            if options.full_match_dtypes {
                want == have
            } else {
                have.contains(&want)
            }
        })
    }
}

impl fmt::Display for DtypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(" | "))
    }
}

impl From<&str> for DtypeSpec {
    fn from(name: &str) -> Self {
        DtypeSpec::One(name.to_string())
    }
}

impl From<String> for DtypeSpec {
    fn from(name: String) -> Self {
        DtypeSpec::One(name)
    }
}

impl From<Vec<&str>> for DtypeSpec {
    fn from(names: Vec<&str>) -> Self {
        DtypeSpec::AnyOf(names.into_iter().map(String::from).collect())
    }
}

impl From<Vec<String>> for DtypeSpec {
    fn from(names: Vec<String>) -> Self {
        DtypeSpec::AnyOf(names)
    }
}

/// A column expected by [`SchemaSpec`]. A missing `dtype` matches any type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    #[serde(default)]
    pub dtype: Option<DtypeSpec>,
}

/// The expected schema for `col_schema_match`.
///
/// Types are compared against Arrow's display names (`Int64`, `Utf8`,
/// `Float64`, ...). A list of names accepts any of them.
///
/// # Examples
///
/// ```rust
/// use term_interrogate::checks::SchemaSpec;
///
/// let schema = SchemaSpec::new()
///     .column("id", "Int64")
///     .column("name", "Utf8")
///     .column("score", vec!["Float32", "Float64"])
///     .any_type("notes");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSpec {
    pub columns: Vec<SchemaColumn>,
}

impl SchemaSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, name: impl Into<String>, dtype: impl Into<DtypeSpec>) -> Self {
        self.columns.push(SchemaColumn {
            name: name.into(),
            dtype: Some(dtype.into()),
        });
        self
    }

    /// Expects a column without constraining its type.
    pub fn any_type(mut self, name: impl Into<String>) -> Self {
        self.columns.push(SchemaColumn {
            name: name.into(),
            dtype: None,
        });
        self
    }

    /// Captures an Arrow schema, names and types included.
    pub fn from_arrow(schema: &Schema) -> Self {
        Self {
            columns: schema
                .fields()
                .iter()
                .map(|field| SchemaColumn {
                    name: field.name().clone(),
                    dtype: Some(DtypeSpec::One(field.data_type().to_string())),
                })
                .collect(),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(TermError::Configuration(
                "Schema must declare at least one column".to_string(),
            ));
        }
        for column in &self.columns {
            if matches!(&column.dtype, Some(dtype) if dtype.names().is_empty()) {
                return Err(TermError::Configuration(format!(
                    "Type list for column '{}' cannot be empty",
                    column.name
                )));
            }
        }
        Ok(())
    }
}

/// How strictly `col_schema_match` compares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaMatchOptions {
    /// The table may not have columns beyond the declared ones
    pub complete: bool,
    /// Declared columns must appear in the same relative order
    pub in_order: bool,
    pub case_sensitive_colnames: bool,
    pub case_sensitive_dtypes: bool,
    /// When false, a declared type matches any actual type containing it
    pub full_match_dtypes: bool,
}

impl Default for SchemaMatchOptions {
    fn default() -> Self {
        Self {
            complete: true,
            in_order: true,
            case_sensitive_colnames: true,
            case_sensitive_dtypes: true,
            full_match_dtypes: true,
        }
    }
}

impl SchemaMatchOptions {
    /// Only checks that the declared columns exist with matching types.
    pub fn lenient() -> Self {
        Self {
            complete: false,
            in_order: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMismatch {
    pub column: String,
    pub expected: DtypeSpec,
    pub actual: String,
}

/// Structured outcome of a schema comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDiff {
    /// Declared columns absent from the table
    pub missing: Vec<String>,
    /// Table columns not declared (reported only for complete matches)
    pub unexpected: Vec<String>,
    pub type_mismatches: Vec<TypeMismatch>,
    pub order_mismatch: bool,
}

impl SchemaDiff {
    pub fn is_match(&self) -> bool {
        self.missing.is_empty()
            && self.unexpected.is_empty()
            && self.type_mismatches.is_empty()
            && !self.order_mismatch
    }

    /// Compares an expected schema against an actual one.
    pub fn compare(expected: &SchemaSpec, actual: &Schema, options: &SchemaMatchOptions) -> Self {
        let normalize_name = |name: &str| {
            if options.case_sensitive_colnames {
                name.to_string()
            } else {
                name.to_lowercase()
            }
        };

        let actual_names: Vec<String> = actual
            .fields()
            .iter()
            .map(|field| normalize_name(field.name()))
            .collect();

        let mut diff = SchemaDiff::default();
        let mut matched = vec![false; actual_names.len()];
        let mut positions = Vec::new();

        for column in &expected.columns {
            let wanted = normalize_name(&column.name);
            let Some(position) = actual_names
                .iter()
                .enumerate()
                .position(|(i, name)| !matched[i] && *name == wanted)
            else {
                diff.missing.push(column.name.clone());
                continue;
            };
            matched[position] = true;
            positions.push(position);

            if let Some(dtype) = &column.dtype {
                let actual_type = actual.field(position).data_type().to_string();
                if !dtype.accepts(&actual_type, options) {
                    diff.type_mismatches.push(TypeMismatch {
                        column: column.name.clone(),
                        expected: dtype.clone(),
                        actual: actual_type,
                    });
                }
            }
        }

        if options.complete {
            diff.unexpected = actual
                .fields()
                .iter()
                .zip(&matched)
                .filter(|(_, matched)| !**matched)
                .map(|(field, _)| field.name().clone())
                .collect();
        }

        if options.in_order {
            diff.order_mismatch = positions.windows(2).any(|pair| pair[0] > pair[1]);
        }

        diff
    }
}

/// `col_schema_match`: one test unit that passes when the table's schema
/// matches the declared one.
#[derive(Debug, Clone)]
pub struct SchemaMatchCheck {
    schema: SchemaSpec,
    options: SchemaMatchOptions,
}

impl SchemaMatchCheck {
    pub fn new(schema: SchemaSpec, options: SchemaMatchOptions) -> Self {
        Self { schema, options }
    }
}

#[async_trait]
impl Constraint for SchemaMatchCheck {
    #[instrument(skip(self, ctx), fields(check.name = %self.name()))]
    async fn evaluate(&self, ctx: &SessionContext) -> Result<Tally> {
        let actual = table_schema(ctx, &current_table()?).await?;
        let diff = SchemaDiff::compare(&self.schema, &actual, &self.options);

        debug!(
            check.name = %self.name(),
            schema.missing = diff.missing.len(),
            schema.unexpected = diff.unexpected.len(),
            schema.type_mismatches = diff.type_mismatches.len(),
            schema.order_mismatch = diff.order_mismatch,
            "Compared schemas"
        );

        Ok(Tally::single(diff.is_match()).with_schema_diff(diff))
    }

    fn name(&self) -> &str {
        "col_schema_match"
    }
}

/// `col_exists`: one test unit per column.
#[derive(Debug, Clone)]
pub struct ColumnExistsCheck {
    column: String,
}

impl ColumnExistsCheck {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

#[async_trait]
impl Constraint for ColumnExistsCheck {
    #[instrument(skip(self, ctx), fields(check.name = %self.name(), check.column = %self.column))]
    async fn evaluate(&self, ctx: &SessionContext) -> Result<Tally> {
        let schema = table_schema(ctx, &current_table()?).await?;
        Ok(Tally::single(schema.index_of(&self.column).is_ok()))
    }

    fn name(&self) -> &str {
        "col_exists"
    }
}

/// `col_count_match`: one test unit comparing the number of columns.
#[derive(Debug, Clone)]
pub struct ColumnCountCheck {
    expected: usize,
}

impl ColumnCountCheck {
    pub fn new(expected: usize) -> Self {
        Self { expected }
    }
}

#[async_trait]
impl Constraint for ColumnCountCheck {
    #[instrument(skip(self, ctx), fields(check.name = %self.name(), check.expected = self.expected))]
    async fn evaluate(&self, ctx: &SessionContext) -> Result<Tally> {
        let schema = table_schema(ctx, &current_table()?).await?;
        Ok(Tally::single(schema.fields().len() == self.expected))
    }

    fn name(&self) -> &str {
        "col_count_match"
    }
}
