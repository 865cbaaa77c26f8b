//! Authored validation steps and the check kinds they declare.

use super::{Actions, Literal, Operand, Thresholds};
use crate::checks::{SchemaMatchOptions, SchemaSpec};
use crate::error::{Result, TermError};
use crate::security::SqlSecurity;
use crate::selectors::{ColumnSpec, SegmentSpec};
use datafusion::execution::context::SQLOptions;
use datafusion::prelude::*;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Comparison operator of the `col_vals_gt` family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
        }
    }
}

fn inclusive_default() -> (bool, bool) {
    (true, true)
}

/// The check an authored step performs.
///
/// Deserializes from an object tagged by `check`, e.g.
/// `{"check": "col_vals_between", "left": 0, "right": 10}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum CheckKind {
    ColValsGt {
        value: Operand,
        #[serde(default)]
        na_pass: bool,
    },
    ColValsLt {
        value: Operand,
        #[serde(default)]
        na_pass: bool,
    },
    ColValsGe {
        value: Operand,
        #[serde(default)]
        na_pass: bool,
    },
    ColValsLe {
        value: Operand,
        #[serde(default)]
        na_pass: bool,
    },
    ColValsEq {
        value: Operand,
        #[serde(default)]
        na_pass: bool,
    },
    ColValsNe {
        value: Operand,
        #[serde(default)]
        na_pass: bool,
    },
    ColValsBetween {
        left: Operand,
        right: Operand,
        #[serde(default = "inclusive_default")]
        inclusive: (bool, bool),
        #[serde(default)]
        na_pass: bool,
    },
    ColValsOutside {
        left: Operand,
        right: Operand,
        #[serde(default = "inclusive_default")]
        inclusive: (bool, bool),
        #[serde(default)]
        na_pass: bool,
    },
    ColValsInSet {
        set: Vec<Literal>,
    },
    ColValsNotInSet {
        set: Vec<Literal>,
    },
    ColValsNull,
    ColValsNotNull,
    ColValsRegex {
        pattern: String,
        #[serde(default)]
        na_pass: bool,
    },
    ColValsExpr {
        expr: String,
    },
    RowsDistinct,
    RowsComplete,
    ColExists,
    ColSchemaMatch {
        schema: SchemaSpec,
        #[serde(default)]
        options: SchemaMatchOptions,
    },
    Conjointly {
        expressions: Vec<String>,
    },
    RowCountMatch {
        count: u64,
    },
    ColCountMatch {
        count: usize,
    },
}

impl CheckKind {
    /// The check's name as it appears in reports and extract file names.
    pub fn name(&self) -> &'static str {
        match self {
            CheckKind::ColValsGt { .. } => "col_vals_gt",
            CheckKind::ColValsLt { .. } => "col_vals_lt",
            CheckKind::ColValsGe { .. } => "col_vals_ge",
            CheckKind::ColValsLe { .. } => "col_vals_le",
            CheckKind::ColValsEq { .. } => "col_vals_eq",
            CheckKind::ColValsNe { .. } => "col_vals_ne",
            CheckKind::ColValsBetween { .. } => "col_vals_between",
            CheckKind::ColValsOutside { .. } => "col_vals_outside",
            CheckKind::ColValsInSet { .. } => "col_vals_in_set",
            CheckKind::ColValsNotInSet { .. } => "col_vals_not_in_set",
            CheckKind::ColValsNull => "col_vals_null",
            CheckKind::ColValsNotNull => "col_vals_not_null",
            CheckKind::ColValsRegex { .. } => "col_vals_regex",
            CheckKind::ColValsExpr { .. } => "col_vals_expr",
            CheckKind::RowsDistinct => "rows_distinct",
            CheckKind::RowsComplete => "rows_complete",
            CheckKind::ColExists => "col_exists",
            CheckKind::ColSchemaMatch { .. } => "col_schema_match",
            CheckKind::Conjointly { .. } => "conjointly",
            CheckKind::RowCountMatch { .. } => "row_count_match",
            CheckKind::ColCountMatch { .. } => "col_count_match",
        }
    }

    /// The operator and operand of a simple comparison check.
    pub fn comparison(&self) -> Option<(CompareOp, &Operand, bool)> {
        match self {
            CheckKind::ColValsGt { value, na_pass } => Some((CompareOp::Gt, value, *na_pass)),
            CheckKind::ColValsLt { value, na_pass } => Some((CompareOp::Lt, value, *na_pass)),
            CheckKind::ColValsGe { value, na_pass } => Some((CompareOp::Ge, value, *na_pass)),
            CheckKind::ColValsLe { value, na_pass } => Some((CompareOp::Le, value, *na_pass)),
            CheckKind::ColValsEq { value, na_pass } => Some((CompareOp::Eq, value, *na_pass)),
            CheckKind::ColValsNe { value, na_pass } => Some((CompareOp::Ne, value, *na_pass)),
            _ => None,
        }
    }

    /// Whether one atomic step is produced per resolved column.
    ///
    /// Other kinds treat their resolved columns as a single subset and expand
    /// by segment only.
    pub fn expands_by_column(&self) -> bool {
        matches!(
            self,
            CheckKind::ColValsGt { .. }
                | CheckKind::ColValsLt { .. }
                | CheckKind::ColValsGe { .. }
                | CheckKind::ColValsLe { .. }
                | CheckKind::ColValsEq { .. }
                | CheckKind::ColValsNe { .. }
                | CheckKind::ColValsBetween { .. }
                | CheckKind::ColValsOutside { .. }
                | CheckKind::ColValsInSet { .. }
                | CheckKind::ColValsNotInSet { .. }
                | CheckKind::ColValsNull
                | CheckKind::ColValsNotNull
                | CheckKind::ColValsRegex { .. }
                | CheckKind::ColExists
        )
    }

    /// Whether missing literal column names are reported by the check itself
    /// rather than failing resolution.
    pub fn tolerates_missing_columns(&self) -> bool {
        matches!(self, CheckKind::ColExists)
    }

    /// Short description of the values a check compares against.
    pub fn values_description(&self) -> Option<String> {
        if let Some((_, value, _)) = self.comparison() {
            return Some(value.to_string());
        }
        match self {
            CheckKind::ColValsBetween {
                left,
                right,
                inclusive,
                ..
            }
            | CheckKind::ColValsOutside {
                left,
                right,
                inclusive,
                ..
            } => Some(format!(
                "{}{left}, {right}{}",
                if inclusive.0 { "[" } else { "(" },
                if inclusive.1 { "]" } else { ")" }
            )),
            CheckKind::ColValsInSet { set } | CheckKind::ColValsNotInSet { set } => Some(format!(
                "{{{}}}",
                set.iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            CheckKind::ColValsRegex { pattern, .. } => Some(pattern.clone()),
            CheckKind::ColValsExpr { expr } => Some(expr.clone()),
            CheckKind::Conjointly { expressions } => Some(expressions.join(" AND ")),
            CheckKind::ColSchemaMatch { schema, .. } => {
                Some(format!("{} columns", schema.columns.len()))
            }
            CheckKind::RowCountMatch { count } => Some(count.to_string()),
            CheckKind::ColCountMatch { count } => Some(count.to_string()),
            _ => None,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let Some((_, value, _)) = self.comparison() {
            return value.validate();
        }
        match self {
            CheckKind::ColValsBetween { left, right, .. }
            | CheckKind::ColValsOutside { left, right, .. } => {
                left.validate()?;
                right.validate()
            }
            CheckKind::ColValsInSet { set } | CheckKind::ColValsNotInSet { set } => {
                if set.is_empty() {
                    return Err(TermError::Configuration(format!(
                        "{} needs at least one value",
                        self.name()
                    )));
                }
                set.iter().try_for_each(Literal::validate)
            }
            CheckKind::ColValsRegex { pattern, .. } => {
                SqlSecurity::validate_regex_pattern(pattern).map(|_| ())
            }
            CheckKind::ColValsExpr { expr } => SqlSecurity::validate_sql_expression(expr),
            CheckKind::Conjointly { expressions } => {
                if expressions.is_empty() {
                    return Err(TermError::Configuration(
                        "conjointly needs at least one expression".to_string(),
                    ));
                }
                expressions
                    .iter()
                    .try_for_each(|expr| SqlSecurity::validate_sql_expression(expr))
            }
            CheckKind::ColSchemaMatch { schema, .. } => schema.validate(),
            _ => Ok(()),
        }
    }

    fn set_na_pass(&mut self, value: bool) -> bool {
        match self {
            CheckKind::ColValsGt { na_pass, .. }
            | CheckKind::ColValsLt { na_pass, .. }
            | CheckKind::ColValsGe { na_pass, .. }
            | CheckKind::ColValsLe { na_pass, .. }
            | CheckKind::ColValsEq { na_pass, .. }
            | CheckKind::ColValsNe { na_pass, .. }
            | CheckKind::ColValsBetween { na_pass, .. }
            | CheckKind::ColValsOutside { na_pass, .. }
            | CheckKind::ColValsRegex { na_pass, .. } => {
                *na_pass = value;
                true
            }
            _ => false,
        }
    }
}

/// Transformation applied to the table before a step is evaluated.
pub type PreprocessFn = Arc<dyn Fn(DataFrame) -> datafusion::error::Result<DataFrame> + Send + Sync>;

/// Preprocessing for one authored step.
///
/// The result is registered as a derived view; the source table is never
/// modified.
#[derive(Clone, Deserialize)]
#[serde(from = "String")]
pub enum Preprocessor {
    /// A query whose `{tbl}` placeholder is replaced by the source table
    Sql(String),
    /// A transformation of the source table's `DataFrame`
    Function(PreprocessFn),
}

impl From<String> for Preprocessor {
    fn from(sql: String) -> Self {
        Preprocessor::Sql(sql)
    }
}

impl fmt::Debug for Preprocessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preprocessor::Sql(sql) => f.debug_tuple("Sql").field(sql).finish(),
            Preprocessor::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl Preprocessor {
    /// Registers the preprocessed table as `view`.
    ///
    /// Queries run read-only: DDL, DML and other statements are rejected, so
    /// the source table is never changed.
    pub async fn apply(&self, ctx: &SessionContext, table: &str, view: &str) -> Result<()> {
        let df = match self {
            Preprocessor::Sql(sql) => {
                let sql = sql.replace("{tbl}", SqlSecurity::table_reference(table)?);
                let read_only = SQLOptions::new()
                    .with_allow_ddl(false)
                    .with_allow_dml(false)
                    .with_allow_statements(false);
                ctx.sql_with_options(&sql, read_only).await?
            }
            Preprocessor::Function(transform) => transform(ctx.table(table).await?)?,
        };
        ctx.register_table(view, df.into_view())?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        match self {
            Preprocessor::Sql(sql) if sql.trim().is_empty() => Err(TermError::Configuration(
                "Preprocessing query cannot be empty".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

fn active_default() -> bool {
    true
}

/// One declared validation step.
///
/// # Examples
///
/// ```rust
/// use term_interrogate::core::AuthoredStep;
/// use term_interrogate::selectors::{ColumnSelector, SegmentSpec};
///
/// let step = AuthoredStep::col_vals_gt(ColumnSelector::starts_with("amount"), 0)
///     .segments(SegmentSpec::column("region"))
///     .brief("{col} must be positive in {seg}");
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AuthoredStep {
    #[serde(flatten)]
    kind: CheckKind,
    #[serde(default)]
    columns: Option<ColumnSpec>,
    #[serde(default)]
    segments: Option<SegmentSpec>,
    #[serde(default)]
    pre: Option<Preprocessor>,
    #[serde(default)]
    thresholds: Option<Thresholds>,
    #[serde(default)]
    actions: Option<Actions>,
    #[serde(default)]
    brief: Option<String>,
    #[serde(default = "active_default")]
    active: bool,
}

macro_rules! comparison_constructor {
    ($(#[$doc:meta])* $fn_name:ident, $variant:ident) => {
        $(#[$doc])*
        pub fn $fn_name(columns: impl Into<ColumnSpec>, value: impl Into<Operand>) -> Self {
            Self::with_columns(
                CheckKind::$variant {
                    value: value.into(),
                    na_pass: false,
                },
                columns,
            )
        }
    };
}

impl AuthoredStep {
    /// Creates a step from a check kind with no columns.
    pub fn new(kind: CheckKind) -> Self {
        Self {
            kind,
            columns: None,
            segments: None,
            pre: None,
            thresholds: None,
            actions: None,
            brief: None,
            active: true,
        }
    }

    fn with_columns(kind: CheckKind, columns: impl Into<ColumnSpec>) -> Self {
        Self::new(kind).columns(columns)
    }

    comparison_constructor!(
        /// Values must be greater than `value`.
        col_vals_gt,
        ColValsGt
    );
    comparison_constructor!(
        /// Values must be less than `value`.
        col_vals_lt,
        ColValsLt
    );
    comparison_constructor!(
        /// Values must be greater than or equal to `value`.
        col_vals_ge,
        ColValsGe
    );
    comparison_constructor!(
        /// Values must be less than or equal to `value`.
        col_vals_le,
        ColValsLe
    );
    comparison_constructor!(
        /// Values must equal `value`.
        col_vals_eq,
        ColValsEq
    );
    comparison_constructor!(
        /// Values must differ from `value`.
        col_vals_ne,
        ColValsNe
    );

    /// Values must lie between `left` and `right` (inclusive by default).
    pub fn col_vals_between(
        columns: impl Into<ColumnSpec>,
        left: impl Into<Operand>,
        right: impl Into<Operand>,
    ) -> Self {
        Self::with_columns(
            CheckKind::ColValsBetween {
                left: left.into(),
                right: right.into(),
                inclusive: inclusive_default(),
                na_pass: false,
            },
            columns,
        )
    }

    /// Values must lie outside `left` and `right`.
    pub fn col_vals_outside(
        columns: impl Into<ColumnSpec>,
        left: impl Into<Operand>,
        right: impl Into<Operand>,
    ) -> Self {
        Self::with_columns(
            CheckKind::ColValsOutside {
                left: left.into(),
                right: right.into(),
                inclusive: inclusive_default(),
                na_pass: false,
            },
            columns,
        )
    }

    pub fn col_vals_in_set<I, V>(columns: impl Into<ColumnSpec>, set: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        Self::with_columns(
            CheckKind::ColValsInSet {
                set: set.into_iter().map(Into::into).collect(),
            },
            columns,
        )
    }

    pub fn col_vals_not_in_set<I, V>(columns: impl Into<ColumnSpec>, set: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        Self::with_columns(
            CheckKind::ColValsNotInSet {
                set: set.into_iter().map(Into::into).collect(),
            },
            columns,
        )
    }

    pub fn col_vals_null(columns: impl Into<ColumnSpec>) -> Self {
        Self::with_columns(CheckKind::ColValsNull, columns)
    }

    pub fn col_vals_not_null(columns: impl Into<ColumnSpec>) -> Self {
        Self::with_columns(CheckKind::ColValsNotNull, columns)
    }

    /// Values, cast to text, must match a regular expression.
    pub fn col_vals_regex(columns: impl Into<ColumnSpec>, pattern: impl Into<String>) -> Self {
        Self::with_columns(
            CheckKind::ColValsRegex {
                pattern: pattern.into(),
                na_pass: false,
            },
            columns,
        )
    }

    /// Every row must satisfy a SQL boolean expression.
    pub fn col_vals_expr(expr: impl Into<String>) -> Self {
        Self::new(CheckKind::ColValsExpr { expr: expr.into() })
    }

    /// Rows must be distinct across all columns; narrow with [`columns`](Self::columns).
    pub fn rows_distinct() -> Self {
        Self::new(CheckKind::RowsDistinct)
    }

    /// Rows must have no nulls; narrow with [`columns`](Self::columns).
    pub fn rows_complete() -> Self {
        Self::new(CheckKind::RowsComplete)
    }

    pub fn col_exists(columns: impl Into<ColumnSpec>) -> Self {
        Self::with_columns(CheckKind::ColExists, columns)
    }

    pub fn col_schema_match(schema: SchemaSpec, options: SchemaMatchOptions) -> Self {
        Self::new(CheckKind::ColSchemaMatch { schema, options })
    }

    /// Every row must satisfy all of the given SQL boolean expressions.
    pub fn conjointly<I, S>(expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(CheckKind::Conjointly {
            expressions: expressions.into_iter().map(Into::into).collect(),
        })
    }

    pub fn row_count_match(count: u64) -> Self {
        Self::new(CheckKind::RowCountMatch { count })
    }

    pub fn col_count_match(count: usize) -> Self {
        Self::new(CheckKind::ColCountMatch { count })
    }

    /// Sets the columns, or the column subset for whole-table checks.
    pub fn columns(mut self, columns: impl Into<ColumnSpec>) -> Self {
        self.columns = Some(columns.into());
        self
    }

    pub fn segments(mut self, segments: SegmentSpec) -> Self {
        self.segments = Some(segments);
        self
    }

    /// Lets null values pass. Has no effect on checks without an `na_pass` option.
    pub fn na_pass(mut self, na_pass: bool) -> Self {
        self.kind.set_na_pass(na_pass);
        self
    }

    /// Sets bound inclusivity for `col_vals_between` and `col_vals_outside`.
    pub fn inclusive(mut self, left: bool, right: bool) -> Self {
        if let CheckKind::ColValsBetween { inclusive, .. }
        | CheckKind::ColValsOutside { inclusive, .. } = &mut self.kind
        {
            *inclusive = (left, right);
        }
        self
    }

    /// Preprocesses the table with a SQL query using `{tbl}` for the source.
    pub fn pre_sql(mut self, sql: impl Into<String>) -> Self {
        self.pre = Some(Preprocessor::Sql(sql.into()));
        self
    }

    /// Preprocesses the table with a `DataFrame` transformation.
    pub fn pre<F>(mut self, transform: F) -> Self
    where
        F: Fn(DataFrame) -> datafusion::error::Result<DataFrame> + Send + Sync + 'static,
    {
        self.pre = Some(Preprocessor::Function(Arc::new(transform)));
        self
    }

    /// Replaces the plan thresholds for this step.
    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    /// Replaces the plan actions for this step.
    pub fn actions(mut self, actions: Actions) -> Self {
        self.actions = Some(actions);
        self
    }

    /// Sets a brief template; `{col}`, `{step}` and `{seg}` are substituted.
    pub fn brief(mut self, brief: impl Into<String>) -> Self {
        self.brief = Some(brief.into());
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn kind(&self) -> &CheckKind {
        &self.kind
    }

    pub fn column_spec(&self) -> Option<&ColumnSpec> {
        self.columns.as_ref()
    }

    pub fn segment_spec(&self) -> Option<&SegmentSpec> {
        self.segments.as_ref()
    }

    pub fn preprocessor(&self) -> Option<&Preprocessor> {
        self.pre.as_ref()
    }

    pub fn step_thresholds(&self) -> Option<&Thresholds> {
        self.thresholds.as_ref()
    }

    pub fn step_actions(&self) -> Option<&Actions> {
        self.actions.as_ref()
    }

    pub fn brief_template(&self) -> Option<&str> {
        self.brief.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Checks the step's configuration without touching any data.
    pub fn validate(&self) -> Result<()> {
        self.kind.validate()?;

        if self.kind.expands_by_column() && self.columns.is_none() {
            return Err(TermError::Configuration(format!(
                "{} requires a column specification",
                self.kind.name()
            )));
        }

        if let Some(columns) = &self.columns {
            columns.validate()?;
        }
        if let Some(segments) = &self.segments {
            segments.validate()?;
        }
        if let Some(pre) = &self.pre {
            pre.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_and_names() {
        let step = AuthoredStep::col_vals_gt("a", 5).na_pass(true);
        assert_eq!(step.kind().name(), "col_vals_gt");
        assert_eq!(
            step.kind().comparison(),
            Some((CompareOp::Gt, &Operand::from(5), true))
        );

        let step = AuthoredStep::col_vals_between("a", 1, 10).inclusive(false, true);
        assert_eq!(
            step.kind().values_description().as_deref(),
            Some("(1, 10]")
        );

        assert_eq!(
            AuthoredStep::col_vals_in_set("region", ["north", "south"])
                .kind()
                .values_description()
                .as_deref(),
            Some("{north, south}")
        );
    }

    #[test]
    fn test_expansion_kinds() {
        assert!(AuthoredStep::col_vals_not_null("a").kind().expands_by_column());
        assert!(AuthoredStep::col_exists("a").kind().expands_by_column());
        assert!(!AuthoredStep::rows_distinct().kind().expands_by_column());
        assert!(!AuthoredStep::col_vals_expr("a > b").kind().expands_by_column());
        assert!(!AuthoredStep::row_count_match(3).kind().expands_by_column());
    }

    #[test]
    fn test_validation() {
        assert!(AuthoredStep::col_vals_gt("a", 5).validate().is_ok());
        assert!(AuthoredStep::col_vals_gt("a", f64::NAN).validate().is_err());
        assert!(AuthoredStep::col_vals_in_set("a", Vec::<i64>::new())
            .validate()
            .is_err());
        assert!(AuthoredStep::col_vals_regex("a", "[bad").validate().is_err());
        assert!(AuthoredStep::col_vals_expr("a > 1; DROP TABLE t")
            .validate()
            .is_err());
        assert!(AuthoredStep::conjointly(Vec::<String>::new())
            .validate()
            .is_err());
        assert!(AuthoredStep::new(CheckKind::ColValsNotNull)
            .validate()
            .is_err());
        assert!(AuthoredStep::rows_distinct().pre_sql("  ").validate().is_err());
    }

    #[test]
    fn test_step_deserialize() {
        let step: AuthoredStep = serde_json::from_str(
            r#"{
                "check": "col_vals_between",
                "columns": ["a", "b"],
                "left": 0,
                "right": {"column": "limit"},
                "inclusive": [true, false],
                "segments": "region",
                "thresholds": {"warning": 1, "error": 0.5},
                "brief": "{col} in range"
            }"#,
        )
        .unwrap();

        assert_eq!(
            step.kind(),
            &CheckKind::ColValsBetween {
                left: Operand::from(0),
                right: Operand::column("limit"),
                inclusive: (true, false),
                na_pass: false,
            }
        );
        assert_eq!(step.column_spec(), Some(&ColumnSpec::from(vec!["a", "b"])));
        assert_eq!(step.segment_spec(), Some(&SegmentSpec::column("region")));
        assert!(step.step_thresholds().is_some());
        assert!(step.is_active());

        let step: AuthoredStep =
            serde_json::from_str(r#"{"check": "rows_distinct", "active": false}"#).unwrap();
        assert_eq!(step.kind(), &CheckKind::RowsDistinct);
        assert!(!step.is_active());

        let step: AuthoredStep = serde_json::from_str(
            r#"{"check": "col_vals_gt", "columns": "a", "value": 1, "pre": "SELECT * FROM {tbl} WHERE a > 0"}"#,
        )
        .unwrap();
        assert!(matches!(step.preprocessor(), Some(Preprocessor::Sql(_))));
    }
}
