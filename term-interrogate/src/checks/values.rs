//! Column value checks: one test unit per row.
//!
//! A null in the checked column (or in a referenced column) fails the row
//! unless `na_pass` is set.

use super::{current_table, null_aware, tally_rows};
use crate::core::{CompareOp, Constraint, Literal, Operand, Tally};
use crate::error::Result;
use crate::security::SqlSecurity;
use async_trait::async_trait;
use datafusion::prelude::*;
use tracing::instrument;

fn quoted_operands(column: &str, operands: &[&Operand]) -> Result<Vec<String>> {
    let mut nullable = vec![SqlSecurity::quote_identifier(column)?];
    for operand in operands {
        if let Some(other) = operand.column_name() {
            nullable.push(SqlSecurity::quote_identifier(other)?);
        }
    }
    Ok(nullable)
}

/// `col_vals_gt`, `col_vals_lt`, `col_vals_ge`, `col_vals_le`, `col_vals_eq`
/// and `col_vals_ne`.
///
/// Every row is a test unit. The right-hand side is either a literal or
/// another column of the same row, so `amount > 0` and `shipped >= ordered`
/// are both a single comparison check.
///
/// # Examples
///
/// ```rust
/// use term_interrogate::checks::ComparisonCheck;
/// use term_interrogate::core::{CompareOp, Constraint, Operand};
///
/// // amount > 0, nulls fail
/// let positive = ComparisonCheck::new("amount", CompareOp::Gt, Operand::from(0), false);
/// assert_eq!(positive.name(), "col_vals_gt");
///
/// // shipped >= ordered, rows missing either date pass
/// let ordered = ComparisonCheck::new("shipped", CompareOp::Ge, Operand::column("ordered"), true);
/// assert_eq!(ordered.name(), "col_vals_ge");
/// ```
#[derive(Debug, Clone)]
pub struct ComparisonCheck {
    column: String,
    op: CompareOp,
    value: Operand,
    na_pass: bool,
}

impl ComparisonCheck {
    /// Creates a comparison of `column` against `value`.
    ///
    /// # Arguments
    ///
    /// * `column` - The column whose values are compared
    /// * `op` - The comparison operator; it also decides the check name
    /// * `value` - A literal, or a column reference via [`Operand::column`]
    /// * `na_pass` - Whether a null in `column` or in a referenced column passes
    pub fn new(column: impl Into<String>, op: CompareOp, value: Operand, na_pass: bool) -> Self {
        Self {
            column: column.into(),
            op,
            value,
            na_pass,
        }
    }

    fn predicate(&self) -> Result<String> {
        let column = SqlSecurity::quote_identifier(&self.column)?;
        let comparison = format!("{column} {} {}", self.op.as_sql(), self.value.to_sql()?);
        Ok(null_aware(
            &comparison,
            &quoted_operands(&self.column, &[&self.value])?,
            self.na_pass,
        ))
    }
}

#[async_trait]
impl Constraint for ComparisonCheck {
    #[instrument(skip(self, ctx), fields(check.name = %self.name(), check.column = %self.column))]
    async fn evaluate(&self, ctx: &SessionContext) -> Result<Tally> {
        tally_rows(ctx, self.name(), &current_table()?, &self.predicate()?).await
    }

    fn name(&self) -> &str {
        match self.op {
            CompareOp::Gt => "col_vals_gt",
            CompareOp::Lt => "col_vals_lt",
            CompareOp::Ge => "col_vals_ge",
            CompareOp::Le => "col_vals_le",
            CompareOp::Eq => "col_vals_eq",
            CompareOp::Ne => "col_vals_ne",
        }
    }

    fn pass_predicate(&self) -> Result<Option<String>> {
        self.predicate().map(Some)
    }
}

/// `col_vals_between` and `col_vals_outside`.
///
/// Each bound is a literal or a column reference, and each can be inclusive
/// or exclusive independently.
///
/// # Examples
///
/// ```rust
/// use term_interrogate::checks::RangeCheck;
/// use term_interrogate::core::{Constraint, Operand};
///
/// // 0 <= score < 100
/// let score = RangeCheck::between("score", Operand::from(0), Operand::from(100), (true, false), false);
/// assert_eq!(score.name(), "col_vals_between");
///
/// // temperature outside [-10, 40]: exactly -10 fails
/// let extreme = RangeCheck::outside("temp", Operand::from(-10), Operand::from(40), (true, true), false);
/// assert_eq!(extreme.name(), "col_vals_outside");
/// ```
#[derive(Debug, Clone)]
pub struct RangeCheck {
    column: String,
    left: Operand,
    right: Operand,
    inclusive: (bool, bool),
    na_pass: bool,
    outside: bool,
}

impl RangeCheck {
    /// Values pass when they fall inside the range.
    ///
    /// # Arguments
    ///
    /// * `column` - The column whose values are checked
    /// * `left`, `right` - The lower and upper bounds
    /// * `inclusive` - Whether the `(left, right)` bounds belong to the range
    /// * `na_pass` - Whether a null value or a null bound passes
    pub fn between(
        column: impl Into<String>,
        left: Operand,
        right: Operand,
        inclusive: (bool, bool),
        na_pass: bool,
    ) -> Self {
        Self {
            column: column.into(),
            left,
            right,
            inclusive,
            na_pass,
            outside: false,
        }
    }

    /// Values pass when they fall outside the range; an inclusive bound
    /// belongs to the range, so a value equal to it fails.
    pub fn outside(
        column: impl Into<String>,
        left: Operand,
        right: Operand,
        inclusive: (bool, bool),
        na_pass: bool,
    ) -> Self {
        Self {
            outside: true,
            ..Self::between(column, left, right, inclusive, na_pass)
        }
    }

    fn predicate(&self) -> Result<String> {
        let column = SqlSecurity::quote_identifier(&self.column)?;
        let left = self.left.to_sql()?;
        let right = self.right.to_sql()?;
        let (left_incl, right_incl) = self.inclusive;

        let range = if self.outside {
            let below = if left_incl { "<" } else { "<=" };
            let above = if right_incl { ">" } else { ">=" };
            format!("{column} {below} {left} OR {column} {above} {right}")
        } else {
            let lower = if left_incl { ">=" } else { ">" };
            let upper = if right_incl { "<=" } else { "<" };
            format!("{column} {lower} {left} AND {column} {upper} {right}")
        };

        Ok(null_aware(
            &range,
            &quoted_operands(&self.column, &[&self.left, &self.right])?,
            self.na_pass,
        ))
    }
}

#[async_trait]
impl Constraint for RangeCheck {
    #[instrument(skip(self, ctx), fields(check.name = %self.name(), check.column = %self.column))]
    async fn evaluate(&self, ctx: &SessionContext) -> Result<Tally> {
        tally_rows(ctx, self.name(), &current_table()?, &self.predicate()?).await
    }

    fn name(&self) -> &str {
        if self.outside {
            "col_vals_outside"
        } else {
            "col_vals_between"
        }
    }

    fn pass_predicate(&self) -> Result<Option<String>> {
        self.predicate().map(Some)
    }
}

/// `col_vals_in_set` and `col_vals_not_in_set`.
///
/// Nulls always fail: a null is neither in nor out of a set of literals.
///
/// # Examples
///
/// ```rust
/// use term_interrogate::checks::SetCheck;
/// use term_interrogate::core::{Constraint, Literal};
///
/// let status = SetCheck::in_set("status", vec![Literal::from("open"), Literal::from("closed")]);
/// assert_eq!(status.name(), "col_vals_in_set");
///
/// let no_test_ids = SetCheck::not_in_set("user_id", vec![Literal::from(0), Literal::from(-1)]);
/// assert_eq!(no_test_ids.name(), "col_vals_not_in_set");
/// ```
#[derive(Debug, Clone)]
pub struct SetCheck {
    column: String,
    set: Vec<Literal>,
    negate: bool,
}

impl SetCheck {
    /// Values pass when they equal one of the literals in `set`.
    pub fn in_set(column: impl Into<String>, set: Vec<Literal>) -> Self {
        Self {
            column: column.into(),
            set,
            negate: false,
        }
    }

    /// Values pass when they equal none of the literals in `set`.
    pub fn not_in_set(column: impl Into<String>, set: Vec<Literal>) -> Self {
        Self {
            negate: true,
            ..Self::in_set(column, set)
        }
    }

    fn predicate(&self) -> Result<String> {
        let column = SqlSecurity::quote_identifier(&self.column)?;
        let values = self
            .set
            .iter()
            .map(Literal::to_sql)
            .collect::<Vec<_>>()
            .join(", ");
        let membership = if self.negate {
            format!("{column} NOT IN ({values})")
        } else {
            format!("{column} IN ({values})")
        };
        Ok(null_aware(&membership, &[column], false))
    }
}

#[async_trait]
impl Constraint for SetCheck {
    #[instrument(skip(self, ctx), fields(check.name = %self.name(), check.column = %self.column))]
    async fn evaluate(&self, ctx: &SessionContext) -> Result<Tally> {
        tally_rows(ctx, self.name(), &current_table()?, &self.predicate()?).await
    }

    fn name(&self) -> &str {
        if self.negate {
            "col_vals_not_in_set"
        } else {
            "col_vals_in_set"
        }
    }

    fn pass_predicate(&self) -> Result<Option<String>> {
        self.predicate().map(Some)
    }
}

/// `col_vals_null` and `col_vals_not_null`.
///
/// These checks have no `na_pass` setting since nulls are what they test.
///
/// ```rust
/// use term_interrogate::checks::NullCheck;
/// use term_interrogate::core::Constraint;
///
/// assert_eq!(NullCheck::not_null("email").name(), "col_vals_not_null");
/// assert_eq!(NullCheck::null("deleted_at").name(), "col_vals_null");
/// ```
#[derive(Debug, Clone)]
pub struct NullCheck {
    column: String,
    expect_null: bool,
}

impl NullCheck {
    /// Rows pass when `column` is null.
    pub fn null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            expect_null: true,
        }
    }

    /// Rows pass when `column` holds a value.
    pub fn not_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            expect_null: false,
        }
    }

    fn predicate(&self) -> Result<String> {
        let column = SqlSecurity::quote_identifier(&self.column)?;
        Ok(if self.expect_null {
            format!("({column} IS NULL)")
        } else {
            format!("({column} IS NOT NULL)")
        })
    }
}

#[async_trait]
impl Constraint for NullCheck {
    #[instrument(skip(self, ctx), fields(check.name = %self.name(), check.column = %self.column))]
    async fn evaluate(&self, ctx: &SessionContext) -> Result<Tally> {
        tally_rows(ctx, self.name(), &current_table()?, &self.predicate()?).await
    }

    fn name(&self) -> &str {
        if self.expect_null {
            "col_vals_null"
        } else {
            "col_vals_not_null"
        }
    }

    fn pass_predicate(&self) -> Result<Option<String>> {
        self.predicate().map(Some)
    }
}

/// `col_vals_regex`: values are cast to text and matched against a pattern.
///
/// The match is unanchored; use `^` and `$` to match the whole value.
/// Patterns prone to catastrophic backtracking are rejected when the check
/// is evaluated.
///
/// ```rust
/// use term_interrogate::checks::RegexCheck;
/// use term_interrogate::core::Constraint;
///
/// let sku = RegexCheck::new("sku", r"^[A-Z]{3}-[0-9]{4}$", false);
/// assert_eq!(sku.name(), "col_vals_regex");
/// ```
#[derive(Debug, Clone)]
pub struct RegexCheck {
    column: String,
    pattern: String,
    na_pass: bool,
}

impl RegexCheck {
    /// Creates a regex check; `na_pass` lets null values pass.
    pub fn new(column: impl Into<String>, pattern: impl Into<String>, na_pass: bool) -> Self {
        Self {
            column: column.into(),
            pattern: pattern.into(),
            na_pass,
        }
    }

    fn predicate(&self) -> Result<String> {
        let column = SqlSecurity::quote_identifier(&self.column)?;
        let pattern = SqlSecurity::validate_regex_pattern(&self.pattern)?;
        Ok(null_aware(
            &format!("CAST({column} AS VARCHAR) ~ '{pattern}'"),
            &[column],
            self.na_pass,
        ))
    }
}

#[async_trait]
impl Constraint for RegexCheck {
    #[instrument(skip(self, ctx), fields(check.name = %self.name(), check.column = %self.column))]
    async fn evaluate(&self, ctx: &SessionContext) -> Result<Tally> {
        tally_rows(ctx, self.name(), &current_table()?, &self.predicate()?).await
    }

    fn name(&self) -> &str {
        "col_vals_regex"
    }

    fn pass_predicate(&self) -> Result<Option<String>> {
        self.predicate().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{evaluate_with_context, numbers_context};

    #[tokio::test]
    async fn test_comparison_counts_nulls_as_failures() {
        // a = [1, 4, 6, 9, null]
        let ctx = numbers_context().await;
        let check = ComparisonCheck::new("a", CompareOp::Gt, Operand::from(5), false);
        let tally = evaluate_with_context(&check, &ctx, "numbers").await.unwrap();
        assert_eq!(tally.total, 5);
        assert_eq!(tally.failed, 3);

        let check = ComparisonCheck::new("a", CompareOp::Gt, Operand::from(5), true);
        let tally = evaluate_with_context(&check, &ctx, "numbers").await.unwrap();
        assert_eq!(tally.failed, 2);
    }

    #[tokio::test]
    async fn test_comparison_against_column() {
        // b = [0, 5, 5, 10, 1]
        let ctx = numbers_context().await;
        let check = ComparisonCheck::new("a", CompareOp::Ge, Operand::column("b"), false);
        let tally = evaluate_with_context(&check, &ctx, "numbers").await.unwrap();
        // 1>=0 pass, 4>=5 fail, 6>=5 pass, 9>=10 fail, null fail
        assert_eq!(tally.failed, 3);
    }

    #[tokio::test]
    async fn test_range_checks() {
        let ctx = numbers_context().await;

        let between = RangeCheck::between("a", 4.into(), 6.into(), (true, true), false);
        let tally = evaluate_with_context(&between, &ctx, "numbers").await.unwrap();
        assert_eq!(tally.failed, 3);

        let exclusive = RangeCheck::between("a", 4.into(), 6.into(), (false, false), false);
        let tally = evaluate_with_context(&exclusive, &ctx, "numbers").await.unwrap();
        assert_eq!(tally.failed, 5);

        let outside = RangeCheck::outside("a", 4.into(), 6.into(), (true, true), true);
        let tally = evaluate_with_context(&outside, &ctx, "numbers").await.unwrap();
        // 1 and 9 pass, 4 and 6 fail, null passes with na_pass
        assert_eq!(tally.failed, 2);
    }

    #[tokio::test]
    async fn test_set_and_null_checks() {
        let ctx = numbers_context().await;

        let in_set = SetCheck::in_set("label", vec!["x".into(), "y".into()]);
        let tally = evaluate_with_context(&in_set, &ctx, "numbers").await.unwrap();
        // label = [x, y, z, x, null]
        assert_eq!(tally.failed, 2);

        let not_in_set = SetCheck::not_in_set("label", vec!["z".into()]);
        let tally = evaluate_with_context(&not_in_set, &ctx, "numbers").await.unwrap();
        assert_eq!(tally.failed, 2);

        let nulls = NullCheck::null("a");
        let tally = evaluate_with_context(&nulls, &ctx, "numbers").await.unwrap();
        assert_eq!(tally.failed, 4);

        let not_null = NullCheck::not_null("a");
        let tally = evaluate_with_context(&not_null, &ctx, "numbers").await.unwrap();
        assert_eq!(tally.failed, 1);
    }

    #[tokio::test]
    async fn test_regex_check() {
        let ctx = numbers_context().await;
        let check = RegexCheck::new("label", "^[xy]$", false);
        let tally = evaluate_with_context(&check, &ctx, "numbers").await.unwrap();
        assert_eq!(tally.failed, 2);
    }

    #[tokio::test]
    async fn test_extract_holds_failing_rows() {
        let ctx = numbers_context().await;
        let check = ComparisonCheck::new("a", CompareOp::Gt, Operand::from(5), false);
        let tally = evaluate_with_context(&check, &ctx, "numbers").await.unwrap();
        let extract = tally.extract.unwrap();
        assert_eq!(extract.num_rows(), 3);
        assert_eq!(extract.num_columns(), 3);
    }

    #[tokio::test]
    async fn test_extract_samples_rows_when_nothing_fails() {
        let ctx = numbers_context().await;
        let check = ComparisonCheck::new("b", CompareOp::Ge, Operand::from(0), false);
        let tally = evaluate_with_context(&check, &ctx, "numbers").await.unwrap();
        assert_eq!(tally.failed, 0);
        assert_eq!(tally.extract.unwrap().num_rows(), 5);
    }
}
