//! Check implementations.
//!
//! Every [`CheckKind`] maps to a type implementing
//! [`Constraint`](crate::core::Constraint). Row-level checks reduce to a pass
//! predicate evaluated by one counting query; table-level checks inspect the
//! schema or row count directly.
//!
//! | Module | Checks |
//! |--------|--------|
//! | [`values`] | `col_vals_gt` .. `col_vals_regex` |
//! | [`rows`] | `rows_distinct`, `rows_complete` |
//! | [`expressions`] | `col_vals_expr`, `conjointly` |
//! | [`schema`] | `col_exists`, `col_schema_match`, `col_count_match` |
//! | [`counts`] | `row_count_match` |

use crate::core::{current_validation_context, BoxedConstraint, CheckKind, Tally};
use crate::error::{Result, TermError};
use crate::security::SqlSecurity;
use arrow::array::{Array, Int64Array};
use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use datafusion::prelude::*;
use tracing::debug;

pub mod counts;
pub mod expressions;
pub mod rows;
pub mod schema;
pub mod values;

pub use counts::RowCountCheck;
pub use expressions::ExpressionCheck;
pub use rows::{RowsCompleteCheck, RowsDistinctCheck};
pub use schema::{
    ColumnCountCheck, ColumnExistsCheck, DtypeSpec, SchemaColumn, SchemaDiff, SchemaMatchCheck,
    SchemaMatchOptions, SchemaSpec, TypeMismatch,
};
pub use values::{ComparisonCheck, NullCheck, RangeCheck, RegexCheck, SetCheck};

/// Builds the check for one atomic step.
///
/// Column-expanding kinds receive exactly one column; whole-table kinds
/// receive their full column subset.
pub fn constraint_for(kind: &CheckKind, columns: &[String]) -> Result<BoxedConstraint> {
    let column = || {
        columns.first().cloned().ok_or_else(|| {
            TermError::Internal(format!("{} evaluated without a column", kind.name()))
        })
    };

    if let Some((op, value, na_pass)) = kind.comparison() {
        return Ok(Box::new(ComparisonCheck::new(
            column()?,
            op,
            value.clone(),
            na_pass,
        )));
    }

    let constraint: BoxedConstraint = match kind {
        CheckKind::ColValsBetween {
            left,
            right,
            inclusive,
            na_pass,
        } => Box::new(RangeCheck::between(
            column()?,
            left.clone(),
            right.clone(),
            *inclusive,
            *na_pass,
        )),
        CheckKind::ColValsOutside {
            left,
            right,
            inclusive,
            na_pass,
        } => Box::new(RangeCheck::outside(
            column()?,
            left.clone(),
            right.clone(),
            *inclusive,
            *na_pass,
        )),
        CheckKind::ColValsInSet { set } => Box::new(SetCheck::in_set(column()?, set.clone())),
        CheckKind::ColValsNotInSet { set } => {
            Box::new(SetCheck::not_in_set(column()?, set.clone()))
        }
        CheckKind::ColValsNull => Box::new(NullCheck::null(column()?)),
        CheckKind::ColValsNotNull => Box::new(NullCheck::not_null(column()?)),
        CheckKind::ColValsRegex { pattern, na_pass } => {
            Box::new(RegexCheck::new(column()?, pattern.clone(), *na_pass))
        }
        CheckKind::ColValsExpr { expr } => Box::new(ExpressionCheck::expr(expr.clone())),
        CheckKind::Conjointly { expressions } => {
            Box::new(ExpressionCheck::conjointly(expressions.clone()))
        }
        CheckKind::RowsDistinct => Box::new(RowsDistinctCheck::new(columns.to_vec())),
        CheckKind::RowsComplete => Box::new(RowsCompleteCheck::new(columns.to_vec())),
        CheckKind::ColExists => Box::new(ColumnExistsCheck::new(column()?)),
        CheckKind::ColSchemaMatch { schema, options } => {
            Box::new(SchemaMatchCheck::new(schema.clone(), options.clone()))
        }
        CheckKind::RowCountMatch { count } => Box::new(RowCountCheck::new(*count)),
        CheckKind::ColCountMatch { count } => Box::new(ColumnCountCheck::new(*count)),
        // comparisons were handled above
        CheckKind::ColValsGt { .. }
        | CheckKind::ColValsLt { .. }
        | CheckKind::ColValsGe { .. }
        | CheckKind::ColValsLe { .. }
        | CheckKind::ColValsEq { .. }
        | CheckKind::ColValsNe { .. } => {
            return Err(TermError::Internal(format!(
                "Unhandled comparison check {}",
                kind.name()
            )))
        }
    };
    Ok(constraint)
}

/// The current table, validated for splicing into SQL.
pub(crate) fn current_table() -> Result<String> {
    let ctx = current_validation_context();
    Ok(SqlSecurity::table_reference(ctx.table_name())?.to_string())
}

/// Arrow schema of a registered table.
pub(crate) async fn table_schema(ctx: &SessionContext, table: &str) -> Result<SchemaRef> {
    let df = ctx.table(table).await?;
    Ok(df.schema().inner().clone())
}

/// Wraps an expression so null inputs pass or fail as requested.
///
/// `nullable` lists the quoted expressions whose nulls decide the outcome.
pub(crate) fn null_aware(predicate: &str, nullable: &[String], na_pass: bool) -> String {
    let any_null = nullable
        .iter()
        .map(|expr| format!("{expr} IS NULL"))
        .collect::<Vec<_>>()
        .join(" OR ");

    if any_null.is_empty() {
        return format!("({predicate})");
    }

    if na_pass {
        format!("(({any_null}) OR ({predicate}))")
    } else {
        format!("(NOT ({any_null}) AND ({predicate}))")
    }
}

/// Counts passing rows of `relation` within the current segment and
/// collects the extract.
pub(crate) async fn tally_rows(
    ctx: &SessionContext,
    check: &str,
    relation: &str,
    pass: &str,
) -> Result<Tally> {
    let validation_ctx = current_validation_context();
    let filter = validation_ctx.row_filter();

    let sql = format!(
        "SELECT COUNT(*) AS total, COUNT(CASE WHEN {pass} THEN 1 END) AS passed \
         FROM {relation} WHERE {filter}"
    );

    let batches = ctx.sql(&sql).await?.collect().await?;
    let total = read_count(&batches, 0, check)?;
    let passed = read_count(&batches, 1, check)?;
    let failed = total.saturating_sub(passed);

    debug!(
        check.name = %check,
        check.total = total,
        check.failed = failed,
        "Tallied row-level check"
    );

    let extract = if validation_ctx.collect_extracts() && total > 0 {
        let condition = if failed > 0 {
            format!("({filter}) AND NOT COALESCE({pass}, FALSE)")
        } else {
            filter.to_string()
        };
        Some(
            collect_extract(
                ctx,
                &format!(
                    "SELECT * FROM {relation} WHERE {condition} LIMIT {}",
                    validation_ctx.extract_limit()
                ),
            )
            .await?,
        )
    } else {
        None
    };

    Ok(Tally::new(total, failed).with_extract(extract))
}

/// Reads a single `COUNT` value from an aggregate result.
pub(crate) fn read_count(batches: &[RecordBatch], column: usize, check: &str) -> Result<u64> {
    let batch = batches
        .iter()
        .find(|batch| batch.num_rows() > 0)
        .ok_or_else(|| {
            TermError::constraint_evaluation(check, "Count query returned no rows")
        })?;

    let counts = batch
        .column(column)
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| TermError::Internal("Failed to extract count".to_string()))?;

    if counts.is_null(0) {
        return Ok(0);
    }
    Ok(counts.value(0).max(0) as u64)
}

async fn collect_extract(ctx: &SessionContext, sql: &str) -> Result<RecordBatch> {
    let df = ctx.sql(sql).await?;
    let planned_schema = df.schema().inner().clone();
    let batches = df.collect().await?;
    let schema = batches
        .first()
        .map(|batch| batch.schema())
        .unwrap_or(planned_schema);
    Ok(concat_batches(&schema, &batches)?)
}
