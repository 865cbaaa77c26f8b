//! Whole-row checks.

use super::{current_table, tally_rows};
use crate::core::{Constraint, Tally};
use crate::error::{Result, TermError};
use crate::security::SqlSecurity;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::prelude::*;
use tracing::instrument;

const DUPLICATE_COUNT: &str = "__dup_count";

fn quote_all(columns: &[String]) -> Result<Vec<String>> {
    if columns.is_empty() {
        return Err(TermError::Configuration(
            "Row checks need at least one column".to_string(),
        ));
    }
    columns
        .iter()
        .map(|column| SqlSecurity::quote_identifier(column))
        .collect()
}

/// Drops the window column so extracts only carry the table's own columns.
fn without_duplicate_count(batch: RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let keep: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, field)| field.name() != DUPLICATE_COUNT)
        .map(|(i, _)| i)
        .collect();
    Ok(batch.project(&keep)?)
}

/// `rows_distinct`: every row belonging to a group of identical rows (over
/// the column subset) fails, including the first occurrence.
#[derive(Debug, Clone)]
pub struct RowsDistinctCheck {
    columns: Vec<String>,
}

impl RowsDistinctCheck {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }
}

#[async_trait]
impl Constraint for RowsDistinctCheck {
    #[instrument(skip(self, ctx), fields(check.name = %self.name(), check.columns = ?self.columns))]
    async fn evaluate(&self, ctx: &SessionContext) -> Result<Tally> {
        let table = current_table()?;
        let partition = quote_all(&self.columns)?.join(", ");
        let filter = crate::core::current_validation_context()
            .row_filter()
            .to_string();

        // the window runs inside the segment so duplicates are counted per segment
        let relation = format!(
            "(SELECT *, COUNT(*) OVER (PARTITION BY {partition}) AS \"{DUPLICATE_COUNT}\" \
             FROM {table} WHERE {filter}) AS grouped"
        );

        let tally = tally_rows(
            ctx,
            self.name(),
            &relation,
            &format!("(\"{DUPLICATE_COUNT}\" = 1)"),
        )
        .await?;

        let extract = tally.extract.map(without_duplicate_count).transpose()?;
        Ok(Tally {
            extract,
            ..tally
        })
    }

    fn name(&self) -> &str {
        "rows_distinct"
    }
}

/// `rows_complete`: a row fails when any column in the subset is null.
#[derive(Debug, Clone)]
pub struct RowsCompleteCheck {
    columns: Vec<String>,
}

impl RowsCompleteCheck {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    fn predicate(&self) -> Result<String> {
        let conditions = quote_all(&self.columns)?
            .into_iter()
            .map(|column| format!("{column} IS NOT NULL"))
            .collect::<Vec<_>>()
            .join(" AND ");
        Ok(format!("({conditions})"))
    }
}

#[async_trait]
impl Constraint for RowsCompleteCheck {
    #[instrument(skip(self, ctx), fields(check.name = %self.name(), check.columns = ?self.columns))]
    async fn evaluate(&self, ctx: &SessionContext) -> Result<Tally> {
        tally_rows(ctx, self.name(), &current_table()?, &self.predicate()?).await
    }

    fn name(&self) -> &str {
        "rows_complete"
    }

    fn pass_predicate(&self) -> Result<Option<String>> {
        self.predicate().map(Some)
    }
}
