//! Row count check.

use super::{current_table, read_count};
use crate::core::{current_validation_context, Constraint, Tally};
use crate::error::Result;
use async_trait::async_trait;
use datafusion::prelude::*;
use tracing::{debug, instrument};

/// `row_count_match`: one test unit comparing the number of rows in the
/// table (or segment) with an expected count.
#[derive(Debug, Clone)]
pub struct RowCountCheck {
    expected: u64,
}

impl RowCountCheck {
    pub fn new(expected: u64) -> Self {
        Self { expected }
    }
}

#[async_trait]
impl Constraint for RowCountCheck {
    #[instrument(skip(self, ctx), fields(check.name = %self.name(), check.expected = self.expected))]
    async fn evaluate(&self, ctx: &SessionContext) -> Result<Tally> {
        let table = current_table()?;
        let filter = current_validation_context().row_filter().to_string();
        let sql = format!("SELECT COUNT(*) AS total FROM {table} WHERE {filter}");

        let batches = ctx.sql(&sql).await?.collect().await?;
        let actual = read_count(&batches, 0, self.name())?;

        debug!(
            check.name = %self.name(),
            check.expected = self.expected,
            check.actual = actual,
            "Counted rows"
        );

        Ok(Tally::single(actual == self.expected))
    }

    fn name(&self) -> &str {
        "row_count_match"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ValidationContext, CURRENT_CONTEXT};
    use crate::test_helpers::{evaluate_with_context, sales_context};

    #[tokio::test]
    async fn test_row_count_match() {
        let ctx = sales_context().await;

        let tally = evaluate_with_context(&RowCountCheck::new(8), &ctx, "sales")
            .await
            .unwrap();
        assert_eq!((tally.total, tally.failed), (1, 0));

        let tally = evaluate_with_context(&RowCountCheck::new(7), &ctx, "sales")
            .await
            .unwrap();
        assert_eq!(tally.failed, 1);
    }

    #[tokio::test]
    async fn test_row_count_in_segment() {
        let ctx = sales_context().await;
        let scoped = ValidationContext::new("sales").with_segment("\"region\" = 'south'");
        let tally = CURRENT_CONTEXT
            .scope(scoped, RowCountCheck::new(3).evaluate(&ctx))
            .await
            .unwrap();
        assert_eq!(tally.failed, 0);
    }
}
