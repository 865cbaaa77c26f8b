//! The check trait and the tally it produces.

use crate::checks::SchemaDiff;
use crate::error::Result;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::prelude::*;
use std::fmt::Debug;

/// Test-unit counts produced by evaluating one atomic step.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    /// Number of test units examined
    pub total: u64,
    /// Number of test units that failed
    pub failed: u64,
    /// Failing rows, or a sample of evaluated rows when none failed
    pub extract: Option<RecordBatch>,
    /// Structured result of a schema comparison
    pub schema_diff: Option<SchemaDiff>,
}

impl Tally {
    pub fn new(total: u64, failed: u64) -> Self {
        Self {
            total,
            failed,
            extract: None,
            schema_diff: None,
        }
    }

    /// A single test unit that passed or failed.
    pub fn single(passed: bool) -> Self {
        Self::new(1, u64::from(!passed))
    }

    pub fn with_extract(mut self, extract: Option<RecordBatch>) -> Self {
        self.extract = extract;
        self
    }

    pub fn with_schema_diff(mut self, diff: SchemaDiff) -> Self {
        self.schema_diff = Some(diff);
        self
    }

    pub fn passed(&self) -> u64 {
        self.total.saturating_sub(self.failed)
    }

    /// Failed units over total units; zero when there are no units.
    pub fn fraction_failed(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.failed as f64 / self.total as f64
        }
    }
}

/// A check that can be evaluated against the table of the current
/// [`ValidationContext`](super::ValidationContext).
///
/// Implementations are stateless: the table name, segment predicate and
/// extract settings come from the task-local context, so one check value can
/// be evaluated for any atomic step.
///
/// # Examples
///
/// ```rust,ignore
/// use term_interrogate::core::{Constraint, Tally};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct NonEmpty;
///
/// #[async_trait]
/// impl Constraint for NonEmpty {
///     async fn evaluate(&self, ctx: &SessionContext) -> Result<Tally> {
///         let table = current_validation_context().table_name().to_string();
///         let rows = ctx.table(table.as_str()).await?.count().await?;
///         Ok(Tally::single(rows > 0))
///     }
///
///     fn name(&self) -> &str {
///         "non_empty"
///     }
/// }
/// ```
#[async_trait]
pub trait Constraint: Debug + Send + Sync {
    /// Evaluates the check and tallies its test units.
    async fn evaluate(&self, ctx: &SessionContext) -> Result<Tally>;

    /// Returns the name of the check, e.g. `col_vals_gt`.
    fn name(&self) -> &str;

    /// The SQL predicate a row must satisfy to pass.
    ///
    /// Only checks whose test units are individual rows, judged without
    /// reference to other rows, return a predicate.
    fn pass_predicate(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// A boxed check for use in collections.
pub type BoxedConstraint = Box<dyn Constraint>;
