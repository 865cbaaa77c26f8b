//! Core interrogation types.
//!
//! A [`ValidationPlan`] holds an ordered list of [`AuthoredStep`]s against one
//! table. Running it through an [`Interrogation`] expands every authored step
//! into numbered [`AtomicStep`]s (one per resolved column and segment),
//! evaluates each one, assesses its [`Severity`] against [`Thresholds`] and
//! fires [`Actions`]. The outcome is a frozen [`ResultModel`].
//!
//! ```text
//! ValidationPlan
//!     ├── AuthoredStep: col_vals_gt(starts_with("amount"), 0) by region
//!     │   ├── #1 amount     region/east
//!     │   ├── #2 amount     region/north
//!     │   └── #3 amount_net region/east ...
//!     └── AuthoredStep: rows_distinct(["order_id"])
//!         └── #7 order_id
//! ```
//!
//! ## Example
//!
//! ```rust
//! use term_interrogate::core::{AuthoredStep, Severity, StepStatus, Thresholds, ValidationPlan};
//! use term_interrogate::selectors::{ColumnSelector, SegmentSpec};
//! use datafusion::prelude::*;
//!
//! # async fn example() -> term_interrogate::prelude::Result<()> {
//! let ctx = SessionContext::new();
//! ctx.sql("CREATE TABLE orders (order_id INT, region VARCHAR, amount DOUBLE) AS VALUES \
//!          (1, 'east', 10.0), (2, 'west', -3.0), (3, 'west', 8.5)")
//!     .await?
//!     .collect()
//!     .await?;
//!
//! let plan = ValidationPlan::builder("orders")
//!     .thresholds(Thresholds::builder().warning(1u64).error(0.5).build()?)
//!     .step(
//!         AuthoredStep::col_vals_gt(ColumnSelector::starts_with("amount"), 0)
//!             .segments(SegmentSpec::column("region")),
//!     )
//!     .step(AuthoredStep::rows_distinct().columns("order_id"))
//!     .build()?;
//!
//! let results = plan.interrogate(&ctx).await?;
//! assert_eq!(results.len(), 3);
//! assert_eq!(results.step(2)?.status, StepStatus::Failed);
//! assert_eq!(results.step(2)?.severity, Severity::Error);
//! # Ok(())
//! # }
//! ```

mod actions;
mod constraint;
mod expander;
mod interrogation;
mod plan;
mod result;
mod severity;
mod step;
mod thresholds;
pub mod validation_context;
mod value;

pub use actions::{ActionCallback, ActionEvent, ActionTarget, Actions, FinalActions, FinalCallback};
pub use constraint::{BoxedConstraint, Constraint, Tally};
pub use expander::{AtomicStep, ExpansionState, StepExpander};
pub use interrogation::{Interrogation, InterrogationState};
pub use plan::{InterrogateOptions, ValidationPlan, ValidationPlanBuilder};
pub use result::{ResultModel, StepResult, StepStatus, SunderedType, ValidationSummary};
pub use severity::Severity;
pub use step::{AuthoredStep, CheckKind, CompareOp, PreprocessFn, Preprocessor};
pub use thresholds::{Threshold, Thresholds, ThresholdsBuilder};
pub use validation_context::{
    current_validation_context, ValidationContext, CURRENT_CONTEXT, DEFAULT_EXTRACT_LIMIT,
};
pub use value::{Literal, Operand};
