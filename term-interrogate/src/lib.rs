//! # term-interrogate
//!
//! A step-by-step interrogation engine for tabular data running on
//! DataFusion.
//!
//! A [`ValidationPlan`](core::ValidationPlan) lists authored steps such as
//! "values in columns starting with `amount` are greater than zero, per
//! region". Interrogating the plan expands each authored step over the
//! columns its selector resolves to and the segments its segmentation
//! produces, evaluates every resulting atomic step, counts passing and failing
//! test units, and assigns a severity by comparing failures against warning,
//! error and critical thresholds.
//!
//! ## Quick Start
//!
//! ```rust
//! use term_interrogate::prelude::*;
//! use datafusion::prelude::*;
//!
//! # async fn example() -> term_interrogate::prelude::Result<()> {
//! let ctx = SessionContext::new();
//! ctx.sql("CREATE TABLE users (id INT, email VARCHAR, age INT) AS VALUES \
//!          (1, 'a@example.com', 34), (2, NULL, 17), (3, 'c@example.com', 52)")
//!     .await?
//!     .collect()
//!     .await?;
//!
//! let plan = ValidationPlan::builder("users")
//!     .thresholds(Thresholds::builder().warning(1u64).error(0.25).build()?)
//!     .actions(Actions::new().error("Step {step} ({type}) failed on {col}"))
//!     .step(AuthoredStep::col_vals_not_null(vec!["id", "email"]))
//!     .step(AuthoredStep::col_vals_between("age", 18, 120))
//!     .step(AuthoredStep::rows_distinct().columns("id"))
//!     .build()?;
//!
//! let results = plan.interrogate(&ctx).await?;
//! assert_eq!(results.len(), 4);
//! assert_eq!(results.step(2)?.severity, Severity::Error);
//! println!("{}", results.to_human()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`selectors`**: column selector algebra and row segmentation
//! - **`core`**: plans, steps, expansion, thresholds, actions, the
//!   interrogation itself and its frozen result model
//! - **`checks`**: one evaluator per check kind, each generating SQL
//! - **`sources`**: registering CSV, JSON, Parquet and in-memory tables
//! - **`formatters`**: JSON, console and Markdown reports
//! - **`security`**: quoting and validation of everything spliced into SQL
//! - **`logging`**: `tracing` configuration

pub mod checks;
pub mod core;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod security;
pub mod selectors;
pub mod sources;

#[cfg(test)]
pub mod test_helpers;
