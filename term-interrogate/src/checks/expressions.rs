//! Checks driven by user-authored SQL boolean expressions.

use super::{current_table, tally_rows};
use crate::core::{Constraint, Tally};
use crate::error::Result;
use crate::security::SqlSecurity;
use async_trait::async_trait;
use datafusion::prelude::*;
use tracing::instrument;

/// `col_vals_expr` (one expression) and `conjointly` (several expressions
/// that must all hold). A row whose expression evaluates to null fails.
///
/// # Examples
///
/// ```rust
/// use term_interrogate::checks::ExpressionCheck;
///
/// let check = ExpressionCheck::conjointly(vec!["a > 0".to_string(), "a < b".to_string()]);
/// ```
#[derive(Debug, Clone)]
pub struct ExpressionCheck {
    expressions: Vec<String>,
    conjoint: bool,
}

impl ExpressionCheck {
    pub fn expr(expression: impl Into<String>) -> Self {
        Self {
            expressions: vec![expression.into()],
            conjoint: false,
        }
    }

    pub fn conjointly(expressions: Vec<String>) -> Self {
        Self {
            expressions,
            conjoint: true,
        }
    }

    fn predicate(&self) -> Result<String> {
        for expression in &self.expressions {
            SqlSecurity::validate_sql_expression(expression)?;
        }
        let joined = self
            .expressions
            .iter()
            .map(|expression| format!("({expression})"))
            .collect::<Vec<_>>()
            .join(" AND ");
        Ok(format!("({joined})"))
    }
}

#[async_trait]
impl Constraint for ExpressionCheck {
    #[instrument(skip(self, ctx), fields(check.name = %self.name(), check.expressions = self.expressions.len()))]
    async fn evaluate(&self, ctx: &SessionContext) -> Result<Tally> {
        tally_rows(ctx, self.name(), &current_table()?, &self.predicate()?).await
    }

    fn name(&self) -> &str {
        if self.conjoint {
            "conjointly"
        } else {
            "col_vals_expr"
        }
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
    async fn test_single_expression() {
        let ctx = numbers_context().await;
        let check = ExpressionCheck::expr("a + b > 10");
        let tally = evaluate_with_context(&check, &ctx, "numbers").await.unwrap();
        // 1, 9, 11, 19, null
        assert_eq!(tally.total, 5);
        assert_eq!(tally.failed, 3);
        assert_eq!(check.name(), "col_vals_expr");
    }

    #[tokio::test]
    async fn test_conjointly() {
        let ctx = numbers_context().await;
        let check = ExpressionCheck::conjointly(vec!["a > 1".to_string(), "b >= 5".to_string()]);
        let tally = evaluate_with_context(&check, &ctx, "numbers").await.unwrap();
        // rows 2, 3 and 4 satisfy both
        assert_eq!(tally.failed, 2);
    }

    #[tokio::test]
    async fn test_invalid_expression_is_an_error() {
        let ctx = numbers_context().await;
        let check = ExpressionCheck::expr("no_such_column > 1");
        assert!(evaluate_with_context(&check, &ctx, "numbers").await.is_err());

        let check = ExpressionCheck::expr("a > 1; DROP TABLE numbers");
        assert!(evaluate_with_context(&check, &ctx, "numbers").await.is_err());
    }
}
