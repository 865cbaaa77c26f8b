//! Validation plans and interrogation options.

use super::{Actions, AuthoredStep, FinalActions, Thresholds, DEFAULT_EXTRACT_LIMIT};
use crate::error::{ErrorContext, Result, TermError};
use crate::logging::LogConfig;
use crate::security::SqlSecurity;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Runtime options for an interrogation.
#[derive(Debug, Clone)]
pub struct InterrogateOptions {
    /// Keep failing-row extracts on step results
    pub collect_extracts: bool,
    /// Maximum rows per extract
    pub extract_limit: usize,
    /// Number of atomic steps evaluated at once; results keep index order
    pub concurrency: usize,
    /// Budget for the whole interrogation
    pub timeout: Option<Duration>,
    pub log_config: LogConfig,
}

impl Default for InterrogateOptions {
    fn default() -> Self {
        Self {
            collect_extracts: true,
            extract_limit: DEFAULT_EXTRACT_LIMIT,
            concurrency: 1,
            timeout: None,
            log_config: LogConfig::default(),
        }
    }
}

impl InterrogateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collect_extracts(mut self, collect: bool) -> Self {
        self.collect_extracts = collect;
        self
    }

    pub fn with_extract_limit(mut self, limit: usize) -> Self {
        self.extract_limit = limit;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Evaluates one atomic step per available CPU.
    pub fn with_parallelism(self) -> Self {
        self.with_concurrency(num_cpus::get())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(TermError::Configuration(
                "Concurrency must be at least 1".to_string(),
            ));
        }
        if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(TermError::Configuration(
                "Timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// An ordered, immutable list of authored steps against one table.
///
/// # Examples
///
/// ```rust
/// use term_interrogate::core::{AuthoredStep, Thresholds, ValidationPlan};
///
/// let plan = ValidationPlan::builder("orders")
///     .label("Nightly order checks")
///     .thresholds(Thresholds::builder().warning(0.05).error(0.2).build().unwrap())
///     .step(AuthoredStep::col_vals_not_null("order_id"))
///     .step(AuthoredStep::col_vals_gt("amount", 0))
///     .build()
///     .unwrap();
///
/// assert_eq!(plan.steps().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ValidationPlan {
    table: String,
    label: Option<String>,
    steps: Vec<Arc<AuthoredStep>>,
    thresholds: Thresholds,
    actions: Option<Actions>,
    final_actions: FinalActions,
    options: InterrogateOptions,
}

impl ValidationPlan {
    /// Starts a plan for the table registered under `table`.
    pub fn builder(table: impl Into<String>) -> ValidationPlanBuilder {
        ValidationPlanBuilder::new(table)
    }

    /// Loads a plan from JSON.
    ///
    /// Callback actions and `DataFrame` preprocessors cannot be expressed in
    /// JSON; everything else can.
    ///
    /// ```json
    /// {
    ///   "table": "orders",
    ///   "label": "Orders",
    ///   "thresholds": {"warning": 0.1, "error": 5},
    ///   "steps": [
    ///     {"check": "col_vals_gt", "columns": "amount", "value": 0},
    ///     {"check": "rows_distinct", "columns": ["order_id"]}
    ///   ]
    /// }
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let document: PlanDocument = serde_json::from_str(json).map_err(|e| {
            if e.is_data() || e.is_syntax() {
                TermError::Configuration(format!("Invalid plan: {e}"))
            } else {
                TermError::from(e)
            }
        })?;

        let mut builder = ValidationPlan::builder(document.table)
            .thresholds(document.thresholds)
            .steps(document.steps);
        if let Some(label) = document.label {
            builder = builder.label(label);
        }
        if let Some(actions) = document.actions {
            builder = builder.actions(actions);
        }

        let mut options = InterrogateOptions::default();
        if let Some(limit) = document.extract_limit {
            options.extract_limit = limit;
        }
        if let Some(concurrency) = document.concurrency {
            options.concurrency = concurrency;
        }
        builder.options(options).build()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn steps(&self) -> &[Arc<AuthoredStep>] {
        &self.steps
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn actions(&self) -> Option<&Actions> {
        self.actions.as_ref()
    }

    pub fn final_actions(&self) -> &FinalActions {
        &self.final_actions
    }

    pub fn options(&self) -> &InterrogateOptions {
        &self.options
    }

    /// Name of the view holding the preprocessed table for an authored step.
    pub(crate) fn view_name(&self, authored_index: usize) -> String {
        format!("{}__pre_{authored_index}", self.table.replace('.', "_"))
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanDocument {
    table: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    thresholds: Thresholds,
    #[serde(default)]
    actions: Option<Actions>,
    #[serde(default)]
    extract_limit: Option<usize>,
    #[serde(default)]
    concurrency: Option<usize>,
    steps: Vec<AuthoredStep>,
}

/// Builder for [`ValidationPlan`].
#[derive(Debug)]
pub struct ValidationPlanBuilder {
    table: String,
    label: Option<String>,
    steps: Vec<AuthoredStep>,
    thresholds: Thresholds,
    actions: Option<Actions>,
    final_actions: FinalActions,
    options: InterrogateOptions,
}

impl ValidationPlanBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            label: None,
            steps: Vec::new(),
            thresholds: Thresholds::default(),
            actions: None,
            final_actions: FinalActions::default(),
            options: InterrogateOptions::default(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn step(mut self, step: AuthoredStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps<I>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = AuthoredStep>,
    {
        self.steps.extend(steps);
        self
    }

    /// Thresholds for every step without its own.
    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Actions for every step without its own.
    pub fn actions(mut self, actions: Actions) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn final_actions(mut self, final_actions: FinalActions) -> Self {
        self.final_actions = final_actions;
        self
    }

    pub fn options(mut self, options: InterrogateOptions) -> Self {
        self.options = options;
        self
    }

    /// Validates every step and builds the plan.
    pub fn build(self) -> Result<ValidationPlan> {
        SqlSecurity::table_reference(&self.table)
            .map_err(|e| TermError::Configuration(e.to_string()))?;
        self.options.validate()?;

        for (i, step) in self.steps.iter().enumerate() {
            step.validate()
                .map_err(|e| match e {
                    TermError::SecurityError(message) => TermError::Configuration(message),
                    other => other,
                })
                .with_context(|| format!("Step {} ({})", i + 1, step.kind().name()))?;
        }

        Ok(ValidationPlan {
            table: self.table,
            label: self.label,
            steps: self.steps.into_iter().map(Arc::new).collect(),
            thresholds: self.thresholds,
            actions: self.actions,
            final_actions: self.final_actions,
            options: self.options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CheckKind;

    #[test]
    fn test_build_validates_steps() {
        let err = ValidationPlan::builder("orders")
            .step(AuthoredStep::col_vals_not_null("id"))
            .step(AuthoredStep::col_vals_regex("code", "(unclosed"))
            .build()
            .unwrap_err();
        assert!(matches!(err, TermError::Configuration(_)));
        assert!(err.to_string().contains("Step 2 (col_vals_regex)"));
    }

    #[test]
    fn test_invalid_table_and_options() {
        assert!(ValidationPlan::builder("bad table").build().is_err());
        assert!(ValidationPlan::builder("orders")
            .options(InterrogateOptions::new().with_concurrency(0))
            .build()
            .is_err());
    }

    #[test]
    fn test_view_name() {
        let plan = ValidationPlan::builder("lake.orders").build().unwrap();
        assert_eq!(plan.view_name(3), "lake_orders__pre_3");
    }

    #[test]
    fn test_from_json() {
        let plan = ValidationPlan::from_json(
            r#"{
                "table": "orders",
                "label": "Orders",
                "thresholds": {"warning": 0.1, "error": 5},
                "extract_limit": 20,
                "steps": [
                    {"check": "col_vals_gt", "columns": "amount", "value": 0},
                    {"check": "rows_distinct", "columns": ["order_id"]},
                    {"check": "col_vals_in_set", "columns": {"starts_with": "status"}, "set": ["open", "closed"]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(plan.table(), "orders");
        assert_eq!(plan.label(), Some("Orders"));
        assert_eq!(plan.steps().len(), 3);
        assert_eq!(plan.steps()[1].kind(), &CheckKind::RowsDistinct);
        assert_eq!(plan.options().extract_limit, 20);
    }

    #[test]
    fn test_from_json_rejects_bad_thresholds() {
        let err = ValidationPlan::from_json(
            r#"{"table": "t", "thresholds": {"warning": 0.5, "error": 0.1}, "steps": []}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TermError::Configuration(_)));

        let err = ValidationPlan::from_json(r#"{"table": "t", "steps": [{"check": "nope"}]}"#)
            .unwrap_err();
        assert!(matches!(err, TermError::Configuration(_)));
    }
}
