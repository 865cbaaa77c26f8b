//! Running a plan: expansion, per-step evaluation, severity assessment and
//! actions.

use super::{
    ActionTarget, AtomicStep, ExpansionState, ResultModel, Severity, StepExpander, StepResult,
    StepStatus, ValidationContext, ValidationPlan, ValidationSummary, CURRENT_CONTEXT,
};
use crate::checks::constraint_for;
use crate::error::{Result, TermError};
use crate::log_step;
use crate::logging::truncate_field;
use chrono::Utc;
use datafusion::prelude::*;
use futures::stream::{self, StreamExt};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

const NO_TEST_UNITS: &str = "No test units to evaluate";

/// Lifecycle of an [`Interrogation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterrogationState {
    Pending,
    Expanding,
    Running,
    Finalized,
}

/// A single run of a [`ValidationPlan`] against a `SessionContext`.
///
/// An interrogation runs once. Results are appended in step order even when
/// several steps are evaluated at the same time.
///
/// # Examples
///
/// ```rust,no_run
/// use term_interrogate::core::{AuthoredStep, Interrogation, Severity, ValidationPlan};
/// use datafusion::prelude::*;
///
/// # async fn example() -> term_interrogate::prelude::Result<()> {
/// let ctx = SessionContext::new();
/// ctx.register_csv("orders", "orders.csv", CsvReadOptions::new()).await?;
///
/// let plan = ValidationPlan::builder("orders")
///     .step(AuthoredStep::col_vals_not_null("order_id"))
///     .build()?;
///
/// let results = Interrogation::new(plan).run(&ctx).await?;
/// std::process::exit(results.exit_code(Severity::Error));
/// # }
/// ```
#[derive(Debug)]
pub struct Interrogation {
    plan: ValidationPlan,
    state: Mutex<InterrogationState>,
}

impl Interrogation {
    pub fn new(plan: ValidationPlan) -> Self {
        Self {
            plan,
            state: Mutex::new(InterrogationState::Pending),
        }
    }

    pub fn plan(&self) -> &ValidationPlan {
        &self.plan
    }

    pub fn state(&self) -> InterrogationState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, next: InterrogationState) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| TermError::Internal("Interrogation state lock poisoned".to_string()))?;
        *state = next;
        Ok(())
    }

    /// Runs the plan and returns the frozen results.
    ///
    /// Configuration and I/O problems, as well as an exceeded timeout, are
    /// returned as errors. Failures of individual steps are recorded on their
    /// results instead.
    #[instrument(skip(self, ctx), fields(
        plan.table = %self.plan.table(),
        plan.label = self.plan.label().unwrap_or(""),
        plan.steps = self.plan.steps().len(),
    ))]
    pub async fn run(&self, ctx: &SessionContext) -> Result<ResultModel> {
        {
            let mut state = self.state.lock().map_err(|_| {
                TermError::Internal("Interrogation state lock poisoned".to_string())
            })?;
            if *state != InterrogationState::Pending {
                return Err(TermError::Configuration(
                    "Interrogation has already been run".to_string(),
                ));
            }
            *state = InterrogationState::Expanding;
        }

        let started_at = Utc::now();
        let start = Instant::now();
        info!(
            plan.table = %self.plan.table(),
            plan.steps = self.plan.steps().len(),
            options.concurrency = self.plan.options().concurrency,
            "Starting interrogation"
        );

        let outcome = match self.plan.options().timeout {
            Some(limit) => match tokio::time::timeout(limit, self.execute(ctx)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(TermError::Timeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                }),
            },
            None => self.execute(ctx).await,
        };

        self.deregister_views(ctx);
        self.set_state(InterrogationState::Finalized)?;

        let steps = outcome.map_err(|e| {
            error!(error = %e, "Interrogation aborted");
            e
        })?;

        let summary = ValidationSummary::from_steps(
            self.plan.label().map(String::from),
            self.plan.table().to_string(),
            &steps,
            started_at,
            Utc::now(),
        );

        info!(
            steps.total = summary.total_steps,
            steps.passed = summary.passed_steps,
            steps.failed = summary.failed_steps,
            steps.error = summary.error_steps,
            steps.empty = summary.empty_steps,
            severity.highest = %summary.highest_severity,
            duration_ms = summary.duration_ms,
            "Interrogation finished"
        );

        self.plan.final_actions().run(&summary);
        Ok(ResultModel::new(summary, steps))
    }

    async fn execute(&self, ctx: &SessionContext) -> Result<Vec<StepResult>> {
        let atomic = StepExpander::new(&self.plan, ctx).expand().await?;
        self.set_state(InterrogationState::Running)?;

        let concurrency = self.plan.options().concurrency.max(1);
        let mut evaluations = stream::iter(atomic.iter().map(|step| self.evaluate(ctx, step)))
            .buffered(concurrency);

        let mut results = Vec::with_capacity(atomic.len());
        while let Some(mut result) = evaluations.next().await {
            if let Some(step) = atomic.get(results.len()) {
                self.fire_actions(step, &mut result);
            }
            results.push(result);
        }
        Ok(results)
    }

    async fn evaluate(&self, ctx: &SessionContext, step: &AtomicStep) -> StepResult {
        let start = Instant::now();
        let mut result = StepResult {
            index: step.index,
            authored_index: step.authored_index,
            check: step.check().to_string(),
            columns: step.columns.clone(),
            values: step.kind().values_description(),
            segment: step.segment.as_ref().map(|s| s.label.clone()),
            brief: step.brief.clone(),
            status: StepStatus::Empty,
            total: 0,
            passed: 0,
            failed: 0,
            fraction_failed: 0.0,
            severity: Severity::None,
            error: None,
            note: None,
            schema_diff: None,
            actions_triggered: Vec::new(),
            duration_ms: 0,
            extract: None,
            pass_predicate: None,
            segment_predicate: step.segment.as_ref().map(|s| s.predicate.clone()),
            preprocessed: step.is_preprocessed(),
        };

        match &step.state {
            ExpansionState::Inactive => {
                result.status = StepStatus::Inactive;
                return result;
            }
            ExpansionState::Empty(reason) => {
                debug!(step.index = step.index, reason = %reason, "Step has nothing to evaluate");
                result.note = Some(reason.clone());
                return result;
            }
            ExpansionState::Failed(message) => {
                warn!(step.index = step.index, error = %message, "Step failed to expand");
                result.status = StepStatus::Error;
                result.error = Some(message.clone());
                return result;
            }
            ExpansionState::Ready => {}
        }

        let options = self.plan.options();
        let mut validation_ctx = ValidationContext::new(step.table.as_str())
            .with_extract_limit(options.extract_limit)
            .with_collect_extracts(options.collect_extracts);
        if let Some(segment) = &step.segment {
            validation_ctx = validation_ctx.with_segment(segment.predicate.as_str());
        }

        let evaluation = async {
            let constraint = constraint_for(step.kind(), &step.columns)?;
            let pass_predicate = constraint.pass_predicate()?;
            let tally = CURRENT_CONTEXT
                .scope(validation_ctx, constraint.evaluate(ctx))
                .await?;
            Ok::<_, TermError>((tally, pass_predicate))
        };

        match evaluation.await {
            Ok((tally, pass_predicate)) => {
                let thresholds = step
                    .authored()
                    .step_thresholds()
                    .unwrap_or_else(|| self.plan.thresholds());

                result.total = tally.total;
                result.failed = tally.failed;
                result.passed = tally.passed();
                result.fraction_failed = tally.fraction_failed();
                result.severity = thresholds.severity(tally.failed, tally.total);
                result.status = if tally.total == 0 {
                    result.note = Some(NO_TEST_UNITS.to_string());
                    StepStatus::Empty
                } else if tally.failed == 0 {
                    StepStatus::Passed
                } else {
                    StepStatus::Failed
                };
                result.extract = tally.extract;
                result.schema_diff = tally.schema_diff;
                result.pass_predicate = pass_predicate;

                if result.severity > Severity::None {
                    warn!(
                        step.index = step.index,
                        step.check = %result.check,
                        step.failed = result.failed,
                        step.total = result.total,
                        severity = %result.severity,
                        "Step reached a threshold"
                    );
                }
            }
            Err(e) => {
                error!(
                    step.index = step.index,
                    step.check = %result.check,
                    error = %truncate_field(&e.to_string(), options.log_config.max_field_length),
                    "Step evaluation failed"
                );
                result.status = StepStatus::Error;
                result.error = Some(e.to_string());
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        log_step!(
            options.log_config,
            step.index = result.index,
            step.check = %result.check,
            step.status = %result.status,
            step.failed = result.failed,
            step.total = result.total,
            step.duration_ms = result.duration_ms,
            "Evaluated step"
        );
        result
    }

    fn fire_actions(&self, step: &AtomicStep, result: &mut StepResult) {
        if result.severity == Severity::None {
            return;
        }
        let Some(actions) = step
            .authored()
            .step_actions()
            .or_else(|| self.plan.actions())
        else {
            return;
        };

        let target = ActionTarget {
            step: result.index,
            check: &result.check,
            columns: &result.columns,
            values: result.values.as_deref(),
            segment: result.segment.as_deref(),
        };
        result.actions_triggered = actions.fire(&target, result.severity);
    }

    fn deregister_views(&self, ctx: &SessionContext) {
        for (i, step) in self.plan.steps().iter().enumerate() {
            if step.preprocessor().is_none() {
                continue;
            }
            let view = self.plan.view_name(i + 1);
            if let Err(e) = ctx.deregister_table(view.as_str()) {
                warn!(view = %view, error = %e, "Failed to deregister preprocessed view");
            }
        }
    }
}

impl ValidationPlan {
    /// Runs this plan once against `ctx`.
    pub async fn interrogate(&self, ctx: &SessionContext) -> Result<ResultModel> {
        Interrogation::new(self.clone()).run(ctx).await
    }
}
