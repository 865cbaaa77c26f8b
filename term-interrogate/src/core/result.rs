//! Step results and the frozen result model of an interrogation.

use super::Severity;
use crate::checks::SchemaDiff;
use crate::error::{Result, TermError};
use crate::security::SqlSecurity;
use arrow::array::{ArrayRef, Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use datafusion::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Outcome of one atomic step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Evaluated with no failing units
    Passed,
    /// Evaluated with at least one failing unit
    Failed,
    /// Nothing to evaluate
    Empty,
    /// Expansion or evaluation failed
    Error,
    /// Not evaluated because the step is switched off
    Inactive,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Passed => "passed",
            StepStatus::Failed => "failed",
            StepStatus::Empty => "empty",
            StepStatus::Error => "error",
            StepStatus::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of one atomic step.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    /// 1-based step index
    pub index: usize,
    /// 1-based index of the authored step this came from
    pub authored_index: usize,
    pub check: String,
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brief: Option<String>,
    pub status: StepStatus,
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    /// Failed units over total units
    pub fraction_failed: f64,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Why an empty step had nothing to evaluate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_diff: Option<SchemaDiff>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions_triggered: Vec<String>,
    pub duration_ms: u64,
    #[serde(skip)]
    pub extract: Option<RecordBatch>,
    #[serde(skip)]
    pub(crate) pass_predicate: Option<String>,
    #[serde(skip)]
    pub(crate) segment_predicate: Option<String>,
    #[serde(skip)]
    pub(crate) preprocessed: bool,
}

impl StepResult {
    pub fn is_passed(&self) -> bool {
        self.status == StepStatus::Passed
    }

    /// Whether the step takes part in sundering the base table.
    fn splits_rows(&self) -> bool {
        !self.preprocessed
            && self.pass_predicate.is_some()
            && matches!(self.status, StepStatus::Passed | StepStatus::Failed)
    }
}

/// Aggregate view of an interrogation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub table: String,
    pub total_steps: usize,
    pub passed_steps: usize,
    pub failed_steps: usize,
    pub empty_steps: usize,
    pub error_steps: usize,
    pub inactive_steps: usize,
    /// Number of steps at each severity
    pub severities: BTreeMap<Severity, usize>,
    pub highest_severity: Severity,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ValidationSummary {
    pub(crate) fn from_steps(
        label: Option<String>,
        table: String,
        steps: &[StepResult],
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let count = |status: StepStatus| steps.iter().filter(|s| s.status == status).count();

        let mut severities = BTreeMap::new();
        for step in steps {
            *severities.entry(step.severity).or_insert(0) += 1;
        }

        Self {
            label,
            table,
            total_steps: steps.len(),
            passed_steps: count(StepStatus::Passed),
            failed_steps: count(StepStatus::Failed),
            empty_steps: count(StepStatus::Empty),
            error_steps: count(StepStatus::Error),
            inactive_steps: count(StepStatus::Inactive),
            highest_severity: steps
                .iter()
                .map(|s| s.severity)
                .max()
                .unwrap_or_default(),
            severities,
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
        }
    }

    /// Number of steps that ended at exactly `severity`.
    pub fn steps_with(&self, severity: Severity) -> usize {
        self.severities.get(&severity).copied().unwrap_or(0)
    }

    pub fn all_passed(&self) -> bool {
        self.passed_steps == self.total_steps
    }
}

/// Which rows [`ResultModel::sundered_data`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunderedType {
    /// Rows passing every row-level step
    Pass,
    /// Rows failing at least one row-level step
    Fail,
}

/// Frozen results of one interrogation, indexed by step.
#[derive(Debug, Clone, Serialize)]
pub struct ResultModel {
    summary: ValidationSummary,
    steps: Vec<StepResult>,
}

impl ResultModel {
    pub(crate) fn new(summary: ValidationSummary, steps: Vec<StepResult>) -> Self {
        Self { summary, steps }
    }

    pub fn summary(&self) -> &ValidationSummary {
        &self.summary
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn highest_severity(&self) -> Severity {
        self.summary.highest_severity
    }

    /// Looks up a step by its 1-based index.
    pub fn step(&self, index: usize) -> Result<&StepResult> {
        index
            .checked_sub(1)
            .and_then(|i| self.steps.get(i))
            .ok_or_else(|| {
                TermError::Configuration(format!(
                    "Step {index} does not exist; the interrogation has {} steps",
                    self.steps.len()
                ))
            })
    }

    /// The extract of a step, if one was collected.
    pub fn extract(&self, index: usize) -> Result<Option<&RecordBatch>> {
        Ok(self.step(index)?.extract.as_ref())
    }

    /// Process exit code for a run that should fail at `fail_on`.
    ///
    /// `Severity::None` fails on any failing or errored step.
    pub fn exit_code(&self, fail_on: Severity) -> i32 {
        let failing = if fail_on == Severity::None {
            self.summary.failed_steps > 0 || self.summary.error_steps > 0
        } else {
            self.summary.highest_severity.is_at_least(fail_on)
        };
        i32::from(failing)
    }

    pub fn to_json(&self) -> Result<String> {
        use crate::formatters::{JsonFormatter, ResultFormatter};
        JsonFormatter::new().format(self)
    }

    pub fn to_human(&self) -> Result<String> {
        use crate::formatters::{HumanFormatter, ResultFormatter};
        HumanFormatter::new().format(self)
    }

    pub fn to_markdown(&self) -> Result<String> {
        use crate::formatters::{MarkdownFormatter, ResultFormatter};
        MarkdownFormatter::new().format(self)
    }

    /// Writes every collected extract to `dir` as `step_{index:02}_{check}.csv`.
    #[instrument(skip(self, dir), fields(dir = %dir.as_ref().display()))]
    pub fn write_extracts(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        for step in &self.steps {
            let Some(extract) = &step.extract else {
                continue;
            };
            let path = dir.join(format!("step_{:02}_{}.csv", step.index, step.check));
            write_csv(&path, extract)?;
            debug!(
                step.index = step.index,
                rows = extract.num_rows(),
                path = %path.display(),
                "Wrote extract"
            );
            written.push(path);
        }
        Ok(written)
    }

    /// Writes the extract of one step to `path` as CSV.
    ///
    /// Fails with a configuration error when the step does not exist or has
    /// no collected extract.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn write_extract(&self, index: usize, path: impl AsRef<Path>) -> Result<PathBuf> {
        let extract = self.extract(index)?.ok_or_else(|| {
            TermError::Configuration(format!("Step {index} has no collected extract"))
        })?;
        let path = path.as_ref().to_path_buf();
        create_parent(&path)?;
        write_csv(&path, extract)?;
        debug!(step.index = index, rows = extract.num_rows(), "Wrote extract");
        Ok(path)
    }

    /// The step table as a record batch, one row per atomic step.
    pub fn report_batch(&self) -> Result<RecordBatch> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("index", DataType::UInt64, false),
            Field::new("authored_index", DataType::UInt64, false),
            Field::new("check", DataType::Utf8, false),
            Field::new("columns", DataType::Utf8, false),
            Field::new("values", DataType::Utf8, true),
            Field::new("segment", DataType::Utf8, true),
            Field::new("status", DataType::Utf8, false),
            Field::new("total", DataType::UInt64, false),
            Field::new("passed", DataType::UInt64, false),
            Field::new("failed", DataType::UInt64, false),
            Field::new("fraction_failed", DataType::Float64, false),
            Field::new("severity", DataType::Utf8, false),
            Field::new("error", DataType::Utf8, true),
            Field::new("note", DataType::Utf8, true),
        ]));

        let steps = &self.steps;
        let counts = |f: fn(&StepResult) -> u64| -> ArrayRef {
            Arc::new(steps.iter().map(f).collect::<UInt64Array>())
        };
        let text = |f: fn(&StepResult) -> Option<String>| -> ArrayRef {
            Arc::new(steps.iter().map(f).collect::<StringArray>())
        };

        let columns: Vec<ArrayRef> = vec![
            counts(|step| step.index as u64),
            counts(|step| step.authored_index as u64),
            text(|step| Some(step.check.clone())),
            text(|step| Some(step.columns.join(", "))),
            text(|step| step.values.clone()),
            text(|step| step.segment.clone()),
            text(|step| Some(step.status.to_string())),
            counts(|step| step.total),
            counts(|step| step.passed),
            counts(|step| step.failed),
            Arc::new(
                steps
                    .iter()
                    .map(|step| step.fraction_failed)
                    .collect::<Float64Array>(),
            ),
            text(|step| Some(step.severity.to_string())),
            text(|step| step.error.clone()),
            text(|step| step.note.clone()),
        ];

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Writes the step table to `path` as CSV with a header row.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn write_report_csv(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref().to_path_buf();
        let report = self.report_batch()?;
        create_parent(&path)?;
        write_csv(&path, &report)?;
        debug!(steps = report.num_rows(), "Wrote report");
        Ok(path)
    }

    /// Rows of the base table that pass (or fail) every row-level step.
    ///
    /// Only steps that evaluated row predicates directly against the base
    /// table take part; a row outside a step's segment counts as passing
    /// that step.
    pub async fn sundered_data(
        &self,
        ctx: &SessionContext,
        which: SunderedType,
    ) -> Result<DataFrame> {
        let table = SqlSecurity::table_reference(&self.summary.table)?;

        let conditions: Vec<String> = self
            .steps
            .iter()
            .filter(|step| step.splits_rows())
            .filter_map(|step| {
                let pass = step.pass_predicate.as_deref()?;
                Some(match &step.segment_predicate {
                    Some(segment) => {
                        format!("(CASE WHEN {segment} THEN COALESCE({pass}, FALSE) ELSE TRUE END)")
                    }
                    None => format!("COALESCE({pass}, FALSE)"),
                })
            })
            .collect();

        let filter = match (which, conditions.is_empty()) {
            (SunderedType::Pass, true) => "TRUE".to_string(),
            (SunderedType::Fail, true) => "FALSE".to_string(),
            (SunderedType::Pass, false) => conditions.join(" AND "),
            (SunderedType::Fail, false) => format!("NOT ({})", conditions.join(" AND ")),
        };

        debug!(
            steps = conditions.len(),
            which = ?which,
            "Sundering table"
        );
        Ok(ctx
            .sql(&format!("SELECT * FROM {table} WHERE {filter}"))
            .await?)
    }
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(std::fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}

fn write_csv(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = arrow::csv::WriterBuilder::new()
        .with_header(true)
        .build(file);
    writer.write(batch)?;
    Ok(())
}
