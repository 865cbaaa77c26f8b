//! Rendering of interrogation results.
//!
//! Formatters turn a [`ResultModel`] into JSON, human-readable console text or
//! Markdown. What they include is decided by an explicit [`FormatterConfig`].
//!
//! # Examples
//!
//! ```rust
//! use term_interrogate::formatters::{FormatterConfig, HumanFormatter, ResultFormatter};
//!
//! let formatter = HumanFormatter::with_config(FormatterConfig::ci());
//! // let output = formatter.format(&results)?;
//! ```

use crate::core::{ResultModel, Severity, StepResult, StepStatus};
use crate::error::{Result, TermError};
use serde_json::{json, Value};
use std::fmt::Write;

/// What a formatter includes.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include the summary block
    pub include_summary: bool,
    /// Include one entry per step
    pub include_steps: bool,
    /// Leave out steps that passed
    pub only_problems: bool,
    /// Maximum number of steps to display (-1 for all)
    pub max_steps: i32,
    /// Whether to use colorized output (for human formatter)
    pub use_colors: bool,
    /// Whether to include timestamps in output
    pub include_timestamps: bool,
    /// Rows of an extract shown in a step report
    pub max_extract_rows: usize,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_summary: true,
            include_steps: true,
            only_problems: false,
            max_steps: -1,
            use_colors: true,
            include_timestamps: true,
            max_extract_rows: 10,
        }
    }
}

impl FormatterConfig {
    /// Only the summary.
    pub fn minimal() -> Self {
        Self {
            include_summary: true,
            include_steps: false,
            only_problems: false,
            max_steps: 0,
            use_colors: false,
            include_timestamps: false,
            max_extract_rows: 0,
        }
    }

    /// Everything, including passing steps.
    pub fn detailed() -> Self {
        Self {
            max_extract_rows: 50,
            ..Self::default()
        }
    }

    /// Plain output limited to the steps that need attention.
    pub fn ci() -> Self {
        Self {
            include_summary: true,
            include_steps: true,
            only_problems: true,
            max_steps: 50,
            use_colors: false,
            include_timestamps: true,
            max_extract_rows: 5,
        }
    }

    pub fn with_summary(mut self, include: bool) -> Self {
        self.include_summary = include;
        self
    }

    pub fn with_steps(mut self, include: bool) -> Self {
        self.include_steps = include;
        self
    }

    pub fn with_only_problems(mut self, only_problems: bool) -> Self {
        self.only_problems = only_problems;
        self
    }

    pub fn with_max_steps(mut self, max: i32) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn with_timestamps(mut self, include: bool) -> Self {
        self.include_timestamps = include;
        self
    }

    pub fn with_max_extract_rows(mut self, rows: usize) -> Self {
        self.max_extract_rows = rows;
        self
    }

    /// Steps to show, and how many were left out by `max_steps`.
    fn visible_steps<'a>(&self, results: &'a ResultModel) -> (Vec<&'a StepResult>, usize) {
        if !self.include_steps {
            return (Vec::new(), 0);
        }
        let candidates: Vec<_> = results
            .steps()
            .iter()
            .filter(|step| !self.only_problems || !step.is_passed())
            .collect();
        let shown = if self.max_steps < 0 {
            candidates.len()
        } else {
            candidates.len().min(self.max_steps as usize)
        };
        let hidden = candidates.len() - shown;
        (candidates.into_iter().take(shown).collect(), hidden)
    }
}

/// Converts a [`ResultModel`] into a textual representation.
///
/// # Examples
///
/// ```rust
/// use term_interrogate::core::ResultModel;
/// use term_interrogate::formatters::ResultFormatter;
///
/// struct OneLine;
///
/// impl ResultFormatter for OneLine {
///     fn format(&self, results: &ResultModel) -> term_interrogate::prelude::Result<String> {
///         Ok(format!("{} steps, highest {}", results.len(), results.highest_severity()))
///     }
/// }
/// ```
pub trait ResultFormatter {
    fn format(&self, results: &ResultModel) -> Result<String>;

    /// Formats with a configuration other than the formatter's own.
    fn format_with_config(&self, results: &ResultModel, _config: &FormatterConfig) -> Result<String> {
        self.format(results)
    }
}

fn render_error(e: std::fmt::Error) -> TermError {
    TermError::Internal(format!("Failed to render report: {e}"))
}

fn passed_overall(results: &ResultModel) -> bool {
    let summary = results.summary();
    summary.failed_steps == 0 && summary.error_steps == 0
}

/// Structured JSON for programmatic consumption.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for JsonFormatter {
    fn format(&self, results: &ResultModel) -> Result<String> {
        self.format_with_config(results, &self.config)
    }

    fn format_with_config(&self, results: &ResultModel, config: &FormatterConfig) -> Result<String> {
        let mut document = json!({ "passed": passed_overall(results) });

        if config.include_summary {
            let mut summary = serde_json::to_value(results.summary())?;
            if !config.include_timestamps {
                if let Some(fields) = summary.as_object_mut() {
                    fields.remove("started_at");
                    fields.remove("finished_at");
                }
            }
            document["summary"] = summary;
        }

        if config.include_steps {
            let (steps, hidden) = config.visible_steps(results);
            document["steps"] = serde_json::to_value(steps)?;
            if hidden > 0 {
                document["hidden_steps"] = Value::from(hidden);
            }
        }

        let rendered = if self.pretty {
            serde_json::to_string_pretty(&document)
        } else {
            serde_json::to_string(&document)
        };
        rendered.map_err(|e| TermError::Internal(format!("Failed to serialize result to JSON: {e}")))
    }
}

/// Console output.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    /// A detailed report for one step, including the head of its extract.
    pub fn format_step(&self, step: &StepResult) -> Result<String> {
        let mut output = String::new();
        self.write_step_report(&mut output, step)
            .map_err(render_error)?;

        if let Some(extract) = &step.extract {
            let rows = extract.num_rows().min(self.config.max_extract_rows);
            if rows > 0 {
                let head = extract.slice(0, rows);
                let table = arrow::util::pretty::pretty_format_batches(&[head])?;
                writeln!(output).map_err(render_error)?;
                writeln!(
                    output,
                    "{} ({rows} of {} rows):",
                    if step.failed > 0 { "Failing rows" } else { "Sample rows" },
                    extract.num_rows()
                )
                .map_err(render_error)?;
                writeln!(output, "{table}").map_err(render_error)?;
            }
        }
        Ok(output)
    }

    fn write_step_report(&self, out: &mut String, step: &StepResult) -> std::fmt::Result {
        writeln!(out, "Step {}: {}", step.index, step.check)?;
        if let Some(brief) = &step.brief {
            writeln!(out, "  {brief}")?;
        }
        if !step.columns.is_empty() {
            writeln!(out, "  Columns:  {}", step.columns.join(", "))?;
        }
        if let Some(values) = &step.values {
            writeln!(out, "  Values:   {values}")?;
        }
        if let Some(segment) = &step.segment {
            writeln!(out, "  Segment:  {segment}")?;
        }
        writeln!(out, "  Status:   {}", step.status)?;
        writeln!(
            out,
            "  Units:    {} total, {} passed, {} failed ({:.1}%)",
            step.total,
            step.passed,
            step.failed,
            step.fraction_failed * 100.0
        )?;
        writeln!(out, "  Severity: {}", step.severity)?;
        if let Some(error) = &step.error {
            writeln!(out, "  Error:    {error}")?;
        }
        if let Some(note) = &step.note {
            writeln!(out, "  Note:     {note}")?;
        }
        if let Some(diff) = &step.schema_diff {
            if !diff.missing.is_empty() {
                writeln!(out, "  Missing columns:    {}", diff.missing.join(", "))?;
            }
            if !diff.unexpected.is_empty() {
                writeln!(out, "  Unexpected columns: {}", diff.unexpected.join(", "))?;
            }
            for mismatch in &diff.type_mismatches {
                writeln!(
                    out,
                    "  Type mismatch: {} expected {}, found {}",
                    mismatch.column, mismatch.expected, mismatch.actual
                )?;
            }
            if diff.order_mismatch {
                writeln!(out, "  Columns are out of order")?;
            }
        }
        for message in &step.actions_triggered {
            writeln!(out, "  Action:   {message}")?;
        }
        Ok(())
    }

    fn paint(&self, config: &FormatterConfig, text: &str, color: &str) -> String {
        if config.use_colors {
            format!("\x1b[{color}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn status_symbol(&self, step: &StepResult) -> &'static str {
        match step.status {
            StepStatus::Passed => "✅",
            StepStatus::Failed => match step.severity {
                Severity::Critical | Severity::Error => "🚨",
                Severity::Warning => "⚠️",
                Severity::None => "❌",
            },
            StepStatus::Empty => "⚪",
            StepStatus::Error => "💥",
            StepStatus::Inactive => "⏸️",
        }
    }

    fn render(&self, out: &mut String, results: &ResultModel, config: &FormatterConfig) -> std::fmt::Result {
        let summary = results.summary();

        writeln!(out)?;
        if passed_overall(results) {
            writeln!(out, "✅ {}", self.paint(config, "Interrogation PASSED", "32"))?;
        } else {
            writeln!(out, "❌ {}", self.paint(config, "Interrogation FAILED", "31"))?;
        }
        writeln!(out)?;
        if let Some(label) = &summary.label {
            writeln!(out, "Plan: {label}")?;
        }
        writeln!(out, "Table: {}", summary.table)?;
        if config.include_timestamps {
            writeln!(out, "Started: {}", summary.started_at.to_rfc3339())?;
        }

        if config.include_summary {
            writeln!(out)?;
            writeln!(out, "📊 Summary:")?;
            writeln!(out, "   Steps: {}", summary.total_steps)?;
            writeln!(out, "   ✅ Passed: {}", self.paint(config, &summary.passed_steps.to_string(), "32"))?;
            writeln!(out, "   ❌ Failed: {}", self.paint(config, &summary.failed_steps.to_string(), "31"))?;
            writeln!(out, "   ⚪ Empty: {}", summary.empty_steps)?;
            writeln!(out, "   💥 Errors: {}", summary.error_steps)?;
            if summary.inactive_steps > 0 {
                writeln!(out, "   ⏸️  Inactive: {}", summary.inactive_steps)?;
            }
            writeln!(
                out,
                "   Severity: {} warning, {} error, {} critical (highest: {})",
                summary.steps_with(Severity::Warning),
                summary.steps_with(Severity::Error),
                summary.steps_with(Severity::Critical),
                summary.highest_severity
            )?;
            writeln!(out, "   Execution Time: {}ms", summary.duration_ms)?;
        }

        let (steps, hidden) = config.visible_steps(results);
        if !steps.is_empty() {
            writeln!(out)?;
            writeln!(out, "🔍 Steps:")?;
            for step in steps {
                let mut line = format!(
                    "   {} #{:<3} {}",
                    self.status_symbol(step),
                    step.index,
                    step.check
                );
                if !step.columns.is_empty() {
                    let _ = write!(line, " [{}]", step.columns.join(", "));
                }
                if let Some(values) = &step.values {
                    let _ = write!(line, " {values}");
                }
                if let Some(segment) = &step.segment {
                    let _ = write!(line, " @ {segment}");
                }
                writeln!(out, "{line}")?;
                writeln!(
                    out,
                    "        {} of {} units failed, severity {}",
                    step.failed, step.total, step.severity
                )?;
                if let Some(error) = &step.error {
                    writeln!(out, "        {}", self.paint(config, error, "31"))?;
                }
            }
            if hidden > 0 {
                writeln!(out)?;
                writeln!(out, "   ... and {hidden} more steps")?;
            }
        }

        writeln!(out)
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for HumanFormatter {
    fn format(&self, results: &ResultModel) -> Result<String> {
        self.format_with_config(results, &self.config)
    }

    fn format_with_config(&self, results: &ResultModel, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        self.render(&mut output, results, config)
            .map_err(render_error)?;
        Ok(output)
    }
}

/// Markdown for reports and pull request comments.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            heading_level: 2,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the base heading level for the output.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 5);
        self
    }

    fn render(&self, out: &mut String, results: &ResultModel, config: &FormatterConfig) -> std::fmt::Result {
        let summary = results.summary();
        let h = "#".repeat(self.heading_level as usize);

        if passed_overall(results) {
            writeln!(out, "{h} ✅ Interrogation Report - PASSED")?;
        } else {
            writeln!(out, "{h} ❌ Interrogation Report - FAILED")?;
        }
        writeln!(out)?;
        if let Some(label) = &summary.label {
            writeln!(out, "**Plan:** {}", escape_cell(label))?;
        }
        writeln!(out, "**Table:** `{}`", summary.table)?;
        if config.include_timestamps {
            writeln!(out, "**Started:** {}", summary.started_at.to_rfc3339())?;
        }

        if config.include_summary {
            writeln!(out)?;
            writeln!(out, "{h}# Summary")?;
            writeln!(out)?;
            writeln!(out, "| Metric | Value |")?;
            writeln!(out, "|--------|-------|")?;
            writeln!(out, "| Steps | {} |", summary.total_steps)?;
            writeln!(out, "| Passed | {} |", summary.passed_steps)?;
            writeln!(out, "| Failed | {} |", summary.failed_steps)?;
            writeln!(out, "| Empty | {} |", summary.empty_steps)?;
            writeln!(out, "| Errors | {} |", summary.error_steps)?;
            writeln!(out, "| Highest Severity | {} |", summary.highest_severity)?;
            writeln!(out, "| Execution Time | {}ms |", summary.duration_ms)?;
        }

        let (steps, hidden) = config.visible_steps(results);
        if !steps.is_empty() {
            writeln!(out)?;
            writeln!(out, "{h}# Steps")?;
            writeln!(out)?;
            writeln!(
                out,
                "| Step | Check | Columns | Values | Segment | Units | Failed | Severity | Status |"
            )?;
            writeln!(
                out,
                "|------|-------|---------|--------|---------|-------|--------|----------|--------|"
            )?;
            for step in steps {
                writeln!(
                    out,
                    "| {} | `{}` | {} | {} | {} | {} | {} ({:.1}%) | {} | {} |",
                    step.index,
                    step.check,
                    escape_cell(&step.columns.join(", ")),
                    escape_cell(step.values.as_deref().unwrap_or("")),
                    escape_cell(step.segment.as_deref().unwrap_or("")),
                    step.total,
                    step.failed,
                    step.fraction_failed * 100.0,
                    step.severity,
                    step.status
                )?;
            }
            if hidden > 0 {
                writeln!(out)?;
                writeln!(out, "_{hidden} more steps not shown._")?;
            }
        }
        Ok(())
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for MarkdownFormatter {
    fn format(&self, results: &ResultModel) -> Result<String> {
        self.format_with_config(results, &self.config)
    }

    fn format_with_config(&self, results: &ResultModel, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        self.render(&mut output, results, config)
            .map_err(render_error)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AuthoredStep, Thresholds, ValidationPlan};
    use crate::test_helpers::numbers_context;

    async fn results() -> ResultModel {
        let ctx = numbers_context().await;
        ValidationPlan::builder("numbers")
            .label("Numbers | nightly")
            .thresholds(Thresholds::builder().warning(0.1).build().unwrap())
            .step(AuthoredStep::col_vals_gt("a", 5))
            .step(AuthoredStep::col_vals_not_null("b"))
            .build()
            .unwrap()
            .interrogate(&ctx)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_json_formatter() {
        let results = results().await;
        let output = JsonFormatter::new().format(&results).unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["passed"], false);
        assert_eq!(parsed["summary"]["total_steps"], 2);
        assert_eq!(parsed["steps"][0]["failed"], 3);
        assert_eq!(parsed["steps"][0]["severity"], "warning");

        let config = FormatterConfig::default()
            .with_timestamps(false)
            .with_only_problems(true);
        let output = JsonFormatter::new()
            .with_pretty(false)
            .format_with_config(&results, &config)
            .unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert!(parsed["summary"].get("started_at").is_none());
        assert_eq!(parsed["steps"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_human_formatter() {
        let results = results().await;
        let output = HumanFormatter::with_config(FormatterConfig::default().with_colors(false))
            .format(&results)
            .unwrap();

        assert!(output.contains("Interrogation FAILED"));
        assert!(output.contains("#1   col_vals_gt [a] 5"));
        assert!(output.contains("3 of 5 units failed, severity warning"));
        assert!(!output.contains("\x1b["));

        let minimal = HumanFormatter::with_config(FormatterConfig::minimal())
            .format(&results)
            .unwrap();
        assert!(minimal.contains("📊 Summary:"));
        assert!(minimal.contains("   Steps: 2"));
        assert!(!minimal.contains("🔍 Steps:"));
        assert!(!minimal.contains("col_vals_gt [a]"));
    }

    #[tokio::test]
    async fn test_step_report_includes_extract() {
        let results = results().await;
        let report = HumanFormatter::new()
            .format_step(results.step(1).unwrap())
            .unwrap();

        assert!(report.contains("Step 1: col_vals_gt"));
        assert!(report.contains("Failing rows (3 of 3 rows):"));
        assert!(report.contains("| a "));
    }

    #[tokio::test]
    async fn test_step_report_explains_empty_steps() {
        let ctx = numbers_context().await;
        let results = ValidationPlan::builder("numbers")
            .step(AuthoredStep::col_vals_gt("a", 5).pre_sql("SELECT * FROM {tbl} WHERE a > 100"))
            .build()
            .unwrap()
            .interrogate(&ctx)
            .await
            .unwrap();

        let report = HumanFormatter::new()
            .format_step(results.step(1).unwrap())
            .unwrap();
        assert!(report.contains("Status:   empty"));
        assert!(report.contains("Note:     No test units to evaluate"));
    }

    #[tokio::test]
    async fn test_markdown_formatter() {
        let results = results().await;
        let output = MarkdownFormatter::new()
            .with_heading_level(3)
            .format(&results)
            .unwrap();

        assert!(output.starts_with("### ❌ Interrogation Report - FAILED"));
        assert!(output.contains("**Plan:** Numbers \\| nightly"));
        assert!(output.contains("#### Steps"));
        assert!(output.contains("| 1 | `col_vals_gt` | a | 5 |"));
    }

    #[tokio::test]
    async fn test_max_steps() {
        let results = results().await;
        let config = FormatterConfig::default().with_colors(false).with_max_steps(1);
        let output = HumanFormatter::new()
            .format_with_config(&results, &config)
            .unwrap();
        assert!(output.contains("... and 1 more steps"));
    }
}
