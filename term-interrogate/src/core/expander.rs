//! Expansion of authored steps into numbered atomic steps.
//!
//! Each authored step becomes `columns × segments` atomic steps, columns
//! varying slower. Indices are 1-based, contiguous and follow declaration
//! order. Problems found while expanding one authored step (a failed
//! preprocessing query, a missing column, a selector that matches nothing)
//! become a single non-ready atomic step; they never stop the expansion of
//! later steps.

use super::{AuthoredStep, CheckKind, ValidationPlan};
use crate::checks::table_schema;
use crate::error::{Result, TermError};
use crate::selectors::{ColumnSpec, Segment};
use crate::{log_data_op, log_step};
use arrow::datatypes::Schema;
use datafusion::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// How far an atomic step got through expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum ExpansionState {
    /// Ready to evaluate
    Ready,
    /// Nothing to evaluate, e.g. a selector matched no columns
    Empty(String),
    /// Preprocessing or resolution failed
    Failed(String),
    /// The authored step is switched off
    Inactive,
}

/// One concrete, executable unit of a plan.
#[derive(Debug, Clone)]
pub struct AtomicStep {
    /// 1-based position in the interrogation
    pub index: usize,
    /// 1-based position of the owning authored step
    pub authored_index: usize,
    pub columns: Vec<String>,
    pub segment: Option<Segment>,
    /// The base table, or the preprocessed view the step reads
    pub table: String,
    pub brief: Option<String>,
    pub state: ExpansionState,
    authored: Arc<AuthoredStep>,
}

impl AtomicStep {
    pub fn check(&self) -> &'static str {
        self.authored.kind().name()
    }

    pub fn kind(&self) -> &CheckKind {
        self.authored.kind()
    }

    pub fn authored(&self) -> &AuthoredStep {
        &self.authored
    }

    pub fn is_preprocessed(&self) -> bool {
        self.authored.preprocessor().is_some()
    }
}

/// Expands a plan against the tables registered in `ctx`.
pub struct StepExpander<'a> {
    plan: &'a ValidationPlan,
    ctx: &'a SessionContext,
    steps: Vec<AtomicStep>,
}

impl<'a> StepExpander<'a> {
    pub fn new(plan: &'a ValidationPlan, ctx: &'a SessionContext) -> Self {
        Self {
            plan,
            ctx,
            steps: Vec::new(),
        }
    }

    /// Expands every authored step.
    ///
    /// Fails only when the plan's base table cannot be read.
    #[instrument(skip(self), fields(plan.table = %self.plan.table(), plan.steps = self.plan.steps().len()))]
    pub async fn expand(mut self) -> Result<Vec<AtomicStep>> {
        self.ctx.table(self.plan.table()).await.map_err(|e| {
            TermError::data_source_with_source(
                "table",
                format!("Cannot read table '{}'", self.plan.table()),
                Box::new(e),
            )
        })?;

        for (i, authored) in self.plan.steps().iter().enumerate() {
            let before = self.steps.len();
            self.expand_step(i + 1, authored).await;
            debug!(
                step.authored_index = i + 1,
                step.check = %authored.kind().name(),
                step.atomic_count = self.steps.len() - before,
                "Expanded authored step"
            );
        }

        Ok(self.steps)
    }

    async fn expand_step(&mut self, authored_index: usize, authored: &Arc<AuthoredStep>) {
        let base = self.plan.table().to_string();
        let literal_columns = authored
            .column_spec()
            .map(literal_names)
            .unwrap_or_default();

        if !authored.is_active() {
            self.push(
                authored_index,
                authored,
                &base,
                literal_columns,
                None,
                ExpansionState::Inactive,
            );
            return;
        }

        let table = match authored.preprocessor() {
            None => base,
            Some(pre) => {
                let view = self.plan.view_name(authored_index);
                if let Err(e) = pre.apply(self.ctx, &base, &view).await {
                    warn!(
                        step.authored_index = authored_index,
                        error = %e,
                        "Preprocessing failed"
                    );
                    self.push(
                        authored_index,
                        authored,
                        &base,
                        literal_columns,
                        None,
                        ExpansionState::Failed(format!("Preprocessing failed: {e}")),
                    );
                    return;
                }
                log_data_op!(
                    self.plan.options().log_config,
                    step.authored_index = authored_index,
                    view = %view,
                    "Registered preprocessed view"
                );
                view
            }
        };

        let schema = match table_schema(self.ctx, &table).await {
            Ok(schema) => schema,
            Err(e) => {
                self.push(
                    authored_index,
                    authored,
                    &table,
                    literal_columns,
                    None,
                    ExpansionState::Failed(e.to_string()),
                );
                return;
            }
        };

        let columns = match resolve_columns(authored, &schema) {
            Ok(columns) => columns,
            Err(e) => {
                self.push(
                    authored_index,
                    authored,
                    &table,
                    literal_columns,
                    None,
                    ExpansionState::Failed(e.to_string()),
                );
                return;
            }
        };

        let column_groups: Vec<Vec<String>> = if authored.kind().expands_by_column() {
            columns.into_iter().map(|column| vec![column]).collect()
        } else {
            vec![columns]
        };

        let selects_columns =
            authored.kind().expands_by_column() || authored.column_spec().is_some();
        if column_groups.iter().all(Vec::is_empty) && selects_columns {
            self.push(
                authored_index,
                authored,
                &table,
                Vec::new(),
                None,
                ExpansionState::Empty("Column selection matched no columns".to_string()),
            );
            return;
        }

        let segments: Vec<Option<Segment>> = match authored.segment_spec() {
            None => vec![None],
            Some(spec) => match spec.resolve(self.ctx, &table).await {
                Ok(segments) if segments.is_empty() => {
                    self.push(
                        authored_index,
                        authored,
                        &table,
                        column_groups.into_iter().flatten().collect(),
                        None,
                        ExpansionState::Empty("Segmentation produced no segments".to_string()),
                    );
                    return;
                }
                Ok(segments) => segments.into_iter().map(Some).collect(),
                Err(e) => {
                    self.push(
                        authored_index,
                        authored,
                        &table,
                        column_groups.into_iter().flatten().collect(),
                        None,
                        ExpansionState::Failed(format!("Segment resolution failed: {e}")),
                    );
                    return;
                }
            },
        };

        for columns in column_groups {
            for segment in &segments {
                self.push(
                    authored_index,
                    authored,
                    &table,
                    columns.clone(),
                    segment.clone(),
                    ExpansionState::Ready,
                );
            }
        }
    }

    fn push(
        &mut self,
        authored_index: usize,
        authored: &Arc<AuthoredStep>,
        table: &str,
        columns: Vec<String>,
        segment: Option<Segment>,
        state: ExpansionState,
    ) {
        let index = self.steps.len() + 1;
        let brief = authored.brief_template().map(|template| {
            template
                .replace("{col}", &columns.join(", "))
                .replace("{step}", &index.to_string())
                .replace(
                    "{seg}",
                    segment.as_ref().map(|s| s.label.as_str()).unwrap_or(""),
                )
        });

        log_step!(
            self.plan.options().log_config,
            step.index = index,
            step.check = %authored.kind().name(),
            step.columns = ?columns,
            step.segment = ?segment.as_ref().map(|s| &s.label),
            step.state = ?state,
            "Created atomic step"
        );

        self.steps.push(AtomicStep {
            index,
            authored_index,
            columns,
            segment,
            table: table.to_string(),
            brief,
            state,
            authored: Arc::clone(authored),
        });
    }
}

fn resolve_columns(authored: &AuthoredStep, schema: &Schema) -> Result<Vec<String>> {
    match authored.column_spec() {
        Some(spec) if authored.kind().tolerates_missing_columns() => {
            spec.resolve_unchecked(schema)
        }
        Some(spec) => spec.resolve(schema),
        None => Ok(match authored.kind() {
            // whole-row checks default to every column
            CheckKind::RowsDistinct | CheckKind::RowsComplete => schema
                .fields()
                .iter()
                .map(|field| field.name().clone())
                .collect(),
            _ => Vec::new(),
        }),
    }
}

fn literal_names(spec: &ColumnSpec) -> Vec<String> {
    match spec {
        ColumnSpec::Name(name) => vec![name.clone()],
        ColumnSpec::List(names) => names.clone(),
        ColumnSpec::Selector(_) => Vec::new(),
    }
}
