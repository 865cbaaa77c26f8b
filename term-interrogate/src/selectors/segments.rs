//! Segmentation specifications and their resolution into row subsets.

use crate::core::Literal;
use crate::error::{Result, TermError};
use crate::security::SqlSecurity;
use arrow::array::{Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use datafusion::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How an authored step is split into row segments.
///
/// # Examples
///
/// ```rust
/// use term_interrogate::selectors::SegmentSpec;
///
/// // one segment per distinct region
/// let by_region = SegmentSpec::column("region");
///
/// // only these two regions, in this order
/// let chosen = SegmentSpec::values("region", ["north", "south"]);
///
/// // every (region, channel) pair
/// let crossed = SegmentSpec::Cross(vec![by_region, SegmentSpec::column("channel")]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SegmentSpec {
    /// One segment per distinct non-null value of the column
    Column(String),
    /// One segment per listed value, in list order
    Values { column: String, values: Vec<Literal> },
    /// The cross product of several specs, in list order
    Cross(Vec<SegmentSpec>),
}

/// A resolved row subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Human-readable label such as `region/north`
    pub label: String,
    /// SQL boolean predicate selecting the segment's rows
    pub predicate: String,
}

impl SegmentSpec {
    pub fn column(name: impl Into<String>) -> Self {
        SegmentSpec::Column(name.into())
    }

    pub fn values<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        SegmentSpec::Values {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            SegmentSpec::Column(column) => SqlSecurity::validate_identifier(column),
            SegmentSpec::Values { column, values } => {
                SqlSecurity::validate_identifier(column)?;
                if values.is_empty() {
                    return Err(TermError::Configuration(format!(
                        "Segment values for '{column}' cannot be empty"
                    )));
                }
                values.iter().try_for_each(Literal::validate)
            }
            SegmentSpec::Cross(specs) => {
                if specs.is_empty() {
                    return Err(TermError::Configuration(
                        "Segment list cannot be empty".to_string(),
                    ));
                }
                for spec in specs {
                    if matches!(spec, SegmentSpec::Cross(_)) {
                        return Err(TermError::Configuration(
                            "Segment lists cannot be nested".to_string(),
                        ));
                    }
                    spec.validate()?;
                }
                Ok(())
            }
        }
    }

    /// Resolves the segmentation against a registered table.
    ///
    /// Observed values are enumerated in ascending order with nulls
    /// excluded. Explicit values are kept even when absent from the data,
    /// which gives segments with no rows.
    pub async fn resolve(&self, ctx: &SessionContext, table: &str) -> Result<Vec<Segment>> {
        match self {
            SegmentSpec::Cross(specs) => {
                let mut product = vec![Segment {
                    label: String::new(),
                    predicate: String::new(),
                }];
                for spec in specs {
                    let resolved = spec.resolve_single(ctx, table).await?;
                    product = product
                        .iter()
                        .flat_map(|left| resolved.iter().map(move |right| left.combine(right)))
                        .collect();
                }
                Ok(product)
            }
            single => single.resolve_single(ctx, table).await,
        }
    }

    async fn resolve_single(&self, ctx: &SessionContext, table: &str) -> Result<Vec<Segment>> {
        match self {
            SegmentSpec::Column(column) => observed_segments(ctx, table, column).await,
            SegmentSpec::Values { column, values } => {
                let quoted = SqlSecurity::quote_identifier(column)?;
                Ok(values
                    .iter()
                    .map(|value| Segment {
                        label: format!("{column}/{value}"),
                        predicate: format!("{quoted} = {}", value.to_sql()),
                    })
                    .collect())
            }
            SegmentSpec::Cross(_) => Err(TermError::Configuration(
                "Segment lists cannot be nested".to_string(),
            )),
        }
    }
}

impl Segment {
    fn combine(&self, other: &Segment) -> Segment {
        if self.predicate.is_empty() {
            return other.clone();
        }
        Segment {
            label: format!("{}, {}", self.label, other.label),
            predicate: format!("({}) AND ({})", self.predicate, other.predicate),
        }
    }
}

async fn observed_segments(
    ctx: &SessionContext,
    table: &str,
    column: &str,
) -> Result<Vec<Segment>> {
    let quoted = SqlSecurity::quote_identifier(column)?;
    let table_ident = SqlSecurity::table_reference(table)?;

    let sql = format!(
        "SELECT raw, CAST(raw AS VARCHAR) AS label \
         FROM (SELECT DISTINCT {quoted} AS raw FROM {table_ident} WHERE {quoted} IS NOT NULL) \
         ORDER BY raw"
    );

    let batches = ctx.sql(&sql).await?.collect().await?;

    let mut segments = Vec::new();
    for batch in &batches {
        let labels = cast(batch.column(1), &DataType::Utf8)?;
        let labels = labels
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| TermError::Internal("Failed to read segment labels".to_string()))?;

        for row in 0..labels.len() {
            if labels.is_null(row) {
                continue;
            }
            let value = labels.value(row);
            segments.push(Segment {
                label: format!("{column}/{value}"),
                predicate: format!(
                    "CAST({quoted} AS VARCHAR) = {}",
                    SqlSecurity::quote_literal(value)
                ),
            });
        }
    }

    debug!(
        segment.column = %column,
        segment.count = segments.len(),
        "Resolved observed segment values"
    );

    Ok(segments)
}
