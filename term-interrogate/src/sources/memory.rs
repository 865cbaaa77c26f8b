//! In-memory Arrow batches.

use super::{checked_table_name, DataSource};
use crate::error::{Result, TermError};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use std::sync::Arc;

/// Record batches registered as a table.
#[derive(Debug, Clone)]
pub struct MemorySource {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl MemorySource {
    /// Uses the schema of the first batch.
    pub fn new(batches: Vec<RecordBatch>) -> Result<Self> {
        let schema = batches
            .first()
            .map(|batch| batch.schema())
            .ok_or_else(|| {
                TermError::Configuration(
                    "A memory source needs at least one batch or an explicit schema".to_string(),
                )
            })?;
        Ok(Self { schema, batches })
    }

    pub fn with_schema(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    pub fn from_batch(batch: RecordBatch) -> Self {
        Self {
            schema: batch.schema(),
            batches: vec![batch],
        }
    }
}

#[async_trait]
impl DataSource for MemorySource {
    async fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()> {
        let table_name = checked_table_name(table_name)?;
        let table = MemTable::try_new(self.schema.clone(), vec![self.batches.clone()])?;
        ctx.register_table(table_name, Arc::new(table))?;
        Ok(())
    }

    fn description(&self) -> String {
        let rows: usize = self.batches.iter().map(RecordBatch::num_rows).sum();
        format!("Memory ({rows} rows, {} columns)", self.schema.fields().len())
    }
}
