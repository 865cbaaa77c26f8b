//! Parquet files.

use super::{check_files_exist, checked_table_name, expand_globs, DataSource};
use crate::error::{Result, TermError};
use async_trait::async_trait;
use datafusion::prelude::*;
use tracing::{debug, instrument};

/// One or more Parquet files registered as a single table.
#[derive(Debug, Clone)]
pub struct ParquetSource {
    paths: Vec<String>,
}

impl ParquetSource {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let paths = vec![path.into()];
        check_files_exist("Parquet", &paths)?;
        Ok(Self { paths })
    }

    pub fn from_glob(pattern: impl Into<String>) -> Result<Self> {
        Ok(Self {
            paths: expand_globs(&[pattern.into()])?,
        })
    }
}

#[async_trait]
impl DataSource for ParquetSource {
    #[instrument(skip(self, ctx), fields(source.files = self.paths.len()))]
    async fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()> {
        let table_name = checked_table_name(table_name)?;
        check_files_exist("Parquet", &self.paths)?;
        let df = ctx
            .read_parquet(self.paths.clone(), ParquetReadOptions::default())
            .await
            .map_err(|e| {
                TermError::data_source_with_source(
                    "Parquet",
                    format!("Failed to read {}", self.description()),
                    Box::new(e),
                )
            })?;
        ctx.register_table(table_name, df.into_view())?;

        debug!(table = %table_name, source = %self.description(), "Registered Parquet source");
        Ok(())
    }

    fn description(&self) -> String {
        format!("Parquet {}", self.paths.join(", "))
    }
}
