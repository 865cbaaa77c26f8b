//! Newline-delimited JSON files.

use super::{check_files_exist, checked_table_name, expand_globs, DataSource};
use crate::error::{Result, TermError};
use async_trait::async_trait;
use datafusion::prelude::*;
use tracing::{debug, instrument};

/// Options for reading newline-delimited JSON.
#[derive(Debug, Clone)]
pub struct JsonOptions {
    pub file_extension: String,
    /// Number of records read to infer the schema
    pub schema_infer_max_records: usize,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            file_extension: ".json".to_string(),
            schema_infer_max_records: 1000,
        }
    }
}

/// One or more NDJSON files registered as a single table.
#[derive(Debug, Clone)]
pub struct JsonSource {
    paths: Vec<String>,
    options: JsonOptions,
}

impl JsonSource {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let paths = vec![path.into()];
        check_files_exist("JSON", &paths)?;
        Ok(Self {
            paths,
            options: JsonOptions::default(),
        })
    }

    pub fn from_glob(pattern: impl Into<String>) -> Result<Self> {
        Ok(Self {
            paths: expand_globs(&[pattern.into()])?,
            options: JsonOptions::default(),
        })
    }

    pub fn options(mut self, options: JsonOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl DataSource for JsonSource {
    #[instrument(skip(self, ctx), fields(source.files = self.paths.len()))]
    async fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()> {
        let table_name = checked_table_name(table_name)?;
        check_files_exist("JSON", &self.paths)?;
        let mut read_options =
            NdJsonReadOptions::default().file_extension(&self.options.file_extension);
        read_options.schema_infer_max_records = self.options.schema_infer_max_records;

        let df = ctx
            .read_json(self.paths.clone(), read_options)
            .await
            .map_err(|e| {
                TermError::data_source_with_source(
                    "JSON",
                    format!("Failed to read {}", self.description()),
                    Box::new(e),
                )
            })?;
        ctx.register_table(table_name, df.into_view())?;

        debug!(table = %table_name, source = %self.description(), "Registered JSON source");
        Ok(())
    }

    fn description(&self) -> String {
        format!("JSON {}", self.paths.join(", "))
    }
}
