//! CSV files.

use super::{check_files_exist, checked_table_name, expand_globs, DataSource};
use crate::error::{Result, TermError};
use async_trait::async_trait;
use datafusion::prelude::*;
use std::path::Path;
use tracing::{debug, instrument};

/// Options for reading CSV files.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub has_header: bool,
    pub delimiter: u8,
    pub quote: u8,
    /// Extension of the files to read; taken from the first path when unset
    pub file_extension: Option<String>,
    /// Number of records read to infer the schema
    pub schema_infer_max_records: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            quote: b'"',
            file_extension: None,
            schema_infer_max_records: 1000,
        }
    }
}

impl CsvOptions {
    /// Tab separated values.
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }
}

/// One or more CSV files registered as a single table.
#[derive(Debug, Clone)]
pub struct CsvSource {
    paths: Vec<String>,
    options: CsvOptions,
}

impl CsvSource {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        Self::from_paths(vec![path.into()], CsvOptions::default())
    }

    pub fn with_options(path: impl Into<String>, options: CsvOptions) -> Result<Self> {
        Self::from_paths(vec![path.into()], options)
    }

    /// Every file matching `pattern`, e.g. `data/2024-*.csv`.
    pub fn from_glob(pattern: impl Into<String>) -> Result<Self> {
        Self::from_globs(vec![pattern.into()])
    }

    pub fn from_globs(patterns: Vec<String>) -> Result<Self> {
        Self::from_paths(expand_globs(&patterns)?, CsvOptions::default())
    }

    pub fn from_paths(paths: Vec<String>, options: CsvOptions) -> Result<Self> {
        if paths.is_empty() {
            return Err(TermError::Configuration(
                "A CSV source needs at least one path".to_string(),
            ));
        }
        check_files_exist("CSV", &paths)?;
        Ok(Self { paths, options })
    }

    pub fn options(mut self, options: CsvOptions) -> Self {
        self.options = options;
        self
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    fn file_extension(&self) -> String {
        if let Some(extension) = &self.options.file_extension {
            return extension.clone();
        }
        self.paths
            .first()
            .and_then(|path| Path::new(path).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_else(|| ".csv".to_string())
    }
}

#[async_trait]
impl DataSource for CsvSource {
    #[instrument(skip(self, ctx), fields(source.files = self.paths.len()))]
    async fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()> {
        let table_name = checked_table_name(table_name)?;
        check_files_exist("CSV", &self.paths)?;
        let extension = self.file_extension();
        let read_options = CsvReadOptions::new()
            .has_header(self.options.has_header)
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .file_extension(&extension)
            .schema_infer_max_records(self.options.schema_infer_max_records);

        let df = ctx
            .read_csv(self.paths.clone(), read_options)
            .await
            .map_err(|e| {
                TermError::data_source_with_source(
                    "CSV",
                    format!("Failed to read {}", self.description()),
                    Box::new(e),
                )
            })?;
        ctx.register_table(table_name, df.into_view())?;

        debug!(table = %table_name, source = %self.description(), "Registered CSV source");
        Ok(())
    }

    fn description(&self) -> String {
        format!("CSV {}", self.paths.join(", "))
    }
}
