//! Table sources that register data with a DataFusion context.
//!
//! Plans refer to tables by the name they were registered under, so every
//! source validates that name before registering.

use crate::error::{Result, TermError};
use crate::security::SqlSecurity;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use std::fmt::Debug;
use std::path::Path;

mod csv;
mod json;
mod memory;
mod parquet;

pub use csv::{CsvOptions, CsvSource};
pub use json::{JsonOptions, JsonSource};
pub use memory::MemorySource;
pub use parquet::ParquetSource;

/// A table that can be registered with a DataFusion context.
///
/// # Examples
///
/// ```rust,no_run
/// use term_interrogate::sources::{CsvSource, DataSource};
/// use datafusion::prelude::SessionContext;
///
/// # async fn example() -> term_interrogate::prelude::Result<()> {
/// let ctx = SessionContext::new();
/// CsvSource::new("data/orders.csv")?.register(&ctx, "orders").await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait DataSource: Debug + Send + Sync {
    /// Registers the data as `table_name`.
    async fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()>;

    /// A human-readable description of the source.
    fn description(&self) -> String;
}

/// Validates a table name before it is registered.
pub(crate) fn checked_table_name(table_name: &str) -> Result<&str> {
    SqlSecurity::table_reference(table_name)
        .map_err(|e| TermError::Configuration(format!("Invalid table name: {e}")))
}

/// Fails when any of `paths` is not an existing file.
pub(crate) fn check_files_exist(format: &str, paths: &[String]) -> Result<()> {
    for path in paths {
        if !Path::new(path).is_file() {
            return Err(TermError::data_source(
                format,
                format!("File not found: {path}"),
            ));
        }
    }
    Ok(())
}

/// Expands glob patterns into the matching file paths, in sorted order.
pub(crate) fn expand_globs(patterns: &[String]) -> Result<Vec<String>> {
    use glob::glob;

    let mut paths = Vec::new();
    for pattern in patterns {
        let matches = glob(pattern).map_err(|e| {
            TermError::Configuration(format!("Invalid glob pattern '{pattern}': {e}"))
        })?;

        for entry in matches {
            let path = entry
                .map_err(|e| TermError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

            if path.is_file() {
                if let Some(path_str) = path.to_str() {
                    paths.push(path_str.to_string());
                }
            }
        }
    }

    if paths.is_empty() {
        return Err(TermError::data_source(
            "file",
            format!("No files found matching {}", patterns.join(", ")),
        ));
    }

    paths.sort();
    paths.dedup();
    Ok(paths)
}
