//! Per-step runtime context handed to checks during evaluation.
//!
//! The orchestrator scopes a [`ValidationContext`] around every atomic step so
//! checks can find the effective table (the base table or a preprocessed
//! view), the segment predicate and the extract settings without widening the
//! [`Constraint`](super::Constraint) interface.

use std::sync::Arc;

/// Default number of rows kept in a step extract.
pub const DEFAULT_EXTRACT_LIMIT: usize = 500;

/// Runtime context for one atomic step.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    table_name: Arc<str>,
    segment: Option<Arc<str>>,
    extract_limit: usize,
    collect_extracts: bool,
}

impl ValidationContext {
    /// Creates a context for the given table with no segment.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use term_interrogate::core::ValidationContext;
    ///
    /// let ctx = ValidationContext::new("orders").with_segment("\"region\" = 'north'");
    /// assert_eq!(ctx.table_name(), "orders");
    /// assert_eq!(ctx.row_filter(), "\"region\" = 'north'");
    /// ```
    pub fn new(table_name: impl Into<Arc<str>>) -> Self {
        Self {
            table_name: table_name.into(),
            segment: None,
            extract_limit: DEFAULT_EXTRACT_LIMIT,
            collect_extracts: true,
        }
    }

    /// Restricts evaluation to rows matching a SQL predicate.
    pub fn with_segment(mut self, predicate: impl Into<Arc<str>>) -> Self {
        self.segment = Some(predicate.into());
        self
    }

    pub fn with_extract_limit(mut self, limit: usize) -> Self {
        self.extract_limit = limit;
        self
    }

    pub fn with_collect_extracts(mut self, collect: bool) -> Self {
        self.collect_extracts = collect;
        self
    }

    /// Returns the name of the table being interrogated.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The segment predicate, if the step is segmented.
    pub fn segment(&self) -> Option<&str> {
        self.segment.as_deref()
    }

    /// A predicate usable in a `WHERE` clause; `TRUE` when unsegmented.
    pub fn row_filter(&self) -> &str {
        self.segment.as_deref().unwrap_or("TRUE")
    }

    pub fn extract_limit(&self) -> usize {
        self.extract_limit
    }

    pub fn collect_extracts(&self) -> bool {
        self.collect_extracts && self.extract_limit > 0
    }
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self::new("data")
    }
}

tokio::task_local! {
    pub static CURRENT_CONTEXT: ValidationContext;
}

/// Gets the current validation context.
///
/// Returns the default context (table `data`) if none has been set.
pub fn current_validation_context() -> ValidationContext {
    CURRENT_CONTEXT
        .try_with(|ctx| ctx.clone())
        .unwrap_or_default()
}
