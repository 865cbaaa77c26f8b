//! Commonly used types.

pub use crate::core::{
    Actions, AuthoredStep, FinalActions, InterrogateOptions, Interrogation, ResultModel, Severity,
    StepResult, StepStatus, SunderedType, Thresholds, ValidationPlan,
};
pub use crate::error::{ErrorContext, Result, TermError};
pub use crate::formatters::{FormatterConfig, ResultFormatter};
pub use crate::logging::LogConfig;
pub use crate::selectors::{ColumnSelector, ColumnSpec, SegmentSpec};
pub use crate::sources::DataSource;
