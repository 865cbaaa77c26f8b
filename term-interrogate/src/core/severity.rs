//! Step severity verdicts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The verdict assigned to an atomic step by the threshold engine.
///
/// Severities are ordered: `Critical > Error > Warning > None`.
///
/// # Examples
///
/// ```rust
/// use term_interrogate::core::Severity;
///
/// assert!(Severity::Critical > Severity::Error);
/// assert!(Severity::Warning.is_at_least(Severity::Warning));
/// assert_eq!(Severity::Error.to_string(), "error");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// No threshold was reached (or the step could not be assessed)
    #[default]
    None = 0,
    /// The warning boundary was reached
    Warning = 1,
    /// The error boundary was reached
    Error = 2,
    /// The critical boundary was reached
    Critical = 3,
}

impl Severity {
    /// All severities that can be reached, from most to least severe.
    pub const REACHABLE: [Severity; 3] = [Severity::Critical, Severity::Error, Severity::Warning];

    /// Returns the string representation of the severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }

    /// Checks if this severity is at least as severe as another.
    pub fn is_at_least(&self, other: Severity) -> bool {
        *self >= other
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = crate::error::TermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Severity::None),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            other => Err(crate::error::TermError::Configuration(format!(
                "Unknown severity '{other}'"
            ))),
        }
    }
}
