//! Severity thresholds and the threshold engine.
//!
//! A [`Thresholds`] value holds up to three boundaries (warning, error,
//! critical). Each boundary is either a fraction of the step's test units or
//! an absolute count of failing units. Boundaries of the same kind must be
//! non-decreasing; this is checked whenever a `Thresholds` is constructed,
//! including when one is deserialized.

use super::Severity;
use crate::error::{Result, TermError};
use crate::security::InputValidator;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single severity boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    /// Reached when at least this many test units fail
    Count(u64),
    /// Reached when at least this fraction of test units fail
    Fraction(f64),
}

impl Threshold {
    /// A boundary expressed as a number of failing units.
    pub fn count(count: u64) -> Self {
        Threshold::Count(count)
    }

    /// A boundary expressed as a fraction of test units.
    pub fn fraction(fraction: f64) -> Self {
        Threshold::Fraction(fraction)
    }

    /// Returns true when `failed` out of `total` units reach this boundary.
    pub fn is_reached(&self, failed: u64, total: u64) -> bool {
        if total == 0 {
            return false;
        }
        match self {
            Threshold::Count(count) => failed >= *count,
            Threshold::Fraction(fraction) => (failed as f64 / total as f64) >= *fraction,
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        match self {
            Threshold::Count(_) => Ok(()),
            Threshold::Fraction(fraction) => InputValidator::validate_fraction(*fraction, name),
        }
    }
}

impl From<f64> for Threshold {
    fn from(value: f64) -> Self {
        Threshold::Fraction(value)
    }
}

impl From<u64> for Threshold {
    fn from(value: u64) -> Self {
        Threshold::Count(value)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Count(count) => write!(f, "{count}"),
            Threshold::Fraction(fraction) => write!(f, "{fraction}"),
        }
    }
}

/// Warning, error and critical boundaries for a plan or a single step.
///
/// # Examples
///
/// ```rust
/// use term_interrogate::core::{Severity, Thresholds};
///
/// let thresholds = Thresholds::builder()
///     .warning(0.1)
///     .error(0.3)
///     .critical(0.5)
///     .build()
///     .unwrap();
/// assert_eq!(thresholds.severity(1, 5), Severity::Warning);
///
/// // Boundaries must not decrease
/// assert!(Thresholds::builder().warning(0.2).error(0.1).build().is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds")]
pub struct Thresholds {
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<Threshold>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Threshold>,
    #[serde(skip_serializing_if = "Option::is_none")]
    critical: Option<Threshold>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawThresholds {
    #[serde(default)]
    warning: Option<Threshold>,
    #[serde(default)]
    error: Option<Threshold>,
    #[serde(default)]
    critical: Option<Threshold>,
}

impl TryFrom<RawThresholds> for Thresholds {
    type Error = TermError;

    fn try_from(raw: RawThresholds) -> Result<Self> {
        Thresholds::new(raw.warning, raw.error, raw.critical)
    }
}

impl Thresholds {
    /// Creates validated thresholds.
    ///
    /// Fractions must lie in `[0, 1]`. Boundaries of the same kind must satisfy
    /// `warning <= error <= critical`; a fraction and a count cannot be
    /// compared and are not checked against each other.
    pub fn new(
        warning: Option<Threshold>,
        error: Option<Threshold>,
        critical: Option<Threshold>,
    ) -> Result<Self> {
        let thresholds = Self {
            warning,
            error,
            critical,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Thresholds with no boundaries; every step is assessed as `none`.
    pub fn none() -> Self {
        Self::default()
    }

    /// Starts building thresholds.
    pub fn builder() -> ThresholdsBuilder {
        ThresholdsBuilder::default()
    }

    /// The warning boundary.
    pub fn warning(&self) -> Option<Threshold> {
        self.warning
    }

    /// The error boundary.
    pub fn error(&self) -> Option<Threshold> {
        self.error
    }

    /// The critical boundary.
    pub fn critical(&self) -> Option<Threshold> {
        self.critical
    }

    /// Returns true when no boundary is set.
    pub fn is_empty(&self) -> bool {
        self.warning.is_none() && self.error.is_none() && self.critical.is_none()
    }

    /// Returns the boundary configured for a severity.
    pub fn boundary(&self, severity: Severity) -> Option<Threshold> {
        match severity {
            Severity::None => None,
            Severity::Warning => self.warning,
            Severity::Error => self.error,
            Severity::Critical => self.critical,
        }
    }

    /// Assigns a severity to `failed` failing units out of `total`.
    ///
    /// Boundaries are tested from critical down to warning and the first one
    /// reached wins. A step with no test units, or with no failures, is
    /// always `none`.
    pub fn severity(&self, failed: u64, total: u64) -> Severity {
        if total == 0 || failed == 0 {
            return Severity::None;
        }

        Severity::REACHABLE
            .into_iter()
            .find(|severity| {
                self.boundary(*severity)
                    .is_some_and(|boundary| boundary.is_reached(failed, total))
            })
            .unwrap_or(Severity::None)
    }

    fn validate(&self) -> Result<()> {
        let named = [
            ("warning", self.warning),
            ("error", self.error),
            ("critical", self.critical),
        ];

        for (name, boundary) in &named {
            if let Some(boundary) = boundary {
                boundary.validate(name)?;
            }
        }

        for (i, (lower_name, lower)) in named.iter().enumerate() {
            for (upper_name, upper) in named.iter().skip(i + 1) {
                let out_of_order = match (lower, upper) {
                    (Some(Threshold::Fraction(a)), Some(Threshold::Fraction(b))) => a > b,
                    (Some(Threshold::Count(a)), Some(Threshold::Count(b))) => a > b,
                    _ => false,
                };
                if out_of_order {
                    return Err(TermError::Configuration(format!(
                        "Threshold '{lower_name}' ({}) must not exceed '{upper_name}' ({})",
                        lower.map(|t| t.to_string()).unwrap_or_default(),
                        upper.map(|t| t.to_string()).unwrap_or_default(),
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Builder for [`Thresholds`].
#[derive(Debug, Clone, Default)]
pub struct ThresholdsBuilder {
    warning: Option<Threshold>,
    error: Option<Threshold>,
    critical: Option<Threshold>,
}

impl ThresholdsBuilder {
    /// Sets the warning boundary.
    pub fn warning(mut self, threshold: impl Into<Threshold>) -> Self {
        self.warning = Some(threshold.into());
        self
    }

    /// Sets the error boundary.
    pub fn error(mut self, threshold: impl Into<Threshold>) -> Self {
        self.error = Some(threshold.into());
        self
    }

    /// Sets the critical boundary.
    pub fn critical(mut self, threshold: impl Into<Threshold>) -> Self {
        self.critical = Some(threshold.into());
        self
    }

    /// Validates and builds the thresholds.
    pub fn build(self) -> Result<Thresholds> {
        Thresholds::new(self.warning, self.error, self.critical)
    }
}
