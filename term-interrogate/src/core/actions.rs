//! Actions fired when a step reaches a severity, and final actions fired once
//! after an interrogation.

use super::{Severity, ValidationSummary};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Callback invoked when a step reaches a severity.
pub type ActionCallback = Arc<dyn Fn(&ActionEvent) + Send + Sync>;

/// Callback invoked once with the interrogation summary.
pub type FinalCallback = Arc<dyn Fn(&ValidationSummary) + Send + Sync>;

/// What a step action sees when it fires.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionEvent {
    pub step: usize,
    pub check: String,
    pub columns: Vec<String>,
    pub values: Option<String>,
    pub segment: Option<String>,
    pub severity: Severity,
    /// The rendered message
    pub message: String,
}

/// Per-severity message templates and an optional callback.
///
/// Templates may use `{step}`, `{type}`, `{col}`, `{val}`, `{level}` and
/// `{seg}`. A level without its own template falls back to `default`.
///
/// # Examples
///
/// ```rust
/// use term_interrogate::core::Actions;
///
/// let actions = Actions::new()
///     .warning("Step {step} ({type} on {col}) needs a look")
///     .critical("Step {step} is critical");
/// ```
#[derive(Clone, Deserialize)]
pub struct Actions {
    #[serde(default)]
    warning: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    critical: Option<String>,
    #[serde(default)]
    default: Option<String>,
    /// Fire only for the highest severity reached instead of every level up to it
    #[serde(default = "default_highest_only")]
    highest_only: bool,
    #[serde(skip)]
    callback: Option<ActionCallback>,
}

fn default_highest_only() -> bool {
    true
}

impl Default for Actions {
    fn default() -> Self {
        Self {
            warning: None,
            error: None,
            critical: None,
            default: None,
            highest_only: true,
            callback: None,
        }
    }
}

impl fmt::Debug for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actions")
            .field("warning", &self.warning)
            .field("error", &self.error)
            .field("critical", &self.critical)
            .field("default", &self.default)
            .field("highest_only", &self.highest_only)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl Actions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning(mut self, template: impl Into<String>) -> Self {
        self.warning = Some(template.into());
        self
    }

    pub fn error(mut self, template: impl Into<String>) -> Self {
        self.error = Some(template.into());
        self
    }

    pub fn critical(mut self, template: impl Into<String>) -> Self {
        self.critical = Some(template.into());
        self
    }

    /// Template used by every level without its own.
    pub fn default_template(mut self, template: impl Into<String>) -> Self {
        self.default = Some(template.into());
        self
    }

    pub fn highest_only(mut self, highest_only: bool) -> Self {
        self.highest_only = highest_only;
        self
    }

    /// Calls `callback` for every level that fires.
    pub fn on_trigger<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ActionEvent) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    fn template(&self, severity: Severity) -> Option<&str> {
        let specific = match severity {
            Severity::None => None,
            Severity::Warning => self.warning.as_deref(),
            Severity::Error => self.error.as_deref(),
            Severity::Critical => self.critical.as_deref(),
        };
        specific.or(self.default.as_deref())
    }

    /// Fires the actions for a step that reached `severity` and returns the
    /// rendered messages in the order they fired.
    pub fn fire(&self, target: &ActionTarget<'_>, severity: Severity) -> Vec<String> {
        if severity == Severity::None {
            return Vec::new();
        }

        let levels: Vec<Severity> = if self.highest_only {
            vec![severity]
        } else {
            let mut reached: Vec<_> = Severity::REACHABLE
                .into_iter()
                .filter(|level| severity.is_at_least(*level))
                .collect();
            reached.reverse();
            reached
        };

        let mut messages = Vec::new();
        for level in levels {
            let template = self.template(level);
            if template.is_none() && self.callback.is_none() {
                continue;
            }

            let message = match template {
                Some(template) => target.render(template, level),
                None => target.render("Step {step} ({type}) reached {level}", level),
            };

            if let Some(callback) = &self.callback {
                let event = ActionEvent {
                    step: target.step,
                    check: target.check.to_string(),
                    columns: target.columns.to_vec(),
                    values: target.values.map(String::from),
                    segment: target.segment.map(String::from),
                    severity: level,
                    message: message.clone(),
                };
                // a panicking callback must not take the interrogation down
                if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(&event)))
                    .is_err()
                {
                    warn!(step.index = target.step, "Step action callback panicked");
                }
            }

            if template.is_some() {
                messages.push(message);
            }
        }
        messages
    }
}

/// The step an action is fired for.
#[derive(Debug, Clone, Copy)]
pub struct ActionTarget<'a> {
    pub step: usize,
    pub check: &'a str,
    pub columns: &'a [String],
    pub values: Option<&'a str>,
    pub segment: Option<&'a str>,
}

impl ActionTarget<'_> {
    fn render(&self, template: &str, level: Severity) -> String {
        template
            .replace("{step}", &self.step.to_string())
            .replace("{type}", self.check)
            .replace("{col}", &self.columns.join(", "))
            .replace("{val}", self.values.unwrap_or(""))
            .replace("{level}", level.as_str())
            .replace("{seg}", self.segment.unwrap_or(""))
    }
}

/// Callbacks run once after every step has been evaluated.
#[derive(Clone, Default)]
pub struct FinalActions {
    callbacks: Vec<FinalCallback>,
}

impl FinalActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ValidationSummary) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(callback));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub(crate) fn run(&self, summary: &ValidationSummary) {
        for callback in &self.callbacks {
            if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(summary)))
                .is_err()
            {
                warn!("Final action callback panicked");
            }
        }
    }
}

impl fmt::Debug for FinalActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinalActions")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
