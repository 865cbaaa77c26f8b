//! Column specifications and the selector algebra.
//!
//! A [`ColumnSpec`] names the columns an authored step applies to. It is a
//! literal name, an explicit list, or a [`ColumnSelector`] tree that is
//! evaluated against the table schema when the plan is interrogated.

use crate::error::{Result, TermError};
use arrow::datatypes::{DataType, Schema};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::{BitAnd, BitOr, Not, Sub};

/// The columns an authored step targets.
///
/// # JSON form
///
/// A bare string is always a literal column name and an array is a list of
/// names. Selectors are objects keyed by the snake_case selector name, so
/// selectors without arguments take `null`:
///
/// ```json
/// "amount"
/// ["a", "b"]
/// {"starts_with": "amount_"}
/// {"numeric": null}
/// {"and": [{"numeric": null}, {"not": {"ends_with": "_id"}}]}
/// ```
///
/// # Examples
///
/// ```rust
/// use term_interrogate::selectors::{ColumnSelector, ColumnSpec};
///
/// let single: ColumnSpec = "amount".into();
/// let several: ColumnSpec = vec!["a", "b"].into();
/// let numeric_not_ids: ColumnSpec =
///     (ColumnSelector::Numeric - ColumnSelector::ends_with("_id")).into();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSpec {
    /// A single literal column name
    Name(String),
    /// An explicit list of names; list order is kept
    List(Vec<String>),
    /// A selector evaluated against the schema
    Selector(ColumnSelector),
}

/// A node in the column selector expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSelector {
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    /// Column names matching a regular expression
    Matches(String),
    First(usize),
    Last(usize),
    Everything,
    /// Every column except the given zero-based positions
    EverythingExcept(Vec<usize>),
    Numeric,
    Text,
    Boolean,
    /// Dictionary-encoded columns
    Categorical,
    /// Date, time, timestamp, duration and interval columns
    Datetime,
    /// Named columns; every name must exist
    Named(Vec<String>),
    And(Box<ColumnSelector>, Box<ColumnSelector>),
    Or(Box<ColumnSelector>, Box<ColumnSelector>),
    Difference(Box<ColumnSelector>, Box<ColumnSelector>),
    Not(Box<ColumnSelector>),
}

impl ColumnSelector {
    pub fn starts_with(text: impl Into<String>) -> Self {
        ColumnSelector::StartsWith(text.into())
    }

    pub fn ends_with(text: impl Into<String>) -> Self {
        ColumnSelector::EndsWith(text.into())
    }

    pub fn contains(text: impl Into<String>) -> Self {
        ColumnSelector::Contains(text.into())
    }

    pub fn matches(pattern: impl Into<String>) -> Self {
        ColumnSelector::Matches(pattern.into())
    }

    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ColumnSelector::Named(names.into_iter().map(Into::into).collect())
    }

    /// Evaluates the selector to a set of schema positions.
    pub fn select(&self, schema: &Schema) -> Result<BTreeSet<usize>> {
        let width = schema.fields().len();
        let selected = match self {
            ColumnSelector::StartsWith(text) => by_name(schema, |name| name.starts_with(text)),
            ColumnSelector::EndsWith(text) => by_name(schema, |name| name.ends_with(text)),
            ColumnSelector::Contains(text) => by_name(schema, |name| name.contains(text.as_str())),
            ColumnSelector::Matches(pattern) => {
                let regex = compile(pattern)?;
                by_name(schema, |name| regex.is_match(name))
            }
            ColumnSelector::First(n) => (0..(*n).min(width)).collect(),
            ColumnSelector::Last(n) => (width.saturating_sub(*n)..width).collect(),
            ColumnSelector::Everything => (0..width).collect(),
            ColumnSelector::EverythingExcept(positions) => (0..width)
                .filter(|position| !positions.contains(position))
                .collect(),
            ColumnSelector::Numeric => by_type(schema, is_numeric),
            ColumnSelector::Text => by_type(schema, is_text),
            ColumnSelector::Boolean => by_type(schema, |dt| matches!(dt, DataType::Boolean)),
            ColumnSelector::Categorical => {
                by_type(schema, |dt| matches!(dt, DataType::Dictionary(_, _)))
            }
            ColumnSelector::Datetime => by_type(schema, is_datetime),
            ColumnSelector::Named(names) => names
                .iter()
                .map(|name| position_of(schema, name))
                .collect::<Result<_>>()?,
            ColumnSelector::And(left, right) => left
                .select(schema)?
                .intersection(&right.select(schema)?)
                .copied()
                .collect(),
            ColumnSelector::Or(left, right) => left
                .select(schema)?
                .union(&right.select(schema)?)
                .copied()
                .collect(),
            ColumnSelector::Difference(left, right) => left
                .select(schema)?
                .difference(&right.select(schema)?)
                .copied()
                .collect(),
            ColumnSelector::Not(inner) => {
                let excluded = inner.select(schema)?;
                (0..width)
                    .filter(|position| !excluded.contains(position))
                    .collect()
            }
        };
        Ok(selected)
    }

    /// Checks regex patterns without needing a schema.
    pub fn validate(&self) -> Result<()> {
        match self {
            ColumnSelector::Matches(pattern) => compile(pattern).map(|_| ()),
            ColumnSelector::Named(names) if names.is_empty() => Err(TermError::Configuration(
                "Named column selector needs at least one name".to_string(),
            )),
            ColumnSelector::And(left, right)
            | ColumnSelector::Or(left, right)
            | ColumnSelector::Difference(left, right) => {
                left.validate()?;
                right.validate()
            }
            ColumnSelector::Not(inner) => inner.validate(),
            _ => Ok(()),
        }
    }
}

impl BitAnd for ColumnSelector {
    type Output = ColumnSelector;

    fn bitand(self, rhs: Self) -> Self::Output {
        ColumnSelector::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for ColumnSelector {
    type Output = ColumnSelector;

    fn bitor(self, rhs: Self) -> Self::Output {
        ColumnSelector::Or(Box::new(self), Box::new(rhs))
    }
}

impl Sub for ColumnSelector {
    type Output = ColumnSelector;

    fn sub(self, rhs: Self) -> Self::Output {
        ColumnSelector::Difference(Box::new(self), Box::new(rhs))
    }
}

impl Not for ColumnSelector {
    type Output = ColumnSelector;

    fn not(self) -> Self::Output {
        ColumnSelector::Not(Box::new(self))
    }
}

impl ColumnSpec {
    /// Resolves the column names against a schema.
    ///
    /// Selectors yield columns in schema order; lists keep their own order
    /// with duplicates removed. A literal name missing from the schema is a
    /// [`TermError::ColumnNotFound`]. A selector that matches nothing
    /// returns an empty list.
    pub fn resolve(&self, schema: &Schema) -> Result<Vec<String>> {
        match self {
            ColumnSpec::Name(name) => {
                position_of(schema, name)?;
                Ok(vec![name.clone()])
            }
            ColumnSpec::List(names) => {
                let names = dedup(names);
                for name in &names {
                    position_of(schema, name)?;
                }
                Ok(names)
            }
            ColumnSpec::Selector(selector) => Ok(selector
                .select(schema)?
                .into_iter()
                .map(|position| schema.field(position).name().clone())
                .collect()),
        }
    }

    /// Resolves without checking that literal names exist.
    ///
    /// Used by checks whose purpose is to report on existence.
    pub fn resolve_unchecked(&self, schema: &Schema) -> Result<Vec<String>> {
        match self {
            ColumnSpec::Name(name) => Ok(vec![name.clone()]),
            ColumnSpec::List(names) => Ok(dedup(names)),
            ColumnSpec::Selector(_) => self.resolve(schema),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ColumnSpec::Name(name) if name.is_empty() => Err(TermError::Configuration(
                "Column name cannot be empty".to_string(),
            )),
            ColumnSpec::List(names) if names.is_empty() => Err(TermError::Configuration(
                "Column list cannot be empty".to_string(),
            )),
            ColumnSpec::Selector(selector) => selector.validate(),
            _ => Ok(()),
        }
    }
}

impl From<&str> for ColumnSpec {
    fn from(name: &str) -> Self {
        ColumnSpec::Name(name.to_string())
    }
}

impl From<String> for ColumnSpec {
    fn from(name: String) -> Self {
        ColumnSpec::Name(name)
    }
}

impl From<Vec<&str>> for ColumnSpec {
    fn from(names: Vec<&str>) -> Self {
        ColumnSpec::List(names.into_iter().map(String::from).collect())
    }
}

impl From<Vec<String>> for ColumnSpec {
    fn from(names: Vec<String>) -> Self {
        ColumnSpec::List(names)
    }
}

impl From<ColumnSelector> for ColumnSpec {
    fn from(selector: ColumnSelector) -> Self {
        ColumnSpec::Selector(selector)
    }
}

fn by_name(schema: &Schema, pred: impl Fn(&str) -> bool) -> BTreeSet<usize> {
    schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, field)| pred(field.name()))
        .map(|(position, _)| position)
        .collect()
}

fn by_type(schema: &Schema, pred: impl Fn(&DataType) -> bool) -> BTreeSet<usize> {
    schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, field)| pred(field.data_type()))
        .map(|(position, _)| position)
        .collect()
}

fn position_of(schema: &Schema, name: &str) -> Result<usize> {
    schema
        .index_of(name)
        .map_err(|_| TermError::ColumnNotFound {
            column: name.to_string(),
        })
}

fn dedup(names: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        TermError::Configuration(format!("Invalid column pattern '{pattern}': {e}"))
    })
}

pub(crate) fn is_numeric(data_type: &DataType) -> bool {
    data_type.is_numeric()
}

pub(crate) fn is_text(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
    )
}

pub(crate) fn is_datetime(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Date32
            | DataType::Date64
            | DataType::Time32(_)
            | DataType::Time64(_)
            | DataType::Timestamp(_, _)
            | DataType::Duration(_)
            | DataType::Interval(_)
    )
}
