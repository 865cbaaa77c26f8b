//! Literal values and comparison operands used by value checks.

use crate::error::Result;
use crate::security::{InputValidator, SqlSecurity};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar value that can be spliced into generated SQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date { date: NaiveDate },
    Timestamp { timestamp: NaiveDateTime },
}

impl Literal {
    /// Renders the value as a SQL literal.
    pub fn to_sql(&self) -> String {
        match self {
            Literal::Bool(true) => "TRUE".to_string(),
            Literal::Bool(false) => "FALSE".to_string(),
            Literal::Int(value) => value.to_string(),
            // Debug keeps the decimal point so DataFusion types it as a float
            Literal::Float(value) => format!("{value:?}"),
            Literal::Str(value) => SqlSecurity::quote_literal(value),
            Literal::Date { date } => format!("CAST('{}' AS DATE)", date.format("%Y-%m-%d")),
            Literal::Timestamp { timestamp } => format!(
                "CAST('{}' AS TIMESTAMP)",
                timestamp.format("%Y-%m-%dT%H:%M:%S%.f")
            ),
        }
    }

    /// Rejects non-finite floats, which have no SQL literal form.
    pub fn validate(&self) -> Result<()> {
        if let Literal::Float(value) = self {
            InputValidator::validate_finite(*value, "literal")?;
        }
        Ok(())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(value) => write!(f, "{value}"),
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Float(value) => write!(f, "{value}"),
            Literal::Str(value) => write!(f, "{value}"),
            Literal::Date { date } => write!(f, "{date}"),
            Literal::Timestamp { timestamp } => write!(f, "{timestamp}"),
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(value.into())
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(value)
    }
}

impl From<NaiveDate> for Literal {
    fn from(date: NaiveDate) -> Self {
        Literal::Date { date }
    }
}

impl From<NaiveDateTime> for Literal {
    fn from(timestamp: NaiveDateTime) -> Self {
        Literal::Timestamp { timestamp }
    }
}

/// The right-hand side of a comparison: a fixed value or another column of
/// the same row.
///
/// # Examples
///
/// ```rust
/// use term_interrogate::core::{Literal, Operand};
///
/// let fixed: Operand = 5.into();
/// let other = Operand::column("b");
/// assert_eq!(fixed.to_sql().unwrap(), "5");
/// assert_eq!(other.to_sql().unwrap(), "\"b\"");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Column { column: String },
    Literal(Literal),
}

impl Operand {
    /// References another column of the same row.
    pub fn column(name: impl Into<String>) -> Self {
        Operand::Column {
            column: name.into(),
        }
    }

    /// Renders the operand as a SQL expression.
    pub fn to_sql(&self) -> Result<String> {
        match self {
            Operand::Column { column } => SqlSecurity::quote_identifier(column),
            Operand::Literal(literal) => Ok(literal.to_sql()),
        }
    }

    /// The referenced column, if any.
    pub fn column_name(&self) -> Option<&str> {
        match self {
            Operand::Column { column } => Some(column),
            Operand::Literal(_) => None,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Operand::Column { column } => SqlSecurity::validate_identifier(column),
            Operand::Literal(literal) => literal.validate(),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column { column } => write!(f, "col({column})"),
            Operand::Literal(literal) => write!(f, "{literal}"),
        }
    }
}

impl From<Literal> for Operand {
    fn from(literal: Literal) -> Self {
        Operand::Literal(literal)
    }
}

macro_rules! operand_from_literal {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Operand::Literal(value.into())
                }
            }
        )*
    };
}

operand_from_literal!(bool, i64, i32, f64, &str, String, NaiveDate, NaiveDateTime);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_sql() {
        assert_eq!(Literal::Int(5).to_sql(), "5");
        assert_eq!(Literal::Float(5.0).to_sql(), "5.0");
        assert_eq!(Literal::Bool(true).to_sql(), "TRUE");
        assert_eq!(Literal::from("O'Brien").to_sql(), "'O''Brien'");

        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(Literal::from(date).to_sql(), "CAST('2024-03-01' AS DATE)");
    }

    #[test]
    fn test_non_finite_literal_rejected() {
        assert!(Literal::Float(f64::INFINITY).validate().is_err());
        assert!(Literal::Float(1.5).validate().is_ok());
    }

    #[test]
    fn test_operand_serde() {
        let column: Operand = serde_json::from_str(r#"{"column": "b"}"#).unwrap();
        assert_eq!(column, Operand::column("b"));

        let int: Operand = serde_json::from_str("5").unwrap();
        assert_eq!(int, Operand::Literal(Literal::Int(5)));

        let text: Operand = serde_json::from_str(r#""north""#).unwrap();
        assert_eq!(text, Operand::from("north"));

        let date: Operand = serde_json::from_str(r#"{"date": "2024-01-31"}"#).unwrap();
        assert_eq!(
            date,
            Operand::from(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
        );
    }

    #[test]
    fn test_operand_column_quoting() {
        assert_eq!(
            Operand::column("Order Date").to_sql().unwrap(),
            "\"Order Date\""
        );
        assert_eq!(Operand::column("b").column_name(), Some("b"));
        assert_eq!(Operand::from(1.5).column_name(), None);
    }
}
