//! SQL safety utilities.
//!
//! Every fragment the engine splices into generated SQL goes through this
//! module: identifiers are always double-quoted, literals are single-quoted
//! with embedded quotes doubled, and user-authored expressions and regex
//! patterns are screened before use.

use crate::error::{Result, TermError};
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length accepted for a quoted identifier.
const MAX_IDENTIFIER_LEN: usize = 256;
/// Maximum length accepted for a regex pattern.
const MAX_PATTERN_LEN: usize = 1000;
/// Maximum length accepted for a user SQL expression.
const MAX_EXPRESSION_LEN: usize = 5000;

/// SQL identifier, literal and expression handling.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Quotes an identifier (table or column name) for use in SQL.
    ///
    /// Column names come straight from table schemas, so any printable name is
    /// accepted; embedded double quotes are doubled.
    ///
    /// # Examples
    /// ```rust
    /// use term_interrogate::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::quote_identifier("customer_id").unwrap(), "\"customer_id\"");
    /// assert_eq!(SqlSecurity::quote_identifier("Order Date").unwrap(), "\"Order Date\"");
    /// assert!(SqlSecurity::quote_identifier("").is_err());
    /// ```
    pub fn quote_identifier(identifier: &str) -> Result<String> {
        Self::validate_identifier(identifier)?;
        let escaped = identifier.replace('"', "\"\"");
        Ok(format!("\"{escaped}\""))
    }

    /// Validates an identifier without quoting it.
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.is_empty() || identifier.trim().is_empty() {
            return Err(TermError::SecurityError(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        if identifier.len() > MAX_IDENTIFIER_LEN {
            return Err(TermError::SecurityError(format!(
                "SQL identifier too long (max {MAX_IDENTIFIER_LEN} characters)"
            )));
        }

        if identifier.contains('\0') {
            return Err(TermError::SecurityError(
                "SQL identifier cannot contain null bytes".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates a registered table name for use in generated SQL.
    ///
    /// Table names are spliced unquoted so they resolve the same way DataFusion
    /// normalizes them at registration; only plain (optionally dotted)
    /// identifiers are accepted.
    pub fn table_reference(name: &str) -> Result<&str> {
        static TABLE_NAME: Lazy<Regex> = Lazy::new(|| {
            #[allow(clippy::expect_used)]
            Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*){0,2}$")
                .expect("Hard-coded regex pattern should be valid")
        });

        Self::validate_identifier(name)?;
        if !TABLE_NAME.is_match(name) {
            return Err(TermError::SecurityError(format!(
                "Invalid table name '{name}': use letters, digits and underscores"
            )));
        }
        Ok(name)
    }

    /// Renders a string as a single-quoted SQL literal.
    pub fn quote_literal(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Validates a regex pattern and returns it escaped for a SQL string literal
    /// (without the surrounding quotes).
    pub fn validate_regex_pattern(pattern: &str) -> Result<String> {
        if pattern.len() > MAX_PATTERN_LEN {
            return Err(TermError::SecurityError(format!(
                "Regex pattern too long (max {MAX_PATTERN_LEN} characters)"
            )));
        }

        if pattern.contains('\0') {
            return Err(TermError::SecurityError(
                "Regex pattern cannot contain null bytes".to_string(),
            ));
        }

        Regex::new(pattern)
            .map_err(|e| TermError::SecurityError(format!("Invalid regex pattern: {e}")))?;

        Self::check_redos_patterns(pattern)?;

        Ok(pattern.replace('\'', "''"))
    }

    /// Validates a user-authored boolean SQL expression.
    ///
    /// Expressions are evaluated row by row inside a `CASE WHEN`, so anything
    /// that could terminate the statement, open a subquery or run DDL/DML is
    /// rejected. Keywords are matched as whole words, so a column such as
    /// `updated_at` is fine while `UPDATE` is not.
    pub fn validate_sql_expression(expression: &str) -> Result<()> {
        if expression.trim().is_empty() {
            return Err(TermError::SecurityError(
                "SQL expression cannot be empty".to_string(),
            ));
        }

        if expression.len() > MAX_EXPRESSION_LEN {
            return Err(TermError::SecurityError(format!(
                "SQL expression too long (max {MAX_EXPRESSION_LEN} characters)"
            )));
        }

        if expression.contains('\0') {
            return Err(TermError::SecurityError(
                "SQL expression cannot contain null bytes".to_string(),
            ));
        }

        for token in [";", "--", "/*", "*/"] {
            if expression.contains(token) {
                return Err(TermError::SecurityError(format!(
                    "SQL expression contains forbidden token: '{token}'"
                )));
            }
        }

        static DANGEROUS_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
            #[allow(clippy::expect_used)]
            Regex::new(
                r"(?i)\b(select|drop|create|alter|truncate|insert|update|delete|merge|exec|execute|declare|copy|attach|detach|pragma|grant|revoke|information_schema)\b",
            )
            .expect("Hard-coded regex pattern should be valid")
        });

        if let Some(found) = DANGEROUS_KEYWORDS.find(expression) {
            return Err(TermError::SecurityError(format!(
                "SQL expression contains dangerous keyword: '{}'",
                found.as_str()
            )));
        }

        Ok(())
    }

    /// Checks for patterns that might cause catastrophic backtracking.
    fn check_redos_patterns(pattern: &str) -> Result<()> {
        let dangerous_patterns = &["(.*)*", "(.*)+", "(.+)+", "(a+)+", "(a*)*"];

        for dangerous in dangerous_patterns {
            if pattern.contains(dangerous) {
                return Err(TermError::SecurityError(
                    "Regex pattern might cause ReDoS attack".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Input validation utilities for numeric configuration values.
pub struct InputValidator;

impl InputValidator {
    /// Validates that a value is finite.
    pub fn validate_finite(value: f64, name: &str) -> Result<()> {
        if !value.is_finite() {
            return Err(TermError::Configuration(format!(
                "Invalid {name} value: must be finite (not NaN or infinite)"
            )));
        }
        Ok(())
    }

    /// Validates a fraction (0.0 to 1.0 inclusive).
    pub fn validate_fraction(value: f64, name: &str) -> Result<()> {
        Self::validate_finite(value, name)?;

        if !(0.0..=1.0).contains(&value) {
            return Err(TermError::Configuration(format!(
                "Invalid {name} value: must be between 0.0 and 1.0, got {value}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(
            SqlSecurity::quote_identifier("customer_id").unwrap(),
            "\"customer_id\""
        );
        assert_eq!(
            SqlSecurity::quote_identifier("col\"with\"quotes").unwrap(),
            "\"col\"\"with\"\"quotes\""
        );
        assert_eq!(
            SqlSecurity::quote_identifier("created_at").unwrap(),
            "\"created_at\""
        );
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(SqlSecurity::quote_identifier("").is_err());
        assert!(SqlSecurity::quote_identifier("   ").is_err());
        assert!(SqlSecurity::quote_identifier(&"a".repeat(300)).is_err());
        assert!(SqlSecurity::quote_identifier("a\0b").is_err());
    }

    #[test]
    fn test_table_reference() {
        assert_eq!(SqlSecurity::table_reference("sales").unwrap(), "sales");
        assert_eq!(
            SqlSecurity::table_reference("lake.sales__pre_2").unwrap(),
            "lake.sales__pre_2"
        );
        assert!(SqlSecurity::table_reference("sales; DROP").is_err());
        assert!(SqlSecurity::table_reference("1sales").is_err());
        assert!(SqlSecurity::table_reference("").is_err());
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(SqlSecurity::quote_literal("north"), "'north'");
        assert_eq!(SqlSecurity::quote_literal("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn test_regex_pattern_validation() {
        assert!(SqlSecurity::validate_regex_pattern(r"^[A-Z]\d+$").is_ok());
        assert!(SqlSecurity::validate_regex_pattern(r"[unclosed").is_err());
        assert!(SqlSecurity::validate_regex_pattern(&"a".repeat(2000)).is_err());
        assert!(SqlSecurity::validate_regex_pattern("(.*)*").is_err());

        let result = SqlSecurity::validate_regex_pattern("it's a pattern").unwrap();
        assert_eq!(result, "it''s a pattern");
    }

    #[test]
    fn test_sql_expression_validation() {
        assert!(SqlSecurity::validate_sql_expression("price > 100").is_ok());
        assert!(SqlSecurity::validate_sql_expression("updated_at >= created_at").is_ok());
        assert!(SqlSecurity::validate_sql_expression("a + b < c * 2").is_ok());

        assert!(SqlSecurity::validate_sql_expression("").is_err());
        assert!(SqlSecurity::validate_sql_expression("price > 0; DROP TABLE users").is_err());
        assert!(SqlSecurity::validate_sql_expression("id IN (SELECT id FROM other)").is_err());
        assert!(SqlSecurity::validate_sql_expression("x > 1 -- trailing").is_err());
        assert!(SqlSecurity::validate_sql_expression("DELETE FROM t").is_err());
    }

    #[test]
    fn test_input_validation() {
        assert!(InputValidator::validate_finite(5.5, "bound").is_ok());
        assert!(InputValidator::validate_fraction(0.95, "warning").is_ok());

        assert!(InputValidator::validate_finite(f64::NAN, "bound").is_err());
        assert!(InputValidator::validate_fraction(1.5, "warning").is_err());
        assert!(InputValidator::validate_fraction(-0.1, "warning").is_err());
    }
}
