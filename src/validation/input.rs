//! Identifier validation for SQL statements.
//!
//! Table and column names cannot be bound as statement parameters, so every
//! name spliced into SQL passes through this allow-list first and is then
//! double-quoted. Values always travel as bound parameters.
//!
//! # Security
//!
//! Input validation prevents:
//! - SQL injection via malicious table/column names
//! - Excessively long identifiers

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length for table and column names
pub const MAX_IDENTIFIER_LENGTH: usize = 255;

/// What kind of identifier is being validated, used in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierKind {
    /// A table name
    Table,
    /// A column name
    Column,
}

impl std::fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentifierKind::Table => write!(f, "table name"),
            IdentifierKind::Column => write!(f, "column name"),
        }
    }
}

/// Errors that can occur during input validation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    /// Input is empty when a value is required
    #[error("{0} cannot be empty")]
    Empty(IdentifierKind),

    /// Input exceeds maximum allowed length
    #[error("{kind} exceeds maximum length (max: {max}, got: {actual})")]
    TooLong {
        kind: IdentifierKind,
        max: usize,
        actual: usize,
    },

    /// Input contains characters outside the allow-list
    #[error("{kind} '{name}' contains invalid character '{character}'")]
    InvalidCharacter {
        kind: IdentifierKind,
        name: String,
        character: char,
    },

    /// Input starts with a digit
    #[error("{kind} '{name}' must start with a letter or underscore")]
    LeadingDigit { kind: IdentifierKind, name: String },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a table or column name against the identifier allow-list.
///
/// # Rules
///
/// - Must not be empty
/// - Must not exceed 255 bytes
/// - May contain ASCII letters, digits and underscores only
/// - Must not start with a digit
///
/// # Examples
///
/// ```
/// use etl_pipeline::validation::{IdentifierKind, validate_identifier};
///
/// assert!(validate_identifier(IdentifierKind::Table, "TitanicData_DropNa").is_ok());
/// assert!(validate_identifier(IdentifierKind::Column, "Survival_Rate").is_ok());
/// assert!(validate_identifier(IdentifierKind::Table, "users; DROP TABLE x").is_err());
/// assert!(validate_identifier(IdentifierKind::Column, "1st").is_err());
/// ```
pub fn validate_identifier(kind: IdentifierKind, name: &str) -> ValidationResult<()> {
    if name.is_empty() {
        return Err(ValidationError::Empty(kind));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong {
            kind,
            max: MAX_IDENTIFIER_LENGTH,
            actual: name.len(),
        });
    }

    if let Some(character) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '_')
    {
        return Err(ValidationError::InvalidCharacter {
            kind,
            name: name.to_string(),
            character,
        });
    }

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(ValidationError::LeadingDigit {
            kind,
            name: name.to_string(),
        });
    }

    Ok(())
}

/// Validate an identifier and wrap it in double quotes for use in SQL.
///
/// Quoting keeps the exact case of the name on backends that fold unquoted
/// identifiers, and lets names that collide with keywords (`Value`) through.
///
/// # Examples
///
/// ```
/// use etl_pipeline::validation::{IdentifierKind, quote_identifier};
///
/// assert_eq!(quote_identifier(IdentifierKind::Column, "Fare").unwrap(), "\"Fare\"");
/// ```
pub fn quote_identifier(kind: IdentifierKind, name: &str) -> ValidationResult<String> {
    validate_identifier(kind, name)?;
    Ok(format!("\"{}\"", name))
}

/// Validate and quote a list of column names, joined with `, `.
pub fn quote_column_list<S: AsRef<str>>(names: &[S]) -> ValidationResult<String> {
    let quoted = names
        .iter()
        .map(|n| quote_identifier(IdentifierKind::Column, n.as_ref()))
        .collect::<ValidationResult<Vec<_>>>()?;
    Ok(quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        for name in ["PassengerId", "_hidden", "TitanicData_GroupBy", "a1"] {
            assert!(
                validate_identifier(IdentifierKind::Table, name).is_ok(),
                "{name} should be valid"
            );
        }
    }

    #[test]
    fn test_rejects_injection_attempts() {
        let err = validate_identifier(IdentifierKind::Table, "t\"; DROP TABLE x; --").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidCharacter { character: '"', .. }
        ));

        assert!(validate_identifier(IdentifierKind::Column, "name with space").is_err());
        assert!(validate_identifier(IdentifierKind::Column, "naïve").is_err());
        assert!(validate_identifier(IdentifierKind::Column, "a-b").is_err());
    }

    #[test]
    fn test_rejects_empty_long_and_leading_digit() {
        assert_eq!(
            validate_identifier(IdentifierKind::Column, ""),
            Err(ValidationError::Empty(IdentifierKind::Column))
        );

        let long = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        assert!(matches!(
            validate_identifier(IdentifierKind::Table, &long),
            Err(ValidationError::TooLong { actual: 256, .. })
        ));

        assert!(matches!(
            validate_identifier(IdentifierKind::Table, "9lives"),
            Err(ValidationError::LeadingDigit { .. })
        ));
    }

    #[test]
    fn test_quote_column_list() {
        assert_eq!(
            quote_column_list(&["Pclass", "Sex"]).unwrap(),
            "\"Pclass\", \"Sex\""
        );
        assert!(quote_column_list(&["ok", "not ok"]).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = validate_identifier(IdentifierKind::Table, "").unwrap_err();
        assert_eq!(err.to_string(), "table name cannot be empty");
    }
}
