//! Validation functionality
//!
//! Provides input validation for identifiers that are spliced into SQL.

pub mod input;

pub use input::{
    IdentifierKind, MAX_IDENTIFIER_LENGTH, ValidationError, ValidationResult, quote_column_list,
    quote_identifier, validate_identifier,
};
