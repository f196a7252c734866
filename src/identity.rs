//! Naming of the base table and its derived variants

use std::fmt;

use serde::{Serialize, Serializer};

use crate::transform::TransformKind;
use crate::validation::{IdentifierKind, ValidationResult, validate_identifier};

/// Name of a base table or of one of its derived variants
///
/// Renders as `{base}` or `{base}_{Suffix}`. The base name is validated
/// against the identifier allow-list on construction; suffixes are fixed
/// identifiers, so derived names need no further check beyond length.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableIdentity {
    base: String,
    suffix: Option<TransformKind>,
}

impl TableIdentity {
    /// Identity of a base table
    pub fn base(name: impl Into<String>) -> ValidationResult<Self> {
        let name = name.into();
        validate_identifier(IdentifierKind::Table, &name)?;
        Ok(Self {
            base: name,
            suffix: None,
        })
    }

    /// Identity of the variant derived from this table by `kind`
    pub fn derived(&self, kind: TransformKind) -> ValidationResult<Self> {
        let derived = Self {
            base: self.base.clone(),
            suffix: Some(kind),
        };
        validate_identifier(IdentifierKind::Table, &derived.name())?;
        Ok(derived)
    }

    /// The base table name
    pub fn base_name(&self) -> &str {
        &self.base
    }

    /// The transform this identity was derived by, if any
    pub fn transform(&self) -> Option<TransformKind> {
        self.suffix
    }

    /// Check whether this is the base identity
    pub fn is_base(&self) -> bool {
        self.suffix.is_none()
    }

    /// Full table name
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// File name of the published snapshot, `{identity}.csv`
    pub fn file_name(&self) -> String {
        format!("{}.csv", self)
    }
}

impl fmt::Display for TableIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.suffix {
            Some(kind) => write!(f, "{}_{}", self.base, kind.suffix()),
            None => f.write_str(&self.base),
        }
    }
}

impl Serialize for TableIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
