//! Relational schema inference
//!
//! Maps frame column types onto the column types used in `CREATE TABLE`
//! statements: whole numbers become `INT`, reals `FLOAT` and everything else
//! bounded text.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::database::ColumnInfo;
use crate::frame::{ColumnType, TabularFrame};
use crate::identity::TableIdentity;
use crate::validation::{IdentifierKind, ValidationResult, quote_identifier};

/// Width of the bounded text type
pub const TEXT_WIDTH: usize = 255;

/// A relational column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Int,
    Float,
    Varchar(usize),
}

impl SqlType {
    /// Relational type for a frame column type
    pub fn from_column_type(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Integer => SqlType::Int,
            ColumnType::Float => SqlType::Float,
            ColumnType::Text => SqlType::Varchar(TEXT_WIDTH),
        }
    }

    /// Frame column type values of this relational type read back as
    pub fn column_type(&self) -> ColumnType {
        match self {
            SqlType::Int => ColumnType::Integer,
            SqlType::Float => ColumnType::Float,
            SqlType::Varchar(_) => ColumnType::Text,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Int => write!(f, "INT"),
            SqlType::Float => write!(f, "FLOAT"),
            SqlType::Varchar(width) => write!(f, "VARCHAR({})", width),
        }
    }
}

/// Ordered mapping from column name to relational type
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelationalSchema {
    columns: Vec<(String, SqlType)>,
}

impl RelationalSchema {
    /// Derive the schema of a frame
    pub fn infer(frame: &TabularFrame) -> Self {
        Self {
            columns: frame
                .columns()
                .iter()
                .map(|c| (c.name().to_string(), SqlType::from_column_type(c.column_type())))
                .collect(),
        }
    }

    /// Rebuild a schema from the types a table was declared with
    pub fn from_declared(columns: &[ColumnInfo]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|c| (c.name.clone(), SqlType::from_column_type(c.column_type())))
                .collect(),
        }
    }

    /// Columns in order
    pub fn columns(&self) -> &[(String, SqlType)] {
        &self.columns
    }

    /// Type of a column by name
    pub fn get(&self, name: &str) -> Option<SqlType> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, ty)| *ty)
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the schema has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Render the `CREATE TABLE` statement for this schema
    ///
    /// Every identifier is validated and double-quoted.
    pub fn create_table_sql(&self, identity: &TableIdentity) -> ValidationResult<String> {
        let table = quote_identifier(IdentifierKind::Table, &identity.name())?;
        let definitions = self
            .columns
            .iter()
            .map(|(name, ty)| Ok(format!("{} {}", quote_identifier(IdentifierKind::Column, name)?, ty)))
            .collect::<ValidationResult<Vec<_>>>()?;

        Ok(format!("CREATE TABLE {} ({})", table, definitions.join(", ")))
    }
}

/// Derive the relational schema of a frame
pub fn infer(frame: &TabularFrame) -> RelationalSchema {
    RelationalSchema::infer(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Value, read_csv};

    fn sample() -> TabularFrame {
        read_csv(
            "PassengerId,Name,Age,Fare,Cabin\n\
             1,\"Braund, Mr. Owen Harris\",22,7.25,\n\
             2,\"Cumings, Mrs. John Bradley\",38,71.2833,C85\n"
                .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn test_infer_maps_types() {
        let schema = infer(&sample());
        assert_eq!(
            schema.columns(),
            &[
                ("PassengerId".to_string(), SqlType::Int),
                ("Name".to_string(), SqlType::Varchar(255)),
                ("Age".to_string(), SqlType::Int),
                ("Fare".to_string(), SqlType::Float),
                ("Cabin".to_string(), SqlType::Varchar(255)),
            ]
        );
    }

    #[test]
    fn test_empty_column_defaults_to_text() {
        let frame = TabularFrame::from_rows(
            vec!["nothing".to_string()],
            vec![vec![Value::Null], vec![Value::Null]],
        )
        .unwrap();
        assert_eq!(infer(&frame).get("nothing"), Some(SqlType::Varchar(TEXT_WIDTH)));
    }

    #[test]
    fn test_infer_is_type_stable() {
        let schema = infer(&sample());
        let declared: Vec<ColumnInfo> = schema
            .columns()
            .iter()
            .map(|(name, ty)| ColumnInfo::new(name.as_str(), ty.to_string()))
            .collect();

        assert_eq!(RelationalSchema::from_declared(&declared), schema);
        assert_eq!(infer(&sample()), schema);
    }

    #[test]
    fn test_create_table_sql() {
        let identity = TableIdentity::base("Titanic").unwrap();
        let sql = infer(&sample()).create_table_sql(&identity).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"Titanic\" (\"PassengerId\" INT, \"Name\" VARCHAR(255), \
             \"Age\" INT, \"Fare\" FLOAT, \"Cabin\" VARCHAR(255))"
        );
    }

    #[test]
    fn test_create_table_sql_rejects_bad_column() {
        let frame = TabularFrame::from_rows(
            vec!["bad column".to_string()],
            vec![vec![Value::Int(1)]],
        )
        .unwrap();
        let identity = TableIdentity::base("Titanic").unwrap();
        assert!(infer(&frame).create_table_sql(&identity).is_err());
    }
}
