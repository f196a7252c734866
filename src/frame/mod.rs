//! In-memory tabular data
//!
//! A [`TabularFrame`] is an ordered set of named, typed columns whose rows are
//! positionally aligned. Frames are produced by ingestion or by a transform and
//! are never mutated in place: every operation returns a new frame.

mod delimited;
mod value;

pub use delimited::{read_csv, read_csv_path, to_csv_bytes};
pub use value::{ColumnType, NULL_TOKENS, Value};

use std::collections::HashSet;

/// Error type for frame construction and access
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    /// Columns disagree on row count
    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    RowCountMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// A row has the wrong number of cells
    #[error("Row {row} has {actual} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Two columns share a name
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    /// A referenced column does not exist
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A value does not fit its column type
    #[error("Column '{column}' of type {expected} cannot hold value '{value}'")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        value: String,
    },

    /// Delimited text could not be read or written
    #[error("CSV error: {0}")]
    Csv(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),
}

/// Result type for frame operations
pub type FrameResult<T> = Result<T, FrameError>;

/// A named column of uniformly typed values
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    column_type: ColumnType,
    values: Vec<Value>,
}

impl Column {
    /// Create a column, conforming values to the declared type
    ///
    /// Integers are widened in float columns and numbers are rendered as text
    /// in text columns. Text in a numeric column is rejected.
    pub fn new(
        name: impl Into<String>,
        column_type: ColumnType,
        values: Vec<Value>,
    ) -> FrameResult<Self> {
        let name = name.into();
        let values = values
            .into_iter()
            .map(|value| conform(&name, column_type, value))
            .collect::<FrameResult<Vec<_>>>()?;

        Ok(Self {
            name,
            column_type,
            values,
        })
    }

    /// Create a column whose type is inferred from its values
    pub fn infer(name: impl Into<String>, values: Vec<Value>) -> Self {
        let column_type = ColumnType::infer(&values);
        let name = name.into();
        // An inferred type always fits its own values
        let values = values
            .into_iter()
            .map(|value| conform(&name, column_type, value).unwrap_or(Value::Null))
            .collect();

        Self {
            name,
            column_type,
            values,
        }
    }

    /// Column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column type
    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Column values in row order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the column has no rows
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy of this column under a different name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: self.column_type,
            values: self.values.clone(),
        }
    }

    fn take(&self, indices: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            column_type: self.column_type,
            values: indices.iter().map(|&i| self.values[i].clone()).collect(),
        }
    }
}

fn conform(column: &str, column_type: ColumnType, value: Value) -> FrameResult<Value> {
    match (column_type, value) {
        (_, Value::Null) => Ok(Value::Null),
        (ColumnType::Integer, v @ Value::Int(_)) => Ok(v),
        (ColumnType::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
        (ColumnType::Float, v @ Value::Float(_)) => Ok(v),
        (ColumnType::Text, v @ Value::Text(_)) => Ok(v),
        (ColumnType::Text, v) => Ok(Value::Text(v.to_string())),
        (expected, v) => Err(FrameError::TypeMismatch {
            column: column.to_string(),
            expected,
            value: v.to_string(),
        }),
    }
}

/// An immutable table of named, typed, row-aligned columns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TabularFrame {
    columns: Vec<Column>,
}

impl TabularFrame {
    /// Create a frame from columns
    ///
    /// All columns must have the same number of rows and distinct names.
    pub fn new(columns: Vec<Column>) -> FrameResult<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(FrameError::DuplicateColumn(column.name.clone()));
            }
        }

        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(FrameError::RowCountMismatch {
                    column: bad.name.clone(),
                    expected,
                    actual: bad.len(),
                });
            }
        }

        Ok(Self { columns })
    }

    /// Create an empty frame with no columns
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a frame from row-major data, inferring each column's type
    pub fn from_rows(names: Vec<String>, rows: Vec<Vec<Value>>) -> FrameResult<Self> {
        let width = names.len();
        let mut data: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); width];

        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(FrameError::RaggedRow {
                    row: index,
                    expected: width,
                    actual: row.len(),
                });
            }
            for (slot, value) in data.iter_mut().zip(row) {
                slot.push(value);
            }
        }

        Self::new(
            names
                .into_iter()
                .zip(data)
                .map(|(name, values)| Column::infer(name, values))
                .collect(),
        )
    }

    /// Create a frame from row-major data with declared column types
    pub fn from_typed_rows(
        schema: Vec<(String, ColumnType)>,
        rows: Vec<Vec<Value>>,
    ) -> FrameResult<Self> {
        let width = schema.len();
        let mut data: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); width];

        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(FrameError::RaggedRow {
                    row: index,
                    expected: width,
                    actual: row.len(),
                });
            }
            for (slot, value) in data.iter_mut().zip(row) {
                slot.push(value);
            }
        }

        let columns = schema
            .into_iter()
            .zip(data)
            .map(|((name, column_type), values)| Column::new(name, column_type, values))
            .collect::<FrameResult<Vec<_>>>()?;

        Self::new(columns)
    }

    /// Columns in order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column by name, failing if it is absent
    pub fn require_column(&self, name: &str) -> FrameResult<&Column> {
        self.column(name)
            .ok_or_else(|| FrameError::MissingColumn(name.to_string()))
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if the frame has no rows
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Values of one row, in column order
    pub fn row(&self, index: usize) -> Vec<Value> {
        self.columns
            .iter()
            .map(|c| c.values[index].clone())
            .collect()
    }

    /// Iterate over rows
    pub fn rows(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        (0..self.row_count()).map(|i| self.row(i))
    }

    /// Check whether any cell of a row is null
    pub fn row_has_null(&self, index: usize) -> bool {
        self.columns.iter().any(|c| c.values[index].is_null())
    }

    /// Project a subset of columns, in the given order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> FrameResult<Self> {
        let columns = names
            .iter()
            .map(|name| self.require_column(name.as_ref()).cloned())
            .collect::<FrameResult<Vec<_>>>()?;
        Self::new(columns)
    }

    /// Build a frame from the rows at the given positions, keeping column types
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
        }
    }

    /// Keep the rows for which the predicate returns true
    pub fn filter_rows(&self, mut predicate: impl FnMut(usize) -> bool) -> Self {
        let indices: Vec<usize> = (0..self.row_count()).filter(|&i| predicate(i)).collect();
        self.take_rows(&indices)
    }

    /// Concatenate frames vertically
    ///
    /// The result has the union of all columns in first-seen order. Cells
    /// for columns a frame lacks are null and column types are unified.
    pub fn concat(frames: &[&TabularFrame]) -> FrameResult<Self> {
        let mut names: Vec<&str> = Vec::new();
        for frame in frames {
            for column in &frame.columns {
                if !names.contains(&column.name.as_str()) {
                    names.push(&column.name);
                }
            }
        }

        let columns = names
            .iter()
            .map(|&name| {
                let column_type = ColumnType::common(
                    frames
                        .iter()
                        .filter_map(|f| f.column(name).map(Column::column_type)),
                );
                let mut values = Vec::new();
                for frame in frames {
                    match frame.column(name) {
                        Some(column) => values.extend(column.values.iter().cloned()),
                        None => values.extend(std::iter::repeat_n(Value::Null, frame.row_count())),
                    }
                }
                Column::new(name, column_type, values)
            })
            .collect::<FrameResult<Vec<_>>>()?;

        Self::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passengers() -> TabularFrame {
        TabularFrame::from_rows(
            vec!["id".to_string(), "sex".to_string(), "age".to_string()],
            vec![
                vec![Value::Int(1), "male".into(), Value::Float(22.0)],
                vec![Value::Int(2), "female".into(), Value::Null],
                vec![Value::Int(3), "female".into(), Value::Float(26.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows_infers_types() {
        let frame = passengers();
        assert_eq!(frame.row_count(), 3);
        assert_eq!(frame.column_count(), 3);
        assert_eq!(
            frame.column("id").unwrap().column_type(),
            ColumnType::Integer
        );
        assert_eq!(frame.column("sex").unwrap().column_type(), ColumnType::Text);
        assert_eq!(frame.column("age").unwrap().column_type(), ColumnType::Float);
    }

    #[test]
    fn test_new_rejects_unequal_columns() {
        let result = TabularFrame::new(vec![
            Column::infer("a", vec![Value::Int(1), Value::Int(2)]),
            Column::infer("b", vec![Value::Int(1)]),
        ]);
        assert!(matches!(result, Err(FrameError::RowCountMismatch { .. })));
    }

    #[test]
    fn test_new_rejects_duplicate_names() {
        let result = TabularFrame::new(vec![
            Column::infer("a", vec![Value::Int(1)]),
            Column::infer("a", vec![Value::Int(2)]),
        ]);
        assert_eq!(result, Err(FrameError::DuplicateColumn("a".to_string())));
    }

    #[test]
    fn test_from_rows_rejects_ragged_rows() {
        let result = TabularFrame::from_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![Value::Int(1)]],
        );
        assert!(matches!(result, Err(FrameError::RaggedRow { row: 0, .. })));
    }

    #[test]
    fn test_column_conforms_values() {
        let column = Column::new(
            "fare",
            ColumnType::Float,
            vec![Value::Int(7), Value::Float(7.5)],
        )
        .unwrap();
        assert_eq!(column.values()[0], Value::Float(7.0));

        let bad = Column::new("fare", ColumnType::Integer, vec!["x".into()]);
        assert!(matches!(bad, Err(FrameError::TypeMismatch { .. })));
    }

    #[test]
    fn test_filter_and_select() {
        let frame = passengers();
        let women = frame.filter_rows(|i| frame.row(i)[1] == Value::from("female"));
        assert_eq!(women.row_count(), 2);

        let ids = women.select(&["id"]).unwrap();
        assert_eq!(ids.column_names(), vec!["id"]);
        assert_eq!(ids.row(1), vec![Value::Int(3)]);

        assert!(matches!(
            frame.select(&["missing"]),
            Err(FrameError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_concat_unions_columns() {
        let frame = passengers();
        let subset = frame.select(&["id", "sex"]).unwrap();
        let combined = TabularFrame::concat(&[&frame, &subset]).unwrap();

        assert_eq!(combined.row_count(), 6);
        assert_eq!(combined.column_names(), vec!["id", "sex", "age"]);
        assert!(combined.row(5)[2].is_null());
        assert_eq!(
            combined.column("age").unwrap().column_type(),
            ColumnType::Float
        );
    }
}
