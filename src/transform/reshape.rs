//! Long-format reshapes: melt and stack

use super::{MeltConfig, StackConfig, TransformKind, TransformResult, require};
use crate::frame::{Column, ColumnType, TabularFrame, Value};

fn value_type(columns: &[&Column]) -> ColumnType {
    ColumnType::common(columns.iter().map(|c| c.column_type()))
}

/// Unpivot measure columns into `(variable, value)` pairs
///
/// Output is column-major: every row for the first value column, then every
/// row for the next. Nulls are kept, so the result always has
/// `rows * value_columns` rows.
pub fn melt(frame: &TabularFrame, config: &MeltConfig) -> TransformResult<TabularFrame> {
    let ids = config
        .id_columns
        .iter()
        .map(|c| require(frame, TransformKind::Melt, c))
        .collect::<TransformResult<Vec<_>>>()?;
    let measures = config
        .value_columns
        .iter()
        .map(|c| require(frame, TransformKind::Melt, c))
        .collect::<TransformResult<Vec<_>>>()?;

    let rows = frame.row_count();
    let mut columns = Vec::with_capacity(ids.len() + 2);

    for id in &ids {
        let values = measures
            .iter()
            .flat_map(|_| id.values().iter().cloned())
            .collect();
        columns.push(Column::new(id.name(), id.column_type(), values)?);
    }

    let variables = measures
        .iter()
        .flat_map(|m| std::iter::repeat_n(Value::from(m.name()), rows))
        .collect();
    columns.push(Column::new(
        config.variable_name.as_str(),
        ColumnType::Text,
        variables,
    )?);

    let values = measures
        .iter()
        .flat_map(|m| m.values().iter().cloned())
        .collect();
    columns.push(Column::new(
        config.value_name.as_str(),
        value_type(&measures),
        values,
    )?);

    Ok(TabularFrame::new(columns)?)
}

/// Stack measure columns under a multi-column index
///
/// Output is row-major: each source row contributes one row per non-null
/// measure, labelled with the measure's column name.
pub fn stack(frame: &TabularFrame, config: &StackConfig) -> TransformResult<TabularFrame> {
    let index = config
        .index_columns
        .iter()
        .map(|c| require(frame, TransformKind::Stack, c))
        .collect::<TransformResult<Vec<_>>>()?;
    let measures = config
        .value_columns
        .iter()
        .map(|c| require(frame, TransformKind::Stack, c))
        .collect::<TransformResult<Vec<_>>>()?;

    let mut index_values: Vec<Vec<Value>> = vec![Vec::new(); index.len()];
    let mut labels = Vec::new();
    let mut values = Vec::new();

    for row in 0..frame.row_count() {
        for measure in &measures {
            let value = &measure.values()[row];
            if value.is_null() {
                continue;
            }
            for (slot, column) in index_values.iter_mut().zip(&index) {
                slot.push(column.values()[row].clone());
            }
            labels.push(Value::from(measure.name()));
            values.push(value.clone());
        }
    }

    let mut columns = index
        .iter()
        .zip(index_values)
        .map(|(column, values)| Column::new(column.name(), column.column_type(), values))
        .collect::<Result<Vec<_>, _>>()?;
    columns.push(Column::new(
        config.label_name.as_str(),
        ColumnType::Text,
        labels,
    )?);
    columns.push(Column::new(
        config.value_name.as_str(),
        value_type(&measures),
        values,
    )?);

    Ok(TabularFrame::new(columns)?)
}
