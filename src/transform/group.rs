use std::collections::BTreeMap;

use super::{GroupConfig, TransformError, TransformKind, TransformResult, require};
use crate::frame::{Column, ColumnType, TabularFrame, Value};

/// Mean of the measure column per distinct key combination
///
/// Groups come out sorted by key. Rows with a null key are left out; null
/// measures are ignored, and a group with no measure at all averages to null.
/// The averaged column is renamed to `config.output`.
pub fn group_mean(frame: &TabularFrame, config: &GroupConfig) -> TransformResult<TabularFrame> {
    let keys = config
        .keys
        .iter()
        .map(|k| require(frame, TransformKind::GroupBy, k))
        .collect::<TransformResult<Vec<_>>>()?;
    let measure = require(frame, TransformKind::GroupBy, &config.measure)?;

    if measure.column_type() == ColumnType::Text && measure.values().iter().any(|v| !v.is_null()) {
        return Err(TransformError::NonNumeric {
            transform: TransformKind::GroupBy,
            column: config.measure.clone(),
        });
    }

    // key tuple -> (sum, count of non-null measures)
    let mut groups: BTreeMap<Vec<Value>, (f64, usize)> = BTreeMap::new();
    for row in 0..frame.row_count() {
        let key: Vec<Value> = keys.iter().map(|c| c.values()[row].clone()).collect();
        if key.iter().any(Value::is_null) {
            continue;
        }

        let entry = groups.entry(key).or_insert((0.0, 0));
        if let Some(x) = measure.values()[row].as_f64() {
            entry.0 += x;
            entry.1 += 1;
        }
    }

    let mut key_values: Vec<Vec<Value>> = vec![Vec::with_capacity(groups.len()); keys.len()];
    let mut means = Vec::with_capacity(groups.len());
    for (key, (sum, count)) in groups {
        for (slot, value) in key_values.iter_mut().zip(key) {
            slot.push(value);
        }
        means.push(if count == 0 {
            Value::Null
        } else {
            Value::Float(sum / count as f64)
        });
    }

    let mut columns = keys
        .iter()
        .zip(key_values)
        .map(|(source, values)| Column::new(source.name(), source.column_type(), values))
        .collect::<Result<Vec<_>, _>>()?;
    columns.push(Column::new(config.output.as_str(), ColumnType::Float, means)?);

    Ok(TabularFrame::new(columns)?)
}
