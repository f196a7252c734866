use std::collections::{BTreeSet, HashMap, HashSet};

use super::{PivotConfig, TransformKind, TransformResult, require};
use crate::frame::{Column, TabularFrame, Value};

/// Reshape so one key becomes the row index and the other's values become columns
///
/// Rows are first reduced to the first occurrence of each `(index, columns)`
/// pair, so later duplicates are discarded. Rows with a null in either key are
/// left out. Index values and pivot columns come out ascending; combinations
/// that never occur are null.
pub fn pivot(frame: &TabularFrame, config: &PivotConfig) -> TransformResult<TabularFrame> {
    let index = require(frame, TransformKind::Pivot, &config.index)?;
    let columns = require(frame, TransformKind::Pivot, &config.columns)?;
    let values = require(frame, TransformKind::Pivot, &config.values)?;

    let mut seen: HashSet<(&Value, &Value)> = HashSet::new();
    let mut cells: HashMap<(&Value, &Value), &Value> = HashMap::new();
    let mut index_values: BTreeSet<&Value> = BTreeSet::new();
    let mut column_values: BTreeSet<&Value> = BTreeSet::new();

    for row in 0..frame.row_count() {
        let i = &index.values()[row];
        let c = &columns.values()[row];
        if i.is_null() || c.is_null() || !seen.insert((i, c)) {
            continue;
        }
        index_values.insert(i);
        column_values.insert(c);
        cells.insert((i, c), &values.values()[row]);
    }

    let mut output = vec![Column::new(
        index.name(),
        index.column_type(),
        index_values.iter().map(|&v| v.clone()).collect(),
    )?];

    for &c in &column_values {
        let column_cells = index_values
            .iter()
            .map(|&i| cells.get(&(i, c)).map(|&v| v.clone()).unwrap_or(Value::Null))
            .collect();
        output.push(Column::new(c.to_string(), values.column_type(), column_cells)?);
    }

    Ok(TabularFrame::new(output)?)
}
