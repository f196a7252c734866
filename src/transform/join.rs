use std::collections::HashMap;

use super::{MergeConfig, TransformKind, TransformResult, require};
use crate::frame::{Column, TabularFrame, Value};

/// Inner-join the frame with itself on the key column, excluding self-pairs
///
/// Output rows follow left-row order, then right-row order within a key.
/// Null keys never match. The key column appears once; every other column
/// appears twice, suffixed with `left_suffix` and `right_suffix`. Pairs whose
/// identifiers are equal are removed, which also drops distinct rows that
/// happen to share an identifier.
pub fn self_join(frame: &TabularFrame, config: &MergeConfig) -> TransformResult<TabularFrame> {
    let key = require(frame, TransformKind::Merge, &config.key)?;
    let identifier = require(frame, TransformKind::Merge, &config.identifier)?;

    let mut by_key: HashMap<&Value, Vec<usize>> = HashMap::new();
    for (row, value) in key.values().iter().enumerate() {
        if !value.is_null() {
            by_key.entry(value).or_default().push(row);
        }
    }

    let mut left_rows = Vec::new();
    let mut right_rows = Vec::new();
    for (left, value) in key.values().iter().enumerate() {
        let Some(matches) = by_key.get(value) else {
            continue;
        };
        for &right in matches {
            let (a, b) = (&identifier.values()[left], &identifier.values()[right]);
            if !a.is_null() && a == b {
                continue;
            }
            left_rows.push(left);
            right_rows.push(right);
        }
    }

    let left = frame.take_rows(&left_rows);
    let right = frame.take_rows(&right_rows);

    let mut columns: Vec<Column> = left
        .columns()
        .iter()
        .map(|c| {
            if c.name() == config.key {
                c.clone()
            } else {
                c.renamed(format!("{}{}", c.name(), config.left_suffix))
            }
        })
        .collect();
    columns.extend(
        right
            .columns()
            .iter()
            .filter(|c| c.name() != config.key)
            .map(|c| c.renamed(format!("{}{}", c.name(), config.right_suffix))),
    );

    Ok(TabularFrame::new(columns)?)
}
