use std::collections::HashSet;

use super::{TransformKind, TransformResult, UnionConfig, require};
use crate::frame::TabularFrame;

/// Append a column projection of the frame to itself and drop exact duplicates
///
/// Projected rows carry nulls in the columns they lack. Duplicates are
/// detected on whole rows, with nulls equal to nulls, and the first
/// occurrence is kept.
pub fn union_dedup(frame: &TabularFrame, config: &UnionConfig) -> TransformResult<TabularFrame> {
    for column in &config.columns {
        require(frame, TransformKind::Union, column)?;
    }

    let projected = frame.select(&config.columns)?;
    let combined = TabularFrame::concat(&[frame, &projected])?;

    let mut seen = HashSet::new();
    let keep: Vec<usize> = combined
        .rows()
        .enumerate()
        .filter_map(|(i, row)| seen.insert(row).then_some(i))
        .collect();

    Ok(combined.take_rows(&keep))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Value;
    use crate::transform::fixtures::titanic;

    #[test]
    fn test_union_appends_distinct_projections() {
        let base = titanic();
        let result = union_dedup(&base, &UnionConfig::default()).unwrap();

        assert_eq!(result.row_count(), base.row_count() * 2);
        assert_eq!(result.column_names(), base.column_names());

        let appended = result.row(base.row_count());
        assert_eq!(appended[0], Value::Int(1));
        assert!(appended[1].is_null());
        assert_eq!(appended[3], Value::from("male"));
    }

    #[test]
    fn test_union_has_no_duplicate_rows() {
        let frame = TabularFrame::from_rows(
            vec!["id".to_string(), "x".to_string()],
            vec![
                vec![Value::Int(1), Value::Null],
                vec![Value::Int(1), Value::Null],
                vec![Value::Int(2), "b".into()],
            ],
        )
        .unwrap();
        let config = UnionConfig {
            columns: vec!["id".to_string()],
        };

        let result = union_dedup(&frame, &config).unwrap();
        assert_eq!(
            result.rows().collect::<Vec<_>>(),
            vec![
                vec![Value::Int(1), Value::Null],
                vec![Value::Int(2), "b".into()],
                vec![Value::Int(2), Value::Null],
            ]
        );

        let distinct: HashSet<Vec<Value>> = result.rows().collect();
        assert_eq!(distinct.len(), result.row_count());
    }
}
