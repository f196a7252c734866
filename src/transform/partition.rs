use super::{PartitionConfig, TransformKind, TransformResult, require};
use crate::frame::TabularFrame;

/// Split rows on two values of a categorical column and concatenate the parts
///
/// Rows matching `first` come before rows matching `second`, each part in its
/// original order. Rows with any other value, null included, are dropped.
pub fn partition_concat(
    frame: &TabularFrame,
    config: &PartitionConfig,
) -> TransformResult<TabularFrame> {
    let column = require(frame, TransformKind::Concat, &config.column)?;

    // Categories are matched on their rendered form so numeric columns work too
    let matching = |target: &str| -> Vec<usize> {
        column
            .values()
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null() && v.to_string() == target)
            .map(|(i, _)| i)
            .collect()
    };

    let mut rows = matching(&config.first);
    rows.extend(matching(&config.second));

    Ok(frame.take_rows(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Value;
    use crate::transform::fixtures::titanic;

    #[test]
    fn test_first_partition_then_second() {
        let result = partition_concat(&titanic(), &PartitionConfig::default()).unwrap();

        let ids: Vec<Value> = result.column("PassengerId").unwrap().values().to_vec();
        assert_eq!(
            ids,
            [1, 5, 6, 7, 2, 3, 4].into_iter().map(Value::Int).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_other_categories_are_dropped() {
        let base = titanic();
        let result = partition_concat(&base, &PartitionConfig::default()).unwrap();
        assert_eq!(result.row_count(), base.row_count() - 1);
        assert!(result.rows().all(|r| r[3] != Value::from("unknown")));
    }

    #[test]
    fn test_numeric_category_column() {
        let config = PartitionConfig {
            column: "Pclass".to_string(),
            first: "1".to_string(),
            second: "2".to_string(),
        };
        let result = partition_concat(&titanic(), &config).unwrap();
        let ids: Vec<Value> = result.column("PassengerId").unwrap().values().to_vec();
        assert_eq!(ids, [2, 4, 7, 8].into_iter().map(Value::Int).collect::<Vec<_>>());
    }
}
