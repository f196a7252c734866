use crate::frame::TabularFrame;

/// Remove every row containing a null, keeping row order
pub fn drop_missing(frame: &TabularFrame) -> TabularFrame {
    frame.filter_rows(|i| !frame.row_has_null(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Value;
    use crate::transform::fixtures::titanic;

    #[test]
    fn test_drops_rows_with_nulls() {
        let base = titanic();
        let result = drop_missing(&base);

        assert_eq!(result.row_count(), 6);
        assert!(result.row_count() <= base.row_count());
        assert!((0..result.row_count()).all(|i| !result.row_has_null(i)));
        assert_eq!(result.column_names(), base.column_names());

        let ids: Vec<Value> = result.column("PassengerId").unwrap().values().to_vec();
        assert_eq!(ids, (1..=5).chain(7..=7).map(Value::Int).collect::<Vec<_>>());
    }

    #[test]
    fn test_all_rows_null_yields_empty() {
        let frame = TabularFrame::from_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![
                vec![Value::Int(1), Value::Null],
                vec![Value::Null, "x".into()],
            ],
        )
        .unwrap();

        let result = drop_missing(&frame);
        assert!(result.is_empty());
        assert_eq!(result.column_names(), vec!["a", "b"]);
    }
}
