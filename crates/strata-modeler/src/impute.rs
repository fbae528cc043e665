use strata_copula::EPSILON;
use strata_core::Frame;
use tracing::trace;

/// Fill missing cells column by column.
///
/// Missing cells take the mean of the column's present values, or `0` when
/// the whole column is missing. A column left constant by the fill gets
/// [`EPSILON`] added to its first row so covariance-based fits do not see a
/// zero-variance input. Columns without missing cells are returned as is.
pub fn impute_table(table: &Frame<f64>) -> Frame<f64> {
    let mut imputed = table.clone();

    for (column, values) in imputed.iter_columns_mut() {
        let missing = values.iter().filter(|value| value.is_nan()).count();
        if missing == 0 {
            continue;
        }

        let (sum, present) = values
            .iter()
            .filter(|value| !value.is_nan())
            .fold((0.0, 0_usize), |(sum, count), value| (sum + value, count + 1));
        let mean = if present == 0 { f64::NAN } else { sum / present as f64 };
        let fill = if mean.is_nan() { 0.0 } else { mean };

        for value in values.iter_mut().filter(|value| value.is_nan()) {
            *value = fill;
        }

        let first = values[0];
        if values.iter().all(|value| *value == first) {
            values[0] = first + EPSILON;
        }

        trace!(column, missing, fill, "imputed column");
    }

    imputed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(data: Vec<Vec<f64>>) -> Frame<f64> {
        Frame::new(vec!["A".to_string(), "B".to_string(), "C".to_string()], data).unwrap()
    }

    #[test]
    fn fills_with_column_mean() {
        let nan = f64::NAN;
        let result = impute_table(&table(vec![
            vec![nan, 4.0, 2.0],
            vec![2.0, nan, 4.0],
            vec![4.0, 2.0, nan],
        ]));

        let expected = table(vec![
            vec![3.0, 4.0, 2.0],
            vec![2.0, 3.0, 4.0],
            vec![4.0, 2.0, 3.0],
        ]);
        assert_eq!(result, expected);
        assert_eq!(result.missing_count(), 0);
    }

    #[test]
    fn fully_missing_column_becomes_zero_with_jitter() {
        let nan = f64::NAN;
        let result = impute_table(&table(vec![
            vec![nan, nan, nan],
            vec![2.0, 3.0, 4.0],
            vec![2.0, 3.0, 4.0],
        ]));

        let expected = table(vec![
            vec![EPSILON, 0.0, 0.0],
            vec![2.0, 3.0, 4.0],
            vec![2.0, 3.0, 4.0],
        ]);
        assert_eq!(result, expected);
    }

    #[test]
    fn constant_after_fill_gets_jitter_on_first_row() {
        let nan = f64::NAN;
        let result = impute_table(&table(vec![
            vec![nan, 5.0, 5.0],
            vec![10.0, nan, 10.0],
            vec![20.0, 20.0, nan],
        ]));

        let expected = table(vec![
            vec![5.0 + EPSILON, 5.0, 5.0],
            vec![10.0 + EPSILON, 10.0, 10.0],
            vec![20.0 + EPSILON, 20.0, 20.0],
        ]);
        assert_eq!(result, expected);
    }

    #[test]
    fn complete_constant_column_is_untouched() {
        let input = table(vec![
            vec![7.0, 7.0, 7.0],
            vec![1.0, 2.0, 3.0],
            vec![0.5, 0.5, 0.5],
        ]);
        assert_eq!(impute_table(&input), input);
    }

    #[test]
    fn keeps_shape_and_index() {
        let input = Frame::with_index(
            vec![4, 9],
            vec!["x".to_string()],
            vec![vec![f64::NAN, 1.0]],
        )
        .unwrap();
        let result = impute_table(&input);
        assert_eq!(result.index(), &[4, 9]);
        assert_eq!(result.columns(), input.columns());
        assert_eq!(result.column("x"), Some(&[1.0 + EPSILON, 1.0][..]));
    }
}
