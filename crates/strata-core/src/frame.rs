use std::collections::{BTreeSet, HashMap};

use crate::error::{Error, Result};

/// Column-major rectangular table with an explicit row index.
///
/// Row labels are stable identifiers shared between the raw and the
/// transformed rendition of a table; they are not positions. `Frame<f64>`
/// uses `NaN` as its missing marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<T> {
    index: Vec<usize>,
    columns: Vec<String>,
    data: Vec<Vec<T>>,
}

impl<T: Clone> Frame<T> {
    /// Build a frame from columns, labelling rows `0..n`.
    pub fn new(columns: Vec<String>, data: Vec<Vec<T>>) -> Result<Self> {
        let rows = data.first().map(Vec::len).unwrap_or(0);
        Self::with_index((0..rows).collect(), columns, data)
    }

    /// Build a frame with explicit row labels.
    pub fn with_index(index: Vec<usize>, columns: Vec<String>, data: Vec<Vec<T>>) -> Result<Self> {
        if columns.len() != data.len() {
            return Err(Error::Alignment(format!(
                "{} column names for {} columns",
                columns.len(),
                data.len()
            )));
        }

        let mut seen = BTreeSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(Error::InvalidMetadata(format!("duplicate column name: {name}")));
            }
        }

        let mut labels = BTreeSet::new();
        for label in &index {
            if !labels.insert(*label) {
                return Err(Error::Alignment(format!("duplicate row label: {label}")));
            }
        }

        for (name, values) in columns.iter().zip(&data) {
            if values.len() != index.len() {
                return Err(Error::Alignment(format!(
                    "column '{name}' has {} values, expected {}",
                    values.len(),
                    index.len()
                )));
            }
        }

        Ok(Self {
            index,
            columns,
            data,
        })
    }

    /// Build a frame from row-major records, labelling rows `0..n`.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<T>>) -> Result<Self> {
        let mut data: Vec<Vec<T>> = columns
            .iter()
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();
        for (position, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(Error::Alignment(format!(
                    "row {position} has {} values, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
            for (column, value) in data.iter_mut().zip(row) {
                column.push(value);
            }
        }
        let index = (0..data.first().map(Vec::len).unwrap_or(0)).collect();
        Self::with_index(index, columns, data)
    }

    /// A frame with row labels but no columns.
    pub fn empty(index: Vec<usize>) -> Self {
        Self {
            index,
            columns: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    pub fn column(&self, name: &str) -> Option<&[T]> {
        let position = self.columns.iter().position(|column| column == name)?;
        Some(&self.data[position])
    }

    /// Iterate `(name, values)` pairs in column order.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.data.iter().map(Vec::as_slice))
    }

    /// Mutable access to every column's values, in column order.
    pub fn iter_columns_mut(&mut self) -> impl Iterator<Item = (&str, &mut Vec<T>)> {
        self.columns.iter().map(String::as_str).zip(self.data.iter_mut())
    }

    /// Position of a row label, if present.
    pub fn position(&self, label: usize) -> Option<usize> {
        self.index.iter().position(|candidate| *candidate == label)
    }

    /// Cell lookup by row label and column name.
    pub fn get(&self, label: usize, column: &str) -> Option<&T> {
        let row = self.position(label)?;
        self.column(column).map(|values| &values[row])
    }

    /// Values of the row at `position`, in column order.
    pub fn row(&self, position: usize) -> Option<Vec<T>> {
        if position >= self.len() {
            return None;
        }
        Some(self.data.iter().map(|values| values[position].clone()).collect())
    }

    /// Copy of the frame without the named columns. Unknown names are ignored.
    pub fn drop_columns(&self, names: &[&str]) -> Self {
        let (columns, data) = self
            .columns
            .iter()
            .zip(&self.data)
            .filter(|(column, _)| !names.contains(&column.as_str()))
            .map(|(column, values)| (column.clone(), values.clone()))
            .unzip();
        Self {
            index: self.index.clone(),
            columns,
            data,
        }
    }

    /// Select rows by label, keeping the order of `labels`.
    ///
    /// Returns `None` when any label is absent from this frame.
    pub fn take(&self, labels: &[usize]) -> Option<Self> {
        let positions: HashMap<usize, usize> = self
            .index
            .iter()
            .enumerate()
            .map(|(position, label)| (*label, position))
            .collect();
        let selected = labels
            .iter()
            .map(|label| positions.get(label).copied())
            .collect::<Option<Vec<usize>>>()?;
        let data = self
            .data
            .iter()
            .map(|values| selected.iter().map(|row| values[*row].clone()).collect())
            .collect();
        Some(Self {
            index: labels.to_vec(),
            columns: self.columns.clone(),
            data,
        })
    }

    /// Replace the named column, or append it when absent.
    pub fn set_column(&mut self, name: &str, values: Vec<T>) -> Result<()> {
        if values.len() != self.len() {
            return Err(Error::Alignment(format!(
                "column '{name}' has {} values, expected {}",
                values.len(),
                self.len()
            )));
        }
        match self.columns.iter().position(|column| column == name) {
            Some(position) => self.data[position] = values,
            None => {
                self.columns.push(name.to_string());
                self.data.push(values);
            }
        }
        Ok(())
    }

    /// Rename every column with `f`.
    pub fn rename_columns(&mut self, mut f: impl FnMut(&str) -> String) {
        for column in &mut self.columns {
            *column = f(column);
        }
    }
}

impl Frame<f64> {
    /// Number of missing (`NaN`) cells across the frame.
    pub fn missing_count(&self) -> usize {
        self.data
            .iter()
            .flatten()
            .filter(|value| value.is_nan())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame<f64> {
        Frame::with_index(
            vec![10, 11, 12],
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
        .expect("frame")
    }

    #[test]
    fn take_selects_by_label() {
        let selected = frame().take(&[12, 10]).expect("labels present");
        assert_eq!(selected.index(), &[12, 10]);
        assert_eq!(selected.column("b"), Some(&[6.0, 4.0][..]));
    }

    #[test]
    fn take_rejects_unknown_labels() {
        assert!(frame().take(&[0, 1]).is_none());
    }

    #[test]
    fn set_column_replaces_existing_values() {
        let mut frame = frame();
        frame.set_column("a", vec![0.0; 3]).expect("replace");
        frame.set_column("c", vec![9.0; 3]).expect("append");
        assert_eq!(frame.columns(), &["a", "b", "c"]);
        assert_eq!(frame.column("a"), Some(&[0.0, 0.0, 0.0][..]));
        assert!(frame.set_column("d", vec![1.0]).is_err());
    }

    #[test]
    fn rejects_ragged_columns() {
        let result = Frame::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0, 2.0], vec![1.0]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn from_rows_transposes_records() {
        let frame = Frame::from_rows(
            vec!["x".to_string(), "y".to_string()],
            vec![vec![1, 2], vec![3, 4]],
        )
        .expect("frame");
        assert_eq!(frame.column("y"), Some(&[2, 4][..]));
        assert_eq!(frame.row(1), Some(vec![3, 4]));
    }
}
