use std::collections::{BTreeMap, BTreeSet, HashMap};

use strata_core::{Error as CoreError, Frame, Value};
use tracing::{debug, warn};

use crate::errors::ModelerResult;
use crate::impute::impute_table;
use crate::modeler::Modeler;

/// Name of the column carrying parameter `param` contributed by `child`.
pub fn extension_column(child: &str, param: &str) -> String {
    format!("__{child}_{param}")
}

/// Flattened model parameters of one child table, one row per parent key.
#[derive(Debug, Clone)]
pub struct Extension {
    /// Child table the parameters summarize.
    pub child: String,
    /// Parent primary key column the rows are keyed by.
    pub key_column: String,
    /// Raw parent key value of each row.
    pub keys: Vec<Value>,
    /// Parameter columns; row `i` belongs to `keys[i]`.
    pub frame: Frame<f64>,
}

impl Extension {
    /// Assemble an extension from per-group parameter rows.
    ///
    /// Columns are the union of every row's parameters, prefixed with the
    /// child name; a parameter absent from a row is missing (`NaN`) there.
    pub fn from_rows(
        child: &str,
        key_column: &str,
        rows: Vec<(Value, BTreeMap<String, f64>)>,
    ) -> ModelerResult<Self> {
        let params: BTreeSet<&String> = rows.iter().flat_map(|(_, row)| row.keys()).collect();
        let data = params
            .iter()
            .map(|param| {
                rows.iter()
                    .map(|(_, row)| row.get(*param).copied().unwrap_or(f64::NAN))
                    .collect()
            })
            .collect();
        let columns = params
            .iter()
            .map(|param| extension_column(child, param))
            .collect();
        let keys = rows.iter().map(|(key, _)| key.clone()).collect();
        let frame = Frame::with_index((0..rows.len()).collect(), columns, data)?;

        Ok(Self {
            child: child.to_string(),
            key_column: key_column.to_string(),
            keys,
            frame,
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Row position of every present key.
    fn positions(&self) -> HashMap<String, usize> {
        self.keys
            .iter()
            .enumerate()
            .filter_map(|(position, key)| key.key().map(|key| (key, position)))
            .collect()
    }
}

/// Left-join `extension` onto a transformed parent table.
///
/// Rows are matched on the raw primary key found at the same row label in
/// `raw`, so the join follows key identity even when the transformed key
/// column holds encoded values. Existing columns of the same name are
/// replaced; unmatched rows receive `NaN`.
pub fn merge_extension(
    table: &Frame<f64>,
    raw: &Frame<Value>,
    extension: &Extension,
) -> ModelerResult<Frame<f64>> {
    let raw_keys = raw.column(&extension.key_column).ok_or_else(|| {
        CoreError::Alignment(format!(
            "raw table has no key column '{}'",
            extension.key_column
        ))
    })?;
    let raw_positions: HashMap<usize, usize> = raw
        .index()
        .iter()
        .enumerate()
        .map(|(position, label)| (*label, position))
        .collect();
    let positions = extension.positions();

    let matches: Vec<Option<usize>> = table
        .index()
        .iter()
        .map(|label| {
            let key = raw_positions.get(label).and_then(|row| raw_keys[*row].key())?;
            positions.get(&key).copied()
        })
        .collect();

    let mut merged = table.clone();
    for (column, values) in extension.frame.iter_columns() {
        let aligned = matches
            .iter()
            .map(|row| row.map_or(f64::NAN, |row| values[row]))
            .collect();
        merged.set_column(column, aligned)?;
    }
    Ok(merged)
}

/// Group row labels by raw key value, in order of first appearance.
/// Missing keys form no group.
fn group_by_key(index: &[usize], keys: &[Value]) -> Vec<(Value, Vec<usize>)> {
    let mut groups: Vec<(Value, Vec<usize>)> = Vec::new();
    let mut lookup: HashMap<String, usize> = HashMap::new();

    for (label, value) in index.iter().zip(keys) {
        let Some(key) = value.key() else {
            continue;
        };
        match lookup.get(&key) {
            Some(group) => groups[*group].1.push(*label),
            None => {
                lookup.insert(key, groups.len());
                groups.push((value.clone(), vec![*label]));
            }
        }
    }

    groups
}

impl Modeler<'_> {
    /// Fit one child row group and flatten the model into a parameter row.
    ///
    /// The foreign key column is left out of the fit. Returns `Ok(None)` when
    /// `foreign_rows` holds labels absent from `child_table`; fit failures
    /// are returned as errors.
    pub fn create_extension(
        &self,
        foreign_rows: &[usize],
        child_table: &Frame<f64>,
        foreign_key: &str,
        child: &str,
    ) -> ModelerResult<Option<BTreeMap<String, f64>>> {
        let projected = child_table.drop_columns(&[foreign_key]);
        let Some(conditional) = projected.take(foreign_rows) else {
            debug!(
                child = %child,
                rows = foreign_rows.len(),
                "row group not aligned with transformed child table"
            );
            return Ok(None);
        };

        let model = self.fit_model(&impute_table(&conditional))?;
        Ok(Some(self.flatten_model(model.as_ref())))
    }

    /// Build the extension of every child of `parent`, keyed by its
    /// primary key.
    pub fn get_extensions(
        &self,
        parent: &str,
        primary_key: &str,
        children: &BTreeSet<String>,
    ) -> ModelerResult<Vec<Extension>> {
        let dataset = self.dataset();
        let mut extensions = Vec::with_capacity(children.len());

        for child in children {
            let table = dataset.table(child)?;
            let foreign_key = Self::get_foreign_key(&table.meta, parent, primary_key)?;
            let keys = table.data.column(&foreign_key).ok_or_else(|| {
                CoreError::Alignment(format!(
                    "raw table '{child}' has no column '{foreign_key}'"
                ))
            })?;
            let child_table = match self.tables().get(child.as_str()) {
                Some(extended) => extended,
                None => dataset.transformed(child)?,
            };

            let groups = group_by_key(table.data.index(), keys);
            let group_count = groups.len();
            let mut rows = Vec::with_capacity(group_count);
            for (key, labels) in groups {
                match self.create_extension(&labels, child_table, &foreign_key, child)? {
                    Some(params) => rows.push((key, params)),
                    None => warn!(
                        parent = %parent,
                        child = %child,
                        key = %key,
                        "skipping misaligned row group"
                    ),
                }
            }

            let extension = Extension::from_rows(child, primary_key, rows)?;
            debug!(
                parent = %parent,
                child = %child,
                foreign_key = %foreign_key,
                groups = group_count,
                skipped = group_count - extension.len(),
                rows = extension.len(),
                columns = extension.frame.width(),
                "extension built"
            );
            extensions.push(extension);
        }

        Ok(extensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_follow_first_appearance() {
        let keys = vec![
            Value::from("B"),
            Value::from("A"),
            Value::Null,
            Value::from("B"),
        ];
        let groups = group_by_key(&[10, 11, 12, 13], &keys);
        assert_eq!(
            groups,
            vec![
                (Value::from("B"), vec![10, 13]),
                (Value::from("A"), vec![11]),
            ]
        );
    }

    #[test]
    fn from_rows_prefixes_and_pads_columns() {
        let rows = vec![
            (
                Value::Int(1),
                BTreeMap::from([("a".to_string(), 1.0), ("b".to_string(), 2.0)]),
            ),
            (Value::Int(2), BTreeMap::from([("a".to_string(), 3.0)])),
        ];
        let extension = Extension::from_rows("orders", "customer_id", rows).unwrap();

        assert_eq!(extension.frame.columns(), &["__orders_a", "__orders_b"]);
        assert_eq!(extension.frame.column("__orders_a"), Some(&[1.0, 3.0][..]));
        let b = extension.frame.column("__orders_b").unwrap();
        assert_eq!(b[0], 2.0);
        assert!(b[1].is_nan());
        assert_eq!(extension.keys, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn empty_rows_give_empty_extension() {
        let extension = Extension::from_rows("orders", "customer_id", Vec::new()).unwrap();
        assert!(extension.is_empty());
        assert_eq!(extension.frame.width(), 0);
    }

    #[test]
    fn merge_matches_raw_keys() {
        let table = Frame::new(
            vec!["id".to_string(), "v".to_string()],
            vec![vec![0.1, 0.4, 0.8], vec![1.0, 2.0, 3.0]],
        )
        .unwrap();
        let raw = Frame::new(
            vec!["id".to_string()],
            vec![vec![Value::from("A"), Value::from("B"), Value::from("C")]],
        )
        .unwrap();
        let extension = Extension {
            child: "child".to_string(),
            key_column: "id".to_string(),
            keys: vec![Value::from("C"), Value::from("A")],
            frame: Frame::new(vec!["p".to_string()], vec![vec![0.2, 0.5]]).unwrap(),
        };

        let merged = merge_extension(&table, &raw, &extension).unwrap();
        let p = merged.column("p").unwrap();
        assert_eq!(p[0], 0.5);
        assert!(p[1].is_nan());
        assert_eq!(p[2], 0.2);
        assert_eq!(merged.index(), table.index());
    }
}
