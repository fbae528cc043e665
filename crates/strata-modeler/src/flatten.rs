use std::collections::BTreeMap;

use strata_copula::ParamValue;

use crate::errors::{ModelerError, ModelerResult};

/// Separator joining nested keys and sequence positions.
pub const KEY_SEPARATOR: &str = "__";

/// Flatten a nested parameter structure into `outer__inner` keyed scalars.
///
/// Sequences contribute their positions as key segments, so a matrix under
/// `covariance` yields `covariance__<row>__<col>`. Only numeric leaves are
/// kept; text, boolean and null leaves are dropped.
pub fn flatten(nested: &ParamValue) -> BTreeMap<String, f64> {
    flatten_with_prefix(nested, "")
}

/// [`flatten`], with every key nested under `prefix`.
pub fn flatten_with_prefix(nested: &ParamValue, prefix: &str) -> BTreeMap<String, f64> {
    let mut flat = BTreeMap::new();
    flatten_into(nested, prefix, &mut flat);
    flat
}

fn flatten_into(value: &ParamValue, key: &str, flat: &mut BTreeMap<String, f64>) {
    match value {
        ParamValue::Number(number) => {
            flat.insert(key.to_string(), *number);
        }
        ParamValue::Mapping(entries) => {
            for (name, entry) in entries {
                flatten_into(entry, &join(key, name), flat);
            }
        }
        ParamValue::Sequence(items) => {
            for (position, item) in items.iter().enumerate() {
                flatten_into(item, &join(key, &position.to_string()), flat);
            }
        }
        ParamValue::Null | ParamValue::Bool(_) | ParamValue::Text(_) => {}
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}{KEY_SEPARATOR}{key}")
    }
}

#[derive(Debug)]
enum Node {
    Leaf(f64),
    Branch(BTreeMap<String, Node>),
}

/// Rebuild the nested structure of a flattened mapping.
///
/// Branches whose keys are exactly `0..n` become sequences, every other
/// branch becomes a mapping. Fails when a key is both a leaf and a branch.
pub fn unflatten(flat: &BTreeMap<String, f64>) -> ModelerResult<ParamValue> {
    let mut root = BTreeMap::new();

    for (key, value) in flat {
        let segments: Vec<&str> = key.split(KEY_SEPARATOR).collect();
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| ModelerError::Unflatten("empty key".to_string()))?;

        let mut branch = &mut root;
        for segment in parents {
            let node = branch
                .entry((*segment).to_string())
                .or_insert_with(|| Node::Branch(BTreeMap::new()));
            branch = match node {
                Node::Branch(children) => children,
                Node::Leaf(_) => {
                    return Err(ModelerError::Unflatten(format!(
                        "'{key}' nests under a scalar"
                    )));
                }
            };
        }

        if branch
            .insert((*last).to_string(), Node::Leaf(*value))
            .is_some()
        {
            return Err(ModelerError::Unflatten(format!(
                "'{key}' is both a scalar and a branch"
            )));
        }
    }

    Ok(into_param(Node::Branch(root)))
}

fn into_param(node: Node) -> ParamValue {
    match node {
        Node::Leaf(value) => ParamValue::Number(value),
        Node::Branch(children) if is_sequence(&children) => {
            let mut items: Vec<(usize, Node)> = children
                .into_iter()
                .filter_map(|(key, child)| key.parse().ok().map(|position| (position, child)))
                .collect();
            items.sort_by_key(|(position, _)| *position);
            ParamValue::Sequence(items.into_iter().map(|(_, child)| into_param(child)).collect())
        }
        Node::Branch(children) => ParamValue::Mapping(
            children
                .into_iter()
                .map(|(key, child)| (key, into_param(child)))
                .collect(),
        ),
    }
}

fn is_sequence(children: &BTreeMap<String, Node>) -> bool {
    if children.is_empty() {
        return false;
    }
    let mut positions = Vec::with_capacity(children.len());
    for key in children.keys() {
        match key.parse::<usize>() {
            Ok(position) if *key == position.to_string() => positions.push(position),
            _ => return false,
        }
    }
    positions.sort_unstable();
    positions
        .iter()
        .enumerate()
        .all(|(expected, position)| expected == *position)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), *value))
            .collect()
    }

    #[test]
    fn flat_mapping_is_unchanged() {
        let nested = ParamValue::mapping([("a", ParamValue::from(1.0)), ("b", ParamValue::from(2.0))]);
        assert_eq!(flatten(&nested), numbers(&[("a", 1.0), ("b", 2.0)]));
    }

    #[test]
    fn nested_mappings_join_keys() {
        let nested = ParamValue::mapping([
            (
                "first_key",
                ParamValue::mapping([("a", ParamValue::from(1.0)), ("b", ParamValue::from(2.0))]),
            ),
            ("second_key", ParamValue::mapping([("x", ParamValue::from(0.0))])),
        ]);
        assert_eq!(
            flatten(&nested),
            numbers(&[("first_key__a", 1.0), ("first_key__b", 2.0), ("second_key__x", 0.0)])
        );
    }

    #[test]
    fn matrices_flatten_by_position() {
        let identity = ParamValue::Sequence(vec![
            ParamValue::from(vec![1.0, 0.0, 0.0]),
            ParamValue::from(vec![0.0, 1.0, 0.0]),
            ParamValue::from(vec![0.0, 0.0, 1.0]),
        ]);
        let flat = flatten(&identity);
        assert_eq!(flat.len(), 9);
        for row in 0..3 {
            for col in 0..3 {
                let expected = if row == col { 1.0 } else { 0.0 };
                assert_eq!(flat[&format!("{row}__{col}")], expected);
            }
        }
    }

    #[test]
    fn drops_non_numeric_leaves_but_keeps_siblings() {
        let marginal = |mean: f64| {
            ParamValue::mapping([
                ("type", ParamValue::from("strata_copula::univariate::GaussianUnivariate")),
                ("fitted", ParamValue::from(true)),
                ("mean", ParamValue::from(mean)),
                ("std", ParamValue::from(2.5)),
            ])
        };
        let nested = ParamValue::mapping([
            ("covariance", ParamValue::Sequence(vec![ParamValue::from(vec![1.5, 0.5])])),
            (
                "distribs",
                ParamValue::mapping([
                    ("type", marginal(4.0)),
                    ("fitted", marginal(6.0)),
                ]),
            ),
            ("type", ParamValue::from("strata_copula::multivariate::GaussianMultivariate")),
            ("fitted", ParamValue::from(true)),
            ("missing", ParamValue::Null),
        ]);

        assert_eq!(
            flatten(&nested),
            numbers(&[
                ("covariance__0__0", 1.5),
                ("covariance__0__1", 0.5),
                ("distribs__fitted__mean", 6.0),
                ("distribs__fitted__std", 2.5),
                ("distribs__type__mean", 4.0),
                ("distribs__type__std", 2.5),
            ])
        );
    }

    #[test]
    fn prefix_nests_every_key() {
        let nested = ParamValue::mapping([("a", ParamValue::from(1.0))]);
        assert_eq!(flatten_with_prefix(&nested, "child"), numbers(&[("child__a", 1.0)]));
    }

    #[test]
    fn unflatten_rebuilds_sequences_and_mappings() {
        let flat = numbers(&[
            ("covariance__0__0", 1.0),
            ("covariance__1__0", 0.5),
            ("covariance__1__1", 2.0),
            ("distribs__age__mean", 30.0),
        ]);
        let nested = unflatten(&flat).unwrap();

        let rows = nested.get("covariance").and_then(ParamValue::as_sequence).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ParamValue::from(vec![1.0]));
        assert_eq!(rows[1], ParamValue::from(vec![0.5, 2.0]));
        let age = nested.get("distribs").and_then(|d| d.get("age")).unwrap();
        assert_eq!(age.number("mean").unwrap(), 30.0);
        assert_eq!(flatten(&nested), flat);
    }

    #[test]
    fn unflatten_keeps_sparse_positions_as_mapping() {
        let nested = unflatten(&numbers(&[("0", 1.0), ("2", 3.0)])).unwrap();
        assert!(nested.as_mapping().is_some());
        let nested = unflatten(&numbers(&[("10", 1.0), ("2", 3.0), ("0", 0.0), ("1", 0.0)])).unwrap();
        assert!(nested.as_mapping().is_some());
    }

    #[test]
    fn unflatten_rejects_scalar_with_children() {
        let flat = numbers(&[("a", 1.0), ("a__b", 2.0)]);
        assert!(matches!(unflatten(&flat), Err(ModelerError::Unflatten(_))));
    }
}
