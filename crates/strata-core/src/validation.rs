use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::metadata::TableMeta;

/// Validate internal consistency of table metadata.
///
/// This checks:
/// - duplicate table names
/// - field map keys match field names
/// - primary key columns exist
/// - references target existing tables and fields
pub fn validate_metadata<'a>(tables: impl IntoIterator<Item = &'a TableMeta>) -> Result<()> {
    let mut catalog: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let tables: Vec<&TableMeta> = tables.into_iter().collect();

    for meta in &tables {
        if catalog.contains_key(meta.name.as_str()) {
            return Err(Error::InvalidMetadata(format!(
                "duplicate table name: {}",
                meta.name
            )));
        }

        let mut fields = BTreeSet::new();
        for (key, field) in &meta.fields {
            if key != &field.name {
                return Err(Error::InvalidMetadata(format!(
                    "field key '{}.{key}' does not match field name '{}'",
                    meta.name, field.name
                )));
            }
            fields.insert(key.as_str());
        }

        if let Some(primary_key) = &meta.primary_key {
            if !fields.contains(primary_key.as_str()) {
                return Err(Error::InvalidMetadata(format!(
                    "primary key '{}.{primary_key}' is not a field",
                    meta.name
                )));
            }
        }

        catalog.insert(meta.name.as_str(), fields);
    }

    for meta in &tables {
        for (field, reference) in meta.references() {
            let target = catalog.get(reference.table.as_str()).ok_or_else(|| {
                Error::InvalidMetadata(format!(
                    "field '{}.{field}' references unknown table '{}'",
                    meta.name, reference.table
                ))
            })?;
            if !target.contains(reference.field.as_str()) {
                return Err(Error::InvalidMetadata(format!(
                    "field '{}.{field}' references unknown field '{}.{}'",
                    meta.name, reference.table, reference.field
                )));
            }
        }
    }

    Ok(())
}
