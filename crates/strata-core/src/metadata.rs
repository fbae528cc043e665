use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata describing one table of the relational dataset.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableMeta {
    pub name: String,
    /// Primary key column, required for tables that have children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    pub fields: BTreeMap<String, FieldMeta>,
}

/// Column metadata. A field carrying `ref` is a foreign key.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FieldMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<FieldRef>,
}

/// Target of a foreign key reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldRef {
    pub table: String,
    pub field: String,
}

impl TableMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = Some(field.into());
        self
    }

    pub fn with_field(mut self, field: FieldMeta) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Fields referencing another table, as `(field, reference)` pairs.
    pub fn references(&self) -> impl Iterator<Item = (&str, &FieldRef)> {
        self.fields.values().filter_map(|field| {
            field
                .reference
                .as_ref()
                .map(|reference| (field.name.as_str(), reference))
        })
    }
}

impl FieldMeta {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            subtype: None,
            reference: None,
        }
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    pub fn referencing(mut self, table: impl Into<String>, field: impl Into<String>) -> Self {
        self.reference = Some(FieldRef {
            table: table.into(),
            field: field.into(),
        });
        self
    }
}
