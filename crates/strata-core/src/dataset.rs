use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::graph::RelationshipGraph;
use crate::metadata::TableMeta;
use crate::validation::validate_metadata;
use crate::value::Value;

/// Raw table data paired with its metadata.
#[derive(Debug, Clone)]
pub struct Table {
    pub data: Frame<Value>,
    pub meta: TableMeta,
}

impl Table {
    pub fn new(data: Frame<Value>, meta: TableMeta) -> Self {
        Self { data, meta }
    }
}

/// Read-only view of a relational dataset: raw tables, their transformed
/// (numeric) renditions, and the relationship graph between them.
#[derive(Debug, Clone)]
pub struct Dataset {
    tables: BTreeMap<String, Table>,
    transformed: BTreeMap<String, Frame<f64>>,
    graph: RelationshipGraph,
}

impl Dataset {
    /// Assemble a dataset, validating metadata and frame coverage.
    pub fn new(tables: Vec<Table>, transformed: BTreeMap<String, Frame<f64>>) -> Result<Self> {
        validate_metadata(tables.iter().map(|table| &table.meta))?;

        for table in &tables {
            let name = &table.meta.name;
            let frame = transformed.get(name).ok_or_else(|| {
                Error::InvalidMetadata(format!("table '{name}' has no transformed data"))
            })?;
            if frame.len() != table.data.len() {
                return Err(Error::Alignment(format!(
                    "table '{name}' has {} raw rows but {} transformed rows",
                    table.data.len(),
                    frame.len()
                )));
            }
        }

        if let Some(extra) = transformed
            .keys()
            .find(|name| !tables.iter().any(|table| &table.meta.name == *name))
        {
            return Err(Error::UnknownTable(extra.clone()));
        }

        let graph = RelationshipGraph::from_metadata(tables.iter().map(|table| &table.meta));
        let tables = tables
            .into_iter()
            .map(|table| (table.meta.name.clone(), table))
            .collect();

        Ok(Self {
            tables,
            transformed,
            graph,
        })
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    pub fn meta(&self, name: &str) -> Result<&TableMeta> {
        self.table(name).map(|table| &table.meta)
    }

    pub fn transformed(&self, name: &str) -> Result<&Frame<f64>> {
        self.transformed
            .get(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn get_children(&self, table: &str) -> BTreeSet<String> {
        self.graph.get_children(table)
    }

    pub fn get_parents(&self, table: &str) -> BTreeSet<String> {
        self.graph.get_parents(table)
    }

    /// Tables with no parent.
    pub fn roots(&self) -> Vec<String> {
        self.graph.roots()
    }

    pub fn graph(&self) -> &RelationshipGraph {
        &self.graph
    }
}
