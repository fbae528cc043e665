use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::metadata::TableMeta;

/// Report for the parent/child dependency ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphReport {
    pub nodes: usize,
    pub edges: usize,
    /// Parents before children, when the graph is acyclic.
    pub topo_order: Option<Vec<String>>,
    /// Nodes left on a cycle otherwise.
    pub cycle: Option<Vec<String>>,
}

/// Directed parent -> child graph over table names.
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    children: BTreeMap<String, BTreeSet<String>>,
    parents: BTreeMap<String, BTreeSet<String>>,
}

impl RelationshipGraph {
    /// Build the graph from field references: a table whose field refers to
    /// another table is that table's child.
    pub fn from_metadata<'a>(tables: impl IntoIterator<Item = &'a TableMeta>) -> Self {
        let mut graph = Self::default();
        for meta in tables {
            graph.add_table(&meta.name);
            for (_, reference) in meta.references() {
                graph.add_edge(&reference.table, &meta.name);
            }
        }
        graph
    }

    pub fn add_table(&mut self, table: &str) {
        self.children.entry(table.to_string()).or_default();
        self.parents.entry(table.to_string()).or_default();
    }

    pub fn add_edge(&mut self, parent: &str, child: &str) {
        self.add_table(parent);
        self.add_table(child);
        self.children
            .entry(parent.to_string())
            .or_default()
            .insert(child.to_string());
        self.parents
            .entry(child.to_string())
            .or_default()
            .insert(parent.to_string());
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn get_children(&self, table: &str) -> BTreeSet<String> {
        self.children.get(table).cloned().unwrap_or_default()
    }

    pub fn get_parents(&self, table: &str) -> BTreeSet<String> {
        self.parents.get(table).cloned().unwrap_or_default()
    }

    /// Tables with no parent, in name order.
    pub fn roots(&self) -> Vec<String> {
        self.parents
            .iter()
            .filter(|(_, parents)| parents.is_empty())
            .map(|(table, _)| table.clone())
            .collect()
    }

    pub fn report(&self) -> GraphReport {
        let nodes = self.children.len();
        let edges = self.children.values().map(BTreeSet::len).sum();
        match toposort(&self.children) {
            Ok(order) => GraphReport {
                nodes,
                edges,
                topo_order: Some(order),
                cycle: None,
            },
            Err(cycle) => GraphReport {
                nodes,
                edges,
                topo_order: None,
                cycle: Some(cycle),
            },
        }
    }
}

fn toposort(graph: &BTreeMap<String, BTreeSet<String>>) -> Result<Vec<String>, Vec<String>> {
    let mut indegree: BTreeMap<&str, usize> =
        graph.keys().map(|node| (node.as_str(), 0)).collect();
    for targets in graph.values() {
        for target in targets {
            *indegree.entry(target.as_str()).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter_map(|(node, count)| (*count == 0).then_some(*node))
        .collect();
    let mut order = Vec::with_capacity(graph.len());

    while let Some(node) = ready.pop_first() {
        order.push(node.to_string());
        if let Some(targets) = graph.get(node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target.as_str()) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(target.as_str());
                    }
                }
            }
        }
    }

    if order.len() == indegree.len() {
        Ok(order)
    } else {
        Err(indegree
            .into_iter()
            .filter_map(|(node, count)| (count > 0).then(|| node.to_string()))
            .collect())
    }
}
