//! Dependency graph construction for backlog items.
//!
//! The builder takes the flat backlog and constructs a directed acyclic
//! graph that the planner uses for ordering and phase grouping. Dependency
//! ids that reference no item in the backlog are treated as externally
//! satisfied and dropped from the edge set; a cycle is a fatal
//! configuration error.

use std::collections::{HashMap, HashSet};

use crate::backlog::WorkItem;
use crate::errors::ConfigurationError;

/// Index into the item list.
pub type ItemIndex = usize;

/// A directed acyclic graph over the backlog's work items.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Items indexed by their backlog position
    items: Vec<WorkItem>,
    /// Map from item id to index
    index_map: HashMap<String, ItemIndex>,
    /// Forward edges: index -> items that depend on it
    forward_edges: Vec<Vec<ItemIndex>>,
    /// Reverse edges: index -> items it depends on
    reverse_edges: Vec<Vec<ItemIndex>>,
}

impl DependencyGraph {
    /// Get the number of items in the graph.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get an item by its index.
    pub fn get_item(&self, index: ItemIndex) -> Option<&WorkItem> {
        self.items.get(index)
    }

    /// Get the index for an item id.
    pub fn get_index(&self, id: &str) -> Option<ItemIndex> {
        self.index_map.get(id).copied()
    }

    /// All items in backlog order.
    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// Items that depend on the given item (forward edges).
    pub fn dependents(&self, index: ItemIndex) -> &[ItemIndex] {
        self.forward_edges.get(index).map_or(&[], |v| v.as_slice())
    }

    /// Items the given item depends on (reverse edges).
    pub fn dependencies(&self, index: ItemIndex) -> &[ItemIndex] {
        self.reverse_edges.get(index).map_or(&[], |v| v.as_slice())
    }

    /// Check if all dependencies of an item are in the completed set.
    pub fn dependencies_satisfied(&self, index: ItemIndex, completed: &HashSet<ItemIndex>) -> bool {
        self.dependencies(index)
            .iter()
            .all(|dep| completed.contains(dep))
    }
}

/// Builder for dependency graphs.
pub struct GraphBuilder {
    items: Vec<WorkItem>,
}

impl GraphBuilder {
    /// Create a new builder over a snapshot of the backlog items.
    pub fn new(items: Vec<WorkItem>) -> Self {
        Self { items }
    }

    /// Build the dependency graph.
    ///
    /// Validation:
    /// - item ids must be unique
    /// - no cycles are allowed
    ///
    /// Dependencies on ids absent from the backlog are externally satisfied
    /// and produce no edge.
    pub fn build(self) -> Result<DependencyGraph, ConfigurationError> {
        let mut index_map = HashMap::new();
        for (i, item) in self.items.iter().enumerate() {
            if index_map.contains_key(&item.id) {
                return Err(ConfigurationError::DuplicateItem {
                    id: item.id.clone(),
                });
            }
            index_map.insert(item.id.clone(), i);
        }

        let mut forward_edges: Vec<Vec<ItemIndex>> = vec![Vec::new(); self.items.len()];
        let mut reverse_edges: Vec<Vec<ItemIndex>> = vec![Vec::new(); self.items.len()];

        for (to_idx, item) in self.items.iter().enumerate() {
            for dep in &item.depends_on {
                // Unknown ids are satisfied outside this backlog
                if let Some(&from_idx) = index_map.get(dep) {
                    forward_edges[from_idx].push(to_idx);
                    reverse_edges[to_idx].push(from_idx);
                }
            }
        }

        let graph = DependencyGraph {
            items: self.items,
            index_map,
            forward_edges,
            reverse_edges,
        };

        Self::validate_no_cycles(&graph)?;

        Ok(graph)
    }

    /// Validate acyclicity using Kahn's algorithm.
    fn validate_no_cycles(graph: &DependencyGraph) -> Result<(), ConfigurationError> {
        let mut in_degree: Vec<usize> = graph.reverse_edges.iter().map(|deps| deps.len()).collect();

        let mut queue: Vec<ItemIndex> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, deg)| *deg == 0)
            .map(|(i, _)| i)
            .collect();

        let mut processed = 0;

        while let Some(node) = queue.pop() {
            processed += 1;

            for &dependent in graph.dependents(node) {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push(dependent);
                }
            }
        }

        if processed != graph.len() {
            let cycle_items: Vec<String> = in_degree
                .iter()
                .enumerate()
                .filter(|&(_, deg)| *deg > 0)
                .filter_map(|(i, _)| graph.get_item(i).map(|item| item.id.clone()))
                .collect();

            return Err(ConfigurationError::CycleDetected { items: cycle_items });
        }

        Ok(())
    }
}
