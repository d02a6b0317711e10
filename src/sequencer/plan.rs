//! Execution planning: total order, phase partition, critical path.
//!
//! The planner converts a dependency graph into:
//! - a deterministic topological order (ties broken by backlog order)
//! - phases of mutually independent items, via repeated zero-indegree
//!   extraction (each extraction round is one phase)
//! - the critical path: the longest dependency chain by node count,
//!   computed with memoized longest-path-to-root, ties by first discovery
//! - per-phase aggregate effort hours

use serde::{Deserialize, Serialize};

use crate::backlog::WorkItem;
use crate::errors::ConfigurationError;
use crate::sequencer::builder::{DependencyGraph, GraphBuilder, ItemIndex};

/// One phase: items whose dependencies all live in earlier phases. Items in
/// the same phase are mutually independent and may run concurrently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseGroup {
    /// 0-based phase position
    pub index: usize,
    /// Item ids in backlog order
    pub item_ids: Vec<String>,
    /// Sum of estimated effort hours for the phase
    pub total_hours: f64,
}

/// The full sequencing output for a backlog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Total topological order of item ids
    pub order: Vec<String>,
    /// Phase partition; exhaustive and disjoint over the items
    pub phases: Vec<PhaseGroup>,
    /// Longest dependency chain, root first
    pub critical_path: Vec<String>,
}

impl ExecutionPlan {
    /// Length of the critical path in nodes.
    pub fn critical_path_len(&self) -> usize {
        self.critical_path.len()
    }

    /// The phase index an item belongs to, if it is in the plan.
    pub fn phase_of(&self, item_id: &str) -> Option<usize> {
        self.phases
            .iter()
            .find(|p| p.item_ids.iter().any(|id| id == item_id))
            .map(|p| p.index)
    }
}

/// Build the execution plan for a set of items.
///
/// Fails with `ConfigurationError` on duplicate ids or a dependency cycle;
/// a partial order is never returned.
pub fn build_sequence(items: &[WorkItem]) -> Result<ExecutionPlan, ConfigurationError> {
    let graph = GraphBuilder::new(items.to_vec()).build()?;
    Ok(plan_from_graph(&graph))
}

/// Build the execution plan from an already-validated graph.
pub fn plan_from_graph(graph: &DependencyGraph) -> ExecutionPlan {
    let n = graph.len();
    let mut in_degree: Vec<usize> = (0..n).map(|i| graph.dependencies(i).len()).collect();
    let mut processed = vec![false; n];

    let mut order: Vec<String> = Vec::with_capacity(n);
    let mut phases: Vec<PhaseGroup> = Vec::new();

    // Repeated zero-indegree extraction; each round is one phase. Scanning
    // in backlog order keeps the tie break deterministic. The builder has
    // already rejected cycles, so every round makes progress.
    while order.len() < n {
        let ready: Vec<ItemIndex> = (0..n)
            .filter(|&i| !processed[i] && in_degree[i] == 0)
            .collect();

        let mut item_ids = Vec::with_capacity(ready.len());
        let mut total_hours = 0.0;
        for &idx in &ready {
            processed[idx] = true;
            let item = &graph.items()[idx];
            item_ids.push(item.id.clone());
            total_hours += item.estimated_hours;
            order.push(item.id.clone());
        }

        for &idx in &ready {
            for &dependent in graph.dependents(idx) {
                in_degree[dependent] -= 1;
            }
        }

        phases.push(PhaseGroup {
            index: phases.len(),
            item_ids,
            total_hours,
        });
    }

    ExecutionPlan {
        order,
        phases,
        critical_path: critical_path(graph),
    }
}

/// Longest dependency chain by node count. `depth[i]` is the length of the
/// longest chain ending at item `i`; memoized over the reverse edges. Ties
/// resolve to the first-discovered (lowest index) candidate.
fn critical_path(graph: &DependencyGraph) -> Vec<String> {
    let n = graph.len();
    if n == 0 {
        return Vec::new();
    }

    let mut depth: Vec<Option<usize>> = vec![None; n];
    let mut best_pred: Vec<Option<ItemIndex>> = vec![None; n];

    fn resolve(
        i: ItemIndex,
        graph: &DependencyGraph,
        depth: &mut Vec<Option<usize>>,
        best_pred: &mut Vec<Option<ItemIndex>>,
    ) -> usize {
        if let Some(d) = depth[i] {
            return d;
        }
        let mut best = 0;
        let mut pred = None;
        for &dep in graph.dependencies(i) {
            let d = resolve(dep, graph, depth, best_pred);
            if d > best {
                best = d;
                pred = Some(dep);
            }
        }
        depth[i] = Some(best + 1);
        best_pred[i] = pred;
        best + 1
    }

    let mut end = 0;
    let mut max_depth = 0;
    for i in 0..n {
        let d = resolve(i, graph, &mut depth, &mut best_pred);
        if d > max_depth {
            max_depth = d;
            end = i;
        }
    }

    let mut chain = Vec::with_capacity(max_depth);
    let mut cursor = Some(end);
    while let Some(i) = cursor {
        chain.push(graph.items()[i].id.clone());
        cursor = best_pred[i];
    }
    chain.reverse();
    chain
}
