//! Dependency graph builder and sequencer.
//!
//! Converts a flat backlog into an execution order and phase grouping that
//! respects dependencies while maximizing parallelism.
//!
//! ## Architecture
//!
//! 1. **Builder** - Constructs a dependency graph from the items, rejecting
//!    duplicates and cycles
//! 2. **Planner** - Computes the total order, phase partition, and critical
//!    path from the validated graph
//!
//! ## Example
//!
//! ```
//! use adloom::backlog::WorkItem;
//! use adloom::sequencer::build_sequence;
//!
//! let items = vec![
//!     WorkItem::new("teaser", "Launch teaser", "Short post"),
//!     WorkItem::new("video", "Launch video", "30s cut")
//!         .with_dependencies(vec!["teaser".to_string()]),
//!     WorkItem::new("email", "Announcement email", "Newsletter"),
//! ];
//!
//! let plan = build_sequence(&items)?;
//! // Phase 0: [teaser, email], Phase 1: [video]
//! assert_eq!(plan.phases.len(), 2);
//! assert_eq!(plan.critical_path_len(), 2);
//! # Ok::<(), adloom::errors::ConfigurationError>(())
//! ```

mod builder;
mod plan;

pub use builder::{DependencyGraph, GraphBuilder, ItemIndex};
pub use plan::{ExecutionPlan, PhaseGroup, build_sequence, plan_from_graph};
