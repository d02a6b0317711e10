//! Campaign execution: the engine state machine plus progress plumbing.
//!
//! The orchestrator drives each backlog item through generation,
//! validation, and healing. Completion is only ever recorded against a
//! passing validation, progress snapshots flow to a caller-supplied sink
//! with fire-and-forget delivery, and all run state lives in a
//! caller-owned `ExecutionSession`.

mod engine;
mod progress;

pub use engine::{Orchestrator, OrchestratorConfig, RunSummary, StepResult};
pub use progress::{
    ExecutionProgress, ExecutionSession, ExecutionStatus, Learning, ProgressSink,
};
