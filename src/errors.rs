//! Typed error hierarchy for the execution engine.
//!
//! Two top-level enums cover the two failure classes:
//! - `ConfigurationError`: fatal problems with the backlog or budget
//!   configuration; the only errors allowed to escape sequencing and
//!   allocation.
//! - `CapabilityError`: failures from generation/evaluation/estimation/risk
//!   providers; always caught at the call site and converted into a
//!   conservative default or a failed attempt.

use thiserror::Error;

/// Fatal configuration problems. These abort the sequencing or allocation
/// call that detected them and carry enough context to fix the input.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Dependency cycle detected in backlog. Involved items: {items:?}")]
    CycleDetected { items: Vec<String> },

    #[error("Duplicate work item id: {id}")]
    DuplicateItem { id: String },

    #[error("Invalid budget ceiling {hours}: {message}")]
    InvalidBudget { hours: f64, message: String },
}

/// Failures from a capability provider. Recoverable by contract: callers
/// convert these into conservative defaults or failed attempts, so a single
/// flaky provider call never aborts a run.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("Provider call failed: {0}")]
    Provider(String),

    #[error("Provider call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Malformed provider response: {0}")]
    Contract(String),
}

impl CapabilityError {
    /// Wrap an arbitrary provider failure message.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }
}
