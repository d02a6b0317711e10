//! Progress events, learnings, and the per-run execution session.
//!
//! Progress delivery is fire-and-forget: the engine emits snapshots into a
//! channel and never blocks on, or fails because of, a slow or dropped
//! receiver.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::artifact::Artifact;

/// Where an item currently is in its execution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    #[default]
    Pending,
    Generating,
    Validating,
    Healing,
    Complete,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Validating => "validating",
            Self::Healing => "healing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

/// One progress snapshot. Emitted on every status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionProgress {
    /// The item the snapshot is about; `None` for run-wide snapshots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    /// Position of the item in the run, 0-based
    #[serde(default)]
    pub item_index: usize,
    #[serde(default)]
    pub total_items: usize,
    /// Scoring round within the current item, 1-based; 0 outside healing
    #[serde(default)]
    pub iteration: u32,
    pub status: ExecutionStatus,
    pub message: String,
    /// Ids of artifacts produced so far in this run
    #[serde(default)]
    pub artifacts: Vec<Uuid>,
    /// Learning messages accumulated so far in this run
    #[serde(default)]
    pub learnings: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionProgress {
    pub fn new(item_id: &str, status: ExecutionStatus, message: &str) -> Self {
        Self {
            item_id: Some(item_id.to_string()),
            ..Self::run_wide(status, message)
        }
    }

    /// A snapshot about the run as a whole rather than any single item.
    pub fn run_wide(status: ExecutionStatus, message: &str) -> Self {
        Self {
            item_id: None,
            item_index: 0,
            total_items: 0,
            iteration: 0,
            status,
            message: message.to_string(),
            artifacts: Vec::new(),
            learnings: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_position(mut self, index: usize, total: usize) -> Self {
        self.item_index = index;
        self.total_items = total;
        self
    }

    pub fn with_iteration(mut self, iteration: u32) -> Self {
        self.iteration = iteration;
        self
    }

    pub fn with_run_state(mut self, artifacts: Vec<Uuid>, learnings: Vec<String>) -> Self {
        self.artifacts = artifacts;
        self.learnings = learnings;
        self
    }
}

/// Fire-and-forget sender for progress snapshots.
///
/// A dropped or full receiver loses the snapshot silently; delivery
/// failures never reach the engine.
#[derive(Clone)]
pub struct ProgressSink {
    tx: mpsc::Sender<ExecutionProgress>,
}

impl ProgressSink {
    pub fn new(tx: mpsc::Sender<ExecutionProgress>) -> Self {
        Self { tx }
    }

    /// Create a sink together with its receiving end.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ExecutionProgress>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Deliver a snapshot without waiting. A full or dropped receiver
    /// loses the snapshot silently; the caller is never blocked.
    pub fn emit(&self, progress: ExecutionProgress) {
        let _ = self.tx.try_send(progress);
    }
}

/// One lesson recorded after an item finishes, successfully or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learning {
    pub item_id: String,
    pub message: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl Learning {
    pub fn success(item_id: &str, message: &str) -> Self {
        Self {
            item_id: item_id.to_string(),
            message: message.to_string(),
            success: true,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(item_id: &str, message: &str) -> Self {
        Self {
            item_id: item_id.to_string(),
            message: message.to_string(),
            success: false,
            timestamp: Utc::now(),
        }
    }
}

/// Caller-owned state for one run. Two independent runs never share a
/// session, so concurrent runs cannot observe each other's learnings or
/// artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSession {
    pub id: Uuid,
    pub learnings: Vec<Learning>,
    /// Final artifact per completed or attempted item, keyed by item id
    pub artifacts: HashMap<String, Artifact>,
    /// Top-level `execute_next` calls consumed so far
    pub iterations_used: u32,
}

impl ExecutionSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            learnings: Vec::new(),
            artifacts: HashMap::new(),
            iterations_used: 0,
        }
    }

    pub fn record_learning(&mut self, learning: Learning) {
        self.learnings.push(learning);
    }

    pub fn record_artifact(&mut self, item_id: &str, artifact: Artifact) {
        self.artifacts.insert(item_id.to_string(), artifact);
    }

    pub fn artifact_ids(&self) -> Vec<Uuid> {
        self.artifacts.values().map(|a| a.id).collect()
    }

    pub fn learning_messages(&self) -> Vec<String> {
        self.learnings.iter().map(|l| l.message.clone()).collect()
    }
}

impl Default for ExecutionSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sink_delivers_snapshots() {
        let (sink, mut rx) = ProgressSink::channel(8);
        sink.emit(ExecutionProgress::new(
            "a",
            ExecutionStatus::Generating,
            "drafting",
        ));

        let progress = rx.recv().await.unwrap();
        assert_eq!(progress.item_id.as_deref(), Some("a"));
        assert_eq!(progress.status, ExecutionStatus::Generating);
    }

    #[test]
    fn test_emit_survives_dropped_receiver() {
        let (sink, rx) = ProgressSink::channel(1);
        drop(rx);
        // Must not panic or error back into the caller.
        sink.emit(ExecutionProgress::new(
            "a",
            ExecutionStatus::Complete,
            "done",
        ));
    }

    #[test]
    fn test_emit_on_full_channel_is_lossy_not_blocking() {
        let (sink, mut rx) = ProgressSink::channel(1);
        sink.emit(ExecutionProgress::new(
            "a",
            ExecutionStatus::Generating,
            "first",
        ));
        // Capacity is exhausted; this snapshot is dropped, not queued for.
        sink.emit(ExecutionProgress::new(
            "a",
            ExecutionStatus::Validating,
            "second",
        ));

        assert_eq!(rx.try_recv().unwrap().message, "first");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_run_wide_snapshot_names_no_item() {
        let progress = ExecutionProgress::run_wide(ExecutionStatus::Complete, "all done");
        assert!(progress.item_id.is_none());
        assert_eq!(progress.status, ExecutionStatus::Complete);
    }

    #[test]
    fn test_progress_builder() {
        let progress = ExecutionProgress::new("b", ExecutionStatus::Healing, "round 2")
            .with_position(1, 3)
            .with_iteration(2);
        assert_eq!(progress.item_index, 1);
        assert_eq!(progress.total_items, 3);
        assert_eq!(progress.iteration, 2);
    }

    #[test]
    fn test_session_accumulates_learnings() {
        let mut session = ExecutionSession::new();
        session.record_learning(Learning::success("a", "short copy scored best"));
        session.record_learning(Learning::failure("b", "video brief too vague"));

        assert_eq!(session.learnings.len(), 2);
        assert!(session.learnings[0].success);
        assert!(!session.learnings[1].success);
    }

    #[test]
    fn test_session_tracks_artifacts_by_item() {
        let mut session = ExecutionSession::new();
        let artifact = Artifact::new("t", "b", "cta");
        let id = artifact.id;
        session.record_artifact("a", artifact);

        assert_eq!(session.artifact_ids(), vec![id]);
        assert!(session.artifacts.contains_key("a"));
    }
}
