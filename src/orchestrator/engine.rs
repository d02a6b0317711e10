//! The execution engine: drives backlog items through generation,
//! validation, and healing until the backlog is complete.
//!
//! All run state lives in a caller-owned `ExecutionSession`, so independent
//! runs never share counters or learnings. Capability failures never escape
//! an item's pipeline; the only error the engine itself returns is a
//! `ConfigurationError` from sequencing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::artifact::{Artifact, ValidationResult};
use crate::backlog::{Backlog, WorkItem};
use crate::capability::{ArtifactEvaluator, ContentGenerator, GenerationRequest};
use crate::errors::ConfigurationError;
use crate::estimator::AllocationPlan;
use crate::healing::HealingLoop;
use crate::orchestrator::progress::{
    ExecutionProgress, ExecutionSession, ExecutionStatus, Learning, ProgressSink,
};
use crate::sequencer::{GraphBuilder, ItemIndex, build_sequence, plan_from_graph};
use crate::validator::{BrandConstraints, Validator};

/// Engine policy knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Scoring rounds per item, first draft included
    pub max_attempts: u32,
    /// Concurrent items within one phase
    pub max_parallel: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_parallel: 4,
        }
    }
}

/// Result of one `execute_next` call.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The item that ran; `None` when the backlog was already complete
    pub item_id: Option<String>,
    pub success: bool,
    pub artifact: Option<Artifact>,
}

impl StepResult {
    fn already_complete() -> Self {
        Self {
            item_id: None,
            success: true,
            artifact: None,
        }
    }
}

/// Summary of a `run_to_completion` or `run_phases` call.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub completed: usize,
    pub total: usize,
    /// Top-level item executions consumed
    pub iterations_used: u32,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }
}

/// One item's trip through the pipeline.
struct ItemOutcome {
    item_id: String,
    index: usize,
    success: bool,
    artifact: Option<Artifact>,
    result: Option<ValidationResult>,
    scoring_rounds: u32,
}

/// The core state machine. Cheap to clone; all capability handles are
/// shared behind `Arc`.
#[derive(Clone)]
pub struct Orchestrator {
    generator: Arc<dyn ContentGenerator>,
    healing: HealingLoop,
    constraints: BrandConstraints,
    config: OrchestratorConfig,
    /// Per-item scoring-round budgets from an allocation plan
    iteration_budgets: Arc<HashMap<String, u32>>,
    sink: Option<ProgressSink>,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        evaluator: Arc<dyn ArtifactEvaluator>,
        constraints: BrandConstraints,
    ) -> Self {
        let validator = Validator::new(evaluator);
        let healing = HealingLoop::new(generator.clone(), validator);
        Self {
            generator,
            healing,
            constraints,
            config: OrchestratorConfig::default(),
            iteration_budgets: Arc::new(HashMap::new()),
            sink: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a progress sink. Delivery is fire-and-forget.
    pub fn with_sink(mut self, sink: ProgressSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Cap each item's scoring rounds at its allocated iteration count.
    /// An item never spends more rounds than its budget, whatever the
    /// validator says; items missing from the plan use `max_attempts`.
    pub fn with_allocation(mut self, plan: &AllocationPlan) -> Self {
        self.iteration_budgets = Arc::new(
            plan.allocations
                .iter()
                .map(|a| (a.item_id.clone(), a.iterations))
                .collect(),
        );
        self
    }

    /// Honor an external cancellation signal. A cancelled run refuses to
    /// start the next item; an in-flight item finishes its current attempt.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Execute the first incomplete item in sequencer order.
    ///
    /// A no-op reporting success when the backlog is already complete. The
    /// item is marked complete only when a passing validation exists for it.
    pub async fn execute_next(
        &self,
        backlog: &mut Backlog,
        session: &mut ExecutionSession,
    ) -> Result<StepResult, ConfigurationError> {
        if backlog.is_complete() {
            self.emit(ExecutionProgress::run_wide(
                ExecutionStatus::Complete,
                "Backlog already complete",
            ));
            return Ok(StepResult::already_complete());
        }

        let plan = build_sequence(backlog.items())?;
        let next = plan
            .order
            .iter()
            .find(|id| backlog.get(id).is_some_and(|i| !i.complete))
            .cloned();
        let Some(next_id) = next else {
            return Ok(StepResult::already_complete());
        };
        let index = backlog
            .items()
            .iter()
            .position(|i| i.id == next_id)
            .unwrap_or(0);
        let item = match backlog.get(&next_id) {
            Some(item) => item.clone(),
            None => return Ok(StepResult::already_complete()),
        };

        session.iterations_used += 1;
        let total = backlog.len();
        let goal = backlog.campaign_goal.clone();
        let outcome = self.run_item(&item, &goal, index, total).await;

        let step = StepResult {
            item_id: Some(outcome.item_id.clone()),
            success: outcome.success,
            artifact: outcome.artifact.clone(),
        };
        self.apply_outcome(backlog, session, outcome);
        Ok(step)
    }

    /// Repeatedly call `execute_next` until the backlog completes, the
    /// iteration ceiling is hit, or cancellation is requested.
    ///
    /// No retry logic lives here; retries happen inside the healing loop.
    /// Hitting the ceiling with failed items left is a normal outcome, and
    /// a later call may re-attempt them.
    pub async fn run_to_completion(
        &self,
        backlog: &mut Backlog,
        session: &mut ExecutionSession,
        max_total_iterations: u32,
    ) -> Result<RunSummary, ConfigurationError> {
        let mut iterations = 0u32;
        let mut cancelled = false;

        while !backlog.is_complete() && iterations < max_total_iterations {
            if self.cancel.is_cancelled() {
                info!("cancellation requested, not starting next item");
                cancelled = true;
                break;
            }
            self.execute_next(backlog, session).await?;
            iterations += 1;
        }

        Ok(RunSummary {
            completed: backlog.completed_count(),
            total: backlog.len(),
            iterations_used: iterations,
            cancelled,
        })
    }

    /// Execute the backlog phase by phase. Items within a phase have no
    /// mutual dependencies and run concurrently, bounded by
    /// `max_parallel`. Backlog and session writes happen on the calling
    /// task after each phase joins, so completion flags and learnings are
    /// appended by a single writer.
    ///
    /// An item whose dependency failed in an earlier phase is not run; it
    /// is left incomplete with a failure learning instead.
    pub async fn run_phases(
        &self,
        backlog: &mut Backlog,
        session: &mut ExecutionSession,
    ) -> Result<RunSummary, ConfigurationError> {
        let graph = GraphBuilder::new(backlog.items().to_vec()).build()?;
        let plan = plan_from_graph(&graph);
        let total = backlog.len();
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel.max(1)));
        let mut iterations = 0u32;
        let mut cancelled = false;

        let mut completed: HashSet<ItemIndex> = backlog
            .items()
            .iter()
            .enumerate()
            .filter(|(_, item)| item.complete)
            .map(|(i, _)| i)
            .collect();

        for phase in &plan.phases {
            if self.cancel.is_cancelled() {
                info!(phase = phase.index, "cancellation requested, skipping remaining phases");
                cancelled = true;
                break;
            }

            let mut handles = Vec::new();
            for item_id in &phase.item_ids {
                let Some(item) = backlog.get(item_id) else {
                    continue;
                };
                if item.complete {
                    continue;
                }
                let Some(index) = graph.get_index(item_id) else {
                    continue;
                };
                if !graph.dependencies_satisfied(index, &completed) {
                    warn!(item = %item_id, "dependency left incomplete, item skipped");
                    let learning =
                        Learning::failure(item_id, "Skipped: a dependency did not complete");
                    self.emit(
                        ExecutionProgress::new(item_id, ExecutionStatus::Failed, &learning.message)
                            .with_position(index, total),
                    );
                    session.record_learning(learning);
                    continue;
                }
                let item = item.clone();
                let goal = backlog.campaign_goal.clone();
                let engine = self.clone();
                let semaphore = semaphore.clone();

                handles.push(tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return ItemOutcome {
                                item_id: item.id.clone(),
                                index,
                                success: false,
                                artifact: None,
                                result: None,
                                scoring_rounds: 0,
                            };
                        }
                    };
                    engine.run_item(&item, &goal, index, total).await
                }));
            }

            for joined in futures::future::join_all(handles).await {
                match joined {
                    Ok(outcome) => {
                        iterations += 1;
                        session.iterations_used += 1;
                        self.apply_outcome(backlog, session, outcome);
                    }
                    Err(e) => warn!(error = %e, "item task panicked"),
                }
            }

            for (i, item) in backlog.items().iter().enumerate() {
                if item.complete {
                    completed.insert(i);
                }
            }
        }

        Ok(RunSummary {
            completed: backlog.completed_count(),
            total,
            iterations_used: iterations,
            cancelled,
        })
    }

    /// One item's full pipeline: generate, then validate and heal. Never
    /// fails; a generation error becomes a failed outcome.
    async fn run_item(
        &self,
        item: &WorkItem,
        campaign_goal: &str,
        index: usize,
        total: usize,
    ) -> ItemOutcome {
        self.emit(
            ExecutionProgress::new(&item.id, ExecutionStatus::Generating, "Drafting artifact")
                .with_position(index, total),
        );

        let request = GenerationRequest::initial(item, campaign_goal);
        let initial = match self.generator.generate(&request).await {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(item = %item.id, error = %e, "initial generation failed");
                return ItemOutcome {
                    item_id: item.id.clone(),
                    index,
                    success: false,
                    artifact: None,
                    result: None,
                    scoring_rounds: 0,
                };
            }
        };

        let max_attempts = self
            .iteration_budgets
            .get(&item.id)
            .copied()
            .unwrap_or(self.config.max_attempts)
            .min(self.config.max_attempts);
        let outcome = self
            .healing
            .heal(
                item,
                campaign_goal,
                initial,
                &self.constraints,
                max_attempts,
                self.sink.as_ref(),
            )
            .await;

        ItemOutcome {
            item_id: item.id.clone(),
            index,
            success: outcome.healed(),
            artifact: Some(outcome.final_artifact),
            result: Some(outcome.final_result),
            scoring_rounds: outcome.scoring_rounds,
        }
    }

    /// Record an item's outcome: completion flag, artifact, learning, and
    /// the final progress snapshot. Completion requires a passing result.
    fn apply_outcome(
        &self,
        backlog: &mut Backlog,
        session: &mut ExecutionSession,
        outcome: ItemOutcome,
    ) {
        let passed = outcome.result.as_ref().is_some_and(|r| r.passed);
        let score = outcome.result.as_ref().map(|r| r.score).unwrap_or(0.0);

        if let Some(artifact) = &outcome.artifact {
            // The final artifact is kept even when unhealed.
            session.record_artifact(&outcome.item_id, artifact.clone());
        }

        let (status, learning) = if outcome.success && passed {
            backlog.mark_complete(&outcome.item_id);
            info!(item = %outcome.item_id, score, rounds = outcome.scoring_rounds, "item complete");
            (
                ExecutionStatus::Complete,
                Learning::success(
                    &outcome.item_id,
                    &format!(
                        "Completed with score {score:.0} after {} scoring rounds",
                        outcome.scoring_rounds
                    ),
                ),
            )
        } else {
            warn!(item = %outcome.item_id, score, "item failed, left incomplete");
            (
                ExecutionStatus::Failed,
                Learning::failure(
                    &outcome.item_id,
                    &format!(
                        "Failed after {} scoring rounds, best score {score:.0}",
                        outcome.scoring_rounds
                    ),
                ),
            )
        };
        session.record_learning(learning.clone());

        self.emit(
            ExecutionProgress::new(&outcome.item_id, status, &learning.message)
                .with_position(outcome.index, backlog.len())
                .with_iteration(outcome.scoring_rounds)
                .with_run_state(session.artifact_ids(), session.learning_messages()),
        );
    }

    fn emit(&self, progress: ExecutionProgress) {
        if let Some(sink) = &self.sink {
            sink.emit(progress);
        }
    }
}
