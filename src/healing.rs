//! The healing loop: bounded regenerate-and-rescore until an artifact
//! passes validation.
//!
//! `max_attempts` bounds total scoring rounds. The first draft counts as
//! attempt 1, so at most `max_attempts - 1` regeneration rounds run after
//! the initial scoring. Capability failures inside a round are logged as a
//! failed attempt and the loop moves on; nothing a provider does can abort
//! the item.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifact::{
    Artifact, HealingAttempt, IssueDimension, IssueSeverity, ValidationIssue, ValidationResult,
};
use crate::backlog::WorkItem;
use crate::capability::{
    CapabilityResult, ContentGenerator, GenerationRequest, RegenerationFeedback,
};
use crate::errors::CapabilityError;
use crate::orchestrator::{ExecutionProgress, ExecutionStatus, ProgressSink};
use crate::validator::{BrandConstraints, Validator};

/// Healing loop states. `Healed` and `Exhausted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealingState {
    /// Initial artifact has been scored
    Scored,
    /// A regeneration request is in flight
    Regenerating,
    /// A regenerated candidate has been scored
    Validated,
    /// An artifact passed validation
    Healed,
    /// Budget ran out while still failing
    Exhausted,
}

/// What the loop ended with. The unhealed artifact is always returned on
/// exhaustion, together with the full attempt history.
#[derive(Debug, Clone)]
pub struct HealingOutcome {
    pub state: HealingState,
    pub final_artifact: Artifact,
    pub final_result: ValidationResult,
    pub attempts: Vec<HealingAttempt>,
    /// Validation rounds actually performed, including the initial scoring
    pub scoring_rounds: u32,
}

impl HealingOutcome {
    pub fn healed(&self) -> bool {
        self.state == HealingState::Healed
    }
}

/// Drives one item's artifact through regenerate-and-rescore rounds.
#[derive(Clone)]
pub struct HealingLoop {
    generator: Arc<dyn ContentGenerator>,
    validator: Validator,
    attempt_timeout: Option<Duration>,
}

impl HealingLoop {
    pub fn new(generator: Arc<dyn ContentGenerator>, validator: Validator) -> Self {
        Self {
            generator,
            validator,
            attempt_timeout: None,
        }
    }

    /// Bound each generation call. A timed-out call is treated exactly like
    /// a provider failure: logged as a failed attempt, round consumed.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Heal `initial` for `item` within `max_attempts` scoring rounds.
    ///
    /// A passing initial artifact returns `Healed` with zero attempts
    /// recorded. `max_attempts` below 1 is treated as 1.
    pub async fn heal(
        &self,
        item: &WorkItem,
        campaign_goal: &str,
        initial: Artifact,
        constraints: &BrandConstraints,
        max_attempts: u32,
        sink: Option<&ProgressSink>,
    ) -> HealingOutcome {
        let max_attempts = max_attempts.max(1);

        if let Some(sink) = sink {
            sink.emit(
                ExecutionProgress::new(&item.id, ExecutionStatus::Validating, "Scoring first draft")
                    .with_iteration(1),
            );
        }

        let mut artifact = initial;
        let mut result = self
            .validator
            .validate(&artifact, constraints, &item.acceptance_criteria)
            .await;
        let mut scoring_rounds = 1u32;
        let mut attempts: Vec<HealingAttempt> = Vec::new();

        if result.passed {
            info!(item = %item.id, score = result.score, "first draft passed");
            return HealingOutcome {
                state: HealingState::Healed,
                final_artifact: artifact,
                final_result: result,
                attempts,
                scoring_rounds,
            };
        }

        for round in 2..=max_attempts {
            if let Some(sink) = sink {
                sink.emit(
                    ExecutionProgress::new(
                        &item.id,
                        ExecutionStatus::Healing,
                        &format!("Regenerating, focus on {}", result.focus.as_str()),
                    )
                    .with_iteration(round),
                );
            }

            let feedback = RegenerationFeedback {
                prior_artifact: artifact.clone(),
                issues: result.issues.clone(),
                suggestions: result.suggestions.clone(),
                focus: result.focus,
            };
            let request = GenerationRequest::revision(item, campaign_goal, feedback);
            let sequence = attempts.len() as u32 + 1;

            match self.generate(&request).await {
                Ok(candidate) => {
                    let candidate_result = self
                        .validator
                        .validate(&candidate, constraints, &item.acceptance_criteria)
                        .await;
                    scoring_rounds += 1;

                    attempts.push(HealingAttempt {
                        sequence,
                        timestamp: Utc::now(),
                        issues_addressed: result.issues.clone(),
                        suggestions: result.suggestions.clone(),
                        artifact: candidate.clone(),
                        result: candidate_result.clone(),
                    });

                    artifact = candidate;
                    result = candidate_result;

                    if result.passed {
                        info!(item = %item.id, round, score = result.score, "artifact healed");
                        return HealingOutcome {
                            state: HealingState::Healed,
                            final_artifact: artifact,
                            final_result: result,
                            attempts,
                            scoring_rounds,
                        };
                    }
                }
                Err(e) => {
                    warn!(item = %item.id, round, error = %e, "regeneration failed, round consumed");
                    // The round is consumed but nothing new was scored; the
                    // prior artifact stays in play for the next round.
                    attempts.push(HealingAttempt {
                        sequence,
                        timestamp: Utc::now(),
                        issues_addressed: result.issues.clone(),
                        suggestions: result.suggestions.clone(),
                        artifact: artifact.clone(),
                        result: ValidationResult::failing(
                            result.score,
                            ValidationIssue::new(
                                IssueDimension::General,
                                IssueSeverity::Major,
                                &format!("Regeneration failed: {e}"),
                            ),
                        ),
                    });
                }
            }
        }

        warn!(item = %item.id, scoring_rounds, "healing budget exhausted");
        HealingOutcome {
            state: HealingState::Exhausted,
            final_artifact: artifact,
            final_result: result,
            attempts,
            scoring_rounds,
        }
    }

    async fn generate(&self, request: &GenerationRequest) -> CapabilityResult<Artifact> {
        match self.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.generator.generate(request)).await
            {
                Ok(result) => result,
                Err(_) => Err(CapabilityError::Timeout {
                    seconds: limit.as_secs(),
                }),
            },
            None => self.generator.generate(request).await,
        }
    }
}
