//! Capability provider traits and the typed contract they return.
//!
//! Every external capability (generation, evaluation, effort estimation,
//! risk scoring) is invoked through one narrow async trait so providers can
//! be swapped without touching orchestration logic. Real implementations
//! call out to a generative backend; tests supply deterministic doubles.
//!
//! Providers return strongly typed results or a `CapabilityError`. The core
//! never re-parses free text.

use async_trait::async_trait;

use crate::artifact::{Artifact, DimensionScores, IssueDimension, Suggestion, ValidationIssue};
use crate::backlog::WorkItem;
use crate::errors::CapabilityError;
use crate::estimator::EffortEstimate;
use crate::risk::RiskAssessment;
use crate::validator::BrandConstraints;

pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Structured feedback handed to the generator on a regeneration round.
#[derive(Debug, Clone)]
pub struct RegenerationFeedback {
    /// The artifact being improved
    pub prior_artifact: Artifact,
    /// Issues from the last validation
    pub issues: Vec<ValidationIssue>,
    /// Fix proposals from the last validation
    pub suggestions: Vec<Suggestion>,
    /// The weakest dimension, where the regeneration should concentrate
    pub focus: IssueDimension,
}

/// What kind of generation is being requested.
#[derive(Debug, Clone)]
pub enum GenerationMode {
    /// First draft for an item
    Initial,
    /// Regeneration with feedback from a failed validation
    Revision(RegenerationFeedback),
    /// Alternative take on an already-completed artifact
    Variant { base: Artifact, index: u32 },
}

/// Full context for one generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub item: WorkItem,
    pub campaign_goal: String,
    pub mode: GenerationMode,
}

impl GenerationRequest {
    /// Request a first draft.
    pub fn initial(item: &WorkItem, campaign_goal: &str) -> Self {
        Self {
            item: item.clone(),
            campaign_goal: campaign_goal.to_string(),
            mode: GenerationMode::Initial,
        }
    }

    /// Request a regeneration with structured feedback.
    pub fn revision(item: &WorkItem, campaign_goal: &str, feedback: RegenerationFeedback) -> Self {
        Self {
            item: item.clone(),
            campaign_goal: campaign_goal.to_string(),
            mode: GenerationMode::Revision(feedback),
        }
    }

    /// Request the `index`-th variant of a completed artifact.
    pub fn variant(item: &WorkItem, campaign_goal: &str, base: &Artifact, index: u32) -> Self {
        Self {
            item: item.clone(),
            campaign_goal: campaign_goal.to_string(),
            mode: GenerationMode::Variant {
                base: base.clone(),
                index,
            },
        }
    }
}

/// Raw evaluator output before the validator applies its policy.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// Explicit pass/fail verdict; takes precedence over the numeric score
    pub verdict: Option<bool>,
    /// Overall score 0-100, used when no dimension breakdown exists
    pub score: f64,
    /// Per-dimension scores in multi-dimension mode
    pub dimensions: Option<DimensionScores>,
    pub issues: Vec<ValidationIssue>,
    pub suggestions: Vec<Suggestion>,
}

/// Produces a candidate artifact for a work item.
/// Real implementation: a generative content backend. Test double: a stub
/// returning scripted artifacts.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> CapabilityResult<Artifact>;
}

/// Scores an artifact against brand constraints and acceptance criteria.
#[async_trait]
pub trait ArtifactEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        artifact: &Artifact,
        constraints: &BrandConstraints,
        criteria: &[String],
    ) -> CapabilityResult<Evaluation>;
}

/// Estimates the effort profile of a work item.
#[async_trait]
pub trait EffortModel: Send + Sync {
    async fn estimate(&self, item: &WorkItem) -> CapabilityResult<EffortEstimate>;
}

/// Scores how likely an item is to fail validation before execution starts.
#[async_trait]
pub trait RiskModel: Send + Sync {
    async fn assess_risk(&self, item: &WorkItem) -> CapabilityResult<RiskAssessment>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_request_initial() {
        let item = WorkItem::new("a", "Teaser", "desc");
        let req = GenerationRequest::initial(&item, "launch");
        assert!(matches!(req.mode, GenerationMode::Initial));
        assert_eq!(req.campaign_goal, "launch");
        assert_eq!(req.item.id, "a");
    }

    #[test]
    fn test_generation_request_variant_carries_base() {
        let item = WorkItem::new("a", "Teaser", "desc");
        let base = Artifact::new("t", "b", "cta");
        let req = GenerationRequest::variant(&item, "launch", &base, 2);
        match req.mode {
            GenerationMode::Variant { base: b, index } => {
                assert_eq!(b.id, base.id);
                assert_eq!(index, 2);
            }
            _ => panic!("Expected Variant mode"),
        }
    }

    #[test]
    fn test_evaluation_default_has_no_verdict() {
        let eval = Evaluation::default();
        assert!(eval.verdict.is_none());
        assert!(eval.dimensions.is_none());
        assert_eq!(eval.score, 0.0);
    }
}
