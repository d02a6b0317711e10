//! Quality scoring over the evaluator capability.
//!
//! The validator applies policy to raw evaluator output: a configurable
//! pass cutoff, verdict precedence, multi-dimension averaging, and a
//! conservative default when the evaluator itself fails. Raw provider
//! errors never cross this boundary.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::artifact::{
    Artifact, IssueDimension, IssueSeverity, ValidationIssue, ValidationResult,
};
use crate::capability::ArtifactEvaluator;

/// Brand guardrails every artifact is scored against.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrandConstraints {
    /// Desired voice, e.g. "confident but friendly"
    pub tone: String,
    /// Brand values the copy must not contradict
    #[serde(default)]
    pub values: Vec<String>,
    /// Messages the campaign wants repeated
    #[serde(default)]
    pub key_messages: Vec<String>,
    /// Who the artifact speaks to
    #[serde(default)]
    pub audience: String,
}

impl BrandConstraints {
    pub fn new(tone: &str, audience: &str) -> Self {
        Self {
            tone: tone.to_string(),
            audience: audience.to_string(),
            ..Default::default()
        }
    }
}

/// Validator policy knobs.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Minimum overall score to pass when the evaluator gives no verdict
    pub pass_threshold: f64,
    /// Score reported when the evaluator fails; kept conservative
    pub fallback_score: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            pass_threshold: 80.0,
            fallback_score: 60.0,
        }
    }
}

/// Scores artifacts and converts evaluator output into `ValidationResult`s.
#[derive(Clone)]
pub struct Validator {
    evaluator: Arc<dyn ArtifactEvaluator>,
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(evaluator: Arc<dyn ArtifactEvaluator>) -> Self {
        Self {
            evaluator,
            config: ValidatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Score an artifact. Never fails: evaluator errors become a
    /// conservative failing result.
    ///
    /// An explicit evaluator verdict wins over the numeric score. In
    /// multi-dimension mode the overall score is the mean of the four
    /// dimensions and the weakest dimension becomes the next healing
    /// round's focus.
    pub async fn validate(
        &self,
        artifact: &Artifact,
        constraints: &BrandConstraints,
        criteria: &[String],
    ) -> ValidationResult {
        match self.evaluator.evaluate(artifact, constraints, criteria).await {
            Ok(eval) => {
                let score = eval
                    .dimensions
                    .map(|d| d.overall())
                    .unwrap_or(eval.score)
                    .clamp(0.0, 100.0);
                let passed = eval.verdict.unwrap_or(score >= self.config.pass_threshold);
                let focus = eval
                    .dimensions
                    .map(|d| d.weakest())
                    .or_else(|| eval.issues.first().map(|i| i.dimension))
                    .unwrap_or_default();

                ValidationResult {
                    passed,
                    score,
                    issues: eval.issues,
                    suggestions: eval.suggestions,
                    dimensions: eval.dimensions,
                    focus,
                }
            }
            Err(e) => {
                warn!(artifact = %artifact.id, error = %e, "evaluator failed, returning conservative result");
                self.conservative_default()
            }
        }
    }

    fn conservative_default(&self) -> ValidationResult {
        // Clamp into the 50-70 band so a broken evaluator can neither pass
        // an artifact nor tank its recorded score.
        let score = self.config.fallback_score.clamp(50.0, 70.0);
        ValidationResult::failing(
            score,
            ValidationIssue::new(
                IssueDimension::General,
                IssueSeverity::Major,
                "Evaluator was unavailable; artifact not verified",
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::DimensionScores;
    use crate::capability::{CapabilityResult, Evaluation};
    use crate::errors::CapabilityError;
    use async_trait::async_trait;

    struct FixedEvaluator {
        eval: Evaluation,
    }

    #[async_trait]
    impl ArtifactEvaluator for FixedEvaluator {
        async fn evaluate(
            &self,
            _artifact: &Artifact,
            _constraints: &BrandConstraints,
            _criteria: &[String],
        ) -> CapabilityResult<Evaluation> {
            Ok(self.eval.clone())
        }
    }

    struct FailingEvaluator;

    #[async_trait]
    impl ArtifactEvaluator for FailingEvaluator {
        async fn evaluate(
            &self,
            _artifact: &Artifact,
            _constraints: &BrandConstraints,
            _criteria: &[String],
        ) -> CapabilityResult<Evaluation> {
            Err(CapabilityError::provider("evaluator offline"))
        }
    }

    fn validator(eval: Evaluation) -> Validator {
        Validator::new(Arc::new(FixedEvaluator { eval }))
    }

    fn artifact() -> Artifact {
        Artifact::new("Title", "Body", "Act now")
    }

    fn constraints() -> BrandConstraints {
        BrandConstraints::new("warm", "creators")
    }

    #[tokio::test]
    async fn test_score_at_threshold_passes() {
        let v = validator(Evaluation {
            score: 80.0,
            ..Default::default()
        });
        let result = v.validate(&artifact(), &constraints(), &[]).await;
        assert!(result.passed);
        assert_eq!(result.score, 80.0);
    }

    #[tokio::test]
    async fn test_score_below_threshold_fails() {
        let v = validator(Evaluation {
            score: 79.9,
            ..Default::default()
        });
        let result = v.validate(&artifact(), &constraints(), &[]).await;
        assert!(!result.passed);
    }

    #[tokio::test]
    async fn test_explicit_verdict_beats_score() {
        // High score, but the evaluator explicitly rejects.
        let v = validator(Evaluation {
            verdict: Some(false),
            score: 95.0,
            ..Default::default()
        });
        let result = v.validate(&artifact(), &constraints(), &[]).await;
        assert!(!result.passed);

        // Low score, explicit accept.
        let v = validator(Evaluation {
            verdict: Some(true),
            score: 40.0,
            ..Default::default()
        });
        let result = v.validate(&artifact(), &constraints(), &[]).await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_dimensions_drive_score_and_focus() {
        let v = validator(Evaluation {
            // The flat score is ignored when dimensions exist
            score: 10.0,
            dimensions: Some(DimensionScores {
                clarity: 90.0,
                engagement: 85.0,
                brand_alignment: 95.0,
                cta_strength: 50.0,
            }),
            ..Default::default()
        });
        let result = v.validate(&artifact(), &constraints(), &[]).await;

        assert_eq!(result.score, 80.0);
        assert!(result.passed);
        assert_eq!(result.focus, IssueDimension::CallToAction);
    }

    #[tokio::test]
    async fn test_focus_falls_back_to_first_issue() {
        let v = validator(Evaluation {
            score: 60.0,
            issues: vec![ValidationIssue::new(
                IssueDimension::Engagement,
                IssueSeverity::Major,
                "flat opening",
            )],
            ..Default::default()
        });
        let result = v.validate(&artifact(), &constraints(), &[]).await;
        assert_eq!(result.focus, IssueDimension::Engagement);
    }

    #[tokio::test]
    async fn test_evaluator_failure_conservative_default() {
        let v = Validator::new(Arc::new(FailingEvaluator));
        let result = v.validate(&artifact(), &constraints(), &[]).await;

        assert!(!result.passed);
        assert!(result.score >= 50.0 && result.score <= 70.0);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].dimension, IssueDimension::General);
    }

    #[tokio::test]
    async fn test_custom_threshold() {
        let v = validator(Evaluation {
            score: 65.0,
            ..Default::default()
        })
        .with_config(ValidatorConfig {
            pass_threshold: 60.0,
            ..Default::default()
        });
        let result = v.validate(&artifact(), &constraints(), &[]).await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_clamped() {
        let v = validator(Evaluation {
            score: 140.0,
            ..Default::default()
        });
        let result = v.validate(&artifact(), &constraints(), &[]).await;
        assert_eq!(result.score, 100.0);
    }
}
