//! Variant fan-out for completed artifacts.
//!
//! Produces N alternative takes on an artifact that already shipped, ranks
//! them by predicted performance, and reports the top variant's lift over
//! the weakest. Strictly read-only over the core model: the original
//! artifact and its work item are never touched.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::artifact::Artifact;
use crate::backlog::WorkItem;
use crate::capability::{ArtifactEvaluator, ContentGenerator, GenerationRequest};
use crate::validator::BrandConstraints;

/// Predicted score used when the evaluator cannot score a variant.
const UNSCORED_VARIANT_SCORE: f64 = 50.0;

/// One alternative take, ranked against its siblings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedVariant {
    /// 1-based rank, 1 is the strongest
    pub rank: usize,
    pub artifact: Artifact,
    /// Predicted performance score 0-100
    pub predicted_score: f64,
}

/// All variants for one artifact, strongest first.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VariantReport {
    pub variants: Vec<RankedVariant>,
    /// Percentage lift of the top variant over the weakest; 0 when fewer
    /// than two variants were scored
    pub top_lift_percent: f64,
}

impl VariantReport {
    pub fn top(&self) -> Option<&RankedVariant> {
        self.variants.first()
    }
}

/// Generates and ranks alternative artifacts.
#[derive(Clone)]
pub struct VariantGenerator {
    generator: Arc<dyn ContentGenerator>,
    evaluator: Arc<dyn ArtifactEvaluator>,
}

impl VariantGenerator {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        evaluator: Arc<dyn ArtifactEvaluator>,
    ) -> Self {
        Self {
            generator,
            evaluator,
        }
    }

    /// Generate up to `count` variants of `base` and rank them descending
    /// by predicted score. Failed generations are skipped; an unscorable
    /// variant keeps a neutral predicted score. Ties keep generation order.
    pub async fn generate_variants(
        &self,
        item: &WorkItem,
        campaign_goal: &str,
        base: &Artifact,
        constraints: &BrandConstraints,
        count: u32,
    ) -> VariantReport {
        let mut scored: Vec<(Artifact, f64)> = Vec::new();

        for index in 1..=count {
            let request = GenerationRequest::variant(item, campaign_goal, base, index);
            let artifact = match self.generator.generate(&request).await {
                Ok(artifact) => artifact,
                Err(e) => {
                    warn!(item = %item.id, index, error = %e, "variant generation failed, skipping");
                    continue;
                }
            };

            let score = match self
                .evaluator
                .evaluate(&artifact, constraints, &item.acceptance_criteria)
                .await
            {
                Ok(eval) => eval
                    .dimensions
                    .map(|d| d.overall())
                    .unwrap_or(eval.score)
                    .clamp(0.0, 100.0),
                Err(e) => {
                    warn!(item = %item.id, index, error = %e, "variant scoring failed, using neutral score");
                    UNSCORED_VARIANT_SCORE
                }
            };

            scored.push((artifact, score));
        }

        // Stable sort keeps generation order among equals.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let top_lift_percent = match (scored.first(), scored.last()) {
            (Some((_, top)), Some((_, weakest))) if scored.len() >= 2 && *weakest > 0.0 => {
                (top - weakest) / weakest * 100.0
            }
            _ => 0.0,
        };

        VariantReport {
            variants: scored
                .into_iter()
                .enumerate()
                .map(|(i, (artifact, predicted_score))| RankedVariant {
                    rank: i + 1,
                    artifact,
                    predicted_score,
                })
                .collect(),
            top_lift_percent,
        }
    }
}
