//! Pre-execution risk scoring.
//!
//! Risk assessment is advisory: it informs iteration budgets but never
//! blocks execution. A capability failure degrades to a safe default
//! instead of an error.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backlog::WorkItem;
use crate::capability::RiskModel;

/// Categorical risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskBucket {
    Low,
    #[default]
    Medium,
    High,
}

/// Bucket thresholds and buffer heuristics. Policy, not business logic.
#[derive(Debug, Clone)]
pub struct RiskPolicy {
    /// Scores at or above this are at least medium risk
    pub medium_threshold: f64,
    /// Scores at or above this are high risk
    pub high_threshold: f64,
    /// Extra iteration buffer per high-risk item
    pub buffer_factor: f64,
    /// Score assumed when the risk capability fails
    pub fallback_score: f64,
    /// Iterations recommended when the risk capability fails
    pub fallback_iterations: u32,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            medium_threshold: 35.0,
            high_threshold: 70.0,
            buffer_factor: 1.5,
            fallback_score: 50.0,
            fallback_iterations: 2,
        }
    }
}

impl RiskPolicy {
    /// Map a 0-100 score to its bucket.
    pub fn bucket_for(&self, score: f64) -> RiskBucket {
        if score >= self.high_threshold {
            RiskBucket::High
        } else if score >= self.medium_threshold {
            RiskBucket::Medium
        } else {
            RiskBucket::Low
        }
    }
}

/// A named contributor to an item's risk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskFactor {
    pub name: String,
    pub severity: RiskBucket,
    pub description: String,
    pub mitigation: String,
}

impl RiskFactor {
    pub fn new(name: &str, severity: RiskBucket, description: &str, mitigation: &str) -> Self {
        Self {
            name: name.to_string(),
            severity,
            description: description.to_string(),
            mitigation: mitigation.to_string(),
        }
    }
}

/// Pre-execution risk profile for one item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub item_id: String,
    /// 0-100; higher means more likely to fail validation
    pub score: f64,
    pub bucket: RiskBucket,
    pub factors: Vec<RiskFactor>,
    pub recommended_iterations: u32,
}

/// Aggregate risk picture over a backlog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    pub average_score: f64,
    /// Ids of high-risk items, in backlog order
    pub high_risk_items: Vec<String>,
    /// The most frequently recurring factor name, if any
    pub most_common_factor: Option<String>,
    /// Recommended extra iteration buffer: ceil(high_risk_count * buffer_factor)
    pub recommended_buffer: u32,
    pub assessments: Vec<RiskAssessment>,
}

/// Scores items through a pluggable risk capability.
#[derive(Clone)]
pub struct RiskPredictor {
    model: Arc<dyn RiskModel>,
    policy: RiskPolicy,
}

impl RiskPredictor {
    pub fn new(model: Arc<dyn RiskModel>) -> Self {
        Self {
            model,
            policy: RiskPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RiskPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Assess one item. The bucket is always recomputed from policy so the
    /// provider cannot disagree with the configured thresholds. Never fails.
    pub async fn assess_item(&self, item: &WorkItem) -> RiskAssessment {
        match self.model.assess_risk(item).await {
            Ok(mut assessment) => {
                assessment.score = assessment.score.clamp(0.0, 100.0);
                assessment.bucket = self.policy.bucket_for(assessment.score);
                assessment.recommended_iterations = assessment.recommended_iterations.max(1);
                assessment
            }
            Err(e) => {
                warn!(item = %item.id, error = %e, "risk capability failed, using safe default");
                self.fallback_assessment(item)
            }
        }
    }

    fn fallback_assessment(&self, item: &WorkItem) -> RiskAssessment {
        RiskAssessment {
            item_id: item.id.clone(),
            score: self.policy.fallback_score,
            bucket: self.policy.bucket_for(self.policy.fallback_score),
            factors: vec![RiskFactor::new(
                "assessment-unavailable",
                RiskBucket::Medium,
                "Risk capability was unavailable for this item",
                "Review the item manually before relying on its budget",
            )],
            recommended_iterations: self.policy.fallback_iterations,
        }
    }

    /// Aggregate report over a whole backlog.
    pub async fn assess_backlog(&self, items: &[WorkItem]) -> RiskReport {
        let mut assessments = Vec::with_capacity(items.len());
        for item in items {
            assessments.push(self.assess_item(item).await);
        }

        let average_score = if assessments.is_empty() {
            0.0
        } else {
            assessments.iter().map(|a| a.score).sum::<f64>() / assessments.len() as f64
        };

        let high_risk_items: Vec<String> = assessments
            .iter()
            .filter(|a| a.bucket == RiskBucket::High)
            .map(|a| a.item_id.clone())
            .collect();

        // Most frequent factor name; ties resolve to the first seen.
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut first_seen: Vec<&str> = Vec::new();
        for assessment in &assessments {
            for factor in &assessment.factors {
                let entry = counts.entry(factor.name.as_str()).or_insert(0);
                if *entry == 0 {
                    first_seen.push(factor.name.as_str());
                }
                *entry += 1;
            }
        }
        let mut most_common_factor: Option<&str> = None;
        let mut best_count = 0;
        for name in &first_seen {
            let count = counts.get(name).copied().unwrap_or(0);
            if count > best_count {
                best_count = count;
                most_common_factor = Some(name);
            }
        }
        let most_common_factor = most_common_factor.map(str::to_string);

        let recommended_buffer =
            (high_risk_items.len() as f64 * self.policy.buffer_factor).ceil() as u32;

        RiskReport {
            average_score,
            high_risk_items,
            most_common_factor,
            recommended_buffer,
            assessments,
        }
    }
}
