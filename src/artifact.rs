//! Creative artifacts, validation results, and healing attempt records.
//!
//! An `Artifact` is the output of one generation attempt. Each healing round
//! produces a new `Artifact` rather than mutating the previous one, so the
//! attempt history is a complete audit trail. `ValidationResult` is never
//! modified after construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One generation attempt's output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    /// Unique id for this attempt's output
    pub id: Uuid,
    /// Headline or post title
    pub title: String,
    /// The main creative copy
    pub body: String,
    /// Call to action text
    pub call_to_action: String,
    /// Reference to an associated visual, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_reference: Option<String>,
    /// The prompt that produced this artifact
    #[serde(default)]
    pub prompt_used: String,
    /// Provenance note (provider, attempt context)
    #[serde(default)]
    pub provenance: String,
}

impl Artifact {
    /// Create an artifact with a fresh id.
    pub fn new(title: &str, body: &str, call_to_action: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            body: body.to_string(),
            call_to_action: call_to_action.to_string(),
            visual_reference: None,
            prompt_used: String::new(),
            provenance: String::new(),
        }
    }

    /// Attach the prompt and provenance note.
    pub fn with_provenance(mut self, prompt: &str, provenance: &str) -> Self {
        self.prompt_used = prompt.to_string();
        self.provenance = provenance.to_string();
        self
    }
}

/// Quality dimension an issue or score refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueDimension {
    Clarity,
    Engagement,
    BrandAlignment,
    CallToAction,
    #[default]
    General,
}

impl IssueDimension {
    /// Short human-readable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clarity => "clarity",
            Self::Engagement => "engagement",
            Self::BrandAlignment => "brand alignment",
            Self::CallToAction => "call to action",
            Self::General => "general",
        }
    }
}

/// How severe a validation issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Minor,
    #[default]
    Major,
    Critical,
}

/// A single typed problem found during validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationIssue {
    pub dimension: IssueDimension,
    pub severity: IssueSeverity,
    pub description: String,
}

impl ValidationIssue {
    pub fn new(dimension: IssueDimension, severity: IssueSeverity, description: &str) -> Self {
        Self {
            dimension,
            severity,
            description: description.to_string(),
        }
    }
}

/// A concrete fix proposal tied to an issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    /// Index into the issues list of the owning result
    pub issue_index: usize,
    /// What to change
    pub fix: String,
    /// Ready-to-use replacement text, when the evaluator offers one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_text: Option<String>,
}

/// Per-dimension quality scores in multi-dimension mode, each 0-100.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DimensionScores {
    pub clarity: f64,
    pub engagement: f64,
    pub brand_alignment: f64,
    pub cta_strength: f64,
}

impl DimensionScores {
    /// Overall score: the mean of the four dimensions.
    pub fn overall(&self) -> f64 {
        (self.clarity + self.engagement + self.brand_alignment + self.cta_strength) / 4.0
    }

    /// The weakest dimension, which drives the next healing round's focus.
    pub fn weakest(&self) -> IssueDimension {
        let pairs = [
            (IssueDimension::Clarity, self.clarity),
            (IssueDimension::Engagement, self.engagement),
            (IssueDimension::BrandAlignment, self.brand_alignment),
            (IssueDimension::CallToAction, self.cta_strength),
        ];
        let mut weakest = pairs[0];
        for pair in &pairs[1..] {
            if pair.1 < weakest.1 {
                weakest = *pair;
            }
        }
        weakest.0
    }
}

/// Outcome of scoring one artifact. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationResult {
    /// Whether the artifact meets the quality bar
    pub passed: bool,
    /// Overall score 0-100
    pub score: f64,
    /// Typed issues found
    pub issues: Vec<ValidationIssue>,
    /// Fix proposals, each referencing an issue
    pub suggestions: Vec<Suggestion>,
    /// Per-dimension breakdown when the evaluator scored all four dimensions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<DimensionScores>,
    /// Dimension the next regeneration should focus on
    #[serde(default)]
    pub focus: IssueDimension,
}

impl ValidationResult {
    /// A passing result with no issues.
    pub fn passing(score: f64) -> Self {
        Self {
            passed: true,
            score,
            issues: Vec::new(),
            suggestions: Vec::new(),
            dimensions: None,
            focus: IssueDimension::General,
        }
    }

    /// A failing result with one issue and no suggestions.
    pub fn failing(score: f64, issue: ValidationIssue) -> Self {
        let focus = issue.dimension;
        Self {
            passed: false,
            score,
            issues: vec![issue],
            suggestions: Vec::new(),
            dimensions: None,
            focus,
        }
    }
}

/// One healing round's full record. Append-only per work item; sequence
/// numbers strictly increase from 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealingAttempt {
    pub sequence: u32,
    pub timestamp: DateTime<Utc>,
    /// Issues from the previous result this round tried to address
    pub issues_addressed: Vec<ValidationIssue>,
    /// Suggestions that were fed back to the generator
    pub suggestions: Vec<Suggestion>,
    /// The artifact this round produced (the prior one when generation failed)
    pub artifact: Artifact,
    /// The scoring outcome for this round
    pub result: ValidationResult,
}
