//! Effort estimation and budget allocation.
//!
//! Each item gets an `EffortEstimate` from the pluggable effort capability.
//! The allocator ranks items by ROI-per-hour, spends a total hour ceiling
//! sequentially down the priority order, and rebalances recommended
//! iterations when the ceiling is exceeded. Identical inputs always produce
//! identical plans.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backlog::{Backlog, WorkItem};
use crate::capability::EffortModel;
use crate::errors::ConfigurationError;
use crate::risk::RiskBucket;

/// How involved the work is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityClass {
    Low,
    #[default]
    Medium,
    High,
}

/// Effort profile for one work item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EffortEstimate {
    pub item_id: String,
    /// Estimated hours of work
    pub hours: f64,
    pub complexity: ComplexityClass,
    pub risk: RiskBucket,
    /// Recommended scoring rounds, 1-3
    pub recommended_iterations: u32,
    /// Expected return on investment, 1-10
    pub roi_score: f64,
}

impl EffortEstimate {
    /// ROI per hour, the priority key. Hours below 1 count as 1 so cheap
    /// items cannot dominate through division.
    pub fn roi_per_hour(&self) -> f64 {
        self.roi_score / self.hours.max(1.0)
    }
}

/// Policy knobs for the allocator. The multipliers here are heuristics, not
/// business requirements, so they live in configuration.
#[derive(Debug, Clone)]
pub struct AllocatorConfig {
    /// Iterations are never rebalanced below this
    pub iteration_floor: u32,
    /// Fraction of an item's base hours each extra iteration is assumed to
    /// cost
    pub rework_factor: f64,
    /// Iterations assumed when the effort capability fails
    pub fallback_iterations: u32,
    /// ROI assumed when the effort capability fails
    pub fallback_roi: f64,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            iteration_floor: 1,
            rework_factor: 0.5,
            fallback_iterations: 2,
            fallback_roi: 5.0,
        }
    }
}

/// One item's share of the budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemAllocation {
    pub item_id: String,
    /// 0-based priority rank (0 = highest ROI per hour)
    pub priority: usize,
    pub estimate: EffortEstimate,
    /// Hours this item consumes, including assumed rework rounds
    pub allocated_hours: f64,
    /// Iterations after any rebalancing
    pub iterations: u32,
    /// Whether the ceiling still covered this item when it was reached
    pub funded: bool,
}

/// The full allocation outcome, in priority order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub allocations: Vec<ItemAllocation>,
    /// Signed remaining hours; negative when the ceiling was exceeded
    pub remaining_hours: f64,
}

impl AllocationPlan {
    /// Look up an allocation by item id.
    pub fn get(&self, item_id: &str) -> Option<&ItemAllocation> {
        self.allocations.iter().find(|a| a.item_id == item_id)
    }

    /// Write the estimated hours back onto the backlog items. The
    /// estimator is the only component allowed to mutate item effort.
    pub fn apply_estimates(&self, backlog: &mut Backlog) {
        for alloc in &self.allocations {
            backlog.set_estimated_hours(&alloc.item_id, alloc.estimate.hours);
        }
    }
}

/// Priority-ordered budget allocator over a pluggable effort capability.
#[derive(Clone)]
pub struct BudgetAllocator {
    model: Arc<dyn EffortModel>,
    config: AllocatorConfig,
}

impl BudgetAllocator {
    pub fn new(model: Arc<dyn EffortModel>) -> Self {
        Self {
            model,
            config: AllocatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AllocatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Estimate one item, falling back to a neutral default if the
    /// capability fails. Estimation is advisory and never blocks.
    pub async fn estimate_item(&self, item: &WorkItem) -> EffortEstimate {
        match self.model.estimate(item).await {
            Ok(estimate) => clamp_estimate(estimate),
            Err(e) => {
                warn!(item = %item.id, error = %e, "effort capability failed, using fallback estimate");
                self.fallback_estimate(item)
            }
        }
    }

    fn fallback_estimate(&self, item: &WorkItem) -> EffortEstimate {
        EffortEstimate {
            item_id: item.id.clone(),
            hours: if item.estimated_hours > 0.0 {
                item.estimated_hours
            } else {
                1.0
            },
            complexity: ComplexityClass::Medium,
            risk: RiskBucket::Medium,
            recommended_iterations: self.config.fallback_iterations,
            roi_score: self.config.fallback_roi,
        }
    }

    /// Allocate a total hour ceiling across the items.
    ///
    /// Items are ranked by ROI-per-hour descending (ties by original
    /// order), then funded sequentially. Once the ceiling is exceeded,
    /// later items still receive their nominal allocation; the plan's
    /// remaining budget goes negative. A negative remainder triggers
    /// rebalancing: the lowest-priority items drop to the iteration floor
    /// first, recovering their assumed rework hours, until the budget is
    /// covered or every item sits at the floor.
    pub async fn allocate(
        &self,
        items: &[WorkItem],
        total_hours: f64,
    ) -> Result<AllocationPlan, ConfigurationError> {
        if !total_hours.is_finite() || total_hours < 0.0 {
            return Err(ConfigurationError::InvalidBudget {
                hours: total_hours,
                message: "ceiling must be a non-negative finite number".to_string(),
            });
        }

        let mut estimates = Vec::with_capacity(items.len());
        for item in items {
            estimates.push(self.estimate_item(item).await);
        }

        // Priority order: ROI/hour descending, original order on ties.
        let mut by_priority: Vec<usize> = (0..estimates.len()).collect();
        by_priority.sort_by(|&a, &b| {
            estimates[b]
                .roi_per_hour()
                .partial_cmp(&estimates[a].roi_per_hour())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        let mut remaining = total_hours;
        let mut allocations: Vec<ItemAllocation> = Vec::with_capacity(estimates.len());

        for (rank, &idx) in by_priority.iter().enumerate() {
            let estimate = estimates[idx].clone();
            let iterations = estimate.recommended_iterations;
            let cost = allocation_cost(&estimate, iterations, self.config.rework_factor);
            remaining -= cost;

            allocations.push(ItemAllocation {
                item_id: estimate.item_id.clone(),
                priority: rank,
                estimate,
                allocated_hours: cost,
                iterations,
                funded: remaining >= 0.0,
            });
        }

        if remaining < 0.0 {
            self.rebalance(&mut allocations, &mut remaining);
        }

        Ok(AllocationPlan {
            allocations,
            remaining_hours: remaining,
        })
    }

    /// Drop iterations to the floor starting from the lowest priority.
    fn rebalance(&self, allocations: &mut [ItemAllocation], remaining: &mut f64) {
        let floor = self.config.iteration_floor.max(1);

        for alloc in allocations.iter_mut().rev() {
            if *remaining >= 0.0 {
                break;
            }
            if alloc.iterations <= floor {
                continue;
            }
            let reduced =
                allocation_cost(&alloc.estimate, floor, self.config.rework_factor);
            let recovered = alloc.allocated_hours - reduced;
            alloc.iterations = floor;
            alloc.allocated_hours = reduced;
            *remaining += recovered;
        }
    }
}

/// Hours an item consumes: base hours for the first round plus a rework
/// share per extra iteration.
fn allocation_cost(estimate: &EffortEstimate, iterations: u32, rework_factor: f64) -> f64 {
    let extra = iterations.saturating_sub(1) as f64;
    estimate.hours + extra * estimate.hours * rework_factor
}

/// Clamp provider output into the documented ranges.
fn clamp_estimate(mut estimate: EffortEstimate) -> EffortEstimate {
    estimate.hours = estimate.hours.max(0.0);
    estimate.recommended_iterations = estimate.recommended_iterations.clamp(1, 3);
    estimate.roi_score = estimate.roi_score.clamp(1.0, 10.0);
    estimate
}
