//! Dispensing quality metrics (KPIs).
//!
//! Summarizes a batch of dispense outcomes.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Fill Rate | Units dispensed / units requested |
//! | Order Fill Rate | Fully supplied outcomes / all outcomes |
//! | Total Unmet | Sum of backorder quantities |
//! | Lots Touched | Distinct lots drawn from |

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::DispenseOutcome;

/// Dispensing performance indicators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispenseKpi {
    /// Units requested across all outcomes.
    pub total_requested: u64,
    /// Units dispensed across all outcomes.
    pub total_dispensed: u64,
    /// Units backordered across all outcomes.
    pub total_unmet: u64,
    /// Unit fill rate (0.0..1.0).
    pub fill_rate: f64,
    /// Outcomes with no backorder.
    pub full_count: usize,
    /// Outcomes with at least one backorder.
    pub partial_count: usize,
    /// Fraction of outcomes fully supplied (0.0..1.0).
    pub order_fill_rate: f64,
    /// Distinct lots drawn from.
    pub lots_touched: usize,
    /// Backordered units per item.
    pub unmet_by_item: HashMap<String, u64>,
}

impl DispenseKpi {
    /// Computes KPIs from a batch of outcomes.
    pub fn calculate(outcomes: &[DispenseOutcome]) -> Self {
        let mut total_requested: u64 = 0;
        let mut total_dispensed: u64 = 0;
        let mut total_unmet: u64 = 0;
        let mut full_count: usize = 0;
        let mut lots: HashSet<&str> = HashSet::new();
        let mut unmet_by_item: HashMap<String, u64> = HashMap::new();

        for outcome in outcomes {
            total_requested += outcome.total_requested();
            total_dispensed += outcome.total_dispensed();
            total_unmet += outcome.total_unmet();

            if outcome.is_full() {
                full_count += 1;
            }
            for a in &outcome.allocations {
                lots.insert(a.lot_id.as_str());
            }
            for b in &outcome.backorders {
                *unmet_by_item.entry(b.item_id.clone()).or_insert(0) += u64::from(b.quantity_unmet);
            }
        }

        // Nothing requested → nothing missed
        let fill_rate = if total_requested == 0 {
            1.0
        } else {
            total_dispensed as f64 / total_requested as f64
        };

        let order_fill_rate = if outcomes.is_empty() {
            1.0
        } else {
            full_count as f64 / outcomes.len() as f64
        };

        Self {
            total_requested,
            total_dispensed,
            total_unmet,
            fill_rate,
            full_count,
            partial_count: outcomes.len() - full_count,
            order_fill_rate,
            lots_touched: lots.len(),
            unmet_by_item,
        }
    }

    /// Whether the batch meets a minimum unit fill rate.
    pub fn meets_fill_rate(&self, min_fill_rate: f64) -> bool {
        self.fill_rate >= min_fill_rate
    }
}
