//! Dispense outcome model.
//!
//! An outcome records how a claimed request's demand was met: the
//! lot-level allocations taken and the backorders left for unmet
//! quantity. A backorder is a degraded result, not an error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::RequestId;

/// Quantity taken from one lot for one demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResult {
    /// Lot the quantity was taken from.
    pub lot_id: String,
    /// Item of that lot (denormalized for query convenience).
    pub item_id: String,
    /// Units taken (always > 0).
    pub quantity_taken: u32,
}

impl AllocationResult {
    /// Creates a new allocation record.
    pub fn new(lot_id: impl Into<String>, item_id: impl Into<String>, quantity_taken: u32) -> Self {
        Self {
            lot_id: lot_id.into(),
            item_id: item_id.into(),
            quantity_taken,
        }
    }
}

/// Unmet demand for one item after exhausting available lots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backorder {
    /// Item that ran short.
    pub item_id: String,
    /// Units that could not be supplied (always > 0).
    pub quantity_unmet: u32,
}

impl Backorder {
    /// Creates a new backorder record.
    pub fn new(item_id: impl Into<String>, quantity_unmet: u32) -> Self {
        Self {
            item_id: item_id.into(),
            quantity_unmet,
        }
    }
}

/// Whether a dispense met its full demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentStatus {
    /// Every line item fully supplied.
    Full,
    /// At least one line item left a backorder.
    Partial,
}

/// Result of dispensing one claimed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispenseOutcome {
    /// Request that was completed.
    pub request_id: RequestId,
    /// Prescription or bill it referenced.
    pub reference_id: String,
    /// Lot-level allocations, in line-item then FEFO order.
    pub allocations: Vec<AllocationResult>,
    /// Unmet demand per item.
    pub backorders: Vec<Backorder>,
    /// Units requested per item, summed over line items.
    pub requested: HashMap<String, u32>,
}

impl DispenseOutcome {
    /// Creates an empty outcome.
    pub fn new(request_id: RequestId, reference_id: impl Into<String>) -> Self {
        Self {
            request_id,
            reference_id: reference_id.into(),
            allocations: Vec::new(),
            backorders: Vec::new(),
            requested: HashMap::new(),
        }
    }

    /// Fulfillment status derived from the backorders.
    pub fn status(&self) -> FulfillmentStatus {
        if self.backorders.is_empty() {
            FulfillmentStatus::Full
        } else {
            FulfillmentStatus::Partial
        }
    }

    /// Whether every line item was fully supplied.
    pub fn is_full(&self) -> bool {
        self.status() == FulfillmentStatus::Full
    }

    /// Total units dispensed across all allocations.
    pub fn total_dispensed(&self) -> u64 {
        self.allocations
            .iter()
            .map(|a| u64::from(a.quantity_taken))
            .sum()
    }

    /// Total units left unmet.
    pub fn total_unmet(&self) -> u64 {
        self.backorders
            .iter()
            .map(|b| u64::from(b.quantity_unmet))
            .sum()
    }

    /// Total units requested.
    pub fn total_requested(&self) -> u64 {
        self.requested.values().map(|&q| u64::from(q)).sum()
    }

    /// Allocations for a given item.
    pub fn allocations_for_item(&self, item_id: &str) -> Vec<&AllocationResult> {
        self.allocations
            .iter()
            .filter(|a| a.item_id == item_id)
            .collect()
    }

    /// Units dispensed for a given item.
    pub fn dispensed_for_item(&self, item_id: &str) -> u32 {
        self.allocations_for_item(item_id)
            .iter()
            .map(|a| a.quantity_taken)
            .sum()
    }

    /// Backorder for a given item, if one was recorded.
    pub fn backorder_for_item(&self, item_id: &str) -> Option<&Backorder> {
        self.backorders.iter().find(|b| b.item_id == item_id)
    }
}
