//! First-Expiry-First-Out greedy allocator.
//!
//! # Algorithm
//!
//! 1. Drop lots with nothing available (and, with a cutoff, expired lots).
//! 2. Sort the rest by expiry ascending, ties by lot id.
//! 3. Walk the sorted lots, taking `min(remaining, available)` from each.
//! 4. Stop as soon as the demand is met.
//!
//! # Complexity
//! O(n log n) in the number of lots.

use serde::{Deserialize, Serialize};

use crate::models::{AllocationResult, Backorder, StockLot};

/// Result of allocating one demand against a set of lots.
///
/// `Σ quantity_taken + remaining == required` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Item the demand was for.
    pub item_id: String,
    /// Units demanded.
    pub required: u32,
    /// Per-lot takes, in consumption order.
    pub allocations: Vec<AllocationResult>,
    /// Units left unmet (0 if fully satisfied).
    pub remaining: u32,
}

impl Allocation {
    /// Units actually allocated.
    pub fn fulfilled(&self) -> u32 {
        self.required - self.remaining
    }

    /// Whether the demand was fully met.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    /// Backorder for the unmet remainder, if any.
    pub fn backorder(&self) -> Option<Backorder> {
        (self.remaining > 0).then(|| Backorder::new(self.item_id.clone(), self.remaining))
    }
}

/// Greedy FEFO allocator.
///
/// Pure: never mutates the lots it is given. Applying the decrements is
/// the caller's job.
///
/// # Example
///
/// ```
/// use u_dispense::allocation::FefoAllocator;
/// use u_dispense::models::StockLot;
///
/// let lots = vec![
///     StockLot::new("late", "paracetamol", 10, 3_000),
///     StockLot::new("soon", "paracetamol", 4, 1_000),
/// ];
/// let result = FefoAllocator::new().allocate("paracetamol", 6, &lots);
/// assert_eq!(result.allocations[0].lot_id, "soon");
/// assert_eq!(result.allocations[0].quantity_taken, 4);
/// assert_eq!(result.allocations[1].quantity_taken, 2);
/// assert_eq!(result.remaining, 0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FefoAllocator {
    expiry_cutoff: Option<i64>,
}

impl FefoAllocator {
    /// Creates an allocator that accepts lots regardless of expiry.
    pub fn new() -> Self {
        Self {
            expiry_cutoff: None,
        }
    }

    /// Skips lots whose expiry is at or before `now_ms`.
    pub fn with_expiry_cutoff(mut self, now_ms: i64) -> Self {
        self.expiry_cutoff = Some(now_ms);
        self
    }

    /// Allocates `required` units of `item_id` from `lots`.
    ///
    /// Lots belonging to other items are ignored.
    pub fn allocate(&self, item_id: &str, required: u32, lots: &[StockLot]) -> Allocation {
        let mut order: Vec<&StockLot> = lots
            .iter()
            .filter(|lot| lot.item_id == item_id && !lot.is_depleted())
            .filter(|lot| match self.expiry_cutoff {
                Some(now) => !lot.is_expired_at(now),
                None => true,
            })
            .collect();
        order.sort_by(|a, b| a.expiry.cmp(&b.expiry).then_with(|| a.id.cmp(&b.id)));

        let mut remaining = required;
        let mut allocations = Vec::new();

        for lot in order {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(lot.quantity_available);
            if take > 0 {
                allocations.push(AllocationResult::new(&lot.id, &lot.item_id, take));
                remaining -= take;
            }
        }

        Allocation {
            item_id: item_id.to_string(),
            required,
            allocations,
            remaining,
        }
    }
}
