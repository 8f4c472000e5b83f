//! Stock lot and line item models.
//!
//! A lot is a discrete batch of one item with its own expiry and remaining
//! quantity. Line items are the per-item demands of a prescription, kept
//! as an ordered list with a stable index.

use serde::{Deserialize, Serialize};

/// A batch of stock for one item.
///
/// `quantity_available` only ever decreases (through allocation). A lot at
/// zero is inert but retained for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLot {
    /// Unique lot identifier (batch number).
    pub id: String,
    /// Item (medicine) this lot belongs to.
    pub item_id: String,
    /// Units still available.
    pub quantity_available: u32,
    /// Expiry timestamp (ms since Unix epoch).
    pub expiry: i64,
}

impl StockLot {
    /// Creates a new lot.
    pub fn new(
        id: impl Into<String>,
        item_id: impl Into<String>,
        quantity_available: u32,
        expiry: i64,
    ) -> Self {
        Self {
            id: id.into(),
            item_id: item_id.into(),
            quantity_available,
            expiry,
        }
    }

    /// Whether the lot has nothing left to give.
    #[inline]
    pub fn is_depleted(&self) -> bool {
        self.quantity_available == 0
    }

    /// Whether the lot has expired at `now_ms`.
    #[inline]
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expiry <= now_ms
    }
}

/// One ordered demand line of a prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Position within the prescription (0-indexed, stable).
    pub index: usize,
    /// Item (medicine) demanded.
    pub item_id: String,
    /// Units requested.
    pub quantity: u32,
}

impl LineItem {
    /// Creates a new line item.
    pub fn new(index: usize, item_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            index,
            item_id: item_id.into(),
            quantity,
        }
    }
}
