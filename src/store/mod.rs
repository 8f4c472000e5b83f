//! Persistence collaborator interface.
//!
//! The dispatch core owns no state of its own. Every operation reads a
//! snapshot through [`DispatchStore`] and writes transitions back through
//! it. Two primitives must be atomic for concurrent callers to be safe:
//!
//! - [`claim`](DispatchStore::claim): "Waiting → Claimed iff still Waiting",
//! - [`decrement_lot`](DispatchStore::decrement_lot): "subtract iff
//!   available ≥ quantity".
//!
//! [`commit_item`](DispatchStore::commit_item) bundles the writes for one
//! line item into a single all-or-nothing unit, and applies at most once
//! per `(request, line)` so an interrupted dispense can be resumed.

mod memory;

pub use memory::InMemoryStore;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::{AllocationResult, Backorder, LineItem, RequestId, StockLot, WaitingRequest};

/// Result type for store operations.
pub type StoreResult<T> = core::result::Result<T, StoreError>;

/// Writes for one line item, applied as a single transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCommit {
    /// Request being dispensed.
    pub request_id: RequestId,
    /// Index of the line item within its prescription.
    pub line_index: usize,
    /// Item the writes concern.
    pub item_id: String,
    /// Lot decrements to apply and record.
    pub allocations: Vec<AllocationResult>,
    /// Unmet remainder to record, if any.
    pub backorder: Option<Backorder>,
}

/// Outcome of [`DispatchStore::commit_item`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitStatus {
    /// Every write applied.
    Committed,
    /// A lot no longer had enough stock; nothing was applied.
    Conflict { lot_id: String },
}

/// Storage operations consumed by the dispatch coordinator.
pub trait DispatchStore: Send + Sync {
    /// Persists a new `Waiting` request and returns its id.
    fn insert_waiting(
        &self,
        reference_id: &str,
        priority_class: usize,
        enqueued_at: i64,
    ) -> StoreResult<RequestId>;

    /// All requests currently in `Waiting`.
    fn list_waiting(&self) -> StoreResult<Vec<WaitingRequest>>;

    /// The most recently enqueued request for a reference.
    fn find_by_reference(&self, reference_id: &str) -> StoreResult<Option<WaitingRequest>>;

    /// The oldest `Claimed` request for a reference, if any.
    fn find_claimed(&self, reference_id: &str) -> StoreResult<Option<WaitingRequest>>;

    /// Atomically moves a request Waiting → Claimed.
    ///
    /// Returns `false` if the request is no longer waiting.
    fn claim(&self, request_id: RequestId) -> StoreResult<bool>;

    /// Atomically moves a request Claimed → Completed.
    ///
    /// Returns `false` if the request is not claimed.
    fn complete(&self, request_id: RequestId) -> StoreResult<bool>;

    /// Ordered line items of a prescription.
    fn line_items(&self, reference_id: &str) -> StoreResult<Vec<LineItem>>;

    /// Every lot of an item, depleted ones included.
    fn list_lots_for_item(&self, item_id: &str) -> StoreResult<Vec<StockLot>>;

    /// Atomically subtracts `quantity` from a lot.
    ///
    /// Returns `false` (and changes nothing) if the lot holds less.
    fn decrement_lot(&self, lot_id: &str, quantity: u32) -> StoreResult<bool>;

    /// Appends an allocation record for a request.
    fn record_allocation(
        &self,
        request_id: RequestId,
        allocation: &AllocationResult,
    ) -> StoreResult<()>;

    /// Appends a backorder record for a request.
    fn record_backorder(&self, request_id: RequestId, backorder: &Backorder) -> StoreResult<()>;

    /// Applies every decrement and record of `commit`, or none of them.
    ///
    /// A line that is already committed for the request is left untouched
    /// and reported as `Committed`.
    fn commit_item(&self, commit: &ItemCommit) -> StoreResult<CommitStatus>;

    /// Commits already applied for a request, ordered by line index.
    fn committed_items(&self, request_id: RequestId) -> StoreResult<Vec<ItemCommit>>;
}
