//! Thread-safe in-memory store.
//!
//! All state sits behind one `parking_lot::Mutex`; every trait method runs
//! as a single critical section, which makes each primitive atomic with
//! respect to concurrent callers.
//!
//! The store also owns the item → lot lookup cache. The cache is filled
//! lazily by `list_lots_for_item` and dropped explicitly whenever lots for
//! an item are added or re-filed (`insert_lot`) or on request (`invalidate_item`,
//! `invalidate_all`).

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

use super::{CommitStatus, DispatchStore, ItemCommit, StoreResult};
use crate::error::StoreError;
use crate::models::{
    AllocationResult, Backorder, LineItem, RequestId, RequestState, StockLot, WaitingRequest,
};

#[derive(Debug, Default)]
struct State {
    next_id: RequestId,
    requests: BTreeMap<RequestId, WaitingRequest>,
    by_reference: HashMap<String, Vec<RequestId>>,
    line_items: HashMap<String, Vec<LineItem>>,
    lots: BTreeMap<String, StockLot>,
    lots_by_item: HashMap<String, Vec<String>>,
    allocations: Vec<(RequestId, AllocationResult)>,
    backorders: Vec<(RequestId, Backorder)>,
    commits: BTreeMap<(RequestId, usize), ItemCommit>,
    unavailable: Option<String>,
}

impl State {
    fn check_available(&self) -> StoreResult<()> {
        match &self.unavailable {
            Some(reason) => Err(StoreError::Unavailable {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn advance(&mut self, request_id: RequestId, next: RequestState) -> StoreResult<bool> {
        let request = self
            .requests
            .get_mut(&request_id)
            .ok_or(StoreError::UnknownRequest(request_id))?;
        if !request.state.can_advance_to(next) {
            return Ok(false);
        }
        request.state = next;
        Ok(true)
    }

    fn lot_ids_for_item(&mut self, item_id: &str) -> Vec<String> {
        if let Some(ids) = self.lots_by_item.get(item_id) {
            return ids.clone();
        }
        let ids: Vec<String> = self
            .lots
            .values()
            .filter(|lot| lot.item_id == item_id)
            .map(|lot| lot.id.clone())
            .collect();
        self.lots_by_item.insert(item_id.to_string(), ids.clone());
        ids
    }

    fn can_take(&self, lot_id: &str, quantity: u32) -> StoreResult<bool> {
        let lot = self
            .lots
            .get(lot_id)
            .ok_or_else(|| StoreError::UnknownLot(lot_id.to_string()))?;
        Ok(lot.quantity_available >= quantity)
    }

    fn take(&mut self, lot_id: &str, quantity: u32) -> StoreResult<bool> {
        if !self.can_take(lot_id, quantity)? {
            return Ok(false);
        }
        if let Some(lot) = self.lots.get_mut(lot_id) {
            lot.quantity_available -= quantity;
        }
        Ok(true)
    }
}

/// In-memory [`DispatchStore`] suitable for a single-process deployment
/// and for tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a lot and drops the cached lot list of its item.
    ///
    /// A replaced lot filed under another item drops that item's list too.
    pub fn insert_lot(&self, lot: StockLot) {
        let mut state = self.state.lock();
        state.lots_by_item.remove(&lot.item_id);
        if let Some(previous) = state.lots.insert(lot.id.clone(), lot) {
            state.lots_by_item.remove(&previous.item_id);
        }
    }

    /// Sets the ordered line items of a prescription.
    pub fn set_line_items(&self, reference_id: impl Into<String>, items: Vec<LineItem>) {
        self.state.lock().line_items.insert(reference_id.into(), items);
    }

    /// Drops the cached lot list for one item.
    pub fn invalidate_item(&self, item_id: &str) {
        self.state.lock().lots_by_item.remove(item_id);
    }

    /// Drops every cached lot list.
    pub fn invalidate_all(&self) {
        self.state.lock().lots_by_item.clear();
    }

    /// Simulates storage going away (`Some(reason)`) or coming back (`None`).
    pub fn set_unavailable(&self, reason: Option<&str>) {
        self.state.lock().unavailable = reason.map(str::to_string);
    }

    /// Current copy of a lot.
    pub fn lot(&self, lot_id: &str) -> Option<StockLot> {
        self.state.lock().lots.get(lot_id).cloned()
    }

    /// Current copy of a request.
    pub fn request(&self, request_id: RequestId) -> Option<WaitingRequest> {
        self.state.lock().requests.get(&request_id).cloned()
    }

    /// Allocation records written for a request.
    pub fn allocations_for(&self, request_id: RequestId) -> Vec<AllocationResult> {
        self.state
            .lock()
            .allocations
            .iter()
            .filter(|(id, _)| *id == request_id)
            .map(|(_, a)| a.clone())
            .collect()
    }

    /// Backorder records written for a request.
    pub fn backorders_for(&self, request_id: RequestId) -> Vec<Backorder> {
        self.state
            .lock()
            .backorders
            .iter()
            .filter(|(id, _)| *id == request_id)
            .map(|(_, b)| b.clone())
            .collect()
    }

    /// Number of requests in a given state.
    pub fn count_in_state(&self, state: RequestState) -> usize {
        self.state
            .lock()
            .requests
            .values()
            .filter(|r| r.state == state)
            .count()
    }
}

impl DispatchStore for InMemoryStore {
    fn insert_waiting(
        &self,
        reference_id: &str,
        priority_class: usize,
        enqueued_at: i64,
    ) -> StoreResult<RequestId> {
        let mut state = self.state.lock();
        state.check_available()?;
        state.next_id += 1;
        let id = state.next_id;
        state.requests.insert(
            id,
            WaitingRequest::new(id, reference_id, priority_class, enqueued_at),
        );
        state
            .by_reference
            .entry(reference_id.to_string())
            .or_default()
            .push(id);
        Ok(id)
    }

    fn list_waiting(&self) -> StoreResult<Vec<WaitingRequest>> {
        let state = self.state.lock();
        state.check_available()?;
        Ok(state
            .requests
            .values()
            .filter(|r| r.is_waiting())
            .cloned()
            .collect())
    }

    fn find_by_reference(&self, reference_id: &str) -> StoreResult<Option<WaitingRequest>> {
        let state = self.state.lock();
        state.check_available()?;
        Ok(state
            .by_reference
            .get(reference_id)
            .and_then(|ids| ids.last())
            .and_then(|id| state.requests.get(id))
            .cloned())
    }

    fn find_claimed(&self, reference_id: &str) -> StoreResult<Option<WaitingRequest>> {
        let state = self.state.lock();
        state.check_available()?;
        Ok(state
            .by_reference
            .get(reference_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.requests.get(id))
            .find(|r| r.is_claimed())
            .cloned())
    }

    fn claim(&self, request_id: RequestId) -> StoreResult<bool> {
        let mut state = self.state.lock();
        state.check_available()?;
        state.advance(request_id, RequestState::Claimed)
    }

    fn complete(&self, request_id: RequestId) -> StoreResult<bool> {
        let mut state = self.state.lock();
        state.check_available()?;
        state.advance(request_id, RequestState::Completed)
    }

    fn line_items(&self, reference_id: &str) -> StoreResult<Vec<LineItem>> {
        let state = self.state.lock();
        state.check_available()?;
        let mut items = state
            .line_items
            .get(reference_id)
            .cloned()
            .unwrap_or_default();
        items.sort_by_key(|li| li.index);
        Ok(items)
    }

    fn list_lots_for_item(&self, item_id: &str) -> StoreResult<Vec<StockLot>> {
        let mut state = self.state.lock();
        state.check_available()?;
        let ids = state.lot_ids_for_item(item_id);
        Ok(ids
            .iter()
            .filter_map(|id| state.lots.get(id))
            .cloned()
            .collect())
    }

    fn decrement_lot(&self, lot_id: &str, quantity: u32) -> StoreResult<bool> {
        let mut state = self.state.lock();
        state.check_available()?;
        state.take(lot_id, quantity)
    }

    fn record_allocation(
        &self,
        request_id: RequestId,
        allocation: &AllocationResult,
    ) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.check_available()?;
        state.allocations.push((request_id, allocation.clone()));
        Ok(())
    }

    fn record_backorder(&self, request_id: RequestId, backorder: &Backorder) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.check_available()?;
        state.backorders.push((request_id, backorder.clone()));
        Ok(())
    }

    fn commit_item(&self, commit: &ItemCommit) -> StoreResult<CommitStatus> {
        let mut state = self.state.lock();
        state.check_available()?;

        let key = (commit.request_id, commit.line_index);
        if state.commits.contains_key(&key) {
            return Ok(CommitStatus::Committed);
        }

        // Validate every decrement before touching anything. Takes against
        // the same lot are summed so a split allocation cannot overdraw it.
        let mut needed: BTreeMap<&str, u32> = BTreeMap::new();
        for a in &commit.allocations {
            *needed.entry(a.lot_id.as_str()).or_insert(0) += a.quantity_taken;
        }
        for (&lot_id, &quantity) in &needed {
            if !state.can_take(lot_id, quantity)? {
                return Ok(CommitStatus::Conflict {
                    lot_id: lot_id.to_string(),
                });
            }
        }

        for (&lot_id, &quantity) in &needed {
            state.take(lot_id, quantity)?;
        }
        for a in &commit.allocations {
            state.allocations.push((commit.request_id, a.clone()));
        }
        if let Some(b) = &commit.backorder {
            state.backorders.push((commit.request_id, b.clone()));
        }
        state.commits.insert(key, commit.clone());
        Ok(CommitStatus::Committed)
    }

    fn committed_items(&self, request_id: RequestId) -> StoreResult<Vec<ItemCommit>> {
        let state = self.state.lock();
        state.check_available()?;
        Ok(state
            .commits
            .range((request_id, 0)..=(request_id, usize::MAX))
            .map(|(_, commit)| commit.clone())
            .collect())
    }
}
