//! Dispatch coordinator.
//!
//! Orchestrates the priority dispatcher and the FEFO allocator against a
//! [`DispatchStore`]. No dispatch structure outlives a call: every
//! operation rebuilds its working set from the current persisted snapshot.
//!
//! # Operations
//!
//! | Operation | Transition | Guard |
//! |-----------|------------|-------|
//! | `enqueue` | → Waiting | priority in range |
//! | `call_next` | Waiting → Claimed | atomic `claim` |
//! | `dispense` | Claimed → Completed | atomic per-item commit |
//!
//! A dispense always completes its request; stock shortfalls become
//! backorders rather than errors. A dispense that fails partway leaves the
//! request claimed; calling it again resumes after the last committed line.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::allocation::FefoAllocator;
use crate::clock::{Clock, SystemClock};
use crate::config::DispatchConfig;
use crate::dispatching::PriorityDispatcher;
use crate::error::{DispatchError, Result};
use crate::models::{
    Backorder, DispenseOutcome, LineItem, RequestId, RequestState, StockLot, WaitingRequest,
};
use crate::store::{CommitStatus, DispatchStore, ItemCommit};
use crate::validation::{validate_line_items, validate_lots};

/// Entry point for enqueue / call-next / dispense.
///
/// Cheap to share: wrap in an `Arc` and call from any number of desk
/// sessions concurrently.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use u_dispense::{DispatchConfig, DispatchCoordinator, InMemoryStore};
/// use u_dispense::models::{LineItem, Priority, StockLot};
///
/// let store = Arc::new(InMemoryStore::new());
/// store.insert_lot(StockLot::new("B-17", "amoxicillin", 30, 1_900_000_000_000));
/// store.set_line_items("RX-1", vec![LineItem::new(0, "amoxicillin", 21)]);
///
/// let coordinator = DispatchCoordinator::new(store, DispatchConfig::default()).unwrap();
/// coordinator.enqueue("RX-1", Priority::High).unwrap();
///
/// let called = coordinator.call_next().unwrap().unwrap();
/// assert_eq!(called.reference_id, "RX-1");
///
/// let outcome = coordinator.dispense("RX-1").unwrap();
/// assert!(outcome.is_full());
/// assert_eq!(outcome.total_dispensed(), 21);
/// ```
pub struct DispatchCoordinator<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: DispatchConfig,
    in_flight: Mutex<HashSet<String>>,
}

/// Marks a reference as being dispensed by this coordinator until dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    reference_id: String,
}

impl<'a> InFlight<'a> {
    fn acquire(set: &'a Mutex<HashSet<String>>, reference_id: &str) -> Option<Self> {
        if !set.lock().insert(reference_id.to_string()) {
            return None;
        }
        Some(Self {
            set,
            reference_id: reference_id.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.reference_id);
    }
}

impl<S: DispatchStore> DispatchCoordinator<S> {
    /// Creates a coordinator using the system clock.
    ///
    /// # Errors
    /// `InvalidConfig` if the configuration has no lanes.
    pub fn new(store: Arc<S>, config: DispatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            clock: Arc::new(SystemClock),
            config,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    /// Replaces the clock used for enqueue timestamps and expiry checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Queues a request for `reference_id` in the given priority lane.
    ///
    /// # Errors
    /// `InvalidPriority` if the class is outside the configured lanes;
    /// nothing is persisted in that case.
    #[tracing::instrument(level = "debug", skip_all, fields(reference_id = %reference_id))]
    pub fn enqueue(
        &self,
        reference_id: &str,
        priority_class: impl Into<usize>,
    ) -> Result<RequestId> {
        let class = priority_class.into();
        let lane_count = self.config.lane_count();
        if class >= lane_count {
            return Err(DispatchError::InvalidPriority { class, lane_count });
        }

        let id = self
            .store
            .insert_waiting(reference_id, class, self.clock.now_ms())?;
        info!(
            request_id = id,
            lane = self.lane_label(class),
            "request enqueued"
        );
        Ok(id)
    }

    /// Claims the most urgent, longest-waiting request.
    ///
    /// Returns `Ok(None)` when nothing is waiting (or every candidate in
    /// the snapshot was claimed by a concurrent caller first).
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn call_next(&self) -> Result<Option<WaitingRequest>> {
        let mut dispatcher = self.load_dispatcher()?;

        while let Some((class, mut request)) = dispatcher.pop_next() {
            if self.store.claim(request.id)? {
                request.state = RequestState::Claimed;
                info!(
                    request_id = request.id,
                    reference_id = %request.reference_id,
                    lane = self.lane_label(class),
                    "request claimed"
                );
                return Ok(Some(request));
            }
            debug!(request_id = request.id, "claim lost to concurrent caller");
        }

        Ok(None)
    }

    /// Dispenses a claimed request and completes it.
    ///
    /// Each line item is allocated FEFO against its current lots and
    /// committed atomically. Shortfalls are recorded as backorders and the
    /// request still completes. Lines committed by an earlier, failed
    /// attempt are reported from their records and never re-allocated.
    ///
    /// When a reference was enqueued more than once, the oldest claimed
    /// request for it is dispensed.
    ///
    /// # Errors
    /// - `NotFound` if no request references `reference_id`
    /// - `NotClaimed` if the request is waiting or already completed
    /// - `DispenseInProgress` if another caller is dispensing it
    /// - `InvalidInput` if the line items are malformed
    /// - `CommitConflict` if an item's lots kept changing during commit
    /// - `Store` on persistence failure
    ///
    /// The first four leave no side effects.
    #[tracing::instrument(level = "debug", skip_all, fields(reference_id = %reference_id))]
    pub fn dispense(&self, reference_id: &str) -> Result<DispenseOutcome> {
        self.claimed_request(reference_id)?;
        let _guard = InFlight::acquire(&self.in_flight, reference_id).ok_or_else(|| {
            DispatchError::DispenseInProgress {
                reference_id: reference_id.to_string(),
            }
        })?;
        // A concurrent dispense may have finished between lookup and guard.
        let request = self.claimed_request(reference_id)?;

        let items = self.store.line_items(reference_id)?;
        validate_line_items(&items).map_err(DispatchError::InvalidInput)?;

        let mut committed: HashMap<usize, ItemCommit> = self
            .store
            .committed_items(request.id)?
            .into_iter()
            .map(|commit| (commit.line_index, commit))
            .collect();

        let mut outcome = DispenseOutcome::new(request.id, reference_id);
        for item in &items {
            // Per-item totals fit in u32; validation rejects anything larger.
            *outcome.requested.entry(item.item_id.clone()).or_insert(0) += item.quantity;

            let commit = match committed.remove(&item.index) {
                Some(commit) => {
                    debug!(
                        line = item.index,
                        item_id = %item.item_id,
                        "line already committed; resuming"
                    );
                    commit
                }
                None => self.dispense_item(request.id, item)?,
            };
            if let Some(backorder) = commit.backorder {
                warn!(
                    item_id = %backorder.item_id,
                    unmet = backorder.quantity_unmet,
                    "stock short; backorder recorded"
                );
                merge_backorder(&mut outcome.backorders, backorder);
            }
            outcome.allocations.extend(commit.allocations);
        }

        if !self.store.complete(request.id)? {
            warn!(
                request_id = request.id,
                "request left claimed state during dispense"
            );
        }
        info!(
            request_id = request.id,
            status = ?outcome.status(),
            dispensed = outcome.total_dispensed(),
            unmet = outcome.total_unmet(),
            "request completed"
        );
        Ok(outcome)
    }

    /// Per-lane ordered view of the waiting requests.
    pub fn snapshot(&self) -> Result<Vec<Vec<WaitingRequest>>> {
        Ok(self.load_dispatcher()?.snapshot())
    }

    /// Number of requests currently waiting.
    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.store.list_waiting()?.len())
    }

    fn claimed_request(&self, reference_id: &str) -> Result<WaitingRequest> {
        if let Some(request) = self.store.find_claimed(reference_id)? {
            return Ok(request);
        }
        match self.store.find_by_reference(reference_id)? {
            Some(request) => Err(DispatchError::NotClaimed {
                reference_id: reference_id.to_string(),
                state: request.state,
            }),
            None => Err(DispatchError::NotFound {
                reference_id: reference_id.to_string(),
            }),
        }
    }

    fn load_dispatcher(&self) -> Result<PriorityDispatcher> {
        let waiting = self.store.list_waiting()?;
        debug!(waiting = waiting.len(), "loaded waiting snapshot");
        PriorityDispatcher::from_waiting(waiting, self.config.lane_count())
    }

    fn allocator(&self) -> FefoAllocator {
        if self.config.skip_expired_lots {
            FefoAllocator::new().with_expiry_cutoff(self.clock.now_ms())
        } else {
            FefoAllocator::new()
        }
    }

    /// Allocates one line item and commits it, re-allocating against
    /// fresh lots when a concurrent dispense got there first.
    fn dispense_item(&self, request_id: RequestId, item: &LineItem) -> Result<ItemCommit> {
        let allocator = self.allocator();
        let attempts = self.config.max_commit_retries + 1;

        for attempt in 1..=attempts {
            let lots: Vec<StockLot> = self
                .store
                .list_lots_for_item(&item.item_id)?
                .into_iter()
                .filter(|lot| !lot.is_depleted())
                .collect();
            validate_lots(&item.item_id, &lots).map_err(DispatchError::InvalidInput)?;

            let allocation = allocator.allocate(&item.item_id, item.quantity, &lots);
            let commit = ItemCommit {
                request_id,
                line_index: item.index,
                item_id: item.item_id.clone(),
                allocations: allocation.allocations.clone(),
                backorder: allocation.backorder(),
            };

            match self.store.commit_item(&commit)? {
                CommitStatus::Committed => {
                    debug!(
                        item_id = %item.item_id,
                        lots = allocation.allocations.len(),
                        fulfilled = allocation.fulfilled(),
                        "item committed"
                    );
                    return Ok(commit);
                }
                CommitStatus::Conflict { lot_id } => {
                    warn!(
                        item_id = %item.item_id,
                        lot_id = %lot_id,
                        attempt,
                        "lot changed during commit; re-allocating"
                    );
                }
            }
        }

        Err(DispatchError::CommitConflict {
            item_id: item.item_id.clone(),
            attempts,
        })
    }

    fn lane_label(&self, class: usize) -> &str {
        self.config.lane_name(class).unwrap_or("unnamed")
    }
}

fn merge_backorder(backorders: &mut Vec<Backorder>, backorder: Backorder) {
    match backorders.iter_mut().find(|b| b.item_id == backorder.item_id) {
        Some(existing) => existing.quantity_unmet += backorder.quantity_unmet,
        None => backorders.push(backorder),
    }
}

impl<S> fmt::Debug for DispatchCoordinator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchCoordinator")
            .field("config", &self.config)
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}
