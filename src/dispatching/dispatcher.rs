//! Strict-priority dispatcher over a fixed set of lanes.
//!
//! # Selection
//!
//! `pop_next` scans lanes from index 0 upward and takes the head of the
//! first non-empty lane. Repeated pops therefore yield a strict total
//! order: priority class ascending, then push order within a class.
//!
//! # Complexity
//! O(K) per pop where K is the lane count; O(1) per push.

use super::PriorityLane;
use crate::error::{DispatchError, Result};
use crate::models::WaitingRequest;

/// Default lane count: Emergency, High, Normal, Low.
pub const DEFAULT_LANE_COUNT: usize = 4;

/// Dispatcher holding one FIFO lane per priority class.
///
/// Built fresh for every selection from a persisted snapshot; it holds no
/// state across operations.
#[derive(Debug, Clone)]
pub struct PriorityDispatcher<T = WaitingRequest> {
    lanes: Vec<PriorityLane<T>>,
}

impl<T> PriorityDispatcher<T> {
    /// Creates a dispatcher with `lane_count` empty lanes.
    pub fn new(lane_count: usize) -> Self {
        Self {
            lanes: (0..lane_count).map(|_| PriorityLane::new()).collect(),
        }
    }

    /// Number of lanes (K).
    #[inline]
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Appends `entry` to the lane for `priority_class`.
    ///
    /// # Errors
    /// `InvalidPriority` if `priority_class` is not in `[0, K)`.
    pub fn push(&mut self, priority_class: usize, entry: T) -> Result<()> {
        let lane_count = self.lanes.len();
        let lane = self
            .lanes
            .get_mut(priority_class)
            .ok_or(DispatchError::InvalidPriority {
                class: priority_class,
                lane_count,
            })?;
        lane.push(entry);
        Ok(())
    }

    /// Removes the most urgent, earliest entry.
    ///
    /// Returns `None` when every lane is empty.
    pub fn pop_next(&mut self) -> Option<(usize, T)> {
        self.lanes
            .iter_mut()
            .enumerate()
            .find_map(|(class, lane)| lane.pop().map(|entry| (class, entry)))
    }

    /// Returns the entry `pop_next` would return, without removing it.
    pub fn peek_next(&self) -> Option<(usize, &T)> {
        self.lanes
            .iter()
            .enumerate()
            .find_map(|(class, lane)| lane.peek().map(|entry| (class, entry)))
    }

    /// Borrows the lane for a class.
    pub fn lane(&self, priority_class: usize) -> Option<&PriorityLane<T>> {
        self.lanes.get(priority_class)
    }

    /// Total entries across all lanes.
    pub fn len(&self) -> usize {
        self.lanes.iter().map(PriorityLane::len).sum()
    }

    /// Whether every lane is empty.
    pub fn is_empty(&self) -> bool {
        self.lanes.iter().all(PriorityLane::is_empty)
    }
}

impl<T: Clone> PriorityDispatcher<T> {
    /// Per-lane ordered contents, for read-only status views.
    pub fn snapshot(&self) -> Vec<Vec<T>> {
        self.lanes
            .iter()
            .map(|lane| lane.iter().cloned().collect())
            .collect()
    }
}

impl PriorityDispatcher<WaitingRequest> {
    /// Rebuilds a dispatcher from persisted waiting requests.
    ///
    /// Requests are pushed in `(priority_class, enqueued_at, id)` order so
    /// that lane order matches arrival order regardless of how storage
    /// returned them.
    ///
    /// # Errors
    /// `InvalidPriority` if any stored request falls outside the lanes.
    pub fn from_waiting(mut requests: Vec<WaitingRequest>, lane_count: usize) -> Result<Self> {
        requests.sort_by_key(WaitingRequest::dispatch_key);
        let mut dispatcher = Self::new(lane_count);
        for request in requests {
            dispatcher.push(request.priority_class, request)?;
        }
        Ok(dispatcher)
    }
}

impl<T> Default for PriorityDispatcher<T> {
    fn default() -> Self {
        Self::new(DEFAULT_LANE_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn req(id: u64, class: usize, at: i64) -> WaitingRequest {
        WaitingRequest::new(id, format!("RX-{id}"), class, at)
    }

    fn drain<T>(d: &mut PriorityDispatcher<T>) -> Vec<(usize, T)> {
        std::iter::from_fn(|| d.pop_next()).collect()
    }

    #[test]
    fn test_class_before_fifo() {
        let mut d = PriorityDispatcher::default();
        d.push(Priority::Low.class(), "low-1").unwrap();
        d.push(Priority::Normal.class(), "normal-1").unwrap();
        d.push(Priority::Emergency.class(), "emergency-1").unwrap();
        d.push(Priority::Normal.class(), "normal-2").unwrap();
        d.push(Priority::Emergency.class(), "emergency-2").unwrap();

        let order: Vec<_> = drain(&mut d).into_iter().map(|(_, v)| v).collect();
        assert_eq!(
            order,
            vec!["emergency-1", "emergency-2", "normal-1", "normal-2", "low-1"]
        );
    }

    #[test]
    fn test_invalid_priority_rejected() {
        let mut d: PriorityDispatcher<&str> = PriorityDispatcher::new(4);
        let err = d.push(4, "x").unwrap_err();
        assert_eq!(
            err,
            DispatchError::InvalidPriority {
                class: 4,
                lane_count: 4
            }
        );
        assert!(d.is_empty());
    }

    #[test]
    fn test_empty_pop_is_idempotent() {
        let mut d: PriorityDispatcher<u32> = PriorityDispatcher::default();
        assert!(d.pop_next().is_none());
        assert!(d.pop_next().is_none());
        assert_eq!(d.len(), 0);
        assert_eq!(d.lane_count(), DEFAULT_LANE_COUNT);
    }

    #[test]
    fn test_snapshot_is_read_only() {
        let mut d = PriorityDispatcher::new(3);
        d.push(2, 'c').unwrap();
        d.push(0, 'a').unwrap();
        d.push(2, 'd').unwrap();

        let snap = d.snapshot();
        assert_eq!(snap, vec![vec!['a'], vec![], vec!['c', 'd']]);
        assert_eq!(d.len(), 3);
        assert_eq!(d.peek_next(), Some((0, &'a')));
    }

    #[test]
    fn test_from_waiting_orders_by_arrival() {
        // Storage returned rows out of order.
        let rows = vec![
            req(3, 1, 300),
            req(1, 1, 100),
            req(5, 0, 500),
            req(2, 1, 100), // same timestamp as 1, higher id
        ];
        let mut d = PriorityDispatcher::from_waiting(rows, 4).unwrap();
        let ids: Vec<_> = drain(&mut d).into_iter().map(|(_, r)| r.id).collect();
        assert_eq!(ids, vec![5, 1, 2, 3]);
    }

    #[test]
    fn test_from_waiting_rejects_out_of_range() {
        let rows = vec![req(1, 9, 0)];
        assert!(matches!(
            PriorityDispatcher::from_waiting(rows, 4),
            Err(DispatchError::InvalidPriority { class: 9, .. })
        ));
    }

    #[test]
    fn test_interleaved_pushes_seeded() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut d = PriorityDispatcher::default();
        for seq in 0..200u32 {
            let class = rng.random_range(0..DEFAULT_LANE_COUNT);
            d.push(class, (class, seq)).unwrap();
        }

        let popped: Vec<_> = drain(&mut d).into_iter().map(|(_, v)| v).collect();
        assert_eq!(popped.len(), 200);
        for pair in popped.windows(2) {
            assert!(pair[0] < pair[1], "out of order: {:?}", pair);
        }
    }

    proptest! {
        #[test]
        fn prop_pop_order_is_class_then_push(classes in prop::collection::vec(0usize..4, 0..64)) {
            let mut d = PriorityDispatcher::default();
            for (seq, &class) in classes.iter().enumerate() {
                d.push(class, seq).unwrap();
            }

            let mut expected: Vec<(usize, usize)> =
                classes.iter().copied().enumerate().map(|(s, c)| (c, s)).collect();
            expected.sort();

            let got = drain(&mut d);
            prop_assert_eq!(got, expected);
        }
    }
}
