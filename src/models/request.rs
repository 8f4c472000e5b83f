//! Waiting request model.
//!
//! A waiting request is a patient's place in the dispatch queue. It points
//! at the prescription (or bill) being served through `reference_id` and
//! carries a priority class that fixes which lane it waits in.
//!
//! # Lifecycle
//!
//! ```text
//! Waiting ──claim──▶ Claimed ──dispense──▶ Completed
//! ```
//!
//! Transitions are monotonic; a request never returns to an earlier state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage-assigned identifier of a waiting request.
pub type RequestId = u64;

/// Named priority classes for the default four-lane layout.
///
/// Lower class index = more urgent. Deployments with a different lane
/// count address lanes by raw index instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Life-threatening; always served first.
    Emergency,
    /// Urgent but stable.
    High,
    /// Regular walk-in or scheduled pickup.
    Normal,
    /// Refills and other deferrable work.
    Low,
}

impl Priority {
    /// All named priorities, most urgent first.
    pub const ALL: [Priority; 4] = [
        Priority::Emergency,
        Priority::High,
        Priority::Normal,
        Priority::Low,
    ];

    /// Lane index of this priority.
    #[inline]
    pub fn class(self) -> usize {
        self as usize
    }

    /// Resolves a raw lane index to a named priority.
    pub fn from_class(class: usize) -> Option<Self> {
        Self::ALL.get(class).copied()
    }

    /// Lowercase label used in logs and lane names.
    pub fn label(self) -> &'static str {
        match self {
            Priority::Emergency => "emergency",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

impl From<Priority> for usize {
    fn from(p: Priority) -> Self {
        p.class()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle state of a waiting request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestState {
    /// Queued, not yet called.
    Waiting,
    /// Called to a desk; being served.
    Claimed,
    /// Dispensed (fully or with backorders).
    Completed,
}

impl RequestState {
    /// Whether `next` is the single legal successor of this state.
    pub fn can_advance_to(self, next: RequestState) -> bool {
        matches!(
            (self, next),
            (RequestState::Waiting, RequestState::Claimed)
                | (RequestState::Claimed, RequestState::Completed)
        )
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestState::Waiting => "waiting",
            RequestState::Claimed => "claimed",
            RequestState::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// A request waiting for (or receiving) service.
///
/// # Time Representation
/// `enqueued_at` is in milliseconds since the Unix epoch, as produced by
/// the coordinator's [`Clock`](crate::clock::Clock). It defines FIFO order
/// within a priority class and never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingRequest {
    /// Storage-assigned identifier.
    pub id: RequestId,
    /// Identifier of the prescription or bill being served.
    pub reference_id: String,
    /// Lane index (0 = most urgent).
    pub priority_class: usize,
    /// Enqueue timestamp (ms).
    pub enqueued_at: i64,
    /// Current lifecycle state.
    pub state: RequestState,
}

impl WaitingRequest {
    /// Creates a request in the `Waiting` state.
    pub fn new(
        id: RequestId,
        reference_id: impl Into<String>,
        priority_class: usize,
        enqueued_at: i64,
    ) -> Self {
        Self {
            id,
            reference_id: reference_id.into(),
            priority_class,
            enqueued_at,
            state: RequestState::Waiting,
        }
    }

    /// Named priority, if the class falls in the default layout.
    pub fn priority(&self) -> Option<Priority> {
        Priority::from_class(self.priority_class)
    }

    /// Whether the request is still queued.
    #[inline]
    pub fn is_waiting(&self) -> bool {
        self.state == RequestState::Waiting
    }

    /// Whether the request has been called and awaits dispensing.
    #[inline]
    pub fn is_claimed(&self) -> bool {
        self.state == RequestState::Claimed
    }

    /// Dispatch ordering key: class, then arrival, then id.
    #[inline]
    pub fn dispatch_key(&self) -> (usize, i64, RequestId) {
        (self.priority_class, self.enqueued_at, self.id)
    }
}
