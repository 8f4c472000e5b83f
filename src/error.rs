//! Error types for the dispatch engine.
//!
//! `DispatchError` covers every failure an operation can surface to a
//! caller. Two outcomes are deliberately *not* errors:
//!
//! - nothing waiting on `call_next` (returned as `Ok(None)`),
//! - insufficient stock on `dispense` (recorded as a backorder).
//!
//! `StoreError` is raised by persistence collaborators and is fatal to the
//! operation that hit it.

use crate::models::RequestState;
use crate::validation::ValidationError;

pub type Result<T> = core::result::Result<T, DispatchError>;

/// Unified error type for dispatch operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    /// Priority class outside `[0, lane_count)`. Never clamped.
    #[error("Invalid priority class {class}: expected 0..{lane_count}")]
    InvalidPriority { class: usize, lane_count: usize },

    /// Dispense attempted on a request that is not currently claimed.
    #[error("Request '{reference_id}' is {state}, not claimed")]
    NotClaimed {
        reference_id: String,
        state: RequestState,
    },

    /// No request references this id.
    #[error("No request found for reference '{reference_id}'")]
    NotFound { reference_id: String },

    /// Another caller is already dispensing this request.
    #[error("Request '{reference_id}' is already being dispensed")]
    DispenseInProgress { reference_id: String },

    /// Lots kept changing underneath an item commit.
    #[error("Commit for item '{item_id}' conflicted {attempts} times")]
    CommitConflict { item_id: String, attempts: usize },

    /// Line items or lots failed structural validation.
    #[error("Invalid input: {0:?}")]
    InvalidInput(Vec<ValidationError>),

    /// Invalid engine configuration.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Persistence collaborator failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised by a [`DispatchStore`](crate::store::DispatchStore).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Storage could not be reached or refused the operation.
    #[error("Storage unavailable: {reason}")]
    Unavailable { reason: String },

    /// A lot id did not resolve.
    #[error("Unknown lot '{0}'")]
    UnknownLot(String),

    /// A request id did not resolve.
    #[error("Unknown request {0}")]
    UnknownRequest(u64),
}
