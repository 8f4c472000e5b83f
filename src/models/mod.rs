//! Dispatch domain models.
//!
//! Provides the core data types shared by the dispatcher, the allocator
//! and the persistence layer.
//!
//! # Domain Mappings
//!
//! | u-dispense | Retail pharmacy | Hospital pharmacy |
//! |------------|-----------------|-------------------|
//! | WaitingRequest | Queue ticket | Ward order |
//! | LineItem | Prescription line | Medication order line |
//! | StockLot | Shelf batch | Store-room batch |
//! | Backorder | Owed balance | Pending supply |

mod lot;
mod outcome;
mod request;

pub use lot::{LineItem, StockLot};
pub use outcome::{AllocationResult, Backorder, DispenseOutcome, FulfillmentStatus};
pub use request::{Priority, RequestId, RequestState, WaitingRequest};
