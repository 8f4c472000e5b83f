//! Pharmacy dispatch engine for the U-Engine ecosystem.
//!
//! Decides which waiting patient request is served next and how stock
//! lots are consumed to fill it.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `WaitingRequest`, `Priority`, `StockLot`,
//!   `LineItem`, `AllocationResult`, `Backorder`, `DispenseOutcome`
//! - **`dispatching`**: `PriorityLane` and `PriorityDispatcher` (strict
//!   priority across lanes, FIFO within a lane)
//! - **`allocation`**: `FefoAllocator` (first-expiry-first-out greedy fill)
//! - **`store`**: `DispatchStore` persistence trait and `InMemoryStore`
//! - **`coordinator`**: `DispatchCoordinator` (enqueue / call next / dispense)
//! - **`validation`**: Input integrity checks (duplicate lines, zero quantities,
//!   misfiled lots)
//! - **`kpi`**: Fill-rate and backorder metrics
//!
//! # Architecture
//!
//! The engine keeps no dispatch state between calls. Every operation
//! rebuilds its working set from a store snapshot, and correctness under
//! concurrent callers rests on two atomic store primitives: conditional
//! claim and conditional lot decrement.
//!
//! Logging goes through `tracing`; the crate never installs a subscriber.

pub mod allocation;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod dispatching;
pub mod error;
pub mod kpi;
pub mod models;
pub mod store;
pub mod validation;

pub use config::DispatchConfig;
pub use coordinator::DispatchCoordinator;
pub use error::{DispatchError, Result, StoreError};
pub use store::{DispatchStore, InMemoryStore};
