//! Expiry-aware stock allocation.
//!
//! Provides the FEFO (first-expiry-first-out) greedy allocator. It is not
//! globally optimal for waste minimization, but it is the standard
//! dispensing rotation and it is deterministic.

mod fefo;

pub use fefo::{Allocation, FefoAllocator};
