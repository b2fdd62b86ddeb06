//! In-memory leased file-lock registry (component B).
//!
//! Single-mutex, process-local registry of exclusive (and, optionally,
//! shared) leases keyed by path pattern. No persistence: durability
//! comes from the workflow runtime layered above this registry, not
//! from the registry itself.

pub mod pattern;
pub mod registry;

pub use pattern::patterns_overlap;
pub use registry::{AcquireOutcome, AcquireRequest, BatchAcquireError, LockEntry, LockError, LockRegistry};
