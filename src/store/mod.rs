//! Datastore contract and reference implementation.
//!
//! No persistence engine is mandated; these traits are the contract any
//! backend must uphold. The one hard requirement is the conditional
//! update: every mutation is keyed on the expected prior state and fails
//! with `StoreError::Conflict` on mismatch, so racing resolutions surface
//! as state conflicts instead of silently clobbering each other.

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{BountyStore, ProposalStore, StoreError, StoreResult};
