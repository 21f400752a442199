//! Bountyd - DAO Bounty Lifecycle Engine
//!
//! Coordinates three sources of truth that can never be updated
//! atomically together:
//! - the off-chain workflow record (open -> claimed -> submitted ->
//!   approved -> paid),
//! - the on-chain escrow account holding the reward,
//! - the on-chain governance proposal deciding DAO treasury funding.
//!
//! Key principles:
//! - one transition function owns every state-machine invariant,
//! - the on-chain call always precedes the local write,
//! - every local write is a CAS against the state the operation read,
//! - funds that moved on chain are never silently forgotten
//!   (ConsistencyError carries the escrow address and signature).

pub mod error;
pub mod escrow;
pub mod governance;
pub mod lockout;
pub mod notify;
pub mod store;
pub mod types;
pub mod workflow;
