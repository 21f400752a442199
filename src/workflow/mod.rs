//! Bounty Workflow Engine.
//!
//! Owns the off-chain status state machine and the authorization check
//! for every transition, and orchestrates the escrow module and the
//! governance bridge. All invariants live in one transition function
//! ([`state::transition`]) instead of being scattered across call sites.

pub mod engine;
pub mod state;

pub use engine::{AuthorityChoice, BountyEngine, NewBounty};
pub use state::{
    transition, Action, ActorRole, Bounty, CustodyState, TransitionError, WorkflowStatus,
};
