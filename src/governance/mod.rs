//! Governance Bridge.
//!
//! Creates and links governance proposals, casts votes, polls proposal
//! state, and reconciles terminal outcomes back into the datastore. The
//! local record is always a cache of the governance outcome, never
//! authoritative.

pub mod bridge;
pub mod mock;
pub mod poller;
pub mod traits;
pub mod types;

pub use bridge::GovernanceBridge;
pub use poller::{ProposalPoller, DEFAULT_POLL_INTERVAL};
pub use traits::{GovernanceClient, GovernanceError};
pub use types::{
    FundingProposal, FundingStatus, ProposalAccount, ProposalAddress, ProposalState,
    TokenOwnerRecord, VoteChoice,
};
