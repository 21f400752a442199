//! Async datastore traits.

use crate::governance::types::{FundingProposal, FundingStatus};
use crate::types::{BountyId, UserId};
use crate::workflow::state::{Bounty, CustodyState, WorkflowStatus};
use async_trait::async_trait;

/// Result type for datastore operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Datastore failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record already exists: {0}")]
    AlreadyExists(String),

    /// Conditional update failed: the record was not in the expected
    /// state. Surfaces as StateConflictError at the engine boundary.
    #[error("conditional update conflict: expected {expected}, found {actual}")]
    Conflict { expected: String, actual: String },

    #[error("backend error: {0}")]
    Backend(String),
}

/// Bounty record operations.
///
/// `update_if` is a compare-and-swap keyed on the expected (workflow,
/// custody) pair read before the mutation was computed. Backends must
/// evaluate the comparison and the write atomically (row lock or
/// equivalent).
#[async_trait]
pub trait BountyStore: Send + Sync {
    async fn insert_bounty(&self, bounty: Bounty) -> StoreResult<()>;

    async fn get_bounty(&self, id: &BountyId) -> StoreResult<Bounty>;

    /// Replace the record iff its current (status, custody) equals
    /// `expected`. Returns the stored record on success.
    async fn update_bounty_if(
        &self,
        expected: (WorkflowStatus, CustodyState),
        bounty: Bounty,
    ) -> StoreResult<Bounty>;

    /// Bounties whose custody is mid-flight or whose linked proposal is
    /// still being polled (reconciliation sweep input).
    async fn bounties_pending_reconciliation(&self) -> StoreResult<Vec<Bounty>>;
}

/// Funding proposal record operations.
#[async_trait]
pub trait ProposalStore: Send + Sync {
    async fn insert_proposal(&self, proposal: FundingProposal) -> StoreResult<()>;

    async fn get_proposal(&self, id: &str) -> StoreResult<FundingProposal>;

    /// CAS on the expected prior status. A reconciliation write that
    /// finds the status already updated must be skipped by the caller,
    /// not forced through.
    async fn update_proposal_status_if(
        &self,
        id: &str,
        expected: FundingStatus,
        new: FundingStatus,
    ) -> StoreResult<FundingProposal>;

    /// The non-terminal proposal for a profile, if any. At most one may
    /// exist at a time.
    async fn active_proposal_for(&self, profile: &UserId) -> StoreResult<Option<FundingProposal>>;

    /// Proposals with an on-chain address that have not reached a
    /// terminal status (reconciliation sweep input).
    async fn proposals_pending_reconciliation(&self) -> StoreResult<Vec<FundingProposal>>;
}
