//! Governance program seam.
//!
//! The governance program is external and consumed read/write: token
//! owner record lookups, create-proposal and cast-vote instructions, and
//! proposal account reads for the polling loop.

use crate::error::ChainError;
use crate::governance::types::{
    ProposalAccount, ProposalAddress, TokenOwnerRecord, VoteChoice,
};
use crate::types::{TxSignature, WalletAddress};
use async_trait::async_trait;

/// Result type for governance program calls.
pub type GovResult<T> = Result<T, ChainError>;

/// Governance program errors (instruction-level, not transport).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GovernanceError {
    #[error("proposal account not found: {0}")]
    ProposalNotFound(String),

    #[error("no governance account configured for realm {0}")]
    NoGovernanceAccount(String),

    #[error("vote instruction rejected: {0}")]
    VoteRejected(String),

    #[error("create-proposal instruction rejected: {0}")]
    ProposalRejected(String),
}

/// Async seam over the external governance program.
#[async_trait]
pub trait GovernanceClient: Send + Sync {
    /// Look up the token owner record for a wallet in a realm. `None`
    /// means the wallet has not deposited governance tokens (a distinct,
    /// user-actionable condition, not a failure).
    async fn token_owner_record(
        &self,
        realm: &WalletAddress,
        owner: &WalletAddress,
    ) -> GovResult<Option<TokenOwnerRecord>>;

    /// Build and submit a create-proposal instruction. Returns the new
    /// proposal account address.
    async fn create_proposal(
        &self,
        signer: &WalletAddress,
        realm: &WalletAddress,
        title: &str,
        description: &str,
    ) -> GovResult<ProposalAddress>;

    /// Build and submit a single-choice vote instruction. Never retried
    /// automatically: a vote is not safely idempotent to resubmit blindly.
    async fn cast_vote(
        &self,
        signer: &WalletAddress,
        proposal: &ProposalAddress,
        choice: VoteChoice,
    ) -> GovResult<TxSignature>;

    /// Read the current proposal account. `None` if the account is no
    /// longer observed on chain.
    async fn proposal_account(
        &self,
        proposal: &ProposalAddress,
    ) -> GovResult<Option<ProposalAccount>>;
}
