//! Governance-side domain types.

use crate::types::{UserId, WalletAddress};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of an on-chain governance proposal account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalAddress(pub String);

impl fmt::Display for ProposalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Proposal state enum of the external governance program (8 values,
/// consumed read-only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    Draft,
    SigningOff,
    Voting,
    Succeeded,
    Defeated,
    Completed,
    Cancelled,
    Executing,
}

impl ProposalState {
    /// Terminal states stop the polling loop and trigger exactly one
    /// reconciliation write.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalState::Succeeded
                | ProposalState::Defeated
                | ProposalState::Completed
                | ProposalState::Cancelled
        )
    }
}

/// On-chain proposal account snapshot. Vote weights are token-weighted,
/// not one-wallet-one-vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalAccount {
    pub address: ProposalAddress,
    /// The realm this proposal belongs to; votes require a token owner
    /// record in this realm, not just any realm.
    pub realm: WalletAddress,
    pub state: ProposalState,
    pub yes_weight: u64,
    pub no_weight: u64,
    pub voting_ends_at: u64,
}

/// Proof that a wallet has deposited governance tokens in a DAO. Required
/// to vote or propose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenOwnerRecord {
    pub realm: WalletAddress,
    pub owner: WalletAddress,
    pub deposited_amount: u64,
}

/// Single-choice vote options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChoice {
    Approve,
    Deny,
}

/// Local lifecycle status of a profile-level funding ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundingStatus {
    PendingSignature,
    Voting,
    Accepted,
    Rejected,
    Funded,
}

impl FundingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FundingStatus::Accepted | FundingStatus::Rejected | FundingStatus::Funded
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FundingStatus::PendingSignature => "pending_signature",
            FundingStatus::Voting => "voting",
            FundingStatus::Accepted => "accepted",
            FundingStatus::Rejected => "rejected",
            FundingStatus::Funded => "funded",
        }
    }
}

impl fmt::Display for FundingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Profile-level funding ask tracked against an on-chain proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingProposal {
    pub id: String,
    pub profile_id: UserId,
    pub realm: WalletAddress,
    pub requested_amount: u64,
    /// Per-milestone allocations; must sum to `requested_amount`.
    pub milestone_allocations: Vec<u64>,
    pub proposal_address: Option<ProposalAddress>,
    pub status: FundingStatus,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Map a terminal on-chain proposal state to the local funding outcome.
///
/// Returns `None` for non-terminal states (nothing to reconcile yet).
pub fn funding_outcome(state: ProposalState) -> Option<FundingStatus> {
    match state {
        ProposalState::Succeeded => Some(FundingStatus::Accepted),
        ProposalState::Completed => Some(FundingStatus::Funded),
        ProposalState::Defeated | ProposalState::Cancelled => Some(FundingStatus::Rejected),
        _ => None,
    }
}
