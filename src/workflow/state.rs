//! The bounty state machine: one transition function for every invariant.
//!
//! Workflow status and custody state are tracked as a pair and transition
//! together through [`transition`]. Nothing else in the crate decides
//! whether an action is legal; the engine computes the caller's role,
//! calls `transition`, and only then touches the chain or the store.
//!
//! ```text
//! open --claim--> claimed --submit--> submitted --approve--> approved --...--> paid
//!                                         \--reject--> rejected (terminal)
//! ```
//!
//! Custody runs on its own axis: unfunded -> pending_create -> escrowed
//! -> released | cancelled. `pending_create` is the recorded funding
//! intent, written before the on-chain create call so a crash mid-flight
//! is detectable and resumable.

use crate::escrow::address::EscrowAddress;
use crate::governance::types::ProposalAddress;
use crate::types::{BountyId, TxSignature, UserId, WalletAddress};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Off-chain workflow status. `Rejected` and `Paid` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStatus {
    Open,
    Claimed,
    Submitted,
    Approved,
    Rejected,
    Paid,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Rejected | WorkflowStatus::Paid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Open => "open",
            WorkflowStatus::Claimed => "claimed",
            WorkflowStatus::Submitted => "submitted",
            WorkflowStatus::Approved => "approved",
            WorkflowStatus::Rejected => "rejected",
            WorkflowStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Local view of the escrow custody state. `Released` and `Cancelled`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustodyState {
    /// No escrow account exists for this bounty.
    Unfunded,
    /// Funding intent recorded; the on-chain create call is in flight.
    PendingCreate,
    /// Escrow account exists on chain with status Created.
    Escrowed,
    Released,
    Cancelled,
}

impl CustodyState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CustodyState::Released | CustodyState::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CustodyState::Unfunded => "unfunded",
            CustodyState::PendingCreate => "pending_create",
            CustodyState::Escrowed => "escrowed",
            CustodyState::Released => "released",
            CustodyState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CustodyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Every action a caller (or the engine itself) can take on a bounty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Claim,
    Submit,
    Approve,
    Reject,
    /// Record funding intent before the on-chain create call.
    BeginFund,
    /// Confirm the escrow account exists after the create call succeeded.
    ConfirmFund,
    /// Clear a pending intent after the create call failed cleanly.
    AbortFund,
    LinkProposal,
    Release,
    CancelEscrow,
    MarkPaid,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Claim => "claim",
            Action::Submit => "submit",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::BeginFund => "begin_fund",
            Action::ConfirmFund => "confirm_fund",
            Action::AbortFund => "abort_fund",
            Action::LinkProposal => "link_proposal",
            Action::Release => "release",
            Action::CancelEscrow => "cancel_escrow",
            Action::MarkPaid => "mark_paid",
        }
    }
}

/// Who the caller is relative to this bounty. Computed by the engine from
/// the explicit caller argument, never from ambient wallet state.
///
/// Flags, not an enum: in DAO-less fallback mode the creator's wallet is
/// also the release authority, and a claimer may hold governance power.
/// Each transition checks the flag it requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActorRole {
    pub is_creator: bool,
    pub is_claimer: bool,
    /// Caller's wallet is the recorded escrow release authority
    /// (governance-derived address or the creator's key in fallback mode).
    pub is_authority: bool,
}

impl ActorRole {
    pub fn creator() -> Self {
        Self { is_creator: true, ..Self::default() }
    }

    pub fn claimer() -> Self {
        Self { is_claimer: true, ..Self::default() }
    }

    pub fn authority() -> Self {
        Self { is_authority: true, ..Self::default() }
    }

    pub fn outsider() -> Self {
        Self::default()
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.is_creator {
            parts.push("creator");
        }
        if self.is_claimer {
            parts.push("claimer");
        }
        if self.is_authority {
            parts.push("authority");
        }
        if parts.is_empty() {
            "outsider".to_string()
        } else {
            parts.join("+")
        }
    }
}

/// Why a transition was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("action {action} requires role {required}, caller is {actual}")]
    Role {
        action: &'static str,
        required: &'static str,
        actual: String,
    },

    #[error("action {action} not allowed in state ({workflow}, {custody})")]
    State {
        action: &'static str,
        workflow: WorkflowStatus,
        custody: CustodyState,
    },
}

fn role_err(action: Action, required: &'static str, actual: ActorRole) -> TransitionError {
    TransitionError::Role {
        action: action.name(),
        required,
        actual: actual.describe(),
    }
}

fn state_err(action: Action, workflow: WorkflowStatus, custody: CustodyState) -> TransitionError {
    TransitionError::State {
        action: action.name(),
        workflow,
        custody,
    }
}

/// The single transition function. Returns the new (workflow, custody)
/// pair, or the reason the action is refused. Role errors map to
/// AuthorizationError at the engine boundary, state errors to
/// StateConflictError.
pub fn transition(
    workflow: WorkflowStatus,
    custody: CustodyState,
    action: Action,
    role: ActorRole,
) -> Result<(WorkflowStatus, CustodyState), TransitionError> {
    use Action::*;
    use CustodyState as C;
    use WorkflowStatus as W;

    match action {
        Claim => {
            // Anyone but the creator may claim an open bounty.
            if role.is_creator {
                return Err(role_err(action, "non-creator", role));
            }
            if workflow != W::Open {
                return Err(state_err(action, workflow, custody));
            }
            Ok((W::Claimed, custody))
        }
        Submit => {
            if !role.is_claimer {
                return Err(role_err(action, "claimer", role));
            }
            if workflow != W::Claimed {
                return Err(state_err(action, workflow, custody));
            }
            Ok((W::Submitted, custody))
        }
        Approve => {
            if !role.is_creator {
                return Err(role_err(action, "creator", role));
            }
            if workflow != W::Submitted {
                return Err(state_err(action, workflow, custody));
            }
            Ok((W::Approved, custody))
        }
        Reject => {
            if !role.is_creator {
                return Err(role_err(action, "creator", role));
            }
            if workflow != W::Submitted {
                return Err(state_err(action, workflow, custody));
            }
            Ok((W::Rejected, custody))
        }
        BeginFund => {
            if !role.is_creator {
                return Err(role_err(action, "creator", role));
            }
            if workflow != W::Approved || custody != C::Unfunded {
                return Err(state_err(action, workflow, custody));
            }
            Ok((workflow, C::PendingCreate))
        }
        ConfirmFund => {
            // Engine-internal: follows a confirmed on-chain create.
            if custody != C::PendingCreate {
                return Err(state_err(action, workflow, custody));
            }
            Ok((workflow, C::Escrowed))
        }
        AbortFund => {
            // Engine-internal: the create call failed before funds moved.
            if custody != C::PendingCreate {
                return Err(state_err(action, workflow, custody));
            }
            Ok((workflow, C::Unfunded))
        }
        LinkProposal => {
            if !role.is_creator {
                return Err(role_err(action, "creator", role));
            }
            if workflow != W::Approved {
                return Err(state_err(action, workflow, custody));
            }
            // Address attach only; no state change.
            Ok((workflow, custody))
        }
        Release => {
            if !role.is_authority {
                return Err(role_err(action, "authority", role));
            }
            if custody != C::Escrowed {
                return Err(state_err(action, workflow, custody));
            }
            Ok((workflow, C::Released))
        }
        CancelEscrow => {
            // Allowed regardless of workflow status as long as custody is
            // not yet finalized on chain.
            if !role.is_creator {
                return Err(role_err(action, "creator", role));
            }
            if !matches!(custody, C::PendingCreate | C::Escrowed) {
                return Err(state_err(action, workflow, custody));
            }
            Ok((workflow, C::Cancelled))
        }
        MarkPaid => {
            if !(role.is_creator || role.is_claimer) {
                return Err(role_err(action, "creator or claimer", role));
            }
            if workflow != W::Approved || custody != C::Released {
                return Err(state_err(action, workflow, custody));
            }
            Ok((W::Paid, custody))
        }
    }
}

/// The bounty datastore record. Never hard-deleted: rejected and paid
/// bounties are retained for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounty {
    pub id: BountyId,
    pub dao_address: WalletAddress,
    pub title: String,
    pub description: String,
    pub reward_amount: u64,
    pub status: WorkflowStatus,
    pub custody: CustodyState,
    pub creator_id: UserId,
    pub creator_wallet: WalletAddress,
    pub claimer_id: Option<UserId>,
    pub claimer_wallet: Option<WalletAddress>,
    pub evidence_summary: Option<String>,
    pub evidence_links: Vec<String>,
    pub escrow_address: Option<EscrowAddress>,
    pub escrow_tx_signature: Option<TxSignature>,
    pub authority_address: Option<WalletAddress>,
    pub proposal_address: Option<ProposalAddress>,
    pub release_tx_signature: Option<TxSignature>,
    pub created_at: u64,
    pub claimed_at: Option<u64>,
    pub submitted_at: Option<u64>,
    pub resolved_at: Option<u64>,
    pub funded_at: Option<u64>,
    pub paid_at: Option<u64>,
}

impl Bounty {
    /// Roles of a caller relative to this record. Identity comparison
    /// covers creator/claimer; wallet comparison covers the authority.
    pub fn role_of(&self, user_id: &UserId, wallet: &WalletAddress) -> ActorRole {
        ActorRole {
            is_creator: self.creator_id == *user_id,
            is_claimer: self.claimer_id.as_ref() == Some(user_id),
            is_authority: self.authority_address.as_ref() == Some(wallet),
        }
    }
}
