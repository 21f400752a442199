//! Unified error taxonomy for the lifecycle engine.
//!
//! Six classes, in escalating severity:
//! - Validation / Authorization / StateConflict reject synchronously,
//!   before any mutation (local or on-chain).
//! - Chain aborts before the persistence write (the on-chain call always
//!   precedes the local write).
//! - ExternalDependency is user-actionable (e.g. "deposit governance
//!   tokens first").
//! - Consistency means funds or votes moved on-chain with no local
//!   record. It must never be swallowed: the on-chain address/signature
//!   ride along so a reconciliation pass can repair the record later.

use crate::escrow::program::EscrowProgramError;
use crate::governance::traits::GovernanceError;
use crate::store::traits::StoreError;
use crate::types::InvalidBountyId;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Top-level error for every engine operation.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Malformed input (empty summary, bad identifier, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Wrong caller for the action.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Action invalid for the record's current state.
    #[error("state conflict: expected {expected}, found {actual}")]
    StateConflict { expected: String, actual: String },

    /// Wallet unavailable, transaction rejected/expired, or a program
    /// error code.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// A required external resource is missing and the user can fix it.
    #[error("external dependency: {0}")]
    ExternalDependency(String),

    /// On-chain step succeeded but the persistence step failed. The
    /// on-chain artifacts are carried so the record can be repaired.
    #[error(
        "consistency failure: {context} (escrow_address={escrow_address:?}, \
         signature={signature:?})"
    )]
    Consistency {
        context: String,
        escrow_address: Option<String>,
        signature: Option<String>,
    },

    /// Datastore failure unrelated to a state-conflict CAS miss.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<InvalidBountyId> for CoreError {
    fn from(e: InvalidBountyId) -> Self {
        CoreError::Validation(e.to_string())
    }
}

/// On-chain call failures.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The escrow program rejected the instruction with a program code.
    #[error("escrow program rejected instruction: {0}")]
    Escrow(#[from] EscrowProgramError),

    /// The governance program rejected the instruction.
    #[error("governance program error: {0}")]
    Governance(#[from] GovernanceError),

    /// The transaction's reference blockhash aged out before
    /// confirmation. The submission is dead; resubmit fresh, never retry
    /// the stale transaction.
    #[error("transaction expired before confirmation")]
    Expired,

    /// RPC endpoint or wallet unavailable.
    #[error("chain unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let e = CoreError::Validation("summary is empty".into());
        assert_eq!(e.to_string(), "validation failed: summary is empty");
    }

    #[test]
    fn test_state_conflict_display() {
        let e = CoreError::StateConflict {
            expected: "open".into(),
            actual: "claimed".into(),
        };
        assert!(e.to_string().contains("expected open"));
        assert!(e.to_string().contains("found claimed"));
    }

    #[test]
    fn test_consistency_carries_artifacts() {
        let e = CoreError::Consistency {
            context: "escrow funded but record write failed".into(),
            escrow_address: Some("abc".into()),
            signature: Some("sig".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("abc"));
        assert!(msg.contains("sig"));
    }

    #[test]
    fn test_program_error_converts_through_chain() {
        let e: CoreError = ChainError::from(EscrowProgramError::ZeroReward).into();
        assert!(matches!(
            e,
            CoreError::Chain(ChainError::Escrow(EscrowProgramError::ZeroReward))
        ));
    }

    #[test]
    fn test_invalid_bounty_id_is_validation() {
        let err = crate::types::BountyId::parse("nope").unwrap_err();
        let e: CoreError = err.into();
        assert!(matches!(e, CoreError::Validation(_)));
    }
}
