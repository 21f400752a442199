//! Escrow program instruction contract.
//!
//! Reproduces the on-chain instruction set bit-exact:
//!
//! | Instruction     | Signer    | Failure codes                                      |
//! |-----------------|-----------|----------------------------------------------------|
//! | create_escrow   | creator   | ZeroReward, SelfEscrow, InvalidBountyId, AlreadyExists |
//! | cancel_escrow   | creator   | UnauthorizedCreator, AlreadyFinalized              |
//! | release_escrow  | authority | UnauthorizedAuthority, WrongClaimer, AlreadyFinalized |
//!
//! The program enforces exactly one escrow account per bounty id: the
//! address is derived from the seed `"escrow"` plus the id, so a second
//! create against the same id lands on an existing account and fails.

use crate::error::ChainError;
use crate::escrow::address::EscrowAddress;
use crate::types::{BountyId, TxSignature, WalletAddress};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// On-chain custody status of an escrow account. Terminal once it leaves
/// `Created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowStatus {
    Created,
    Released,
    Cancelled,
}

/// On-chain escrow account state, owned by the escrow program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowAccount {
    pub bounty_id: BountyId,
    pub creator: WalletAddress,
    pub claimer: WalletAddress,
    /// Governance program-derived address, or the creator's own key in
    /// DAO-less fallback mode.
    pub authority: WalletAddress,
    pub dao_address: WalletAddress,
    pub reward_amount: u64,
    pub status: EscrowStatus,
    pub created_at: u64,
    /// Address-derivation bump, recorded for audit.
    pub bump: u8,
}

/// Arguments for the create_escrow instruction.
#[derive(Debug, Clone)]
pub struct CreateEscrowArgs {
    pub bounty_id: BountyId,
    pub claimer: WalletAddress,
    pub authority: WalletAddress,
    pub dao_address: WalletAddress,
    pub reward_amount: u64,
}

/// Result type for escrow program calls. Failures are either program
/// error codes or transport-level conditions (expiry, unavailability).
pub type EscrowResult<T> = Result<T, ChainError>;

/// Program-level error codes. These mirror the on-chain program exactly
/// and must not be renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EscrowProgramError {
    #[error("ZeroReward: reward amount must be positive")]
    ZeroReward,

    #[error("SelfEscrow: creator and claimer must differ")]
    SelfEscrow,

    #[error("InvalidBountyId: bounty id must be 32 hex characters")]
    InvalidBountyId,

    #[error("AlreadyExists: escrow account already funded for this bounty")]
    AlreadyExists,

    #[error("UnauthorizedCreator: only the recorded creator may cancel")]
    UnauthorizedCreator,

    #[error("UnauthorizedAuthority: only the recorded authority may release")]
    UnauthorizedAuthority,

    #[error("WrongClaimer: claimer does not match the escrow record")]
    WrongClaimer,

    #[error("AlreadyFinalized: escrow is not in Created status")]
    AlreadyFinalized,
}

/// Escrow program seam.
///
/// Implementations submit the instruction, block until ledger confirmation
/// at the chosen commitment level, and return the confirmed signature.
/// Signers are explicit arguments; nothing reads an ambient wallet.
#[async_trait]
pub trait EscrowProgram: Send + Sync {
    /// Lock `reward_amount` (plus rent) into the derived escrow address.
    /// Signed by the creator. Returns the derived address and the
    /// confirmed transaction signature.
    async fn create_escrow(
        &self,
        signer: &WalletAddress,
        args: CreateEscrowArgs,
    ) -> EscrowResult<(EscrowAddress, TxSignature)>;

    /// Return the full balance to the creator. Creator-signed only.
    async fn cancel_escrow(
        &self,
        signer: &WalletAddress,
        bounty_id: &BountyId,
    ) -> EscrowResult<TxSignature>;

    /// Transfer the reward to the recorded claimer. Authority-signed only.
    async fn release_escrow(
        &self,
        signer: &WalletAddress,
        bounty_id: &BountyId,
        claimer: &WalletAddress,
    ) -> EscrowResult<TxSignature>;

    /// Read the escrow account for a bounty, if one exists on chain.
    async fn get_account(&self, bounty_id: &BountyId) -> Option<EscrowAccount>;
}

impl EscrowStatus {
    /// Once the account leaves `Created` it is terminal.
    pub fn is_finalized(&self) -> bool {
        !matches!(self, EscrowStatus::Created)
    }
}
