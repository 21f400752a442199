//! Escrow Lifecycle Module.
//!
//! Derives deterministic escrow addresses and issues create/cancel/release
//! instructions against the on-chain escrow program. The program itself is
//! behind the [`program::EscrowProgram`] trait so the engine can run
//! against a real RPC transport or the in-memory [`mock::MockEscrowProgram`].

pub mod address;
pub mod mock;
pub mod program;

pub use address::{derive_escrow_address, EscrowAddress, ESCROW_SEED};
pub use program::{
    CreateEscrowArgs, EscrowAccount, EscrowProgram, EscrowProgramError, EscrowResult, EscrowStatus,
};
