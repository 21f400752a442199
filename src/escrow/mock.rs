//! In-memory escrow program for tests and local development mode.
//!
//! Enforces every program rule the on-chain implementation enforces:
//! singleton account per bounty id, signer checks, terminal-state checks,
//! and balance movement between creator, escrow, and claimer.

use crate::error::ChainError;
use crate::escrow::address::{derive_escrow_address, EscrowAddress};
use crate::escrow::program::{
    CreateEscrowArgs, EscrowAccount, EscrowProgram, EscrowProgramError, EscrowResult, EscrowStatus,
};
use crate::types::{unix_now, BountyId, ProgramId, TxSignature, WalletAddress, BOUNTY_ID_LEN};
use async_trait::async_trait;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock escrow program backed by an in-memory ledger.
#[derive(Clone)]
pub struct MockEscrowProgram {
    program_id: ProgramId,
    state: Arc<Mutex<LedgerState>>,
}

struct LedgerState {
    accounts: HashMap<BountyId, EscrowAccount>,
    balances: HashMap<WalletAddress, u64>,
    /// When set, every instruction fails with Unavailable (transport
    /// failure injection for ConsistencyError / abort paths).
    offline: bool,
}

impl MockEscrowProgram {
    pub fn new(program_id: ProgramId) -> Self {
        Self {
            program_id,
            state: Arc::new(Mutex::new(LedgerState {
                accounts: HashMap::new(),
                balances: HashMap::new(),
                offline: false,
            })),
        }
    }

    pub fn program_id(&self) -> &ProgramId {
        &self.program_id
    }

    /// Credit a wallet (test setup).
    pub fn credit(&self, wallet: &WalletAddress, amount: u64) {
        let mut s = self.state.lock().unwrap();
        *s.balances.entry(wallet.clone()).or_insert(0) += amount;
    }

    /// Current balance of a wallet.
    pub fn balance_of(&self, wallet: &WalletAddress) -> u64 {
        let s = self.state.lock().unwrap();
        s.balances.get(wallet).copied().unwrap_or(0)
    }

    /// Simulate RPC outage: every subsequent instruction fails with
    /// `ChainError::Unavailable` until cleared.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    fn mock_signature() -> TxSignature {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        TxSignature(hex::encode(bytes))
    }

    fn check_online(s: &LedgerState) -> EscrowResult<()> {
        if s.offline {
            return Err(ChainError::Unavailable("rpc endpoint offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl EscrowProgram for MockEscrowProgram {
    async fn create_escrow(
        &self,
        signer: &WalletAddress,
        args: CreateEscrowArgs,
    ) -> EscrowResult<(EscrowAddress, TxSignature)> {
        let mut s = self.state.lock().unwrap();
        Self::check_online(&s)?;

        // Program-side format check; the core validates earlier, but the
        // program is the enforcement of record.
        if args.bounty_id.as_str().len() != BOUNTY_ID_LEN
            || !args.bounty_id.as_str().chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(EscrowProgramError::InvalidBountyId.into());
        }
        if args.reward_amount == 0 {
            return Err(EscrowProgramError::ZeroReward.into());
        }
        if *signer == args.claimer {
            return Err(EscrowProgramError::SelfEscrow.into());
        }
        if s.accounts.contains_key(&args.bounty_id) {
            return Err(EscrowProgramError::AlreadyExists.into());
        }

        // The runtime refuses the transfer itself when the creator cannot
        // cover the reward; there is no program code for this, it surfaces
        // as a failed simulation.
        let creator_balance = s.balances.get(signer).copied().unwrap_or(0);
        if creator_balance < args.reward_amount {
            return Err(ChainError::Unavailable(format!(
                "transaction simulation failed: creator balance {creator_balance} \
                 below reward {}",
                args.reward_amount
            )));
        }
        *s.balances.entry(signer.clone()).or_insert(0) -= args.reward_amount;

        let (address, bump) = derive_escrow_address(&args.bounty_id, &self.program_id);
        let account = EscrowAccount {
            bounty_id: args.bounty_id.clone(),
            creator: signer.clone(),
            claimer: args.claimer,
            authority: args.authority,
            dao_address: args.dao_address,
            reward_amount: args.reward_amount,
            status: EscrowStatus::Created,
            created_at: unix_now(),
            bump,
        };
        s.accounts.insert(args.bounty_id, account);

        Ok((address, Self::mock_signature()))
    }

    async fn cancel_escrow(
        &self,
        signer: &WalletAddress,
        bounty_id: &BountyId,
    ) -> EscrowResult<TxSignature> {
        let mut s = self.state.lock().unwrap();
        Self::check_online(&s)?;

        let account = s
            .accounts
            .get(bounty_id)
            .ok_or(EscrowProgramError::AlreadyFinalized)?
            .clone();
        if account.creator != *signer {
            return Err(EscrowProgramError::UnauthorizedCreator.into());
        }
        if account.status.is_finalized() {
            return Err(EscrowProgramError::AlreadyFinalized.into());
        }

        *s.balances.entry(account.creator.clone()).or_insert(0) += account.reward_amount;
        s.accounts.get_mut(bounty_id).unwrap().status = EscrowStatus::Cancelled;

        Ok(Self::mock_signature())
    }

    async fn release_escrow(
        &self,
        signer: &WalletAddress,
        bounty_id: &BountyId,
        claimer: &WalletAddress,
    ) -> EscrowResult<TxSignature> {
        let mut s = self.state.lock().unwrap();
        Self::check_online(&s)?;

        let account = s
            .accounts
            .get(bounty_id)
            .ok_or(EscrowProgramError::AlreadyFinalized)?
            .clone();
        if account.authority != *signer {
            return Err(EscrowProgramError::UnauthorizedAuthority.into());
        }
        if account.claimer != *claimer {
            return Err(EscrowProgramError::WrongClaimer.into());
        }
        if account.status.is_finalized() {
            return Err(EscrowProgramError::AlreadyFinalized.into());
        }

        *s.balances.entry(account.claimer.clone()).or_insert(0) += account.reward_amount;
        s.accounts.get_mut(bounty_id).unwrap().status = EscrowStatus::Released;

        Ok(Self::mock_signature())
    }

    async fn get_account(&self, bounty_id: &BountyId) -> Option<EscrowAccount> {
        let s = self.state.lock().unwrap();
        s.accounts.get(bounty_id).cloned()
    }
}
