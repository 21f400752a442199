//! In-memory reference store.
//!
//! CAS comparisons and writes happen under one mutex, which is the atomic
//! read-modify-write the contract requires. Also counts writes so tests
//! can assert reconciliation idempotence.

use crate::governance::types::{FundingProposal, FundingStatus};
use crate::store::traits::{BountyStore, ProposalStore, StoreError, StoreResult};
use crate::types::{BountyId, UserId};
use crate::workflow::state::{Bounty, CustodyState, WorkflowStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory datastore for tests and local development mode.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    bounties: HashMap<BountyId, Bounty>,
    proposals: HashMap<String, FundingProposal>,
    bounty_writes: u64,
    proposal_writes: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bounty writes performed (insert + successful CAS).
    pub fn bounty_write_count(&self) -> u64 {
        self.state.lock().unwrap().bounty_writes
    }

    /// Total proposal writes performed (insert + successful CAS).
    pub fn proposal_write_count(&self) -> u64 {
        self.state.lock().unwrap().proposal_writes
    }
}

#[async_trait]
impl BountyStore for MemoryStore {
    async fn insert_bounty(&self, bounty: Bounty) -> StoreResult<()> {
        let mut s = self.state.lock().unwrap();
        if s.bounties.contains_key(&bounty.id) {
            return Err(StoreError::AlreadyExists(bounty.id.to_string()));
        }
        s.bounties.insert(bounty.id.clone(), bounty);
        s.bounty_writes += 1;
        Ok(())
    }

    async fn get_bounty(&self, id: &BountyId) -> StoreResult<Bounty> {
        let s = self.state.lock().unwrap();
        s.bounties
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update_bounty_if(
        &self,
        expected: (WorkflowStatus, CustodyState),
        bounty: Bounty,
    ) -> StoreResult<Bounty> {
        let mut s = self.state.lock().unwrap();
        let current = s
            .bounties
            .get(&bounty.id)
            .ok_or_else(|| StoreError::NotFound(bounty.id.to_string()))?;

        if (current.status, current.custody) != expected {
            return Err(StoreError::Conflict {
                expected: format!("({}, {})", expected.0, expected.1),
                actual: format!("({}, {})", current.status, current.custody),
            });
        }

        s.bounties.insert(bounty.id.clone(), bounty.clone());
        s.bounty_writes += 1;
        Ok(bounty)
    }

    async fn bounties_pending_reconciliation(&self) -> StoreResult<Vec<Bounty>> {
        let s = self.state.lock().unwrap();
        Ok(s.bounties
            .values()
            .filter(|b| {
                b.custody == CustodyState::PendingCreate
                    || (b.proposal_address.is_some() && !b.status.is_terminal())
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProposalStore for MemoryStore {
    async fn insert_proposal(&self, proposal: FundingProposal) -> StoreResult<()> {
        let mut s = self.state.lock().unwrap();
        if s.proposals.contains_key(&proposal.id) {
            return Err(StoreError::AlreadyExists(proposal.id.clone()));
        }
        s.proposals.insert(proposal.id.clone(), proposal);
        s.proposal_writes += 1;
        Ok(())
    }

    async fn get_proposal(&self, id: &str) -> StoreResult<FundingProposal> {
        let s = self.state.lock().unwrap();
        s.proposals
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update_proposal_status_if(
        &self,
        id: &str,
        expected: FundingStatus,
        new: FundingStatus,
    ) -> StoreResult<FundingProposal> {
        let mut s = self.state.lock().unwrap();
        let proposal = s
            .proposals
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if proposal.status != expected {
            return Err(StoreError::Conflict {
                expected: expected.to_string(),
                actual: proposal.status.to_string(),
            });
        }

        proposal.status = new;
        proposal.updated_at = crate::types::unix_now();
        let updated = proposal.clone();
        s.proposal_writes += 1;
        Ok(updated)
    }

    async fn active_proposal_for(&self, profile: &UserId) -> StoreResult<Option<FundingProposal>> {
        let s = self.state.lock().unwrap();
        Ok(s.proposals
            .values()
            .find(|p| p.profile_id == *profile && !p.status.is_terminal())
            .cloned())
    }

    async fn proposals_pending_reconciliation(&self) -> StoreResult<Vec<FundingProposal>> {
        let s = self.state.lock().unwrap();
        Ok(s.proposals
            .values()
            .filter(|p| p.proposal_address.is_some() && !p.status.is_terminal())
            .cloned()
            .collect())
    }
}
