//! Mock governance client for tests and local development mode.

use crate::error::ChainError;
use crate::governance::traits::{GovResult, GovernanceClient, GovernanceError};
use crate::governance::types::{
    ProposalAccount, ProposalAddress, ProposalState, TokenOwnerRecord, VoteChoice,
};
use crate::types::{unix_now, TxSignature, WalletAddress};
use async_trait::async_trait;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock governance client with settable records and proposal states.
#[derive(Clone)]
pub struct MockGovernanceClient {
    state: Arc<Mutex<MockState>>,
}

struct MockState {
    records: HashMap<(WalletAddress, WalletAddress), TokenOwnerRecord>,
    proposals: HashMap<ProposalAddress, ProposalAccount>,
    votes: Vec<(ProposalAddress, WalletAddress, VoteChoice)>,
    next_proposal: u64,
    reject_votes: bool,
}

impl MockGovernanceClient {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                records: HashMap::new(),
                proposals: HashMap::new(),
                votes: Vec::new(),
                next_proposal: 1,
                reject_votes: false,
            })),
        }
    }

    /// Register a token owner record (test setup: "wallet has deposited
    /// governance tokens in this realm").
    pub fn deposit_tokens(&self, realm: &WalletAddress, owner: &WalletAddress, amount: u64) {
        let mut s = self.state.lock().unwrap();
        s.records.insert(
            (realm.clone(), owner.clone()),
            TokenOwnerRecord {
                realm: realm.clone(),
                owner: owner.clone(),
                deposited_amount: amount,
            },
        );
    }

    /// Register an externally-created proposal (test setup for
    /// bounty-level linking, which happens out-of-band).
    pub fn put_proposal(&self, account: ProposalAccount) {
        let mut s = self.state.lock().unwrap();
        s.proposals.insert(account.address.clone(), account);
    }

    /// Move a proposal to a new state (simulated vote progress).
    pub fn set_proposal_state(&self, proposal: &ProposalAddress, state: ProposalState) {
        let mut s = self.state.lock().unwrap();
        if let Some(account) = s.proposals.get_mut(proposal) {
            account.state = state;
        }
    }

    /// Make every cast_vote call fail (surfaced verbatim, never retried).
    pub fn set_reject_votes(&self, reject: bool) {
        self.state.lock().unwrap().reject_votes = reject;
    }

    /// Votes recorded so far (test assertions).
    pub fn recorded_votes(&self) -> Vec<(ProposalAddress, WalletAddress, VoteChoice)> {
        self.state.lock().unwrap().votes.clone()
    }

    fn mock_signature() -> TxSignature {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        TxSignature(hex::encode(bytes))
    }
}

impl Default for MockGovernanceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GovernanceClient for MockGovernanceClient {
    async fn token_owner_record(
        &self,
        realm: &WalletAddress,
        owner: &WalletAddress,
    ) -> GovResult<Option<TokenOwnerRecord>> {
        let s = self.state.lock().unwrap();
        Ok(s.records.get(&(realm.clone(), owner.clone())).cloned())
    }

    async fn create_proposal(
        &self,
        _signer: &WalletAddress,
        realm: &WalletAddress,
        _title: &str,
        _description: &str,
    ) -> GovResult<ProposalAddress> {
        let mut s = self.state.lock().unwrap();
        let address = ProposalAddress(format!("proposal-{}", s.next_proposal));
        s.next_proposal += 1;
        let account = ProposalAccount {
            address: address.clone(),
            realm: realm.clone(),
            state: ProposalState::Voting,
            yes_weight: 0,
            no_weight: 0,
            voting_ends_at: unix_now() + 86400,
        };
        s.proposals.insert(address.clone(), account);
        Ok(address)
    }

    async fn cast_vote(
        &self,
        signer: &WalletAddress,
        proposal: &ProposalAddress,
        choice: VoteChoice,
    ) -> GovResult<TxSignature> {
        let mut s = self.state.lock().unwrap();
        if s.reject_votes {
            return Err(
                GovernanceError::VoteRejected("instruction simulation failed".into()).into(),
            );
        }
        let realm = s
            .proposals
            .get(proposal)
            .map(|a| a.realm.clone())
            .ok_or_else(|| ChainError::from(GovernanceError::ProposalNotFound(proposal.0.clone())))?;
        // The record must be in the proposal's own realm; a deposit in
        // some other realm carries no voting weight here.
        if !s.records.contains_key(&(realm, signer.clone())) {
            return Err(GovernanceError::VoteRejected(
                "no token owner record for signer in the proposal's realm".into(),
            )
            .into());
        }
        let account = s
            .proposals
            .get_mut(proposal)
            .ok_or_else(|| ChainError::from(GovernanceError::ProposalNotFound(proposal.0.clone())))?;
        match choice {
            VoteChoice::Approve => account.yes_weight += 1,
            VoteChoice::Deny => account.no_weight += 1,
        }
        s.votes.push((proposal.clone(), signer.clone(), choice));
        Ok(Self::mock_signature())
    }

    async fn proposal_account(
        &self,
        proposal: &ProposalAddress,
    ) -> GovResult<Option<ProposalAccount>> {
        let s = self.state.lock().unwrap();
        Ok(s.proposals.get(proposal).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn realm() -> WalletAddress {
        WalletAddress("realm".into())
    }

    fn voter() -> WalletAddress {
        WalletAddress("voter".into())
    }

    #[tokio::test]
    async fn test_record_lookup() {
        let client = MockGovernanceClient::new();
        assert!(client
            .token_owner_record(&realm(), &voter())
            .await
            .unwrap()
            .is_none());

        client.deposit_tokens(&realm(), &voter(), 500);
        let record = client
            .token_owner_record(&realm(), &voter())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.deposited_amount, 500);
    }

    #[tokio::test]
    async fn test_create_proposal_starts_voting() {
        let client = MockGovernanceClient::new();
        let address = client
            .create_proposal(&voter(), &realm(), "fund profile", "details")
            .await
            .unwrap();
        let account = client.proposal_account(&address).await.unwrap().unwrap();
        assert_eq!(account.state, ProposalState::Voting);
    }

    #[tokio::test]
    async fn test_vote_accumulates_weight() {
        let client = MockGovernanceClient::new();
        client.deposit_tokens(&realm(), &voter(), 100);
        let address = client
            .create_proposal(&voter(), &realm(), "q", "d")
            .await
            .unwrap();

        client
            .cast_vote(&voter(), &address, VoteChoice::Approve)
            .await
            .unwrap();

        let account = client.proposal_account(&address).await.unwrap().unwrap();
        assert_eq!(account.yes_weight, 1);
        assert_eq!(client.recorded_votes().len(), 1);
    }

    #[tokio::test]
    async fn test_vote_requires_record_in_proposal_realm() {
        let client = MockGovernanceClient::new();
        // Deposited, but in a different realm than the proposal's.
        client.deposit_tokens(&WalletAddress("other-realm".into()), &voter(), 100);
        let address = client
            .create_proposal(&voter(), &realm(), "q", "d")
            .await
            .unwrap();

        let err = client
            .cast_vote(&voter(), &address, VoteChoice::Approve)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChainError::Governance(GovernanceError::VoteRejected(_))
        ));
        assert!(client.recorded_votes().is_empty());

        let account = client.proposal_account(&address).await.unwrap().unwrap();
        assert_eq!(account.yes_weight, 0);
    }

    #[tokio::test]
    async fn test_vote_on_missing_proposal() {
        let client = MockGovernanceClient::new();
        client.deposit_tokens(&realm(), &voter(), 100);
        let err = client
            .cast_vote(&voter(), &ProposalAddress("nope".into()), VoteChoice::Deny)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChainError::Governance(GovernanceError::ProposalNotFound(_))
        ));
    }
}
