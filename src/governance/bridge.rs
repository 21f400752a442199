//! Funding-ask creation and vote casting.
//!
//! Both operations require the caller's token owner record (proof of
//! deposited governance tokens in the DAO). Its absence is a distinct,
//! user-actionable condition, not a generic failure. Vote failures are
//! surfaced verbatim and never retried automatically: a vote instruction
//! is not safely idempotent to resubmit blindly.

use crate::error::{CoreError, CoreResult};
use crate::governance::traits::GovernanceClient;
use crate::governance::types::{
    FundingProposal, FundingStatus, ProposalAddress, VoteChoice,
};
use crate::store::traits::ProposalStore;
use crate::types::{unix_now, Caller, TxSignature, WalletAddress};
use tracing::info;
use uuid::Uuid;

/// Parameters for a profile-level funding ask.
#[derive(Debug, Clone)]
pub struct FundingAsk {
    pub realm: WalletAddress,
    pub title: String,
    pub description: String,
    pub requested_amount: u64,
    pub milestone_allocations: Vec<u64>,
}

/// Bridge between local funding records and the governance program.
pub struct GovernanceBridge<G, S> {
    client: G,
    store: S,
}

impl<G: GovernanceClient, S: ProposalStore> GovernanceBridge<G, S> {
    pub fn new(client: G, store: S) -> Self {
        Self { client, store }
    }

    pub fn client(&self) -> &G {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a funding proposal for the caller's profile.
    ///
    /// Checks the token owner record first, then builds and submits the
    /// create-proposal instruction, and only after confirmation persists
    /// the record with status `voting`.
    pub async fn create_funding_proposal(
        &self,
        caller: &Caller,
        ask: FundingAsk,
    ) -> CoreResult<FundingProposal> {
        if ask.requested_amount == 0 {
            return Err(CoreError::Validation("requested amount must be positive".into()));
        }
        if !ask.milestone_allocations.is_empty() {
            let total: u64 = ask.milestone_allocations.iter().sum();
            if total != ask.requested_amount {
                return Err(CoreError::Validation(format!(
                    "milestone allocations sum to {total}, requested {}",
                    ask.requested_amount
                )));
            }
        }

        // At most one non-terminal funding proposal per profile.
        if let Some(active) = self.store.active_proposal_for(&caller.user_id).await? {
            return Err(CoreError::StateConflict {
                expected: "no active funding proposal".into(),
                actual: format!("proposal {} is {}", active.id, active.status),
            });
        }

        let record = self
            .client
            .token_owner_record(&ask.realm, &caller.wallet)
            .await?;
        if record.is_none() {
            return Err(CoreError::ExternalDependency(
                "no token owner record: deposit governance tokens in the DAO first".into(),
            ));
        }

        let address = self
            .client
            .create_proposal(&caller.wallet, &ask.realm, &ask.title, &ask.description)
            .await?;

        let now = unix_now();
        let proposal = FundingProposal {
            id: Uuid::new_v4().simple().to_string(),
            profile_id: caller.user_id.clone(),
            realm: ask.realm,
            requested_amount: ask.requested_amount,
            milestone_allocations: ask.milestone_allocations,
            proposal_address: Some(address.clone()),
            status: FundingStatus::Voting,
            created_at: now,
            updated_at: now,
        };

        // Persistence follows the on-chain call; a failure here must keep
        // the proposal address visible to the caller.
        if let Err(e) = self.store.insert_proposal(proposal.clone()).await {
            return Err(CoreError::Consistency {
                context: format!("proposal created on chain but record write failed: {e}"),
                escrow_address: None,
                signature: Some(address.0),
            });
        }

        info!(proposal = %address, profile = %proposal.profile_id, "funding proposal created");
        Ok(proposal)
    }

    /// Cast a single-choice vote on a proposal.
    ///
    /// Same token-owner-record gate as proposal creation. Chain failures
    /// propagate verbatim for manual retry.
    pub async fn cast_vote(
        &self,
        caller: &Caller,
        realm: &WalletAddress,
        proposal: &ProposalAddress,
        choice: VoteChoice,
    ) -> CoreResult<TxSignature> {
        let record = self
            .client
            .token_owner_record(realm, &caller.wallet)
            .await?;
        if record.is_none() {
            return Err(CoreError::ExternalDependency(
                "no token owner record: deposit governance tokens in the DAO first".into(),
            ));
        }

        let signature = self.client.cast_vote(&caller.wallet, proposal, choice).await?;
        info!(proposal = %proposal, voter = %caller.wallet, "vote cast");
        Ok(signature)
    }
}
