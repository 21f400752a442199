//! The Bounty Workflow Engine.
//!
//! Request-triggered, stateless handlers: each operation loads the record,
//! computes the caller's role, asks [`transition`] whether the action is
//! legal, performs any on-chain call, and only then persists — via a CAS
//! keyed on the state it read. Failure policy:
//!
//! - validation / authorization / state-conflict failures abort before
//!   any mutation, local or on-chain;
//! - the on-chain call always precedes the local write;
//! - on-chain success followed by a persistence failure is a
//!   ConsistencyError carrying the on-chain artifacts, never swallowed.

use crate::error::{CoreError, CoreResult};
use crate::escrow::program::{CreateEscrowArgs, EscrowProgram};
use crate::governance::types::ProposalAddress;
use crate::lockout::OwnershipLockout;
use crate::notify::{emit_best_effort, Notifier, TransitionEvent};
use crate::store::traits::{BountyStore, StoreError};
use crate::types::{unix_now, BountyId, Caller, TxSignature, UserId, WalletAddress};
use crate::workflow::state::{
    transition, Action, Bounty, CustodyState, TransitionError, WorkflowStatus,
};
use tracing::{info, warn};

/// Who may release the escrowed funds.
///
/// Two-tier trust model: a governance program-derived address for DAOs
/// with active token-holder governance, or the creator's own key for solo
/// creators (DAO-less fallback).
#[derive(Debug, Clone)]
pub enum AuthorityChoice {
    Governance(WalletAddress),
    CreatorFallback,
}

/// Input for creating a bounty.
#[derive(Debug, Clone)]
pub struct NewBounty {
    pub dao_address: WalletAddress,
    pub title: String,
    pub description: String,
    pub reward_amount: u64,
}

/// The lifecycle engine. Generic over the datastore, the escrow program,
/// and the notifier so it is testable without a live wallet or RPC
/// endpoint.
pub struct BountyEngine<S, E, N> {
    store: S,
    escrow: E,
    notifier: N,
    lockout: OwnershipLockout,
}

impl<S, E, N> BountyEngine<S, E, N>
where
    S: BountyStore,
    E: EscrowProgram,
    N: Notifier,
{
    pub fn new(store: S, escrow: E, notifier: N) -> Self {
        Self {
            store,
            escrow,
            notifier,
            lockout: OwnershipLockout::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn lockout(&self) -> &OwnershipLockout {
        &self.lockout
    }

    /// Create a bounty in status `open`.
    pub async fn create(&self, caller: &Caller, input: NewBounty) -> CoreResult<Bounty> {
        if input.title.trim().is_empty() {
            return Err(CoreError::Validation("title is empty".into()));
        }
        if input.reward_amount == 0 {
            return Err(CoreError::Validation("reward amount must be positive".into()));
        }

        let bounty = Bounty {
            id: BountyId::generate(),
            dao_address: input.dao_address,
            title: input.title,
            description: input.description,
            reward_amount: input.reward_amount,
            status: WorkflowStatus::Open,
            custody: CustodyState::Unfunded,
            creator_id: caller.user_id.clone(),
            creator_wallet: caller.wallet.clone(),
            claimer_id: None,
            claimer_wallet: None,
            evidence_summary: None,
            evidence_links: vec![],
            escrow_address: None,
            escrow_tx_signature: None,
            authority_address: None,
            proposal_address: None,
            release_tx_signature: None,
            created_at: unix_now(),
            claimed_at: None,
            submitted_at: None,
            resolved_at: None,
            funded_at: None,
            paid_at: None,
        };
        self.store.insert_bounty(bounty.clone()).await?;

        info!(bounty = %bounty.id, creator = %caller.user_id, "bounty created");
        Ok(bounty)
    }

    /// Claim an open bounty. Caller must not be the creator and must not
    /// be locked out of ownership verification for this record.
    pub async fn claim(&self, caller: &Caller, id: &BountyId) -> CoreResult<Bounty> {
        let bounty = self.store.get_bounty(id).await?;

        let standing = self.lockout.check(&bounty.creator_id, &caller.wallet);
        if standing.is_permanent_ban {
            return Err(CoreError::Authorization(
                "wallet is permanently blocked from ownership verification".into(),
            ));
        }

        let mut updated = self
            .apply(&bounty, Action::Claim, caller)
            .map(|(w, c)| {
                let mut b = bounty.clone();
                b.status = w;
                b.custody = c;
                b
            })?;
        updated.claimer_id = Some(caller.user_id.clone());
        updated.claimer_wallet = Some(caller.wallet.clone());
        updated.claimed_at = Some(unix_now());

        let stored = self.persist(&bounty, updated).await?;
        self.emit(&stored, Action::Claim, caller, Some(stored.creator_id.clone()), None)
            .await;
        Ok(stored)
    }

    /// Submit evidence for a claimed bounty. Caller must be the claimer.
    pub async fn submit(
        &self,
        caller: &Caller,
        id: &BountyId,
        summary: &str,
        links: Vec<String>,
    ) -> CoreResult<Bounty> {
        if summary.trim().is_empty() {
            return Err(CoreError::Validation("evidence summary is empty".into()));
        }

        let bounty = self.store.get_bounty(id).await?;
        let mut updated = self.apply_to(&bounty, Action::Submit, caller)?;
        updated.evidence_summary = Some(summary.to_string());
        updated.evidence_links = links;
        updated.submitted_at = Some(unix_now());

        let stored = self.persist(&bounty, updated).await?;
        self.emit(&stored, Action::Submit, caller, Some(stored.creator_id.clone()), None)
            .await;
        Ok(stored)
    }

    /// Approve submitted work. Caller must be the creator.
    pub async fn approve(&self, caller: &Caller, id: &BountyId) -> CoreResult<Bounty> {
        let bounty = self.store.get_bounty(id).await?;
        let mut updated = self.apply_to(&bounty, Action::Approve, caller)?;
        updated.resolved_at = Some(unix_now());

        let stored = self.persist(&bounty, updated).await?;
        self.emit(&stored, Action::Approve, caller, stored.claimer_id.clone(), None)
            .await;
        Ok(stored)
    }

    /// Reject submitted work. Terminal; no funds are involved.
    pub async fn reject(&self, caller: &Caller, id: &BountyId) -> CoreResult<Bounty> {
        let bounty = self.store.get_bounty(id).await?;
        let mut updated = self.apply_to(&bounty, Action::Reject, caller)?;
        updated.resolved_at = Some(unix_now());

        let stored = self.persist(&bounty, updated).await?;
        self.emit(&stored, Action::Reject, caller, stored.claimer_id.clone(), None)
            .await;
        Ok(stored)
    }

    /// Fund the escrow for an approved bounty.
    ///
    /// Records the intent (`pending_create`), performs the on-chain
    /// create, then confirms. Does not change workflow status: custody is
    /// tracked on its own axis.
    pub async fn fund(
        &self,
        caller: &Caller,
        id: &BountyId,
        authority: AuthorityChoice,
    ) -> CoreResult<Bounty> {
        let bounty = self.store.get_bounty(id).await?;

        let authority_address = match authority {
            AuthorityChoice::Governance(address) => address,
            AuthorityChoice::CreatorFallback => caller.wallet.clone(),
        };

        // Intent first: a crash between the chain call and the confirm
        // write leaves a visible pending_create marker.
        let mut pending = self.apply_to(&bounty, Action::BeginFund, caller)?;
        let claimer_wallet = bounty
            .claimer_wallet
            .clone()
            .ok_or_else(|| CoreError::Validation("bounty has no claimer wallet".into()))?;
        pending.authority_address = Some(authority_address.clone());
        let pending = self.persist(&bounty, pending).await?;

        let args = CreateEscrowArgs {
            bounty_id: bounty.id.clone(),
            claimer: claimer_wallet,
            authority: authority_address,
            dao_address: bounty.dao_address.clone(),
            reward_amount: bounty.reward_amount,
        };

        let (address, signature) = match self.escrow.create_escrow(&caller.wallet, args).await {
            Ok(confirmed) => confirmed,
            Err(chain_err) => {
                // No funds moved; clear the intent so funding can be
                // retried fresh. If even the revert write fails, the
                // pending marker stays behind for the repair sweep.
                let mut reverted = pending.clone();
                let (w, c) = transition(
                    pending.status,
                    pending.custody,
                    Action::AbortFund,
                    crate::workflow::state::ActorRole::creator(),
                )
                .map_err(|e| CoreError::Validation(e.to_string()))?;
                reverted.status = w;
                reverted.custody = c;
                reverted.authority_address = None;
                if let Err(revert_err) = self
                    .store
                    .update_bounty_if((pending.status, pending.custody), reverted)
                    .await
                {
                    warn!(bounty = %bounty.id, error = %revert_err,
                          "funding intent revert failed; pending marker left for repair");
                }
                return Err(chain_err.into());
            }
        };

        // Funds have moved. From here on, any persistence failure is a
        // consistency error carrying the on-chain artifacts.
        let mut funded = pending.clone();
        let (w, c) = transition(
            pending.status,
            pending.custody,
            Action::ConfirmFund,
            crate::workflow::state::ActorRole::creator(),
        )
        .map_err(|e| CoreError::Consistency {
            context: format!("escrow created on chain but confirm transition refused: {e}"),
            escrow_address: Some(address.to_string()),
            signature: Some(signature.0.clone()),
        })?;
        funded.status = w;
        funded.custody = c;
        funded.escrow_address = Some(address);
        funded.escrow_tx_signature = Some(signature.clone());
        funded.funded_at = Some(unix_now());

        let stored = self
            .store
            .update_bounty_if((pending.status, pending.custody), funded)
            .await
            .map_err(|e| CoreError::Consistency {
                context: format!("escrow created on chain but record write failed: {e}"),
                escrow_address: Some(address.to_string()),
                signature: Some(signature.0.clone()),
            })?;

        info!(bounty = %stored.id, escrow = %address, "escrow funded");
        self.emit(&stored, Action::ConfirmFund, caller, stored.claimer_id.clone(),
                  Some(signature))
            .await;
        Ok(stored)
    }

    /// Attach an externally-created governance proposal address. Enables
    /// the bridge's polling loop for this bounty.
    pub async fn link_proposal(
        &self,
        caller: &Caller,
        id: &BountyId,
        proposal: ProposalAddress,
    ) -> CoreResult<Bounty> {
        if proposal.0.trim().is_empty() {
            return Err(CoreError::Validation("proposal address is empty".into()));
        }

        let bounty = self.store.get_bounty(id).await?;
        let mut updated = self.apply_to(&bounty, Action::LinkProposal, caller)?;
        updated.proposal_address = Some(proposal);

        let stored = self.persist(&bounty, updated).await?;
        self.emit(&stored, Action::LinkProposal, caller, stored.claimer_id.clone(), None)
            .await;
        Ok(stored)
    }

    /// Release the escrowed reward to the claimer. The caller's wallet
    /// must be the recorded authority (governance-derived or fallback).
    pub async fn release(&self, caller: &Caller, id: &BountyId) -> CoreResult<Bounty> {
        let bounty = self.store.get_bounty(id).await?;
        let claimer_wallet = bounty
            .claimer_wallet
            .clone()
            .ok_or_else(|| CoreError::Validation("bounty has no claimer wallet".into()))?;

        let mut updated = self.apply_to(&bounty, Action::Release, caller)?;

        let signature = self
            .escrow
            .release_escrow(&caller.wallet, &bounty.id, &claimer_wallet)
            .await?;

        updated.release_tx_signature = Some(signature.clone());
        let stored = self
            .store
            .update_bounty_if((bounty.status, bounty.custody), updated)
            .await
            .map_err(|e| CoreError::Consistency {
                context: format!("escrow released on chain but record write failed: {e}"),
                escrow_address: bounty.escrow_address.map(|a| a.to_string()),
                signature: Some(signature.0.clone()),
            })?;

        info!(bounty = %stored.id, signature = %signature, "escrow released");
        self.emit(&stored, Action::Release, caller, stored.claimer_id.clone(),
                  Some(signature))
            .await;
        Ok(stored)
    }

    /// Cancel the escrow and return funds to the creator. Allowed in any
    /// workflow status while custody is not finalized on chain.
    pub async fn cancel_escrow(&self, caller: &Caller, id: &BountyId) -> CoreResult<Bounty> {
        let bounty = self.store.get_bounty(id).await?;
        let updated = self.apply_to(&bounty, Action::CancelEscrow, caller)?;

        let signature = self.escrow.cancel_escrow(&caller.wallet, &bounty.id).await?;

        let stored = self
            .store
            .update_bounty_if((bounty.status, bounty.custody), updated)
            .await
            .map_err(|e| CoreError::Consistency {
                context: format!("escrow cancelled on chain but record write failed: {e}"),
                escrow_address: bounty.escrow_address.map(|a| a.to_string()),
                signature: Some(signature.0.clone()),
            })?;

        info!(bounty = %stored.id, "escrow cancelled");
        self.emit(&stored, Action::CancelEscrow, caller, stored.claimer_id.clone(),
                  Some(signature))
            .await;
        Ok(stored)
    }

    /// Mark the bounty paid after a successful on-chain release. Verified
    /// by signature presence on the record, not re-derived from chain.
    pub async fn mark_paid(&self, caller: &Caller, id: &BountyId) -> CoreResult<Bounty> {
        let bounty = self.store.get_bounty(id).await?;
        if bounty.release_tx_signature.is_none() {
            return Err(CoreError::Validation(
                "no release transaction recorded for this bounty".into(),
            ));
        }

        let mut updated = self.apply_to(&bounty, Action::MarkPaid, caller)?;
        updated.paid_at = Some(unix_now());

        let stored = self.persist(&bounty, updated).await?;
        self.emit(&stored, Action::MarkPaid, caller, stored.claimer_id.clone(),
                  stored.release_tx_signature.clone())
            .await;
        Ok(stored)
    }

    /// Record a failed wallet-ownership proof against this bounty's
    /// creator (called by the external verification flow).
    pub fn record_ownership_failure(
        &self,
        subject: &UserId,
        wallet: &WalletAddress,
    ) -> crate::lockout::LockoutStanding {
        self.lockout.record_failure(subject, wallet)
    }

    // Compute role and run the transition function; map refusals to the
    // error taxonomy.
    fn apply(
        &self,
        bounty: &Bounty,
        action: Action,
        caller: &Caller,
    ) -> CoreResult<(WorkflowStatus, CustodyState)> {
        let role = bounty.role_of(&caller.user_id, &caller.wallet);
        transition(bounty.status, bounty.custody, action, role).map_err(|e| match e {
            TransitionError::Role { .. } => CoreError::Authorization(e.to_string()),
            TransitionError::State { workflow, custody, action } => CoreError::StateConflict {
                expected: format!("state accepting `{action}`"),
                actual: format!("({workflow}, {custody})"),
            },
        })
    }

    // `apply` plus building the updated record.
    fn apply_to(&self, bounty: &Bounty, action: Action, caller: &Caller) -> CoreResult<Bounty> {
        let (w, c) = self.apply(bounty, action, caller)?;
        let mut updated = bounty.clone();
        updated.status = w;
        updated.custody = c;
        Ok(updated)
    }

    // CAS against the state the operation read; a miss means a concurrent
    // writer got there first.
    async fn persist(&self, read: &Bounty, updated: Bounty) -> CoreResult<Bounty> {
        match self
            .store
            .update_bounty_if((read.status, read.custody), updated)
            .await
        {
            Ok(stored) => Ok(stored),
            Err(StoreError::Conflict { expected, actual }) => {
                Err(CoreError::StateConflict { expected, actual })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn emit(
        &self,
        bounty: &Bounty,
        action: Action,
        caller: &Caller,
        recipient: Option<UserId>,
        signature: Option<TxSignature>,
    ) {
        let event = TransitionEvent::new(bounty.id.clone(), action.name(), caller.user_id.clone())
            .to(recipient)
            .with_signature(signature);
        emit_best_effort(&self.notifier, event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainError;
    use crate::escrow::mock::MockEscrowProgram;
    use crate::escrow::program::EscrowProgramError;
    use crate::notify::NoopNotifier;
    use crate::store::memory::MemoryStore;
    use crate::types::ProgramId;

    type TestEngine = BountyEngine<MemoryStore, MockEscrowProgram, NoopNotifier>;

    fn engine() -> (TestEngine, MockEscrowProgram) {
        let escrow = MockEscrowProgram::new(ProgramId("EscrowProg1111111111111111111111".into()));
        let e = BountyEngine::new(MemoryStore::new(), escrow.clone(), NoopNotifier);
        (e, escrow)
    }

    fn creator() -> Caller {
        Caller::new("creator", "creator-wallet")
    }

    fn claimer() -> Caller {
        Caller::new("worker", "worker-wallet")
    }

    fn new_bounty(reward: u64) -> NewBounty {
        NewBounty {
            dao_address: WalletAddress("dao".into()),
            title: "fix the parser".into(),
            description: "it breaks on unicode".into(),
            reward_amount: reward,
        }
    }

    async fn approved_bounty(e: &TestEngine) -> Bounty {
        let b = e.create(&creator(), new_bounty(10)).await.unwrap();
        e.claim(&claimer(), &b.id).await.unwrap();
        e.submit(&claimer(), &b.id, "done", vec!["https://pr".into()])
            .await
            .unwrap();
        e.approve(&creator(), &b.id).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let (e, _) = engine();
        assert!(matches!(
            e.create(&creator(), NewBounty { title: "  ".into(), ..new_bounty(10) })
                .await,
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            e.create(&creator(), new_bounty(0)).await,
            Err(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_creator_cannot_claim_own_bounty() {
        let (e, _) = engine();
        let b = e.create(&creator(), new_bounty(10)).await.unwrap();
        let err = e.claim(&creator(), &b.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_claim_sets_claimer_fields() {
        let (e, _) = engine();
        let b = e.create(&creator(), new_bounty(10)).await.unwrap();
        let claimed = e.claim(&claimer(), &b.id).await.unwrap();
        assert_eq!(claimed.status, WorkflowStatus::Claimed);
        assert_eq!(claimed.claimer_id, Some(UserId("worker".into())));
        assert_eq!(claimed.claimer_wallet, Some(WalletAddress("worker-wallet".into())));
        assert!(claimed.claimed_at.is_some());
    }

    #[tokio::test]
    async fn test_claim_blocked_for_banned_wallet() {
        let (e, _) = engine();
        let b = e.create(&creator(), new_bounty(10)).await.unwrap();
        for _ in 0..5 {
            e.record_ownership_failure(&UserId("creator".into()), &claimer().wallet);
        }
        let err = e.claim(&claimer(), &b.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_summary() {
        let (e, _) = engine();
        let b = e.create(&creator(), new_bounty(10)).await.unwrap();
        e.claim(&claimer(), &b.id).await.unwrap();
        let err = e.submit(&claimer(), &b.id, "   ", vec![]).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_approve_before_submit_is_state_conflict() {
        let (e, _) = engine();
        let b = e.create(&creator(), new_bounty(10)).await.unwrap();
        e.claim(&claimer(), &b.id).await.unwrap();
        let err = e.approve(&creator(), &b.id).await.unwrap_err();
        assert!(matches!(err, CoreError::StateConflict { .. }));
    }

    #[tokio::test]
    async fn test_reject_is_terminal() {
        let (e, _) = engine();
        let b = e.create(&creator(), new_bounty(10)).await.unwrap();
        e.claim(&claimer(), &b.id).await.unwrap();
        e.submit(&claimer(), &b.id, "done", vec![]).await.unwrap();
        let rejected = e.reject(&creator(), &b.id).await.unwrap();
        assert_eq!(rejected.status, WorkflowStatus::Rejected);

        let err = e.approve(&creator(), &b.id).await.unwrap_err();
        assert!(matches!(err, CoreError::StateConflict { .. }));
    }

    #[tokio::test]
    async fn test_fund_sets_escrow_fields_not_status() {
        let (e, escrow) = engine();
        escrow.credit(&creator().wallet, 100);
        let b = approved_bounty(&e).await;

        let funded = e
            .fund(&creator(), &b.id, AuthorityChoice::CreatorFallback)
            .await
            .unwrap();
        assert_eq!(funded.status, WorkflowStatus::Approved);
        assert_eq!(funded.custody, CustodyState::Escrowed);
        assert!(funded.escrow_address.is_some());
        assert!(funded.escrow_tx_signature.is_some());
        assert_eq!(funded.authority_address, Some(creator().wallet));
        assert_eq!(escrow.balance_of(&creator().wallet), 90);
    }

    #[tokio::test]
    async fn test_fund_twice_is_state_conflict() {
        let (e, escrow) = engine();
        escrow.credit(&creator().wallet, 100);
        let b = approved_bounty(&e).await;
        e.fund(&creator(), &b.id, AuthorityChoice::CreatorFallback)
            .await
            .unwrap();

        let err = e
            .fund(&creator(), &b.id, AuthorityChoice::CreatorFallback)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::StateConflict { .. }));
    }

    #[tokio::test]
    async fn test_fund_requires_creator() {
        let (e, _) = engine();
        let b = approved_bounty(&e).await;
        let err = e
            .fund(&claimer(), &b.id, AuthorityChoice::CreatorFallback)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_fund_chain_failure_reverts_intent() {
        let (e, escrow) = engine();
        escrow.credit(&creator().wallet, 10);
        let b = approved_bounty(&e).await;
        escrow.set_offline(true);

        let err = e
            .fund(&creator(), &b.id, AuthorityChoice::CreatorFallback)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Chain(ChainError::Unavailable(_))));

        // Intent cleared; funding can be retried fresh.
        let current = e.store().get_bounty(&b.id).await.unwrap();
        assert_eq!(current.custody, CustodyState::Unfunded);
        assert!(current.escrow_address.is_none());

        escrow.set_offline(false);
        e.fund(&creator(), &b.id, AuthorityChoice::CreatorFallback)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fund_insufficient_balance_reverts_intent() {
        let (e, escrow) = engine();
        let b = approved_bounty(&e).await;

        // The creator was never credited: the create instruction fails in
        // simulation, no funds move, and the intent is cleared.
        let err = e
            .fund(&creator(), &b.id, AuthorityChoice::CreatorFallback)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Chain(ChainError::Unavailable(_))));

        let current = e.store().get_bounty(&b.id).await.unwrap();
        assert_eq!(current.custody, CustodyState::Unfunded);
        assert!(current.escrow_address.is_none());
        assert_eq!(escrow.balance_of(&creator().wallet), 0);
    }

    #[tokio::test]
    async fn test_release_by_authority_pays_claimer() {
        let (e, escrow) = engine();
        escrow.credit(&creator().wallet, 100);
        let b = approved_bounty(&e).await;
        let authority = Caller::new("dao-exec", "authority-wallet");
        e.fund(
            &creator(),
            &b.id,
            AuthorityChoice::Governance(authority.wallet.clone()),
        )
        .await
        .unwrap();

        let released = e.release(&authority, &b.id).await.unwrap();
        assert_eq!(released.custody, CustodyState::Released);
        assert!(released.release_tx_signature.is_some());
        assert_eq!(escrow.balance_of(&claimer().wallet), 10);
    }

    #[tokio::test]
    async fn test_release_by_wrong_wallet_rejected() {
        let (e, escrow) = engine();
        escrow.credit(&creator().wallet, 100);
        let b = approved_bounty(&e).await;
        e.fund(
            &creator(),
            &b.id,
            AuthorityChoice::Governance(WalletAddress("authority-wallet".into())),
        )
        .await
        .unwrap();

        let intruder = Caller::new("intruder", "intruder-wallet");
        let err = e.release(&intruder, &b.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_fallback_release_by_creator() {
        let (e, escrow) = engine();
        escrow.credit(&creator().wallet, 100);
        let b = approved_bounty(&e).await;
        e.fund(&creator(), &b.id, AuthorityChoice::CreatorFallback)
            .await
            .unwrap();

        // In fallback mode the creator's wallet is the authority, but the
        // role check still works off the authority address.
        let released = e.release(&creator(), &b.id).await.unwrap();
        assert_eq!(released.custody, CustodyState::Released);
    }

    #[tokio::test]
    async fn test_cancel_returns_funds() {
        let (e, escrow) = engine();
        escrow.credit(&creator().wallet, 100);
        let b = approved_bounty(&e).await;
        e.fund(&creator(), &b.id, AuthorityChoice::CreatorFallback)
            .await
            .unwrap();
        assert_eq!(escrow.balance_of(&creator().wallet), 90);

        let cancelled = e.cancel_escrow(&creator(), &b.id).await.unwrap();
        assert_eq!(cancelled.custody, CustodyState::Cancelled);
        assert_eq!(escrow.balance_of(&creator().wallet), 100);
    }

    #[tokio::test]
    async fn test_cancel_after_release_rejected() {
        let (e, escrow) = engine();
        escrow.credit(&creator().wallet, 100);
        let b = approved_bounty(&e).await;
        e.fund(&creator(), &b.id, AuthorityChoice::CreatorFallback)
            .await
            .unwrap();
        e.release(&creator(), &b.id).await.unwrap();

        let err = e.cancel_escrow(&creator(), &b.id).await.unwrap_err();
        assert!(matches!(err, CoreError::StateConflict { .. }));
    }

    #[tokio::test]
    async fn test_mark_paid_requires_release_signature() {
        let (e, escrow) = engine();
        escrow.credit(&creator().wallet, 100);
        let b = approved_bounty(&e).await;
        e.fund(&creator(), &b.id, AuthorityChoice::CreatorFallback)
            .await
            .unwrap();

        let err = e.mark_paid(&creator(), &b.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        e.release(&creator(), &b.id).await.unwrap();
        let paid = e.mark_paid(&creator(), &b.id).await.unwrap();
        assert_eq!(paid.status, WorkflowStatus::Paid);
        assert!(paid.paid_at.is_some());
    }

    #[tokio::test]
    async fn test_link_proposal_requires_approved() {
        let (e, _) = engine();
        let b = e.create(&creator(), new_bounty(10)).await.unwrap();
        let err = e
            .link_proposal(&creator(), &b.id, ProposalAddress("prop".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::StateConflict { .. }));
    }

    #[tokio::test]
    async fn test_link_proposal_attaches_address() {
        let (e, _) = engine();
        let b = approved_bounty(&e).await;
        let linked = e
            .link_proposal(&creator(), &b.id, ProposalAddress("prop".into()))
            .await
            .unwrap();
        assert_eq!(linked.proposal_address, Some(ProposalAddress("prop".into())));
        assert_eq!(linked.status, WorkflowStatus::Approved);
    }

    #[tokio::test]
    async fn test_escrow_self_escrow_propagates_program_code() {
        let (e, escrow) = engine();
        escrow.credit(&creator().wallet, 100);

        // Force claimer wallet == creator wallet.
        let b = e.create(&creator(), new_bounty(10)).await.unwrap();
        let self_claimer = Caller::new("worker", "creator-wallet");
        e.claim(&self_claimer, &b.id).await.unwrap();
        e.submit(&self_claimer, &b.id, "done", vec![]).await.unwrap();
        e.approve(&creator(), &b.id).await.unwrap();

        let err = e
            .fund(&creator(), &b.id, AuthorityChoice::CreatorFallback)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Chain(ChainError::Escrow(EscrowProgramError::SelfEscrow))
        ));
    }
}
