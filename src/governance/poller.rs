//! Polling reconciliation of governance outcomes.
//!
//! While a linked proposal is non-terminal its on-chain account is polled
//! on a fixed interval. On reaching a terminal state the outcome is
//! written into the local record exactly once: the write is a CAS against
//! the status read moments before, so racing pollers (multiple open
//! sessions) collapse to one persisted write and the losers skip quietly.

use crate::error::{CoreError, CoreResult};
use crate::governance::traits::GovernanceClient;
use crate::governance::types::{funding_outcome, FundingStatus, ProposalAddress};
use crate::store::traits::{ProposalStore, StoreError};
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default poll interval. Tens of seconds: fast enough to feel live,
/// slow enough to be polite to the RPC endpoint.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Outcome of a single reconciliation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Proposal still voting; nothing to write.
    StillVoting,
    /// Terminal outcome written to the local record.
    Updated(FundingStatus),
    /// Another poller already wrote the same outcome; skipped.
    AlreadySynced,
    /// Proposal account no longer observed on chain.
    Gone,
}

/// Fixed-interval poller for linked governance proposals.
pub struct ProposalPoller<G, S> {
    client: G,
    store: S,
    interval: Duration,
}

impl<G: GovernanceClient, S: ProposalStore> ProposalPoller<G, S> {
    pub fn new(client: G, store: S) -> Self {
        Self {
            client,
            store,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Reconcile one funding proposal against its on-chain account.
    ///
    /// Idempotent: re-reads the local record first and skips the write if
    /// the outcome already matches; a CAS miss (lost race) is also a skip.
    pub async fn reconcile_once(
        &self,
        proposal_id: &str,
        address: &ProposalAddress,
    ) -> CoreResult<ReconcileOutcome> {
        let account = match self.client.proposal_account(address).await? {
            Some(account) => account,
            None => {
                warn!(proposal = %address, "proposal account no longer observed");
                return Ok(ReconcileOutcome::Gone);
            }
        };

        let target = match funding_outcome(account.state) {
            Some(target) => target,
            None => return Ok(ReconcileOutcome::StillVoting),
        };

        // Re-read before writing: multiple independent pollers may race
        // to perform the same sync.
        let local = self.store.get_proposal(proposal_id).await?;
        if local.status == target {
            debug!(proposal = %address, status = %target, "already synced, skipping");
            return Ok(ReconcileOutcome::AlreadySynced);
        }

        match self
            .store
            .update_proposal_status_if(proposal_id, local.status, target)
            .await
        {
            Ok(_) => {
                info!(proposal = %address, outcome = %target, "governance outcome reconciled");
                Ok(ReconcileOutcome::Updated(target))
            }
            // Lost the race to another poller writing the same outcome.
            Err(StoreError::Conflict { .. }) => Ok(ReconcileOutcome::AlreadySynced),
            Err(e) => Err(CoreError::Store(e)),
        }
    }

    /// Poll one proposal until it finalizes or disappears.
    ///
    /// Cancelled by dropping the task; no server-side cleanup is needed
    /// beyond that.
    pub async fn run(&self, proposal_id: &str, address: &ProposalAddress) -> CoreResult<()> {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            match self.reconcile_once(proposal_id, address).await {
                Ok(ReconcileOutcome::StillVoting) => continue,
                Ok(ReconcileOutcome::Updated(_))
                | Ok(ReconcileOutcome::AlreadySynced)
                | Ok(ReconcileOutcome::Gone) => return Ok(()),
                // Transient read failures keep the loop alive; the next
                // tick retries the read (reads are idempotent, unlike
                // vote submissions).
                Err(CoreError::Chain(e)) => {
                    warn!(proposal = %address, error = %e, "poll failed, will retry");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One reconciliation pass over a batch of linked proposals
    /// (periodic repair sweep, independent of per-proposal pollers).
    pub async fn sweep(&self, targets: &[(String, ProposalAddress)]) -> Vec<CoreResult<ReconcileOutcome>> {
        join_all(
            targets
                .iter()
                .map(|(id, address)| self.reconcile_once(id, address)),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governance::mock::MockGovernanceClient;
    use crate::governance::types::{FundingProposal, ProposalAccount, ProposalState};
    use crate::store::memory::MemoryStore;
    use crate::types::{unix_now, UserId, WalletAddress};

    async fn seed(
        client: &MockGovernanceClient,
        store: &MemoryStore,
        state: ProposalState,
    ) -> (String, ProposalAddress) {
        let address = ProposalAddress("proposal-1".into());
        client.put_proposal(ProposalAccount {
            address: address.clone(),
            realm: WalletAddress("realm".into()),
            state,
            yes_weight: 10,
            no_weight: 2,
            voting_ends_at: unix_now() + 60,
        });

        let proposal = FundingProposal {
            id: "fp-1".into(),
            profile_id: UserId("alice".into()),
            realm: WalletAddress("realm".into()),
            requested_amount: 100,
            milestone_allocations: vec![],
            proposal_address: Some(address.clone()),
            status: FundingStatus::Voting,
            created_at: unix_now(),
            updated_at: unix_now(),
        };
        store.insert_proposal(proposal).await.unwrap();

        ("fp-1".into(), address)
    }

    fn poller(
        client: &MockGovernanceClient,
        store: &MemoryStore,
    ) -> ProposalPoller<MockGovernanceClient, MemoryStore> {
        ProposalPoller::new(client.clone(), store.clone())
            .with_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_non_terminal_state_is_not_written() {
        let client = MockGovernanceClient::new();
        let store = MemoryStore::new();
        let (id, address) = seed(&client, &store, ProposalState::Voting).await;
        let writes_before = store.proposal_write_count();

        let outcome = poller(&client, &store)
            .reconcile_once(&id, &address)
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::StillVoting);
        assert_eq!(store.proposal_write_count(), writes_before);
    }

    #[tokio::test]
    async fn test_terminal_state_written_once() {
        let client = MockGovernanceClient::new();
        let store = MemoryStore::new();
        let (id, address) = seed(&client, &store, ProposalState::Succeeded).await;
        let p = poller(&client, &store);

        let first = p.reconcile_once(&id, &address).await.unwrap();
        assert_eq!(first, ReconcileOutcome::Updated(FundingStatus::Accepted));
        let writes_after_first = store.proposal_write_count();

        // Second identical sync is a no-op.
        let second = p.reconcile_once(&id, &address).await.unwrap();
        assert_eq!(second, ReconcileOutcome::AlreadySynced);
        assert_eq!(store.proposal_write_count(), writes_after_first);
    }

    #[tokio::test]
    async fn test_defeated_maps_to_rejected() {
        let client = MockGovernanceClient::new();
        let store = MemoryStore::new();
        let (id, address) = seed(&client, &store, ProposalState::Defeated).await;

        let outcome = poller(&client, &store)
            .reconcile_once(&id, &address)
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Updated(FundingStatus::Rejected));
        let stored = store.get_proposal(&id).await.unwrap();
        assert_eq!(stored.status, FundingStatus::Rejected);
    }

    #[tokio::test]
    async fn test_missing_account_reports_gone() {
        let client = MockGovernanceClient::new();
        let store = MemoryStore::new();
        let (id, _) = seed(&client, &store, ProposalState::Voting).await;

        let outcome = poller(&client, &store)
            .reconcile_once(&id, &ProposalAddress("unknown".into()))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Gone);
    }

    #[tokio::test]
    async fn test_run_terminates_on_finalization() {
        let client = MockGovernanceClient::new();
        let store = MemoryStore::new();
        let (id, address) = seed(&client, &store, ProposalState::Voting).await;
        let p = poller(&client, &store);

        let handle = {
            let client = client.clone();
            let address2 = address.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                client.set_proposal_state(&address2, ProposalState::Completed);
            })
        };

        p.run(&id, &address).await.unwrap();
        handle.await.unwrap();

        let stored = store.get_proposal(&id).await.unwrap();
        assert_eq!(stored.status, FundingStatus::Funded);
    }

    #[tokio::test]
    async fn test_racing_pollers_one_write() {
        let client = MockGovernanceClient::new();
        let store = MemoryStore::new();
        let (id, address) = seed(&client, &store, ProposalState::Succeeded).await;
        let writes_before = store.proposal_write_count();

        let p1 = poller(&client, &store);
        let p2 = poller(&client, &store);
        let (r1, r2) = tokio::join!(
            p1.reconcile_once(&id, &address),
            p2.reconcile_once(&id, &address),
        );
        r1.unwrap();
        r2.unwrap();

        // Exactly one persisted write between the two racers.
        assert_eq!(store.proposal_write_count(), writes_before + 1);
    }

    #[tokio::test]
    async fn test_sweep_reconciles_batch() {
        let client = MockGovernanceClient::new();
        let store = MemoryStore::new();
        let (id, address) = seed(&client, &store, ProposalState::Succeeded).await;

        let results = poller(&client, &store)
            .sweep(&[(id.clone(), address)])
            .await;
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Ok(ReconcileOutcome::Updated(FundingStatus::Accepted))
        ));
    }
}
