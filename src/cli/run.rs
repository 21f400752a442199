use super::config::{default_config_path, BountydConfig};
use bountyd::escrow::mock::MockEscrowProgram;
use bountyd::escrow::program::EscrowProgram;
use bountyd::governance::mock::MockGovernanceClient;
use bountyd::governance::poller::ProposalPoller;
use bountyd::store::memory::MemoryStore;
use bountyd::store::traits::{BountyStore, ProposalStore};
use bountyd::types::{BountyId, ProgramId};
use bountyd::workflow::CustodyState;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Run the reconciliation service.
///
/// Starts in local development mode (in-memory store, mock chain
/// programs) and runs the periodic repair sweep: every poll interval,
/// each linked non-terminal proposal is reconciled against its on-chain
/// account, and every funding intent stuck in `pending_create` is
/// reported with whether its escrow account exists on chain. A
/// production deployment swaps the mocks for real RPC-backed
/// implementations of the same traits.
///
/// Configuration is loaded from `--config` if provided, otherwise from
/// `~/.local/share/bountyd/config.toml`. A missing config file is
/// generated with defaults.
pub async fn execute(config_path: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path.map(PathBuf::from).unwrap_or_else(default_config_path);

    let config = if config_path.exists() {
        BountydConfig::load(&config_path)?
    } else {
        println!("No config file found. Creating default configuration...");
        BountydConfig::create_default(&config_path, "EscrowProg1111111111111111111111")?;
        println!("   Created: {}", config_path.display());
        BountydConfig::load(&config_path)?
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(config = %config_path.display(), "starting bountyd");

    let store = MemoryStore::new();
    let escrow = MockEscrowProgram::new(ProgramId(config.chain.escrow_program_id.clone()));
    let governance = MockGovernanceClient::new();
    let poller = ProposalPoller::new(governance, store.clone())
        .with_interval(Duration::from_secs(config.poller.interval_secs));

    info!(
        interval_secs = config.poller.interval_secs,
        realm = ?config.chain.governance_realm,
        "reconciliation sweep running; press Ctrl-C to stop"
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(config.poller.interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sweep_once(&poller, &store, &escrow).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                return Ok(());
            }
        }
    }
}

async fn sweep_once(
    poller: &ProposalPoller<MockGovernanceClient, MemoryStore>,
    store: &MemoryStore,
    escrow: &MockEscrowProgram,
) {
    let pending = match store.proposals_pending_reconciliation().await {
        Ok(pending) => pending,
        Err(e) => {
            warn!(error = %e, "could not list pending proposals");
            return;
        }
    };

    let targets: Vec<_> = pending
        .into_iter()
        .filter_map(|p| p.proposal_address.map(|address| (p.id, address)))
        .collect();
    for result in poller.sweep(&targets).await {
        if let Err(e) = result {
            warn!(error = %e, "reconciliation failed for one proposal");
        }
    }

    for (id, funds_moved) in stuck_fundings(store, escrow).await {
        if funds_moved {
            warn!(bounty = %id,
                  "escrow account exists on chain but the record is still \
                   pending_create; the confirm write was lost, repair the record");
        } else {
            warn!(bounty = %id,
                  "funding intent stuck in pending_create with no on-chain \
                   account; safe to clear and re-fund");
        }
    }
}

/// Funding intents left mid-flight, paired with whether the escrow
/// account exists on chain (funds moved) or not (clean crash before the
/// create instruction landed).
async fn stuck_fundings<S: BountyStore, E: EscrowProgram>(
    store: &S,
    escrow: &E,
) -> Vec<(BountyId, bool)> {
    let pending = match store.bounties_pending_reconciliation().await {
        Ok(pending) => pending,
        Err(e) => {
            warn!(error = %e, "could not list pending bounties");
            return vec![];
        }
    };

    let mut stuck = Vec::new();
    for bounty in pending {
        if bounty.custody != CustodyState::PendingCreate {
            continue;
        }
        let funds_moved = escrow.get_account(&bounty.id).await.is_some();
        stuck.push((bounty.id, funds_moved));
    }
    stuck
}
