//! Notification Emitter seam.
//!
//! Every successful transition attempts to notify the affected
//! counterpart. Delivery is someone else's problem; a notification
//! failure must never roll back or block the transition that produced it.

use crate::types::{unix_now, BountyId, TxSignature, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A successful workflow transition, as seen by the notification layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub bounty_id: BountyId,
    pub action: String,
    pub actor: UserId,
    /// Counterpart to inform (claimer for creator actions and vice versa).
    pub recipient: Option<UserId>,
    pub tx_signature: Option<TxSignature>,
    pub occurred_at: u64,
}

impl TransitionEvent {
    pub fn new(bounty_id: BountyId, action: &str, actor: UserId) -> Self {
        Self {
            bounty_id,
            action: action.to_string(),
            actor,
            recipient: None,
            tx_signature: None,
            occurred_at: unix_now(),
        }
    }

    pub fn to(mut self, recipient: Option<UserId>) -> Self {
        self.recipient = recipient;
        self
    }

    pub fn with_signature(mut self, signature: Option<TxSignature>) -> Self {
        self.tx_signature = signature;
        self
    }
}

/// Delivery failure. Logged by the engine, never propagated.
#[derive(Debug, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Notification transport seam.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &TransitionEvent) -> Result<(), NotifyError>;
}

/// Default notifier: structured log line per event.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &TransitionEvent) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| NotifyError(format!("event serialization failed: {e}")))?;
        info!(bounty = %event.bounty_id, action = %event.action, payload = %payload, "transition");
        Ok(())
    }
}

/// Notifier that swallows everything (tests that don't care).
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _event: &TransitionEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Fire a notification and log on failure. The transition has already
/// been persisted by the time this runs.
pub async fn emit_best_effort<N: Notifier>(notifier: &N, event: TransitionEvent) {
    if let Err(e) = notifier.notify(&event).await {
        warn!(bounty = %event.bounty_id, action = %event.action, error = %e,
              "notification failed; transition unaffected");
    }
}
