//! Ownership Lockout Guard.
//!
//! Rate-limits and eventually permanently blocks repeated failed
//! wallet-ownership proofs per (subject, wallet) pair. Advisory state:
//! the guard never errors for its own sake; callers (e.g. the claim
//! authorization path) consult it to decide whether to proceed.
//!
//! The increment is a single-lock read-modify-write. A naive read-then-
//! write under concurrent failing requests can under-count and let an
//! attacker slip past the ban threshold.

use crate::types::{unix_now, UserId, WalletAddress};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Failures at which the warning message starts escalating.
pub const WARN_THRESHOLD: u32 = 3;

/// Failures at which the pair is permanently banned.
pub const BAN_THRESHOLD: u32 = 5;

/// Persistent lockout state for one (subject, wallet) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutEntry {
    pub attempt_count: u32,
    pub first_attempt_at: u64,
    pub last_attempt_at: u64,
    /// Set exactly once when attempt_count reaches the ban threshold.
    /// Never reverts.
    pub is_permanent_ban: bool,
}

/// Snapshot returned to callers: current standing plus an optional
/// escalating warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutStanding {
    pub attempt_count: u32,
    pub is_permanent_ban: bool,
    pub warning: Option<String>,
}

impl LockoutStanding {
    fn clean() -> Self {
        Self {
            attempt_count: 0,
            is_permanent_ban: false,
            warning: None,
        }
    }

    fn from_entry(entry: &LockoutEntry) -> Self {
        let warning = if entry.is_permanent_ban {
            Some(
                "this wallet is permanently blocked from ownership verification \
                 for this account"
                    .to_string(),
            )
        } else if entry.attempt_count >= WARN_THRESHOLD {
            // This arm starts at WARN_THRESHOLD, so the count is always
            // plural.
            let remaining = BAN_THRESHOLD.saturating_sub(entry.attempt_count);
            Some(format!(
                "{} failed verification attempts; {} more will permanently block \
                 this wallet",
                entry.attempt_count, remaining,
            ))
        } else {
            None
        };

        Self {
            attempt_count: entry.attempt_count,
            is_permanent_ban: entry.is_permanent_ban,
            warning,
        }
    }
}

/// Guard over repeated failed ownership proofs.
#[derive(Debug, Clone, Default)]
pub struct OwnershipLockout {
    state: Arc<Mutex<HashMap<(UserId, WalletAddress), LockoutEntry>>>,
}

impl OwnershipLockout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current standing without mutating. Called before attempting an
    /// ownership proof.
    pub fn check(&self, subject: &UserId, wallet: &WalletAddress) -> LockoutStanding {
        let state = self.state.lock().unwrap();
        match state.get(&(subject.clone(), wallet.clone())) {
            Some(entry) => LockoutStanding::from_entry(entry),
            None => LockoutStanding::clean(),
        }
    }

    /// Record one failed proof. Creates the entry on first failure; bans
    /// permanently once the post-increment count reaches the threshold.
    pub fn record_failure(&self, subject: &UserId, wallet: &WalletAddress) -> LockoutStanding {
        let now = unix_now();
        let mut state = self.state.lock().unwrap();

        let entry = state
            .entry((subject.clone(), wallet.clone()))
            .or_insert(LockoutEntry {
                attempt_count: 0,
                first_attempt_at: now,
                last_attempt_at: now,
                is_permanent_ban: false,
            });

        entry.attempt_count += 1;
        entry.last_attempt_at = now;
        if entry.attempt_count >= BAN_THRESHOLD {
            entry.is_permanent_ban = true;
        }

        LockoutStanding::from_entry(entry)
    }
}
