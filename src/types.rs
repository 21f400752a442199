//! Core identifier types shared across the workflow, escrow, and
//! governance modules.
//!
//! Every on-chain operation takes its signer explicitly as a [`Caller`];
//! there is no ambient "currently connected wallet" anywhere in the core.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Bounty identifier: exactly 32 lowercase hex characters (16 bytes).
///
/// The escrow program validates this format itself; the core validates it
/// up front so malformed ids never reach the chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BountyId(String);

/// Length of the canonical bounty identifier in hex characters.
pub const BOUNTY_ID_LEN: usize = 32;

impl BountyId {
    /// Parse and validate a bounty identifier.
    ///
    /// Accepts exactly 32 hex characters; uppercase input is normalized
    /// to lowercase.
    pub fn parse(s: &str) -> Result<Self, InvalidBountyId> {
        if s.len() != BOUNTY_ID_LEN {
            return Err(InvalidBountyId::Length(s.len()));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(InvalidBountyId::NonHex);
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Mint a fresh identifier from a v4 UUID (simple format is exactly
    /// 32 hex characters).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// The decoded 16-byte form, used as derivation seed material.
    pub fn as_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        // Infallible: parse() guarantees 32 hex characters.
        if let Ok(decoded) = hex::decode(&self.0) {
            out.copy_from_slice(&decoded);
        }
        out
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BountyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bounty identifier validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidBountyId {
    #[error("bounty id must be {BOUNTY_ID_LEN} hex characters, got {0}")]
    Length(usize),
    #[error("bounty id contains non-hex characters")]
    NonHex,
}

/// Wallet address (base58-encoded public key on the target chain).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletAddress(pub String);

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Application-level user identifier (datastore row key, not a wallet).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Confirmed transaction signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxSignature(pub String);

impl fmt::Display for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// On-chain program identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramId(pub String);

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Explicit signer capability for every engine operation.
///
/// Pairs the application identity (authorization checks against record
/// role fields) with the wallet that signs any resulting instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub wallet: WalletAddress,
}

impl Caller {
    pub fn new(user_id: &str, wallet: &str) -> Self {
        Self {
            user_id: UserId(user_id.to_string()),
            wallet: WalletAddress(wallet.to_string()),
        }
    }
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounty_id_parse_valid() {
        let id = BountyId::parse("0123456789abcdef0123456789abcdef").unwrap();
        assert_eq!(id.as_str(), "0123456789abcdef0123456789abcdef");
    }

    #[test]
    fn test_bounty_id_normalizes_case() {
        let id = BountyId::parse("0123456789ABCDEF0123456789ABCDEF").unwrap();
        assert_eq!(id.as_str(), "0123456789abcdef0123456789abcdef");
    }

    #[test]
    fn test_bounty_id_rejects_short() {
        assert!(matches!(
            BountyId::parse("abc123"),
            Err(InvalidBountyId::Length(6))
        ));
    }

    #[test]
    fn test_bounty_id_rejects_long() {
        let s = "0".repeat(33);
        assert!(matches!(
            BountyId::parse(&s),
            Err(InvalidBountyId::Length(33))
        ));
    }

    #[test]
    fn test_bounty_id_rejects_non_hex() {
        assert!(matches!(
            BountyId::parse("zzzz456789abcdef0123456789abcdef"),
            Err(InvalidBountyId::NonHex)
        ));
    }

    #[test]
    fn test_bounty_id_generate_is_valid() {
        let id = BountyId::generate();
        assert_eq!(id.as_str().len(), BOUNTY_ID_LEN);
        assert!(BountyId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn test_bounty_id_bytes_round_trip() {
        let id = BountyId::parse("00ff00ff00ff00ff00ff00ff00ff00ff").unwrap();
        let bytes = id.as_bytes();
        assert_eq!(hex::encode(bytes), id.as_str());
    }

    #[test]
    fn test_unix_now_is_sane() {
        // Any time after 2020-01-01.
        assert!(unix_now() > 1_577_836_800);
    }
}
