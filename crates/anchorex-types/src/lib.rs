//! Shared types for the anchorex crate family.

use serde::{Deserialize, Serialize};

/// Serialized chain state: the packed scalar record plus its mappings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStateSnapshot {
    /// Packed scalar fields (fixed layout, versioned).
    pub record: Vec<u8>,
    /// Fee deposit balances, sorted by account.
    pub balances: Vec<BalanceEntry>,
    /// L1 blocks recorded by anchor calls, ascending by height.
    pub l1_verified: Vec<L1VerifiedEntry>,
    /// Archived L2 block hashes, ascending by number.
    pub l2_hashes: Vec<ArchivedHash>,
    /// Unix timestamp the snapshot was taken at.
    pub saved_at: u64,
}

/// A single fee deposit balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub account: [u8; 20],
    /// Big-endian 256-bit amount.
    pub amount: [u8; 32],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct L1VerifiedEntry {
    pub height: u64,
    pub block_hash: [u8; 32],
    pub signal_root: [u8; 32],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedHash {
    pub number: u64,
    pub hash: [u8; 32],
}

/// Current unix time in seconds, or 0 if the clock is before the epoch.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
