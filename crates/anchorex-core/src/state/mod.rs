//! Canonical chain state.
//!
//! One record owned by the protocol and passed by reference into every operation. The
//! scalar fields have a fixed packed layout (see [`layout`]); the mappings are persisted
//! next to it as separate entries.

mod layout;

use std::collections::{BTreeMap, HashMap};

use alloy_primitives::{Address, B256, U256};
use anchorex_types::{ArchivedHash, BalanceEntry, ChainStateSnapshot, L1VerifiedEntry};

pub use layout::{LayoutError, STATE_LAYOUT_VERSION, STATE_RECORD_LEN};

/// An L1 block the anchor has seen, keyed by its height in [`ChainState::l1_verified`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct L1Verified {
    pub block_hash: B256,
    pub signal_root: B256,
}

/// The protocol's mutable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainState {
    /// Id the next proposed block will get. Always greater than `last_block_id`.
    pub next_block_id: u64,
    /// Id of the last verified block.
    pub last_block_id: u64,
    /// Fee baseline in twei; 0 stands for one twei.
    pub fee_base_twei: u64,
    /// Timestamp of the last proposal, seconds.
    pub last_proposed_at: u64,
    /// Average block time, milliseconds.
    pub avg_block_time: u64,
    /// Average proof time, milliseconds.
    pub avg_proof_time: u64,
    /// Chain start, seconds. Drives the bootstrap discount.
    pub genesis_timestamp: u64,
    /// Fee-market accumulator.
    pub gas_excess: u64,
    /// Rolling hash over the last 255 block hashes and the chain id.
    pub public_input_hash: B256,
    /// Timestamp of the last anchored block.
    pub parent_timestamp: u64,
    /// Height of the most recent L1 block recorded by an anchor call.
    pub latest_synced_l1_height: u64,
    /// Protocol-held fee deposits.
    pub balances: HashMap<Address, U256>,
    /// L1 height -> (block hash, signal root). Append-only.
    pub l1_verified: BTreeMap<u64, L1Verified>,
    /// Hashes of L2 blocks, kept for lookups beyond the native 256-block window.
    pub l2_hashes: BTreeMap<u64, B256>,
}

impl Default for ChainState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ChainState {
    /// Fresh state for a chain starting at `genesis_timestamp`.
    pub fn new(genesis_timestamp: u64) -> Self {
        Self {
            next_block_id: 1,
            last_block_id: 0,
            fee_base_twei: 0,
            last_proposed_at: genesis_timestamp,
            avg_block_time: 0,
            avg_proof_time: 0,
            genesis_timestamp,
            gas_excess: 0,
            public_input_hash: B256::ZERO,
            parent_timestamp: 0,
            latest_synced_l1_height: 0,
            balances: HashMap::new(),
            l1_verified: BTreeMap::new(),
            l2_hashes: BTreeMap::new(),
        }
    }

    /// Set the fee baseline (builder pattern).
    #[inline]
    pub fn with_fee_base(mut self, fee_base_twei: u64) -> Self {
        self.fee_base_twei = fee_base_twei;
        self
    }

    /// Set the block counters (builder pattern). Fails if `next_block_id <= last_block_id`.
    pub fn with_block_ids(
        mut self,
        next_block_id: u64,
        last_block_id: u64,
    ) -> Result<Self, LayoutError> {
        if next_block_id <= last_block_id {
            return Err(LayoutError::BlockIds { next: next_block_id, last: last_block_id });
        }
        self.next_block_id = next_block_id;
        self.last_block_id = last_block_id;
        Ok(self)
    }

    /// Number of proposed blocks that are not yet verified.
    #[inline]
    pub fn unverified_blocks(&self) -> u64 {
        self.next_block_id.saturating_sub(self.last_block_id).saturating_sub(1)
    }

    /// Deposit balance of `account`, zero if it never deposited.
    #[inline]
    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// Replace the fee baseline with a value computed by the tokenomics getters.
    #[inline]
    pub fn commit_fee_base(&mut self, new_fee_base: u64) {
        self.fee_base_twei = new_fee_base;
    }

    /// Encode the scalar fields into the packed record.
    #[inline]
    pub fn encode_record(&self, out: &mut Vec<u8>) {
        layout::encode(self, out)
    }

    /// Decode the scalar fields from a packed record. Mappings start empty.
    #[inline]
    pub fn decode_record(data: &[u8]) -> Result<Self, LayoutError> {
        layout::decode(data)
    }

    /// Flatten the state into a serialisable snapshot taken at `saved_at`.
    pub fn to_snapshot(&self, saved_at: u64) -> ChainStateSnapshot {
        self.partial_snapshot(
            saved_at,
            self.l1_verified.keys().copied(),
            self.l2_hashes.keys().copied(),
        )
    }

    /// Snapshot carrying the full scalar record and balances, but only the archive
    /// entries at `l1_heights` and `l2_numbers`. Keys with no entry are skipped.
    ///
    /// Both archives are append-only, so a store that already holds the earlier entries
    /// only needs the ones a block added.
    pub fn partial_snapshot(
        &self,
        saved_at: u64,
        l1_heights: impl IntoIterator<Item = u64>,
        l2_numbers: impl IntoIterator<Item = u64>,
    ) -> ChainStateSnapshot {
        let mut record = Vec::with_capacity(STATE_RECORD_LEN);
        self.encode_record(&mut record);

        let mut balances: Vec<BalanceEntry> = self
            .balances
            .iter()
            .map(|(account, amount)| BalanceEntry {
                account: account.into_array(),
                amount: amount.to_be_bytes::<32>(),
            })
            .collect();
        balances.sort_by(|a, b| a.account.cmp(&b.account));

        let l1_verified = l1_heights
            .into_iter()
            .filter_map(|height| {
                let entry = self.l1_verified.get(&height)?;
                Some(L1VerifiedEntry {
                    height,
                    block_hash: entry.block_hash.0,
                    signal_root: entry.signal_root.0,
                })
            })
            .collect();
        let l2_hashes = l2_numbers
            .into_iter()
            .filter_map(|number| {
                let hash = self.l2_hashes.get(&number)?;
                Some(ArchivedHash { number, hash: hash.0 })
            })
            .collect();

        ChainStateSnapshot { record, balances, l1_verified, l2_hashes, saved_at }
    }

    /// Rebuild the state from a snapshot.
    pub fn from_snapshot(snapshot: &ChainStateSnapshot) -> Result<Self, LayoutError> {
        let mut state = Self::decode_record(&snapshot.record)?;
        state.balances = snapshot
            .balances
            .iter()
            .map(|e| (Address::from(e.account), U256::from_be_bytes(e.amount)))
            .collect();
        state.l1_verified = snapshot
            .l1_verified
            .iter()
            .map(|e| {
                let entry = L1Verified {
                    block_hash: B256::from(e.block_hash),
                    signal_root: B256::from(e.signal_root),
                };
                (e.height, entry)
            })
            .collect();
        state.l2_hashes =
            snapshot.l2_hashes.iter().map(|e| (e.number, B256::from(e.hash))).collect();
        Ok(state)
    }
}
