//! Rolling public input hash.
//!
//! The hash commits to the last 255 block hashes and the chain id. Block hashes live in a
//! ring of 255 slots indexed by `number % 255`; slot 255 holds the chain id. Because the
//! ring has 255 slots, not 256, the slot freed by the oldest block is exactly the one the
//! newest block takes:
//!
//! ```text
//! slot:   0     1     ...   254   | 255
//! value:  h(j) where j % 255 == s | chain_id (32-byte big-endian)
//!
//! prev(id) = keccak256(slots)                      with blocks id-255 ..= id-1
//! curr(id) = keccak256(slots[id % 255] = h(id))    with blocks id-254 ..= id
//! ```
//!
//! So `curr(id) == prev(id + 1)` as long as the block hashes agree.

use alloy_primitives::{keccak256, B256, U256};

use super::BlockEnv;

/// Number of ring slots holding block hashes.
pub const RING_SIZE: u64 = 255;

const WINDOW_LEN: usize = 256;
const CHAIN_ID_SLOT: usize = 255;

/// 256-slot buffer hashed into the public input hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashWindow {
    slots: [B256; WINDOW_LEN],
}

impl HashWindow {
    /// Empty ring stamped with `chain_id`.
    pub fn new(chain_id: u64) -> Self {
        let mut slots = [B256::ZERO; WINDOW_LEN];
        slots[CHAIN_ID_SLOT] = B256::from(U256::from(chain_id).to_be_bytes::<32>());
        Self { slots }
    }

    /// Fill the ring with the hashes of the up to 255 blocks before `block_id`.
    pub fn for_block<E: BlockEnv + ?Sized>(env: &E, block_id: u64) -> Self {
        let mut window = Self::new(env.chain_id());
        for number in block_id.saturating_sub(RING_SIZE)..block_id {
            window.set(number, env.blockhash(number));
        }
        window
    }

    /// Place the hash of block `number` in its ring slot.
    #[inline]
    pub fn set(&mut self, number: u64, hash: B256) {
        self.slots[Self::slot(number)] = hash;
    }

    /// Hash of the slot block `number` maps to.
    #[inline]
    pub fn get(&self, number: u64) -> B256 {
        self.slots[Self::slot(number)]
    }

    #[inline]
    fn slot(number: u64) -> usize {
        // < 255
        (number % RING_SIZE) as usize
    }

    /// keccak256 over the 8192-byte concatenation of all slots.
    pub fn hash(&self) -> B256 {
        let mut buf = [0u8; WINDOW_LEN * 32];
        for (chunk, slot) in buf.chunks_exact_mut(32).zip(self.slots.iter()) {
            chunk.copy_from_slice(slot.as_slice());
        }
        keccak256(buf)
    }
}

/// Public input hashes around `block_id`: `(prev, curr)`.
///
/// `prev` covers the 255 blocks before `block_id`, `curr` additionally rotates in
/// `block_id`'s own hash.
pub fn calc_public_input_hash<E: BlockEnv + ?Sized>(env: &E, block_id: u64) -> (B256, B256) {
    let mut window = HashWindow::for_block(env, block_id);
    let prev = window.hash();
    window.set(block_id, env.blockhash(block_id));
    (prev, window.hash())
}
