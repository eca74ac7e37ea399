//! Packed layout of the chain state's scalar fields.
//!
//! Fields keep their offsets across upgrades; new fields are carved out of the reserved
//! tail, which must be zero until then.
//!
//! ```text
//! | Offset | Size | Field                   |
//! |--------|------|-------------------------|
//! | 0      | 4    | layout version          |
//! | 4      | 8    | nextBlockId             |
//! | 12     | 8    | lastBlockId             |
//! | 20     | 8    | feeBaseTwei             |
//! | 28     | 8    | lastProposedAt          |
//! | 36     | 8    | avgBlockTime            |
//! | 44     | 8    | avgProofTime            |
//! | 52     | 8    | genesisTimestamp        |
//! | 60     | 8    | gasExcess               |
//! | 68     | 32   | publicInputHash         |
//! | 100    | 8    | parentTimestamp         |
//! | 108    | 8    | latestSyncedL1Height    |
//! | 116    | 44   | reserved (zeros)        |
//! ```
//!
//! All integers are big-endian.

use alloy_primitives::B256;
use thiserror::Error;

use super::ChainState;

/// Current layout version.
pub const STATE_LAYOUT_VERSION: u32 = 1;

/// 4 + 8 * 8 + 32 + 8 + 8 + 44 = 160 bytes
pub const STATE_RECORD_LEN: usize = 160;

const RESERVED_OFFSET: usize = 116;

/// Errors decoding a packed state record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("invalid state record length: expected {STATE_RECORD_LEN} bytes, got {0}")]
    Length(usize),
    #[error("unsupported state layout version: {0}")]
    Version(u32),
    #[error("reserved bytes are not zero")]
    ReservedNotZero,
    #[error("next block id {next} must exceed last block id {last}")]
    BlockIds { next: u64, last: u64 },
}

/// Encode the scalar fields of `state` (packed).
pub(super) fn encode(state: &ChainState, out: &mut Vec<u8>) {
    out.reserve(STATE_RECORD_LEN);
    let start = out.len();

    out.extend_from_slice(&STATE_LAYOUT_VERSION.to_be_bytes());
    out.extend_from_slice(&state.next_block_id.to_be_bytes());
    out.extend_from_slice(&state.last_block_id.to_be_bytes());
    out.extend_from_slice(&state.fee_base_twei.to_be_bytes());
    out.extend_from_slice(&state.last_proposed_at.to_be_bytes());
    out.extend_from_slice(&state.avg_block_time.to_be_bytes());
    out.extend_from_slice(&state.avg_proof_time.to_be_bytes());
    out.extend_from_slice(&state.genesis_timestamp.to_be_bytes());
    out.extend_from_slice(&state.gas_excess.to_be_bytes());
    out.extend_from_slice(state.public_input_hash.as_slice());
    out.extend_from_slice(&state.parent_timestamp.to_be_bytes());
    out.extend_from_slice(&state.latest_synced_l1_height.to_be_bytes());
    out.extend_from_slice(&[0u8; STATE_RECORD_LEN - RESERVED_OFFSET]);

    debug_assert_eq!(out.len() - start, STATE_RECORD_LEN);
}

/// Decode a packed record. Mappings in the returned state are empty.
pub(super) fn decode(data: &[u8]) -> Result<ChainState, LayoutError> {
    if data.len() != STATE_RECORD_LEN {
        return Err(LayoutError::Length(data.len()));
    }

    let mut version = [0u8; 4];
    version.copy_from_slice(&data[0..4]);
    let version = u32::from_be_bytes(version);
    if version != STATE_LAYOUT_VERSION {
        return Err(LayoutError::Version(version));
    }

    if data[RESERVED_OFFSET..].iter().any(|b| *b != 0) {
        return Err(LayoutError::ReservedNotZero);
    }

    let next_block_id = read_u64(data, 4);
    let last_block_id = read_u64(data, 12);
    if next_block_id <= last_block_id {
        return Err(LayoutError::BlockIds { next: next_block_id, last: last_block_id });
    }

    Ok(ChainState {
        next_block_id,
        last_block_id,
        fee_base_twei: read_u64(data, 20),
        last_proposed_at: read_u64(data, 28),
        avg_block_time: read_u64(data, 36),
        avg_proof_time: read_u64(data, 44),
        genesis_timestamp: read_u64(data, 52),
        gas_excess: read_u64(data, 60),
        public_input_hash: B256::from_slice(&data[68..100]),
        parent_timestamp: read_u64(data, 100),
        latest_synced_l1_height: read_u64(data, 108),
        ..ChainState::default()
    })
}

#[inline]
fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[offset..offset + 8]);
    u64::from_be_bytes(buf)
}
