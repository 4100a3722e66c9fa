//! Synthetic chain generators.
//!
//! Builds [`HeaderArena`]s from genesis with controlled block spacing so
//! difficulty scenarios have hand-computable answers.

use sxc_consensus::{AuxPow, BlockHeader, HeaderArena, HeaderChain, Hash256};

/// Genesis time used by generated chains.
pub const T0: u32 = 1_400_000_000;

/// Default compact target for generated blocks.
pub const TEST_BITS: u32 = 0x1e0fffff;

/// Chain of `tip + 1` blocks, `spacing` seconds apart, all with `bits`.
pub fn uniform_chain(tip: u32, spacing: u32, bits: u32) -> HeaderArena {
    piecewise_chain(&[(tip, spacing)], bits)
}

/// Chain whose spacing changes by height.
///
/// Each `(last_height, spacing)` segment applies to blocks after the
/// previous segment up to and including `last_height`.
pub fn piecewise_chain(segments: &[(u32, u32)], bits: u32) -> HeaderArena {
    let mut arena = HeaderArena::new(0);
    let mut time = T0;
    arena.push(time, bits);

    let mut height = 0;
    for &(last_height, spacing) in segments {
        while height < last_height {
            height += 1;
            time += spacing;
            arena.push(time, bits);
        }
    }
    arena
}

/// Shift one block's timestamp by `delta` seconds.
pub fn warp_timestamp(arena: &mut HeaderArena, height: u32, delta: i64) {
    if let Some(entry) = arena.entry(height).copied() {
        let time = (entry.time as i64 + delta) as u32;
        arena.set(height, time, entry.bits);
    }
}

/// Chain whose first block sits at `T0` and every later block at
/// `T0 + actual`, so a first retarget at `tip + 1` sees exactly `actual`
/// seconds.
pub fn window_with_timespan(tip: u32, actual: i64, bits: u32) -> HeaderArena {
    let mut arena = HeaderArena::new(0);
    arena.push(T0, bits);
    let last = (T0 as i64 + actual) as u32;
    for _ in 1..=tip {
        arena.push(last, bits);
    }
    arena
}

/// Header with the given version fields and optional merge-mining payload.
pub fn test_header(chain_id: u32, aux_parent: Option<Hash256>) -> BlockHeader {
    let mut header = BlockHeader {
        version: 1,
        prev_block: Hash256([0x11; 32]),
        merkle_root: Hash256([0x22; 32]),
        time: T0,
        bits: 0x1e7fffff,
        nonce: 0,
        aux_pow: None,
    };
    header.set_chain_id(chain_id);
    if let Some(parent_pow_hash) = aux_parent {
        header.set_aux_pow_flag(true);
        header.aux_pow = Some(AuxPow {
            parent_pow_hash,
            proof: vec![0xab; 16],
        });
    }
    header
}

/// Hash whose most significant byte is `top` and all others zero.
pub fn hash_with_top_byte(top: u8) -> Hash256 {
    let mut bytes = [0u8; 32];
    bytes[31] = top;
    Hash256(bytes)
}
