//! Next-block target calculation.
//!
//! [`DifficultyEngine`] dispatches on the candidate height through the
//! fork table and runs one of:
//! - the legacy boundary retarget, parametrized by epoch (8h/60s before
//!   fork 1, 30min/30s after it)
//! - the adaptive gravity well from fork 2 onward
//!
//! Arithmetic follows fixed-width 256-bit semantics so historical blocks
//! reproduce bit for bit.

use crate::chain::{ChainEntry, HeaderChain};
use crate::chain_params::{ChainParams, EpochParams};
use crate::compact::{mul_seconds_u256, CompactTarget};
use crate::error::{ConsensusError, ConsensusResult};
use crate::fork_epochs::{ForkEpochResolver, RetargetAlgorithm};
use crate::gravity_well::GravityWell;
use crate::params::{MIN_DIFFICULTY_GAP_SPACINGS, RETARGET_CLAMP_FACTOR};
use num_bigint::BigUint;
use tracing::{debug, instrument};

/// Difficulty adjustment for one network.
#[derive(Debug, Clone, Copy)]
pub struct DifficultyEngine<'a> {
    params: &'a ChainParams,
    resolver: ForkEpochResolver<'a>,
}

impl<'a> DifficultyEngine<'a> {
    pub fn new(params: &'a ChainParams) -> Self {
        Self {
            params,
            resolver: ForkEpochResolver::new(params),
        }
    }

    /// Required compact target for the block after `ancestor_height`.
    ///
    /// `chain` must hold the branch ending at the ancestor; missing entries
    /// the algorithm needs yield `MissingAncestor`. Genesis has no ancestor
    /// and is never passed here: its target is the network's pow limit.
    #[instrument(skip(self, chain))]
    pub fn next_required_target<C: HeaderChain + ?Sized>(
        &self,
        chain: &C,
        ancestor_height: u32,
        candidate_time: u32,
    ) -> ConsensusResult<CompactTarget> {
        let next_height = ancestor_height
            .checked_add(1)
            .ok_or(ConsensusError::HeightOverflow {
                height: ancestor_height,
            })?;
        let last = chain.ancestor(ancestor_height)?;

        if self.params.no_retargeting() {
            return Ok(CompactTarget(last.bits));
        }

        let rule = self.resolver.rule(next_height);
        debug!(algorithm = %rule.algorithm, epoch = rule.epoch, "Selected retarget algorithm");

        match rule.algorithm {
            RetargetAlgorithm::GravityWell => GravityWell::new(self.params).next_target(chain, last),
            RetargetAlgorithm::LegacyV1 | RetargetAlgorithm::LegacyV2 => {
                self.legacy_retarget(chain, last, candidate_time, self.params.epoch(rule.epoch))
            }
        }
    }

    /// Boundary retarget shared by both legacy epochs.
    ///
    /// Off-boundary blocks keep the previous target, except on networks
    /// allowing minimum-difficulty blocks. There the gap test and the
    /// backward walk use the network's base spacing and interval regardless
    /// of epoch.
    pub fn legacy_retarget<C: HeaderChain + ?Sized>(
        &self,
        chain: &C,
        last: &ChainEntry,
        candidate_time: u32,
        epoch: EpochParams,
    ) -> ConsensusResult<CompactTarget> {
        let limit_compact = self.params.pow_limit_compact();
        let interval = epoch.interval();
        let next_height = last.height as i64 + 1;

        if next_height % interval != 0 {
            if self.params.allow_min_difficulty_blocks() {
                let gap = self.params.target_spacing() * MIN_DIFFICULTY_GAP_SPACINGS;
                if candidate_time as i64 > last.time as i64 + gap {
                    return Ok(limit_compact);
                }
                return self.last_non_min_difficulty(chain, last);
            }
            return Ok(CompactTarget(last.bits));
        }

        // First retarget after genesis can only reach back to block 0.
        let blocks_to_go_back = if next_height == interval {
            interval - 1
        } else {
            interval
        };
        let first_height = last.height as i64 - blocks_to_go_back;
        let first = chain.ancestor(first_height.max(0) as u32)?;

        let actual = last.time as i64 - first.time as i64;
        let clamped = actual.clamp(
            epoch.timespan / RETARGET_CLAMP_FACTOR,
            epoch.timespan * RETARGET_CLAMP_FACTOR,
        );
        debug!(actual, clamped, timespan = epoch.timespan, "Legacy retarget timespan");

        let new_target = retarget_by_timespan(
            &CompactTarget(last.bits).to_target(),
            clamped,
            epoch.timespan,
            self.params.pow_limit(),
        );
        let new_bits = CompactTarget::from_target(&new_target);

        debug!(
            height = next_height,
            before = format!("0x{:08x}", last.bits),
            after = format!("0x{:08x}", new_bits.0),
            "Retarget"
        );
        Ok(new_bits)
    }

    /// Walk back past min-difficulty blocks to the last real target.
    fn last_non_min_difficulty<C: HeaderChain + ?Sized>(
        &self,
        chain: &C,
        last: &ChainEntry,
    ) -> ConsensusResult<CompactTarget> {
        let limit_bits = self.params.pow_limit_compact().0;
        let base_interval = self.params.interval();

        let mut entry = last;
        while entry.height > 0
            && entry.height as i64 % base_interval != 0
            && entry.bits == limit_bits
        {
            entry = chain.ancestor(entry.height - 1)?;
        }
        Ok(CompactTarget(entry.bits))
    }
}

/// Scale `target` by `actual / timespan` with fixed-width wrap, then cap
/// at `limit`.
pub fn retarget_by_timespan(
    target: &BigUint,
    actual: i64,
    timespan: i64,
    limit: &BigUint,
) -> BigUint {
    let scaled = mul_seconds_u256(target, actual) / BigUint::from(timespan as u64);
    if &scaled > limit {
        limit.clone()
    } else {
        scaled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::HeaderArena;
    use crate::chain_params::Network;

    const BITS: u32 = 0x1e0fffff;
    const T0: u32 = 1_400_000_000;

    fn uniform(tip: u32, spacing: u32, bits: u32) -> HeaderArena {
        let mut arena = HeaderArena::new(0);
        for h in 0..=tip {
            arena.push(T0 + spacing * h, bits);
        }
        arena
    }

    fn main_params() -> ChainParams {
        ChainParams::main()
    }

    #[test]
    fn test_off_boundary_keeps_previous() {
        let params = main_params();
        let engine = DifficultyEngine::new(&params);
        let chain = uniform(100, 60, BITS);

        let bits = engine.next_required_target(&chain, 100, T0 + 6_060).unwrap();
        assert_eq!(bits, CompactTarget(BITS));
    }

    #[test]
    fn test_first_retarget_goes_back_interval_minus_one() {
        let params = main_params();
        let engine = DifficultyEngine::new(&params);
        // window is blocks 0..=479: 479 gaps of 30s, just under half of 8h
        let chain = uniform(479, 30, BITS);
        let bits = engine.next_required_target(&chain, 479, 0).unwrap();
        assert_eq!(bits, CompactTarget(0x1e07fbbb));

        // later windows span a full 480 gaps: exactly half
        let mut chain = uniform(479, 60, BITS);
        let mut t = chain.tip().unwrap().time;
        for _ in 480..=959 {
            t += 30;
            chain.push(t, BITS);
        }
        let bits = engine.next_required_target(&chain, 959, 0).unwrap();
        assert_eq!(bits, CompactTarget(0x1e07ffff));
    }

    #[test]
    fn test_clamp_to_quarter_and_four_times() {
        let params = main_params();
        let engine = DifficultyEngine::new(&params);

        for spacing in [1, 5, 15] {
            let chain = uniform(479, spacing, BITS);
            let bits = engine.next_required_target(&chain, 479, 0).unwrap();
            assert_eq!(bits, CompactTarget(0x1e03ffff), "spacing {spacing}");
        }

        let chain = uniform(479, 1_000, BITS);
        let bits = engine.next_required_target(&chain, 479, 0).unwrap();
        assert_eq!(bits, CompactTarget(0x1e3ffffc));

        // 479 * 240 is just inside 4T
        let chain = uniform(479, 240, BITS);
        let bits = engine.next_required_target(&chain, 479, 0).unwrap();
        assert_eq!(bits, CompactTarget(0x1e3fddd9));
    }

    #[test]
    fn test_product_wraps_at_256_bits() {
        let params = main_params();
        let engine = DifficultyEngine::new(&params);
        let chain = uniform(479, 240, 0x2007ffff);

        // limit * 114960 overflows 256 bits before the division
        let bits = engine.next_required_target(&chain, 479, 0).unwrap();
        assert_eq!(bits, CompactTarget(0x1f011f47));
    }

    #[test]
    fn test_retarget_caps_at_limit() {
        let limit = BigUint::from(1_000u32);
        let out = retarget_by_timespan(&BigUint::from(900u32), 400, 100, &limit);
        assert_eq!(out, limit);
        let out = retarget_by_timespan(&BigUint::from(900u32), 50, 100, &limit);
        assert_eq!(out, BigUint::from(450u32));
    }

    #[test]
    fn test_no_retargeting_returns_ancestor_bits() {
        let params = ChainParams::regtest();
        let engine = DifficultyEngine::new(&params);
        let chain = uniform(479, 1, 0x1e1fffff);

        let bits = engine.next_required_target(&chain, 479, T0 + 100_000).unwrap();
        assert_eq!(bits, CompactTarget(0x1e1fffff));
    }

    #[test]
    fn test_min_difficulty_after_gap() {
        let params = ChainParams::testnet();
        let engine = DifficultyEngine::new(&params);
        let mut chain = uniform(500, 60, BITS);
        let limit = params.pow_limit_compact().0;
        for h in 498..=500 {
            let time = chain.entry(h).unwrap().time;
            chain.set(h, time, limit);
        }
        let tip_time = chain.entry(500).unwrap().time;

        let bits = engine.next_required_target(&chain, 500, tip_time + 121).unwrap();
        assert_eq!(bits, CompactTarget(limit));

        // within 2x spacing: skip back over the min-difficulty run
        let bits = engine.next_required_target(&chain, 500, tip_time + 120).unwrap();
        assert_eq!(bits, CompactTarget(BITS));
    }

    #[test]
    fn test_min_difficulty_walk_stops_at_interval_boundary() {
        let params = ChainParams::testnet();
        let engine = DifficultyEngine::new(&params);
        let limit = params.pow_limit_compact().0;
        let mut chain = uniform(500, 60, BITS);
        for h in 480..=500 {
            let time = chain.entry(h).unwrap().time;
            chain.set(h, time, limit);
        }

        let bits = engine.next_required_target(&chain, 500, T0 + 500 * 60).unwrap();
        assert_eq!(bits, CompactTarget(limit));
    }

    #[test]
    fn test_missing_window_start() {
        let params = main_params();
        let engine = DifficultyEngine::new(&params);
        let mut chain = HeaderArena::new(900);
        for h in 900..=959 {
            chain.push(T0 + h * 60, BITS);
        }

        let err = engine.next_required_target(&chain, 959, 0).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_v2_uses_second_epoch() {
        let params = ChainParams::builder(Network::Main)
            .fork_heights(960, 1_200, 1_608)
            .build()
            .unwrap();
        let engine = DifficultyEngine::new(&params);
        let mut chain = HeaderArena::new(0);
        let mut t = T0;
        for h in 0..=1_019u32 {
            if h > 0 {
                t += if h <= 959 { 30 } else { 15 };
            }
            chain.push(t, BITS);
        }

        // 60 blocks at 15s against a 30min window
        let bits = engine.next_required_target(&chain, 1_019, t + 15).unwrap();
        assert_eq!(bits, CompactTarget(0x1e07ffff));
    }

    #[test]
    fn test_min_difficulty_in_v2_epoch_uses_base_rules() {
        let params = ChainParams::testnet();
        let engine = DifficultyEngine::new(&params);
        let limit = params.pow_limit_compact().0;
        let mut chain = uniform(1_030, 60, BITS);
        // run crosses the v2 boundary at 1020 but not the base one at 960
        for h in 1_015..=1_030 {
            let time = chain.entry(h).unwrap().time;
            chain.set(h, time, limit);
        }
        let tip_time = chain.entry(1_030).unwrap().time;

        // 90s is past twice the v2 spacing but within twice the base spacing
        let bits = engine.next_required_target(&chain, 1_030, tip_time + 90).unwrap();
        assert_eq!(bits, CompactTarget(BITS));

        let bits = engine.next_required_target(&chain, 1_030, tip_time + 121).unwrap();
        assert_eq!(bits, CompactTarget(limit));
    }

    #[test]
    fn test_ancestor_at_max_height() {
        let params = main_params();
        let engine = DifficultyEngine::new(&params);
        let chain = uniform(10, 60, BITS);

        let err = engine.next_required_target(&chain, u32::MAX, 0).unwrap_err();
        assert_eq!(err, ConsensusError::HeightOverflow { height: u32::MAX });
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_gapped_history_is_missing_ancestor() {
        let params = main_params();
        let engine = DifficultyEngine::new(&params);
        // height 1 is missing, so position 479 holds block 480
        let entries: Vec<ChainEntry> = (0..=480u32)
            .filter(|h| *h != 1)
            .map(|h| ChainEntry::new(h, T0 + h * 30, BITS))
            .collect();

        let err = engine.next_required_target(&entries, 479, 0).unwrap_err();
        assert_eq!(err, ConsensusError::MissingAncestor { height: 479 });
    }
}
