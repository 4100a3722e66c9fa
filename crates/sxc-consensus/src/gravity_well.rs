//! Kimoto Gravity Well retarget.
//!
//! Retargets every block from a recency-dampened mean of past targets,
//! scaled by how far the observed block rate strays from 60s per block.
//! The walk back stops once the rate ratio leaves a tolerance envelope
//! that narrows as more blocks are sampled.
//!
//! Blocks at or below the time-warp fix height keep the original
//! behaviour: an out-of-order timestamp cannot raise the "latest" time,
//! and elapsed time may clamp to zero. Above the fix height a later
//! timestamp updates "latest" and elapsed time clamps to one second.
//! Both branches are consensus-critical and are reproduced exactly.

use crate::chain::{ChainEntry, HeaderChain};
use crate::chain_params::ChainParams;
use crate::compact::{mul_seconds_u256, CompactTarget};
use crate::error::ConsensusResult;
use crate::params::{
    KGW_DEVIATION_EXPONENT, KGW_DEVIATION_SCALE, KGW_DEVIATION_WINDOW, KGW_PAST_BLOCKS_MAX,
    KGW_PAST_BLOCKS_MIN, KGW_TARGET_SPACING_SECS,
};
use num_bigint::BigUint;
use tracing::debug;

/// Tolerance envelope `1 + 0.7084 * (mass / 144)^-1.228`.
pub fn event_horizon_deviation(mass: u64) -> f64 {
    1.0 + KGW_DEVIATION_SCALE * (mass as f64 / KGW_DEVIATION_WINDOW).powf(KGW_DEVIATION_EXPONENT)
}

/// Gravity well bound to one network's parameters.
#[derive(Debug, Clone, Copy)]
pub struct GravityWell<'a> {
    params: &'a ChainParams,
}

impl<'a> GravityWell<'a> {
    pub fn new(params: &'a ChainParams) -> Self {
        Self { params }
    }

    /// Target for the block after `last`.
    pub fn next_target<C: HeaderChain + ?Sized>(
        &self,
        chain: &C,
        last: &ChainEntry,
    ) -> ConsensusResult<CompactTarget> {
        if last.height == 0 || (last.height as u64) < KGW_PAST_BLOCKS_MIN {
            return Ok(self.params.pow_limit_compact());
        }

        let fix_height = self.params.fork3_height();
        let mut latest_time = last.time as i64;

        let mut mass: u64 = 0;
        let mut average = BigUint::default();
        let mut actual_seconds: i64 = 0;
        let mut target_seconds: i64 = 0;
        let mut ratio = 1.0f64;

        let mut reading = *last;
        let mut i: u64 = 1;
        while reading.height > 0 {
            if i > KGW_PAST_BLOCKS_MAX {
                break;
            }
            mass += 1;

            let difficulty = CompactTarget(reading.bits).to_target();
            average = if i == 1 {
                difficulty
            } else if difficulty > average {
                &average + (difficulty - &average) / i
            } else {
                &average - (&average - difficulty) / i
            };

            let time = reading.time as i64;
            let fixed = reading.height > fix_height;
            if latest_time < time && fixed {
                latest_time = time;
            }

            actual_seconds = latest_time - time;
            target_seconds = KGW_TARGET_SPACING_SECS * mass as i64;
            ratio = 1.0;
            if fixed {
                actual_seconds = actual_seconds.max(1);
            } else {
                actual_seconds = actual_seconds.max(0);
            }
            if actual_seconds != 0 && target_seconds != 0 {
                ratio = target_seconds as f64 / actual_seconds as f64;
            }

            let deviation_fast = event_horizon_deviation(mass);
            let deviation_slow = 1.0 / deviation_fast;
            if mass >= KGW_PAST_BLOCKS_MIN && (ratio <= deviation_slow || ratio >= deviation_fast) {
                break;
            }

            reading = *chain.ancestor(reading.height - 1)?;
            i += 1;
        }

        let mut new_target = average;
        if actual_seconds != 0 && target_seconds != 0 {
            new_target =
                mul_seconds_u256(&new_target, actual_seconds) / BigUint::from(target_seconds as u64);
        }
        if &new_target > self.params.pow_limit() {
            new_target = self.params.pow_limit().clone();
        }
        let new_bits = CompactTarget::from_target(&new_target);

        let variant = if last.height > fix_height {
            "time-warp fix"
        } else {
            "original"
        };
        debug!(
            height = last.height,
            variant,
            ratio,
            target_seconds,
            actual_seconds,
            before = format!("0x{:08x}", last.bits),
            after = format!("0x{:08x}", new_bits.0),
            "Gravity well retarget"
        );

        Ok(new_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::HeaderArena;

    const BITS: u32 = 0x1e0fffff;
    const T0: u32 = 1_400_000_000;

    fn params_with_fix(fix: u32) -> ChainParams {
        ChainParams::builder(crate::chain_params::Network::Main)
            .fork_heights(0, 0, fix)
            .build()
            .unwrap()
    }

    fn uniform(tip: u32, spacing: u32) -> HeaderArena {
        let mut arena = HeaderArena::new(0);
        for h in 0..=tip {
            arena.push(T0 + spacing * h, BITS);
        }
        arena
    }

    #[test]
    fn test_sample_bounds() {
        let day = 24 * 60 * 60;
        assert_eq!(KGW_PAST_BLOCKS_MIN as i64, day / 4 / KGW_TARGET_SPACING_SECS);
        assert_eq!(KGW_PAST_BLOCKS_MAX as i64, day * 7 / KGW_TARGET_SPACING_SECS);
    }

    #[test]
    fn test_deviation_curve() {
        assert!((event_horizon_deviation(144) - 1.7084).abs() < 1e-12);
        assert!(event_horizon_deviation(10) > event_horizon_deviation(144));
        assert!(event_horizon_deviation(10_080) < 1.01);
    }

    #[test]
    fn test_minimum_history_guard() {
        let params = params_with_fix(0);
        let well = GravityWell::new(&params);
        let chain = uniform(400, 60);

        let last = chain.entry(359).unwrap();
        assert_eq!(well.next_target(&chain, last).unwrap(), CompactTarget(0x2007ffff));

        let last = chain.entry(0).unwrap();
        assert_eq!(well.next_target(&chain, last).unwrap(), CompactTarget(0x2007ffff));

        let last = chain.entry(360).unwrap();
        assert_eq!(well.next_target(&chain, last).unwrap(), CompactTarget(0x1e0ff49e));
    }

    #[test]
    fn test_uniform_chain_ignores_fix_height() {
        let chain = uniform(400, 60);
        let last = *chain.entry(400).unwrap();

        for fix in [0, 10_000] {
            let params = params_with_fix(fix);
            let bits = GravityWell::new(&params).next_target(&chain, &last).unwrap();
            assert_eq!(bits, CompactTarget(0x1e0ff5c1), "fix height {fix}");
        }
    }

    #[test]
    fn test_fast_blocks_raise_difficulty() {
        let params = params_with_fix(0);
        let chain = uniform(400, 30);
        let last = *chain.entry(400).unwrap();

        let bits = GravityWell::new(&params).next_target(&chain, &last).unwrap();
        assert_eq!(bits, CompactTarget(0x1e07fa4f));
    }

    #[test]
    fn test_time_warp_original_and_fixed() {
        let mut chain = uniform(400, 60);
        let warped = chain.entry(398).unwrap().time + 5_000;
        chain.set(398, warped, BITS);
        let last = *chain.entry(400).unwrap();

        // below the fix height the future-dated block never becomes "latest"
        let original = GravityWell::new(&params_with_fix(10_000))
            .next_target(&chain, &last)
            .unwrap();
        let fixed = GravityWell::new(&params_with_fix(0))
            .next_target(&chain, &last)
            .unwrap();

        assert_eq!(original, CompactTarget(0x1e0ff5c1));
        assert_eq!(fixed, CompactTarget(0x1e13369b));
        assert_ne!(original, fixed);
    }

    #[test]
    fn test_walk_stops_at_seven_days_of_blocks() {
        let params = params_with_fix(0);
        let well = GravityWell::new(&params);
        let tip = 12_000u32;
        let full = uniform(tip, 60);
        let last = *full.entry(tip).unwrap();

        // steady blocks never leave the envelope, so only the cap ends the walk
        let window_start = tip - KGW_PAST_BLOCKS_MAX as u32;
        let mut window = HeaderArena::new(window_start);
        for h in window_start..=tip {
            window.push(T0 + 60 * h, BITS);
        }

        let expected = well.next_target(&full, &last).unwrap();
        assert_eq!(expected, CompactTarget(0x1e0fff96));
        assert_eq!(well.next_target(&window, &last).unwrap(), expected);
    }

    #[test]
    fn test_truncated_history_is_invariant_violation() {
        let params = params_with_fix(0);
        let mut chain = HeaderArena::new(300);
        for h in 300..=400 {
            chain.push(T0 + 60 * h, BITS);
        }
        let last = *chain.entry(400).unwrap();

        let err = GravityWell::new(&params).next_target(&chain, &last).unwrap_err();
        assert!(err.is_invariant_violation());
    }
}
