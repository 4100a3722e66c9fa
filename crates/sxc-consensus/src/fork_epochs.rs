//! Height-triggered rule changes.
//!
//! Two tables drive everything here, both ordered newest first:
//!
//! - the epoch table maps a height to the timespan/spacing pair in force,
//!   using strict `>` comparisons against the fork heights;
//! - the algorithm table maps a candidate height to the retarget algorithm.
//!   Its comparisons are mixed (`>=` for the adaptive epochs, `>` for the
//!   second legacy epoch) and must stay that way for historical blocks to
//!   validate.
//!
//! Adding an epoch is a new table row, not a new branch.

use crate::chain_params::{ChainParams, EpochParams};
use std::fmt;

/// How a table row's threshold is compared against a height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Active for every height.
    Always,
    /// Active when `height > threshold`.
    Above(u32),
    /// Active when `height >= threshold`.
    AtOrAbove(u32),
    /// Never active.
    Never,
}

impl Activation {
    pub fn is_active(&self, height: u32) -> bool {
        match *self {
            Activation::Always => true,
            Activation::Above(threshold) => height > threshold,
            Activation::AtOrAbove(threshold) => height >= threshold,
            Activation::Never => false,
        }
    }
}

/// Retarget algorithm identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetargetAlgorithm {
    /// Boundary retarget with the base 8h/60s parameters.
    LegacyV1,
    /// Boundary retarget with the 30min/30s parameters.
    LegacyV2,
    /// Per-block adaptive weighted average (Kimoto Gravity Well).
    GravityWell,
}

impl fmt::Display for RetargetAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RetargetAlgorithm::LegacyV1 => "legacy-v1",
            RetargetAlgorithm::LegacyV2 => "legacy-v2",
            RetargetAlgorithm::GravityWell => "gravity-well",
        };
        f.write_str(name)
    }
}

/// One row of the algorithm table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkRule {
    pub activation: Activation,
    pub algorithm: RetargetAlgorithm,
    /// Index of the epoch whose timespan/spacing the algorithm uses.
    pub epoch: usize,
}

/// Resolves epoch parameters and retarget algorithms by height.
#[derive(Debug, Clone, Copy)]
pub struct ForkEpochResolver<'a> {
    params: &'a ChainParams,
}

impl<'a> ForkEpochResolver<'a> {
    pub fn new(params: &'a ChainParams) -> Self {
        Self { params }
    }

    /// Epoch table, newest first: `(activation, epoch index)`.
    pub fn epoch_table(&self) -> [(Activation, usize); 3] {
        [
            (Activation::Above(self.params.fork2_height()), 2),
            (Activation::Above(self.params.fork1_height()), 1),
            (Activation::Always, 0),
        ]
    }

    /// Algorithm table, newest first.
    ///
    /// The fork-3 row is kept even though it selects the same algorithm as
    /// fork 2: it marks where the gravity well's time-warp fix begins. The
    /// failsafe row only applies to networks allowing minimum-difficulty
    /// blocks that set a failsafe height.
    pub fn algorithm_table(&self) -> [ForkRule; 5] {
        let failsafe = match self.params.min_difficulty_failsafe_height() {
            Some(height) if self.params.allow_min_difficulty_blocks() => {
                Activation::AtOrAbove(height)
            }
            _ => Activation::Never,
        };
        [
            ForkRule {
                activation: Activation::AtOrAbove(self.params.fork3_height()),
                algorithm: RetargetAlgorithm::GravityWell,
                epoch: 2,
            },
            ForkRule {
                activation: failsafe,
                algorithm: RetargetAlgorithm::GravityWell,
                epoch: 2,
            },
            ForkRule {
                activation: Activation::AtOrAbove(self.params.fork2_height()),
                algorithm: RetargetAlgorithm::GravityWell,
                epoch: 2,
            },
            ForkRule {
                activation: Activation::Above(self.params.fork1_height()),
                algorithm: RetargetAlgorithm::LegacyV2,
                epoch: 1,
            },
            ForkRule {
                activation: Activation::Always,
                algorithm: RetargetAlgorithm::LegacyV1,
                epoch: 0,
            },
        ]
    }

    /// Index of the epoch in force at `height`.
    pub fn epoch_index(&self, height: u32) -> usize {
        self.epoch_table()
            .into_iter()
            .find(|(activation, _)| activation.is_active(height))
            .map(|(_, epoch)| epoch)
            .unwrap_or(0)
    }

    /// Timespan/spacing pair in force at `height`.
    pub fn epoch(&self, height: u32) -> EpochParams {
        self.params.epoch(self.epoch_index(height))
    }

    /// Target timespan in seconds.
    pub fn timespan(&self, height: u32) -> i64 {
        self.epoch(height).timespan
    }

    /// Target block spacing in seconds.
    pub fn spacing(&self, height: u32) -> i64 {
        self.epoch(height).spacing
    }

    /// Blocks per retarget window. Never zero for validated parameters.
    pub fn interval(&self, height: u32) -> i64 {
        self.epoch(height).interval()
    }

    /// Algorithm rule for a candidate block at `height`.
    pub fn rule(&self, height: u32) -> ForkRule {
        let table = self.algorithm_table();
        let fallback = table[table.len() - 1];
        table
            .into_iter()
            .find(|rule| rule.activation.is_active(height))
            .unwrap_or(fallback)
    }

    /// Algorithm for a candidate block at `height`.
    pub fn algorithm(&self, height: u32) -> RetargetAlgorithm {
        self.rule(height).algorithm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain_params::Network;

    #[test]
    fn test_epoch_boundaries_are_strict() {
        let params = ChainParams::main();
        let resolver = ForkEpochResolver::new(&params);

        assert_eq!(resolver.timespan(0), 8 * 60 * 60);
        assert_eq!(resolver.timespan(155_000), 8 * 60 * 60);
        assert_eq!(resolver.timespan(155_001), 30 * 60);
        assert_eq!(resolver.spacing(155_001), 30);
        assert_eq!(resolver.timespan(572_000), 30 * 60);
        assert_eq!(resolver.timespan(572_001), 15 * 60);
        assert_eq!(resolver.spacing(572_001), 60);
    }

    #[test]
    fn test_interval_per_epoch() {
        let params = ChainParams::main();
        let resolver = ForkEpochResolver::new(&params);

        assert_eq!(resolver.interval(1), 480);
        assert_eq!(resolver.interval(200_000), 60);
        assert_eq!(resolver.interval(700_000), 15);
    }

    #[test]
    fn test_algorithm_dispatch_comparisons() {
        let params = ChainParams::builder(Network::Main)
            .fork_heights(960, 1_200, 1_608)
            .build()
            .unwrap();
        let resolver = ForkEpochResolver::new(&params);

        assert_eq!(resolver.algorithm(959), RetargetAlgorithm::LegacyV1);
        // fork 1 is strict
        assert_eq!(resolver.algorithm(960), RetargetAlgorithm::LegacyV1);
        assert_eq!(resolver.algorithm(961), RetargetAlgorithm::LegacyV2);
        assert_eq!(resolver.algorithm(1_199), RetargetAlgorithm::LegacyV2);
        // fork 2 is inclusive
        assert_eq!(resolver.algorithm(1_200), RetargetAlgorithm::GravityWell);
        assert_eq!(resolver.algorithm(1_608), RetargetAlgorithm::GravityWell);
        assert_eq!(resolver.rule(1_608).activation, Activation::AtOrAbove(1_608));
        assert_eq!(resolver.rule(1_607).activation, Activation::AtOrAbove(1_200));
    }

    #[test]
    fn test_rule_epochs_match_algorithms() {
        let params = ChainParams::testnet();
        let resolver = ForkEpochResolver::new(&params);

        assert_eq!(resolver.rule(10).epoch, 0);
        assert_eq!(resolver.rule(1_000).epoch, 1);
        assert_eq!(resolver.rule(5_000).epoch, 2);
    }

    #[test]
    fn test_activation() {
        assert!(Activation::Always.is_active(0));
        assert!(!Activation::Above(5).is_active(5));
        assert!(Activation::Above(5).is_active(6));
        assert!(Activation::AtOrAbove(5).is_active(5));
        assert!(!Activation::AtOrAbove(5).is_active(4));
        assert!(!Activation::Never.is_active(u32::MAX));
    }

    #[test]
    fn test_min_difficulty_failsafe_row() {
        let params = ChainParams::testnet();
        let resolver = ForkEpochResolver::new(&params);
        assert_eq!(resolver.algorithm_table()[1].activation, Activation::Never);
        assert_eq!(resolver.algorithm(500), RetargetAlgorithm::LegacyV1);

        let params = ChainParams::builder(Network::Test)
            .min_difficulty_failsafe_height(Some(500))
            .build()
            .unwrap();
        let resolver = ForkEpochResolver::new(&params);

        assert_eq!(resolver.algorithm(499), RetargetAlgorithm::LegacyV1);
        assert_eq!(resolver.algorithm(500), RetargetAlgorithm::GravityWell);
        assert_eq!(resolver.rule(500).activation, Activation::AtOrAbove(500));
        assert_eq!(resolver.rule(500).epoch, 2);
        // fork 3 still wins once reached
        assert_eq!(resolver.rule(1_608).activation, Activation::AtOrAbove(1_608));
    }
}
