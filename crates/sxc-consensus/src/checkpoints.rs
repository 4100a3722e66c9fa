//! Hard-coded checkpoints and assume-valid bounds.

use crate::block::Hash256;
use crate::chain_params::{ChainParams, Network};
use crate::error::{ConsensusError, ConsensusResult};
use num_bigint::BigUint;
use tracing::{debug, warn};

/// Checkpoint enforcement for one network.
#[derive(Debug, Clone, Copy)]
pub struct CheckpointGuard<'a> {
    params: &'a ChainParams,
    enforced: bool,
}

impl<'a> CheckpointGuard<'a> {
    /// Guard with enforcement on.
    pub fn new(params: &'a ChainParams) -> Self {
        Self {
            params,
            enforced: true,
        }
    }

    /// Guard with configurable enforcement. Main network ignores `enabled`.
    pub fn with_enforcement(params: &'a ChainParams, enabled: bool) -> Self {
        let enforced = if params.network() == Network::Main && !enabled {
            warn!("Checkpoints cannot be disabled on the main network");
            true
        } else {
            enabled
        };
        Self { params, enforced }
    }

    pub fn is_enforced(&self) -> bool {
        self.enforced
    }

    /// Recorded hash at `height`, if any.
    pub fn checkpoint_at(&self, height: u32) -> Option<&'a Hash256> {
        let checkpoints = self.params.checkpoints();
        checkpoints
            .binary_search_by_key(&height, |(h, _)| *h)
            .ok()
            .map(|index| &checkpoints[index].1)
    }

    /// Reject `hash` if it disagrees with the checkpoint at `height`.
    pub fn check_checked(&self, height: u32, hash: &Hash256) -> ConsensusResult<()> {
        if !self.enforced {
            return Ok(());
        }
        match self.checkpoint_at(height) {
            Some(expected) if expected != hash => Err(ConsensusError::CheckpointMismatch {
                height,
                expected: expected.to_hex(),
                got: hash.to_hex(),
            }),
            _ => Ok(()),
        }
    }

    /// True if no checkpoint exists at `height` or `hash` matches it.
    pub fn check(&self, height: u32, hash: &Hash256) -> bool {
        match self.check_checked(height, hash) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Checkpoint rejected block");
                false
            }
        }
    }

    /// Highest checkpointed height, or 0 when checkpoints are off.
    pub fn total_checkpointed_height(&self) -> u32 {
        if !self.enforced {
            return 0;
        }
        self.params
            .checkpoints()
            .last()
            .map(|(height, _)| *height)
            .unwrap_or(0)
    }

    /// Highest checkpoint whose hash the caller's index contains.
    pub fn last_checkpoint<F>(&self, mut contains: F) -> Option<(u32, Hash256)>
    where
        F: FnMut(&Hash256) -> bool,
    {
        if !self.enforced {
            return None;
        }
        self.params
            .checkpoints()
            .iter()
            .rev()
            .find(|(_, hash)| contains(hash))
            .copied()
    }

    /// Whether script checks may be skipped for a block.
    ///
    /// Requires a non-zero assume-valid hash on this network, the caller's
    /// confirmation that it is an ancestor of the block being connected,
    /// and at least the network's minimum chain work.
    pub fn assume_valid(&self, ancestor_present: bool, chain_work: &BigUint) -> bool {
        let assumed = self.params.default_assume_valid();
        !assumed.is_zero() && ancestor_present && chain_work >= self.params.minimum_chain_work()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_checkpoint() {
        for params in [ChainParams::main(), ChainParams::testnet(), ChainParams::regtest()] {
            let guard = CheckpointGuard::new(&params);
            assert!(guard.check(0, &params.genesis().hash), "{}", params.network());
        }
    }

    #[test]
    fn test_mismatch_rejected() {
        let params = ChainParams::main();
        let guard = CheckpointGuard::new(&params);

        assert!(!guard.check(5_363, &Hash256::ZERO));
        assert!(matches!(
            guard.check_checked(5_363, &Hash256::ZERO),
            Err(ConsensusError::CheckpointMismatch { height: 5_363, .. })
        ));
        assert!(guard.check(5_364, &Hash256::ZERO));
    }

    #[test]
    fn test_total_checkpointed_height() {
        let main = ChainParams::main();
        assert_eq!(CheckpointGuard::new(&main).total_checkpointed_height(), 3_013_737);

        let test = ChainParams::testnet();
        assert_eq!(CheckpointGuard::new(&test).total_checkpointed_height(), 0);
    }

    #[test]
    fn test_disabled_on_testnet_only() {
        let test = ChainParams::testnet();
        let guard = CheckpointGuard::with_enforcement(&test, false);
        assert!(!guard.is_enforced());
        assert!(guard.check(0, &Hash256::ZERO));
        assert!(guard.last_checkpoint(|_| true).is_none());

        let main = ChainParams::main();
        let guard = CheckpointGuard::with_enforcement(&main, false);
        assert!(guard.is_enforced());
        assert!(!guard.check(0, &Hash256::ZERO));
    }

    #[test]
    fn test_last_checkpoint() {
        let params = ChainParams::main();
        let guard = CheckpointGuard::new(&params);
        let known: Vec<Hash256> = params
            .checkpoints()
            .iter()
            .filter(|(height, _)| *height <= 100_000)
            .map(|(_, hash)| *hash)
            .collect();

        let (height, _) = guard.last_checkpoint(|hash| known.contains(hash)).unwrap();
        assert_eq!(height, 94_458);
        assert!(guard.last_checkpoint(|_| false).is_none());
    }

    #[test]
    fn test_assume_valid() {
        let main = ChainParams::main();
        let guard = CheckpointGuard::new(&main);
        let enough = main.minimum_chain_work().clone();
        let short = &enough - 1u32;

        assert!(guard.assume_valid(true, &enough));
        assert!(!guard.assume_valid(false, &enough));
        assert!(!guard.assume_valid(true, &short));

        let regtest = ChainParams::regtest();
        let guard = CheckpointGuard::new(&regtest);
        assert!(!guard.assume_valid(true, &BigUint::from(u64::MAX)));
    }
}
