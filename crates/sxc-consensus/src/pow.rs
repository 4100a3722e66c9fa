//! Proof-of-work validation.
//!
//! Direct blocks are checked by comparing the header's scrypt hash with the
//! target in its `bits` field. Merge-mined blocks delegate parent-chain
//! inclusion to an [`AuxPowVerifier`] and then check the parent block's
//! proof-of-work hash against the same target.

use crate::block::{BlockHeader, Hash256};
use crate::chain_params::ChainParams;
use crate::compact::{max_u256, CompactTarget};
use crate::error::{ConsensusError, ConsensusResult};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use tracing::{debug, instrument, warn};

/// External merge-mining validator.
///
/// Implementations check that `aux_pow` commits to `block_hash` under
/// `chain_id` inside a parent-chain block. The parent's proof-of-work is
/// checked separately by [`ProofOfWorkValidator::check_block_proof`].
pub trait AuxPowVerifier {
    fn verify(
        &self,
        aux_pow: &crate::block::AuxPow,
        block_hash: &Hash256,
        chain_id: u32,
        params: &ChainParams,
    ) -> Result<(), String>;
}

/// Proof-of-work rules for one network.
#[derive(Debug, Clone, Copy)]
pub struct ProofOfWorkValidator<'a> {
    params: &'a ChainParams,
}

impl<'a> ProofOfWorkValidator<'a> {
    pub fn new(params: &'a ChainParams) -> Self {
        Self { params }
    }

    /// Decode `bits` and check it is a usable target within the pow limit.
    pub fn check_target_range_checked(&self, bits: CompactTarget) -> ConsensusResult<BigUint> {
        let decoded = bits.decode();
        let reason = if decoded.negative {
            Some("negative")
        } else if decoded.overflow {
            Some("overflow")
        } else if decoded.value.is_zero() {
            Some("zero")
        } else if &decoded.value > self.params.pow_limit() {
            Some("above proof-of-work limit")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ConsensusError::TargetOutOfRange { bits: bits.0, reason }),
            None => Ok(decoded.value),
        }
    }

    pub fn check_target_range(&self, bits: CompactTarget) -> bool {
        self.check_target_range_checked(bits).is_ok()
    }

    /// Range-check `bits`, then require `hash <= target`.
    pub fn check_proof_checked(&self, hash: &Hash256, bits: CompactTarget) -> ConsensusResult<()> {
        let target = self.check_target_range_checked(bits)?;
        if hash.to_biguint() > target {
            return Err(ConsensusError::HighHash {
                hash: hash.to_hex(),
                target: format!("{bits}"),
            });
        }
        Ok(())
    }

    pub fn check_proof(&self, hash: &Hash256, bits: CompactTarget) -> bool {
        match self.check_proof_checked(hash, bits) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Proof-of-work check failed");
                false
            }
        }
    }

    /// Header must carry this network's merge-mining chain ID. Networks
    /// allowing minimum-difficulty blocks accept any chain ID.
    pub fn check_chain_id_checked(&self, header: &BlockHeader) -> ConsensusResult<()> {
        if self.params.allow_min_difficulty_blocks() {
            return Ok(());
        }
        let expected = self.params.auxpow_chain_id();
        let got = header.chain_id();
        if got != expected {
            return Err(ConsensusError::WrongChainId { got, expected });
        }
        Ok(())
    }

    pub fn check_chain_id(&self, header: &BlockHeader) -> bool {
        self.check_chain_id_checked(header).is_ok()
    }

    /// Full proof-of-work check for a header at `height`.
    ///
    /// From the auxpow start height the chain ID rule applies. A header
    /// flagged as merge-mined must carry a payload, be at or above the start
    /// height, and pass `verifier`; its parent's hash is then checked against
    /// `bits`. Otherwise the header's own proof-of-work hash is checked.
    #[instrument(skip(self, header, verifier))]
    pub fn check_block_proof(
        &self,
        header: &BlockHeader,
        height: u32,
        verifier: &dyn AuxPowVerifier,
    ) -> ConsensusResult<()> {
        let bits = CompactTarget(header.bits);
        let auxpow_active = height >= self.params.auxpow_start_height();

        if auxpow_active {
            self.check_chain_id_checked(header)?;
        }

        match (&header.aux_pow, header.is_aux_pow()) {
            (None, true) => Err(ConsensusError::MissingAuxPow),
            (Some(_), false) => Err(ConsensusError::UnexpectedAuxPow),
            (None, false) => self.check_proof_checked(&header.pow_hash(), bits),
            (Some(aux_pow), true) => {
                if !auxpow_active {
                    return Err(ConsensusError::AuxPowNotAllowed { height });
                }
                verifier
                    .verify(aux_pow, &header.hash(), header.chain_id(), self.params)
                    .map_err(|reason| {
                        warn!(%reason, "Merge-mining proof rejected");
                        ConsensusError::InvalidAuxPow(reason)
                    })?;
                self.check_proof_checked(&aux_pow.parent_pow_hash, bits)
            }
        }
    }
}

/// Expected number of hashes to meet `bits`: `2^256 / (target + 1)`.
///
/// Zero for negative, overflowed or zero targets.
pub fn block_proof(bits: CompactTarget) -> BigUint {
    let decoded = bits.decode();
    if !decoded.is_valid() {
        return BigUint::zero();
    }
    let target = decoded.value;
    let not_target = max_u256() - &target;
    not_target / (target + BigUint::one()) + BigUint::one()
}
