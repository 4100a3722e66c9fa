//! # sxc-consensus
//!
//! Consensus rules for the Sexcoin blockchain.
//!
//! This crate provides:
//! - Network parameters and process-wide network selection
//! - Height-triggered fork epochs
//! - Difficulty adjustment (legacy retarget and Kimoto Gravity Well)
//! - Scrypt proof-of-work and merge-mining (auxpow) checks
//! - Checkpoints and genesis block construction
//!
//! ## Difficulty Adjustment
//!
//! Three historical epochs apply by height:
//! - before fork 1: retarget every 480 blocks over 8 hours
//! - after fork 1: retarget every 60 blocks over 30 minutes
//! - from fork 2: Kimoto Gravity Well every block, with a time-warp fix
//!   from fork 3
//!
//! All target arithmetic reproduces fixed-width 256-bit behaviour so that
//! historical blocks validate unchanged.
//!
//! ## Proof of Work
//!
//! Block hashes are double SHA-256; proof-of-work hashes are
//! scrypt(N=1024, r=1, p=1). Merge-mined blocks carry the parent chain's
//! proof and a chain ID in the version field.

pub mod block;
pub mod chain;
mod chain_params;
mod checkpoints;
mod compact;
mod difficulty;
mod error;
mod fork_epochs;
pub mod genesis;
mod gravity_well;
mod pow;

pub use block::{sha256d, AuxPow, BlockHeader, Hash256};
pub use chain::{ChainEntry, HeaderArena, HeaderChain};
pub use chain_params::{
    auxpow_start, select_network, selected_params, Base58Prefixes, ChainParams,
    ChainParamsBuilder, Deployment, EpochParams, GenesisParams, Network, AUXPOW_CHAIN_ID, COIN,
    HISTORICAL_EPOCHS,
};
pub use checkpoints::CheckpointGuard;
pub use compact::{max_u256, mul_seconds_u256, truncate_u256, CompactTarget, DecodedTarget};
pub use difficulty::{retarget_by_timespan, DifficultyEngine};
pub use error::{ConfigError, ConsensusError, ConsensusResult};
pub use fork_epochs::{Activation, ForkEpochResolver, ForkRule, RetargetAlgorithm};
pub use genesis::{verify_genesis, GenesisBlock};
pub use gravity_well::{event_horizon_deviation, GravityWell};
pub use pow::{block_proof, AuxPowVerifier, ProofOfWorkValidator};

/// Sexcoin consensus constants.
pub mod params {
    /// Gravity well target spacing in seconds.
    pub const KGW_TARGET_SPACING_SECS: i64 = 60;

    /// Minimum gravity well sample (0.25 days of blocks).
    pub const KGW_PAST_BLOCKS_MIN: u64 = 360;

    /// Maximum gravity well sample (7 days of blocks).
    pub const KGW_PAST_BLOCKS_MAX: u64 = 10_080;

    /// Deviation envelope scale: `1 + SCALE * (mass / WINDOW)^EXPONENT`.
    pub const KGW_DEVIATION_SCALE: f64 = 0.7084;

    /// Deviation envelope window in blocks.
    pub const KGW_DEVIATION_WINDOW: f64 = 144.0;

    /// Deviation envelope exponent.
    pub const KGW_DEVIATION_EXPONENT: f64 = -1.228;

    /// Largest single-step swing of a legacy retarget, either direction.
    pub const RETARGET_CLAMP_FACTOR: i64 = 4;

    /// Gap, in base spacings, after which a min-difficulty block is allowed.
    pub const MIN_DIFFICULTY_GAP_SPACINGS: i64 = 2;
}
