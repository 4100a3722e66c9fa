//! Error types for consensus validation and network configuration.

use thiserror::Error;

/// Errors raised while selecting or constructing network parameters.
///
/// These are fatal at startup: a node must not proceed with a partially
/// configured network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Network identifier is not one of `main`, `test`, `regtest`.
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    /// An epoch's timespan/spacing pair yields a zero retarget interval.
    #[error("Retarget interval for epoch {epoch} is zero")]
    ZeroInterval { epoch: usize },

    /// A parameter value is out of range or inconsistent with another one.
    #[error("Invalid parameter '{field}': {message}")]
    InvalidParameter {
        field: &'static str,
        message: String,
    },

    /// Process-wide network selection was already made.
    #[error("Network already selected as '{selected}', cannot select '{requested}'")]
    AlreadySelected {
        selected: String,
        requested: String,
    },

    /// The rebuilt genesis block does not hash to the shipped constant.
    #[error("Genesis mismatch on {network}: expected {expected}, computed {computed}")]
    GenesisMismatch {
        network: String,
        expected: String,
        computed: String,
    },
}

/// Consensus validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    /// Compact target is negative, zero, overflowed or easier than the limit.
    #[error("nBits 0x{bits:08x} out of range: {reason}")]
    TargetOutOfRange { bits: u32, reason: &'static str },

    /// Proof-of-work hash is above the claimed target.
    #[error("Hash {hash} doesn't match nBits target {target}")]
    HighHash { hash: String, target: String },

    /// Header carries a foreign merge-mining chain ID.
    #[error("Block does not have our chain ID: got {got}, expected {expected}")]
    WrongChainId { got: u32, expected: u32 },

    /// Auxiliary proof-of-work used before it is permitted.
    #[error("Auxpow not allowed at height {height}")]
    AuxPowNotAllowed { height: u32 },

    /// Version announces auxpow but no payload was supplied.
    #[error("No auxpow on block with auxpow version")]
    MissingAuxPow,

    /// Payload supplied but version does not announce auxpow.
    #[error("Auxpow on block with non-auxpow version")]
    UnexpectedAuxPow,

    /// The external merge-mining validator rejected the payload.
    #[error("Invalid auxpow: {0}")]
    InvalidAuxPow(String),

    /// Candidate hash disagrees with the hard-coded checkpoint.
    #[error("Checkpoint mismatch at height {height}: expected {expected}, got {got}")]
    CheckpointMismatch {
        height: u32,
        expected: String,
        got: String,
    },

    /// A structurally required ancestor is not present in the header index.
    #[error("Missing ancestor at height {height}")]
    MissingAncestor { height: u32 },

    /// The ancestor is already at the highest representable height.
    #[error("No successor height after {height}")]
    HeightOverflow { height: u32 },
}

impl ConsensusError {
    /// True for errors that indicate corrupted chain-index state rather
    /// than an invalid block.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            ConsensusError::MissingAncestor { .. } | ConsensusError::HeightOverflow { .. }
        )
    }
}

/// Result type for consensus operations.
pub type ConsensusResult<T> = Result<T, ConsensusError>;
