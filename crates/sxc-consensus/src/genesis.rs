//! Genesis block construction and offline mining.
//!
//! Every network shares the same coinbase: a scriptSig carrying the
//! launch headline and a single output paying the reward to a fixed
//! uncompressed public key. Only time, nonce, bits, version and reward vary.

use crate::block::{sha256d, BlockHeader, Hash256};
use crate::chain_params::ChainParams;
use crate::compact::CompactTarget;
use crate::error::{ConfigError, ConsensusError, ConsensusResult};
use num_bigint::BigUint;
use tracing::{debug, info, trace};

/// Headline embedded in the coinbase scriptSig.
pub const GENESIS_TIMESTAMP: &str = "Disaster from the sky in Oklahoma";

/// Recipient of the genesis reward.
pub const GENESIS_OUTPUT_PUBKEY: &str = "04a5814813115273a109cff99907ba4a05d951873dae7acb6c973d0c9e7c88911a3dbc9aa600deac241b91707e7b4ffb30ad91c8e56e695a1ddf318592988afe0a";

const OP_PUSHDATA1: u8 = 0x4c;
const OP_CHECKSIG: u8 = 0xac;

/// Nonces between mining progress logs.
const PROGRESS_INTERVAL: u32 = 4096;

/// A genesis header with its serialized coinbase transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisBlock {
    pub header: BlockHeader,
    pub coinbase: Vec<u8>,
}

impl GenesisBlock {
    pub fn hash(&self) -> Hash256 {
        self.header.hash()
    }
}

fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    if data.len() < OP_PUSHDATA1 as usize {
        script.push(data.len() as u8);
    } else {
        script.push(OP_PUSHDATA1);
        script.push(data.len() as u8);
    }
    script.extend_from_slice(data);
}

fn write_compact_size(out: &mut Vec<u8>, n: usize) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        _ => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
    }
}

/// Coinbase scriptSig: `push(486604799) push(4) push(headline)`.
pub fn coinbase_script_sig() -> Vec<u8> {
    let mut script = Vec::with_capacity(48);
    push_data(&mut script, &0x1d00ffffu32.to_le_bytes());
    push_data(&mut script, &[4]);
    push_data(&mut script, GENESIS_TIMESTAMP.as_bytes());
    script
}

/// Output script: `<pubkey> OP_CHECKSIG`.
pub fn coinbase_script_pubkey() -> Vec<u8> {
    let pubkey = hex::decode(GENESIS_OUTPUT_PUBKEY).unwrap_or_default();
    let mut script = Vec::with_capacity(pubkey.len() + 2);
    push_data(&mut script, &pubkey);
    script.push(OP_CHECKSIG);
    script
}

/// Serialized coinbase transaction paying `reward`.
pub fn coinbase_transaction(reward: i64) -> Vec<u8> {
    let script_sig = coinbase_script_sig();
    let script_pubkey = coinbase_script_pubkey();

    let mut tx = Vec::with_capacity(64 + script_sig.len() + script_pubkey.len());
    tx.extend_from_slice(&1i32.to_le_bytes());

    write_compact_size(&mut tx, 1);
    tx.extend_from_slice(&[0u8; 32]);
    tx.extend_from_slice(&u32::MAX.to_le_bytes());
    write_compact_size(&mut tx, script_sig.len());
    tx.extend_from_slice(&script_sig);
    tx.extend_from_slice(&u32::MAX.to_le_bytes());

    write_compact_size(&mut tx, 1);
    tx.extend_from_slice(&reward.to_le_bytes());
    write_compact_size(&mut tx, script_pubkey.len());
    tx.extend_from_slice(&script_pubkey);

    tx.extend_from_slice(&0u32.to_le_bytes());
    tx
}

/// Assemble the height-0 block. No search is performed.
pub fn build(time: u32, nonce: u32, bits: u32, version: i32, reward: i64) -> GenesisBlock {
    let coinbase = coinbase_transaction(reward);
    // single transaction: merkle root is its txid
    let merkle_root = sha256d(&coinbase);

    GenesisBlock {
        header: BlockHeader {
            version,
            prev_block: Hash256::ZERO,
            merkle_root,
            time,
            bits,
            nonce,
            aux_pow: None,
        },
        coinbase,
    }
}

/// Genesis block from a network's declared parameters.
pub fn build_for(params: &ChainParams) -> GenesisBlock {
    let g = params.genesis();
    build(g.time, g.nonce, g.bits, g.version, g.reward)
}

/// Rebuild a network's genesis and compare it with the shipped constants.
pub fn verify_genesis(params: &ChainParams) -> Result<GenesisBlock, ConfigError> {
    let block = build_for(params);
    let expected = &params.genesis().hash;
    let computed = block.hash();

    if computed != *expected {
        return Err(ConfigError::GenesisMismatch {
            network: params.network().to_string(),
            expected: expected.to_hex(),
            computed: computed.to_hex(),
        });
    }
    if let Some(merkle_root) = &params.genesis().merkle_root {
        if block.header.merkle_root != *merkle_root {
            return Err(ConfigError::GenesisMismatch {
                network: params.network().to_string(),
                expected: merkle_root.to_hex(),
                computed: block.header.merkle_root.to_hex(),
            });
        }
    }

    debug!(network = %params.network(), hash = %computed, "Genesis block verified");
    Ok(block)
}

/// Search nonces (then timestamps) until the header meets its own target.
///
/// Runs without bound. Only for bootstrapping a new network.
pub fn mine(seed: BlockHeader) -> ConsensusResult<BlockHeader> {
    let mut search = NonceSearch::start(seed)?;
    loop {
        if search.attempt() {
            return Ok(search.header);
        }
    }
}

/// As [`mine`], giving up after `max_attempts` hashes.
pub fn mine_bounded(seed: BlockHeader, max_attempts: u64) -> ConsensusResult<Option<BlockHeader>> {
    let mut search = NonceSearch::start(seed)?;
    while search.attempts < max_attempts {
        if search.attempt() {
            return Ok(Some(search.header));
        }
    }
    Ok(None)
}

struct NonceSearch {
    header: BlockHeader,
    target: BigUint,
    attempts: u64,
}

impl NonceSearch {
    fn start(header: BlockHeader) -> ConsensusResult<Self> {
        let decoded = CompactTarget(header.bits).decode();
        if !decoded.is_valid() {
            return Err(ConsensusError::TargetOutOfRange {
                bits: header.bits,
                reason: "cannot mine against an unusable target",
            });
        }

        info!(
            time = header.time,
            nonce = header.nonce,
            nbits = format!("0x{:08x}", header.bits),
            "Searching for genesis block"
        );

        Ok(Self {
            header,
            target: decoded.value,
            attempts: 0,
        })
    }

    /// Hash the current header. On failure, advance to the next candidate.
    fn attempt(&mut self) -> bool {
        self.attempts += 1;

        let pow_hash = self.header.pow_hash();
        if pow_hash.to_biguint() <= self.target {
            info!(
                time = self.header.time,
                nonce = self.header.nonce,
                hash = %self.header.hash(),
                pow_hash = %pow_hash,
                attempts = self.attempts,
                "Found genesis block"
            );
            return true;
        }

        if self.header.nonce % PROGRESS_INTERVAL == 0 {
            trace!(nonce = self.header.nonce, time = self.header.time, %pow_hash, "Mining progress");
        }

        self.header.nonce = self.header.nonce.wrapping_add(1);
        if self.header.nonce == 0 {
            self.header.time = self.header.time.wrapping_add(1);
            debug!(time = self.header.time, "Nonce space exhausted, bumped timestamp");
        }
        false
    }
}
