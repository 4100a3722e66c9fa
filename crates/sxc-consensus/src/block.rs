//! Block header primitives.
//!
//! Headers are 80 bytes on the wire, all integers little-endian. The block
//! hash is double SHA-256 of those bytes; the proof-of-work hash is
//! scrypt(N=1024, r=1, p=1) with the header as both password and salt.

use num_bigint::BigUint;
use scrypt::{scrypt, Params as ScryptParams};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Serialized header length.
pub const HEADER_SIZE: usize = 80;

/// Version bit flags used for merge mining.
pub mod version_bits {
    /// Primary version.
    pub const DEFAULT: i32 = 1 << 0;
    /// Block carries auxiliary proof-of-work.
    pub const AUXPOW: i32 = 1 << 8;
    /// First bit of the chain ID field.
    pub const CHAIN_START: i32 = 1 << 16;
    /// One past the last chain ID bit.
    pub const CHAIN_END: i32 = 1 << 30;
}

/// A 256-bit hash in internal (little-endian) byte order.
///
/// Displayed and parsed byte-reversed, the conventional block-hash form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// All-zero hash.
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    /// Parse display-order hex. Accepts an optional `0x` prefix.
    ///
    /// Panics on malformed input; used for compiled-in constants.
    pub fn from_hex_const(s: &str) -> Self {
        match s.parse() {
            Ok(h) => h,
            Err(e) => panic!("invalid hash constant {s}: {e}"),
        }
    }

    /// Interpret as an unsigned 256-bit magnitude.
    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_le(&self.0)
    }

    /// True if every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Display-order hex string.
    pub fn to_hex(&self) -> String {
        let mut bytes = self.0;
        bytes.reverse();
        hex::encode(bytes)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl FromStr for Hash256 {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        bytes.reverse();
        Ok(Hash256(bytes))
    }
}

/// Double SHA-256.
pub fn sha256d(data: &[u8]) -> Hash256 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    Hash256(second.into())
}

/// scrypt(N=1024, r=1, p=1) with `data` as password and salt.
pub fn scrypt_hash(data: &[u8]) -> Hash256 {
    let params = ScryptParams::new(10, 1, 1, 32).expect("static scrypt parameters are valid");
    let mut out = [0u8; 32];
    scrypt(data, data, &params, &mut out).expect("32-byte scrypt output is valid");
    Hash256(out)
}

/// Auxiliary proof-of-work payload of a merge-mined block.
///
/// `proof` is opaque to this crate; the external merge-mining validator
/// checks parent-chain inclusion from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxPow {
    /// Proof-of-work hash of the parent chain's block header.
    pub parent_pow_hash: Hash256,
    /// Serialized merge-mining proof (coinbase, merkle branches, parent header).
    pub proof: Vec<u8>,
}

/// Block header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block: Hash256,
    pub merkle_root: Hash256,
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
    /// Present only on merge-mined blocks.
    pub aux_pow: Option<AuxPow>,
}

impl BlockHeader {
    /// Serialize the 80-byte header.
    pub fn serialize(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..36].copy_from_slice(&self.prev_block.0);
        out[36..68].copy_from_slice(&self.merkle_root.0);
        out[68..72].copy_from_slice(&self.time.to_le_bytes());
        out[72..76].copy_from_slice(&self.bits.to_le_bytes());
        out[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    /// Block identifier.
    pub fn hash(&self) -> Hash256 {
        sha256d(&self.serialize())
    }

    /// Hash compared against the target for non-merge-mined blocks.
    pub fn pow_hash(&self) -> Hash256 {
        scrypt_hash(&self.serialize())
    }

    /// Version without auxpow flag and chain ID.
    pub fn base_version(&self) -> i32 {
        self.version % version_bits::AUXPOW
    }

    /// Version announces auxiliary proof-of-work.
    pub fn is_aux_pow(&self) -> bool {
        self.version & version_bits::AUXPOW != 0
    }

    /// Merge-mining chain ID from bits 16..30.
    pub fn chain_id(&self) -> u32 {
        (self.version / version_bits::CHAIN_START) as u32
    }

    /// Replace the chain ID, keeping base version and auxpow flag.
    pub fn set_chain_id(&mut self, chain_id: u32) {
        self.version %= version_bits::CHAIN_START;
        self.version |= (chain_id as i32) * version_bits::CHAIN_START;
    }

    /// Set or clear the auxpow flag.
    pub fn set_aux_pow_flag(&mut self, aux: bool) {
        if aux {
            self.version |= version_bits::AUXPOW;
        } else {
            self.version &= !version_bits::AUXPOW;
        }
    }
}
