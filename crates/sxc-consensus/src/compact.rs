//! Compact ("nBits") target encoding.
//!
//! A compact target packs a 256-bit magnitude into 32 bits:
//! - the high byte is the byte length of the magnitude (the exponent)
//! - the low three bytes are the most significant bytes (the mantissa)
//! - bit 23 of the mantissa is a sign flag
//!
//! Decoding keeps the negative and overflow conditions separate from the
//! value so validation can report them distinctly. Values are truncated to
//! 256 bits, matching a fixed-width `uint256`.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use once_cell::sync::Lazy;
use std::fmt;

/// Sign bit inside the 24-bit mantissa.
const SIGN_BIT: u32 = 0x0080_0000;

/// Unsigned mantissa mask.
const MANTISSA_MASK: u32 = 0x007f_ffff;

static U256_MASK: Lazy<BigUint> = Lazy::new(|| (BigUint::from(1u32) << 256usize) - 1u32);

/// The largest 256-bit value, `2^256 - 1`.
pub fn max_u256() -> &'static BigUint {
    &U256_MASK
}

/// Truncate a value to its low 256 bits.
pub fn truncate_u256(value: BigUint) -> BigUint {
    value & &*U256_MASK
}

/// Multiply a 256-bit target by an elapsed-seconds value.
///
/// The factor is taken modulo 2^32 and the product wraps modulo 2^256.
pub fn mul_seconds_u256(target: &BigUint, seconds: i64) -> BigUint {
    truncate_u256(target * (seconds as u32))
}

/// A 32-bit compact target as stored in block headers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CompactTarget(pub u32);

impl fmt::Debug for CompactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompactTarget(0x{:08x})", self.0)
    }
}

impl fmt::Display for CompactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl From<u32> for CompactTarget {
    fn from(bits: u32) -> Self {
        CompactTarget(bits)
    }
}

impl From<CompactTarget> for u32 {
    fn from(c: CompactTarget) -> Self {
        c.0
    }
}

/// Result of decoding a compact target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTarget {
    /// Magnitude, truncated to 256 bits.
    pub value: BigUint,
    /// Sign flag was set on a non-zero mantissa.
    pub negative: bool,
    /// Exponent pushes a non-zero mantissa past 256 bits.
    pub overflow: bool,
}

impl DecodedTarget {
    /// True if the target is usable: positive, non-zero and not overflowed.
    pub fn is_valid(&self) -> bool {
        !self.negative && !self.overflow && !self.value.is_zero()
    }
}

impl CompactTarget {
    /// Decode into a 256-bit magnitude plus sign/overflow flags.
    pub fn decode(self) -> DecodedTarget {
        let bits = self.0;
        let size = bits >> 24;
        let mut word = bits & MANTISSA_MASK;

        let value = if size <= 3 {
            word >>= 8 * (3 - size);
            BigUint::from(word)
        } else {
            truncate_u256(BigUint::from(word) << (8 * (size - 3)) as usize)
        };

        let negative = word != 0 && (bits & SIGN_BIT) != 0;
        let overflow = word != 0
            && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));

        DecodedTarget {
            value,
            negative,
            overflow,
        }
    }

    /// Decode, discarding the flags.
    pub fn to_target(self) -> BigUint {
        self.decode().value
    }

    /// Encode a non-negative magnitude.
    ///
    /// When the top mantissa byte would set the sign bit the mantissa is
    /// shifted down one byte and the exponent bumped.
    pub fn from_target(target: &BigUint) -> Self {
        let mut size = ((target.bits() + 7) / 8) as u32;

        let mut compact: u32 = if size <= 3 {
            let low = target.to_u64().unwrap_or_default();
            (low << (8 * (3 - size))) as u32
        } else {
            let shifted: BigUint = target >> (8 * (size - 3)) as usize;
            shifted.to_u32().unwrap_or_default()
        };

        if compact & SIGN_BIT != 0 {
            compact >>= 8;
            size += 1;
        }

        CompactTarget(compact | (size << 24))
    }

    /// Raw 32-bit value.
    pub fn bits(self) -> u32 {
        self.0
    }
}
