//! Ancestor-chain access for difficulty calculation.
//!
//! The block index belongs to the caller. This crate only reads it through
//! [`HeaderChain`], an index lookup by height on the branch ending at the
//! ancestor under consideration. [`HeaderArena`] is a contiguous in-memory
//! implementation used by tools and tests.

use crate::error::{ConsensusError, ConsensusResult};

/// Header data needed for difficulty calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainEntry {
    /// Block height.
    pub height: u32,
    /// Block timestamp in seconds.
    pub time: u32,
    /// Compact target (nBits).
    pub bits: u32,
}

impl ChainEntry {
    pub fn new(height: u32, time: u32, bits: u32) -> Self {
        Self { height, time, bits }
    }
}

/// Read access to one branch of the header index.
pub trait HeaderChain {
    /// Entry at `height` on this branch, if loaded.
    fn entry(&self, height: u32) -> Option<&ChainEntry>;

    /// Entry at `height`, or [`ConsensusError::MissingAncestor`].
    fn ancestor(&self, height: u32) -> ConsensusResult<&ChainEntry> {
        self.entry(height)
            .ok_or(ConsensusError::MissingAncestor { height })
    }
}

/// Contiguous run of headers starting at `base`.
#[derive(Debug, Clone, Default)]
pub struct HeaderArena {
    base: u32,
    entries: Vec<ChainEntry>,
}

impl HeaderArena {
    /// Empty arena whose first entry will sit at `base`.
    pub fn new(base: u32) -> Self {
        Self {
            base,
            entries: Vec::new(),
        }
    }

    /// Append the next header. Height is assigned from position.
    pub fn push(&mut self, time: u32, bits: u32) -> &ChainEntry {
        let height = self.base + self.entries.len() as u32;
        self.entries.push(ChainEntry::new(height, time, bits));
        &self.entries[self.entries.len() - 1]
    }

    /// Overwrite an entry in place. Returns false if `height` is not loaded.
    pub fn set(&mut self, height: u32, time: u32, bits: u32) -> bool {
        match height
            .checked_sub(self.base)
            .and_then(|offset| self.entries.get_mut(offset as usize))
        {
            Some(entry) => {
                entry.time = time;
                entry.bits = bits;
                true
            }
            None => false,
        }
    }

    /// Highest loaded entry.
    pub fn tip(&self) -> Option<&ChainEntry> {
        self.entries.last()
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainEntry> {
        self.entries.iter()
    }
}

impl HeaderChain for HeaderArena {
    fn entry(&self, height: u32) -> Option<&ChainEntry> {
        let offset = height.checked_sub(self.base)?;
        self.entries.get(offset as usize)
    }
}

/// Slices are expected in ascending height order. A gap or reordering
/// shows up as a missing entry, never as a different block.
impl HeaderChain for [ChainEntry] {
    fn entry(&self, height: u32) -> Option<&ChainEntry> {
        let first = self.first()?;
        let offset = height.checked_sub(first.height)?;
        self.get(offset as usize).filter(|entry| entry.height == height)
    }
}

impl HeaderChain for Vec<ChainEntry> {
    fn entry(&self, height: u32) -> Option<&ChainEntry> {
        self.as_slice().entry(height)
    }
}
