//! # sxc-tests
//!
//! Cross-module scenarios for the Sexcoin consensus core.
//!
//! - `generators`: synthetic header chains with controlled spacing
//! - `harness`: parameter contexts and merge-mining verifier stubs
//! - scenario tests: epoch dispatch, gravity well, proof-of-work, genesis
//! - property tests: compact codec and retarget invariants

pub mod generators;
pub mod harness;

#[cfg(test)]
mod genesis_tests;

pub use generators::*;
pub use harness::*;
