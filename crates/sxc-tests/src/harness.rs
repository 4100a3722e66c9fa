//! Test harness for consensus scenarios.
//!
//! Bundles network parameters with the validators built on them, plus
//! merge-mining verifier stubs.

use sxc_consensus::{
    AuxPow, AuxPowVerifier, ChainParams, CheckpointGuard, DifficultyEngine, Hash256, Network,
    ProofOfWorkValidator,
};

/// Parameters plus helpers to build the validators over them.
pub struct TestContext {
    pub params: ChainParams,
}

impl TestContext {
    pub fn new(params: ChainParams) -> Self {
        Self { params }
    }

    pub fn main() -> Self {
        Self::new(ChainParams::main())
    }

    pub fn testnet() -> Self {
        Self::new(ChainParams::testnet())
    }

    /// Main-network rules with the three forks moved to low heights.
    pub fn with_forks(fork1: u32, fork2: u32, fork3: u32) -> Self {
        let params = ChainParams::builder(Network::Main)
            .fork_heights(fork1, fork2, fork3)
            .build()
            .expect("fork heights are ordered");
        Self::new(params)
    }

    pub fn engine(&self) -> DifficultyEngine<'_> {
        DifficultyEngine::new(&self.params)
    }

    pub fn validator(&self) -> ProofOfWorkValidator<'_> {
        ProofOfWorkValidator::new(&self.params)
    }

    pub fn guard(&self) -> CheckpointGuard<'_> {
        CheckpointGuard::new(&self.params)
    }
}

/// Verifier that accepts every merge-mining proof.
pub struct AcceptingVerifier;

impl AuxPowVerifier for AcceptingVerifier {
    fn verify(
        &self,
        _aux_pow: &AuxPow,
        _block_hash: &Hash256,
        _chain_id: u32,
        _params: &ChainParams,
    ) -> Result<(), String> {
        Ok(())
    }
}

/// Verifier that accepts only proofs announcing an expected chain ID.
pub struct ChainIdVerifier(pub u32);

impl AuxPowVerifier for ChainIdVerifier {
    fn verify(
        &self,
        _aux_pow: &AuxPow,
        _block_hash: &Hash256,
        chain_id: u32,
        _params: &ChainParams,
    ) -> Result<(), String> {
        if chain_id == self.0 {
            Ok(())
        } else {
            Err(format!("parent commits to chain {chain_id}"))
        }
    }
}
