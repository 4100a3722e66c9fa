//! Genesis blocks and checkpoints across networks.

use crate::harness::*;
use sxc_consensus::genesis::{build_for, mine_bounded};
use sxc_consensus::{
    select_network, verify_genesis, ChainParams, CheckpointGuard, CompactTarget, Hash256,
    Network,
};

fn all_networks() -> [ChainParams; 3] {
    [ChainParams::main(), ChainParams::testnet(), ChainParams::regtest()]
}

/// Test that each network's genesis hash is its own height-0 checkpoint.
#[test]
fn test_genesis_matches_checkpoint_zero() {
    for params in all_networks() {
        let block = verify_genesis(&params).unwrap();
        let guard = CheckpointGuard::new(&params);

        assert_eq!(guard.checkpoint_at(0), Some(&block.hash()), "{}", params.network());
        assert!(guard.check(0, &block.hash()));
    }
}

/// Test that main and test genesis headers meet their own targets.
#[test]
fn test_genesis_proof_of_work() {
    for ctx in [TestContext::main(), TestContext::testnet()] {
        let block = build_for(&ctx.params);
        let bits = CompactTarget(block.header.bits);
        assert!(
            ctx.validator().check_proof(&block.header.pow_hash(), bits),
            "{}",
            ctx.params.network()
        );
    }
}

/// Test that a perturbed genesis fails both self-check and proof-of-work.
#[test]
fn test_perturbed_genesis_rejected() {
    let ctx = TestContext::main();
    let mut header = build_for(&ctx.params).header;
    header.nonce += 1;

    assert_ne!(header.hash(), ctx.params.genesis().hash);
    assert!(!ctx
        .validator()
        .check_proof(&header.pow_hash(), CompactTarget(header.bits)));
    assert!(!ctx.guard().check(0, &header.hash()));
}

/// Test that bounded mining from the shipped nonce returns it immediately.
#[test]
fn test_mine_from_known_solution() {
    let params = ChainParams::testnet();
    let seed = build_for(&params).header;

    let mined = mine_bounded(seed.clone(), 1).unwrap().unwrap();
    assert_eq!(mined, seed);
    assert_eq!(mined.hash(), params.genesis().hash);
}

/// Test main-network checkpoint enforcement end to end.
#[test]
fn test_main_checkpoints() {
    let params = ChainParams::main();
    let guard = CheckpointGuard::with_enforcement(&params, false);
    assert!(guard.is_enforced());

    let (height, hash) = *params.checkpoints().last().unwrap();
    assert_eq!(guard.total_checkpointed_height(), height);
    assert!(guard.check(height, &hash));
    assert!(!guard.check(height, &Hash256::ZERO));

    // heights between checkpoints accept anything
    assert!(guard.check(height + 1, &Hash256::ZERO));
}

/// Test that test networks can run without checkpoints.
#[test]
fn test_disabled_checkpoints_on_testnet() {
    let params = ChainParams::testnet();
    let guard = CheckpointGuard::with_enforcement(&params, false);

    assert!(!guard.is_enforced());
    assert!(guard.check(0, &Hash256::ZERO));
    assert_eq!(guard.total_checkpointed_height(), 0);
    assert_eq!(guard.last_checkpoint(|_| true), None);
}

/// Test that the highest known checkpoint is found from the caller's index.
#[test]
fn test_last_checkpoint_lookup() {
    let params = ChainParams::main();
    let guard = CheckpointGuard::new(&params);
    let known: Vec<Hash256> = params
        .checkpoints()
        .iter()
        .take(3)
        .map(|(_, hash)| *hash)
        .collect();

    let (height, hash) = guard.last_checkpoint(|h| known.contains(h)).unwrap();
    assert_eq!((height, hash), params.checkpoints()[2]);
}

/// Test that the process-wide network is selected once.
#[test]
fn test_select_network_returns_factory_values() {
    // other tests in this binary never select, so this is the first call
    let params = select_network(Network::Test).unwrap();
    assert_eq!(params.network(), Network::Test);
    assert_eq!(params.genesis().hash, ChainParams::testnet().genesis().hash);

    assert!(select_network(Network::Test).is_ok());
    assert!(select_network(Network::Main).is_err());
}
