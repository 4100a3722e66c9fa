//! Sexcoin consensus node.
//!
//! Selects a network, verifies its genesis block and exposes the consensus
//! core's offline tools: parameter summary, checkpoint lookup and genesis
//! mining for new networks.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use sxc_consensus::genesis;
use sxc_consensus::{
    select_network, verify_genesis, CheckpointGuard, ChainParams, CompactTarget, Deployment,
    ForkEpochResolver, Hash256, Network,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod config;

use config::NodeConfig;

/// Sexcoin consensus core node.
#[derive(Parser, Debug)]
#[command(name = "sxc-node")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "sxc-node.toml")]
    config: PathBuf,

    /// Network to use (main, test, regtest)
    #[arg(short, long)]
    network: Option<String>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    /// Disable checkpoint enforcement (ignored on main)
    #[arg(long)]
    no_checkpoints: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Print the selected network's consensus parameters
    Info,
    /// Check a block hash against the checkpoint table
    CheckCheckpoint {
        /// Block height
        #[arg(long)]
        height: u32,
        /// Block hash (display hex)
        #[arg(long)]
        hash: String,
    },
    /// Search for a genesis block satisfying its own target
    MineGenesis {
        /// Genesis timestamp
        #[arg(long)]
        time: u32,
        /// Starting nonce
        #[arg(long, default_value = "0")]
        nonce: u32,
        /// Compact target, hex
        #[arg(long, value_parser = parse_bits)]
        bits: u32,
        /// Block version
        #[arg(long, default_value = "1")]
        version: i32,
    },
}

fn parse_bits(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid compact target '{s}': {e}"))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = NodeConfig::load(&args.config, &args)?;

    // Initialize logging
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Sexcoin consensus node v{}", env!("CARGO_PKG_VERSION"));

    let network: Network = config
        .network
        .parse()
        .context("Invalid network in configuration")?;
    let params = select_network(network).context("Failed to select network")?;
    let genesis_block = verify_genesis(params).context("Genesis self-check failed")?;
    info!("Network: {}", network);
    info!("Genesis: {}", genesis_block.hash());

    let guard = CheckpointGuard::with_enforcement(params, config.checkpoints_enabled);

    match args.command.unwrap_or(Command::Info) {
        Command::Info => print_info(params, &guard),
        Command::CheckCheckpoint { height, hash } => {
            let hash: Hash256 = hash.parse().context("Invalid block hash")?;
            match guard.check_checked(height, &hash) {
                Ok(()) => println!("accepted: height {height} hash {hash}"),
                Err(e) => bail!("rejected: {e}"),
            }
        }
        Command::MineGenesis {
            time,
            nonce,
            bits,
            version,
        } => {
            let reward = params.genesis().reward;
            let seed = genesis::build(time, nonce, bits, version, reward);
            info!("Merkle root: {}", seed.header.merkle_root);

            let mined = genesis::mine(seed.header).context("Genesis search failed")?;
            println!("time:        {}", mined.time);
            println!("nonce:       {}", mined.nonce);
            println!("bits:        {}", CompactTarget(mined.bits));
            println!("hash:        {}", mined.hash());
            println!("pow hash:    {}", mined.pow_hash());
            println!("merkle root: {}", mined.merkle_root);
        }
    }

    Ok(())
}

fn print_info(params: &ChainParams, guard: &CheckpointGuard<'_>) {
    let resolver = ForkEpochResolver::new(params);
    let genesis = params.genesis();

    println!("Network:           {}", params.network());
    println!("Message start:     {}", hex::encode(params.message_start()));
    println!("Default port:      {}", params.default_port());
    println!("Genesis hash:      {}", genesis.hash);
    println!("Genesis time:      {}", genesis.time);
    println!("Pow limit:         {}", params.pow_limit_compact());
    println!(
        "Fork heights:      {} / {} / {}",
        params.fork1_height(),
        params.fork2_height(),
        params.fork3_height()
    );
    for (label, height) in [
        ("epoch 0", 0),
        ("epoch 1", params.fork1_height() + 1),
        ("epoch 2", params.fork2_height() + 1),
    ] {
        println!(
            "  {label}: timespan {}s, spacing {}s, interval {}, algorithm {}",
            resolver.timespan(height),
            resolver.spacing(height),
            resolver.interval(height),
            resolver.algorithm(height)
        );
    }
    println!(
        "Auxpow:            chain ID 0x{:x} from height {}",
        params.auxpow_chain_id(),
        params.auxpow_start_height()
    );
    match params.deployment_height(Deployment::Witness) {
        Some(height) => println!("Witness:           height {height}"),
        None => println!("Witness:           never"),
    }
    println!(
        "Checkpoints:       {} (enforced: {}, last at {})",
        params.checkpoints().len(),
        guard.is_enforced(),
        guard.total_checkpointed_height()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bits() {
        assert_eq!(parse_bits("0x1e7fffff").unwrap(), 0x1e7fffff);
        assert_eq!(parse_bits("207fffff").unwrap(), 0x207fffff);
        assert!(parse_bits("zz").is_err());
    }

    #[test]
    fn test_args_parse_commands() {
        let args = Args::parse_from([
            "sxc-node",
            "--network",
            "test",
            "check-checkpoint",
            "--height",
            "0",
            "--hash",
            "73dc70a1698579360b62e724ecfeacfd938f45283162f3cf18f1b9eb3fc9fcd7",
        ]);
        assert_eq!(args.network.as_deref(), Some("test"));
        assert!(matches!(
            args.command,
            Some(Command::CheckCheckpoint { height: 0, .. })
        ));

        let args = Args::parse_from([
            "sxc-node",
            "mine-genesis",
            "--time",
            "1405166035",
            "--bits",
            "0x200fffff",
        ]);
        assert!(matches!(
            args.command,
            Some(Command::MineGenesis {
                bits: 0x200fffff,
                nonce: 0,
                version: 1,
                ..
            })
        ));
    }
}
