//! Network consensus parameters.
//!
//! One immutable [`ChainParams`] value exists per selected network. It is
//! produced by a per-network factory (`ChainParams::main()`,
//! `ChainParams::testnet()`, `ChainParams::regtest()`) or, for test chains
//! and new-network bootstrap, by [`ChainParamsBuilder`] seeded from one of
//! those factories. Every constructor path ends in [`ChainParams::validate`]
//! so a value is never partially initialized.
//!
//! Process-wide selection is write-once: [`select_network`] stores the
//! chosen value and refuses a later, different choice. Components still
//! take `&ChainParams` explicitly.

use crate::block::Hash256;
use crate::compact::{max_u256, CompactTarget};
use crate::error::ConfigError;
use num_bigint::BigUint;
use num_traits::Zero;
use once_cell::sync::OnceCell;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Satoshis per coin.
pub const COIN: i64 = 100_000_000;

/// Merge-mining chain ID assigned to this chain.
pub const AUXPOW_CHAIN_ID: u32 = 0x69;

/// Auxpow activation heights. Regtest reuses its own value rather than the
/// testnet one.
pub mod auxpow_start {
    pub const MAINNET: u32 = 3_080_000;
    pub const TESTNET: u32 = 1_750;
    pub const REGTEST: u32 = 4_000;
}

/// Supported networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Main,
    Test,
    Regtest,
}

impl Network {
    /// Selector string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Main => "main",
            Network::Test => "test",
            Network::Regtest => "regtest",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(Network::Main),
            "test" => Ok(Network::Test),
            "regtest" => Ok(Network::Regtest),
            other => Err(ConfigError::UnknownNetwork(other.to_string())),
        }
    }
}

/// Height-activated rule changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    /// Height in coinbase.
    Bip34,
    /// OP_CHECKLOCKTIMEVERIFY.
    Bip65,
    /// Strict DER signatures.
    Bip66,
    /// Block version 4 (age verification start).
    BlockVersion4,
    /// Block version 5.
    BlockVersion5,
    /// Merge-mined blocks accepted.
    AuxPow,
    /// Segregated witness.
    Witness,
}

/// Target timespan and spacing of one historical retarget epoch, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochParams {
    pub timespan: i64,
    pub spacing: i64,
}

impl EpochParams {
    pub const fn new(timespan: i64, spacing: i64) -> Self {
        Self { timespan, spacing }
    }

    /// Blocks per retarget window. Zero if the pair is invalid.
    pub fn interval(&self) -> i64 {
        if self.spacing <= 0 {
            return 0;
        }
        self.timespan / self.spacing
    }
}

/// Historical epochs: 8h/60s, then 30min/30s, then 15min/60s.
pub const HISTORICAL_EPOCHS: [EpochParams; 3] = [
    EpochParams::new(8 * 60 * 60, 60),
    EpochParams::new(30 * 60, 30),
    EpochParams::new(15 * 60, 60),
];

/// Base58 and extended-key version prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base58Prefixes {
    pub pubkey_address: u8,
    pub script_address: u8,
    pub secret_key: u8,
    pub ext_public_key: [u8; 4],
    pub ext_secret_key: [u8; 4],
}

/// Inputs to the genesis block plus the expected results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisParams {
    pub time: u32,
    pub nonce: u32,
    pub bits: u32,
    pub version: i32,
    pub reward: i64,
    /// Shipped genesis block hash.
    pub hash: Hash256,
    /// Shipped merkle root, where one was recorded.
    pub merkle_root: Option<Hash256>,
}

/// Network-specific consensus parameters.
#[derive(Debug, Clone)]
pub struct ChainParams {
    network: Network,

    pow_limit: BigUint,
    epochs: [EpochParams; 3],
    fork1_height: u32,
    fork2_height: u32,
    fork3_height: u32,
    pow_allow_min_difficulty_blocks: bool,
    pow_no_retargeting: bool,
    min_difficulty_failsafe_height: Option<u32>,

    bip34_height: Option<u32>,
    bip34_hash: Hash256,
    bip65_height: u32,
    bip66_height: u32,
    block_version4_height: u32,
    block_version5_height: u32,
    witness_start_height: u32,
    auxpow_start_height: u32,
    auxpow_chain_id: u32,

    minimum_chain_work: BigUint,
    default_assume_valid: Hash256,

    message_start: [u8; 4],
    default_port: u16,
    prune_after_height: u64,
    base58: Base58Prefixes,
    genesis: GenesisParams,
    checkpoints: Vec<(u32, Hash256)>,
}

fn hash(s: &str) -> Hash256 {
    Hash256::from_hex_const(s)
}

impl ChainParams {
    /// Main network.
    pub fn main() -> Self {
        Self {
            network: Network::Main,
            pow_limit: max_u256() >> 5usize,
            epochs: HISTORICAL_EPOCHS,
            fork1_height: 155_000,
            fork2_height: 572_000,
            fork3_height: 643_808,
            pow_allow_min_difficulty_blocks: false,
            pow_no_retargeting: false,
            min_difficulty_failsafe_height: None,
            bip34_height: Some(0),
            bip34_hash: hash("4e9b54001f9976049830128ec0331515eaabe35a70970d79971da1539a400ba1"),
            bip65_height: 3_106_030,
            bip66_height: 3_106_030,
            block_version4_height: 2_348_569,
            block_version5_height: 3_106_030,
            witness_start_height: 3_106_030,
            auxpow_start_height: auxpow_start::MAINNET,
            auxpow_chain_id: AUXPOW_CHAIN_ID,
            minimum_chain_work: BigUint::from(0x01c9_d8a9_6f22_93efu64),
            default_assume_valid: hash(
                "0000000000000000003b9ce759c2a087d52abc4266f8f4ebd6d768b89defa50a",
            ),
            message_start: [0xfa, 0xce, 0x69, 0x69],
            default_port: 9560,
            prune_after_height: 100_000,
            base58: Base58Prefixes {
                pubkey_address: 62,
                script_address: 69,
                secret_key: 190,
                ext_public_key: [0x04, 0x88, 0xB2, 0x1E],
                ext_secret_key: [0x04, 0x88, 0xAD, 0xE4],
            },
            genesis: GenesisParams {
                time: 1_369_146_359,
                nonce: 244_086,
                bits: 0x1e7fffff,
                version: 1,
                reward: 50 * COIN,
                hash: hash("f42b9553085a1af63d659d3907a42c3a0052bbfa2693d3acf990af85755f2279"),
                merkle_root: Some(hash(
                    "661de12dc8dd26989adb169733b5a99150d52b8b6e8332976277856e246101f4",
                )),
            },
            checkpoints: mainnet_checkpoints(),
        }
    }

    /// Test network.
    pub fn testnet() -> Self {
        let genesis_hash =
            hash("73dc70a1698579360b62e724ecfeacfd938f45283162f3cf18f1b9eb3fc9fcd7");
        Self {
            network: Network::Test,
            pow_limit: max_u256() >> 5usize,
            epochs: HISTORICAL_EPOCHS,
            fork1_height: 980,
            fork2_height: 1_200,
            fork3_height: 1_608,
            pow_allow_min_difficulty_blocks: true,
            pow_no_retargeting: false,
            min_difficulty_failsafe_height: None,
            bip34_height: None,
            bip34_hash: Hash256::ZERO,
            bip65_height: 2_100,
            bip66_height: 2_100,
            block_version4_height: 1_700,
            block_version5_height: 2_100,
            witness_start_height: 2_100,
            auxpow_start_height: auxpow_start::TESTNET,
            auxpow_chain_id: AUXPOW_CHAIN_ID,
            minimum_chain_work: BigUint::zero(),
            default_assume_valid: Hash256::ZERO,
            message_start: [0xfa, 0xce, 0x96, 0x69],
            default_port: 19560,
            prune_after_height: 1_000,
            base58: Base58Prefixes {
                pubkey_address: 124,
                script_address: 196,
                secret_key: 239,
                ext_public_key: [0x04, 0x35, 0x87, 0xCF],
                ext_secret_key: [0x04, 0x35, 0x83, 0x94],
            },
            genesis: GenesisParams {
                time: 1_473_215_502,
                nonce: 517_454,
                bits: 0x1e7fffff,
                version: 1,
                reward: 50 * COIN,
                hash: genesis_hash,
                merkle_root: None,
            },
            checkpoints: vec![(0, genesis_hash)],
        }
    }

    /// Regression-test network. Retargeting is disabled.
    pub fn regtest() -> Self {
        let genesis_hash =
            hash("ed5c75842fabcb3d3294ab2a07e54cc622321b74a9f46e7d7c52664dd7ea2a1f");
        Self {
            network: Network::Regtest,
            pow_limit: max_u256() - (BigUint::from(1u32) << 252usize),
            epochs: HISTORICAL_EPOCHS,
            fork1_height: 4_500,
            fork2_height: 5_000,
            fork3_height: 6_508,
            pow_allow_min_difficulty_blocks: true,
            pow_no_retargeting: true,
            min_difficulty_failsafe_height: None,
            bip34_height: None,
            bip34_hash: Hash256::ZERO,
            bip65_height: 1_251,
            bip66_height: 1_351,
            block_version4_height: 7_569,
            block_version5_height: 9_000,
            witness_start_height: 20_000,
            auxpow_start_height: auxpow_start::REGTEST,
            auxpow_chain_id: AUXPOW_CHAIN_ID,
            minimum_chain_work: BigUint::zero(),
            default_assume_valid: Hash256::ZERO,
            message_start: [0xfa, 0xce, 0x99, 0x99],
            default_port: 19569,
            prune_after_height: 1_000,
            base58: Base58Prefixes {
                pubkey_address: 111,
                script_address: 196,
                secret_key: 239,
                ext_public_key: [0x04, 0x35, 0x87, 0xCF],
                ext_secret_key: [0x04, 0x35, 0x83, 0x94],
            },
            genesis: GenesisParams {
                time: 1_405_166_035,
                nonce: 517_454,
                bits: 0x1e1fffff,
                version: 1,
                reward: 50 * COIN,
                hash: genesis_hash,
                merkle_root: None,
            },
            checkpoints: vec![(0, genesis_hash)],
        }
    }

    /// Factory values for a network, validated.
    pub fn for_network(network: Network) -> Result<Self, ConfigError> {
        let params = match network {
            Network::Main => Self::main(),
            Network::Test => Self::testnet(),
            Network::Regtest => Self::regtest(),
        };
        params.validate()?;
        Ok(params)
    }

    /// Parse a selector string (`main`, `test`, `regtest`) and build its parameters.
    pub fn select(network_id: &str) -> Result<Self, ConfigError> {
        Self::for_network(network_id.parse()?)
    }

    /// Start a builder from a network's factory values.
    pub fn builder(network: Network) -> ChainParamsBuilder {
        ChainParamsBuilder {
            params: match network {
                Network::Main => Self::main(),
                Network::Test => Self::testnet(),
                Network::Regtest => Self::regtest(),
            },
        }
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (epoch, e) in self.epochs.iter().enumerate() {
            if e.interval() < 1 {
                return Err(ConfigError::ZeroInterval { epoch });
            }
        }

        if self.pow_limit.is_zero() {
            return Err(ConfigError::InvalidParameter {
                field: "pow_limit",
                message: "proof-of-work limit cannot be zero".to_string(),
            });
        }
        if &self.pow_limit > max_u256() {
            return Err(ConfigError::InvalidParameter {
                field: "pow_limit",
                message: "proof-of-work limit exceeds 256 bits".to_string(),
            });
        }

        if self.fork1_height > self.fork2_height || self.fork2_height > self.fork3_height {
            return Err(ConfigError::InvalidParameter {
                field: "fork_heights",
                message: format!(
                    "fork heights must be ordered, got {}/{}/{}",
                    self.fork1_height, self.fork2_height, self.fork3_height
                ),
            });
        }

        if self.min_difficulty_failsafe_height.is_some() && !self.pow_allow_min_difficulty_blocks {
            return Err(ConfigError::InvalidParameter {
                field: "min_difficulty_failsafe_height",
                message: "failsafe height requires minimum-difficulty blocks".to_string(),
            });
        }

        if self
            .checkpoints
            .windows(2)
            .any(|pair| pair[0].0 >= pair[1].0)
        {
            return Err(ConfigError::InvalidParameter {
                field: "checkpoints",
                message: "checkpoint heights must be strictly increasing".to_string(),
            });
        }

        if self.auxpow_chain_id == 0 || self.auxpow_chain_id >= (1 << 14) {
            return Err(ConfigError::InvalidParameter {
                field: "auxpow_chain_id",
                message: format!("chain ID {} does not fit the version field", self.auxpow_chain_id),
            });
        }

        Ok(())
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Easiest permitted target.
    pub fn pow_limit(&self) -> &BigUint {
        &self.pow_limit
    }

    /// Proof-of-work limit in compact form.
    pub fn pow_limit_compact(&self) -> CompactTarget {
        CompactTarget::from_target(&self.pow_limit)
    }

    /// Timespan/spacing of epoch `index` (0 = original, 1 = fork1, 2 = fork2).
    pub fn epoch(&self, index: usize) -> EpochParams {
        self.epochs[index.min(self.epochs.len() - 1)]
    }

    pub fn fork1_height(&self) -> u32 {
        self.fork1_height
    }

    pub fn fork2_height(&self) -> u32 {
        self.fork2_height
    }

    /// Also the adaptive algorithm's time-warp fix height.
    pub fn fork3_height(&self) -> u32 {
        self.fork3_height
    }

    pub fn allow_min_difficulty_blocks(&self) -> bool {
        self.pow_allow_min_difficulty_blocks
    }

    pub fn no_retargeting(&self) -> bool {
        self.pow_no_retargeting
    }

    /// Height from which a min-difficulty network switches to the gravity
    /// well regardless of fork heights. No shipped network sets one.
    pub fn min_difficulty_failsafe_height(&self) -> Option<u32> {
        self.min_difficulty_failsafe_height
    }

    /// Base target spacing (epoch 0).
    pub fn target_spacing(&self) -> i64 {
        self.epochs[0].spacing
    }

    /// Base retarget interval (epoch 0).
    pub fn interval(&self) -> i64 {
        self.epochs[0].interval()
    }

    /// Activation height of a deployment; `None` if it never activates.
    pub fn deployment_height(&self, deployment: Deployment) -> Option<u32> {
        match deployment {
            Deployment::Bip34 => self.bip34_height,
            Deployment::Bip65 => Some(self.bip65_height),
            Deployment::Bip66 => Some(self.bip66_height),
            Deployment::BlockVersion4 => Some(self.block_version4_height),
            Deployment::BlockVersion5 => Some(self.block_version5_height),
            Deployment::AuxPow => Some(self.auxpow_start_height),
            Deployment::Witness => Some(self.witness_start_height),
        }
    }

    pub fn is_deployment_active(&self, deployment: Deployment, height: u32) -> bool {
        self.deployment_height(deployment)
            .map(|activation| height >= activation)
            .unwrap_or(false)
    }

    pub fn bip34_hash(&self) -> &Hash256 {
        &self.bip34_hash
    }

    pub fn auxpow_start_height(&self) -> u32 {
        self.auxpow_start_height
    }

    pub fn auxpow_chain_id(&self) -> u32 {
        self.auxpow_chain_id
    }

    pub fn minimum_chain_work(&self) -> &BigUint {
        &self.minimum_chain_work
    }

    pub fn default_assume_valid(&self) -> &Hash256 {
        &self.default_assume_valid
    }

    pub fn message_start(&self) -> [u8; 4] {
        self.message_start
    }

    pub fn default_port(&self) -> u16 {
        self.default_port
    }

    pub fn prune_after_height(&self) -> u64 {
        self.prune_after_height
    }

    pub fn base58_prefixes(&self) -> &Base58Prefixes {
        &self.base58
    }

    pub fn genesis(&self) -> &GenesisParams {
        &self.genesis
    }

    /// Ordered `(height, hash)` checkpoint table.
    pub fn checkpoints(&self) -> &[(u32, Hash256)] {
        &self.checkpoints
    }
}

/// Overrides on top of a network's factory values.
///
/// Used for synthetic test chains and when bootstrapping a new network.
#[derive(Debug, Clone)]
pub struct ChainParamsBuilder {
    params: ChainParams,
}

impl ChainParamsBuilder {
    pub fn fork_heights(mut self, fork1: u32, fork2: u32, fork3: u32) -> Self {
        self.params.fork1_height = fork1;
        self.params.fork2_height = fork2;
        self.params.fork3_height = fork3;
        self
    }

    pub fn epochs(mut self, epochs: [EpochParams; 3]) -> Self {
        self.params.epochs = epochs;
        self
    }

    pub fn pow_limit(mut self, limit: BigUint) -> Self {
        self.params.pow_limit = limit;
        self
    }

    pub fn allow_min_difficulty_blocks(mut self, allow: bool) -> Self {
        self.params.pow_allow_min_difficulty_blocks = allow;
        self
    }

    pub fn no_retargeting(mut self, disabled: bool) -> Self {
        self.params.pow_no_retargeting = disabled;
        self
    }

    pub fn min_difficulty_failsafe_height(mut self, height: Option<u32>) -> Self {
        self.params.min_difficulty_failsafe_height = height;
        self
    }

    pub fn auxpow_start_height(mut self, height: u32) -> Self {
        self.params.auxpow_start_height = height;
        self
    }

    pub fn auxpow_chain_id(mut self, chain_id: u32) -> Self {
        self.params.auxpow_chain_id = chain_id;
        self
    }

    pub fn minimum_chain_work(mut self, work: BigUint) -> Self {
        self.params.minimum_chain_work = work;
        self
    }

    pub fn default_assume_valid(mut self, hash: Hash256) -> Self {
        self.params.default_assume_valid = hash;
        self
    }

    pub fn genesis(mut self, genesis: GenesisParams) -> Self {
        self.params.genesis = genesis;
        self
    }

    pub fn checkpoints(mut self, checkpoints: Vec<(u32, Hash256)>) -> Self {
        self.params.checkpoints = checkpoints;
        self
    }

    /// Validate and return the parameters.
    pub fn build(self) -> Result<ChainParams, ConfigError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

static SELECTED: OnceCell<ChainParams> = OnceCell::new();

/// Select the process-wide network. Write-once.
///
/// Re-selecting the same network returns the stored value; selecting a
/// different one fails with [`ConfigError::AlreadySelected`].
pub fn select_network(network: Network) -> Result<&'static ChainParams, ConfigError> {
    let params = SELECTED.get_or_try_init(|| {
        let params = ChainParams::for_network(network)?;
        info!(network = %network, "Selected consensus parameters");
        Ok::<_, ConfigError>(params)
    })?;

    if params.network() != network {
        return Err(ConfigError::AlreadySelected {
            selected: params.network().to_string(),
            requested: network.to_string(),
        });
    }
    Ok(params)
}

/// The process-wide selection, if one was made.
pub fn selected_params() -> Option<&'static ChainParams> {
    SELECTED.get()
}

fn mainnet_checkpoints() -> Vec<(u32, Hash256)> {
    [
        (0, "f42b9553085a1af63d659d3907a42c3a0052bbfa2693d3acf990af85755f2279"),
        (5_363, "c5dd0d66a07c176a4463be3df7d9309986a3918b75935dde1c4769e4a64f9593"),
        (5_369, "dcd139890a39921876ab035eca34ee48c5239889f1dcdb8e3de3d097847f12d8"),
        (5_380, "b105b9cbb7b0ff4f2f6aef1d040c196edc2ab4318f7e6811a4373e8278cd5bb4"),
        (13_899, "883879d5325e48511e96557fff17df10123f062de23bc1f91f4e153154dbc764"),
        (14_050, "5be09cdd886573a50d543e3cca35a03eff2e46e4596bb2f509cede9e28dd33e9"),
        (22_984, "87ecfd9aa3c722132dd1786caa5ccb25b8ff821a3797aa0c424e10662aca509d"),
        (39_986, "9dba252fa6eebbf2b6c790965806c51916870bdf1e91bb7bf11eea55e64f12f8"),
        (49_979, "e564a2434f3acb7fe4af103927083fee3fa6429afa430e53b6eade3249dfe026"),
        (80_493, "6da822b8d4b5c060aee57523952630ac2262d5f56759ffc451ba6298b5fa423b"),
        (94_458, "084c2dec2c0da13e8f0143303d8f27ae79c81311ec804b2f746fbc1ad83bff14"),
        (136_354, "4f75d45e08213d5bb0584ce1e65666d47596cb8059b20d1c354b5bfd26309fbe"),
        (146_221, "c9d38afb57b0b25c822b1287197de413204cacfb27ca9c974772d8d8399737cb"),
        (146_849, "c5e18cab151a7eca95b02bd469c5a2aee301ef1b01e3b72add7f04a9c11f8b60"),
        (249_936, "6722b04059d14fce5f74eb4a9ea02784ae690c4985ba32801e2cf1f8b65582f3"),
        (279_841, "eb3bdef3524a2b0fd89f5480ac2a0a82108539b8e3156b598675e7109803cafa"),
        (319_767, "8fbcfa3dac1721fd899f4cf67a7381a86fdcfb5fb504e1729d6a9fe3b389a790"),
        (359_900, "fc4faa77d8e6c01941170e131125d5ebb5c9453fbaf3e6c2b0974b66c00f3bcd"),
        (499_996, "d28773f08f4747ff6e7e4d113753b5a79b60d905e59ae4046fa4b5ee9965badc"),
        (599_825, "0ddf7a53506b99acd201c13fba89b13837eb1707e97c27416f7513052cfd14af"),
        (699_886, "1663390cdccecaeea59f35affa91d04f57f9b790b8f1493b7f62d4de2279449a"),
        (809_963, "e7c094afaeaf37d20ce7d912b8353c41ac51c5219b1984acda32bfc889898203"),
        (1_000_293, "40cb1f758e1c3f71b22326f0f9c610202600bd5f83aea5272f4a2d978d344163"),
        (1_200_283, "6a1238c4d255d45d2669b83730b015ac0534e9e61af543fa66832c918747260f"),
        (1_400_278, "5c75334308a26b9220b50b8d0adf06fed4921e7a2fbc2b5c551bb9a807533b9f"),
        (1_600_189, "4b0608c7e733c1b6d2d660469f1b3c17be857ccb19d8e102f41503ab549e2f69"),
        (1_800_085, "422e9d5dab710fae371a1e182243af38a49db0cfb3d075a5c67da2c4f35df9ef"),
        (2_000_124, "34710dfebf36429ee09c7bd351671a2716f62f60fbbf9fb231be2314e88615ce"),
        (2_100_141, "b449eb898b032e00ec87458991a5182cc541c3b479250ed0087860dc60980412"),
        (2_399_993, "ce314cabe66fb60e79a00170b584595d8113e379f165ed9b530db8cc4cb9da0b"),
        (2_699_990, "fc077d18f64576094c6a6397a7588c6b85ddf2c7a2d41b52ba200ab875aea4e2"),
        (3_013_737, "eff50a7e9b94b04662d2209dbe8f0f6d0a3796b6f3915cee8ca8dbbae606455c"),
    ]
    .into_iter()
    .map(|(height, h)| (height, hash(h)))
    .collect()
}
