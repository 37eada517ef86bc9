use anyhow::{anyhow, bail, Context, Result};
use cipherisk_execution::registry::validate_asset_param;
use cipherisk_types::state::{GlobalState, RiskLimits};
use cipherisk_types::{
    asset_id_from_symbol, is_zero_address, Address, AssetId, BPS_DENOMINATOR,
    DEFAULT_MAX_ASSETS_PER_COMPUTATION, DEFAULT_MAX_CAP,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Initial configuration. Addresses and asset ids are hex strings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenesisConfig {
    pub administrator: String,
    #[serde(default = "default_max_cap")]
    pub max_cap: u64,
    #[serde(default = "default_max_assets")]
    pub max_assets_per_computation: u32,
    #[serde(default)]
    pub assets: Vec<GenesisAsset>,
}

/// Either `symbol` (hashed into an id) or an explicit `asset_id`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenesisAsset {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub asset_id: Option<String>,
    pub weight_bp: u16,
    pub cap_amount: u64,
}

fn default_max_cap() -> u64 {
    DEFAULT_MAX_CAP
}

fn default_max_assets() -> u32 {
    DEFAULT_MAX_ASSETS_PER_COMPUTATION
}

pub fn parse_address(s: &str) -> Result<Address> {
    let bytes = hex::decode(s.trim_start_matches("0x"))
        .with_context(|| format!("invalid hex: {}", s))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| anyhow!("expected 32 bytes, got {}", v.len()))
}

impl GenesisAsset {
    pub fn resolve_id(&self) -> Result<AssetId> {
        match (&self.symbol, &self.asset_id) {
            (Some(sym), None) => Ok(asset_id_from_symbol(sym)),
            (None, Some(id)) => parse_address(id),
            _ => bail!("asset entry needs exactly one of `symbol` or `asset_id`"),
        }
    }
}

impl GenesisConfig {
    /// Development configuration with a handful of assets.
    pub fn dev(administrator: &Address) -> Self {
        let asset = |symbol: &str, weight_bp, cap_amount| GenesisAsset {
            symbol: Some(symbol.to_string()),
            asset_id: None,
            weight_bp,
            cap_amount,
        };
        Self {
            administrator: hex::encode(administrator),
            max_cap: DEFAULT_MAX_CAP,
            max_assets_per_computation: DEFAULT_MAX_ASSETS_PER_COMPUTATION,
            assets: vec![
                asset("BTC", 8000, 50_000_000_000),
                asset("ETH", 6500, 200_000_000_000),
                asset("SOL", 9000, 10_000_000_000),
                asset("USDC", 500, 1_000_000_000_000),
            ],
        }
    }

    pub fn limits(&self) -> Result<RiskLimits> {
        if self.max_cap == 0 {
            bail!("max_cap must be positive");
        }
        if self.max_assets_per_computation == 0 {
            bail!("max_assets_per_computation must be positive");
        }
        // Worst-case encrypted numerator has to fit in 64 bits.
        self.max_cap
            .checked_mul(BPS_DENOMINATOR)
            .and_then(|v| v.checked_mul(u64::from(self.max_assets_per_computation)))
            .ok_or_else(|| {
                anyhow!(
                    "max_cap {} x 10000 x {} assets overflows 64-bit encrypted arithmetic",
                    self.max_cap,
                    self.max_assets_per_computation
                )
            })?;
        Ok(RiskLimits {
            max_cap: self.max_cap,
            max_assets_per_computation: self.max_assets_per_computation,
        })
    }
}

pub fn load_config(path: &Path) -> Result<GenesisConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

pub fn create_genesis_state(config: &GenesisConfig) -> Result<GlobalState> {
    let administrator = parse_address(&config.administrator).context("administrator")?;
    if is_zero_address(&administrator) {
        bail!("administrator must not be the zero address");
    }
    let limits = config.limits()?;

    let mut state = GlobalState::new(administrator, limits);
    for (i, asset) in config.assets.iter().enumerate() {
        let id = asset.resolve_id().with_context(|| format!("asset #{}", i))?;
        let param = validate_asset_param(asset.weight_bp, asset.cap_amount, limits.max_cap)
            .with_context(|| format!("asset #{}", i))?;
        state.asset_params.insert(id, param);
    }
    Ok(state)
}
