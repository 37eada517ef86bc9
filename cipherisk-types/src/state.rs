use crate::cipher::EncryptedValue;
use crate::{
    Address, AssetId, PortfolioId, ResultId, DEFAULT_MAX_ASSETS_PER_COMPUTATION, DEFAULT_MAX_CAP,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Admin-configured risk parameters for one asset. Presence in
/// `GlobalState::asset_params` is what marks an asset as configured.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetParam {
    pub weight_bp: u16,
    pub cap_amount: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskLimits {
    pub max_cap: u64,
    pub max_assets_per_computation: u32,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_cap: DEFAULT_MAX_CAP,
            max_assets_per_computation: DEFAULT_MAX_ASSETS_PER_COMPUTATION,
        }
    }
}

/// One immutable computation result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PortfolioResult {
    pub submitter: Address,
    pub timestamp: u64,
    pub risk_score: EncryptedValue,
    pub health_score: EncryptedValue,
    /// Sum of configured caps used as the public divisor.
    pub denominator: u64,
    pub position_count: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalState {
    pub administrator: Address,
    pub limits: RiskLimits,
    pub asset_params: BTreeMap<AssetId, AssetParam>,
    pub portfolio_owners: BTreeMap<PortfolioId, Address>,
    /// Append-only; the index of a result is its `ResultId`.
    pub results: BTreeMap<PortfolioId, Vec<PortfolioResult>>,
}

impl GlobalState {
    pub fn new(administrator: Address, limits: RiskLimits) -> Self {
        Self {
            administrator,
            limits,
            ..Default::default()
        }
    }

    pub fn next_result_id(&self, portfolio_id: &PortfolioId) -> ResultId {
        self.results
            .get(portfolio_id)
            .map(|seq| seq.len() as ResultId)
            .unwrap_or(0)
    }

    pub fn result(
        &self,
        portfolio_id: &PortfolioId,
        result_id: ResultId,
    ) -> Option<&PortfolioResult> {
        let idx = usize::try_from(result_id).ok()?;
        self.results.get(portfolio_id)?.get(idx)
    }

    pub fn root_hash(&self) -> [u8; 32] {
        let encoded = bincode::serialize(self).expect("state serialization");
        *blake3::hash(&encoded).as_bytes()
    }
}
