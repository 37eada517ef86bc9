use crate::cipher::CiphertextHandle;
use crate::{Address, AssetId, PortfolioId, ResultId};
use serde::{Deserialize, Serialize};

/// Public notifications emitted after a successful state transition.
/// Payloads carry identifiers and opaque handles only, never plaintext.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum RiskEvent {
    AdministratorChanged {
        previous: Address,
        new_administrator: Address,
    },
    AssetParamSet {
        asset_id: AssetId,
        weight_bp: u16,
        cap_amount: u64,
    },
    OwnershipChanged {
        portfolio_id: PortfolioId,
        previous: Option<Address>,
        new_owner: Address,
    },
    PortfolioComputed {
        portfolio_id: PortfolioId,
        result_id: ResultId,
        submitter: Address,
        risk_handle: CiphertextHandle,
        health_handle: CiphertextHandle,
    },
    ResultAccessGranted {
        portfolio_id: PortfolioId,
        result_id: ResultId,
        granted_by: Address,
        to: Address,
    },
    ResultMadePublic {
        portfolio_id: PortfolioId,
        result_id: ResultId,
        by: Address,
    },
}

impl RiskEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            RiskEvent::AdministratorChanged { .. } => "admin.changed",
            RiskEvent::AssetParamSet { .. } => "asset.param_set",
            RiskEvent::OwnershipChanged { .. } => "portfolio.owner_changed",
            RiskEvent::PortfolioComputed { .. } => "portfolio.computed",
            RiskEvent::ResultAccessGranted { .. } => "result.access_granted",
            RiskEvent::ResultMadePublic { .. } => "result.made_public",
        }
    }
}
