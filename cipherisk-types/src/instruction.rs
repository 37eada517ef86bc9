use crate::cipher::ExternalCiphertext;
use crate::{Address, AssetId, PortfolioId, ResultId};
use serde::{Deserialize, Serialize};

/// Every state-changing entry point of the risk engine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum RiskInstruction {
    // ══════════════════════════════════════════════════════════════
    // Administration
    // ══════════════════════════════════════════════════════════════
    SetAdministrator { new_administrator: Address },
    SetAssetParam { asset_id: AssetId, weight_bp: u16, cap_amount: u64 },

    // ══════════════════════════════════════════════════════════════
    // Portfolio ownership
    // ══════════════════════════════════════════════════════════════
    ClaimOrTransferOwnership { portfolio_id: PortfolioId, new_owner: Address },

    // ══════════════════════════════════════════════════════════════
    // Confidential aggregation
    // ══════════════════════════════════════════════════════════════
    ComputePortfolio {
        portfolio_id: PortfolioId,
        asset_ids: Vec<AssetId>,
        attested_amounts: Vec<ExternalCiphertext>,
        attestation: Vec<u8>,
    },

    // ══════════════════════════════════════════════════════════════
    // Decryption access
    // ══════════════════════════════════════════════════════════════
    GrantResultAccess { portfolio_id: PortfolioId, result_id: ResultId, to: Address },
    MakeResultPublic { portfolio_id: PortfolioId, result_id: ResultId },
}

impl RiskInstruction {
    pub fn name(&self) -> &'static str {
        match self {
            RiskInstruction::SetAdministrator { .. } => "set_administrator",
            RiskInstruction::SetAssetParam { .. } => "set_asset_param",
            RiskInstruction::ClaimOrTransferOwnership { .. } => "claim_or_transfer_ownership",
            RiskInstruction::ComputePortfolio { .. } => "compute_portfolio",
            RiskInstruction::GrantResultAccess { .. } => "grant_result_access",
            RiskInstruction::MakeResultPublic { .. } => "make_result_public",
        }
    }
}
