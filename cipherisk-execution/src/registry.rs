use crate::error::RiskError;
use crate::ExecutionContext;
use cipherisk_types::state::{AssetParam, GlobalState};
use cipherisk_types::{is_zero_address, short_hex, Address, AssetId, RiskEvent, MAX_WEIGHT_BP};
use tracing::{debug, info};

pub fn set_administrator(
    ctx: &mut ExecutionContext,
    sender: &Address,
    new_administrator: &Address,
) -> Result<(), RiskError> {
    if sender != &ctx.state.administrator {
        return Err(RiskError::Unauthorized("replace the administrator"));
    }
    if is_zero_address(new_administrator) {
        return Err(RiskError::InvalidAddress);
    }

    let previous = std::mem::replace(&mut ctx.state.administrator, *new_administrator);
    info!(new = %short_hex(new_administrator), "administrator replaced");
    ctx.emit(RiskEvent::AdministratorChanged {
        previous,
        new_administrator: *new_administrator,
    });
    Ok(())
}

/// Admission guardrails shared with genesis loading.
pub fn validate_asset_param(
    weight_bp: u16,
    cap_amount: u64,
    max_cap: u64,
) -> Result<AssetParam, RiskError> {
    if weight_bp > MAX_WEIGHT_BP {
        return Err(RiskError::InvalidWeight(weight_bp));
    }
    if cap_amount == 0 || cap_amount > max_cap {
        return Err(RiskError::InvalidCap { cap: cap_amount, max: max_cap });
    }
    Ok(AssetParam { weight_bp, cap_amount })
}

pub fn set_asset_param(
    ctx: &mut ExecutionContext,
    sender: &Address,
    asset_id: &AssetId,
    weight_bp: u16,
    cap_amount: u64,
) -> Result<(), RiskError> {
    if sender != &ctx.state.administrator {
        return Err(RiskError::Unauthorized("configure asset parameters"));
    }
    let param = validate_asset_param(weight_bp, cap_amount, ctx.state.limits.max_cap)?;
    if ctx.state.asset_params.get(asset_id) == Some(&param) {
        debug!(asset = %short_hex(asset_id), "asset parameter unchanged");
        return Ok(());
    }

    ctx.state.asset_params.insert(*asset_id, param);
    info!(asset = %short_hex(asset_id), weight_bp, cap_amount, "asset parameter set");
    ctx.emit(RiskEvent::AssetParamSet {
        asset_id: *asset_id,
        weight_bp,
        cap_amount,
    });
    Ok(())
}

/// `None` means "not configured", which is distinct from any stored value.
pub fn get_asset_param(state: &GlobalState, asset_id: &AssetId) -> Option<AssetParam> {
    state.asset_params.get(asset_id).copied()
}
