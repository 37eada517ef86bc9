//! Confidential risk aggregation.
//!
//! Every position is clamped to its asset cap and weighted under
//! encryption; only the denominator (the sum of public caps) is plain.
//!
//! ```text
//! risk   = min( Σ min(amount_i, cap_i) · weight_i  /  Σ cap_i , 10000 )
//! health = 10000 - risk
//! ```

use crate::access;
use crate::error::RiskError;
use crate::ownership::owner_of;
use crate::results;
use crate::ExecutionContext;
use cipherisk_engine::EncryptedArithmetic;
use cipherisk_types::state::{AssetParam, GlobalState, PortfolioResult};
use cipherisk_types::{
    short_hex, Address, AssetId, EncryptedValue, ExternalCiphertext, PortfolioId, ResultId,
    RiskEvent, BPS_DENOMINATOR,
};
use tracing::{debug, info};

/// Output of one aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateScore {
    pub risk: EncryptedValue,
    pub health: EncryptedValue,
    pub denominator: u64,
}

/// Checks batch shape and resolves every asset before any encrypted work
/// starts, so a rejected batch leaves no trace.
pub fn resolve_params(
    state: &GlobalState,
    asset_ids: &[AssetId],
    amount_count: usize,
) -> Result<Vec<AssetParam>, RiskError> {
    let max = state.limits.max_assets_per_computation;
    if asset_ids.is_empty() || asset_ids.len() != amount_count || asset_ids.len() > max as usize {
        return Err(RiskError::InvalidInputLength {
            assets: asset_ids.len(),
            amounts: amount_count,
            max,
        });
    }

    asset_ids
        .iter()
        .map(|id| {
            state
                .asset_params
                .get(id)
                .copied()
                .ok_or_else(|| RiskError::AssetNotConfigured(hex::encode(id)))
        })
        .collect()
}

/// Sum of the public caps; the only plaintext in the formula.
pub fn public_denominator(params: &[AssetParam]) -> Result<u64, RiskError> {
    params
        .iter()
        .try_fold(0u64, |acc, p| acc.checked_add(p.cap_amount))
        .ok_or(RiskError::DenominatorOverflow)
}

/// Runs the aggregation formula against `engine`. `params` and
/// `attested_amounts` must be the same length. Only the returned scores
/// stay alive in the engine.
pub fn aggregate(
    engine: &mut dyn EncryptedArithmetic,
    params: &[AssetParam],
    attested_amounts: &[ExternalCiphertext],
    attestation: &[u8],
    importer: &Address,
) -> Result<AggregateScore, RiskError> {
    let denominator = public_denominator(params)?;
    if denominator == 0 {
        return Err(RiskError::ZeroDenominator);
    }

    let mut numerator = engine.encrypt_constant(0)?;
    for (i, (param, external)) in params.iter().zip(attested_amounts).enumerate() {
        let amount = engine.import_attested(external, attestation, importer)?;
        let cap = engine.encrypt_constant(param.cap_amount)?;
        let capped = engine.min(amount, cap)?;
        let weight = engine.encrypt_constant(u64::from(param.weight_bp))?;
        let weighted = engine.mul(capped, weight)?;
        let sum = engine.add(numerator, weighted)?;
        for temp in [amount, cap, capped, weight, weighted, numerator] {
            engine.release(temp);
        }
        numerator = sum;
        debug!(position = i, weight_bp = param.weight_bp, "position folded into numerator");
    }

    let full_scale = engine.encrypt_constant(BPS_DENOMINATOR)?;
    let raw_risk = engine.div_by_public(numerator, denominator)?;
    let risk = engine.min(raw_risk, full_scale)?;
    let health = engine.sub(full_scale, risk)?;
    for temp in [numerator, raw_risk, full_scale] {
        engine.release(temp);
    }

    Ok(AggregateScore {
        risk,
        health,
        denominator,
    })
}

pub fn compute_portfolio(
    ctx: &mut ExecutionContext,
    submitter: &Address,
    portfolio_id: &PortfolioId,
    asset_ids: &[AssetId],
    attested_amounts: &[ExternalCiphertext],
    attestation: &[u8],
) -> Result<ResultId, RiskError> {
    let params = resolve_params(ctx.state, asset_ids, attested_amounts.len())?;
    let score = aggregate(ctx.engine, &params, attested_amounts, attestation, submitter)?;

    let owner = owner_of(ctx.state, portfolio_id);
    access::grant_initial(ctx.engine, &score, submitter, owner.as_ref())?;

    let result_id = results::append(
        ctx.state,
        portfolio_id,
        PortfolioResult {
            submitter: *submitter,
            timestamp: ctx.timestamp,
            risk_score: score.risk,
            health_score: score.health,
            denominator: score.denominator,
            position_count: params.len() as u32,
        },
    );

    info!(
        portfolio = %short_hex(portfolio_id),
        result_id,
        positions = params.len(),
        denominator = score.denominator,
        "portfolio risk computed"
    );
    ctx.emit(RiskEvent::PortfolioComputed {
        portfolio_id: *portfolio_id,
        result_id,
        submitter: *submitter,
        risk_handle: ctx.engine.to_handle(score.risk),
        health_handle: ctx.engine.to_handle(score.health),
    });
    Ok(result_id)
}
