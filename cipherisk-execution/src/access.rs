//! Decryption grants over stored results. Grants only ever accumulate.

use crate::aggregation::AggregateScore;
use crate::error::RiskError;
use crate::ownership::owner_of;
use crate::results;
use crate::ExecutionContext;
use cipherisk_engine::EncryptedArithmetic;
use cipherisk_types::{is_zero_address, short_hex, Address, PortfolioId, ResultId, RiskEvent};
use tracing::info;

/// Grants issued when a result is created: the core keeps its own
/// capability, the submitter and the registered owner (if any) may decrypt.
pub fn grant_initial(
    engine: &mut dyn EncryptedArithmetic,
    score: &AggregateScore,
    submitter: &Address,
    owner: Option<&Address>,
) -> Result<(), RiskError> {
    for value in [score.risk, score.health] {
        engine.grant_self(value)?;
        engine.grant_to(value, submitter)?;
        if let Some(owner) = owner {
            engine.grant_to(value, owner)?;
        }
    }
    Ok(())
}

pub fn grant_result_access(
    ctx: &mut ExecutionContext,
    sender: &Address,
    portfolio_id: &PortfolioId,
    result_id: ResultId,
    to: &Address,
) -> Result<(), RiskError> {
    let result = results::get(ctx.state, portfolio_id, result_id)?;
    let (risk, health, submitter) = (result.risk_score, result.health_score, result.submitter);

    let is_owner = owner_of(ctx.state, portfolio_id).as_ref() == Some(sender);
    if !(is_owner || sender == &submitter || sender == &ctx.state.administrator) {
        return Err(RiskError::Unauthorized("grant access to this result"));
    }
    if is_zero_address(to) {
        return Err(RiskError::InvalidAddress);
    }

    ctx.engine.grant_to(risk, to)?;
    ctx.engine.grant_to(health, to)?;

    info!(
        portfolio = %short_hex(portfolio_id),
        result_id,
        to = %short_hex(to),
        "result access granted"
    );
    ctx.emit(RiskEvent::ResultAccessGranted {
        portfolio_id: *portfolio_id,
        result_id,
        granted_by: *sender,
        to: *to,
    });
    Ok(())
}

pub fn make_result_public(
    ctx: &mut ExecutionContext,
    sender: &Address,
    portfolio_id: &PortfolioId,
    result_id: ResultId,
) -> Result<(), RiskError> {
    let result = results::get(ctx.state, portfolio_id, result_id)?;
    let (risk, health) = (result.risk_score, result.health_score);

    let is_owner = owner_of(ctx.state, portfolio_id).as_ref() == Some(sender);
    if !(is_owner || sender == &ctx.state.administrator) {
        return Err(RiskError::Unauthorized("publish this result"));
    }

    ctx.engine.make_public(risk)?;
    ctx.engine.make_public(health)?;

    info!(portfolio = %short_hex(portfolio_id), result_id, "result made public");
    ctx.emit(RiskEvent::ResultMadePublic {
        portfolio_id: *portfolio_id,
        result_id,
        by: *sender,
    });
    Ok(())
}
