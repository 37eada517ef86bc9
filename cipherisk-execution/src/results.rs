//! Append-only result log, one sequence per portfolio.

use crate::error::RiskError;
use cipherisk_types::state::{GlobalState, PortfolioResult};
use cipherisk_types::{CiphertextHandle, PortfolioId, ResultId};

/// Stores `result` under the next id for `portfolio_id` and returns that id.
pub fn append(
    state: &mut GlobalState,
    portfolio_id: &PortfolioId,
    result: PortfolioResult,
) -> ResultId {
    let seq = state.results.entry(*portfolio_id).or_default();
    seq.push(result);
    (seq.len() - 1) as ResultId
}

pub fn get<'a>(
    state: &'a GlobalState,
    portfolio_id: &PortfolioId,
    result_id: ResultId,
) -> Result<&'a PortfolioResult, RiskError> {
    state
        .result(portfolio_id, result_id)
        .ok_or_else(|| RiskError::ResultNotFound {
            portfolio: hex::encode(portfolio_id),
            result_id,
        })
}

/// Number of results stored, which is also the id the next one will get.
pub fn result_count(state: &GlobalState, portfolio_id: &PortfolioId) -> u64 {
    state.next_result_id(portfolio_id)
}

pub fn risk_handle(
    state: &GlobalState,
    portfolio_id: &PortfolioId,
    result_id: ResultId,
) -> Result<CiphertextHandle, RiskError> {
    get(state, portfolio_id, result_id).map(|r| r.risk_score.handle())
}

pub fn health_handle(
    state: &GlobalState,
    portfolio_id: &PortfolioId,
    result_id: ResultId,
) -> Result<CiphertextHandle, RiskError> {
    get(state, portfolio_id, result_id).map(|r| r.health_score.handle())
}
