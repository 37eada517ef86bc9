use crate::error::RiskError;
use crate::ExecutionContext;
use cipherisk_types::state::GlobalState;
use cipherisk_types::{is_zero_address, short_hex, Address, PortfolioId, RiskEvent};
use tracing::info;

/// First claim wins; after that only the current owner can hand over.
pub fn claim_or_transfer_ownership(
    ctx: &mut ExecutionContext,
    sender: &Address,
    portfolio_id: &PortfolioId,
    new_owner: &Address,
) -> Result<(), RiskError> {
    let previous = owner_of(ctx.state, portfolio_id);
    if let Some(current) = previous {
        if &current != sender {
            return Err(RiskError::Unauthorized("transfer portfolio ownership"));
        }
    }
    if is_zero_address(new_owner) {
        return Err(RiskError::InvalidAddress);
    }

    ctx.state.portfolio_owners.insert(*portfolio_id, *new_owner);
    info!(
        portfolio = %short_hex(portfolio_id),
        owner = %short_hex(new_owner),
        claimed = previous.is_none(),
        "portfolio owner set"
    );
    ctx.emit(RiskEvent::OwnershipChanged {
        portfolio_id: *portfolio_id,
        previous,
        new_owner: *new_owner,
    });
    Ok(())
}

pub fn owner_of(state: &GlobalState, portfolio_id: &PortfolioId) -> Option<Address> {
    state
        .portfolio_owners
        .get(portfolio_id)
        .copied()
        .filter(|owner| !is_zero_address(owner))
}
