use cipherisk_engine::EncryptedArithmetic;
use cipherisk_types::instruction::RiskInstruction;
use cipherisk_types::state::GlobalState;
use cipherisk_types::transaction::Transaction;
use cipherisk_types::{Address, ResultId, RiskEvent};
use tracing::debug;

pub mod access;
pub mod aggregation;
pub mod error;
pub mod events;
pub mod ownership;
pub mod registry;
pub mod results;

pub use error::{ErrorKind, RiskError};
pub use events::{CapturingSink, EventSink, TracingSink};

/// Everything an instruction may touch. Events are queued here and only
/// published by the caller once the whole transition has been accepted.
pub struct ExecutionContext<'a> {
    pub state: &'a mut GlobalState,
    pub engine: &'a mut dyn EncryptedArithmetic,
    pub timestamp: u64,
    pub events: Vec<RiskEvent>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        state: &'a mut GlobalState,
        engine: &'a mut dyn EncryptedArithmetic,
        timestamp: u64,
    ) -> Self {
        Self {
            state,
            engine,
            timestamp,
            events: Vec::new(),
        }
    }

    pub(crate) fn emit(&mut self, event: RiskEvent) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<RiskEvent> {
        std::mem::take(&mut self.events)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    ResultCreated(ResultId),
}

impl Outcome {
    pub fn result_id(&self) -> Option<ResultId> {
        match self {
            Outcome::ResultCreated(id) => Some(*id),
            Outcome::Applied => None,
        }
    }
}

pub fn execute_transaction(
    tx: &Transaction,
    ctx: &mut ExecutionContext,
) -> Result<Outcome, RiskError> {
    debug!(instruction = tx.instruction.name(), "executing");
    execute_instruction(&tx.instruction, &tx.sender, ctx)
}

pub fn execute_instruction(
    instruction: &RiskInstruction,
    sender: &Address,
    ctx: &mut ExecutionContext,
) -> Result<Outcome, RiskError> {
    match instruction {
        RiskInstruction::SetAdministrator { new_administrator } => {
            registry::set_administrator(ctx, sender, new_administrator)?;
            Ok(Outcome::Applied)
        }
        RiskInstruction::SetAssetParam { asset_id, weight_bp, cap_amount } => {
            registry::set_asset_param(ctx, sender, asset_id, *weight_bp, *cap_amount)?;
            Ok(Outcome::Applied)
        }
        RiskInstruction::ClaimOrTransferOwnership { portfolio_id, new_owner } => {
            ownership::claim_or_transfer_ownership(ctx, sender, portfolio_id, new_owner)?;
            Ok(Outcome::Applied)
        }
        RiskInstruction::ComputePortfolio {
            portfolio_id,
            asset_ids,
            attested_amounts,
            attestation,
        } => {
            let id = aggregation::compute_portfolio(
                ctx,
                sender,
                portfolio_id,
                asset_ids,
                attested_amounts,
                attestation,
            )?;
            Ok(Outcome::ResultCreated(id))
        }
        RiskInstruction::GrantResultAccess { portfolio_id, result_id, to } => {
            access::grant_result_access(ctx, sender, portfolio_id, *result_id, to)?;
            Ok(Outcome::Applied)
        }
        RiskInstruction::MakeResultPublic { portfolio_id, result_id } => {
            access::make_result_public(ctx, sender, portfolio_id, *result_id)?;
            Ok(Outcome::Applied)
        }
    }
}

#[cfg(test)]
mod tests;
