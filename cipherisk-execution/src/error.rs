use cipherisk_engine::EngineError;
use cipherisk_types::ResultId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RiskError {
    #[error("caller is not authorized to {0}")]
    Unauthorized(&'static str),
    #[error("weight {0} bp exceeds 10000 bp")]
    InvalidWeight(u16),
    #[error("cap amount {cap} is outside (0, {max}]")]
    InvalidCap { cap: u64, max: u64 },
    #[error("expected 1..={max} assets with one amount each, got {assets} and {amounts}")]
    InvalidInputLength { assets: usize, amounts: usize, max: u32 },
    #[error("asset {0} is not configured")]
    AssetNotConfigured(String),
    #[error("aggregate denominator is zero")]
    ZeroDenominator,
    #[error("sum of asset caps overflows 64 bits")]
    DenominatorOverflow,
    #[error("result {result_id} of portfolio {portfolio} not found")]
    ResultNotFound { portfolio: String, result_id: ResultId },
    #[error("the zero address is not a valid principal")]
    InvalidAddress,
    #[error("encrypted arithmetic engine rejected the operation: {0}")]
    Engine(#[from] EngineError),
}

/// Coarse classification callers use to decide between correcting and
/// resubmitting versus giving up.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    InvalidInput,
    NotConfigured,
    ZeroDenominator,
    InvalidAddress,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::InvalidInput)
    }
}

impl RiskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RiskError::Unauthorized(_) => ErrorKind::Unauthorized,
            RiskError::InvalidWeight(_)
            | RiskError::InvalidCap { .. }
            | RiskError::InvalidInputLength { .. }
            | RiskError::DenominatorOverflow
            | RiskError::Engine(_) => ErrorKind::InvalidInput,
            RiskError::AssetNotConfigured(_) | RiskError::ResultNotFound { .. } => {
                ErrorKind::NotConfigured
            }
            RiskError::ZeroDenominator => ErrorKind::ZeroDenominator,
            RiskError::InvalidAddress => ErrorKind::InvalidAddress,
        }
    }
}
