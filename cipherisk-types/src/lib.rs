pub mod cipher;
pub mod event;
pub mod instruction;
pub mod state;
pub mod transaction;

pub use cipher::{CiphertextHandle, EncryptedValue, ExternalCiphertext};
pub use event::RiskEvent;
pub use instruction::RiskInstruction;
pub use state::GlobalState;
pub use transaction::Transaction;

/// 32-byte principal identifier. All zeroes is never a valid principal.
pub type Address = [u8; 32];
/// Opaque asset identifier, conventionally `blake3(symbol)`.
pub type AssetId = [u8; 32];
pub type PortfolioId = [u8; 32];
/// Per-portfolio sequence number, starting at 0.
pub type ResultId = u64;

pub const ZERO_ADDRESS: Address = [0u8; 32];

/// 10000 bp = 100%.
pub const BPS_DENOMINATOR: u64 = 10_000;
pub const MAX_WEIGHT_BP: u16 = 10_000;
pub const DEFAULT_MAX_CAP: u64 = 1_000_000_000_000;
pub const DEFAULT_MAX_ASSETS_PER_COMPUTATION: u32 = 64;

pub fn is_zero_address(addr: &Address) -> bool {
    addr == &ZERO_ADDRESS
}

/// Derives the asset identifier used for a ticker symbol.
pub fn asset_id_from_symbol(symbol: &str) -> AssetId {
    *blake3::hash(symbol.as_bytes()).as_bytes()
}

/// Short hex prefix for log lines.
pub fn short_hex(bytes: &[u8; 32]) -> String {
    hex::encode(&bytes[..6])
}
