use crate::instruction::RiskInstruction;
use crate::Address;
use serde::{Deserialize, Serialize};

/// An authenticated call into the risk engine. Sender authentication is
/// the host environment's job; by the time a transaction reaches execution
/// `sender` is trusted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Transaction {
    pub sender: Address,
    pub instruction: RiskInstruction,
}

impl Transaction {
    pub fn new(sender: Address, instruction: RiskInstruction) -> Self {
        Self { sender, instruction }
    }

    pub fn id(&self) -> [u8; 32] {
        let bytes = bincode::serialize(self).expect("tx serialization");
        *blake3::hash(&bytes).as_bytes()
    }
}
