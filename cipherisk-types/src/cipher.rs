use serde::{Deserialize, Serialize};

/// Public reference to a ciphertext held by the encrypted arithmetic engine.
/// Knowing a handle grants nothing: decryption goes through the engine's ACL.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CiphertextHandle(pub [u8; 32]);

impl CiphertextHandle {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x")).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl std::fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// An encrypted 64-bit unsigned value. The core can pass it to engine
/// operations and store it, but has no way to look inside.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncryptedValue {
    handle: CiphertextHandle,
}

impl EncryptedValue {
    /// Only engines should mint encrypted values.
    pub fn from_handle(handle: CiphertextHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> CiphertextHandle {
        self.handle
    }
}

/// Ciphertext produced off-system by a client, not yet imported.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExternalCiphertext(pub Vec<u8>);

impl ExternalCiphertext {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn digest(&self) -> [u8; 32] {
        *blake3::hash(&self.0).as_bytes()
    }
}
