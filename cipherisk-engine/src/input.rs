//! Client side of the input flow: encrypt amounts under the network key
//! and have the batch attested for a specific importer.

use crate::attestation::Attestor;
use crate::error::EngineError;
use cipherisk_types::{Address, ExternalCiphertext};

const NONCE_LEN: usize = 16;
const CIPHERTEXT_LEN: usize = NONCE_LEN + 8;

fn keystream(network_key: &[u8; 32], nonce: &[u8]) -> [u8; 8] {
    let block = blake3::keyed_hash(network_key, nonce);
    let mut out = [0u8; 8];
    out.copy_from_slice(&block.as_bytes()[..8]);
    out
}

pub(crate) fn seal(
    network_key: &[u8; 32],
    value: u64,
    nonce: [u8; NONCE_LEN],
) -> ExternalCiphertext {
    let ks = keystream(network_key, &nonce);
    let mut bytes = Vec::with_capacity(CIPHERTEXT_LEN);
    bytes.extend_from_slice(&nonce);
    for (p, k) in value.to_le_bytes().iter().zip(ks.iter()) {
        bytes.push(p ^ k);
    }
    ExternalCiphertext(bytes)
}

pub(crate) fn open(
    network_key: &[u8; 32],
    ciphertext: &ExternalCiphertext,
) -> Result<u64, EngineError> {
    let bytes = ciphertext.as_bytes();
    if bytes.len() != CIPHERTEXT_LEN {
        return Err(EngineError::MalformedCiphertext(bytes.len()));
    }
    let (nonce, body) = bytes.split_at(NONCE_LEN);
    let ks = keystream(network_key, nonce);
    let mut plain = [0u8; 8];
    for i in 0..8 {
        plain[i] = body[i] ^ ks[i];
    }
    Ok(u64::from_le_bytes(plain))
}

pub(crate) fn derive_network_key(seed: &[u8; 32]) -> [u8; 32] {
    blake3::derive_key("cipherisk 2024 network key", seed)
}

/// Ciphertexts plus the single attestation that covers all of them.
#[derive(Debug, Clone)]
pub struct EncryptedInputs {
    pub ciphertexts: Vec<ExternalCiphertext>,
    pub attestation: Vec<u8>,
}

pub struct InputEncryptor {
    network_key: [u8; 32],
    attestor: Attestor,
}

impl InputEncryptor {
    pub fn new(network_key: [u8; 32], attestor: Attestor) -> Self {
        Self { network_key, attestor }
    }

    /// Matches [`crate::ClearEngine::from_seed`] for the same seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::new(derive_network_key(seed), Attestor::from_seed(seed))
    }

    pub fn encrypt_batch(&self, importer: &Address, amounts: &[u64]) -> EncryptedInputs {
        let ciphertexts: Vec<ExternalCiphertext> = amounts
            .iter()
            .map(|v| seal(&self.network_key, *v, rand::random::<[u8; NONCE_LEN]>()))
            .collect();
        let attestation = self.attestor.attest(importer, &ciphertexts).encode();
        EncryptedInputs { ciphertexts, attestation }
    }
}
