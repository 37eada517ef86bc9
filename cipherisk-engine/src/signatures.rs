//! Principal keys. An `Address` is the principal's ed25519 public key, so
//! requests such as decryption can be authenticated without a registry.

pub use ed25519_dalek::{SigningKey, VerifyingKey};
use crate::error::EngineError;
use cipherisk_types::{Address, CiphertextHandle};
use ed25519_dalek::{Signature, Signer, Verifier};
use rand::rngs::OsRng;

const DECRYPT_DOMAIN: &[u8] = b"cipherisk/decrypt-request/v1";

pub fn generate_keypair() -> SigningKey {
    let mut csprng = OsRng;
    SigningKey::generate(&mut csprng)
}

pub fn address_of(key: &SigningKey) -> Address {
    key.verifying_key().to_bytes()
}

pub fn sign(key: &SigningKey, message: &[u8]) -> Vec<u8> {
    let sig: Signature = key.sign(message);
    sig.to_bytes().to_vec()
}

pub fn verify_signature(
    principal: &Address,
    message: &[u8],
    signature: &[u8],
) -> Result<(), EngineError> {
    let pubkey = VerifyingKey::from_bytes(principal).map_err(|_| EngineError::InvalidSignature)?;
    let sig_bytes: [u8; 64] = signature.try_into().map_err(|_| EngineError::InvalidSignature)?;
    pubkey
        .verify(message, &Signature::from_bytes(&sig_bytes))
        .map_err(|_| EngineError::InvalidSignature)
}

pub fn decrypt_request_message(handle: &CiphertextHandle) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DECRYPT_DOMAIN);
    hasher.update(&handle.0);
    *hasher.finalize().as_bytes()
}

pub fn sign_decrypt_request(key: &SigningKey, handle: &CiphertextHandle) -> Vec<u8> {
    sign(key, &decrypt_request_message(handle))
}
