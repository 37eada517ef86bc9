//! Encrypted arithmetic capability used by the risk core.
//!
//! The core only ever sees [`EncryptedValue`]s and talks to the engine
//! through [`EncryptedArithmetic`]. Plaintext recovery lives behind the
//! separate [`Decryptor`] trait so that nothing in the core can call it.

pub mod attestation;
pub mod clear;
pub mod error;
pub mod input;
pub mod signatures;

pub use attestation::{Attestor, InputAttestation};
pub use clear::ClearEngine;
pub use error::EngineError;
pub use input::{EncryptedInputs, InputEncryptor};

use cipherisk_types::{Address, CiphertextHandle, EncryptedValue, ExternalCiphertext};

/// Homomorphic operations over encrypted `u64` values plus the ACL that
/// governs who may later decrypt them. Arithmetic wraps modulo 2^64.
pub trait EncryptedArithmetic {
    fn encrypt_constant(&mut self, value: u64) -> Result<EncryptedValue, EngineError>;

    /// Verifies `attestation` covers `ciphertext` for `importer` and brings
    /// the value under the engine's control.
    fn import_attested(
        &mut self,
        ciphertext: &ExternalCiphertext,
        attestation: &[u8],
        importer: &Address,
    ) -> Result<EncryptedValue, EngineError>;

    fn min(&mut self, a: EncryptedValue, b: EncryptedValue) -> Result<EncryptedValue, EngineError>;
    fn mul(&mut self, a: EncryptedValue, b: EncryptedValue) -> Result<EncryptedValue, EngineError>;
    fn add(&mut self, a: EncryptedValue, b: EncryptedValue) -> Result<EncryptedValue, EngineError>;
    fn sub(&mut self, a: EncryptedValue, b: EncryptedValue) -> Result<EncryptedValue, EngineError>;

    /// Integer division by a plaintext divisor.
    fn div_by_public(
        &mut self,
        a: EncryptedValue,
        divisor: u64,
    ) -> Result<EncryptedValue, EngineError>;

    fn to_handle(&self, value: EncryptedValue) -> CiphertextHandle {
        value.handle()
    }

    /// Retains standing capability for the caller itself.
    fn grant_self(&mut self, value: EncryptedValue) -> Result<(), EngineError>;
    fn grant_to(&mut self, value: EncryptedValue, principal: &Address) -> Result<(), EngineError>;
    /// Irrevocable.
    fn make_public(&mut self, value: EncryptedValue) -> Result<(), EngineError>;

    /// Drops an intermediate value the caller will not reference again.
    /// Unknown handles are ignored.
    fn release(&mut self, value: EncryptedValue);

    fn is_allowed(&self, handle: &CiphertextHandle, principal: &Address) -> bool;
    fn is_public(&self, handle: &CiphertextHandle) -> bool;
}

/// Plaintext recovery through the ACL. Implemented by engines, consumed
/// by clients and the API layer, never by the core.
pub trait Decryptor {
    fn decrypt(&self, handle: &CiphertextHandle, requester: &Address) -> Result<u64, EngineError>;
}
