use crate::attestation::{verify_attestation, Attestor};
use crate::error::EngineError;
use crate::input::{derive_network_key, open};
use crate::{Decryptor, EncryptedArithmetic};
use cipherisk_types::{Address, CiphertextHandle, EncryptedValue, ExternalCiphertext};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Reference engine: plaintexts live in a private table keyed by opaque
/// handles, so the rest of the system behaves exactly as it would against
/// a real homomorphic backend. Decryption honours the ACL.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClearEngine {
    network_key: [u8; 32],
    attestor: [u8; 32],
    core_address: Address,
    salt: [u8; 32],
    counter: u64,
    values: HashMap<CiphertextHandle, u64>,
    acl: HashMap<CiphertextHandle, BTreeSet<Address>>,
    public: HashSet<CiphertextHandle>,
}

impl ClearEngine {
    /// `core_address` is the identity that `grant_self` grants to.
    pub fn new(network_key: [u8; 32], attestor: [u8; 32], core_address: Address) -> Self {
        let salt = blake3::hash(&[network_key.as_slice(), core_address.as_slice()].concat());
        Self {
            network_key,
            attestor,
            core_address,
            salt: *salt.as_bytes(),
            counter: 0,
            values: HashMap::new(),
            acl: HashMap::new(),
            public: HashSet::new(),
        }
    }

    /// Deterministic engine whose keys match `InputEncryptor::from_seed(seed)`.
    pub fn from_seed(seed: &[u8; 32], core_address: Address) -> Self {
        let attestor = Attestor::from_seed(seed).public_key();
        Self::new(derive_network_key(seed), attestor, core_address)
    }

    pub fn core_address(&self) -> Address {
        self.core_address
    }

    pub fn ciphertext_count(&self) -> usize {
        self.values.len()
    }

    fn mint(&mut self, plain: u64) -> EncryptedValue {
        self.counter += 1;
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.salt);
        hasher.update(&self.counter.to_le_bytes());
        let handle = CiphertextHandle(*hasher.finalize().as_bytes());
        self.values.insert(handle, plain);
        EncryptedValue::from_handle(handle)
    }

    fn plain(&self, value: EncryptedValue) -> Result<u64, EngineError> {
        self.values
            .get(&value.handle())
            .copied()
            .ok_or_else(|| EngineError::UnknownHandle(value.handle().to_hex()))
    }

    fn binary(
        &mut self,
        a: EncryptedValue,
        b: EncryptedValue,
        op: impl Fn(u64, u64) -> u64,
    ) -> Result<EncryptedValue, EngineError> {
        let (x, y) = (self.plain(a)?, self.plain(b)?);
        Ok(self.mint(op(x, y)))
    }

    fn ensure_known(&self, value: EncryptedValue) -> Result<(), EngineError> {
        self.plain(value).map(|_| ())
    }
}

impl EncryptedArithmetic for ClearEngine {
    fn encrypt_constant(&mut self, value: u64) -> Result<EncryptedValue, EngineError> {
        Ok(self.mint(value))
    }

    fn import_attested(
        &mut self,
        ciphertext: &ExternalCiphertext,
        attestation: &[u8],
        importer: &Address,
    ) -> Result<EncryptedValue, EngineError> {
        verify_attestation(&self.attestor, attestation, importer, ciphertext)?;
        let amount = open(&self.network_key, ciphertext)?;
        let imported = self.mint(amount);
        debug!(handle = %imported.handle(), "imported attested ciphertext");
        Ok(imported)
    }

    fn min(&mut self, a: EncryptedValue, b: EncryptedValue) -> Result<EncryptedValue, EngineError> {
        self.binary(a, b, |x, y| x.min(y))
    }

    fn mul(&mut self, a: EncryptedValue, b: EncryptedValue) -> Result<EncryptedValue, EngineError> {
        self.binary(a, b, u64::wrapping_mul)
    }

    fn add(&mut self, a: EncryptedValue, b: EncryptedValue) -> Result<EncryptedValue, EngineError> {
        self.binary(a, b, u64::wrapping_add)
    }

    fn sub(&mut self, a: EncryptedValue, b: EncryptedValue) -> Result<EncryptedValue, EngineError> {
        self.binary(a, b, u64::wrapping_sub)
    }

    fn div_by_public(
        &mut self,
        a: EncryptedValue,
        divisor: u64,
    ) -> Result<EncryptedValue, EngineError> {
        if divisor == 0 {
            return Err(EngineError::DivisionByZero);
        }
        let x = self.plain(a)?;
        Ok(self.mint(x / divisor))
    }

    fn grant_self(&mut self, value: EncryptedValue) -> Result<(), EngineError> {
        let core = self.core_address;
        self.grant_to(value, &core)
    }

    fn grant_to(&mut self, value: EncryptedValue, principal: &Address) -> Result<(), EngineError> {
        self.ensure_known(value)?;
        self.acl.entry(value.handle()).or_default().insert(*principal);
        Ok(())
    }

    fn make_public(&mut self, value: EncryptedValue) -> Result<(), EngineError> {
        self.ensure_known(value)?;
        self.public.insert(value.handle());
        Ok(())
    }

    fn release(&mut self, value: EncryptedValue) {
        let handle = value.handle();
        self.values.remove(&handle);
        self.acl.remove(&handle);
        self.public.remove(&handle);
    }

    fn is_allowed(&self, handle: &CiphertextHandle, principal: &Address) -> bool {
        self.public.contains(handle)
            || self
                .acl
                .get(handle)
                .map(|set| set.contains(principal))
                .unwrap_or(false)
    }

    fn is_public(&self, handle: &CiphertextHandle) -> bool {
        self.public.contains(handle)
    }
}

impl Decryptor for ClearEngine {
    fn decrypt(&self, handle: &CiphertextHandle, requester: &Address) -> Result<u64, EngineError> {
        let plain = self
            .values
            .get(handle)
            .copied()
            .ok_or_else(|| EngineError::UnknownHandle(handle.to_hex()))?;
        if !self.is_allowed(handle, requester) {
            return Err(EngineError::AccessDenied(handle.to_hex()));
        }
        Ok(plain)
    }
}
