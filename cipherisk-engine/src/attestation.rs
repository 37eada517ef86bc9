//! Input attestations: an ed25519 signature from the input verifier over
//! the importer address and the digests of every ciphertext in a batch.

use crate::error::EngineError;
use cipherisk_types::{Address, ExternalCiphertext};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

const ATTESTATION_DOMAIN: &[u8] = b"cipherisk/input-attestation/v1";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InputAttestation {
    pub importer: Address,
    pub digests: Vec<[u8; 32]>,
    pub signature: Vec<u8>,
}

impl InputAttestation {
    pub fn decode(bytes: &[u8]) -> Result<Self, EngineError> {
        bincode::deserialize(bytes).map_err(|_| EngineError::InvalidAttestation)
    }

    pub fn encode(&self) -> Vec<u8> {
        bincode::serialize(self).expect("attestation serialization")
    }

    pub fn covers(&self, ciphertext: &ExternalCiphertext) -> bool {
        let digest = ciphertext.digest();
        self.digests.iter().any(|d| d == &digest)
    }
}

fn signing_message(importer: &Address, digests: &[[u8; 32]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(ATTESTATION_DOMAIN);
    hasher.update(importer);
    hasher.update(&(digests.len() as u64).to_le_bytes());
    for d in digests {
        hasher.update(d);
    }
    *hasher.finalize().as_bytes()
}

/// The input verifier's signing side.
pub struct Attestor {
    key: SigningKey,
}

impl Attestor {
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        Self { key: SigningKey::generate(&mut csprng) }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let secret = blake3::derive_key("cipherisk 2024 input attestor", seed);
        Self { key: SigningKey::from_bytes(&secret) }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    pub fn attest(
        &self,
        importer: &Address,
        ciphertexts: &[ExternalCiphertext],
    ) -> InputAttestation {
        let digests: Vec<[u8; 32]> = ciphertexts.iter().map(|c| c.digest()).collect();
        let sig: Signature = self.key.sign(&signing_message(importer, &digests));
        InputAttestation {
            importer: *importer,
            digests,
            signature: sig.to_bytes().to_vec(),
        }
    }
}

/// Checks that `attestation` was signed by `attestor`, was issued for
/// `importer`, and covers `ciphertext`.
pub fn verify_attestation(
    attestor: &[u8; 32],
    attestation: &[u8],
    importer: &Address,
    ciphertext: &ExternalCiphertext,
) -> Result<(), EngineError> {
    let decoded = InputAttestation::decode(attestation)?;
    let pubkey = VerifyingKey::from_bytes(attestor).map_err(|_| EngineError::InvalidAttestation)?;
    let sig_bytes: [u8; 64] = decoded
        .signature
        .as_slice()
        .try_into()
        .map_err(|_| EngineError::InvalidAttestation)?;
    let signature = Signature::from_bytes(&sig_bytes);
    pubkey
        .verify(&signing_message(&decoded.importer, &decoded.digests), &signature)
        .map_err(|_| EngineError::InvalidAttestation)?;

    if &decoded.importer != importer || !decoded.covers(ciphertext) {
        return Err(EngineError::UnattestedCiphertext);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ct(b: u8) -> ExternalCiphertext {
        ExternalCiphertext(vec![b; 24])
    }

    #[test]
    fn accepts_covered_ciphertext_for_importer() {
        let attestor = Attestor::generate();
        let importer = [7u8; 32];
        let att = attestor.attest(&importer, &[ct(1), ct(2)]).encode();
        assert!(verify_attestation(&attestor.public_key(), &att, &importer, &ct(2)).is_ok());
    }

    #[test]
    fn rejects_other_importer_and_uncovered_ciphertext() {
        let attestor = Attestor::generate();
        let importer = [7u8; 32];
        let att = attestor.attest(&importer, &[ct(1)]).encode();
        assert_eq!(
            verify_attestation(&attestor.public_key(), &att, &[8u8; 32], &ct(1)),
            Err(EngineError::UnattestedCiphertext)
        );
        assert_eq!(
            verify_attestation(&attestor.public_key(), &att, &importer, &ct(3)),
            Err(EngineError::UnattestedCiphertext)
        );
    }

    #[test]
    fn rejects_foreign_signer_and_garbage() {
        let attestor = Attestor::generate();
        let rogue = Attestor::generate();
        let importer = [7u8; 32];
        let att = rogue.attest(&importer, &[ct(1)]).encode();
        assert_eq!(
            verify_attestation(&attestor.public_key(), &att, &importer, &ct(1)),
            Err(EngineError::InvalidAttestation)
        );
        assert_eq!(
            verify_attestation(&attestor.public_key(), b"junk", &importer, &ct(1)),
            Err(EngineError::InvalidAttestation)
        );
    }

    #[test]
    fn tampered_digest_list_breaks_signature() {
        let attestor = Attestor::generate();
        let importer = [7u8; 32];
        let mut att = attestor.attest(&importer, &[ct(1)]);
        att.digests.push(ct(9).digest());
        assert_eq!(
            verify_attestation(&attestor.public_key(), &att.encode(), &importer, &ct(9)),
            Err(EngineError::InvalidAttestation)
        );
    }
}
