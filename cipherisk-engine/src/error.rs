use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("attestation could not be decoded or its signature is invalid")]
    InvalidAttestation,
    #[error("ciphertext is not covered by the attestation for this importer")]
    UnattestedCiphertext,
    #[error("malformed ciphertext ({0} bytes)")]
    MalformedCiphertext(usize),
    #[error("unknown ciphertext handle {0}")]
    UnknownHandle(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("request signature is invalid")]
    InvalidSignature,
    #[error("principal is not allowed to decrypt {0}")]
    AccessDenied(String),
}
