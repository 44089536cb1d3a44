use crate::provider::Failure;
use thiserror::Error;

/// Errors that can occur when deriving, decoding, or using GOST keys.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid length: expected {0}, found {1}")]
    InvalidLength(&'static str, usize),
    #[error("invalid size tag: {0}")]
    InvalidSizeTag(u8),
    #[error("invalid hex field")]
    InvalidHex,
    #[error("secret too long for soft derivation: {0} bytes")]
    InvalidSecretLength(usize),
    #[error("invalid signature length: {0}")]
    InvalidSignatureLength(usize),
    #[error("invalid public key: {0}")]
    InvalidPublicKey(Failure),
    #[error("key already exists")]
    KeyAlreadyExists,
    #[error("container not found: {0}")]
    ContainerNotFound(Failure),
    #[error("key not found: {0}")]
    KeyNotFound(Failure),
    #[error("provider error: {0}")]
    Provider(Failure),
    #[error("signing failed: {0}")]
    Signing(Failure),
    #[error("verification could not be performed: {0}")]
    Verification(Failure),
}
