//! Interface to the native cryptographic provider.
//!
//! The provider owns key containers, performs signing and verification over raw bytes,
//! and exposes its native GOST R 34.11-2012 digest. Every handle it returns
//! ([Provider::Container], [Provider::Key]) holds provider-side resources that are released
//! when the handle is dropped, so resources are returned on every exit path of the caller.

use crate::{gost::Size, Error, Hasher};
use thiserror::Error;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

/// Use of a key pair inside a container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum KeySpec {
    /// Key exchange pair (`AT_KEYEXCHANGE`).
    Exchange = 1,
    /// Digital signature pair (`AT_SIGNATURE`).
    #[default]
    Signature = 2,
}

impl KeySpec {
    /// Native value of the key use.
    pub const fn value(self) -> u32 {
        self as u32
    }
}

/// Outcome of a successful container creation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Created {
    /// A new container and key pair were generated.
    New,
    /// A container with the same name already existed and was left untouched.
    AlreadyExists,
}

impl Created {
    /// Treat an existing container as an error.
    pub fn fresh(self) -> Result<(), Error> {
        match self {
            Self::New => Ok(()),
            Self::AlreadyExists => Err(Error::KeyAlreadyExists),
        }
    }
}

/// A negative status reported by the provider.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{operation} returned status {code}")]
pub struct Failure {
    /// Name of the provider call that failed.
    pub operation: &'static str,
    /// Status returned by the provider.
    pub code: i32,
}

impl Failure {
    pub fn new(operation: &'static str, code: i32) -> Self {
        Self { operation, code }
    }
}

/// Native provider performing container management, signing and verification.
///
/// Calls are synchronous. Implementations must be cheap to clone (handles to the same
/// provider) and safe to use from multiple threads.
pub trait Provider: Clone + Send + Sync + 'static {
    /// Provider-native 256-bit digest.
    type Hasher: Hasher;

    /// An open container. Released on drop.
    type Container: Container;

    /// An imported public key. Released on drop.
    type Key: Key;

    /// Create a container protected by `pin` and generate a signature key pair inside it.
    fn create_container(&self, size: Size, name: &str, pin: &str) -> Result<Created, Failure>;

    /// Confirm that a container exists and accepts `pin`.
    fn check_container(&self, size: Size, name: &str, pin: &str) -> Result<(), Failure>;

    /// Open a container and select the key pair used for `spec`.
    fn open_container(
        &self,
        size: Size,
        name: &str,
        pin: &str,
        spec: KeySpec,
    ) -> Result<Self::Container, Failure>;

    /// Import a raw public key blob (without the size tag).
    fn import_public_key(&self, size: Size, raw: &[u8]) -> Result<Self::Key, Failure>;
}

/// An open provider container.
pub trait Container {
    /// Export the raw public key blob of the selected key pair.
    fn public_key(&self) -> Result<Vec<u8>, Failure>;

    /// Hash and sign `message` with the selected key pair.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Failure>;
}

/// A public key imported into the provider.
pub trait Key {
    /// Hash `message` and check `signature` against it.
    ///
    /// Returns `Ok(false)` for a signature that does not verify and an error only
    /// when the check could not be performed.
    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, Failure>;
}
