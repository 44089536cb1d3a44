//! Manage GOST R 34.10-2012 keys held by a native provider, sign messages, and verify
//! signatures in batches.
//!
//! Key material never leaves the provider: a private key is a reference to a named,
//! password-protected container, and every signing or verification call opens (and
//! releases) provider handles for the duration of the call. See [gost] for the key
//! model and [provider] for the interface a native provider implements.
//!
//! # Status
//!
//! `gost-cryptography` is **ALPHA** software and is not yet recommended for production use. Developers should
//! expect breaking changes and occasional instability.

use std::fmt::Debug;

pub mod error;
pub use error::Error;
pub mod hash;
pub use hash::{Digest, Streebog256};
pub mod gost;
pub mod provider;

/// Produces [Signature]s over messages that can be verified with a corresponding [PublicKey].
pub trait Signer: Send + Sync + Clone + 'static {
    /// The type of [Signature] produced by this [Signer].
    type Signature: Signature;

    /// The corresponding [PublicKey] type.
    type PublicKey: PublicKey<Signature = Self::Signature>;

    /// Returns the [PublicKey] corresponding to this [Signer].
    ///
    /// The key is exported from the provider, so this can fail.
    fn public_key(&self) -> Result<Self::PublicKey, Error>;

    /// Sign a message.
    ///
    /// The message should not be hashed prior to calling this function. The provider hashes
    /// it with the digest matching the key size.
    fn sign(&self, msg: &[u8]) -> Result<Self::Signature, Error>;
}

/// A [Signer] that can be serialized.
pub trait PrivateKey: Signer + PartialEq + AsRef<[u8]> {}

/// Verifies [Signature]s over messages.
pub trait Verifier {
    /// The type of [Signature] that this verifier can verify.
    type Signature: Signature;

    /// Verify that a [Signature] is valid over a given message.
    ///
    /// Returns `false` both for invalid signatures and when the check could not be performed.
    fn verify(&self, msg: &[u8], sig: &Self::Signature) -> bool;
}

/// A [PublicKey], able to verify [Signature]s.
///
/// Public keys are identified by their [Digest] address: two keys are equal iff their
/// addresses are equal.
pub trait PublicKey:
    Verifier + Clone + PartialEq + AsRef<[u8]> + Debug + Send + Sync + 'static
{
    /// Returns the address of the key.
    fn address(&self) -> Digest;
}

/// A [Signature] over a message.
pub trait Signature: Clone + PartialEq + AsRef<[u8]> + Debug + Send + Sync + 'static {}

/// Verifies many independent [Signature]s and reports which of them are correct.
pub trait BatchVerifier<K: PublicKey> {
    /// Create a new batch verifier.
    fn new() -> Self;

    /// Append item to the batch.
    ///
    /// Items are never deduplicated.
    fn add(&mut self, public_key: &K, message: &[u8], signature: &K::Signature);

    /// Verify all items added to the batch.
    ///
    /// Returns `true` if all items are valid, along with the result of every item in
    /// insertion order. Items are kept, so calling this again (possibly after adding more
    /// items) verifies the whole batch again.
    fn verify(&self) -> (bool, Vec<bool>);
}

/// Interface used for the provider-native digest.
///
/// This trait is required to implement the `Clone` trait because it is often
/// part of a struct that is cloned. In practice, implementations do not actually
/// clone the hasher state but users should not rely on this behavior and call `reset`
/// after cloning.
pub trait Hasher: Clone + Send + Sync + 'static {
    /// Create a new hasher.
    fn new() -> Self;

    /// Append message to previously recorded data.
    fn update(&mut self, message: &[u8]);

    /// Hash all recorded data and reset the hasher
    /// to the initial state.
    fn finalize(&mut self) -> Digest;

    /// Reset the hasher without generating a hash.
    ///
    /// This function does not need to be called after `finalize`.
    fn reset(&mut self);

    /// Hash a single message.
    fn hash(message: &[u8]) -> Digest {
        let mut hasher = Self::new();
        hasher.update(message);
        hasher.finalize()
    }

    /// Compute the HMAC of `message` under `key`.
    fn mac(key: &[u8], message: &[u8]) -> Digest;
}
