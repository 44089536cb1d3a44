//! Verify many signatures at once.

use crate::{
    gost::{PublicKey, Signature},
    provider::Provider,
    BatchVerifier, Verifier,
};
use bytes::Bytes;
use rayon::prelude::*;

/// A collection of (public key, message, signature) items.
///
/// GOST has no aggregate check, so every item is verified on its own (in parallel on
/// the global rayon pool) and the result of each is reported.
pub struct Batch<P: Provider> {
    items: Vec<(PublicKey<P>, Bytes, Signature)>,
}

impl<P: Provider> Batch<P> {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Number of items in the batch.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the batch has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<P: Provider> Default for Batch<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Provider> BatchVerifier<PublicKey<P>> for Batch<P> {
    fn new() -> Self {
        Self::new()
    }

    fn add(&mut self, public_key: &PublicKey<P>, message: &[u8], signature: &Signature) {
        self.items.push((
            public_key.clone(),
            Bytes::copy_from_slice(message),
            signature.clone(),
        ));
    }

    fn verify(&self) -> (bool, Vec<bool>) {
        let results = self
            .items
            .par_iter()
            .map(|(public_key, message, signature)| public_key.verify(message, signature))
            .collect::<Vec<_>>();
        (results.iter().all(|valid| *valid), results)
    }
}
