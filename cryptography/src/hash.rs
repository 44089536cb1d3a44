//! GOST R 34.11-2012 (Streebog, 256-bit) implementation of the `Hasher` trait.
//!
//! This is the provider-native digest used to salt derived secrets and to compute
//! public key addresses. It uses the `streebog` crate for hashing and the `hmac`
//! crate for keyed derivation.
//!
//! # Example
//! ```rust
//! use gost_cryptography::{Hasher, Streebog256};
//!
//! // Create a new Streebog hasher
//! let mut hasher = Streebog256::new();
//!
//! // Update the hasher with some messages
//! hasher.update(b"hello,");
//! hasher.update(b"world!");
//!
//! // Finalize the hasher to get the digest
//! let digest = hasher.finalize();
//!
//! // Print the digest
//! println!("digest: {:?}", digest);
//! ```

use crate::{Error, Hasher};
use ::streebog::{Digest as _, Streebog256 as IStreebog256};
use bytes::{Buf, BufMut};
use commonware_codec::{Error as CodecError, FixedSize, Read, ReadExt, Write};
use commonware_utils::hex;
use hmac::{digest::KeyInit, Mac, SimpleHmac};
use std::{
    fmt::{Debug, Display},
    ops::Deref,
};

/// Length of a Streebog-256 digest.
pub const DIGEST_LENGTH: usize = 32;

/// Generate a Streebog-256 digest from a message.
pub fn hash(message: &[u8]) -> Digest {
    let array: [u8; DIGEST_LENGTH] = IStreebog256::digest(message).into();
    Digest::from(array)
}

/// Streebog-256 hasher.
#[derive(Debug)]
pub struct Streebog256 {
    hasher: IStreebog256,
}

impl Default for Streebog256 {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Streebog256 {
    fn clone(&self) -> Self {
        // We manually implement `Clone` to avoid cloning the hasher state.
        Self::default()
    }
}

impl Hasher for Streebog256 {
    fn new() -> Self {
        Self {
            hasher: IStreebog256::new(),
        }
    }

    fn update(&mut self, message: &[u8]) {
        self.hasher.update(message);
    }

    fn finalize(&mut self) -> Digest {
        let finalized = self.hasher.finalize_reset();
        let array: [u8; DIGEST_LENGTH] = finalized.into();
        Digest::from(array)
    }

    fn reset(&mut self) {
        self.hasher = IStreebog256::new();
    }

    fn mac(key: &[u8], message: &[u8]) -> Digest {
        // Keys of any length are accepted (longer keys are hashed first).
        let mut mac = <SimpleHmac<IStreebog256> as KeyInit>::new_from_slice(key)
            .unwrap_or_else(|_| unreachable!());
        mac.update(message);
        let array: [u8; DIGEST_LENGTH] = mac.finalize().into_bytes().into();
        Digest::from(array)
    }
}

/// Digest of a Streebog-256 hashing operation.
///
/// Also used as the address of a public key.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Digest([u8; DIGEST_LENGTH]);

impl Write for Digest {
    fn write(&self, buf: &mut impl BufMut) {
        self.0.write(buf);
    }
}

impl Read for Digest {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let array = <[u8; DIGEST_LENGTH]>::read(buf)?;
        Ok(Self(array))
    }
}

impl FixedSize for Digest {
    const SIZE: usize = DIGEST_LENGTH;
}

impl From<[u8; DIGEST_LENGTH]> for Digest {
    fn from(value: [u8; DIGEST_LENGTH]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for Digest {
    type Error = Error;
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; DIGEST_LENGTH] = value
            .try_into()
            .map_err(|_| Error::InvalidLength("32", value.len()))?;
        Ok(Self(array))
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for Digest {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}
