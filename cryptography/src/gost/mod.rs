//! GOST R 34.10-2012 keys held in provider containers.
//!
//! A private key is never exported: it is referenced by the (derived) name and password
//! of the provider container that holds it. Both security levels share one set of types,
//! parameterized by [Size], and one byte layout:
//!
//! | Record | Tag | Length | Layout |
//! |---|---|---|---|
//! | Private key (both sizes) | 80 / 81 | 129 | `tag ‖ container hex (64) ‖ password hex (64)` |
//! | Public key, 256 | 80 | 102 | `tag ‖ raw key (101)` |
//! | Public key, 512 | 81 | 168 | `tag ‖ raw key (167)` |
//! | Signature, 256 | - | 64 | opaque |
//! | Signature, 512 | - | 128 | opaque |
//!
//! The 512-bit private key reuses the 256-bit layout and only differs by its tag.
//!
//! # Example
//! ```rust,ignore
//! use gost_cryptography::{
//!     gost::{Config, Keystore, Size},
//!     provider::mocks,
//!     Signer, Streebog256, Verifier,
//! };
//!
//! // Derive a container identity from a user name and password
//! let identity = Config::new(Size::K256, "username", "password")
//!     .derive::<Streebog256>()
//!     .unwrap();
//!
//! // Create the container (a second call reports that it already exists)
//! let keystore = Keystore::new(mocks::Provider::new());
//! keystore.generate(&identity).unwrap();
//!
//! // Load the key and sign a message
//! let signer = keystore.load(&identity).unwrap();
//! let msg = b"hello, world!";
//! let signature = signer.sign(msg).unwrap();
//!
//! // Verify the signature
//! let public_key = signer.public_key().unwrap();
//! assert!(public_key.verify(msg, &signature));
//! ```

use crate::{hash::DIGEST_LENGTH, Error};
use std::fmt::Display;

mod batch;
pub use batch::Batch;
pub mod codec;
pub use codec::{PrivateRecord, PublicRecord};
pub mod derivation;
pub use derivation::{Config, Identity, Mode};
mod keystore;
pub use keystore::Keystore;
mod scheme;
pub use scheme::{Container, PrivateKey, PublicKey, Signature};

/// Name of the signature algorithm.
pub const KEY_TYPE: &str = "ГОСТ Р 34.10-2012";

/// Length of a derived container name or password (hex of a digest).
pub const HEX_LENGTH: usize = DIGEST_LENGTH * 2;

/// Length of an encoded private key: `tag ‖ container ‖ password`.
pub const PRIVATE_KEY_LENGTH: usize = 1 + HEX_LENGTH + HEX_LENGTH;

const PUBLIC_KEY_LENGTH_256: usize = 102;
const PUBLIC_KEY_LENGTH_512: usize = 168;
const SIGNATURE_LENGTH_256: usize = 64;
const SIGNATURE_LENGTH_512: usize = 128;

/// Security level of a key, encoded as the provider type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Size {
    /// GOST R 34.10-2012 with a 256-bit key (provider type 80).
    K256 = 80,
    /// GOST R 34.10-2012 with a 512-bit key (provider type 81).
    K512 = 81,
}

impl Size {
    /// Tag byte that starts every encoded key of this size.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Length of an encoded public key (including the tag).
    pub const fn public_key_length(self) -> usize {
        match self {
            Self::K256 => PUBLIC_KEY_LENGTH_256,
            Self::K512 => PUBLIC_KEY_LENGTH_512,
        }
    }

    /// Length of a signature.
    pub const fn signature_length(self) -> usize {
        match self {
            Self::K256 => SIGNATURE_LENGTH_256,
            Self::K512 => SIGNATURE_LENGTH_512,
        }
    }

    /// Size implied by the length of an encoded public key.
    pub const fn from_public_key_length(len: usize) -> Option<Self> {
        match len {
            PUBLIC_KEY_LENGTH_256 => Some(Self::K256),
            PUBLIC_KEY_LENGTH_512 => Some(Self::K512),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Size {
    type Error = Error;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            80 => Ok(Self::K256),
            81 => Ok(Self::K512),
            tag => Err(Error::InvalidSizeTag(tag)),
        }
    }
}

impl Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::K256 => write!(f, "256"),
            Self::K512 => write!(f, "512"),
        }
    }
}
